pub mod api;
pub mod clock;
pub mod config;
pub mod error;
pub mod llms_txt;
pub mod locale;
pub mod metrics;
pub mod rewards;
pub mod rotation;
