// Reward dataset: maps, battle zones and the per-rotation rewards each zone
// drops, plus the filtering used to show one rotation's rewards.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::locale::Locale;

/// File name of a locale's dataset inside `<data_dir>/<locale>/`.
pub const REWARD_FILE: &str = "reward.json";

/// Filter value that means "no constraint".
pub const ALL: &str = "all";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Reward {
    pub rotation: u32,
    pub reward_type: Option<String>,
    pub reactor_element_type: Option<String>,
    pub weapon_rounds_type: Option<String>,
    pub arche_type: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BattleZone {
    pub battle_zone_id: Option<String>,
    pub battle_zone_name: String,
    #[serde(default)]
    pub reward: Vec<Reward>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MapData {
    pub map_id: String,
    pub map_name: String,
    #[serde(default)]
    pub battle_zone: Vec<BattleZone>,
}

/// One reward with the map and battle zone it drops in.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RewardEntry {
    pub map_name: String,
    pub battle_zone_name: String,
    #[serde(flatten)]
    pub reward: Reward,
}

// ── Filtering ────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortKey {
    #[default]
    RewardType,
    BattleZoneName,
}

impl SortKey {
    pub fn from_param(s: &str) -> Option<Self> {
        match s {
            "reward_type" => Some(Self::RewardType),
            "battle_zone_name" => Some(Self::BattleZoneName),
            _ => None,
        }
    }

    fn key<'a>(&self, entry: &'a RewardEntry) -> &'a str {
        match self {
            Self::RewardType => entry.reward.reward_type.as_deref().unwrap_or(""),
            Self::BattleZoneName => &entry.battle_zone_name,
        }
    }
}

/// Constraints on the rewards of one rotation. `None` matches anything.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RewardFilter {
    pub map: Option<String>,
    pub reward_type: Option<String>,
    pub reactor_element_type: Option<String>,
    pub weapon_rounds_type: Option<String>,
    pub arche_type: Option<String>,
    pub sort_by: SortKey,
}

/// Normalize a raw filter value: empty and `"all"` become no constraint.
pub fn constraint(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.is_empty() && v != ALL)
}

fn field_matches(wanted: &Option<String>, actual: &Option<String>) -> bool {
    match wanted {
        None => true,
        Some(w) => actual.as_deref() == Some(w.as_str()),
    }
}

impl RewardFilter {
    fn matches_map(&self, map: &MapData) -> bool {
        self.map.as_deref().map_or(true, |m| m == map.map_name)
    }

    fn matches_reward(&self, reward: &Reward) -> bool {
        field_matches(&self.reward_type, &reward.reward_type)
            && field_matches(&self.reactor_element_type, &reward.reactor_element_type)
            && field_matches(&self.weapon_rounds_type, &reward.weapon_rounds_type)
            && field_matches(&self.arche_type, &reward.arche_type)
    }
}

// ── Catalog ──────────────────────────────────────────────────────────

/// Reward dataset for a single locale.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RewardCatalog {
    maps: Vec<MapData>,
}

impl RewardCatalog {
    /// Build a catalog, dropping maps that have no identified battle zone.
    pub fn from_maps(maps: Vec<MapData>) -> Self {
        let maps = maps
            .into_iter()
            .filter(|m| m.battle_zone.iter().any(|z| z.battle_zone_id.is_some()))
            .collect();
        Self { maps }
    }

    pub fn from_json(path: &Path, json: &str) -> Result<Self> {
        let maps: Vec<MapData> = serde_json::from_str(json).map_err(|source| Error::Json {
            path: path.to_path_buf(),
            source,
        })?;
        Ok(Self::from_maps(maps))
    }

    pub fn load(path: &Path) -> Result<Self> {
        let json = std::fs::read_to_string(path).map_err(|source| Error::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json(path, &json)
    }

    pub fn maps(&self) -> &[MapData] {
        &self.maps
    }

    /// Map names in dataset order.
    pub fn map_names(&self) -> Vec<&str> {
        self.maps.iter().map(|m| m.map_name.as_str()).collect()
    }

    /// Total number of reward rows across all maps and zones.
    pub fn len(&self) -> usize {
        self.maps
            .iter()
            .flat_map(|m| &m.battle_zone)
            .map(|z| z.reward.len())
            .sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Rewards dropping in `rotation` that pass `filter`, sorted by the
    /// filter's sort key. The sort is stable, so ties keep dataset order.
    pub fn rewards_for(&self, rotation: u32, filter: &RewardFilter) -> Vec<RewardEntry> {
        let mut entries: Vec<RewardEntry> = self
            .maps
            .iter()
            .filter(|m| filter.matches_map(m))
            .flat_map(move |m| {
                m.battle_zone.iter().flat_map(move |z| {
                    z.reward
                        .iter()
                        .filter(move |r| r.rotation == rotation && filter.matches_reward(r))
                        .map(move |r| RewardEntry {
                            map_name: m.map_name.clone(),
                            battle_zone_name: z.battle_zone_name.clone(),
                            reward: r.clone(),
                        })
                })
            })
            .collect();

        let sort_by = filter.sort_by;
        entries.sort_by(|a, b| sort_by.key(a).cmp(sort_by.key(b)));
        entries
    }
}

/// Path of a locale's dataset under `data_dir`.
pub fn dataset_path(data_dir: &Path, locale: Locale) -> PathBuf {
    data_dir.join(locale.code()).join(REWARD_FILE)
}

/// Reward catalogs keyed by locale.
#[derive(Debug, Clone, Default)]
pub struct LocalizedCatalogs {
    catalogs: HashMap<Locale, RewardCatalog>,
}

impl LocalizedCatalogs {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load every locale found under `data_dir`.
    ///
    /// A locale whose file is missing is skipped with a warning. A file that
    /// exists but can't be read or parsed is an error.
    pub fn load_dir(data_dir: &Path) -> Result<Self> {
        let mut out = Self::new();
        for locale in Locale::ALL {
            let path = dataset_path(data_dir, locale);
            if !path.is_file() {
                tracing::warn!("No reward dataset for locale {locale} at {}", path.display());
                continue;
            }
            let catalog = RewardCatalog::load(&path)?;
            tracing::info!(
                "Loaded {} rewards across {} maps for locale {locale}",
                catalog.len(),
                catalog.maps().len()
            );
            out.insert(locale, catalog);
        }
        Ok(out)
    }

    pub fn insert(&mut self, locale: Locale, catalog: RewardCatalog) {
        self.catalogs.insert(locale, catalog);
    }

    pub fn get(&self, locale: Locale) -> Option<&RewardCatalog> {
        self.catalogs.get(&locale)
    }

    pub fn iter(&self) -> impl Iterator<Item = (Locale, &RewardCatalog)> {
        self.catalogs.iter().map(|(l, c)| (*l, c))
    }

    pub fn is_empty(&self) -> bool {
        self.catalogs.is_empty()
    }
}
