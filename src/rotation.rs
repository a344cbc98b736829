// Weekly reward rotation: which rotation is live at a given instant and where
// each rotation window starts and ends on the wall clock.
//
// Nothing in here reads the system clock. Every function takes `now`.

use std::num::NonZeroU32;

use chrono::{
    DateTime, Datelike, Duration, LocalResult, NaiveDate, NaiveDateTime, NaiveTime, Offset,
    TimeZone, Timelike, Utc, Weekday,
};
use serde::Serialize;

/// Start of rotation #1: Tuesday 2024-06-18 16:00 at UTC+9.
pub const DEFAULT_EPOCH_MS: i64 = 1_718_694_000_000;

pub const DEFAULT_TOTAL_ROTATIONS: NonZeroU32 = match NonZeroU32::new(20) {
    Some(n) => n,
    None => unreachable!(),
};

pub const RESET_WEEKDAY: Weekday = Weekday::Tue;
pub const RESET_HOUR: u32 = 16;

const WEEK_MS: i64 = 7 * 24 * 60 * 60 * 1000;

// ── Rotation index ───────────────────────────────────────────────────

/// Whole weeks between `epoch` and `instant`, floored toward negative infinity.
fn elapsed_weeks<Tz: TimeZone, Ep: TimeZone>(instant: &DateTime<Tz>, epoch: &DateTime<Ep>) -> i64 {
    (instant.timestamp_millis() - epoch.timestamp_millis()).div_euclid(WEEK_MS)
}

/// Map a signed step count onto `1..=total`.
fn wrap(steps: i64, total: NonZeroU32) -> u32 {
    let total = i64::from(total.get());
    // rem_euclid keeps the result in 0..total, which fits in u32
    (steps.rem_euclid(total) + 1) as u32
}

/// Rotation index (1-based) that is live at `instant`.
///
/// Instants before `epoch` count backwards from the last rotation, so one
/// week before the epoch is rotation `total_rotations`.
pub fn rotation_index_at<Tz: TimeZone, Ep: TimeZone>(
    instant: &DateTime<Tz>,
    epoch: &DateTime<Ep>,
    total_rotations: NonZeroU32,
) -> u32 {
    wrap(elapsed_weeks(instant, epoch), total_rotations)
}

/// Rotation index `offset_weeks` rotations away from the one live at `now`.
pub fn effective_rotation<Tz: TimeZone, Ep: TimeZone>(
    now: &DateTime<Tz>,
    offset_weeks: i32,
    epoch: &DateTime<Ep>,
    total_rotations: NonZeroU32,
) -> u32 {
    let current = rotation_index_at(now, epoch, total_rotations);
    wrap(i64::from(current) - 1 + i64::from(offset_weeks), total_rotations)
}

/// Clamp a caller-supplied offset to `-(total - 1)..=(total - 1)`.
pub fn clamp_offset(offset_weeks: i32, total_rotations: NonZeroU32) -> i32 {
    let max = i32::try_from(total_rotations.get() - 1).unwrap_or(i32::MAX);
    offset_weeks.clamp(-max, max)
}

// ── Weekly reset ─────────────────────────────────────────────────────

/// Calendar date of the next reset as seen from the local wall time `local`.
///
/// On reset day the reset is still ahead until the reset hour; from the
/// reset hour onward the window has turned over and the next reset is a
/// week away.
fn next_reset_date(local: &NaiveDateTime) -> NaiveDate {
    let date = local.date();
    let target = RESET_WEEKDAY.num_days_from_monday();
    let today = date.weekday().num_days_from_monday();
    let mut days_ahead = (target + 7 - today) % 7;
    if days_ahead == 0 && local.hour() >= RESET_HOUR {
        days_ahead = 7;
    }
    date + Duration::days(i64::from(days_ahead))
}

/// Move a reset date by whole weeks, saturating at the last reset dates chrono
/// can represent with room for a one-week step back and any zone offset.
fn shift_weeks(date: NaiveDate, weeks: i32) -> NaiveDate {
    let lo = NaiveDate::MIN + Duration::weeks(2);
    let hi = NaiveDate::MAX - Duration::weeks(1);
    match date.checked_add_signed(Duration::weeks(i64::from(weeks))) {
        Some(d) if (lo..=hi).contains(&d) => d,
        // Saturated dates stay on the same weekday as `date`.
        _ if weeks < 0 => lo + Duration::days(days_between(lo.weekday(), date.weekday())),
        _ => hi - Duration::days(days_between(date.weekday(), hi.weekday())),
    }
}

/// Days from `from` forward to the next `to`, `0..7`.
fn days_between(from: Weekday, to: Weekday) -> i64 {
    i64::from((to.num_days_from_monday() + 7 - from.num_days_from_monday()) % 7)
}

/// Reset instant on `date` in `tz`.
///
/// A reset hour that falls in a DST fold takes the earlier instant. One that
/// falls in a DST gap is read with the offset in effect before the gap, which
/// lands just after it, the way a wall clock skips forward.
fn reset_on<Tz: TimeZone>(tz: &Tz, date: NaiveDate) -> DateTime<Tz> {
    let local = date.and_time(NaiveTime::default()) + Duration::hours(i64::from(RESET_HOUR));
    match tz.from_local_datetime(&local) {
        LocalResult::Single(dt) => dt,
        LocalResult::Ambiguous(earliest, _) => earliest,
        LocalResult::None => {
            // A day back is safely before the transition.
            let offset = tz.offset_from_utc_datetime(&(local - Duration::days(1))).fix();
            let utc = local - Duration::seconds(i64::from(offset.local_minus_utc()));
            tz.from_utc_datetime(&utc)
        }
    }
}

/// Next weekly reset (Tuesday 16:00 local) after `now`.
///
/// Windows are half-open, so at exactly the reset instant the new window has
/// already begun and the result is one week later.
pub fn next_weekly_reset<Tz: TimeZone>(now: &DateTime<Tz>) -> DateTime<Tz> {
    reset_on(&now.timezone(), next_reset_date(&now.naive_local()))
}

/// Time left until the next weekly reset. Always positive.
pub fn time_until_reset<Tz: TimeZone>(now: &DateTime<Tz>) -> Duration {
    next_weekly_reset(now).signed_duration_since(now.clone())
}

// ── Windows ──────────────────────────────────────────────────────────

/// Wall-clock span `[start, end)` of one rotation.
#[derive(Debug, Clone, PartialEq)]
pub struct RotationWindow<Tz: TimeZone> {
    pub start: DateTime<Tz>,
    pub end: DateTime<Tz>,
}

impl<Tz: TimeZone> RotationWindow<Tz> {
    pub fn contains<Tz2: TimeZone>(&self, instant: &DateTime<Tz2>) -> bool {
        let t = instant.timestamp_millis();
        self.start.timestamp_millis() <= t && t < self.end.timestamp_millis()
    }

    /// Usually one week; an hour less or more across a DST change.
    pub fn length(&self) -> Duration {
        self.end.clone().signed_duration_since(self.start.clone())
    }
}

/// Window of the rotation `offset_weeks` away from the one live at `now`.
///
/// Week steps are taken on the local calendar so both ends stay on the reset
/// hour even across DST changes. Windows for consecutive offsets share their
/// boundary exactly. Offsets that reach past chrono's calendar (a few hundred
/// thousand years out) saturate at the last representable window.
pub fn rotation_window<Tz: TimeZone>(offset_weeks: i32, now: &DateTime<Tz>) -> RotationWindow<Tz> {
    let tz = now.timezone();
    let end_date = shift_weeks(next_reset_date(&now.naive_local()), offset_weeks);
    let start_date = end_date - Duration::weeks(1);
    RotationWindow {
        start: reset_on(&tz, start_date),
        end: reset_on(&tz, end_date),
    }
}

// ── Remaining time ───────────────────────────────────────────────────

/// Raw breakdown of a countdown. Rendering it as text is up to the client.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct RemainingTime {
    pub total_seconds: i64,
    pub days: i64,
    pub hours: i64,
    pub minutes: i64,
    pub seconds: i64,
}

impl RemainingTime {
    pub fn from_duration(d: Duration) -> Self {
        let total_seconds = d.num_seconds().max(0);
        Self {
            total_seconds,
            days: total_seconds / 86_400,
            hours: total_seconds % 86_400 / 3_600,
            minutes: total_seconds % 3_600 / 60,
            seconds: total_seconds % 60,
        }
    }
}

// ── Schedule ─────────────────────────────────────────────────────────

/// Epoch and cycle length of a rotation schedule.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RotationSchedule {
    pub epoch: DateTime<Utc>,
    pub total_rotations: NonZeroU32,
}

/// Everything a client needs to show one rotation.
#[derive(Debug, Clone, PartialEq)]
pub struct RotationSnapshot<Tz: TimeZone> {
    /// Rotation live at `now`.
    pub current_rotation: u32,
    /// Rotation selected by `offset`.
    pub rotation: u32,
    pub offset: i32,
    pub window: RotationWindow<Tz>,
    pub remaining: RemainingTime,
}

impl RotationSchedule {
    pub fn new(epoch: DateTime<Utc>, total_rotations: NonZeroU32) -> Self {
        Self {
            epoch,
            total_rotations,
        }
    }

    /// Returns `None` if `epoch_ms` is outside chrono's representable range.
    pub fn from_epoch_millis(epoch_ms: i64, total_rotations: NonZeroU32) -> Option<Self> {
        let epoch = Utc.timestamp_millis_opt(epoch_ms).single()?;
        Some(Self::new(epoch, total_rotations))
    }

    pub fn index_at<Tz: TimeZone>(&self, instant: &DateTime<Tz>) -> u32 {
        rotation_index_at(instant, &self.epoch, self.total_rotations)
    }

    pub fn effective<Tz: TimeZone>(&self, now: &DateTime<Tz>, offset_weeks: i32) -> u32 {
        effective_rotation(now, offset_weeks, &self.epoch, self.total_rotations)
    }

    pub fn clamp_offset(&self, offset_weeks: i32) -> i32 {
        clamp_offset(offset_weeks, self.total_rotations)
    }

    /// Whether the epoch falls on a weekly reset in `tz`. When it doesn't, the
    /// index turns over at a different time than the window boundaries.
    pub fn epoch_is_reset_in<Tz: TimeZone>(&self, tz: &Tz) -> bool {
        let local = self.epoch.with_timezone(tz);
        rotation_window(0, &local).start == local
    }

    /// Rotation, window and countdown for `offset_weeks` relative to `now`.
    /// The offset is used as given; clamp it first if it comes from a user.
    pub fn snapshot<Tz: TimeZone>(&self, now: &DateTime<Tz>, offset_weeks: i32) -> RotationSnapshot<Tz> {
        RotationSnapshot {
            current_rotation: self.index_at(now),
            rotation: self.effective(now, offset_weeks),
            offset: offset_weeks,
            window: rotation_window(offset_weeks, now),
            remaining: RemainingTime::from_duration(time_until_reset(now)),
        }
    }
}

impl Default for RotationSchedule {
    fn default() -> Self {
        Self {
            epoch: Utc
                .timestamp_millis_opt(DEFAULT_EPOCH_MS)
                .single()
                .unwrap_or_default(),
            total_rotations: DEFAULT_TOTAL_ROTATIONS,
        }
    }
}
