use std::collections::HashSet;
use std::fmt;

use chrono::{Datelike, NaiveDate, NaiveTime, Weekday};
use serde::{Deserialize, Serialize};
use turf_shared::models::events::EventSlot;

use crate::ReservationError;

pub const MIDNIGHT: NaiveTime = NaiveTime::MIN;

/// A concrete bookable interval: one facility-independent `(date, start, end)` triple.
///
/// Ordering is by date, then start, then end, which is the display order used
/// everywhere slots are listed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Slot {
    pub date: NaiveDate,
    #[serde(with = "clock")]
    pub start_time: NaiveTime,
    #[serde(with = "clock")]
    pub end_time: NaiveTime,
}

impl Slot {
    pub fn new(date: NaiveDate, start_time: NaiveTime, end_time: NaiveTime) -> Self {
        Self { date, start_time, end_time }
    }

    pub fn weekday(&self) -> Weekday {
        self.date.weekday()
    }

    pub fn is_well_formed(&self) -> bool {
        is_well_formed(self.start_time, self.end_time)
    }
}

impl fmt::Display for Slot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {}-{}",
            self.date,
            self.start_time.format("%H:%M"),
            self.end_time.format("%H:%M")
        )
    }
}

impl From<&Slot> for EventSlot {
    fn from(slot: &Slot) -> Self {
        EventSlot {
            date: slot.date,
            start_time: slot.start_time.format("%H:%M").to_string(),
            end_time: slot.end_time.format("%H:%M").to_string(),
        }
    }
}

/// An end of `00:00` closes the day; any other end must come after the start.
pub fn is_well_formed(start: NaiveTime, end: NaiveTime) -> bool {
    end > start || (end == MIDNIGHT && start != MIDNIGHT)
}

/// Checks a customer's selection before any storage is touched.
pub fn validate_selection(slots: &[Slot]) -> Result<(), ReservationError> {
    if slots.is_empty() {
        return Err(ReservationError::Validation("at least one slot is required".to_string()));
    }

    let mut seen = HashSet::with_capacity(slots.len());
    for slot in slots {
        if !slot.is_well_formed() {
            return Err(ReservationError::Validation(format!(
                "slot {} must end after it starts",
                slot
            )));
        }
        if !seen.insert(*slot) {
            return Err(ReservationError::Validation(format!("slot {} selected twice", slot)));
        }
    }
    Ok(())
}

pub fn parse_date(raw: &str) -> Result<NaiveDate, ReservationError> {
    NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d")
        .map_err(|_| ReservationError::Validation(format!("invalid date '{}', expected YYYY-MM-DD", raw)))
}

pub fn parse_clock(raw: &str) -> Option<NaiveTime> {
    let raw = raw.trim();
    NaiveTime::parse_from_str(raw, "%H:%M")
        .or_else(|_| NaiveTime::parse_from_str(raw, "%H:%M:%S"))
        .ok()
}

pub fn day_name(day: Weekday) -> &'static str {
    match day {
        Weekday::Mon => "Monday",
        Weekday::Tue => "Tuesday",
        Weekday::Wed => "Wednesday",
        Weekday::Thu => "Thursday",
        Weekday::Fri => "Friday",
        Weekday::Sat => "Saturday",
        Weekday::Sun => "Sunday",
    }
}

/// Accepts full or abbreviated English names in any case.
pub fn parse_day(raw: &str) -> Option<Weekday> {
    raw.trim().parse::<Weekday>().ok()
}

/// `HH:MM` on the wire; `HH:MM:SS` is also accepted on input.
pub mod clock {
    use chrono::NaiveTime;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S>(time: &NaiveTime, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.collect_str(&time.format("%H:%M"))
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<NaiveTime, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = String::deserialize(deserializer)?;
        super::parse_clock(&raw)
            .ok_or_else(|| serde::de::Error::custom(format!("invalid clock time '{}', expected HH:MM", raw)))
    }
}

/// Full English weekday names on the wire.
pub mod weekday_name {
    use chrono::Weekday;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S>(day: &Weekday, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(super::day_name(*day))
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Weekday, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = String::deserialize(deserializer)?;
        super::parse_day(&raw).ok_or_else(|| serde::de::Error::custom(format!("invalid weekday '{}'", raw)))
    }
}
