use std::collections::BTreeSet;

use chrono::{Datelike, NaiveDate, NaiveTime, Weekday};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::slot::{self, Slot};

/// One line of a facility's availability template.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CatalogEntry {
    /// Repeats every week on `day_of_week`.
    Recurring {
        #[serde(with = "slot::weekday_name")]
        day_of_week: Weekday,
        #[serde(with = "slot::clock")]
        start_time: NaiveTime,
        #[serde(with = "slot::clock")]
        end_time: NaiveTime,
    },
    /// A range offered on one specific date. Any override on a date replaces
    /// the recurring template for that date.
    DateOverride {
        date: NaiveDate,
        #[serde(with = "slot::clock")]
        start_time: NaiveTime,
        #[serde(with = "slot::clock")]
        end_time: NaiveTime,
    },
    /// Nothing is offered on this date.
    Closed { date: NaiveDate },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Facility {
    pub id: Uuid,
    pub owner_id: Uuid,
    pub name: String,
    pub entries: Vec<CatalogEntry>,
}

impl Facility {
    /// Resolves the template to the concrete slots offered on `date`, one per
    /// distinct clock range, ordered by start time.
    pub fn slots_on(&self, date: NaiveDate) -> Vec<Slot> {
        let closed = self
            .entries
            .iter()
            .any(|e| matches!(e, CatalogEntry::Closed { date: d } if *d == date));
        if closed {
            return Vec::new();
        }

        let overrides: BTreeSet<(NaiveTime, NaiveTime)> = self
            .entries
            .iter()
            .filter_map(|e| match e {
                CatalogEntry::DateOverride { date: d, start_time, end_time } if *d == date => {
                    Some((*start_time, *end_time))
                }
                _ => None,
            })
            .collect();

        let ranges = if overrides.is_empty() {
            let weekday = date.weekday();
            self.entries
                .iter()
                .filter_map(|e| match e {
                    CatalogEntry::Recurring { day_of_week, start_time, end_time } if *day_of_week == weekday => {
                        Some((*start_time, *end_time))
                    }
                    _ => None,
                })
                .collect()
        } else {
            overrides
        };

        ranges
            .into_iter()
            .filter(|(start, end)| slot::is_well_formed(*start, *end))
            .map(|(start, end)| Slot::new(date, start, end))
            .collect()
    }

    pub fn offers(&self, candidate: &Slot) -> bool {
        self.slots_on(candidate.date).contains(candidate)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn t(h: u32) -> NaiveTime {
        NaiveTime::from_hms_opt(h, 0, 0).unwrap()
    }

    fn friday() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 10, 31).unwrap()
    }

    fn facility(entries: Vec<CatalogEntry>) -> Facility {
        Facility {
            id: Uuid::new_v4(),
            owner_id: Uuid::new_v4(),
            name: "Riverside Turf".to_string(),
            entries,
        }
    }

    fn recurring(day: Weekday, start: u32, end: u32) -> CatalogEntry {
        CatalogEntry::Recurring { day_of_week: day, start_time: t(start), end_time: t(end) }
    }

    #[test]
    fn test_recurring_entries_dedupe_and_sort() {
        let f = facility(vec![
            recurring(Weekday::Fri, 19, 20),
            recurring(Weekday::Fri, 18, 19),
            recurring(Weekday::Fri, 18, 19),
            recurring(Weekday::Sat, 7, 8),
        ]);

        let slots = f.slots_on(friday());
        assert_eq!(slots.len(), 2);
        assert_eq!(slots[0].start_time, t(18));
        assert_eq!(slots[1].start_time, t(19));
        assert!(slots.iter().all(|s| s.date == friday()));
    }

    #[test]
    fn test_override_replaces_template_for_that_date_only() {
        let next_friday = friday() + chrono::Duration::days(7);
        let f = facility(vec![
            recurring(Weekday::Fri, 18, 19),
            CatalogEntry::DateOverride { date: friday(), start_time: t(6), end_time: t(7) },
        ]);

        let today = f.slots_on(friday());
        assert_eq!(today, vec![Slot::new(friday(), t(6), t(7))]);

        let later = f.slots_on(next_friday);
        assert_eq!(later, vec![Slot::new(next_friday, t(18), t(19))]);
    }

    #[test]
    fn test_closed_date_offers_nothing() {
        let f = facility(vec![
            recurring(Weekday::Fri, 18, 19),
            CatalogEntry::Closed { date: friday() },
        ]);
        assert!(f.slots_on(friday()).is_empty());
        assert!(!f.offers(&Slot::new(friday(), t(18), t(19))));
    }

    #[test]
    fn test_catalog_entry_wire_format() {
        let json = r#"{"kind":"RECURRING","day_of_week":"Friday","start_time":"18:00","end_time":"19:00"}"#;
        let entry: CatalogEntry = serde_json::from_str(json).unwrap();
        assert_eq!(entry, recurring(Weekday::Fri, 18, 19));
    }
}
