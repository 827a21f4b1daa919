use chrono::NaiveDate;
use uuid::Uuid;

/// A slot as it travels on the event bus: clock times are pre-rendered `HH:MM`.
#[derive(Debug, serde::Serialize, serde::Deserialize, Clone, PartialEq, Eq)]
pub struct EventSlot {
    pub date: NaiveDate,
    pub start_time: String,
    pub end_time: String,
}

#[derive(Debug, serde::Serialize, serde::Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SlotEventKind {
    Held,
    Released,
    Booked,
}

/// Fan-out notice that the availability of some slots on a facility changed.
#[derive(Debug, serde::Serialize, serde::Deserialize, Clone)]
pub struct SlotEvent {
    pub facility_id: Uuid,
    pub kind: SlotEventKind,
    pub slots: Vec<EventSlot>,
    pub at: i64,
}

#[derive(Debug, serde::Serialize, serde::Deserialize, Clone)]
pub struct BookedSlotLine {
    pub booking_id: Uuid,
    pub slot: EventSlot,
    pub amount: i64,
}

/// Summary sent to the facility owner once a checkout has been committed.
#[derive(Debug, serde::Serialize, serde::Deserialize, Clone)]
pub struct BookingsCreatedEvent {
    pub facility_id: Uuid,
    pub owner_id: Uuid,
    pub customer_id: Uuid,
    pub total_amount: i64,
    pub lines: Vec<BookedSlotLine>,
    pub timestamp: i64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn slot_event_kind_uses_screaming_case() {
        let event = SlotEvent {
            facility_id: Uuid::nil(),
            kind: SlotEventKind::Booked,
            slots: vec![EventSlot {
                date: NaiveDate::from_ymd_opt(2025, 10, 31).unwrap(),
                start_time: "18:00".to_string(),
                end_time: "19:00".to_string(),
            }],
            at: 0,
        };
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["kind"], "BOOKED");
        assert_eq!(json["slots"][0]["date"], "2025-10-31");
    }
}
