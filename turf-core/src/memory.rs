//! In-process backends for every storage and collaborator trait.
//!
//! Each store keeps its state behind a single mutex, so a batch write is
//! atomic in the same way a database transaction is.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, MutexGuard, RwLock};

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use turf_shared::models::events::BookingsCreatedEvent;
use uuid::Uuid;

use crate::booking::{Booking, BookingStatus};
use crate::catalog::Facility;
use crate::hold::Hold;
use crate::identity::Party;
use crate::notify::Notifier;
use crate::repository::{BookingLedger, Directory, HoldAttempt, HoldStore, InsertOutcome, SlotCatalog};
use crate::slot::Slot;
use crate::{NotifyError, StoreError};

fn lock<'a, T>(mutex: &'a Mutex<T>, what: &str) -> Result<MutexGuard<'a, T>, StoreError> {
    mutex
        .lock()
        .map_err(|_| StoreError::Backend(format!("{} lock poisoned", what)))
}

#[derive(Default)]
pub struct InMemoryLedger {
    rows: Mutex<Vec<Booking>>,
    fail_next_insert: AtomicBool,
}

impl InMemoryLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes the next `insert_batch` fail as an infrastructure error.
    pub fn fail_next_insert(&self) {
        self.fail_next_insert.store(true, Ordering::SeqCst);
    }

    pub fn len(&self) -> usize {
        self.rows.lock().map(|rows| rows.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl BookingLedger for InMemoryLedger {
    async fn active_among(&self, facility_id: Uuid, slots: &[Slot]) -> Result<Vec<Slot>, StoreError> {
        let rows = lock(&self.rows, "ledger")?;
        Ok(slots
            .iter()
            .filter(|slot| {
                rows.iter()
                    .any(|b| b.facility_id == facility_id && b.slot == **slot && b.is_active())
            })
            .copied()
            .collect())
    }

    async fn active_on(&self, facility_id: Uuid, date: NaiveDate) -> Result<Vec<Slot>, StoreError> {
        let rows = lock(&self.rows, "ledger")?;
        Ok(rows
            .iter()
            .filter(|b| b.facility_id == facility_id && b.slot.date == date && b.is_active())
            .map(|b| b.slot)
            .collect())
    }

    async fn insert_batch(&self, bookings: &[Booking]) -> Result<InsertOutcome, StoreError> {
        let mut rows = lock(&self.rows, "ledger")?;

        if self.fail_next_insert.swap(false, Ordering::SeqCst) {
            return Err(StoreError::Backend("simulated write failure".to_string()));
        }

        let conflicts: Vec<Slot> = bookings
            .iter()
            .filter(|new| {
                rows.iter()
                    .any(|b| b.facility_id == new.facility_id && b.slot == new.slot && b.is_active())
            })
            .map(|b| b.slot)
            .collect();

        if !conflicts.is_empty() {
            return Ok(InsertOutcome::Conflict(conflicts));
        }

        rows.extend(bookings.iter().cloned());
        Ok(InsertOutcome::Inserted)
    }

    async fn for_customer(&self, customer_id: Uuid) -> Result<Vec<Booking>, StoreError> {
        let rows = lock(&self.rows, "ledger")?;
        let mut mine: Vec<Booking> = rows.iter().filter(|b| b.customer_id == customer_id).cloned().collect();
        mine.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(mine)
    }

    async fn get(&self, booking_id: Uuid) -> Result<Option<Booking>, StoreError> {
        let rows = lock(&self.rows, "ledger")?;
        Ok(rows.iter().find(|b| b.id == booking_id).cloned())
    }

    async fn transition(&self, booking_id: Uuid, from: BookingStatus, to: BookingStatus) -> Result<bool, StoreError> {
        let mut rows = lock(&self.rows, "ledger")?;
        match rows.iter_mut().find(|b| b.id == booking_id && b.status == from) {
            Some(booking) => {
                booking.status = to;
                Ok(true)
            }
            None => Ok(false),
        }
    }
}

#[derive(Default)]
pub struct InMemoryHoldStore {
    holds: Mutex<HashMap<(Uuid, Slot), Hold>>,
}

impl InMemoryHoldStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rows physically present, dead or alive.
    pub fn stored(&self) -> usize {
        self.holds.lock().map(|h| h.len()).unwrap_or(0)
    }
}

#[async_trait]
impl HoldStore for InMemoryHoldStore {
    async fn place(
        &self,
        facility_id: Uuid,
        customer_id: Uuid,
        slots: &[Slot],
        now: DateTime<Utc>,
        expires_at: DateTime<Utc>,
    ) -> Result<HoldAttempt, StoreError> {
        let mut holds = lock(&self.holds, "holds")?;

        let contended: Vec<Hold> = slots
            .iter()
            .filter_map(|slot| holds.get(&(facility_id, *slot)))
            .filter(|hold| hold.blocks(customer_id, now))
            .cloned()
            .collect();

        if !contended.is_empty() {
            return Ok(HoldAttempt::Contended(contended));
        }

        let placed: Vec<Hold> = slots
            .iter()
            .map(|slot| Hold { facility_id, customer_id, slot: *slot, expires_at })
            .collect();
        for hold in &placed {
            holds.insert((facility_id, hold.slot), hold.clone());
        }
        Ok(HoldAttempt::Placed(placed))
    }

    async fn live_on(&self, facility_id: Uuid, date: NaiveDate, now: DateTime<Utc>) -> Result<Vec<Hold>, StoreError> {
        let holds = lock(&self.holds, "holds")?;
        Ok(holds
            .values()
            .filter(|h| h.facility_id == facility_id && h.slot.date == date && h.is_live(now))
            .cloned()
            .collect())
    }

    async fn live_among(&self, facility_id: Uuid, slots: &[Slot], now: DateTime<Utc>) -> Result<Vec<Hold>, StoreError> {
        let holds = lock(&self.holds, "holds")?;
        Ok(slots
            .iter()
            .filter_map(|slot| holds.get(&(facility_id, *slot)))
            .filter(|h| h.is_live(now))
            .cloned()
            .collect())
    }

    async fn release(&self, facility_id: Uuid, customer_id: Uuid) -> Result<usize, StoreError> {
        let mut holds = lock(&self.holds, "holds")?;
        let before = holds.len();
        holds.retain(|_, h| !(h.facility_id == facility_id && h.customer_id == customer_id));
        Ok(before - holds.len())
    }

    async fn purge_expired(&self, now: DateTime<Utc>) -> Result<usize, StoreError> {
        let mut holds = lock(&self.holds, "holds")?;
        let before = holds.len();
        holds.retain(|_, h| h.is_live(now));
        Ok(before - holds.len())
    }
}

#[derive(Default)]
pub struct InMemoryCatalog {
    facilities: RwLock<HashMap<Uuid, Facility>>,
}

impl InMemoryCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, facility: Facility) {
        if let Ok(mut facilities) = self.facilities.write() {
            facilities.insert(facility.id, facility);
        }
    }
}

#[async_trait]
impl SlotCatalog for InMemoryCatalog {
    async fn facility(&self, facility_id: Uuid) -> Result<Option<Facility>, StoreError> {
        let facilities = self
            .facilities
            .read()
            .map_err(|_| StoreError::Backend("catalog lock poisoned".to_string()))?;
        Ok(facilities.get(&facility_id).cloned())
    }
}

#[derive(Default)]
pub struct InMemoryDirectory {
    parties: RwLock<HashMap<Uuid, Party>>,
}

impl InMemoryDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, party: Party) {
        if let Ok(mut parties) = self.parties.write() {
            parties.insert(party.id, party);
        }
    }
}

#[async_trait]
impl Directory for InMemoryDirectory {
    async fn party(&self, party_id: Uuid) -> Result<Option<Party>, StoreError> {
        let parties = self
            .parties
            .read()
            .map_err(|_| StoreError::Backend("directory lock poisoned".to_string()))?;
        Ok(parties.get(&party_id).cloned())
    }
}

/// Keeps every summary it is handed; optionally refuses them all.
#[derive(Default)]
pub struct RecordingNotifier {
    events: Mutex<Vec<BookingsCreatedEvent>>,
    failing: bool,
}

impl RecordingNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing() -> Self {
        Self { events: Mutex::new(Vec::new()), failing: true }
    }

    pub fn events(&self) -> Vec<BookingsCreatedEvent> {
        self.events.lock().map(|e| e.clone()).unwrap_or_default()
    }
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn bookings_created(&self, event: &BookingsCreatedEvent) -> Result<(), NotifyError> {
        if self.failing {
            return Err(NotifyError::Delivery("owner inbox unreachable".to_string()));
        }
        self.events
            .lock()
            .map_err(|_| NotifyError::Delivery("recorder lock poisoned".to_string()))?
            .push(event.clone());
        Ok(())
    }
}
