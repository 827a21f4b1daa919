pub mod booking;
pub mod catalog;
pub mod hold;
pub mod identity;
pub mod memory;
pub mod notify;
pub mod repository;
pub mod slot;

use std::fmt;

pub use booking::{Booking, BookingStatus};
pub use catalog::{CatalogEntry, Facility};
pub use hold::Hold;
pub use identity::{Party, Role};
pub use slot::Slot;

/// Failures of a reservation request. Slot conflicts and hold contention are
/// not errors: they are ordinary outcomes reported by the service.
#[derive(Debug, thiserror::Error)]
pub enum ReservationError {
    #[error("Validation failed: {0}")]
    Validation(String),
    #[error("Not found: {0}")]
    NotFound(String),
    #[error("Storage failure: {0}")]
    Storage(#[from] StoreError),
}

/// Failures raised by a storage backend.
#[derive(Debug, Clone, thiserror::Error)]
pub enum StoreError {
    #[error("backend error: {0}")]
    Backend(String),
    #[error("corrupt record: {0}")]
    Corrupt(String),
}

impl StoreError {
    pub fn backend(err: impl fmt::Display) -> Self {
        StoreError::Backend(err.to_string())
    }

    pub fn corrupt(err: impl fmt::Display) -> Self {
        StoreError::Corrupt(err.to_string())
    }
}

#[derive(Debug, thiserror::Error)]
pub enum NotifyError {
    #[error("notification delivery failed: {0}")]
    Delivery(String),
}

pub type CoreResult<T> = Result<T, ReservationError>;
