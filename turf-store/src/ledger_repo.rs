use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use sqlx::PgPool;
use turf_core::repository::{BookingLedger, InsertOutcome};
use turf_core::slot::{self, Slot};
use turf_core::{Booking, BookingStatus, StoreError};
use turf_shared::pii::Masked;
use uuid::Uuid;

const BOOKING_COLUMNS: &str = "id, facility_id, customer_id, owner_id, day_of_week, slot_date, start_time, end_time, amount, status, payment_ref, created_at";

pub struct PgBookingLedger {
    pool: PgPool,
}

impl PgBookingLedger {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(sqlx::FromRow)]
struct SlotRow {
    slot_date: NaiveDate,
    start_time: NaiveTime,
    end_time: NaiveTime,
}

impl From<SlotRow> for Slot {
    fn from(row: SlotRow) -> Self {
        Slot::new(row.slot_date, row.start_time, row.end_time)
    }
}

#[derive(sqlx::FromRow)]
struct BookingRow {
    id: Uuid,
    facility_id: Uuid,
    customer_id: Uuid,
    owner_id: Uuid,
    day_of_week: String,
    slot_date: NaiveDate,
    start_time: NaiveTime,
    end_time: NaiveTime,
    amount: i64,
    status: String,
    payment_ref: String,
    created_at: DateTime<Utc>,
}

impl TryFrom<BookingRow> for Booking {
    type Error = StoreError;

    fn try_from(row: BookingRow) -> Result<Self, Self::Error> {
        let status: BookingStatus = row
            .status
            .parse()
            .map_err(|_| StoreError::corrupt(format!("booking {} has status '{}'", row.id, row.status)))?;
        let day_of_week = slot::parse_day(&row.day_of_week)
            .ok_or_else(|| StoreError::corrupt(format!("booking {} has weekday '{}'", row.id, row.day_of_week)))?;

        Ok(Booking {
            id: row.id,
            facility_id: row.facility_id,
            customer_id: row.customer_id,
            owner_id: row.owner_id,
            day_of_week,
            slot: Slot::new(row.slot_date, row.start_time, row.end_time),
            amount: row.amount,
            status,
            payment_ref: Masked(row.payment_ref),
            created_at: row.created_at,
        })
    }
}

/// Column-wise arrays for `UNNEST`.
fn slot_columns(slots: &[Slot]) -> (Vec<NaiveDate>, Vec<NaiveTime>, Vec<NaiveTime>) {
    let dates = slots.iter().map(|s| s.date).collect();
    let starts = slots.iter().map(|s| s.start_time).collect();
    let ends = slots.iter().map(|s| s.end_time).collect();
    (dates, starts, ends)
}

#[async_trait]
impl BookingLedger for PgBookingLedger {
    async fn active_among(&self, facility_id: Uuid, slots: &[Slot]) -> Result<Vec<Slot>, StoreError> {
        let (dates, starts, ends) = slot_columns(slots);
        let rows: Vec<SlotRow> = sqlx::query_as(
            r#"
            SELECT b.slot_date, b.start_time, b.end_time
            FROM bookings b
            JOIN UNNEST($2::date[], $3::time[], $4::time[]) AS wanted(slot_date, start_time, end_time)
              ON b.slot_date = wanted.slot_date
             AND b.start_time = wanted.start_time
             AND b.end_time = wanted.end_time
            WHERE b.facility_id = $1 AND b.status IN ('pending', 'confirmed')
            ORDER BY b.slot_date, b.start_time
            "#,
        )
        .bind(facility_id)
        .bind(dates)
        .bind(starts)
        .bind(ends)
        .fetch_all(&self.pool)
        .await
        .map_err(StoreError::backend)?;

        Ok(rows.into_iter().map(Slot::from).collect())
    }

    async fn active_on(&self, facility_id: Uuid, date: NaiveDate) -> Result<Vec<Slot>, StoreError> {
        let rows: Vec<SlotRow> = sqlx::query_as(
            r#"
            SELECT slot_date, start_time, end_time
            FROM bookings
            WHERE facility_id = $1 AND slot_date = $2 AND status IN ('pending', 'confirmed')
            "#,
        )
        .bind(facility_id)
        .bind(date)
        .fetch_all(&self.pool)
        .await
        .map_err(StoreError::backend)?;

        Ok(rows.into_iter().map(Slot::from).collect())
    }

    async fn insert_batch(&self, bookings: &[Booking]) -> Result<InsertOutcome, StoreError> {
        let mut tx = self.pool.begin().await.map_err(StoreError::backend)?;
        let mut conflicts = Vec::new();

        for booking in bookings {
            // The partial unique index arbitrates concurrent writers; a row
            // that comes back empty lost to an active booking.
            let inserted: Option<(Uuid,)> = sqlx::query_as(
                r#"
                INSERT INTO bookings (id, facility_id, customer_id, owner_id, day_of_week, slot_date, start_time, end_time, amount, status, payment_ref, created_at)
                VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)
                ON CONFLICT (facility_id, slot_date, start_time, end_time)
                    WHERE status IN ('pending', 'confirmed')
                    DO NOTHING
                RETURNING id
                "#,
            )
            .bind(booking.id)
            .bind(booking.facility_id)
            .bind(booking.customer_id)
            .bind(booking.owner_id)
            .bind(slot::day_name(booking.day_of_week))
            .bind(booking.slot.date)
            .bind(booking.slot.start_time)
            .bind(booking.slot.end_time)
            .bind(booking.amount)
            .bind(booking.status.as_str())
            .bind(booking.payment_ref.expose())
            .bind(booking.created_at)
            .fetch_optional(&mut *tx)
            .await
            .map_err(StoreError::backend)?;

            if inserted.is_none() {
                conflicts.push(booking.slot);
            }
        }

        if !conflicts.is_empty() {
            tx.rollback().await.map_err(StoreError::backend)?;
            return Ok(InsertOutcome::Conflict(conflicts));
        }

        tx.commit().await.map_err(StoreError::backend)?;
        Ok(InsertOutcome::Inserted)
    }

    async fn for_customer(&self, customer_id: Uuid) -> Result<Vec<Booking>, StoreError> {
        let rows: Vec<BookingRow> = sqlx::query_as(&format!(
            "SELECT {} FROM bookings WHERE customer_id = $1 ORDER BY created_at DESC, slot_date, start_time",
            BOOKING_COLUMNS
        ))
        .bind(customer_id)
        .fetch_all(&self.pool)
        .await
        .map_err(StoreError::backend)?;

        rows.into_iter().map(Booking::try_from).collect()
    }

    async fn get(&self, booking_id: Uuid) -> Result<Option<Booking>, StoreError> {
        let row: Option<BookingRow> = sqlx::query_as(&format!("SELECT {} FROM bookings WHERE id = $1", BOOKING_COLUMNS))
            .bind(booking_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(StoreError::backend)?;

        row.map(Booking::try_from).transpose()
    }

    async fn transition(&self, booking_id: Uuid, from: BookingStatus, to: BookingStatus) -> Result<bool, StoreError> {
        let result = sqlx::query("UPDATE bookings SET status = $3, updated_at = NOW() WHERE id = $1 AND status = $2")
            .bind(booking_id)
            .bind(from.as_str())
            .bind(to.as_str())
            .execute(&self.pool)
            .await
            .map_err(StoreError::backend)?;

        Ok(result.rows_affected() == 1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(status: &str, day: &str) -> BookingRow {
        BookingRow {
            id: Uuid::new_v4(),
            facility_id: Uuid::new_v4(),
            customer_id: Uuid::new_v4(),
            owner_id: Uuid::new_v4(),
            day_of_week: day.to_string(),
            slot_date: NaiveDate::from_ymd_opt(2025, 10, 31).unwrap(),
            start_time: NaiveTime::from_hms_opt(18, 0, 0).unwrap(),
            end_time: NaiveTime::from_hms_opt(19, 0, 0).unwrap(),
            amount: 1500,
            status: status.to_string(),
            payment_ref: "receipt-7".to_string(),
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_row_maps_to_booking() {
        let booking = Booking::try_from(row("confirmed", "Friday")).unwrap();
        assert_eq!(booking.status, BookingStatus::Confirmed);
        assert_eq!(booking.day_of_week, chrono::Weekday::Fri);
        assert_eq!(booking.slot.to_string(), "2025-10-31 18:00-19:00");
        assert_eq!(booking.payment_ref.expose(), "receipt-7");
    }

    #[test]
    fn test_unknown_status_is_corrupt() {
        let err = Booking::try_from(row("cancelled", "Friday")).unwrap_err();
        assert!(matches!(err, StoreError::Corrupt(_)));

        let err = Booking::try_from(row("pending", "Funday")).unwrap_err();
        assert!(matches!(err, StoreError::Corrupt(_)));
    }

    #[test]
    fn test_slot_columns_keep_order() {
        let date = NaiveDate::from_ymd_opt(2025, 11, 7).unwrap();
        let slots = vec![
            Slot::new(date, NaiveTime::from_hms_opt(20, 0, 0).unwrap(), NaiveTime::from_hms_opt(21, 0, 0).unwrap()),
            Slot::new(date, NaiveTime::from_hms_opt(23, 0, 0).unwrap(), NaiveTime::MIN),
        ];
        let (dates, starts, ends) = slot_columns(&slots);
        assert_eq!(dates, vec![date, date]);
        assert_eq!(starts[1], NaiveTime::from_hms_opt(23, 0, 0).unwrap());
        assert_eq!(ends[1], NaiveTime::MIN);
    }
}
