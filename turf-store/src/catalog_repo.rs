use async_trait::async_trait;
use chrono::{NaiveDate, NaiveTime};
use sqlx::PgPool;
use turf_core::repository::SlotCatalog;
use turf_core::slot;
use turf_core::{CatalogEntry, Facility, StoreError};
use uuid::Uuid;

/// Read-only view of the facility tables maintained by facility management.
pub struct PgSlotCatalog {
    pool: PgPool,
}

impl PgSlotCatalog {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(sqlx::FromRow)]
struct FacilityRow {
    id: Uuid,
    owner_id: Uuid,
    name: String,
}

#[derive(sqlx::FromRow)]
struct EntryRow {
    id: Uuid,
    kind: String,
    day_of_week: Option<String>,
    slot_date: Option<NaiveDate>,
    start_time: Option<NaiveTime>,
    end_time: Option<NaiveTime>,
}

impl TryFrom<EntryRow> for CatalogEntry {
    type Error = StoreError;

    fn try_from(row: EntryRow) -> Result<Self, Self::Error> {
        let missing = |column: &str| StoreError::corrupt(format!("catalog entry {} has no {}", row.id, column));

        match row.kind.as_str() {
            "recurring" => {
                let raw_day = row.day_of_week.as_deref().ok_or_else(|| missing("day_of_week"))?;
                let day_of_week = slot::parse_day(raw_day)
                    .ok_or_else(|| StoreError::corrupt(format!("catalog entry {} has weekday '{}'", row.id, raw_day)))?;
                Ok(CatalogEntry::Recurring {
                    day_of_week,
                    start_time: row.start_time.ok_or_else(|| missing("start_time"))?,
                    end_time: row.end_time.ok_or_else(|| missing("end_time"))?,
                })
            }
            "date_override" => Ok(CatalogEntry::DateOverride {
                date: row.slot_date.ok_or_else(|| missing("slot_date"))?,
                start_time: row.start_time.ok_or_else(|| missing("start_time"))?,
                end_time: row.end_time.ok_or_else(|| missing("end_time"))?,
            }),
            "closed" => Ok(CatalogEntry::Closed { date: row.slot_date.ok_or_else(|| missing("slot_date"))? }),
            other => Err(StoreError::corrupt(format!("catalog entry {} has kind '{}'", row.id, other))),
        }
    }
}

#[async_trait]
impl SlotCatalog for PgSlotCatalog {
    async fn facility(&self, facility_id: Uuid) -> Result<Option<Facility>, StoreError> {
        let facility: Option<FacilityRow> = sqlx::query_as("SELECT id, owner_id, name FROM facilities WHERE id = $1")
            .bind(facility_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(StoreError::backend)?;

        let Some(facility) = facility else {
            return Ok(None);
        };

        let rows: Vec<EntryRow> = sqlx::query_as(
            r#"
            SELECT id, kind, day_of_week, slot_date, start_time, end_time
            FROM facility_slots
            WHERE facility_id = $1
            "#,
        )
        .bind(facility_id)
        .fetch_all(&self.pool)
        .await
        .map_err(StoreError::backend)?;

        let entries = rows
            .into_iter()
            .map(CatalogEntry::try_from)
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Some(Facility { id: facility.id, owner_id: facility.owner_id, name: facility.name, entries }))
    }
}
