use async_trait::async_trait;
use sqlx::PgPool;
use turf_core::repository::Directory;
use turf_core::{Party, Role, StoreError};
use uuid::Uuid;

pub struct PgDirectory {
    pool: PgPool,
}

impl PgDirectory {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(sqlx::FromRow)]
struct PartyRow {
    id: Uuid,
    role: String,
    display_name: String,
}

impl TryFrom<PartyRow> for Party {
    type Error = StoreError;

    fn try_from(row: PartyRow) -> Result<Self, Self::Error> {
        let role: Role = row
            .role
            .parse()
            .map_err(|_| StoreError::corrupt(format!("party {} has role '{}'", row.id, row.role)))?;
        Ok(Party { id: row.id, role, display_name: row.display_name })
    }
}

#[async_trait]
impl Directory for PgDirectory {
    async fn party(&self, party_id: Uuid) -> Result<Option<Party>, StoreError> {
        let row: Option<PartyRow> = sqlx::query_as("SELECT id, role, display_name FROM parties WHERE id = $1")
            .bind(party_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(StoreError::backend)?;

        row.map(Party::try_from).transpose()
    }
}
