use sqlx::SqlitePool;

use super::{entity::*, error::CounterpartyError};
use crate::errors::CorruptRow;

const TABLE: &str = "conto_counterparties";

#[derive(Debug, Clone)]
pub(super) struct CounterpartyRepo {
    pool: SqlitePool,
}

#[derive(sqlx::FromRow)]
struct CounterpartyRow {
    id: String,
    name: String,
    external_id: Option<String>,
    display_balance: String,
    created_at: String,
}

impl TryFrom<CounterpartyRow> for CounterpartyAccountValues {
    type Error = CorruptRow;

    fn try_from(row: CounterpartyRow) -> Result<Self, Self::Error> {
        Ok(Self {
            id: CorruptRow::parse(TABLE, "id", &row.id)?,
            name: row.name,
            external_id: row.external_id,
            display_balance: CorruptRow::parse(TABLE, "display_balance", &row.display_balance)?,
            created_at: CorruptRow::parse(TABLE, "created_at", &row.created_at)?,
        })
    }
}

impl CounterpartyRepo {
    pub fn new(pool: &SqlitePool) -> Self {
        Self { pool: pool.clone() }
    }

    pub(super) async fn create(
        &self,
        values: &CounterpartyAccountValues,
    ) -> Result<(), CounterpartyError> {
        let res = sqlx::query(
            r#"INSERT INTO conto_counterparties (id, name, external_id, display_balance, created_at)
               VALUES (?1, ?2, ?3, ?4, ?5)"#,
        )
        .bind(values.id.to_string())
        .bind(&values.name)
        .bind(&values.external_id)
        .bind(values.display_balance.to_string())
        .bind(values.created_at.to_rfc3339())
        .execute(&self.pool)
        .await;
        match res {
            Ok(_) => Ok(()),
            Err(sqlx::Error::Database(e))
                if e.kind() == sqlx::error::ErrorKind::UniqueViolation =>
            {
                Err(CounterpartyError::DuplicateExternalId(
                    values.external_id.clone().unwrap_or_default(),
                ))
            }
            Err(e) => Err(e.into()),
        }
    }

    pub(super) async fn find_by_id(
        &self,
        id: CounterpartyId,
    ) -> Result<CounterpartyAccountValues, CounterpartyError> {
        let row = sqlx::query_as::<_, CounterpartyRow>(
            r#"SELECT id, name, external_id, display_balance, created_at
               FROM conto_counterparties WHERE id = ?1"#,
        )
        .bind(id.to_string())
        .fetch_optional(&self.pool)
        .await?;
        match row {
            Some(row) => Ok(row.try_into()?),
            None => Err(CounterpartyError::NotFound(id)),
        }
    }

    pub(super) async fn list(&self) -> Result<Vec<CounterpartyAccountValues>, CounterpartyError> {
        let rows = sqlx::query_as::<_, CounterpartyRow>(
            r#"SELECT id, name, external_id, display_balance, created_at
               FROM conto_counterparties ORDER BY name, id"#,
        )
        .fetch_all(&self.pool)
        .await?;
        rows.into_iter()
            .map(|row| Ok(row.try_into()?))
            .collect()
    }
}
