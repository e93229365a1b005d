use rust_decimal::Decimal;
use sqlx::{Executor, Sqlite, SqlitePool};

use super::{entity::*, error::StockError};
use crate::{
    errors::CorruptRow,
    primitives::{DocumentRef, DocumentType, ProductId, StockDirection},
};

const TABLE: &str = "conto_stock_movements";

const SELECT_COLUMNS: &str =
    "id, product_id, document_type, document_id, direction, quantity, occurred_on, created_at";

#[derive(Debug, Clone)]
pub(super) struct StockMovementRepo {
    pool: SqlitePool,
}

#[derive(sqlx::FromRow)]
struct StockMovementRow {
    id: String,
    product_id: String,
    document_type: Option<String>,
    document_id: Option<String>,
    direction: String,
    quantity: String,
    occurred_on: String,
    created_at: String,
}

impl TryFrom<StockMovementRow> for StockMovementValues {
    type Error = CorruptRow;

    fn try_from(row: StockMovementRow) -> Result<Self, Self::Error> {
        let document_ref = match (&row.document_type, &row.document_id) {
            (Some(doc_type), Some(doc_id)) => Some(DocumentRef {
                doc_type: CorruptRow::parse(TABLE, "document_type", doc_type)?,
                doc_id: CorruptRow::parse(TABLE, "document_id", doc_id)?,
            }),
            (None, None) => None,
            _ => {
                return Err(CorruptRow {
                    table: TABLE,
                    column: "document_type",
                    reason: "half-populated document reference".to_string(),
                })
            }
        };
        Ok(Self {
            id: CorruptRow::parse(TABLE, "id", &row.id)?,
            product_id: CorruptRow::parse(TABLE, "product_id", &row.product_id)?,
            document_ref,
            direction: CorruptRow::parse(TABLE, "direction", &row.direction)?,
            quantity: CorruptRow::parse(TABLE, "quantity", &row.quantity)?,
            occurred_on: CorruptRow::parse(TABLE, "occurred_on", &row.occurred_on)?,
            created_at: CorruptRow::parse(TABLE, "created_at", &row.created_at)?,
        })
    }
}

impl StockMovementRepo {
    pub fn new(pool: &SqlitePool) -> Self {
        Self { pool: pool.clone() }
    }

    pub(super) async fn create<'a>(
        &self,
        executor: impl Executor<'a, Database = Sqlite>,
        values: &StockMovementValues,
    ) -> Result<(), StockError> {
        sqlx::query(
            r#"INSERT INTO conto_stock_movements (
                 id, product_id, document_type, document_id, direction,
                 quantity, occurred_on, created_at
               ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)"#,
        )
        .bind(values.id.to_string())
        .bind(values.product_id.to_string())
        .bind(values.document_ref.map(|d| d.doc_type.to_string()))
        .bind(values.document_ref.map(|d| d.doc_id.to_string()))
        .bind(values.direction.to_string())
        .bind(values.quantity.to_string())
        .bind(values.occurred_on.to_string())
        .bind(values.created_at.to_rfc3339())
        .execute(executor)
        .await?;
        Ok(())
    }

    pub(super) async fn delete_by_document<'a>(
        &self,
        executor: impl Executor<'a, Database = Sqlite>,
        doc_type: DocumentType,
        doc_id: uuid::Uuid,
    ) -> Result<u64, StockError> {
        let res = sqlx::query(
            r#"DELETE FROM conto_stock_movements
               WHERE document_type = ?1 AND document_id = ?2"#,
        )
        .bind(doc_type.to_string())
        .bind(doc_id.to_string())
        .execute(executor)
        .await?;
        Ok(res.rows_affected())
    }

    pub(super) async fn list_for_document(
        &self,
        doc_type: DocumentType,
        doc_id: uuid::Uuid,
    ) -> Result<Vec<StockMovementValues>, StockError> {
        let rows = sqlx::query_as::<_, StockMovementRow>(&format!(
            r#"SELECT {SELECT_COLUMNS} FROM conto_stock_movements
               WHERE document_type = ?1 AND document_id = ?2
               ORDER BY occurred_on, created_at"#
        ))
        .bind(doc_type.to_string())
        .bind(doc_id.to_string())
        .fetch_all(&self.pool)
        .await?;
        rows.into_iter().map(|row| Ok(row.try_into()?)).collect()
    }

    /// Signed quantities for one product, oldest first.
    pub(super) async fn quantities_for_product(
        &self,
        product_id: ProductId,
    ) -> Result<Vec<(StockDirection, Decimal)>, StockError> {
        let rows: Vec<(String, String)> = sqlx::query_as(
            r#"SELECT direction, quantity FROM conto_stock_movements
               WHERE product_id = ?1 ORDER BY occurred_on, created_at"#,
        )
        .bind(product_id.to_string())
        .fetch_all(&self.pool)
        .await?;
        rows.into_iter()
            .map(|(direction, quantity)| {
                Ok((
                    CorruptRow::parse(TABLE, "direction", &direction)?,
                    CorruptRow::parse(TABLE, "quantity", &quantity)?,
                ))
            })
            .collect()
    }
}
