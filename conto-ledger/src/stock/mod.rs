//! Inventory movements driven by documents. Reversing a document deletes its
//! movements, restoring each product's on-hand quantity.
mod entity;
pub mod error;
mod repo;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::{Sqlite, SqlitePool, Transaction};
use tracing::instrument;

pub use entity::*;
use error::*;
use repo::*;

use crate::primitives::{DocumentType, ProductId, StockDirection};

#[derive(Clone)]
pub struct StockMovements {
    repo: StockMovementRepo,
    pool: SqlitePool,
}

impl StockMovements {
    pub(crate) fn new(pool: &SqlitePool) -> Self {
        Self {
            repo: StockMovementRepo::new(pool),
            pool: pool.clone(),
        }
    }

    #[instrument(name = "conto_ledger.stock.on_hand", skip(self), err)]
    pub async fn on_hand(&self, product_id: ProductId) -> Result<Decimal, StockError> {
        let quantities = self.repo.quantities_for_product(product_id).await?;
        Ok(quantities
            .into_iter()
            .fold(Decimal::ZERO, |total, (direction, quantity)| {
                match direction {
                    StockDirection::In => total + quantity,
                    StockDirection::Out => total - quantity,
                }
            }))
    }

    #[instrument(name = "conto_ledger.stock.list_for_document", skip(self), err)]
    pub async fn list_for_document(
        &self,
        doc_type: DocumentType,
        doc_id: uuid::Uuid,
    ) -> Result<Vec<StockMovement>, StockError> {
        let values = self.repo.list_for_document(doc_type, doc_id).await?;
        Ok(values.into_iter().map(StockMovement::from_values).collect())
    }

    pub(crate) async fn record_in_tx(
        &self,
        db: &mut Transaction<'_, Sqlite>,
        new_movement: NewStockMovement,
        created_at: DateTime<Utc>,
    ) -> Result<StockMovementValues, StockError> {
        let values = new_movement.into_values(created_at);
        self.repo.create(&mut **db, &values).await?;
        Ok(values)
    }

    /// Single-statement insert, runs straight on the pool.
    pub(crate) async fn record(
        &self,
        new_movement: NewStockMovement,
        created_at: DateTime<Utc>,
    ) -> Result<StockMovementValues, StockError> {
        let values = new_movement.into_values(created_at);
        self.repo.create(&self.pool, &values).await?;
        Ok(values)
    }

    pub(crate) async fn delete_for_document_in_tx(
        &self,
        db: &mut Transaction<'_, Sqlite>,
        doc_type: DocumentType,
        doc_id: uuid::Uuid,
    ) -> Result<u64, StockError> {
        self.repo.delete_by_document(&mut **db, doc_type, doc_id).await
    }

    /// Single-statement delete, runs straight on the pool.
    pub(crate) async fn delete_for_document(
        &self,
        doc_type: DocumentType,
        doc_id: uuid::Uuid,
    ) -> Result<u64, StockError> {
        self.repo.delete_by_document(&self.pool, doc_type, doc_id).await
    }
}
