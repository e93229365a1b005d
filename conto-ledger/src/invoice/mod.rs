//! Invoices and their settlement state. An invoice is created together with
//! its charge entry; settlement and reversal are orchestrated by the ledger
//! facade so that the invoice, its entries and its stock movements move in
//! one transaction.
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

use crate::primitives::{CounterpartyId, EntryId, InvoiceId, InvoiceStatus};

#[derive(Clone)]
pub struct Invoices {
    repo: InvoiceRepo,
}

impl Invoices {
    pub(crate) fn new(pool: &SqlitePool) -> Self {
        Self {
            repo: InvoiceRepo::new(pool),
        }
    }

    #[instrument(name = "conto_ledger.invoices.find", skip(self), err)]
    pub async fn find_by_id(&self, id: InvoiceId) -> Result<Invoice, InvoiceError> {
        let values = self.repo.find_by_id(id).await?;
        Ok(Invoice::from_values(values))
    }

    #[instrument(name = "conto_ledger.invoices.list_for_counterparty", skip(self), err)]
    pub async fn list_for_counterparty(
        &self,
        counterparty_id: CounterpartyId,
    ) -> Result<Vec<Invoice>, InvoiceError> {
        let values = self.repo.list_for_counterparty(counterparty_id).await?;
        Ok(values.into_iter().map(Invoice::from_values).collect())
    }

    pub(crate) async fn create_in_tx(
        &self,
        db: &mut Transaction<'_, Sqlite>,
        new_invoice: NewInvoice,
        linked_entry_id: EntryId,
        created_at: DateTime<Utc>,
    ) -> Result<InvoiceValues, InvoiceError> {
        let values = new_invoice.into_values(linked_entry_id, created_at);
        // Nothing to charge means nothing to settle either.
        if values.grand_total <= Decimal::ZERO {
            return Err(InvoiceError::Validation(
                "invoice must have a positive total".to_string(),
            ));
        }
        self.repo.create_in_tx(db, &values).await?;
        Ok(values)
    }

    pub(crate) async fn find_by_id_in_tx(
        &self,
        db: &mut Transaction<'_, Sqlite>,
        id: InvoiceId,
    ) -> Result<InvoiceValues, InvoiceError> {
        self.repo.find_by_id_in_tx(db, id).await
    }

    /// Applies a payment to the invoice's remaining amount. Overpayment
    /// settles the invoice and leaves the excess on the counterparty's
    /// account.
    pub(crate) async fn apply_payment_in_tx(
        &self,
        db: &mut Transaction<'_, Sqlite>,
        id: InvoiceId,
        amount: Decimal,
    ) -> Result<SettlementOutcome, InvoiceError> {
        if amount <= Decimal::ZERO {
            return Err(InvoiceError::Validation(
                "payment amount must be positive".to_string(),
            ));
        }
        let invoice = self.repo.find_by_id_in_tx(db, id).await?;
        let remaining_amount = (invoice.remaining_amount - amount).max(Decimal::ZERO);
        let status = InvoiceStatus::for_remaining(remaining_amount, invoice.grand_total);
        self.repo
            .update_settlement_in_tx(db, id, remaining_amount, status)
            .await?;
        Ok(SettlementOutcome {
            remaining_amount,
            status,
        })
    }

    pub(crate) async fn delete_in_tx(
        &self,
        db: &mut Transaction<'_, Sqlite>,
        id: InvoiceId,
    ) -> Result<(), InvoiceError> {
        self.repo.delete_in_tx(db, id).await
    }
}
