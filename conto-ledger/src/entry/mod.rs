//! Ledger entries and their persistence. All mutations are `pub(crate)` and
//! run inside a caller-supplied transaction so that the recalculation engine
//! commits the entry and its balance effects together.
mod entity;
pub mod error;
mod repo;

use chrono::{DateTime, Utc};
use sqlx::{Sqlite, SqlitePool, Transaction};
use tracing::instrument;

pub use entity::*;
use error::*;
use repo::*;

use crate::primitives::{CounterpartyId, DocumentType, EntryId};

#[derive(Clone)]
pub struct Entries {
    repo: EntryRepo,
}

impl Entries {
    pub(crate) fn new(pool: &SqlitePool) -> Self {
        Self {
            repo: EntryRepo::new(pool),
        }
    }

    #[instrument(name = "conto_ledger.entries.find", skip(self), err)]
    pub async fn find_by_id(&self, id: EntryId) -> Result<LedgerEntry, EntryError> {
        let values = self.repo.find_by_id(id).await?;
        Ok(LedgerEntry::from_values(values))
    }

    #[instrument(name = "conto_ledger.entries.list_for_counterparty", skip(self), err)]
    pub async fn list_for_counterparty(
        &self,
        counterparty_id: CounterpartyId,
    ) -> Result<Vec<LedgerEntry>, EntryError> {
        let values = self.repo.list_for_counterparty(counterparty_id).await?;
        Ok(values.into_iter().map(LedgerEntry::from_values).collect())
    }

    #[instrument(name = "conto_ledger.entries.find_by_document", skip(self), err)]
    pub async fn find_by_document(
        &self,
        doc_type: DocumentType,
        doc_id: uuid::Uuid,
    ) -> Result<Vec<LedgerEntry>, EntryError> {
        let values = self.repo.find_by_document(doc_type, doc_id).await?;
        Ok(values.into_iter().map(LedgerEntry::from_values).collect())
    }

    /// Assigns the next sequence number and inserts the entry. The caller
    /// recomputes running balances afterwards, inside the same transaction.
    pub(crate) async fn append_in_tx(
        &self,
        db: &mut Transaction<'_, Sqlite>,
        new_entry: NewLedgerEntry,
        created_at: DateTime<Utc>,
    ) -> Result<LedgerEntryValues, EntryError> {
        let sequence_no = self
            .repo
            .next_sequence_no(db, new_entry.counterparty_id)
            .await?;
        let values = new_entry.into_values(sequence_no, created_at);
        self.repo.create_in_tx(db, &values).await?;
        Ok(values)
    }

    pub(crate) async fn find_by_id_in_tx(
        &self,
        db: &mut Transaction<'_, Sqlite>,
        id: EntryId,
    ) -> Result<LedgerEntryValues, EntryError> {
        self.repo.find_by_id_in_tx(db, id).await
    }

    /// Deletes without looking at the document link. Callers enforce the
    /// document-reversal rule first.
    pub(crate) async fn delete_unchecked_in_tx(
        &self,
        db: &mut Transaction<'_, Sqlite>,
        id: EntryId,
    ) -> Result<(), EntryError> {
        self.repo.delete_in_tx(db, id).await
    }

    pub(crate) async fn find_by_document_in_tx(
        &self,
        db: &mut Transaction<'_, Sqlite>,
        doc_type: DocumentType,
        doc_id: uuid::Uuid,
    ) -> Result<Vec<LedgerEntryValues>, EntryError> {
        self.repo.find_by_document_in_tx(db, doc_type, doc_id).await
    }

    pub(crate) async fn detach_document_in_tx(
        &self,
        db: &mut Transaction<'_, Sqlite>,
        id: EntryId,
    ) -> Result<(), EntryError> {
        self.repo.detach_document_in_tx(db, id).await
    }
}
