use sqlx::{Sqlite, SqlitePool, Transaction};

use conto_types::currency::CurrencySnapshot;

use super::{entity::*, error::EntryError};
use crate::{
    errors::CorruptRow,
    primitives::{CounterpartyId, DocumentRef, DocumentType, EntryId},
};

const TABLE: &str = "conto_entries";

const SELECT_COLUMNS: &str = r#"id, counterparty_id, occurred_on, sequence_no, kind,
    document_type, document_id, description, debit, credit,
    foreign_amount, foreign_currency, exchange_rate, unverified_rate,
    running_balance, created_at"#;

#[derive(Debug, Clone)]
pub(super) struct EntryRepo {
    pool: SqlitePool,
}

#[derive(sqlx::FromRow)]
pub(crate) struct EntryRow {
    id: String,
    counterparty_id: String,
    occurred_on: String,
    sequence_no: i64,
    kind: String,
    document_type: Option<String>,
    document_id: Option<String>,
    description: Option<String>,
    debit: String,
    credit: String,
    foreign_amount: Option<String>,
    foreign_currency: Option<String>,
    exchange_rate: Option<String>,
    unverified_rate: bool,
    running_balance: String,
    created_at: String,
}

impl TryFrom<EntryRow> for LedgerEntryValues {
    type Error = CorruptRow;

    fn try_from(row: EntryRow) -> Result<Self, Self::Error> {
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
        let foreign = match (&row.foreign_amount, &row.foreign_currency, &row.exchange_rate) {
            (Some(amount), Some(currency), Some(rate)) => Some(CurrencySnapshot {
                amount: CorruptRow::parse(TABLE, "foreign_amount", amount)?,
                currency: CorruptRow::parse(TABLE, "foreign_currency", currency)?,
                rate: CorruptRow::parse(TABLE, "exchange_rate", rate)?,
                unverified_rate: row.unverified_rate,
            }),
            (None, None, None) => None,
            _ => {
                return Err(CorruptRow {
                    table: TABLE,
                    column: "foreign_amount",
                    reason: "half-populated currency snapshot".to_string(),
                })
            }
        };
        Ok(Self {
            id: CorruptRow::parse(TABLE, "id", &row.id)?,
            counterparty_id: CorruptRow::parse(TABLE, "counterparty_id", &row.counterparty_id)?,
            occurred_on: CorruptRow::parse(TABLE, "occurred_on", &row.occurred_on)?,
            sequence_no: row.sequence_no,
            kind: CorruptRow::parse(TABLE, "kind", &row.kind)?,
            document_ref,
            description: row.description,
            debit: CorruptRow::parse(TABLE, "debit", &row.debit)?,
            credit: CorruptRow::parse(TABLE, "credit", &row.credit)?,
            foreign,
            running_balance: CorruptRow::parse(TABLE, "running_balance", &row.running_balance)?,
            created_at: CorruptRow::parse(TABLE, "created_at", &row.created_at)?,
        })
    }
}

impl EntryRepo {
    pub fn new(pool: &SqlitePool) -> Self {
        Self { pool: pool.clone() }
    }

    pub(super) async fn next_sequence_no(
        &self,
        db: &mut Transaction<'_, Sqlite>,
        counterparty_id: CounterpartyId,
    ) -> Result<i64, EntryError> {
        let next: i64 = sqlx::query_scalar(
            r#"SELECT COALESCE(MAX(sequence_no), 0) + 1 FROM conto_entries
               WHERE counterparty_id = ?1"#,
        )
        .bind(counterparty_id.to_string())
        .fetch_one(&mut **db)
        .await?;
        Ok(next)
    }

    pub(super) async fn create_in_tx(
        &self,
        db: &mut Transaction<'_, Sqlite>,
        values: &LedgerEntryValues,
    ) -> Result<(), EntryError> {
        sqlx::query(
            r#"INSERT INTO conto_entries (
                 id, counterparty_id, occurred_on, sequence_no, kind,
                 document_type, document_id, description, debit, credit,
                 foreign_amount, foreign_currency, exchange_rate, unverified_rate,
                 running_balance, created_at
               ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16)"#,
        )
        .bind(values.id.to_string())
        .bind(values.counterparty_id.to_string())
        .bind(values.occurred_on.to_string())
        .bind(values.sequence_no)
        .bind(values.kind.to_string())
        .bind(values.document_ref.map(|d| d.doc_type.to_string()))
        .bind(values.document_ref.map(|d| d.doc_id.to_string()))
        .bind(&values.description)
        .bind(values.debit.to_string())
        .bind(values.credit.to_string())
        .bind(values.foreign.map(|f| f.amount.to_string()))
        .bind(values.foreign.map(|f| f.currency.to_string()))
        .bind(values.foreign.map(|f| f.rate.to_string()))
        .bind(values.foreign.map(|f| f.unverified_rate).unwrap_or(false))
        .bind(values.running_balance.to_string())
        .bind(values.created_at.to_rfc3339())
        .execute(&mut **db)
        .await?;
        Ok(())
    }

    pub(super) async fn find_by_id(&self, id: EntryId) -> Result<LedgerEntryValues, EntryError> {
        let row = sqlx::query_as::<_, EntryRow>(&format!(
            "SELECT {SELECT_COLUMNS} FROM conto_entries WHERE id = ?1"
        ))
        .bind(id.to_string())
        .fetch_optional(&self.pool)
        .await?;
        match row {
            Some(row) => Ok(row.try_into()?),
            None => Err(EntryError::NotFound(id)),
        }
    }

    pub(super) async fn find_by_id_in_tx(
        &self,
        db: &mut Transaction<'_, Sqlite>,
        id: EntryId,
    ) -> Result<LedgerEntryValues, EntryError> {
        let row = sqlx::query_as::<_, EntryRow>(&format!(
            "SELECT {SELECT_COLUMNS} FROM conto_entries WHERE id = ?1"
        ))
        .bind(id.to_string())
        .fetch_optional(&mut **db)
        .await?;
        match row {
            Some(row) => Ok(row.try_into()?),
            None => Err(EntryError::NotFound(id)),
        }
    }

    pub(super) async fn delete_in_tx(
        &self,
        db: &mut Transaction<'_, Sqlite>,
        id: EntryId,
    ) -> Result<(), EntryError> {
        let res = sqlx::query("DELETE FROM conto_entries WHERE id = ?1")
            .bind(id.to_string())
            .execute(&mut **db)
            .await?;
        if res.rows_affected() == 0 {
            return Err(EntryError::NotFound(id));
        }
        Ok(())
    }

    pub(super) async fn list_for_counterparty(
        &self,
        counterparty_id: CounterpartyId,
    ) -> Result<Vec<LedgerEntryValues>, EntryError> {
        let rows = sqlx::query_as::<_, EntryRow>(&format!(
            r#"SELECT {SELECT_COLUMNS} FROM conto_entries
               WHERE counterparty_id = ?1
               ORDER BY occurred_on, sequence_no"#
        ))
        .bind(counterparty_id.to_string())
        .fetch_all(&self.pool)
        .await?;
        rows.into_iter().map(|row| Ok(row.try_into()?)).collect()
    }

    pub(super) async fn find_by_document(
        &self,
        doc_type: DocumentType,
        doc_id: uuid::Uuid,
    ) -> Result<Vec<LedgerEntryValues>, EntryError> {
        let rows = sqlx::query_as::<_, EntryRow>(&format!(
            r#"SELECT {SELECT_COLUMNS} FROM conto_entries
               WHERE document_type = ?1 AND document_id = ?2
               ORDER BY occurred_on, sequence_no"#
        ))
        .bind(doc_type.to_string())
        .bind(doc_id.to_string())
        .fetch_all(&self.pool)
        .await?;
        rows.into_iter().map(|row| Ok(row.try_into()?)).collect()
    }

    pub(super) async fn find_by_document_in_tx(
        &self,
        db: &mut Transaction<'_, Sqlite>,
        doc_type: DocumentType,
        doc_id: uuid::Uuid,
    ) -> Result<Vec<LedgerEntryValues>, EntryError> {
        let rows = sqlx::query_as::<_, EntryRow>(&format!(
            r#"SELECT {SELECT_COLUMNS} FROM conto_entries
               WHERE document_type = ?1 AND document_id = ?2
               ORDER BY occurred_on, sequence_no"#
        ))
        .bind(doc_type.to_string())
        .bind(doc_id.to_string())
        .fetch_all(&mut **db)
        .await?;
        rows.into_iter().map(|row| Ok(row.try_into()?)).collect()
    }

    pub(super) async fn detach_document_in_tx(
        &self,
        db: &mut Transaction<'_, Sqlite>,
        id: EntryId,
    ) -> Result<(), EntryError> {
        sqlx::query(
            r#"UPDATE conto_entries SET document_type = NULL, document_id = NULL
               WHERE id = ?1"#,
        )
        .bind(id.to_string())
        .execute(&mut **db)
        .await?;
        Ok(())
    }
}
