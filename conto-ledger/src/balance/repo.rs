use rust_decimal::Decimal;
use sqlx::{Sqlite, Transaction};

use conto_types::entry::EntryPosition;

use super::error::BalanceError;
use crate::{errors::CorruptRow, primitives::CounterpartyId};

const TABLE: &str = "conto_entries";

/// Every query runs inside the mutation's transaction, so the repo itself
/// carries no connection state.
#[derive(Debug, Clone)]
pub(super) struct BalanceRepo;

/// Just enough of an entry to walk the running balance forward.
pub(super) struct BalanceSlice {
    pub id: String,
    pub position: EntryPosition,
    pub signed_amount: Decimal,
    pub cached_balance: Decimal,
}

#[derive(sqlx::FromRow)]
struct SliceRow {
    id: String,
    occurred_on: String,
    sequence_no: i64,
    debit: String,
    credit: String,
    running_balance: String,
}

impl TryFrom<SliceRow> for BalanceSlice {
    type Error = CorruptRow;

    fn try_from(row: SliceRow) -> Result<Self, Self::Error> {
        let debit: Decimal = CorruptRow::parse(TABLE, "debit", &row.debit)?;
        let credit: Decimal = CorruptRow::parse(TABLE, "credit", &row.credit)?;
        Ok(Self {
            id: row.id,
            position: EntryPosition {
                occurred_on: CorruptRow::parse(TABLE, "occurred_on", &row.occurred_on)?,
                sequence_no: row.sequence_no,
            },
            signed_amount: credit - debit,
            cached_balance: CorruptRow::parse(TABLE, "running_balance", &row.running_balance)?,
        })
    }
}

impl BalanceRepo {
    /// Running balance of the last entry strictly before `position`.
    pub(super) async fn balance_before(
        &self,
        db: &mut Transaction<'_, Sqlite>,
        counterparty_id: CounterpartyId,
        position: EntryPosition,
    ) -> Result<Option<Decimal>, BalanceError> {
        let raw: Option<String> = sqlx::query_scalar(
            r#"SELECT running_balance FROM conto_entries
               WHERE counterparty_id = ?1
                 AND (occurred_on < ?2 OR (occurred_on = ?2 AND sequence_no < ?3))
               ORDER BY occurred_on DESC, sequence_no DESC
               LIMIT 1"#,
        )
        .bind(counterparty_id.to_string())
        .bind(position.occurred_on.to_string())
        .bind(position.sequence_no)
        .fetch_optional(&mut **db)
        .await?;
        raw.map(|raw| Ok(CorruptRow::parse(TABLE, "running_balance", &raw)?))
            .transpose()
    }

    /// All entries at or after `position`, in ledger order.
    pub(super) async fn slices_from(
        &self,
        db: &mut Transaction<'_, Sqlite>,
        counterparty_id: CounterpartyId,
        position: EntryPosition,
    ) -> Result<Vec<BalanceSlice>, BalanceError> {
        let rows = sqlx::query_as::<_, SliceRow>(
            r#"SELECT id, occurred_on, sequence_no, debit, credit, running_balance
               FROM conto_entries
               WHERE counterparty_id = ?1
                 AND (occurred_on > ?2 OR (occurred_on = ?2 AND sequence_no >= ?3))
               ORDER BY occurred_on, sequence_no"#,
        )
        .bind(counterparty_id.to_string())
        .bind(position.occurred_on.to_string())
        .bind(position.sequence_no)
        .fetch_all(&mut **db)
        .await?;
        rows.into_iter().map(|row| Ok(row.try_into()?)).collect()
    }

    pub(super) async fn update_running_balance(
        &self,
        db: &mut Transaction<'_, Sqlite>,
        entry_id: &str,
        balance: Decimal,
    ) -> Result<(), BalanceError> {
        sqlx::query("UPDATE conto_entries SET running_balance = ?2 WHERE id = ?1")
            .bind(entry_id)
            .bind(balance.to_string())
            .execute(&mut **db)
            .await?;
        Ok(())
    }

    pub(super) async fn last_running_balance(
        &self,
        db: &mut Transaction<'_, Sqlite>,
        counterparty_id: CounterpartyId,
    ) -> Result<Option<Decimal>, BalanceError> {
        let raw: Option<String> = sqlx::query_scalar(
            r#"SELECT running_balance FROM conto_entries
               WHERE counterparty_id = ?1
               ORDER BY occurred_on DESC, sequence_no DESC
               LIMIT 1"#,
        )
        .bind(counterparty_id.to_string())
        .fetch_optional(&mut **db)
        .await?;
        raw.map(|raw| Ok(CorruptRow::parse(TABLE, "running_balance", &raw)?))
            .transpose()
    }

    /// Decimal TEXT cannot be summed in SQL, so the history total is folded
    /// in Rust.
    pub(super) async fn history_total(
        &self,
        db: &mut Transaction<'_, Sqlite>,
        counterparty_id: CounterpartyId,
    ) -> Result<Decimal, BalanceError> {
        let rows: Vec<(String, String)> = sqlx::query_as(
            r#"SELECT debit, credit FROM conto_entries WHERE counterparty_id = ?1"#,
        )
        .bind(counterparty_id.to_string())
        .fetch_all(&mut **db)
        .await?;
        let mut total = Decimal::ZERO;
        for (debit, credit) in rows {
            let debit: Decimal = CorruptRow::parse(TABLE, "debit", &debit)?;
            let credit: Decimal = CorruptRow::parse(TABLE, "credit", &credit)?;
            total += credit - debit;
        }
        Ok(total)
    }

    pub(super) async fn update_display_balance(
        &self,
        db: &mut Transaction<'_, Sqlite>,
        counterparty_id: CounterpartyId,
        balance: Decimal,
    ) -> Result<(), BalanceError> {
        sqlx::query("UPDATE conto_counterparties SET display_balance = ?2 WHERE id = ?1")
            .bind(counterparty_id.to_string())
            .bind(balance.to_string())
            .execute(&mut **db)
            .await?;
        Ok(())
    }
}
