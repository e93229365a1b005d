use rust_decimal::Decimal;
use sqlx::{Sqlite, SqlitePool, Transaction};

use super::{entity::*, error::InvoiceError};
use crate::{
    errors::CorruptRow,
    primitives::{CounterpartyId, InvoiceId, InvoiceStatus},
};

const TABLE: &str = "conto_invoices";
const LINES_TABLE: &str = "conto_invoice_lines";

#[derive(Debug, Clone)]
pub(super) struct InvoiceRepo {
    pool: SqlitePool,
}

#[derive(sqlx::FromRow)]
struct InvoiceRow {
    id: String,
    counterparty_id: String,
    kind: String,
    currency: String,
    exchange_rate: String,
    global_discount: String,
    occurred_on: String,
    subtotal: String,
    vat_total: String,
    grand_total: String,
    remaining_amount: String,
    status: String,
    linked_entry_id: String,
    created_at: String,
}

#[derive(sqlx::FromRow)]
struct LineRow {
    description: String,
    product_id: Option<String>,
    quantity: String,
    unit_price: String,
    vat_rate: String,
    line_discount: String,
    net_amount: String,
    vat_amount: String,
}

impl TryFrom<LineRow> for InvoiceLineValues {
    type Error = CorruptRow;

    fn try_from(row: LineRow) -> Result<Self, Self::Error> {
        Ok(Self {
            description: row.description,
            product_id: row
                .product_id
                .as_deref()
                .map(|raw| CorruptRow::parse(LINES_TABLE, "product_id", raw))
                .transpose()?,
            quantity: CorruptRow::parse(LINES_TABLE, "quantity", &row.quantity)?,
            unit_price: CorruptRow::parse(LINES_TABLE, "unit_price", &row.unit_price)?,
            vat_rate: CorruptRow::parse(LINES_TABLE, "vat_rate", &row.vat_rate)?,
            line_discount: CorruptRow::parse(LINES_TABLE, "line_discount", &row.line_discount)?,
            net_amount: CorruptRow::parse(LINES_TABLE, "net_amount", &row.net_amount)?,
            vat_amount: CorruptRow::parse(LINES_TABLE, "vat_amount", &row.vat_amount)?,
        })
    }
}

impl InvoiceRow {
    fn into_values(self, lines: Vec<InvoiceLineValues>) -> Result<InvoiceValues, CorruptRow> {
        Ok(InvoiceValues {
            id: CorruptRow::parse(TABLE, "id", &self.id)?,
            counterparty_id: CorruptRow::parse(TABLE, "counterparty_id", &self.counterparty_id)?,
            kind: CorruptRow::parse(TABLE, "kind", &self.kind)?,
            currency: CorruptRow::parse(TABLE, "currency", &self.currency)?,
            exchange_rate: CorruptRow::parse(TABLE, "exchange_rate", &self.exchange_rate)?,
            global_discount: CorruptRow::parse(TABLE, "global_discount", &self.global_discount)?,
            occurred_on: CorruptRow::parse(TABLE, "occurred_on", &self.occurred_on)?,
            lines,
            subtotal: CorruptRow::parse(TABLE, "subtotal", &self.subtotal)?,
            vat_total: CorruptRow::parse(TABLE, "vat_total", &self.vat_total)?,
            grand_total: CorruptRow::parse(TABLE, "grand_total", &self.grand_total)?,
            remaining_amount: CorruptRow::parse(
                TABLE,
                "remaining_amount",
                &self.remaining_amount,
            )?,
            status: CorruptRow::parse(TABLE, "status", &self.status)?,
            linked_entry_id: CorruptRow::parse(TABLE, "linked_entry_id", &self.linked_entry_id)?,
            created_at: CorruptRow::parse(TABLE, "created_at", &self.created_at)?,
        })
    }
}

const SELECT_COLUMNS: &str = r#"id, counterparty_id, kind, currency, exchange_rate,
    global_discount, occurred_on, subtotal, vat_total, grand_total,
    remaining_amount, status, linked_entry_id, created_at"#;

const SELECT_LINE_COLUMNS: &str = r#"description, product_id, quantity, unit_price,
    vat_rate, line_discount, net_amount, vat_amount"#;

impl InvoiceRepo {
    pub fn new(pool: &SqlitePool) -> Self {
        Self { pool: pool.clone() }
    }

    pub(super) async fn create_in_tx(
        &self,
        db: &mut Transaction<'_, Sqlite>,
        values: &InvoiceValues,
    ) -> Result<(), InvoiceError> {
        sqlx::query(
            r#"INSERT INTO conto_invoices (
                 id, counterparty_id, kind, currency, exchange_rate,
                 global_discount, occurred_on, subtotal, vat_total, grand_total,
                 remaining_amount, status, linked_entry_id, created_at
               ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14)"#,
        )
        .bind(values.id.to_string())
        .bind(values.counterparty_id.to_string())
        .bind(values.kind.to_string())
        .bind(values.currency.to_string())
        .bind(values.exchange_rate.to_string())
        .bind(values.global_discount.to_string())
        .bind(values.occurred_on.to_string())
        .bind(values.subtotal.to_string())
        .bind(values.vat_total.to_string())
        .bind(values.grand_total.to_string())
        .bind(values.remaining_amount.to_string())
        .bind(values.status.to_string())
        .bind(values.linked_entry_id.to_string())
        .bind(values.created_at.to_rfc3339())
        .execute(&mut **db)
        .await?;
        for (line_no, line) in values.lines.iter().enumerate() {
            sqlx::query(
                r#"INSERT INTO conto_invoice_lines (
                     invoice_id, line_no, description, product_id, quantity,
                     unit_price, vat_rate, line_discount, net_amount, vat_amount
                   ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)"#,
            )
            .bind(values.id.to_string())
            .bind(line_no as i64)
            .bind(&line.description)
            .bind(line.product_id.map(|id| id.to_string()))
            .bind(line.quantity.to_string())
            .bind(line.unit_price.to_string())
            .bind(line.vat_rate.to_string())
            .bind(line.line_discount.to_string())
            .bind(line.net_amount.to_string())
            .bind(line.vat_amount.to_string())
            .execute(&mut **db)
            .await?;
        }
        Ok(())
    }

    pub(super) async fn find_by_id(&self, id: InvoiceId) -> Result<InvoiceValues, InvoiceError> {
        let row = sqlx::query_as::<_, InvoiceRow>(&format!(
            "SELECT {SELECT_COLUMNS} FROM conto_invoices WHERE id = ?1"
        ))
        .bind(id.to_string())
        .fetch_optional(&self.pool)
        .await?
        .ok_or(InvoiceError::NotFound(id))?;
        let lines = sqlx::query_as::<_, LineRow>(&format!(
            r#"SELECT {SELECT_LINE_COLUMNS} FROM conto_invoice_lines
               WHERE invoice_id = ?1 ORDER BY line_no"#
        ))
        .bind(id.to_string())
        .fetch_all(&self.pool)
        .await?
        .into_iter()
        .map(InvoiceLineValues::try_from)
        .collect::<Result<Vec<_>, _>>()?;
        Ok(row.into_values(lines)?)
    }

    pub(super) async fn find_by_id_in_tx(
        &self,
        db: &mut Transaction<'_, Sqlite>,
        id: InvoiceId,
    ) -> Result<InvoiceValues, InvoiceError> {
        let row = sqlx::query_as::<_, InvoiceRow>(&format!(
            "SELECT {SELECT_COLUMNS} FROM conto_invoices WHERE id = ?1"
        ))
        .bind(id.to_string())
        .fetch_optional(&mut **db)
        .await?
        .ok_or(InvoiceError::NotFound(id))?;
        let lines = sqlx::query_as::<_, LineRow>(&format!(
            r#"SELECT {SELECT_LINE_COLUMNS} FROM conto_invoice_lines
               WHERE invoice_id = ?1 ORDER BY line_no"#
        ))
        .bind(id.to_string())
        .fetch_all(&mut **db)
        .await?
        .into_iter()
        .map(InvoiceLineValues::try_from)
        .collect::<Result<Vec<_>, _>>()?;
        Ok(row.into_values(lines)?)
    }

    pub(super) async fn list_for_counterparty(
        &self,
        counterparty_id: CounterpartyId,
    ) -> Result<Vec<InvoiceValues>, InvoiceError> {
        let ids: Vec<String> = sqlx::query_scalar(
            r#"SELECT id FROM conto_invoices WHERE counterparty_id = ?1
               ORDER BY occurred_on, created_at"#,
        )
        .bind(counterparty_id.to_string())
        .fetch_all(&self.pool)
        .await?;
        let mut invoices = Vec::with_capacity(ids.len());
        for raw in ids {
            let id: InvoiceId = CorruptRow::parse(TABLE, "id", &raw)?;
            invoices.push(self.find_by_id(id).await?);
        }
        Ok(invoices)
    }

    pub(super) async fn update_settlement_in_tx(
        &self,
        db: &mut Transaction<'_, Sqlite>,
        id: InvoiceId,
        remaining_amount: Decimal,
        status: InvoiceStatus,
    ) -> Result<(), InvoiceError> {
        sqlx::query(
            r#"UPDATE conto_invoices SET remaining_amount = ?2, status = ?3 WHERE id = ?1"#,
        )
        .bind(id.to_string())
        .bind(remaining_amount.to_string())
        .bind(status.to_string())
        .execute(&mut **db)
        .await?;
        Ok(())
    }

    pub(super) async fn delete_in_tx(
        &self,
        db: &mut Transaction<'_, Sqlite>,
        id: InvoiceId,
    ) -> Result<(), InvoiceError> {
        sqlx::query("DELETE FROM conto_invoice_lines WHERE invoice_id = ?1")
            .bind(id.to_string())
            .execute(&mut **db)
            .await?;
        let res = sqlx::query("DELETE FROM conto_invoices WHERE id = ?1")
            .bind(id.to_string())
            .execute(&mut **db)
            .await?;
        if res.rows_affected() == 0 {
            return Err(InvoiceError::NotFound(id));
        }
        Ok(())
    }
}
