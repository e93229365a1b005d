use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::primitives::{
    CounterpartyId, Currency, EntryId, InvoiceId, InvoiceKind, InvoiceStatus, ProductId,
};

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct InvoiceValues {
    pub id: InvoiceId,
    pub counterparty_id: CounterpartyId,
    pub kind: InvoiceKind,
    pub currency: Currency,
    /// Exchange rate captured at creation; 1 for base-currency invoices.
    pub exchange_rate: Decimal,
    pub global_discount: Decimal,
    pub occurred_on: NaiveDate,
    pub lines: Vec<InvoiceLineValues>,
    pub subtotal: Decimal,
    pub vat_total: Decimal,
    pub grand_total: Decimal,
    pub remaining_amount: Decimal,
    pub status: InvoiceStatus,
    pub linked_entry_id: EntryId,
    pub created_at: DateTime<Utc>,
}

/// A single invoice line. Owned exclusively by its invoice and destroyed
/// with it.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct InvoiceLineValues {
    pub description: String,
    pub product_id: Option<ProductId>,
    pub quantity: Decimal,
    pub unit_price: Decimal,
    pub vat_rate: Decimal,
    pub line_discount: Decimal,
    /// Net after line discount and the apportioned share of the global
    /// discount.
    pub net_amount: Decimal,
    pub vat_amount: Decimal,
}
