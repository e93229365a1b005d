use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::primitives::{DocumentRef, ProductId, StockDirection, StockMovementId};

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct StockMovementValues {
    pub id: StockMovementId,
    pub product_id: ProductId,
    pub document_ref: Option<DocumentRef>,
    pub direction: StockDirection,
    pub quantity: Decimal,
    pub occurred_on: NaiveDate,
    pub created_at: DateTime<Utc>,
}
