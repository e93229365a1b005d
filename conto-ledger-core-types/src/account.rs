use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::primitives::CounterpartyId;

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct CounterpartyAccountValues {
    pub id: CounterpartyId,
    pub name: String,
    pub external_id: Option<String>,
    /// Cached view of the last entry's running balance (0 with no entries).
    /// Written only by the balance recalculation engine.
    pub display_balance: Decimal,
    pub created_at: DateTime<Utc>,
}
