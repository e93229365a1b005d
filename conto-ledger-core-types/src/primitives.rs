use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

crate::entity_id! { CounterpartyId }
crate::entity_id! { EntryId }
crate::entity_id! { InvoiceId }
crate::entity_id! { ProductId }
crate::entity_id! { StockMovementId }

#[derive(
    Debug,
    Serialize,
    Deserialize,
    Clone,
    Copy,
    PartialEq,
    Eq,
    strum::Display,
    strum::EnumString,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum EntryKind {
    OpeningBalance,
    InvoiceCharge,
    PaymentReceived,
    PaymentMade,
}

#[derive(
    Debug,
    Serialize,
    Deserialize,
    Clone,
    Copy,
    PartialEq,
    Eq,
    strum::Display,
    strum::EnumString,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum InvoiceKind {
    Sales,
    Purchase,
}

/// Settlement state of an invoice. A reversed invoice is deleted rather than
/// kept around as a terminal "canceled" artifact, so no such variant exists.
#[derive(
    Debug,
    Serialize,
    Deserialize,
    Clone,
    Copy,
    PartialEq,
    Eq,
    strum::Display,
    strum::EnumString,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum InvoiceStatus {
    Confirmed,
    PartiallyPaid,
    Paid,
}

impl InvoiceStatus {
    /// Pure function of the remaining amount vs the grand total.
    pub fn for_remaining(remaining_amount: Decimal, grand_total: Decimal) -> Self {
        if remaining_amount <= Decimal::ZERO {
            Self::Paid
        } else if remaining_amount >= grand_total {
            Self::Confirmed
        } else {
            Self::PartiallyPaid
        }
    }
}

#[derive(
    Debug,
    Serialize,
    Deserialize,
    Clone,
    Copy,
    PartialEq,
    Eq,
    strum::Display,
    strum::EnumString,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum StockDirection {
    In,
    Out,
}

impl StockDirection {
    pub fn reversed(self) -> Self {
        match self {
            Self::In => Self::Out,
            Self::Out => Self::In,
        }
    }
}

#[derive(
    Debug,
    Serialize,
    Deserialize,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    strum::Display,
    strum::EnumString,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum DocumentType {
    Invoice,
    Order,
}

/// Link from a ledger entry or stock movement back to the source document
/// that produced it.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
pub struct DocumentRef {
    pub doc_type: DocumentType,
    pub doc_id: uuid::Uuid,
}

impl DocumentRef {
    pub fn invoice(id: InvoiceId) -> Self {
        Self {
            doc_type: DocumentType::Invoice,
            doc_id: id.into(),
        }
    }

    pub fn order(id: uuid::Uuid) -> Self {
        Self {
            doc_type: DocumentType::Order,
            doc_id: id,
        }
    }
}

#[derive(Clone, Copy)]
pub struct Currency(&'static rusty_money::iso::Currency);

impl Currency {
    pub fn code(&self) -> &'static str {
        self.0.iso_alpha_code
    }
}

impl PartialEq for Currency {
    fn eq(&self, other: &Self) -> bool {
        self.code() == other.code()
    }
}

impl Eq for Currency {}

impl std::hash::Hash for Currency {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.code().hash(state)
    }
}

impl std::fmt::Debug for Currency {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.code())
    }
}

impl std::fmt::Display for Currency {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.code())
    }
}

#[derive(thiserror::Error, Debug)]
#[error("Unknown currency code: {0}")]
pub struct ParseCurrencyError(String);

impl std::str::FromStr for Currency {
    type Err = ParseCurrencyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        rusty_money::iso::find(s)
            .map(Currency)
            .ok_or_else(|| ParseCurrencyError(s.to_string()))
    }
}

impl serde::Serialize for Currency {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.code())
    }
}

impl<'de> serde::Deserialize<'de> for Currency {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let code = String::deserialize(deserializer)?;
        code.parse().map_err(serde::de::Error::custom)
    }
}
