use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::{
    currency::CurrencySnapshot,
    primitives::{CounterpartyId, DocumentRef, EntryId, EntryKind},
};

/// Where an entry sits in its counterparty's sequence. Primary key is the
/// effective date, tie-broken by the insertion counter so that same-day
/// ordering is deterministic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct EntryPosition {
    pub occurred_on: NaiveDate,
    pub sequence_no: i64,
}

impl EntryPosition {
    pub const ORIGIN: EntryPosition = EntryPosition {
        occurred_on: NaiveDate::MIN,
        sequence_no: 0,
    };

    pub const END: EntryPosition = EntryPosition {
        occurred_on: NaiveDate::MAX,
        sequence_no: i64::MAX,
    };
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct LedgerEntryValues {
    pub id: EntryId,
    pub counterparty_id: CounterpartyId,
    pub occurred_on: NaiveDate,
    pub sequence_no: i64,
    pub kind: EntryKind,
    pub document_ref: Option<DocumentRef>,
    pub description: Option<String>,
    pub debit: Decimal,
    pub credit: Decimal,
    pub foreign: Option<CurrencySnapshot>,
    /// Denormalized cache maintained by the balance recalculation engine.
    pub running_balance: Decimal,
    pub created_at: DateTime<Utc>,
}

impl LedgerEntryValues {
    pub fn position(&self) -> EntryPosition {
        EntryPosition {
            occurred_on: self.occurred_on,
            sequence_no: self.sequence_no,
        }
    }

    /// The entry's contribution to the running balance.
    pub fn signed_amount(&self) -> Decimal {
        self.credit - self.debit
    }
}
