use chrono::{DateTime, Datelike, NaiveDate, Utc};
use derive_builder::Builder;
use rust_decimal::Decimal;

pub use conto_types::entry::{EntryPosition, LedgerEntryValues};
use conto_types::{
    currency::CurrencySnapshot,
    primitives::{CounterpartyId, DocumentRef, EntryId, EntryKind},
};

/// A single movement on a counterparty's current account.
pub struct LedgerEntry {
    values: LedgerEntryValues,
}

impl LedgerEntry {
    pub(crate) fn from_values(values: LedgerEntryValues) -> Self {
        Self { values }
    }

    pub fn id(&self) -> EntryId {
        self.values.id
    }

    pub fn position(&self) -> EntryPosition {
        self.values.position()
    }

    pub fn running_balance(&self) -> Decimal {
        self.values.running_balance
    }

    pub fn values(&self) -> &LedgerEntryValues {
        &self.values
    }

    pub fn into_values(self) -> LedgerEntryValues {
        self.values
    }
}

/// Representation of a ***new*** ledger entry. Exactly one of `debit` and
/// `credit` must be positive; the other stays zero.
#[derive(Builder, Debug, Clone)]
#[builder(build_fn(validate = "Self::validate"))]
pub struct NewLedgerEntry {
    #[builder(setter(into))]
    pub id: EntryId,
    #[builder(setter(into))]
    pub(crate) counterparty_id: CounterpartyId,
    pub(crate) occurred_on: NaiveDate,
    pub(crate) kind: EntryKind,
    #[builder(setter(strip_option), default)]
    pub(crate) document_ref: Option<DocumentRef>,
    #[builder(setter(strip_option, into), default)]
    pub(crate) description: Option<String>,
    #[builder(default)]
    pub(crate) debit: Decimal,
    #[builder(default)]
    pub(crate) credit: Decimal,
    #[builder(setter(strip_option), default)]
    pub(crate) foreign: Option<CurrencySnapshot>,
}

impl NewLedgerEntry {
    pub fn builder() -> NewLedgerEntryBuilder {
        NewLedgerEntryBuilder::default()
    }

    pub(crate) fn into_values(
        self,
        sequence_no: i64,
        created_at: DateTime<Utc>,
    ) -> LedgerEntryValues {
        LedgerEntryValues {
            id: self.id,
            counterparty_id: self.counterparty_id,
            occurred_on: self.occurred_on,
            sequence_no,
            kind: self.kind,
            document_ref: self.document_ref,
            description: self.description,
            debit: self.debit,
            credit: self.credit,
            foreign: self.foreign,
            // The recalculation engine overwrites this before commit.
            running_balance: Decimal::ZERO,
            created_at,
        }
    }
}

impl NewLedgerEntryBuilder {
    fn validate(&self) -> Result<(), String> {
        if let Some(occurred_on) = self.occurred_on {
            // Dates persist as TEXT; ordering only holds for four-digit years.
            if !(0..=9999).contains(&occurred_on.year()) {
                return Err("occurred_on must fall between year 0 and 9999".to_string());
            }
        }
        let debit = self.debit.unwrap_or(Decimal::ZERO);
        let credit = self.credit.unwrap_or(Decimal::ZERO);
        if debit < Decimal::ZERO || credit < Decimal::ZERO {
            return Err("debit and credit must be non-negative".to_string());
        }
        match (debit > Decimal::ZERO, credit > Decimal::ZERO) {
            (true, true) => return Err("an entry is either a debit or a credit".to_string()),
            (false, false) => return Err("an entry must move a positive amount".to_string()),
            _ => {}
        }
        if let Some(Some(foreign)) = &self.foreign {
            if foreign.amount <= Decimal::ZERO {
                return Err("foreign amount must be positive".to_string());
            }
            if foreign.rate <= Decimal::ZERO {
                return Err("exchange rate must be positive".to_string());
            }
            let base = if debit > Decimal::ZERO { debit } else { credit };
            if foreign.base_amount() != base {
                return Err(format!(
                    "foreign snapshot converts to {} but the entry moves {}",
                    foreign.base_amount(),
                    base
                ));
            }
        }
        Ok(())
    }
}

/// Partial re-statement of an entry. Unset fields keep their current value;
/// setting either money side replaces both so the entry cannot end up with
/// two positive sides by accident.
#[derive(Builder, Debug, Clone, Default)]
#[builder(default)]
pub struct LedgerEntryUpdate {
    #[builder(setter(strip_option))]
    pub(crate) occurred_on: Option<NaiveDate>,
    #[builder(setter(strip_option))]
    pub(crate) kind: Option<EntryKind>,
    #[builder(setter(strip_option, into))]
    pub(crate) description: Option<String>,
    #[builder(setter(strip_option))]
    pub(crate) debit: Option<Decimal>,
    #[builder(setter(strip_option))]
    pub(crate) credit: Option<Decimal>,
    #[builder(setter(strip_option))]
    pub(crate) foreign: Option<CurrencySnapshot>,
}

impl LedgerEntryUpdate {
    pub fn builder() -> LedgerEntryUpdateBuilder {
        LedgerEntryUpdateBuilder::default()
    }

    pub(crate) fn apply_to(
        self,
        current: &LedgerEntryValues,
    ) -> Result<NewLedgerEntry, NewLedgerEntryBuilderError> {
        let (debit, credit) = match (self.debit, self.credit) {
            (None, None) => (current.debit, current.credit),
            (debit, credit) => (
                debit.unwrap_or(Decimal::ZERO),
                credit.unwrap_or(Decimal::ZERO),
            ),
        };
        let mut builder = NewLedgerEntry::builder();
        builder
            .id(current.id)
            .counterparty_id(current.counterparty_id)
            .occurred_on(self.occurred_on.unwrap_or(current.occurred_on))
            .kind(self.kind.unwrap_or(current.kind))
            .debit(debit)
            .credit(credit);
        if let Some(description) = self.description.or_else(|| current.description.clone()) {
            builder.description(description);
        }
        if let Some(foreign) = self.foreign.or(current.foreign) {
            builder.foreign(foreign);
        }
        if let Some(document_ref) = current.document_ref {
            builder.document_ref(document_ref);
        }
        builder.build()
    }
}
