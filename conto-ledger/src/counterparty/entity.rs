use chrono::{DateTime, Utc};
use derive_builder::Builder;
use rust_decimal::Decimal;

pub use conto_types::{account::CounterpartyAccountValues, primitives::CounterpartyId};

/// A customer's or vendor's current account.
pub struct CounterpartyAccount {
    values: CounterpartyAccountValues,
}

impl CounterpartyAccount {
    pub(super) fn from_values(values: CounterpartyAccountValues) -> Self {
        Self { values }
    }

    pub fn id(&self) -> CounterpartyId {
        self.values.id
    }

    pub fn display_balance(&self) -> Decimal {
        self.values.display_balance
    }

    pub fn values(&self) -> &CounterpartyAccountValues {
        &self.values
    }

    pub fn into_values(self) -> CounterpartyAccountValues {
        self.values
    }
}

/// Representation of a ***new*** counterparty account with required/optional
/// properties and a builder.
#[derive(Builder, Debug, Clone)]
#[builder(build_fn(validate = "Self::validate"))]
pub struct NewCounterparty {
    #[builder(setter(into))]
    pub id: CounterpartyId,
    #[builder(setter(into))]
    pub(super) name: String,
    #[builder(setter(strip_option, into), default)]
    pub(super) external_id: Option<String>,
}

impl NewCounterparty {
    pub fn builder() -> NewCounterpartyBuilder {
        NewCounterpartyBuilder::default()
    }

    pub(super) fn into_values(self, created_at: DateTime<Utc>) -> CounterpartyAccountValues {
        CounterpartyAccountValues {
            id: self.id,
            name: self.name,
            external_id: self.external_id,
            display_balance: Decimal::ZERO,
            created_at,
        }
    }
}

impl NewCounterpartyBuilder {
    fn validate(&self) -> Result<(), String> {
        if let Some(name) = &self.name {
            if name.trim().is_empty() {
                return Err("name must not be empty".to_string());
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn it_builds() {
        let new_counterparty = NewCounterparty::builder()
            .id(CounterpartyId::new())
            .name("Acme Srl")
            .external_id("crm-42")
            .build()
            .unwrap();
        assert_eq!(new_counterparty.name, "Acme Srl");
        assert_eq!(new_counterparty.external_id.as_deref(), Some("crm-42"));
    }

    #[test]
    fn fails_when_mandatory_fields_are_missing() {
        assert!(NewCounterparty::builder().build().is_err());
    }

    #[test]
    fn rejects_blank_name() {
        let res = NewCounterparty::builder()
            .id(CounterpartyId::new())
            .name("   ")
            .build();
        assert!(res.is_err());
    }
}
