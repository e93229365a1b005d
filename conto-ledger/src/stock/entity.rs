use chrono::{DateTime, NaiveDate, Utc};
use derive_builder::Builder;
use rust_decimal::Decimal;

pub use conto_types::stock::StockMovementValues;
use conto_types::primitives::{DocumentRef, ProductId, StockDirection, StockMovementId};

pub struct StockMovement {
    values: StockMovementValues,
}

impl StockMovement {
    pub(crate) fn from_values(values: StockMovementValues) -> Self {
        Self { values }
    }

    pub fn id(&self) -> StockMovementId {
        self.values.id
    }

    pub fn values(&self) -> &StockMovementValues {
        &self.values
    }

    pub fn into_values(self) -> StockMovementValues {
        self.values
    }
}

#[derive(Builder, Debug, Clone)]
#[builder(build_fn(validate = "Self::validate"))]
pub struct NewStockMovement {
    #[builder(setter(into))]
    pub id: StockMovementId,
    #[builder(setter(into))]
    pub(crate) product_id: ProductId,
    #[builder(setter(strip_option), default)]
    pub(crate) document_ref: Option<DocumentRef>,
    pub(crate) direction: StockDirection,
    pub(crate) quantity: Decimal,
    pub(crate) occurred_on: NaiveDate,
}

impl NewStockMovement {
    pub fn builder() -> NewStockMovementBuilder {
        NewStockMovementBuilder::default()
    }

    pub(crate) fn into_values(self, created_at: DateTime<Utc>) -> StockMovementValues {
        StockMovementValues {
            id: self.id,
            product_id: self.product_id,
            document_ref: self.document_ref,
            direction: self.direction,
            quantity: self.quantity,
            occurred_on: self.occurred_on,
            created_at,
        }
    }
}

impl NewStockMovementBuilder {
    fn validate(&self) -> Result<(), String> {
        if self.quantity.unwrap_or(Decimal::ZERO) <= Decimal::ZERO {
            return Err("quantity must be positive".to_string());
        }
        Ok(())
    }
}
