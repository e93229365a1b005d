use chrono::{DateTime, Datelike, NaiveDate, Utc};
use derive_builder::Builder;
use rust_decimal::{Decimal, RoundingStrategy};

pub use conto_types::invoice::{InvoiceLineValues, InvoiceValues};
use conto_types::primitives::{
    CounterpartyId, Currency, EntryId, InvoiceId, InvoiceKind, InvoiceStatus, ProductId,
};

fn to_cents(amount: Decimal) -> Decimal {
    amount.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
}

pub struct Invoice {
    values: InvoiceValues,
}

impl Invoice {
    pub(crate) fn from_values(values: InvoiceValues) -> Self {
        Self { values }
    }

    pub fn id(&self) -> InvoiceId {
        self.values.id
    }

    pub fn status(&self) -> InvoiceStatus {
        self.values.status
    }

    pub fn remaining_amount(&self) -> Decimal {
        self.values.remaining_amount
    }

    pub fn values(&self) -> &InvoiceValues {
        &self.values
    }

    pub fn into_values(self) -> InvoiceValues {
        self.values
    }
}

/// What a settlement left behind.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SettlementOutcome {
    pub remaining_amount: Decimal,
    pub status: InvoiceStatus,
}

/// Representation of a ***new*** invoice line before totals are computed.
#[derive(Builder, Debug, Clone)]
#[builder(build_fn(validate = "Self::validate"))]
pub struct NewInvoiceLine {
    #[builder(setter(into))]
    pub(super) description: String,
    #[builder(setter(strip_option), default)]
    pub(super) product_id: Option<ProductId>,
    pub(super) quantity: Decimal,
    pub(super) unit_price: Decimal,
    #[builder(default)]
    pub(super) vat_rate: Decimal,
    #[builder(default)]
    pub(super) line_discount: Decimal,
}

impl NewInvoiceLine {
    pub fn builder() -> NewInvoiceLineBuilder {
        NewInvoiceLineBuilder::default()
    }

    /// Net after the line's own discount, before the global discount is
    /// apportioned.
    fn own_net(&self) -> Decimal {
        self.quantity * self.unit_price - self.line_discount
    }
}

impl NewInvoiceLineBuilder {
    fn validate(&self) -> Result<(), String> {
        let quantity = self.quantity.unwrap_or(Decimal::ZERO);
        let unit_price = self.unit_price.unwrap_or(Decimal::ZERO);
        let vat_rate = self.vat_rate.unwrap_or(Decimal::ZERO);
        let line_discount = self.line_discount.unwrap_or(Decimal::ZERO);
        if quantity <= Decimal::ZERO {
            return Err("quantity must be positive".to_string());
        }
        if unit_price < Decimal::ZERO {
            return Err("unit price must be non-negative".to_string());
        }
        if vat_rate < Decimal::ZERO {
            return Err("vat rate must be non-negative".to_string());
        }
        if line_discount < Decimal::ZERO || line_discount > quantity * unit_price {
            return Err("line discount must be between 0 and the line gross".to_string());
        }
        Ok(())
    }
}

/// Representation of a ***new*** invoice with required/optional properties
/// and a builder.
#[derive(Builder, Debug, Clone)]
#[builder(build_fn(validate = "Self::validate"))]
pub struct NewInvoice {
    #[builder(setter(into))]
    pub id: InvoiceId,
    #[builder(setter(into))]
    pub(crate) counterparty_id: CounterpartyId,
    pub(crate) kind: InvoiceKind,
    pub(crate) currency: Currency,
    #[builder(default = "Decimal::ONE")]
    pub(crate) exchange_rate: Decimal,
    #[builder(default)]
    pub(crate) global_discount: Decimal,
    pub(crate) occurred_on: NaiveDate,
    #[builder(setter(each(name = "line")))]
    pub(crate) lines: Vec<NewInvoiceLine>,
}

impl NewInvoice {
    pub fn builder() -> NewInvoiceBuilder {
        NewInvoiceBuilder::default()
    }

    /// The global discount is distributed across lines proportionally to
    /// their own nets, then each final net and its VAT are rounded to cents.
    fn settle_lines(&self) -> Vec<InvoiceLineValues> {
        let own_total: Decimal = self.lines.iter().map(NewInvoiceLine::own_net).sum();
        self.lines
            .iter()
            .map(|line| {
                let own_net = line.own_net();
                let apportioned = if own_total.is_zero() {
                    Decimal::ZERO
                } else {
                    self.global_discount * own_net / own_total
                };
                let net_amount = to_cents(own_net - apportioned);
                let vat_amount = to_cents(net_amount * line.vat_rate / Decimal::ONE_HUNDRED);
                InvoiceLineValues {
                    description: line.description.clone(),
                    product_id: line.product_id,
                    quantity: line.quantity,
                    unit_price: line.unit_price,
                    vat_rate: line.vat_rate,
                    line_discount: line.line_discount,
                    net_amount,
                    vat_amount,
                }
            })
            .collect()
    }

    pub(crate) fn into_values(
        self,
        linked_entry_id: EntryId,
        created_at: DateTime<Utc>,
    ) -> InvoiceValues {
        let lines = self.settle_lines();
        let subtotal: Decimal = lines.iter().map(|l| l.net_amount).sum();
        let vat_total: Decimal = lines.iter().map(|l| l.vat_amount).sum();
        let grand_total = subtotal + vat_total;
        InvoiceValues {
            id: self.id,
            counterparty_id: self.counterparty_id,
            kind: self.kind,
            currency: self.currency,
            exchange_rate: self.exchange_rate,
            global_discount: self.global_discount,
            occurred_on: self.occurred_on,
            lines,
            subtotal,
            vat_total,
            grand_total,
            remaining_amount: grand_total,
            status: InvoiceStatus::Confirmed,
            linked_entry_id,
            created_at,
        }
    }
}

impl NewInvoiceBuilder {
    fn validate(&self) -> Result<(), String> {
        if let Some(occurred_on) = self.occurred_on {
            // Dates persist as TEXT; ordering only holds for four-digit years.
            if !(0..=9999).contains(&occurred_on.year()) {
                return Err("occurred_on must fall between year 0 and 9999".to_string());
            }
        }
        let lines = self.lines.as_deref().unwrap_or_default();
        if lines.is_empty() {
            return Err("an invoice needs at least one line".to_string());
        }
        if self.exchange_rate.unwrap_or(Decimal::ONE) <= Decimal::ZERO {
            return Err("exchange rate must be positive".to_string());
        }
        let global_discount = self.global_discount.unwrap_or(Decimal::ZERO);
        let own_total: Decimal = lines.iter().map(NewInvoiceLine::own_net).sum();
        if global_discount < Decimal::ZERO || global_discount > own_total {
            return Err("global discount must be between 0 and the sum of line nets".to_string());
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use rust_decimal_macros::dec;

    use super::*;

    fn line(price: Decimal, vat_rate: Decimal) -> NewInvoiceLine {
        NewInvoiceLine::builder()
            .description("item")
            .quantity(dec!(1))
            .unit_price(price)
            .vat_rate(vat_rate)
            .build()
            .unwrap()
    }

    fn invoice_builder() -> NewInvoiceBuilder {
        let mut builder = NewInvoice::builder();
        builder
            .id(InvoiceId::new())
            .counterparty_id(CounterpartyId::new())
            .kind(InvoiceKind::Sales)
            .currency("EUR".parse().unwrap())
            .occurred_on(NaiveDate::from_ymd_opt(2026, 4, 1).unwrap());
        builder
    }

    #[test]
    fn distributes_the_global_discount_proportionally() {
        let invoice = invoice_builder()
            .line(line(dec!(100), dec!(20)))
            .line(line(dec!(50), dec!(10)))
            .global_discount(dec!(30))
            .build()
            .unwrap()
            .into_values(EntryId::new(), Utc::now());
        assert_eq!(invoice.lines[0].net_amount, dec!(80.00));
        assert_eq!(invoice.lines[0].vat_amount, dec!(16.00));
        assert_eq!(invoice.lines[1].net_amount, dec!(40.00));
        assert_eq!(invoice.lines[1].vat_amount, dec!(4.00));
        assert_eq!(invoice.subtotal, dec!(120.00));
        assert_eq!(invoice.vat_total, dec!(20.00));
        assert_eq!(invoice.grand_total, dec!(140.00));
        assert_eq!(invoice.remaining_amount, dec!(140.00));
        assert_eq!(invoice.status, InvoiceStatus::Confirmed);
    }

    #[test]
    fn zero_valued_lines_do_not_divide_by_zero() {
        let invoice = invoice_builder()
            .line(line(dec!(0), dec!(20)))
            .build()
            .unwrap()
            .into_values(EntryId::new(), Utc::now());
        assert_eq!(invoice.grand_total, Decimal::ZERO);
    }

    #[test]
    fn rejects_invoices_without_lines() {
        assert!(invoice_builder().build().is_err());
    }

    #[test]
    fn rejects_global_discount_larger_than_the_lines() {
        let res = invoice_builder()
            .line(line(dec!(50), dec!(10)))
            .global_discount(dec!(51))
            .build();
        assert!(res.is_err());
    }

    #[test]
    fn rejects_line_discount_larger_than_the_line() {
        let res = NewInvoiceLine::builder()
            .description("item")
            .quantity(dec!(2))
            .unit_price(dec!(10))
            .line_discount(dec!(21))
            .build();
        assert!(res.is_err());
    }
}
