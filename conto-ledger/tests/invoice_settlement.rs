mod helpers;

use rust_decimal::Decimal;
use rust_decimal_macros::dec;

use conto_ledger::{invoice::error::InvoiceError, invoice::*, *};

fn simple_line(amount: Decimal) -> NewInvoiceLine {
    NewInvoiceLine::builder()
        .description("services")
        .quantity(dec!(1))
        .unit_price(amount)
        .build()
        .unwrap()
}

async fn sales_invoice(
    ledger: &ContoLedger,
    counterparty_id: CounterpartyId,
    amount: Decimal,
) -> anyhow::Result<Invoice> {
    let new_invoice = NewInvoice::builder()
        .id(InvoiceId::new())
        .counterparty_id(counterparty_id)
        .kind(InvoiceKind::Sales)
        .currency("EUR".parse()?)
        .occurred_on(helpers::date(2026, 3, 1))
        .line(simple_line(amount))
        .build()?;
    Ok(ledger.create_invoice(new_invoice).await?)
}

#[tokio::test]
async fn sales_invoice_settles_through_partial_payments() -> anyhow::Result<()> {
    let (_dir, ledger) = helpers::init_ledger().await?;
    let counterparty = helpers::create_counterparty(&ledger).await?;
    let id = counterparty.id();

    let invoice = sales_invoice(&ledger, id, dec!(1000)).await?;
    assert_eq!(invoice.values().grand_total, dec!(1000));
    assert_eq!(invoice.status(), InvoiceStatus::Confirmed);
    assert_eq!(ledger.get_balance(id).await?, dec!(-1000));

    let outcome = ledger
        .record_payment(
            invoice.id(),
            dec!(400),
            "EUR".parse()?,
            dec!(1),
            helpers::date(2026, 3, 10),
        )
        .await?;
    assert_eq!(outcome.remaining_amount, dec!(600));
    assert_eq!(outcome.status, InvoiceStatus::PartiallyPaid);
    assert_eq!(ledger.get_balance(id).await?, dec!(-600));

    let outcome = ledger
        .record_payment(
            invoice.id(),
            dec!(600),
            "EUR".parse()?,
            dec!(1),
            helpers::date(2026, 3, 20),
        )
        .await?;
    assert_eq!(outcome.remaining_amount, Decimal::ZERO);
    assert_eq!(outcome.status, InvoiceStatus::Paid);
    assert_eq!(ledger.get_balance(id).await?, Decimal::ZERO);

    let reloaded = ledger.invoices().find_by_id(invoice.id()).await?;
    assert_eq!(reloaded.status(), InvoiceStatus::Paid);
    assert_eq!(reloaded.remaining_amount(), Decimal::ZERO);
    Ok(())
}

#[tokio::test]
async fn global_discount_is_distributed_across_lines() -> anyhow::Result<()> {
    let (_dir, ledger) = helpers::init_ledger().await?;
    let counterparty = helpers::create_counterparty(&ledger).await?;
    let id = counterparty.id();

    let new_invoice = NewInvoice::builder()
        .id(InvoiceId::new())
        .counterparty_id(id)
        .kind(InvoiceKind::Sales)
        .currency("EUR".parse()?)
        .occurred_on(helpers::date(2026, 3, 1))
        .line(
            NewInvoiceLine::builder()
                .description("line one")
                .quantity(dec!(1))
                .unit_price(dec!(100))
                .vat_rate(dec!(20))
                .build()?,
        )
        .line(
            NewInvoiceLine::builder()
                .description("line two")
                .quantity(dec!(1))
                .unit_price(dec!(50))
                .vat_rate(dec!(10))
                .build()?,
        )
        .global_discount(dec!(30))
        .build()?;
    let invoice = ledger.create_invoice(new_invoice).await?;

    assert_eq!(invoice.values().grand_total, dec!(140.00));
    assert_eq!(ledger.get_balance(id).await?, dec!(-140.00));
    Ok(())
}

#[tokio::test]
async fn overpayment_settles_and_leaves_credit_on_the_account() -> anyhow::Result<()> {
    let (_dir, ledger) = helpers::init_ledger().await?;
    let counterparty = helpers::create_counterparty(&ledger).await?;
    let id = counterparty.id();

    let invoice = sales_invoice(&ledger, id, dec!(100)).await?;
    let outcome = ledger
        .record_payment(
            invoice.id(),
            dec!(150),
            "EUR".parse()?,
            dec!(1),
            helpers::date(2026, 3, 10),
        )
        .await?;

    assert_eq!(outcome.remaining_amount, Decimal::ZERO);
    assert_eq!(outcome.status, InvoiceStatus::Paid);
    assert_eq!(ledger.get_balance(id).await?, dec!(50));
    Ok(())
}

#[tokio::test]
async fn purchase_invoices_credit_the_account() -> anyhow::Result<()> {
    let (_dir, ledger) = helpers::init_ledger().await?;
    let counterparty = helpers::create_counterparty(&ledger).await?;
    let id = counterparty.id();

    let new_invoice = NewInvoice::builder()
        .id(InvoiceId::new())
        .counterparty_id(id)
        .kind(InvoiceKind::Purchase)
        .currency("EUR".parse()?)
        .occurred_on(helpers::date(2026, 3, 1))
        .line(simple_line(dec!(200)))
        .build()?;
    let invoice = ledger.create_invoice(new_invoice).await?;
    assert_eq!(ledger.get_balance(id).await?, dec!(200));

    ledger
        .record_payment(
            invoice.id(),
            dec!(200),
            "EUR".parse()?,
            dec!(1),
            helpers::date(2026, 3, 10),
        )
        .await?;
    assert_eq!(ledger.get_balance(id).await?, Decimal::ZERO);

    let kinds: Vec<_> = ledger
        .entries()
        .list_for_counterparty(id)
        .await?
        .iter()
        .map(|e| e.values().kind)
        .collect();
    assert_eq!(kinds, vec![EntryKind::InvoiceCharge, EntryKind::PaymentMade]);
    Ok(())
}

#[tokio::test]
async fn paying_an_unknown_invoice_is_a_missing_document() -> anyhow::Result<()> {
    let (_dir, ledger) = helpers::init_ledger().await?;
    let res = ledger
        .record_payment(
            InvoiceId::new(),
            dec!(10),
            "EUR".parse()?,
            dec!(1),
            helpers::date(2026, 3, 10),
        )
        .await;
    assert!(matches!(
        res,
        Err(LedgerError::DocumentNotFound(DocumentType::Invoice, _))
    ));
    Ok(())
}

#[tokio::test]
async fn rejects_non_positive_payments() -> anyhow::Result<()> {
    let (_dir, ledger) = helpers::init_ledger().await?;
    let counterparty = helpers::create_counterparty(&ledger).await?;
    let invoice = sales_invoice(&ledger, counterparty.id(), dec!(100)).await?;

    let res = ledger
        .record_payment(
            invoice.id(),
            Decimal::ZERO,
            "EUR".parse()?,
            dec!(1),
            helpers::date(2026, 3, 10),
        )
        .await;
    assert!(matches!(
        res,
        Err(LedgerError::Invoice(InvoiceError::Validation(_)))
    ));
    Ok(())
}

#[tokio::test]
async fn rejects_payments_in_another_currency() -> anyhow::Result<()> {
    let (_dir, ledger) = helpers::init_ledger().await?;
    let counterparty = helpers::create_counterparty(&ledger).await?;
    let invoice = sales_invoice(&ledger, counterparty.id(), dec!(100)).await?;

    let res = ledger
        .record_payment(
            invoice.id(),
            dec!(100),
            "USD".parse()?,
            dec!(30),
            helpers::date(2026, 3, 10),
        )
        .await;
    assert!(matches!(
        res,
        Err(LedgerError::Invoice(InvoiceError::Validation(_)))
    ));
    Ok(())
}

#[tokio::test]
async fn rejects_invoices_with_nothing_to_charge() -> anyhow::Result<()> {
    let (_dir, ledger) = helpers::init_ledger().await?;
    let counterparty = helpers::create_counterparty(&ledger).await?;

    let new_invoice = NewInvoice::builder()
        .id(InvoiceId::new())
        .counterparty_id(counterparty.id())
        .kind(InvoiceKind::Sales)
        .currency("EUR".parse()?)
        .occurred_on(helpers::date(2026, 3, 1))
        .line(simple_line(Decimal::ZERO))
        .build()?;
    assert!(matches!(
        ledger.create_invoice(new_invoice).await,
        Err(LedgerError::Invoice(InvoiceError::Validation(_)))
    ));
    Ok(())
}
