mod helpers;

use rust_decimal_macros::dec;

use conto_ledger::{entry::error::EntryError, entry::*, invoice::error::InvoiceError, invoice::*, *};

fn usd() -> Currency {
    "USD".parse().unwrap()
}

fn eur() -> Currency {
    "EUR".parse().unwrap()
}

#[tokio::test]
async fn snapshot_rate_survives_later_rate_changes() -> anyhow::Result<()> {
    let (_dir, ledger) = helpers::init_ledger().await?;
    let counterparty = helpers::create_counterparty(&ledger).await?;
    let id = counterparty.id();

    let snapshot = CurrencySnapshot::capture(dec!(100), usd(), dec!(30), eur());
    let entry = NewLedgerEntry::builder()
        .id(EntryId::new())
        .counterparty_id(id)
        .occurred_on(helpers::date(2026, 8, 1))
        .kind(EntryKind::PaymentReceived)
        .credit(dec!(3000))
        .foreign(snapshot)
        .build()?;
    let first = ledger.append_entry(entry).await?;
    assert_eq!(first.running_balance(), dec!(3000));

    // The prevailing rate moves; new entries capture it, old ones keep theirs.
    let snapshot = CurrencySnapshot::capture(dec!(100), usd(), dec!(35), eur());
    let entry = NewLedgerEntry::builder()
        .id(EntryId::new())
        .counterparty_id(id)
        .occurred_on(helpers::date(2026, 8, 2))
        .kind(EntryKind::PaymentReceived)
        .credit(dec!(3500))
        .foreign(snapshot)
        .build()?;
    ledger.append_entry(entry).await?;

    let reloaded = ledger.entries().find_by_id(first.id()).await?;
    let foreign = reloaded.values().foreign.expect("foreign snapshot");
    assert_eq!(foreign.rate, dec!(30));
    assert_eq!(reloaded.running_balance(), dec!(3000));
    assert_eq!(ledger.get_balance(id).await?, dec!(6500));
    Ok(())
}

#[tokio::test]
async fn foreign_invoice_converts_at_the_captured_rate() -> anyhow::Result<()> {
    let (_dir, ledger) = helpers::init_ledger().await?;
    let counterparty = helpers::create_counterparty(&ledger).await?;
    let id = counterparty.id();

    let new_invoice = NewInvoice::builder()
        .id(InvoiceId::new())
        .counterparty_id(id)
        .kind(InvoiceKind::Sales)
        .currency(usd())
        .exchange_rate(dec!(30))
        .occurred_on(helpers::date(2026, 8, 1))
        .line(
            NewInvoiceLine::builder()
                .description("export")
                .quantity(dec!(1))
                .unit_price(dec!(100))
                .build()?,
        )
        .build()?;
    let invoice = ledger.create_invoice(new_invoice).await?;

    assert_eq!(invoice.values().grand_total, dec!(100));
    assert_eq!(ledger.get_balance(id).await?, dec!(-3000));

    let entries = ledger
        .entries()
        .find_by_document(DocumentType::Invoice, invoice.id().into())
        .await?;
    let foreign = entries[0].values().foreign.expect("foreign snapshot");
    assert_eq!(foreign.amount, dec!(100));
    assert_eq!(foreign.rate, dec!(30));
    assert!(!foreign.unverified_rate);
    Ok(())
}

#[tokio::test]
async fn unit_rate_on_a_foreign_invoice_is_flagged() -> anyhow::Result<()> {
    let (_dir, ledger) = helpers::init_ledger().await?;
    let counterparty = helpers::create_counterparty(&ledger).await?;
    let id = counterparty.id();

    let new_invoice = NewInvoice::builder()
        .id(InvoiceId::new())
        .counterparty_id(id)
        .kind(InvoiceKind::Sales)
        .currency(usd())
        .occurred_on(helpers::date(2026, 8, 1))
        .line(
            NewInvoiceLine::builder()
                .description("export")
                .quantity(dec!(1))
                .unit_price(dec!(100))
                .build()?,
        )
        .build()?;
    let invoice = ledger.create_invoice(new_invoice).await?;

    let entries = ledger
        .entries()
        .find_by_document(DocumentType::Invoice, invoice.id().into())
        .await?;
    let foreign = entries[0].values().foreign.expect("foreign snapshot");
    assert!(foreign.unverified_rate);
    Ok(())
}

#[tokio::test]
async fn payment_captures_its_own_rate() -> anyhow::Result<()> {
    let (_dir, ledger) = helpers::init_ledger().await?;
    let counterparty = helpers::create_counterparty(&ledger).await?;
    let id = counterparty.id();

    let new_invoice = NewInvoice::builder()
        .id(InvoiceId::new())
        .counterparty_id(id)
        .kind(InvoiceKind::Sales)
        .currency(usd())
        .exchange_rate(dec!(30))
        .occurred_on(helpers::date(2026, 8, 1))
        .line(
            NewInvoiceLine::builder()
                .description("export")
                .quantity(dec!(1))
                .unit_price(dec!(100))
                .build()?,
        )
        .build()?;
    let invoice = ledger.create_invoice(new_invoice).await?;
    assert_eq!(ledger.get_balance(id).await?, dec!(-3000));

    // The rate moved between invoicing and payment.
    let outcome = ledger
        .record_payment(
            invoice.id(),
            dec!(100),
            usd(),
            dec!(35),
            helpers::date(2026, 8, 20),
        )
        .await?;
    assert_eq!(outcome.remaining_amount, rust_decimal::Decimal::ZERO);
    assert_eq!(outcome.status, InvoiceStatus::Paid);
    // Charged at 30, paid at 35; the difference stays on the account.
    assert_eq!(ledger.get_balance(id).await?, dec!(500));

    let entries = ledger.entries().list_for_counterparty(id).await?;
    let payment = entries
        .iter()
        .find(|e| e.values().kind == EntryKind::PaymentReceived)
        .expect("payment entry");
    let foreign = payment.values().foreign.expect("foreign snapshot");
    assert_eq!(foreign.rate, dec!(35));
    assert!(!foreign.unverified_rate);
    Ok(())
}

#[tokio::test]
async fn base_currency_invoices_cannot_carry_a_rate() -> anyhow::Result<()> {
    let (_dir, ledger) = helpers::init_ledger().await?;
    let counterparty = helpers::create_counterparty(&ledger).await?;

    let new_invoice = NewInvoice::builder()
        .id(InvoiceId::new())
        .counterparty_id(counterparty.id())
        .kind(InvoiceKind::Sales)
        .currency(eur())
        .exchange_rate(dec!(30))
        .occurred_on(helpers::date(2026, 8, 1))
        .line(
            NewInvoiceLine::builder()
                .description("domestic")
                .quantity(dec!(1))
                .unit_price(dec!(100))
                .build()?,
        )
        .build()?;
    assert!(matches!(
        ledger.create_invoice(new_invoice).await,
        Err(LedgerError::Invoice(InvoiceError::Validation(_)))
    ));
    Ok(())
}

#[tokio::test]
async fn base_currency_entries_cannot_carry_a_snapshot() -> anyhow::Result<()> {
    let (_dir, ledger) = helpers::init_ledger().await?;
    let counterparty = helpers::create_counterparty(&ledger).await?;

    let snapshot = CurrencySnapshot::capture(dec!(100), eur(), dec!(1), eur());
    let entry = NewLedgerEntry::builder()
        .id(EntryId::new())
        .counterparty_id(counterparty.id())
        .occurred_on(helpers::date(2026, 8, 1))
        .kind(EntryKind::PaymentReceived)
        .credit(dec!(100))
        .foreign(snapshot)
        .build()?;
    assert!(matches!(
        ledger.append_entry(entry).await,
        Err(LedgerError::Entry(EntryError::Validation(_)))
    ));
    Ok(())
}
