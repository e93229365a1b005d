mod helpers;

use chrono::NaiveDate;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

use conto_ledger::{balance::error::BalanceError, entry::*, *};

async fn credit(
    ledger: &ContoLedger,
    counterparty_id: CounterpartyId,
    amount: Decimal,
    occurred_on: NaiveDate,
) -> anyhow::Result<LedgerEntry> {
    let entry = NewLedgerEntry::builder()
        .id(EntryId::new())
        .counterparty_id(counterparty_id)
        .occurred_on(occurred_on)
        .kind(EntryKind::PaymentReceived)
        .credit(amount)
        .build()?;
    Ok(ledger.append_entry(entry).await?)
}

#[tokio::test]
async fn rebuild_is_a_no_op_on_a_consistent_ledger() -> anyhow::Result<()> {
    let (_dir, ledger) = helpers::init_ledger().await?;
    let counterparty = helpers::create_counterparty(&ledger).await?;
    let id = counterparty.id();

    credit(&ledger, id, dec!(100), helpers::date(2026, 6, 1)).await?;
    credit(&ledger, id, dec!(200), helpers::date(2026, 6, 2)).await?;

    let cached = ledger.get_balance(id).await?;
    let rebuilt = ledger.rebuild_balance(id).await?;
    assert_eq!(cached, dec!(300));
    assert_eq!(rebuilt, cached);
    Ok(())
}

#[tokio::test]
async fn tampered_cache_quarantines_until_rebuilt() -> anyhow::Result<()> {
    let (_dir, ledger) = helpers::init_ledger().await?;
    let counterparty = helpers::create_counterparty(&ledger).await?;
    let id = counterparty.id();

    credit(&ledger, id, dec!(100), helpers::date(2026, 6, 1)).await?;
    let last = credit(&ledger, id, dec!(200), helpers::date(2026, 6, 2)).await?;

    // Simulate an out-of-band write corrupting the cache.
    sqlx::query("UPDATE conto_entries SET running_balance = '999' WHERE id = ?1")
        .bind(last.id().to_string())
        .execute(ledger.pool())
        .await?;

    let res = credit(&ledger, id, dec!(50), helpers::date(2026, 6, 3)).await;
    assert!(matches!(
        res,
        Err(err) if matches!(
            err.downcast_ref::<LedgerError>(),
            Some(LedgerError::Balance(BalanceError::ConsistencyCheckFailed { .. }))
        )
    ));

    // The counterparty is halted until an operator intervenes.
    let res = credit(&ledger, id, dec!(50), helpers::date(2026, 6, 3)).await;
    assert!(matches!(
        res,
        Err(err) if matches!(
            err.downcast_ref::<LedgerError>(),
            Some(LedgerError::Scope(ScopeError::Quarantined(_, _)))
        )
    ));

    let rebuilt = ledger.rebuild_balance(id).await?;
    assert_eq!(rebuilt, dec!(300));

    credit(&ledger, id, dec!(50), helpers::date(2026, 6, 3)).await?;
    assert_eq!(ledger.get_balance(id).await?, dec!(350));
    Ok(())
}

#[tokio::test]
async fn counterparties_do_not_contend() -> anyhow::Result<()> {
    let (_dir, ledger) = helpers::init_ledger().await?;
    let first = helpers::create_counterparty(&ledger).await?.id();
    let second = helpers::create_counterparty(&ledger).await?.id();

    let (a, b) = tokio::join!(
        async {
            for n in 1..=5 {
                credit(&ledger, first, Decimal::from(n * 10), helpers::date(2026, 7, n as u32))
                    .await?;
            }
            anyhow::Ok(())
        },
        async {
            for n in 1..=5 {
                credit(&ledger, second, Decimal::from(n * 20), helpers::date(2026, 7, n as u32))
                    .await?;
            }
            anyhow::Ok(())
        }
    );
    a?;
    b?;

    assert_eq!(ledger.get_balance(first).await?, dec!(150));
    assert_eq!(ledger.get_balance(second).await?, dec!(300));
    Ok(())
}
