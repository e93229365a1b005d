#![allow(dead_code)]
use chrono::NaiveDate;
use rand::distr::{Alphanumeric, SampleString};

use conto_ledger::{counterparty::*, *};

pub async fn init_ledger() -> anyhow::Result<(tempfile::TempDir, ContoLedger)> {
    let dir = tempfile::tempdir()?;
    let config = ContoLedgerConfig::builder()
        .db_path(dir.path().join("conto.db"))
        .exec_migrations(true)
        .build()?;
    let ledger = ContoLedger::init(config).await?;
    Ok((dir, ledger))
}

pub async fn create_counterparty(ledger: &ContoLedger) -> anyhow::Result<CounterpartyAccount> {
    let name = format!("cp-{}", Alphanumeric.sample_string(&mut rand::rng(), 8));
    let new_counterparty = NewCounterparty::builder()
        .id(CounterpartyId::new())
        .name(name)
        .build()?;
    Ok(ledger.counterparties().create(new_counterparty).await?)
}

pub fn date(year: i32, month: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(year, month, day).expect("valid date")
}
