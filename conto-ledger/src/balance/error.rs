use rust_decimal::Decimal;
use thiserror::Error;

use crate::{errors::CorruptRow, primitives::CounterpartyId};

#[derive(Error, Debug)]
pub enum BalanceError {
    #[error("BalanceError - Sqlx: {0}")]
    Sqlx(#[from] sqlx::Error),
    #[error("BalanceError - CorruptRow: {0}")]
    CorruptRow(#[from] CorruptRow),
    #[error(
        "BalanceError - ConsistencyCheckFailed: counterparty {counterparty_id} sums to {expected} but the cache ends at {got}"
    )]
    ConsistencyCheckFailed {
        counterparty_id: CounterpartyId,
        expected: Decimal,
        got: Decimal,
    },
}
