use thiserror::Error;

use crate::{errors::CorruptRow, primitives::CounterpartyId};

#[derive(Error, Debug)]
pub enum CounterpartyError {
    #[error("CounterpartyError - Sqlx: {0}")]
    Sqlx(#[from] sqlx::Error),
    #[error("CounterpartyError - NotFound: no counterparty {0}")]
    NotFound(CounterpartyId),
    #[error("CounterpartyError - DuplicateExternalId: {0}")]
    DuplicateExternalId(String),
    #[error("CounterpartyError - CorruptRow: {0}")]
    CorruptRow(#[from] CorruptRow),
}
