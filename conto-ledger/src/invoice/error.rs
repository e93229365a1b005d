use thiserror::Error;

use crate::{errors::CorruptRow, primitives::InvoiceId};

#[derive(Error, Debug)]
pub enum InvoiceError {
    #[error("InvoiceError - Sqlx: {0}")]
    Sqlx(#[from] sqlx::Error),
    #[error("InvoiceError - NotFound: no invoice {0}")]
    NotFound(InvoiceId),
    #[error("InvoiceError - CorruptRow: {0}")]
    CorruptRow(#[from] CorruptRow),
    #[error("InvoiceError - Validation: {0}")]
    Validation(String),
}
