use thiserror::Error;

use crate::errors::CorruptRow;

#[derive(Error, Debug)]
pub enum StockError {
    #[error("StockError - Sqlx: {0}")]
    Sqlx(#[from] sqlx::Error),
    #[error("StockError - CorruptRow: {0}")]
    CorruptRow(#[from] CorruptRow),
}
