use thiserror::Error;

use crate::{
    atomic_operation::ScopeError, balance::error::BalanceError,
    counterparty::error::CounterpartyError, entry::error::EntryError,
    invoice::error::InvoiceError, primitives::DocumentType, stock::error::StockError,
};

#[derive(Error, Debug)]
pub enum LedgerError {
    #[error("LedgerError - Sqlx: {0}")]
    Sqlx(#[from] sqlx::Error),
    #[error("LedgerError - SqlxMigrate: {0}")]
    SqlxMigrate(#[from] sqlx::migrate::MigrateError),
    #[error("LedgerError - Config: {0}")]
    Config(String),
    #[error("LedgerError - Scope: {0}")]
    Scope(#[from] ScopeError),
    #[error("LedgerError - CounterpartyError: {0}")]
    Counterparty(#[from] CounterpartyError),
    #[error("LedgerError - EntryError: {0}")]
    Entry(#[from] EntryError),
    #[error("LedgerError - BalanceError: {0}")]
    Balance(#[from] BalanceError),
    #[error("LedgerError - InvoiceError: {0}")]
    Invoice(#[from] InvoiceError),
    #[error("LedgerError - StockError: {0}")]
    Stock(#[from] StockError),
    #[error("LedgerError - DocumentNotFound: no {0} document {1}")]
    DocumentNotFound(DocumentType, uuid::Uuid),
}
