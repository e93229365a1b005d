use thiserror::Error;

use crate::{errors::CorruptRow, primitives::EntryId};

#[derive(Error, Debug)]
pub enum EntryError {
    #[error("EntryError - Sqlx: {0}")]
    Sqlx(#[from] sqlx::Error),
    #[error("EntryError - NotFound: no entry {0}")]
    NotFound(EntryId),
    #[error("EntryError - CorruptRow: {0}")]
    CorruptRow(#[from] CorruptRow),
    #[error("EntryError - Validation: {0}")]
    Validation(String),
    #[error("EntryError - DocumentAttached: entry {0} belongs to a document; reverse the document instead")]
    DocumentAttached(EntryId),
}
