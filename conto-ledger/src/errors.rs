use thiserror::Error;

/// A stored value that could not be decoded back into its domain type.
/// Amounts, dates, ids and enums are persisted as TEXT; hitting this means
/// the row was written by something other than this crate.
#[derive(Error, Debug)]
#[error("Corrupt {table} row: {column}: {reason}")]
pub struct CorruptRow {
    pub table: &'static str,
    pub column: &'static str,
    pub reason: String,
}

impl CorruptRow {
    pub(crate) fn parse<T>(
        table: &'static str,
        column: &'static str,
        raw: &str,
    ) -> Result<T, Self>
    where
        T: std::str::FromStr,
        T::Err: std::fmt::Display,
    {
        raw.parse().map_err(|e: T::Err| Self {
            table,
            column,
            reason: e.to_string(),
        })
    }
}
