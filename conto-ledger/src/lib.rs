#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![cfg_attr(feature = "fail-on-warnings", deny(clippy::all))]

mod atomic_operation;
pub mod balance;
pub mod counterparty;
pub mod entry;
pub mod errors;
pub mod invoice;
mod ledger;
pub mod stock;

pub use atomic_operation::ScopeError;
pub use ledger::*;

pub mod primitives {
    pub use conto_types::currency::CurrencySnapshot;
    pub use conto_types::primitives::*;
}

pub use primitives::*;
