use std::{path::PathBuf, time::Duration};

use derive_builder::Builder;
use sqlx::SqlitePool;

use crate::primitives::Currency;

fn default_base_currency() -> Currency {
    "EUR".parse().expect("EUR is a known ISO currency")
}

#[derive(Debug, Clone, Builder)]
#[builder(build_fn(validate = "Self::validate"))]
pub struct ContoLedgerConfig {
    #[builder(setter(strip_option, into), default)]
    pub(super) db_path: Option<PathBuf>,
    #[builder(setter(strip_option), default)]
    pub(super) pool: Option<SqlitePool>,
    #[builder(default = "20")]
    pub(super) max_connections: u32,
    #[builder(default)]
    pub(super) exec_migrations: bool,
    #[builder(default = "default_base_currency()")]
    pub(super) base_currency: Currency,
    #[builder(default = "Duration::from_secs(5)")]
    pub(super) lock_timeout: Duration,
}

impl ContoLedgerConfig {
    pub fn builder() -> ContoLedgerConfigBuilder {
        ContoLedgerConfigBuilder::default()
    }
}

impl ContoLedgerConfigBuilder {
    fn validate(&self) -> Result<(), String> {
        let db_path_set = matches!(self.db_path, Some(Some(_)));
        let pool_set = matches!(self.pool, Some(Some(_)));
        if db_path_set && pool_set {
            return Err("One of 'db_path' or 'pool' must be set, not both".to_string());
        }
        if !db_path_set && !pool_set {
            return Err("One of 'db_path' or 'pool' must be set".to_string());
        }
        if pool_set && self.max_connections.is_some() {
            return Err("'max_connections' must not be set when 'pool' is provided".to_string());
        }
        Ok(())
    }
}
