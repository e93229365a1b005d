//! [CounterpartyAccount] is the per-customer/vendor current account whose
//! entries the ledger keeps in running-balance order.
mod entity;
pub mod error;
mod repo;

use chrono::Utc;
use sqlx::SqlitePool;
use tracing::instrument;

pub use entity::*;
use error::*;
use repo::*;

/// Service for working with `CounterpartyAccount` entities.
#[derive(Clone)]
pub struct Counterparties {
    repo: CounterpartyRepo,
}

impl Counterparties {
    pub(crate) fn new(pool: &SqlitePool) -> Self {
        Self {
            repo: CounterpartyRepo::new(pool),
        }
    }

    #[instrument(name = "conto_ledger.counterparties.create", skip(self), err)]
    pub async fn create(
        &self,
        new_counterparty: NewCounterparty,
    ) -> Result<CounterpartyAccount, CounterpartyError> {
        let values = new_counterparty.into_values(Utc::now());
        self.repo.create(&values).await?;
        Ok(CounterpartyAccount::from_values(values))
    }

    #[instrument(name = "conto_ledger.counterparties.find", skip(self), err)]
    pub async fn find_by_id(
        &self,
        id: CounterpartyId,
    ) -> Result<CounterpartyAccount, CounterpartyError> {
        let values = self.repo.find_by_id(id).await?;
        Ok(CounterpartyAccount::from_values(values))
    }

    #[instrument(name = "conto_ledger.counterparties.list", skip(self), err)]
    pub async fn list(&self) -> Result<Vec<CounterpartyAccount>, CounterpartyError> {
        let values = self.repo.list().await?;
        Ok(values
            .into_iter()
            .map(CounterpartyAccount::from_values)
            .collect())
    }
}
