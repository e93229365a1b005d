//! Running-balance recalculation. Every entry mutation calls
//! [Balances::recompute_in_tx] before commit so that the per-entry
//! `running_balance` cache and the counterparty's display balance never
//! drift from the entry history.
pub mod error;
mod repo;

use rust_decimal::Decimal;
use sqlx::{Sqlite, Transaction};

pub use conto_types::entry::EntryPosition;

use error::*;
use repo::*;

use crate::primitives::CounterpartyId;

#[derive(Clone)]
pub struct Balances {
    repo: BalanceRepo,
}

impl Balances {
    pub(crate) fn new() -> Self {
        Self { repo: BalanceRepo }
    }

    /// Re-derives running balances from `from` onwards and returns the new
    /// display balance.
    ///
    /// `touched_through` is the last position the mutation could have
    /// affected. Once a recomputed balance matches the cached one beyond that
    /// point every later entry is unchanged too, and the walk stops early.
    pub(crate) async fn recompute_in_tx(
        &self,
        db: &mut Transaction<'_, Sqlite>,
        counterparty_id: CounterpartyId,
        from: EntryPosition,
        touched_through: EntryPosition,
    ) -> Result<Decimal, BalanceError> {
        let opening = self
            .repo
            .balance_before(db, counterparty_id, from)
            .await?
            .unwrap_or(Decimal::ZERO);
        let slices = self.repo.slices_from(db, counterparty_id, from).await?;

        let mut running = opening;
        let mut stopped_early = false;
        for slice in &slices {
            let recomputed = running + slice.signed_amount;
            if recomputed == slice.cached_balance && slice.position > touched_through {
                stopped_early = true;
                break;
            }
            if recomputed != slice.cached_balance {
                self.repo
                    .update_running_balance(db, &slice.id, recomputed)
                    .await?;
            }
            running = recomputed;
        }

        let display = if stopped_early {
            self.repo
                .last_running_balance(db, counterparty_id)
                .await?
                .unwrap_or(Decimal::ZERO)
        } else {
            running
        };

        let expected = self.repo.history_total(db, counterparty_id).await?;
        if expected != display {
            return Err(BalanceError::ConsistencyCheckFailed {
                counterparty_id,
                expected,
                got: display,
            });
        }

        self.repo
            .update_display_balance(db, counterparty_id, display)
            .await?;
        Ok(display)
    }

    /// Full rebuild from the first entry. Recovery path after a consistency
    /// failure.
    pub(crate) async fn rebuild_in_tx(
        &self,
        db: &mut Transaction<'_, Sqlite>,
        counterparty_id: CounterpartyId,
    ) -> Result<Decimal, BalanceError> {
        self.recompute_in_tx(
            db,
            counterparty_id,
            EntryPosition::ORIGIN,
            EntryPosition::END,
        )
        .await
    }
}
