use std::{sync::Arc, time::Duration};

use dashmap::DashMap;
use sqlx::{Sqlite, SqlitePool, Transaction};
use tokio::sync::{Mutex, OwnedMutexGuard};

use crate::primitives::CounterpartyId;

#[derive(thiserror::Error, Debug)]
pub enum ScopeError {
    #[error("ScopeError - LockTimeout: could not acquire scope for counterparty {0}")]
    LockTimeout(CounterpartyId),
    #[error("ScopeError - WriterBusy: could not start a write transaction within the bounded wait")]
    WriterBusy,
    #[error("ScopeError - Quarantined: counterparty {0} is halted after a consistency failure: {1}")]
    Quarantined(CounterpartyId, String),
}

/// Per-counterparty mutual exclusion. Every mutation of a counterparty's
/// entry sequence runs under its scope; operations on different
/// counterparties never contend.
pub(crate) struct CounterpartyScopes {
    locks: DashMap<CounterpartyId, Arc<Mutex<()>>>,
    quarantined: DashMap<CounterpartyId, String>,
    /// SQLite supports a single write transaction at a time. Multi-statement
    /// writes take this gate before `begin` so concurrent operations queue
    /// here (bounded) instead of failing a deferred read-to-write upgrade
    /// with SQLITE_BUSY mid-transaction.
    writer: Arc<Mutex<()>>,
    lock_timeout: Duration,
}

impl CounterpartyScopes {
    pub(crate) fn new(lock_timeout: Duration) -> Self {
        Self {
            locks: DashMap::new(),
            quarantined: DashMap::new(),
            writer: Arc::new(Mutex::new(())),
            lock_timeout,
        }
    }

    pub(crate) async fn acquire_writer(&self) -> Result<OwnedMutexGuard<()>, ScopeError> {
        tokio::time::timeout(self.lock_timeout, self.writer.clone().lock_owned())
            .await
            .map_err(|_| ScopeError::WriterBusy)
    }

    pub(crate) async fn acquire(
        &self,
        counterparty_id: CounterpartyId,
    ) -> Result<OwnedMutexGuard<()>, ScopeError> {
        self.check_quarantine(counterparty_id)?;
        let lock = self
            .locks
            .entry(counterparty_id)
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone();
        let guard = tokio::time::timeout(self.lock_timeout, lock.lock_owned())
            .await
            .map_err(|_| ScopeError::LockTimeout(counterparty_id))?;
        // A consistency failure may have landed while we were waiting.
        self.check_quarantine(counterparty_id)?;
        Ok(guard)
    }

    /// Takes the scope even while the counterparty is quarantined. Only the
    /// rebuild path uses this; everything else goes through [Self::acquire].
    pub(crate) async fn acquire_for_repair(
        &self,
        counterparty_id: CounterpartyId,
    ) -> Result<OwnedMutexGuard<()>, ScopeError> {
        let lock = self
            .locks
            .entry(counterparty_id)
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone();
        tokio::time::timeout(self.lock_timeout, lock.lock_owned())
            .await
            .map_err(|_| ScopeError::LockTimeout(counterparty_id))
    }

    pub(crate) fn quarantine(&self, counterparty_id: CounterpartyId, reason: String) {
        self.quarantined.insert(counterparty_id, reason);
    }

    pub(crate) fn clear_quarantine(&self, counterparty_id: CounterpartyId) -> bool {
        self.quarantined.remove(&counterparty_id).is_some()
    }

    fn check_quarantine(&self, counterparty_id: CounterpartyId) -> Result<(), ScopeError> {
        if let Some(reason) = self.quarantined.get(&counterparty_id) {
            return Err(ScopeError::Quarantined(
                counterparty_id,
                reason.value().clone(),
            ));
        }
        Ok(())
    }
}

/// One logical ledger mutation: the database transaction, the write gate,
/// and the counterparty scope(s) it covers. Dropping without commit rolls
/// back and releases everything. An order reversal can span several
/// counterparties, hence a list of scopes.
pub struct AtomicOperation {
    tx: Transaction<'static, Sqlite>,
    _writer: OwnedMutexGuard<()>,
    _scopes: Vec<OwnedMutexGuard<()>>,
}

impl AtomicOperation {
    pub(crate) async fn init(
        pool: &SqlitePool,
        writer: OwnedMutexGuard<()>,
        scopes: Vec<OwnedMutexGuard<()>>,
    ) -> Result<Self, sqlx::Error> {
        Ok(Self {
            tx: pool.begin().await?,
            _writer: writer,
            _scopes: scopes,
        })
    }

    pub(crate) fn tx(&mut self) -> &mut Transaction<'static, Sqlite> {
        &mut self.tx
    }

    pub(crate) async fn commit(self) -> Result<(), sqlx::Error> {
        self.tx.commit().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn contended_scope_times_out() {
        let scopes = CounterpartyScopes::new(Duration::from_millis(20));
        let id = CounterpartyId::new();
        let _held = scopes.acquire(id).await.unwrap();
        match scopes.acquire(id).await {
            Err(ScopeError::LockTimeout(timed_out)) => assert_eq!(timed_out, id),
            other => panic!("expected lock timeout, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn quarantine_blocks_until_cleared() {
        let scopes = CounterpartyScopes::new(Duration::from_millis(20));
        let id = CounterpartyId::new();
        scopes.quarantine(id, "balance drift".to_string());
        assert!(matches!(
            scopes.acquire(id).await,
            Err(ScopeError::Quarantined(_, _))
        ));
        assert!(scopes.clear_quarantine(id));
        assert!(scopes.acquire(id).await.is_ok());
    }

    #[tokio::test]
    async fn distinct_counterparties_do_not_contend() {
        let scopes = CounterpartyScopes::new(Duration::from_millis(20));
        let _a = scopes.acquire(CounterpartyId::new()).await.unwrap();
        let _b = scopes.acquire(CounterpartyId::new()).await.unwrap();
    }

    #[tokio::test]
    async fn writer_gate_queues_with_a_bounded_wait() {
        let scopes = CounterpartyScopes::new(Duration::from_millis(20));
        let held = scopes.acquire_writer().await.unwrap();
        assert!(matches!(
            scopes.acquire_writer().await,
            Err(ScopeError::WriterBusy)
        ));
        drop(held);
        assert!(scopes.acquire_writer().await.is_ok());
    }
}
