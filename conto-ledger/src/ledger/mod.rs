mod config;
pub mod error;

use std::{cmp, collections::BTreeMap, sync::Arc};

use chrono::{NaiveDate, Utc};
use rust_decimal::Decimal;
use sqlx::{
    sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteSynchronous},
    SqlitePool,
};
use tracing::instrument;

pub use config::*;
pub use error::LedgerError;

use crate::{
    atomic_operation::{AtomicOperation, CounterpartyScopes},
    balance::{error::BalanceError, Balances, EntryPosition},
    counterparty::Counterparties,
    entry::{error::EntryError, Entries, LedgerEntry, LedgerEntryUpdate, NewLedgerEntry},
    invoice::{error::InvoiceError, Invoice, Invoices, NewInvoice, SettlementOutcome},
    primitives::{
        CounterpartyId, Currency, CurrencySnapshot, DocumentRef, DocumentType, EntryId,
        EntryKind, InvoiceId, InvoiceKind, StockDirection, StockMovementId,
    },
    stock::{NewStockMovement, StockMovement, StockMovements},
};

/// An embeddable counterparty current-account ledger.
///
/// Every mutation of a counterparty's entries runs under that counterparty's
/// scope and inside one database transaction, and re-derives the running
/// balances it touched before committing.
#[derive(Clone)]
pub struct ContoLedger {
    pool: SqlitePool,
    counterparties: Counterparties,
    entries: Entries,
    balances: Balances,
    invoices: Invoices,
    stock: StockMovements,
    scopes: Arc<CounterpartyScopes>,
    base_currency: Currency,
}

impl ContoLedger {
    pub async fn init(config: ContoLedgerConfig) -> Result<Self, LedgerError> {
        let pool = match (config.pool, config.db_path) {
            (Some(pool), None) => pool,
            (None, Some(path)) => {
                let options = SqliteConnectOptions::new()
                    .filename(path)
                    .create_if_missing(true)
                    .journal_mode(SqliteJournalMode::Wal)
                    .synchronous(SqliteSynchronous::Normal)
                    .foreign_keys(true)
                    .busy_timeout(std::time::Duration::from_secs(5));
                SqlitePoolOptions::new()
                    .max_connections(config.max_connections)
                    .connect_with(options)
                    .await?
            }
            _ => {
                return Err(LedgerError::Config(
                    "One of 'db_path' or 'pool' must be set".to_string(),
                ))
            }
        };
        if config.exec_migrations {
            sqlx::migrate!().run(&pool).await?;
        }
        Ok(Self {
            counterparties: Counterparties::new(&pool),
            entries: Entries::new(&pool),
            balances: Balances::new(),
            invoices: Invoices::new(&pool),
            stock: StockMovements::new(&pool),
            scopes: Arc::new(CounterpartyScopes::new(config.lock_timeout)),
            base_currency: config.base_currency,
            pool,
        })
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    pub fn base_currency(&self) -> Currency {
        self.base_currency
    }

    pub fn counterparties(&self) -> &Counterparties {
        &self.counterparties
    }

    pub fn entries(&self) -> &Entries {
        &self.entries
    }

    pub fn invoices(&self) -> &Invoices {
        &self.invoices
    }

    pub fn stock(&self) -> &StockMovements {
        &self.stock
    }

    /// The cached display balance. Credits minus debits over the whole
    /// history; negative when the counterparty owes us.
    #[instrument(name = "conto_ledger.get_balance", skip(self), err)]
    pub async fn get_balance(&self, counterparty_id: CounterpartyId) -> Result<Decimal, LedgerError> {
        let counterparty = self.counterparties.find_by_id(counterparty_id).await?;
        Ok(counterparty.display_balance())
    }

    #[instrument(name = "conto_ledger.append_entry", skip(self, new_entry), err)]
    pub async fn append_entry(&self, new_entry: NewLedgerEntry) -> Result<LedgerEntry, LedgerError> {
        self.check_entry_snapshot(&new_entry)?;
        let counterparty_id = new_entry.counterparty_id;
        let mut op = self.begin_op(counterparty_id).await?;
        let values = self
            .entries
            .append_in_tx(op.tx(), new_entry, Utc::now())
            .await?;
        let position = values.position();
        self.recompute_guarded(&mut op, counterparty_id, position, position)
            .await?;
        let values = self.entries.find_by_id_in_tx(op.tx(), values.id).await?;
        op.commit().await?;
        Ok(LedgerEntry::from_values(values))
    }

    /// Removes a free-standing entry. Entries that belong to a document can
    /// only go away through [Self::reverse_document].
    #[instrument(name = "conto_ledger.delete_entry", skip(self), err)]
    pub async fn delete_entry(&self, id: EntryId) -> Result<(), LedgerError> {
        let entry = self.entries.find_by_id(id).await?;
        let counterparty_id = entry.values().counterparty_id;
        let mut op = self.begin_op(counterparty_id).await?;
        let values = self.entries.find_by_id_in_tx(op.tx(), id).await?;
        if values.document_ref.is_some() {
            return Err(EntryError::DocumentAttached(id).into());
        }
        let position = values.position();
        self.entries.delete_unchecked_in_tx(op.tx(), id).await?;
        self.recompute_guarded(&mut op, counterparty_id, position, position)
            .await?;
        op.commit().await?;
        Ok(())
    }

    /// Re-states an entry. The entry keeps its id and creation time but
    /// re-enters the sequence at its (possibly new) date with a fresh
    /// sequence number; everything between its old and new position is
    /// recomputed.
    #[instrument(name = "conto_ledger.edit_entry", skip(self, update), err)]
    pub async fn edit_entry(
        &self,
        id: EntryId,
        update: LedgerEntryUpdate,
    ) -> Result<LedgerEntry, LedgerError> {
        let entry = self.entries.find_by_id(id).await?;
        let counterparty_id = entry.values().counterparty_id;
        let mut op = self.begin_op(counterparty_id).await?;
        let current = self.entries.find_by_id_in_tx(op.tx(), id).await?;
        if current.document_ref.is_some() {
            return Err(EntryError::DocumentAttached(id).into());
        }
        let restated = update
            .apply_to(&current)
            .map_err(|e| EntryError::Validation(e.to_string()))?;
        self.check_entry_snapshot(&restated)?;
        let old_position = current.position();
        self.entries.delete_unchecked_in_tx(op.tx(), id).await?;
        let values = self
            .entries
            .append_in_tx(op.tx(), restated, current.created_at)
            .await?;
        let new_position = values.position();
        self.recompute_guarded(
            &mut op,
            counterparty_id,
            cmp::min(old_position, new_position),
            cmp::max(old_position, new_position),
        )
        .await?;
        let values = self.entries.find_by_id_in_tx(op.tx(), values.id).await?;
        op.commit().await?;
        Ok(LedgerEntry::from_values(values))
    }

    /// Creates the invoice, its charge entry and the stock movements for its
    /// product lines in one transaction.
    #[instrument(name = "conto_ledger.create_invoice", skip(self, new_invoice), err)]
    pub async fn create_invoice(&self, new_invoice: NewInvoice) -> Result<Invoice, LedgerError> {
        if new_invoice.currency == self.base_currency && new_invoice.exchange_rate != Decimal::ONE
        {
            return Err(InvoiceError::Validation(
                "base-currency invoices cannot carry an exchange rate".to_string(),
            )
            .into());
        }
        let counterparty_id = new_invoice.counterparty_id;
        let invoice_id = new_invoice.id;
        let kind = new_invoice.kind;
        let occurred_on = new_invoice.occurred_on;
        let created_at = Utc::now();

        let mut op = self.begin_op(counterparty_id).await?;

        let entry_id = EntryId::new();
        let invoice = self
            .invoices
            .create_in_tx(op.tx(), new_invoice, entry_id, created_at)
            .await?;
        let charge = self
            .charge_entry(&invoice, entry_id)
            .map_err(|e| EntryError::Validation(e.to_string()))?;
        let values = self.entries.append_in_tx(op.tx(), charge, created_at).await?;

        for line in &invoice.lines {
            let Some(product_id) = line.product_id else {
                continue;
            };
            let direction = match kind {
                InvoiceKind::Sales => StockDirection::Out,
                InvoiceKind::Purchase => StockDirection::In,
            };
            let movement = NewStockMovement::builder()
                .id(StockMovementId::new())
                .product_id(product_id)
                .document_ref(DocumentRef::invoice(invoice_id))
                .direction(direction)
                .quantity(line.quantity)
                .occurred_on(occurred_on)
                .build()
                .map_err(|e| InvoiceError::Validation(e.to_string()))?;
            self.stock.record_in_tx(op.tx(), movement, created_at).await?;
        }

        let position = values.position();
        self.recompute_guarded(&mut op, counterparty_id, position, position)
            .await?;
        op.commit().await?;
        Ok(Invoice::from_values(invoice))
    }

    /// Records a stand-alone stock movement, typically linked to an order
    /// document so it can be reversed with it.
    #[instrument(name = "conto_ledger.record_stock_movement", skip(self, new_movement), err)]
    pub async fn record_stock_movement(
        &self,
        new_movement: NewStockMovement,
    ) -> Result<StockMovement, LedgerError> {
        let values = self.stock.record(new_movement, Utc::now()).await?;
        Ok(StockMovement::from_values(values))
    }

    /// Records a payment against an invoice. The amount is in the payment's
    /// currency, which must match the invoice's; the rate is the one in
    /// force on the payment date, not the invoice's. Overpayment settles the
    /// invoice and the excess stays on the counterparty's account.
    #[instrument(name = "conto_ledger.record_payment", skip(self), err)]
    pub async fn record_payment(
        &self,
        invoice_id: InvoiceId,
        amount: Decimal,
        currency: Currency,
        rate: Decimal,
        occurred_on: NaiveDate,
    ) -> Result<SettlementOutcome, LedgerError> {
        let invoice = self.find_invoice(invoice_id).await?;
        if currency != invoice.values().currency {
            return Err(InvoiceError::Validation(format!(
                "payment currency {currency} does not match invoice currency {}",
                invoice.values().currency
            ))
            .into());
        }
        if rate <= Decimal::ZERO {
            return Err(InvoiceError::Validation(
                "exchange rate must be positive".to_string(),
            )
            .into());
        }
        if currency == self.base_currency && rate != Decimal::ONE {
            return Err(InvoiceError::Validation(
                "base-currency payments cannot carry an exchange rate".to_string(),
            )
            .into());
        }
        let counterparty_id = invoice.values().counterparty_id;
        let mut op = self.begin_op(counterparty_id).await?;

        let outcome = self
            .invoices
            .apply_payment_in_tx(op.tx(), invoice_id, amount)
            .await?;
        let payment = self
            .payment_entry(invoice.values(), amount, rate, occurred_on)
            .map_err(|e| EntryError::Validation(e.to_string()))?;
        let values = self
            .entries
            .append_in_tx(op.tx(), payment, Utc::now())
            .await?;
        let position = values.position();
        self.recompute_guarded(&mut op, counterparty_id, position, position)
            .await?;
        op.commit().await?;
        Ok(outcome)
    }

    /// Undoes a document: its charge entries and stock movements are deleted
    /// and balances are recomputed, all in one transaction. Payment entries
    /// that referenced the document stay behind as unapplied credit, with
    /// their document reference cleared.
    #[instrument(name = "conto_ledger.reverse_document", skip(self), err)]
    pub async fn reverse_document(
        &self,
        doc_type: DocumentType,
        doc_id: uuid::Uuid,
    ) -> Result<(), LedgerError> {
        match doc_type {
            DocumentType::Invoice => self.reverse_invoice(InvoiceId::from(doc_id)).await,
            DocumentType::Order => self.reverse_order(doc_id).await,
        }
    }

    /// Rebuilds the counterparty's balances from its first entry and lifts
    /// any quarantine when the rebuild verifies. Recovery path after a
    /// consistency failure.
    #[instrument(name = "conto_ledger.rebuild_balance", skip(self), err)]
    pub async fn rebuild_balance(
        &self,
        counterparty_id: CounterpartyId,
    ) -> Result<Decimal, LedgerError> {
        let scope = self.scopes.acquire_for_repair(counterparty_id).await?;
        let writer = self.scopes.acquire_writer().await?;
        let mut op = AtomicOperation::init(&self.pool, writer, vec![scope]).await?;
        let balance = self.balances.rebuild_in_tx(op.tx(), counterparty_id).await?;
        op.commit().await?;
        self.scopes.clear_quarantine(counterparty_id);
        Ok(balance)
    }

    /// Lifts a quarantine without rebuilding. Returns whether the
    /// counterparty was quarantined.
    pub fn clear_quarantine(&self, counterparty_id: CounterpartyId) -> bool {
        self.scopes.clear_quarantine(counterparty_id)
    }

    async fn reverse_invoice(&self, invoice_id: InvoiceId) -> Result<(), LedgerError> {
        let invoice = self.find_invoice(invoice_id).await?;
        let invoice = invoice.into_values();
        let counterparty_id = invoice.counterparty_id;
        let mut op = self.begin_op(counterparty_id).await?;

        let linked = self
            .entries
            .find_by_document_in_tx(op.tx(), DocumentType::Invoice, invoice.id.into())
            .await?;
        let mut deleted_positions = Vec::new();
        for entry in linked {
            if entry.id == invoice.linked_entry_id {
                deleted_positions.push(entry.position());
                self.entries.delete_unchecked_in_tx(op.tx(), entry.id).await?;
            } else {
                self.entries.detach_document_in_tx(op.tx(), entry.id).await?;
            }
        }
        self.invoices.delete_in_tx(op.tx(), invoice.id).await?;
        self.stock
            .delete_for_document_in_tx(op.tx(), DocumentType::Invoice, invoice.id.into())
            .await?;

        if let (Some(&from), Some(&through)) =
            (deleted_positions.iter().min(), deleted_positions.iter().max())
        {
            self.recompute_guarded(&mut op, counterparty_id, from, through)
                .await?;
        }
        op.commit().await?;
        Ok(())
    }

    /// An order may have touched several counterparties; every one of them
    /// is scoped and recomputed.
    async fn reverse_order(&self, doc_id: uuid::Uuid) -> Result<(), LedgerError> {
        let entries = self
            .entries
            .find_by_document(DocumentType::Order, doc_id)
            .await?;
        if entries.is_empty() {
            // No ledger side, maybe a stock-only order.
            let deleted = self
                .stock
                .delete_for_document(DocumentType::Order, doc_id)
                .await?;
            if deleted == 0 {
                return Err(LedgerError::DocumentNotFound(DocumentType::Order, doc_id));
            }
            return Ok(());
        }
        let counterparty_ids = entries
            .iter()
            .map(|e| e.values().counterparty_id)
            .collect();
        let mut op = self.begin_op_for_all(counterparty_ids).await?;

        let entries = self
            .entries
            .find_by_document_in_tx(op.tx(), DocumentType::Order, doc_id)
            .await?;
        let mut deleted_positions: BTreeMap<CounterpartyId, Vec<EntryPosition>> = BTreeMap::new();
        for entry in entries {
            deleted_positions
                .entry(entry.counterparty_id)
                .or_default()
                .push(entry.position());
            self.entries.delete_unchecked_in_tx(op.tx(), entry.id).await?;
        }
        self.stock
            .delete_for_document_in_tx(op.tx(), DocumentType::Order, doc_id)
            .await?;

        for (counterparty_id, positions) in deleted_positions {
            if let (Some(&from), Some(&through)) = (positions.iter().min(), positions.iter().max())
            {
                self.recompute_guarded(&mut op, counterparty_id, from, through)
                    .await?;
            }
        }
        op.commit().await?;
        Ok(())
    }

    async fn begin_op(&self, counterparty_id: CounterpartyId) -> Result<AtomicOperation, LedgerError> {
        let scope = self.scopes.acquire(counterparty_id).await?;
        let writer = self.scopes.acquire_writer().await?;
        Ok(AtomicOperation::init(&self.pool, writer, vec![scope]).await?)
    }

    /// Scopes are taken in id order so concurrent multi-counterparty
    /// operations cannot deadlock.
    async fn begin_op_for_all(
        &self,
        mut counterparty_ids: Vec<CounterpartyId>,
    ) -> Result<AtomicOperation, LedgerError> {
        counterparty_ids.sort_unstable();
        counterparty_ids.dedup();
        let mut scopes = Vec::with_capacity(counterparty_ids.len());
        for counterparty_id in counterparty_ids {
            scopes.push(self.scopes.acquire(counterparty_id).await?);
        }
        let writer = self.scopes.acquire_writer().await?;
        Ok(AtomicOperation::init(&self.pool, writer, scopes).await?)
    }

    async fn find_invoice(&self, invoice_id: InvoiceId) -> Result<Invoice, LedgerError> {
        match self.invoices.find_by_id(invoice_id).await {
            Err(InvoiceError::NotFound(id)) => {
                Err(LedgerError::DocumentNotFound(DocumentType::Invoice, id.into()))
            }
            res => Ok(res?),
        }
    }

    /// A failed consistency check halts the counterparty until an operator
    /// rebuilds or explicitly clears it.
    async fn recompute_guarded(
        &self,
        op: &mut AtomicOperation,
        counterparty_id: CounterpartyId,
        from: EntryPosition,
        touched_through: EntryPosition,
    ) -> Result<Decimal, LedgerError> {
        match self
            .balances
            .recompute_in_tx(op.tx(), counterparty_id, from, touched_through)
            .await
        {
            Ok(balance) => Ok(balance),
            Err(e) => {
                if let BalanceError::ConsistencyCheckFailed {
                    counterparty_id,
                    expected,
                    got,
                } = &e
                {
                    tracing::error!(
                        %counterparty_id,
                        %expected,
                        %got,
                        "running balance cache disagrees with the entry history"
                    );
                    self.scopes.quarantine(*counterparty_id, e.to_string());
                }
                Err(e.into())
            }
        }
    }

    fn check_entry_snapshot(&self, new_entry: &NewLedgerEntry) -> Result<(), EntryError> {
        if let Some(foreign) = &new_entry.foreign {
            if foreign.currency == self.base_currency {
                return Err(EntryError::Validation(
                    "base-currency entries carry no currency snapshot".to_string(),
                ));
            }
        }
        Ok(())
    }

    fn charge_entry(
        &self,
        invoice: &crate::invoice::InvoiceValues,
        entry_id: EntryId,
    ) -> Result<NewLedgerEntry, crate::entry::NewLedgerEntryBuilderError> {
        let (amount, foreign) =
            self.to_base(invoice.currency, invoice.grand_total, invoice.exchange_rate);
        let mut builder = NewLedgerEntry::builder();
        builder
            .id(entry_id)
            .counterparty_id(invoice.counterparty_id)
            .occurred_on(invoice.occurred_on)
            .kind(EntryKind::InvoiceCharge)
            .document_ref(DocumentRef::invoice(invoice.id));
        match invoice.kind {
            InvoiceKind::Sales => builder.debit(amount),
            InvoiceKind::Purchase => builder.credit(amount),
        };
        if let Some(foreign) = foreign {
            builder.foreign(foreign);
        }
        builder.build()
    }

    fn payment_entry(
        &self,
        invoice: &crate::invoice::InvoiceValues,
        amount: Decimal,
        rate: Decimal,
        occurred_on: NaiveDate,
    ) -> Result<NewLedgerEntry, crate::entry::NewLedgerEntryBuilderError> {
        let (base_amount, foreign) = self.to_base(invoice.currency, amount, rate);
        let mut builder = NewLedgerEntry::builder();
        builder
            .id(EntryId::new())
            .counterparty_id(invoice.counterparty_id)
            .occurred_on(occurred_on)
            .document_ref(DocumentRef::invoice(invoice.id));
        match invoice.kind {
            InvoiceKind::Sales => builder.kind(EntryKind::PaymentReceived).credit(base_amount),
            InvoiceKind::Purchase => builder.kind(EntryKind::PaymentMade).debit(base_amount),
        };
        if let Some(foreign) = foreign {
            builder.foreign(foreign);
        }
        builder.build()
    }

    /// Converts a foreign-currency amount to the base currency, carrying
    /// the snapshot that fixed the rate.
    fn to_base(
        &self,
        currency: Currency,
        amount: Decimal,
        rate: Decimal,
    ) -> (Decimal, Option<CurrencySnapshot>) {
        if currency == self.base_currency {
            (amount, None)
        } else {
            let snapshot = CurrencySnapshot::capture(amount, currency, rate, self.base_currency);
            (snapshot.base_amount(), Some(snapshot))
        }
    }
}
