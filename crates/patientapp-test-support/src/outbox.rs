//! In-memory transactional store — an `OutboxStore` and `TransactionManager`
//! backed by a mutex, with switches for injecting storage failures.

use std::any::Any;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use patientapp_core::error::DomainError;
use patientapp_core::outbox::{OutboxRecord, OutboxStore};
use patientapp_core::unit_of_work::{Transaction, TransactionManager};
use uuid::Uuid;

/// A state write staged by a repository: one JSON row keyed by table and id.
#[derive(Debug, Clone, PartialEq)]
pub struct StagedRow {
    /// Logical table name (e.g. `"patients"`).
    pub table: String,
    /// Row key.
    pub key: Uuid,
    /// Row contents.
    pub value: serde_json::Value,
}

#[derive(Debug, Default)]
struct State {
    records: Vec<OutboxRecord>,
    rows: HashMap<(String, Uuid), serde_json::Value>,
}

#[derive(Debug, Default)]
struct Switches {
    fail_commit: AtomicBool,
    fail_fetch: AtomicBool,
    fail_mark: AtomicBool,
    commits: AtomicUsize,
    rollbacks: AtomicUsize,
}

/// An in-memory store shared by every transaction it begins. Clones share
/// state.
#[derive(Debug, Clone, Default)]
pub struct InMemoryOutbox {
    state: Arc<Mutex<State>>,
    switches: Arc<Switches>,
}

impl InMemoryOutbox {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes every subsequent commit fail with an infrastructure error.
    pub fn fail_commits(&self, fail: bool) {
        self.switches.fail_commit.store(fail, Ordering::SeqCst);
    }

    /// Makes every subsequent `fetch_unprocessed` fail.
    pub fn fail_fetches(&self, fail: bool) {
        self.switches.fail_fetch.store(fail, Ordering::SeqCst);
    }

    /// Makes every subsequent `mark_processed` fail, simulating a crash
    /// between publishing and marking.
    pub fn fail_marks(&self, fail: bool) {
        self.switches.fail_mark.store(fail, Ordering::SeqCst);
    }

    /// Inserts a record directly, bypassing the unit of work. Used to seed
    /// corrupt or foreign records.
    ///
    /// # Panics
    ///
    /// Panics if the internal mutex is poisoned.
    pub fn seed(&self, record: OutboxRecord) {
        self.state.lock().unwrap().records.push(record);
    }

    /// Returns a snapshot of every committed outbox record in insertion order.
    ///
    /// # Panics
    ///
    /// Panics if the internal mutex is poisoned.
    pub fn records(&self) -> Vec<OutboxRecord> {
        self.state.lock().unwrap().records.clone()
    }

    /// Returns a snapshot of the committed outbox records not yet processed.
    pub fn unprocessed(&self) -> Vec<OutboxRecord> {
        self.records().into_iter().filter(|r| !r.processed).collect()
    }

    /// Returns the committed row for `table`/`key`, if any.
    ///
    /// # Panics
    ///
    /// Panics if the internal mutex is poisoned.
    pub fn row(&self, table: &str, key: Uuid) -> Option<serde_json::Value> {
        self.state
            .lock()
            .unwrap()
            .rows
            .get(&(table.to_owned(), key))
            .cloned()
    }

    /// Returns every committed row of `table`.
    ///
    /// # Panics
    ///
    /// Panics if the internal mutex is poisoned.
    pub fn rows(&self, table: &str) -> Vec<serde_json::Value> {
        self.state
            .lock()
            .unwrap()
            .rows
            .iter()
            .filter(|((t, _), _)| t == table)
            .map(|(_, v)| v.clone())
            .collect()
    }

    /// Number of successful commits.
    pub fn commit_count(&self) -> usize {
        self.switches.commits.load(Ordering::SeqCst)
    }

    /// Number of rollbacks.
    pub fn rollback_count(&self) -> usize {
        self.switches.rollbacks.load(Ordering::SeqCst)
    }

    /// Begins a concrete in-memory transaction.
    #[must_use]
    pub fn begin_in_memory(&self) -> InMemoryTransaction {
        InMemoryTransaction {
            store: self.clone(),
            staged_records: Vec::new(),
            staged_rows: Vec::new(),
            finished: false,
        }
    }
}

#[async_trait]
impl TransactionManager for InMemoryOutbox {
    async fn begin(&self) -> Result<Box<dyn Transaction>, DomainError> {
        Ok(Box::new(self.begin_in_memory()))
    }
}

#[async_trait]
impl OutboxStore for InMemoryOutbox {
    async fn fetch_unprocessed(&self, limit: u32) -> Result<Vec<OutboxRecord>, DomainError> {
        if self.switches.fail_fetch.load(Ordering::SeqCst) {
            return Err(DomainError::Infrastructure("connection refused".into()));
        }
        let mut pending = self.unprocessed();
        pending.sort_by(|a, b| a.occurred_at.cmp(&b.occurred_at).then(a.id.cmp(&b.id)));
        pending.truncate(limit as usize);
        Ok(pending)
    }

    async fn mark_processed(
        &self,
        id: Uuid,
        processed_at: DateTime<Utc>,
    ) -> Result<(), DomainError> {
        if self.switches.fail_mark.load(Ordering::SeqCst) {
            return Err(DomainError::Infrastructure("connection reset".into()));
        }
        let mut state = self.state.lock().unwrap();
        let record = state
            .records
            .iter_mut()
            .find(|r| r.id == id)
            .ok_or(DomainError::AggregateNotFound(id))?;
        record.mark_processed(processed_at)
    }

    async fn purge_processed_before(&self, cutoff: DateTime<Utc>) -> Result<u64, DomainError> {
        let mut state = self.state.lock().unwrap();
        let before = state.records.len();
        state
            .records
            .retain(|r| !matches!(r.processed_at, Some(at) if at < cutoff));
        Ok((before - state.records.len()) as u64)
    }
}

/// A transaction that buffers writes until commit.
#[derive(Debug)]
pub struct InMemoryTransaction {
    store: InMemoryOutbox,
    staged_records: Vec<OutboxRecord>,
    staged_rows: Vec<StagedRow>,
    finished: bool,
}

impl InMemoryTransaction {
    /// Stages a state row write.
    pub fn stage_row(&mut self, table: &str, key: Uuid, value: serde_json::Value) {
        self.staged_rows.push(StagedRow {
            table: table.to_owned(),
            key,
            value,
        });
    }

    /// Returns the committed row for `table`/`key` as seen by this
    /// transaction (staged writes first).
    pub fn read_row(&self, table: &str, key: Uuid) -> Option<serde_json::Value> {
        self.staged_rows
            .iter()
            .rev()
            .find(|r| r.table == table && r.key == key)
            .map(|r| r.value.clone())
            .or_else(|| self.store.row(table, key))
    }

    /// Returns the outbox records staged so far.
    #[must_use]
    pub fn staged_records(&self) -> &[OutboxRecord] {
        &self.staged_records
    }

    fn ensure_open(&self) -> Result<(), DomainError> {
        if self.finished {
            return Err(DomainError::Infrastructure(
                "transaction already finished".into(),
            ));
        }
        Ok(())
    }
}

#[async_trait]
impl Transaction for InMemoryTransaction {
    async fn stage_outbox_records(&mut self, records: &[OutboxRecord]) -> Result<(), DomainError> {
        self.ensure_open()?;
        self.staged_records.extend_from_slice(records);
        Ok(())
    }

    async fn commit(&mut self) -> Result<(), DomainError> {
        self.ensure_open()?;
        self.finished = true;
        if self.store.switches.fail_commit.load(Ordering::SeqCst) {
            self.staged_records.clear();
            self.staged_rows.clear();
            return Err(DomainError::Infrastructure("commit failed".into()));
        }
        let mut state = self.store.state.lock().unwrap();
        for row in self.staged_rows.drain(..) {
            state.rows.insert((row.table, row.key), row.value);
        }
        state.records.append(&mut self.staged_records);
        self.store.switches.commits.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn rollback(&mut self) -> Result<(), DomainError> {
        self.ensure_open()?;
        self.finished = true;
        self.staged_records.clear();
        self.staged_rows.clear();
        self.store.switches.rollbacks.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}
