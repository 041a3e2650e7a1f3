use common::ids::TransactionId;
use common::storage_trait::StorageTrait;

/// Lifecycle of a transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransactionState {
    Active,
    Committed,
    RolledBack,
}

/// A unit of work against the storage manager.
///
/// Isolation and recovery are handled elsewhere; this only tracks the id
/// and tells the storage manager when the work is done.
#[derive(Debug)]
pub struct Transaction {
    tid: TransactionId,
    state: TransactionState,
}

impl Default for Transaction {
    fn default() -> Self {
        Self::new()
    }
}

impl Transaction {
    pub fn new() -> Self {
        let tid = TransactionId::new();
        debug!("Starting transaction {:?}", tid);
        Self {
            tid,
            state: TransactionState::Active,
        }
    }

    pub fn tid(&self) -> TransactionId {
        self.tid
    }

    pub fn state(&self) -> TransactionState {
        self.state
    }

    /// Finishes the transaction, keeping its changes.
    pub fn commit<S: StorageTrait>(&mut self, sm: &S) {
        self.finish(sm, TransactionState::Committed);
    }

    /// Finishes the transaction. Changes are not undone; there is no log to undo from.
    pub fn rollback<S: StorageTrait>(&mut self, sm: &S) {
        self.finish(sm, TransactionState::RolledBack);
    }

    fn finish<S: StorageTrait>(&mut self, sm: &S, state: TransactionState) {
        if self.state != TransactionState::Active {
            warn!("Transaction {:?} already finished as {:?}", self.tid, self.state);
            return;
        }
        sm.transaction_finished(self.tid);
        self.state = state;
        debug!("Transaction {:?} finished: {:?}", self.tid, state);
    }
}
