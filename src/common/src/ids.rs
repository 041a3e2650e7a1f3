use std::sync::atomic::{AtomicU16, AtomicU64, Ordering};

static TXN_COUNTER: AtomicU64 = AtomicU64::new(0);

/// Permissions for locks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Permissions {
    ReadOnly,
    ReadWrite,
}

/// Implementation of transaction id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TransactionId {
    /// Id of transaction.
    id: u64,
}

impl TransactionId {
    /// Creates a new transaction id.
    pub fn new() -> Self {
        Self {
            id: TXN_COUNTER.fetch_add(1, Ordering::SeqCst),
        }
    }

    /// Returns the transaction id.
    pub fn id(&self) -> u64 {
        self.id
    }
}

impl Default for TransactionId {
    fn default() -> Self {
        TransactionId::new()
    }
}

/// The type for the container ID and the associated atomic type (for use within a Storage Manager)
pub type ContainerId = u16;
pub type AtomicContainerId = AtomicU16;
pub type PageId = u16;
pub type SlotId = u16;

/// Location of a record: the container holding it, the block inside the
/// container, and the slot inside the block.
#[derive(PartialEq, Clone, Copy, Eq, Hash, Debug, Serialize, Deserialize, PartialOrd, Ord)]
pub struct ValueId {
    pub container_id: ContainerId,
    pub page_id: PageId,
    pub slot_id: SlotId,
}

impl ValueId {
    pub fn new(container_id: ContainerId, page_id: PageId, slot_id: SlotId) -> Self {
        ValueId {
            container_id,
            page_id,
            slot_id,
        }
    }
}
