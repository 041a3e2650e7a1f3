use crate::config::EngineConfig;
use crate::ids::{ContainerId, PageId, Permissions, TransactionId, ValueId};
use crate::index::{Index, IndexKind};
use crate::CrustyError;

/// The block-structured record store the query engine runs on.
///
/// A container holds the records of one table, temp table or other relation.
/// Records live in fixed-size slots grouped into blocks; the number of blocks
/// is what the cost model counts.
pub trait StorageTrait {
    /// Iterator over every record of a container, in block order.
    type ValIterator: Iterator<Item = (ValueId, Vec<u8>)>;

    /// Create a new storage manager with the given settings.
    fn new(config: EngineConfig) -> Self;

    /// Create a storage manager with default settings for testing.
    fn new_test_sm() -> Self;

    /// Creates a container whose records take `slot_size` bytes each and
    /// returns its id.
    fn create_container(&self, slot_size: usize) -> Result<ContainerId, CrustyError>;

    /// Removes a container and all of its records.
    fn remove_container(&self, container_id: ContainerId) -> Result<(), CrustyError>;

    /// Insert some bytes into a container. Returns where they were stored.
    fn insert_value(
        &self,
        container_id: ContainerId,
        value: Vec<u8>,
        tid: TransactionId,
    ) -> Result<ValueId, CrustyError>;

    /// Insert some bytes into a container for a particular value.
    fn insert_values(
        &self,
        container_id: ContainerId,
        values: Vec<Vec<u8>>,
        tid: TransactionId,
    ) -> Result<Vec<ValueId>, CrustyError>;

    /// Delete the data for a value.
    fn delete_value(&self, id: ValueId, tid: TransactionId) -> Result<(), CrustyError>;

    /// Replaces the bytes stored at `id`. The value keeps its location.
    fn update_value(
        &self,
        value: Vec<u8>,
        id: ValueId,
        tid: TransactionId,
    ) -> Result<ValueId, CrustyError>;

    /// Returns an iterator over every value in the container.
    fn get_iterator(
        &self,
        container_id: ContainerId,
        tid: TransactionId,
        perm: Permissions,
    ) -> Result<Self::ValIterator, CrustyError>;

    /// Get the data for a particular ValueId.
    fn get_value(
        &self,
        id: ValueId,
        tid: TransactionId,
        perm: Permissions,
    ) -> Result<Vec<u8>, CrustyError>;

    /// Number of blocks the container occupies.
    fn num_blocks(&self, container_id: ContainerId) -> Result<PageId, CrustyError>;

    /// Every live record stored in one block.
    fn read_block(
        &self,
        container_id: ContainerId,
        page_id: PageId,
        tid: TransactionId,
        perm: Permissions,
    ) -> Result<Vec<(ValueId, Vec<u8>)>, CrustyError>;

    /// Buffers the current transaction may occupy at once.
    fn available_buffers(&self) -> usize;

    /// Size of a block in bytes.
    fn page_size(&self) -> usize;

    /// Creates an empty secondary index.
    fn create_index(&self, name: &str, kind: IndexKind) -> Result<(), CrustyError>;

    /// Opens a probe handle on an existing index.
    fn open_index(&self, name: &str) -> Result<Box<dyn Index>, CrustyError>;

    /// Drops an index.
    fn remove_index(&self, name: &str) -> Result<(), CrustyError>;

    /// Notify the storage manager that the transaction is finished so that any held resources can be released.
    fn transaction_finished(&self, tid: TransactionId);

    /// Testing utility to reset all state associated the storage manager.
    fn reset(&self);

    /// Closes the storage manager. Nothing is persisted.
    fn shutdown(&self);
}
