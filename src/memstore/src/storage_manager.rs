use crate::index::MemIndex;
use common::config::EngineConfig;
use common::ids::Permissions;
use common::ids::*;
use common::index::{Index, IndexKind};
use common::storage_trait::StorageTrait;
use common::CrustyError;

use std::collections::HashMap;
use std::convert::TryFrom;
use std::sync::atomic::Ordering;
use std::sync::{Arc, PoisonError, RwLock};

pub(crate) fn poisoned<T>(_: PoisonError<T>) -> CrustyError {
    CrustyError::IOError(String::from("memstore lock poisoned"))
}

/// A block is a fixed number of record slots; `None` marks a free slot.
type Block = Vec<Option<Vec<u8>>>;

/// Records of one relation, grouped into blocks.
struct Container {
    /// How many records fit in one block.
    slots_per_block: usize,
    blocks: Vec<Block>,
    /// No block before this one has a free slot.
    free_hint: usize,
}

impl Container {
    fn new(slots_per_block: usize) -> Self {
        Container {
            slots_per_block,
            blocks: Vec::new(),
            free_hint: 0,
        }
    }

    /// Finds the first free slot, appending a block if every block is full.
    fn claim_slot(&mut self) -> Result<(PageId, SlotId), CrustyError> {
        let mut page = self.free_hint;
        while page < self.blocks.len() {
            let block = &mut self.blocks[page];
            if let Some(slot) = block.iter().position(|s| s.is_none()) {
                return Ok((to_page_id(page)?, to_slot_id(slot)?));
            }
            if block.len() < self.slots_per_block {
                block.push(None);
                return Ok((to_page_id(page)?, to_slot_id(block.len() - 1)?));
            }
            page += 1;
            self.free_hint = page;
        }
        self.blocks.push(vec![None]);
        Ok((to_page_id(self.blocks.len() - 1)?, 0))
    }

    fn slot_mut(&mut self, id: &ValueId) -> Option<&mut Option<Vec<u8>>> {
        self.blocks
            .get_mut(id.page_id as usize)
            .and_then(|b| b.get_mut(id.slot_id as usize))
    }

    fn slot(&self, id: &ValueId) -> Option<&Option<Vec<u8>>> {
        self.blocks
            .get(id.page_id as usize)
            .and_then(|b| b.get(id.slot_id as usize))
    }
}

fn to_page_id(page: usize) -> Result<PageId, CrustyError> {
    PageId::try_from(page)
        .map_err(|_| CrustyError::IOError(format!("Container exceeds {} blocks", PageId::MAX)))
}

fn to_slot_id(slot: usize) -> Result<SlotId, CrustyError> {
    SlotId::try_from(slot)
        .map_err(|_| CrustyError::IOError(format!("Block exceeds {} slots", SlotId::MAX)))
}

type ContainerRef = Arc<RwLock<Container>>;

/// The MemStore StorageManager. Holds every container and index in memory;
/// nothing survives `shutdown`.
pub struct StorageManager {
    containers: Arc<RwLock<HashMap<ContainerId, ContainerRef>>>,
    indexes: Arc<RwLock<HashMap<String, MemIndex>>>,
    next_container: AtomicContainerId,
    config: EngineConfig,
}

impl Drop for StorageManager {
    fn drop(&mut self) {
        info!("Dropping Storage Manager");
    }
}

impl StorageManager {
    /// Test storage manager with a custom block size and buffer budget.
    pub fn new_test_sm_with(page_size: usize, buffer_pool_size: usize) -> Self {
        StorageManager::new(EngineConfig {
            page_size,
            buffer_pool_size,
            ..EngineConfig::default()
        })
    }

    fn get_container(&self, container_id: ContainerId) -> Result<ContainerRef, CrustyError> {
        let containers = self.containers.read().map_err(poisoned)?;
        containers.get(&container_id).cloned().ok_or_else(|| {
            CrustyError::IOError(format!("Container {} not found", container_id))
        })
    }

    /// Number of containers currently allocated.
    pub fn container_count(&self) -> usize {
        self.containers.read().map(|c| c.len()).unwrap_or(0)
    }

    /// Number of live records in a container.
    pub fn num_records(&self, container_id: ContainerId) -> Result<usize, CrustyError> {
        let container = self.get_container(container_id)?;
        let container = container.read().map_err(poisoned)?;
        Ok(container
            .blocks
            .iter()
            .map(|b| b.iter().filter(|s| s.is_some()).count())
            .sum())
    }
}

impl StorageTrait for StorageManager {
    type ValIterator = ValueIterator;

    /// Create a new, empty SM.
    fn new(config: EngineConfig) -> Self {
        info!("Creating new memstore::storage_manager with {:?}", &config);
        StorageManager {
            containers: Arc::new(RwLock::new(HashMap::new())),
            indexes: Arc::new(RwLock::new(HashMap::new())),
            next_container: AtomicContainerId::new(0),
            config,
        }
    }

    fn new_test_sm() -> Self {
        StorageManager::new(EngineConfig::default())
    }

    fn create_container(&self, slot_size: usize) -> Result<ContainerId, CrustyError> {
        if slot_size == 0 {
            return Err(CrustyError::IOError(String::from(
                "Cannot create a container with empty records",
            )));
        }
        let slots_per_block = (self.config.page_size / slot_size).max(1);
        let mut containers = self.containers.write().map_err(poisoned)?;
        let container_id = self.next_container.fetch_add(1, Ordering::SeqCst);
        if containers.contains_key(&container_id) {
            return Err(CrustyError::IOError(String::from(
                "Out of container ids",
            )));
        }
        debug!(
            "memstore::create_container container_id: {:?} slots_per_block: {}",
            &container_id, slots_per_block
        );
        containers.insert(
            container_id,
            Arc::new(RwLock::new(Container::new(slots_per_block))),
        );
        Ok(container_id)
    }

    /// Remove the container and all stored values in the container.
    fn remove_container(&self, container_id: ContainerId) -> Result<(), CrustyError> {
        let mut containers = self.containers.write().map_err(poisoned)?;
        if containers.remove(&container_id).is_none() {
            debug!(
                "memstore::remove_container container_id: {:?} does not exist",
                &container_id
            );
        } else {
            debug!("memstore::remove_container container_id: {:?} dropped", &container_id);
        }
        Ok(())
    }

    /// Insert bytes into the first free slot of a container.
    fn insert_value(
        &self,
        container_id: ContainerId,
        value: Vec<u8>,
        _tid: TransactionId,
    ) -> Result<ValueId, CrustyError> {
        let container = self.get_container(container_id)?;
        let mut container = container.write().map_err(poisoned)?;
        let (page_id, slot_id) = container.claim_slot()?;
        let rid = ValueId::new(container_id, page_id, slot_id);
        if let Some(slot) = container.slot_mut(&rid) {
            *slot = Some(value);
        }
        Ok(rid)
    }

    fn insert_values(
        &self,
        container_id: ContainerId,
        values: Vec<Vec<u8>>,
        tid: TransactionId,
    ) -> Result<Vec<ValueId>, CrustyError> {
        values
            .into_iter()
            .map(|v| self.insert_value(container_id, v, tid))
            .collect()
    }

    /// Frees the slot holding the value. Deleting a free slot is a no-op.
    fn delete_value(&self, id: ValueId, _tid: TransactionId) -> Result<(), CrustyError> {
        let container = self.get_container(id.container_id)?;
        let mut container = container.write().map_err(poisoned)?;
        if let Some(slot) = container.slot_mut(&id) {
            *slot = None;
            container.free_hint = container.free_hint.min(id.page_id as usize);
        }
        Ok(())
    }

    fn update_value(
        &self,
        value: Vec<u8>,
        id: ValueId,
        _tid: TransactionId,
    ) -> Result<ValueId, CrustyError> {
        let container = self.get_container(id.container_id)?;
        let mut container = container.write().map_err(poisoned)?;
        match container.slot_mut(&id) {
            Some(slot) if slot.is_some() => {
                *slot = Some(value);
                Ok(id)
            }
            _ => Err(CrustyError::ExecutionError(format!(
                "Record ID not found {:?}",
                id
            ))),
        }
    }

    fn get_iterator(
        &self,
        container_id: ContainerId,
        _tid: TransactionId,
        _perm: Permissions,
    ) -> Result<ValueIterator, CrustyError> {
        debug!("memstore::get_iterator container_id: {:?}", &container_id);
        Ok(ValueIterator::new(
            self.get_container(container_id)?,
            container_id,
        ))
    }

    /// Get the bytes for a given value if found
    fn get_value(
        &self,
        id: ValueId,
        _tid: TransactionId,
        _perm: Permissions,
    ) -> Result<Vec<u8>, CrustyError> {
        let container = self.get_container(id.container_id)?;
        let container = container.read().map_err(poisoned)?;
        match container.slot(&id) {
            Some(Some(bytes)) => Ok(bytes.clone()),
            _ => Err(CrustyError::ExecutionError(format!(
                "Record ID not found {:?}",
                id
            ))),
        }
    }

    fn num_blocks(&self, container_id: ContainerId) -> Result<PageId, CrustyError> {
        let container = self.get_container(container_id)?;
        let container = container.read().map_err(poisoned)?;
        to_page_id(container.blocks.len())
    }

    fn read_block(
        &self,
        container_id: ContainerId,
        page_id: PageId,
        _tid: TransactionId,
        _perm: Permissions,
    ) -> Result<Vec<(ValueId, Vec<u8>)>, CrustyError> {
        let container = self.get_container(container_id)?;
        let container = container.read().map_err(poisoned)?;
        let block = container.blocks.get(page_id as usize).ok_or_else(|| {
            CrustyError::IOError(format!(
                "Block {} of container {} not found",
                page_id, container_id
            ))
        })?;
        let mut records = Vec::with_capacity(block.len());
        for (slot, value) in block.iter().enumerate() {
            if let Some(bytes) = value {
                records.push((
                    ValueId::new(container_id, page_id, to_slot_id(slot)?),
                    bytes.clone(),
                ));
            }
        }
        Ok(records)
    }

    fn available_buffers(&self) -> usize {
        self.config.buffer_pool_size
    }

    fn page_size(&self) -> usize {
        self.config.page_size
    }

    fn create_index(&self, name: &str, kind: IndexKind) -> Result<(), CrustyError> {
        let mut indexes = self.indexes.write().map_err(poisoned)?;
        if indexes.contains_key(name) {
            return Err(CrustyError::IOError(format!("Index {} already exists", name)));
        }
        debug!("memstore::create_index {} ({})", name, kind);
        indexes.insert(name.to_string(), MemIndex::new(name, kind));
        Ok(())
    }

    fn open_index(&self, name: &str) -> Result<Box<dyn Index>, CrustyError> {
        let indexes = self.indexes.read().map_err(poisoned)?;
        let index = indexes
            .get(name)
            .ok_or_else(|| CrustyError::IOError(format!("Index {} not found", name)))?;
        Ok(Box::new(index.clone()))
    }

    fn remove_index(&self, name: &str) -> Result<(), CrustyError> {
        let mut indexes = self.indexes.write().map_err(poisoned)?;
        indexes.remove(name);
        Ok(())
    }

    fn transaction_finished(&self, tid: TransactionId) {
        debug!("memstore::transaction_finished {:?}", tid);
    }

    fn reset(&self) {
        if let Ok(mut containers) = self.containers.write() {
            containers.clear();
        }
        if let Ok(mut indexes) = self.indexes.write() {
            indexes.clear();
        }
        self.next_container.store(0, Ordering::SeqCst);
    }

    fn shutdown(&self) {
        info!(
            "Shutting down memstore with {} containers; nothing is persisted",
            self.container_count()
        );
    }
}

/// Walks a container block by block, slot by slot, skipping free slots.
pub struct ValueIterator {
    container: ContainerRef,
    container_id: ContainerId,
    page: usize,
    slot: usize,
}

impl ValueIterator {
    fn new(container: ContainerRef, container_id: ContainerId) -> Self {
        ValueIterator {
            container,
            container_id,
            page: 0,
            slot: 0,
        }
    }
}

impl Iterator for ValueIterator {
    type Item = (ValueId, Vec<u8>);
    fn next(&mut self) -> Option<Self::Item> {
        let container = self.container.read().ok()?;
        while let Some(block) = container.blocks.get(self.page) {
            while self.slot < block.len() {
                let slot = self.slot;
                self.slot += 1;
                if let Some(bytes) = &block[slot] {
                    let rid = ValueId::new(
                        self.container_id,
                        to_page_id(self.page).ok()?,
                        to_slot_id(slot).ok()?,
                    );
                    return Some((rid, bytes.clone()));
                }
            }
            self.page += 1;
            self.slot = 0;
        }
        None
    }
}
