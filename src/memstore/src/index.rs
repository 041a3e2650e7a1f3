use crate::storage_manager::poisoned;
use common::ids::ValueId;
use common::index::{Index, IndexKind};
use common::{Constant, CrustyError};
use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, RwLock};

/// Key to record-id postings, organised by the index kind.
enum Postings {
    Hash(HashMap<Constant, Vec<ValueId>>),
    BTree(BTreeMap<Constant, Vec<ValueId>>),
}

impl Postings {
    fn get(&self, key: &Constant) -> Option<&Vec<ValueId>> {
        match self {
            Postings::Hash(m) => m.get(key),
            Postings::BTree(m) => m.get(key),
        }
    }

    fn entry(&mut self, key: &Constant) -> &mut Vec<ValueId> {
        match self {
            Postings::Hash(m) => m.entry(key.clone()).or_default(),
            Postings::BTree(m) => m.entry(key.clone()).or_default(),
        }
    }

    fn remove_key(&mut self, key: &Constant) {
        match self {
            Postings::Hash(m) => {
                m.remove(key);
            }
            Postings::BTree(m) => {
                m.remove(key);
            }
        }
    }
}

/// In-memory secondary index. Clones share postings but keep their own
/// probe cursor.
#[derive(Clone)]
pub struct MemIndex {
    name: String,
    postings: Arc<RwLock<Postings>>,
    /// Record ids matching the current probe key.
    matches: Vec<ValueId>,
    /// Position in `matches`; None before the first `next`.
    pos: Option<usize>,
}

impl MemIndex {
    pub fn new(name: &str, kind: IndexKind) -> Self {
        let postings = match kind {
            IndexKind::Hash => Postings::Hash(HashMap::new()),
            IndexKind::BTree => Postings::BTree(BTreeMap::new()),
        };
        MemIndex {
            name: name.to_string(),
            postings: Arc::new(RwLock::new(postings)),
            matches: Vec::new(),
            pos: None,
        }
    }
}

impl Index for MemIndex {
    fn before_first(&mut self, search_key: &Constant) -> Result<(), CrustyError> {
        let postings = self.postings.read().map_err(poisoned)?;
        self.matches = postings.get(search_key).cloned().unwrap_or_default();
        self.pos = None;
        Ok(())
    }

    fn next(&mut self) -> Result<bool, CrustyError> {
        let next = self.pos.map_or(0, |p| p + 1);
        self.pos = Some(next.min(self.matches.len()));
        Ok(next < self.matches.len())
    }

    fn get_data_rid(&self) -> Result<ValueId, CrustyError> {
        self.pos
            .and_then(|p| self.matches.get(p))
            .copied()
            .ok_or_else(|| {
                CrustyError::ExecutionError(format!("Index {} is not on a record", self.name))
            })
    }

    fn insert(&mut self, key: &Constant, rid: ValueId) -> Result<(), CrustyError> {
        let mut postings = self.postings.write().map_err(poisoned)?;
        postings.entry(key).push(rid);
        Ok(())
    }

    fn delete(&mut self, key: &Constant, rid: ValueId) -> Result<(), CrustyError> {
        let mut postings = self.postings.write().map_err(poisoned)?;
        let rids = postings.entry(key);
        rids.retain(|r| *r != rid);
        if rids.is_empty() {
            postings.remove_key(key);
        }
        Ok(())
    }

    fn close(&mut self) {
        self.matches.clear();
        self.pos = None;
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use common::testutil::init;

    fn probe(idx: &mut MemIndex, key: i32) -> Vec<ValueId> {
        idx.before_first(&Constant::Int(key)).unwrap();
        let mut found = Vec::new();
        while idx.next().unwrap() {
            found.push(idx.get_data_rid().unwrap());
        }
        found
    }

    #[test]
    fn test_probe_both_kinds() {
        init();
        for kind in &[IndexKind::Hash, IndexKind::BTree] {
            let mut idx = MemIndex::new("i", *kind);
            let a = ValueId::new(1, 0, 0);
            let b = ValueId::new(1, 0, 1);
            let c = ValueId::new(1, 1, 0);
            idx.insert(&Constant::Int(10), a).unwrap();
            idx.insert(&Constant::Int(10), b).unwrap();
            idx.insert(&Constant::Int(20), c).unwrap();
            assert_eq!(vec![a, b], probe(&mut idx, 10));
            assert_eq!(vec![c], probe(&mut idx, 20));
            assert!(probe(&mut idx, 30).is_empty());
            idx.delete(&Constant::Int(10), a).unwrap();
            assert_eq!(vec![b], probe(&mut idx, 10));
            assert!(idx.get_data_rid().is_err());
        }
    }
}
