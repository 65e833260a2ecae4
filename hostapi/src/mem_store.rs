//! In-memory storage for testing.
//!
//! `MemStore` implements `Storage` using a `BTreeMap` for deterministic key
//! ordering. When built with [`MemStore::with_gas`] every operation charges
//! the shared meter according to a [`GasConfig`], which lets tests observe
//! real gas deltas through the bridge.

use std::collections::{BTreeMap, VecDeque};
use std::ops::Bound;
use std::sync::Arc;

use crate::error::HostError;
use crate::gas_meter::HostGasMeter;
use crate::storage::{KvIterator, Order, Record, Storage};
use crate::types::GasConfig;

#[derive(Debug, Clone)]
struct Metering {
    meter: Arc<HostGasMeter>,
    config: GasConfig,
}

/// In-memory store backed by `BTreeMap`.
#[derive(Debug, Clone, Default)]
pub struct MemStore {
    data: BTreeMap<Vec<u8>, Vec<u8>>,
    metering: Option<Metering>,
}

impl MemStore {
    /// Create a new empty store that charges no gas.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an empty store charging `meter` according to `config`.
    pub fn with_gas(meter: Arc<HostGasMeter>, config: GasConfig) -> Self {
        Self {
            data: BTreeMap::new(),
            metering: Some(Metering { meter, config }),
        }
    }

    /// Insert without charging gas.
    pub fn insert(&mut self, key: Vec<u8>, value: Vec<u8>) {
        self.data.insert(key, value);
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    fn charge(&self, cost: impl FnOnce(&GasConfig) -> u64) -> Result<(), HostError> {
        match &self.metering {
            Some(m) => m.meter.charge(cost(&m.config)),
            None => Ok(()),
        }
    }
}

impl Storage for MemStore {
    fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>, HostError> {
        self.charge(|c| c.read_cost(key.len()))?;
        Ok(self.data.get(key).cloned())
    }

    fn set(&mut self, key: &[u8], value: &[u8]) -> Result<(), HostError> {
        self.charge(|c| c.write_cost(key.len(), value.len()))?;
        self.data.insert(key.to_vec(), value.to_vec());
        Ok(())
    }

    fn delete(&mut self, key: &[u8]) -> Result<(), HostError> {
        self.charge(|c| c.remove_cost(key.len()))?;
        self.data.remove(key);
        Ok(())
    }

    fn range(
        &self,
        start: Option<&[u8]>,
        end: Option<&[u8]>,
        order: Order,
    ) -> Result<Box<dyn KvIterator>, HostError> {
        self.charge(|c| c.db_scan)?;

        let records = match (start, end) {
            // BTreeMap::range panics on an inverted range
            (Some(s), Some(e)) if s > e => VecDeque::new(),
            _ => {
                let lower = start.map_or(Bound::Unbounded, Bound::Included);
                let upper = end.map_or(Bound::Unbounded, Bound::Excluded);
                let iter = self
                    .data
                    .range::<[u8], _>((lower, upper))
                    .map(|(k, v)| (k.clone(), v.clone()));
                match order {
                    Order::Ascending => iter.collect(),
                    Order::Descending => iter.rev().collect(),
                }
            }
        };

        Ok(Box::new(MemIter {
            records,
            metering: self.metering.clone(),
        }))
    }
}

/// Snapshot iterator returned by [`MemStore::range`].
///
/// Later writes to the store are not visible to an open iterator.
struct MemIter {
    records: VecDeque<Record>,
    metering: Option<Metering>,
}

impl KvIterator for MemIter {
    fn next(&mut self) -> Result<Option<Record>, HostError> {
        let Some((key, value)) = self.records.front() else {
            return Ok(None);
        };
        if let Some(m) = &self.metering {
            m.meter.charge(m.config.next_cost(key.len(), value.len()))?;
        }
        Ok(self.records.pop_front())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn seeded() -> MemStore {
        let mut store = MemStore::new();
        for (k, v) in [("bar", "1"), ("foo", "2"), ("xyz", "3"), ("abc", "4")] {
            store.insert(k.as_bytes().to_vec(), v.as_bytes().to_vec());
        }
        store
    }

    fn drain(mut it: Box<dyn KvIterator>) -> Vec<Vec<u8>> {
        let mut keys = Vec::new();
        while let Some((k, _)) = it.next().unwrap() {
            keys.push(k);
        }
        keys
    }

    #[test]
    fn test_empty_store() {
        let store = MemStore::new();
        assert!(store.is_empty());
        assert_eq!(store.get(b"missing").unwrap(), None);
    }

    #[test]
    fn test_set_get_delete() {
        let mut store = MemStore::new();
        store.set(b"key1", b"value1").unwrap();
        assert_eq!(store.get(b"key1").unwrap(), Some(b"value1".to_vec()));
        store.delete(b"key1").unwrap();
        assert_eq!(store.get(b"key1").unwrap(), None);
        // deleting again is fine
        store.delete(b"key1").unwrap();
    }

    #[test]
    fn test_empty_value_is_not_missing() {
        let mut store = MemStore::new();
        store.set(b"empty_val", b"").unwrap();
        assert_eq!(store.get(b"empty_val").unwrap(), Some(vec![]));
        assert_eq!(store.get(b"other").unwrap(), None);
    }

    #[test]
    fn test_range_ascending_unbounded() {
        let keys = drain(seeded().range(None, None, Order::Ascending).unwrap());
        assert_eq!(keys, vec![b"abc".to_vec(), b"bar".to_vec(), b"foo".to_vec(), b"xyz".to_vec()]);
    }

    #[test]
    fn test_range_descending_bounded() {
        let it = seeded()
            .range(Some(b"bar"), Some(b"xyz"), Order::Descending)
            .unwrap();
        assert_eq!(drain(it), vec![b"foo".to_vec(), b"bar".to_vec()]);
    }

    #[test]
    fn test_range_start_inclusive_end_exclusive() {
        let it = seeded().range(Some(b"bar"), Some(b"foo"), Order::Ascending).unwrap();
        assert_eq!(drain(it), vec![b"bar".to_vec()]);
    }

    #[test]
    fn test_inverted_range_is_empty() {
        let it = seeded().range(Some(b"xyz"), Some(b"abc"), Order::Ascending).unwrap();
        assert!(drain(it).is_empty());
    }

    #[test]
    fn test_iterator_is_snapshot() {
        let mut store = seeded();
        let it = store.range(None, None, Order::Ascending).unwrap();
        store.set(b"zzz", b"5").unwrap();
        assert_eq!(drain(it).len(), 4);
    }

    #[test]
    fn test_gas_is_charged() {
        let meter = Arc::new(HostGasMeter::unlimited());
        let config = GasConfig::default();
        let mut store = MemStore::with_gas(meter.clone(), config.clone());

        store.set(b"foo", b"bar").unwrap();
        assert_eq!(meter.consumed(), config.write_cost(3, 3));

        let before = meter.consumed();
        store.get(b"foo").unwrap();
        assert_eq!(meter.consumed() - before, config.read_cost(3));

        let before = meter.consumed();
        let mut it = store.range(None, None, Order::Ascending).unwrap();
        it.next().unwrap().unwrap();
        assert_eq!(meter.consumed() - before, config.db_scan + config.next_cost(3, 3));

        // exhausted step is free
        let before = meter.consumed();
        assert!(it.next().unwrap().is_none());
        assert_eq!(meter.consumed(), before);
    }

    #[test]
    fn test_out_of_gas_leaves_store_untouched() {
        let meter = Arc::new(HostGasMeter::new(10));
        let mut store = MemStore::with_gas(meter, GasConfig::default());
        assert_eq!(store.set(b"foo", b"bar").unwrap_err(), HostError::OutOfGas);
        assert!(store.is_empty());
    }
}
