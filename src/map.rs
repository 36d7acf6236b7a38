//! An ordered map built on the tree engine
//!
//! [`RbMap`] is the canonical consumer of [`rbtree`](crate::rbtree): each
//! entry is a record embedding a [`Link`], and the records live in an index
//! arena that implements [`NodeStorage`].
use alloc::vec::Vec;
use core::{
    borrow::Borrow,
    cmp::Ordering,
    fmt,
    iter::FusedIterator,
    mem,
    ops::{Bound, RangeBounds},
};

use crate::{
    rbtree::{self, Link, NodeId, NodeStorage, Root},
    search::{self, Error, Search},
};

#[cfg(test)]
mod tests;

/// An ordered map based on a red-black tree.
///
/// Unlike [`BTreeMap`](alloc::collections::BTreeMap), [`RbMap::insert`]
/// refuses to replace an existing entry. Use [`RbMap::upsert`] for that.
///
/// # Examples
///
/// ```
/// use rbarena::{Error, RbMap};
///
/// let mut map = RbMap::new();
/// map.insert(3, "c").unwrap();
/// map.insert(1, "a").unwrap();
/// assert_eq!(map.insert(3, "z"), Err(Error::DuplicateKey));
/// assert_eq!(map.upsert(3, "z"), Some("c"));
///
/// let entries: Vec<_> = map.iter().collect();
/// assert_eq!(entries, [(&1, &"a"), (&3, &"z")]);
/// ```
pub struct RbMap<K, V> {
    records: Records<K, V>,
    root: Root,
}

struct Record<K, V> {
    link: Link,
    key: K,
    value: V,
}

/// The arena holding [`Record`]s. Freed slots are reused.
struct Records<K, V> {
    slots: Vec<Option<Record<K, V>>>,
    free: Vec<NodeId>,
}

impl<K, V> Records<K, V> {
    const fn new() -> Self {
        Self {
            slots: Vec::new(),
            free: Vec::new(),
        }
    }

    fn with_capacity(capacity: usize) -> Self {
        Self {
            slots: Vec::with_capacity(capacity),
            free: Vec::new(),
        }
    }

    fn len(&self) -> usize {
        self.slots.len() - self.free.len()
    }

    fn alloc(&mut self, key: K, value: V) -> NodeId {
        let record = Record {
            link: Link::new(),
            key,
            value,
        };
        if let Some(id) = self.free.pop() {
            self.slots[id.index()] = Some(record);
            id
        } else {
            self.slots.push(Some(record));
            NodeId::new(self.slots.len() - 1)
        }
    }

    fn take(&mut self, id: NodeId) -> Record<K, V> {
        let Some(record) = self.slots.get_mut(id.index()).and_then(Option::take) else {
            invalid_structure!("{:?} is not allocated", id);
        };
        self.free.push(id);
        record
    }

    #[inline]
    fn get(&self, id: NodeId) -> &Record<K, V> {
        match self.slots.get(id.index()) {
            Some(Some(record)) => record,
            _ => invalid_structure!("{:?} is not allocated", id),
        }
    }

    #[inline]
    fn get_mut(&mut self, id: NodeId) -> &mut Record<K, V> {
        match self.slots.get_mut(id.index()) {
            Some(Some(record)) => record,
            _ => invalid_structure!("{:?} is not allocated", id),
        }
    }

    fn clear(&mut self) {
        self.slots.clear();
        self.free.clear();
    }
}

impl<K, V> NodeStorage for Records<K, V> {
    type Key = K;

    #[inline]
    fn link(&self, id: NodeId) -> &Link {
        &self.get(id).link
    }

    #[inline]
    fn link_mut(&mut self, id: NodeId) -> &mut Link {
        &mut self.get_mut(id).link
    }

    #[inline]
    fn key(&self, id: NodeId) -> &K {
        &self.get(id).key
    }
}

impl<K, V> RbMap<K, V> {
    pub const fn new() -> Self {
        Self {
            records: Records::new(),
            root: Root::new(),
        }
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            records: Records::with_capacity(capacity),
            root: Root::new(),
        }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.records.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.root.is_empty()
    }

    /// Remove all entries.
    pub fn clear(&mut self) {
        self.records.clear();
        self.root = Root::new();
    }

    /// Iterate over the entries in ascending key order.
    pub fn iter(&self) -> Iter<'_, K, V> {
        Iter {
            records: &self.records,
            inner: search::inorder(&self.records, &self.root),
        }
    }

    pub fn keys(&self) -> impl DoubleEndedIterator<Item = &K> + FusedIterator + '_ {
        self.iter().map(|(key, _)| key)
    }

    pub fn values(&self) -> impl DoubleEndedIterator<Item = &V> + FusedIterator + '_ {
        self.iter().map(|(_, value)| value)
    }

    pub fn first_key_value(&self) -> Option<(&K, &V)> {
        let node = rbtree::first(&self.records, self.root.node()?);
        Some(self.entry_at(node))
    }

    pub fn last_key_value(&self) -> Option<(&K, &V)> {
        let node = rbtree::last(&self.records, self.root.node()?);
        Some(self.entry_at(node))
    }

    pub fn pop_first(&mut self) -> Option<(K, V)> {
        let node = rbtree::first(&self.records, self.root.node()?);
        Some(self.remove_at(node))
    }

    pub fn pop_last(&mut self) -> Option<(K, V)> {
        let node = rbtree::last(&self.records, self.root.node()?);
        Some(self.remove_at(node))
    }

    #[inline]
    fn entry_at(&self, node: NodeId) -> (&K, &V) {
        let record = self.records.get(node);
        (&record.key, &record.value)
    }

    fn remove_at(&mut self, node: NodeId) -> (K, V) {
        rbtree::erase(&mut self.records, &mut self.root, node);
        let Record { key, value, .. } = self.records.take(node);
        (key, value)
    }
}

impl<K: Ord, V> RbMap<K, V> {
    fn find<Q>(&self, key: &Q) -> Result<NodeId, Error>
    where
        K: Borrow<Q>,
        Q: Ord + ?Sized,
    {
        search::find(&self.records, &self.root, key, |key, existing: &K| {
            key.cmp(existing.borrow())
        })
    }

    /// Insert a new entry. Fails with [`Error::DuplicateKey`] (dropping `key`
    /// and `value`) if the map already contains `key`.
    pub fn insert(&mut self, key: K, value: V) -> Result<&mut V, Error> {
        let node = self.records.alloc(key, value);
        if let Err(e) = search::insert(&mut self.records, &mut self.root, node, K::cmp) {
            log::trace!("insert rejected: {:?} ({} entries)", e, self.len() - 1);
            self.records.take(node);
            return Err(e);
        }
        Ok(&mut self.records.get_mut(node).value)
    }

    /// Insert an entry, replacing the value of an existing entry with an
    /// equal key. Returns the replaced value. The stored key is not replaced.
    pub fn upsert(&mut self, key: K, value: V) -> Option<V> {
        match search::search(&self.records, &self.root, |existing| key.cmp(existing)) {
            Search::Found(node) => Some(mem::replace(&mut self.records.get_mut(node).value, value)),
            Search::Vacant(slot) => {
                let node = self.records.alloc(key, value);
                search::insert_vacant(&mut self.records, &mut self.root, node, slot);
                None
            }
        }
    }

    pub fn get<Q>(&self, key: &Q) -> Option<&V>
    where
        K: Borrow<Q>,
        Q: Ord + ?Sized,
    {
        let node = self.find(key).ok()?;
        Some(&self.records.get(node).value)
    }

    pub fn get_key_value<Q>(&self, key: &Q) -> Option<(&K, &V)>
    where
        K: Borrow<Q>,
        Q: Ord + ?Sized,
    {
        let node = self.find(key).ok()?;
        Some(self.entry_at(node))
    }

    pub fn get_mut<Q>(&mut self, key: &Q) -> Option<&mut V>
    where
        K: Borrow<Q>,
        Q: Ord + ?Sized,
    {
        let node = self.find(key).ok()?;
        Some(&mut self.records.get_mut(node).value)
    }

    pub fn contains_key<Q>(&self, key: &Q) -> bool
    where
        K: Borrow<Q>,
        Q: Ord + ?Sized,
    {
        self.find(key).is_ok()
    }

    /// Remove the entry for `key` and return its value. Fails with
    /// [`Error::NotFound`] if there's no such entry.
    pub fn remove<Q>(&mut self, key: &Q) -> Result<V, Error>
    where
        K: Borrow<Q>,
        Q: Ord + ?Sized,
    {
        self.remove_entry(key).map(|(_, value)| value)
    }

    pub fn remove_entry<Q>(&mut self, key: &Q) -> Result<(K, V), Error>
    where
        K: Borrow<Q>,
        Q: Ord + ?Sized,
    {
        let node = self.find(key).map_err(|e| {
            log::trace!("remove failed: {:?} ({} entries)", e, self.len());
            e
        })?;
        Ok(self.remove_at(node))
    }

    /// Iterate over the entries whose keys are in `range`, in ascending
    /// order. An inverted range yields nothing.
    pub fn range<Q, R>(&self, range: R) -> Iter<'_, K, V>
    where
        K: Borrow<Q>,
        Q: Ord + ?Sized,
        R: RangeBounds<Q>,
    {
        let records = &self.records;
        let root = &self.root;

        let first = match range.start_bound() {
            Bound::Included(start) => {
                search::lower_bound(records, root, |key| start.cmp(key.borrow()))
            }
            Bound::Excluded(start) => {
                search::upper_bound(records, root, |key| start.cmp(key.borrow()))
            }
            Bound::Unbounded => root.node().map(|top| rbtree::first(records, top)),
        };

        // The node preceding the first one past the end
        let past_end = match range.end_bound() {
            Bound::Included(end) => search::upper_bound(records, root, |key| end.cmp(key.borrow())),
            Bound::Excluded(end) => search::lower_bound(records, root, |key| end.cmp(key.borrow())),
            Bound::Unbounded => None,
        };
        let last = match past_end {
            Some(node) => rbtree::predecessor(records, node),
            None => root.node().map(|top| rbtree::last(records, top)),
        };

        let inner = match (first, last) {
            (Some(first), Some(last))
                if records.key(first).cmp(records.key(last)) != Ordering::Greater =>
            {
                search::Iter::between(records, first, last)
            }
            _ => search::Iter::empty(records),
        };
        Iter { records, inner }
    }
}

impl<K, V> Default for RbMap<K, V> {
    #[inline]
    fn default() -> Self {
        Self::new()
    }
}

impl<K: fmt::Debug, V: fmt::Debug> fmt::Debug for RbMap<K, V> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_map().entries(self.iter()).finish()
    }
}

/// Later entries replace the values of earlier ones with equal keys.
impl<K: Ord, V> Extend<(K, V)> for RbMap<K, V> {
    fn extend<T: IntoIterator<Item = (K, V)>>(&mut self, iter: T) {
        for (key, value) in iter {
            self.upsert(key, value);
        }
    }
}

impl<K: Ord, V> FromIterator<(K, V)> for RbMap<K, V> {
    fn from_iter<T: IntoIterator<Item = (K, V)>>(iter: T) -> Self {
        let mut map = Self::new();
        map.extend(iter);
        map
    }
}

impl<'a, K, V> IntoIterator for &'a RbMap<K, V> {
    type Item = (&'a K, &'a V);
    type IntoIter = Iter<'a, K, V>;

    #[inline]
    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

/// An iterator over the entries of an [`RbMap`], created by [`RbMap::iter`]
/// or [`RbMap::range`].
pub struct Iter<'a, K, V> {
    records: &'a Records<K, V>,
    inner: search::Iter<'a, Records<K, V>>,
}

impl<K, V> Clone for Iter<'_, K, V> {
    fn clone(&self) -> Self {
        Self {
            records: self.records,
            inner: self.inner.clone(),
        }
    }
}

impl<K, V> fmt::Debug for Iter<'_, K, V> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_tuple("Iter").field(&self.inner).finish()
    }
}

impl<'a, K, V> Iterator for Iter<'a, K, V> {
    type Item = (&'a K, &'a V);

    #[inline]
    fn next(&mut self) -> Option<Self::Item> {
        let record = self.records.get(self.inner.next()?);
        Some((&record.key, &record.value))
    }
}

impl<K, V> DoubleEndedIterator for Iter<'_, K, V> {
    #[inline]
    fn next_back(&mut self) -> Option<Self::Item> {
        let record = self.records.get(self.inner.next_back()?);
        Some((&record.key, &record.value))
    }
}

impl<K, V> FusedIterator for Iter<'_, K, V> {}
