//! # the-listmap
//!
//! An ordered multi-map: every key owns a list of entries that keeps insertion
//! order across removals.
//!
//! Entries are addressed by the [`Handle`] returned from [`ListMap::add`], so
//! removing one never scans for a value and never renumbers its neighbours.
//! Handles are issued per key, start at `0` and are never reused.
//!
//! ## Iterating while mutating
//!
//! Borrowing iteration ([`ListMap::iter`], [`ListMap::for_each`]) is the fast
//! path, but it holds the map for the whole pass. When the visitor itself needs
//! to add or remove entries, use [`ListMap::for_each_with`], or drive a
//! [`Cursor`] by hand:
//!
//! ```rust
//! use the_listmap::ListMap;
//!
//! let mut map = ListMap::new();
//! let a = map.add("key", 'a');
//! map.add("key", 'b');
//! map.add("key", 'c');
//!
//! let mut seen = Vec::new();
//! let mut cursor = map.cursor("key");
//! while let Some(&item) = map.advance("key", &mut cursor) {
//!   seen.push(item);
//!   // The cursor holds no borrow, so the map may change between steps.
//!   map.remove("key", a);
//!   map.add("key", 'z');
//! }
//!
//! assert_eq!(seen, vec!['a', 'b', 'c']);
//! assert_eq!(map.get("key"), vec![&'b', &'c', &'z', &'z', &'z']);
//! ```
//!
//! A cursor only ever moves forward and stops at the last handle that existed
//! when it was created: entries removed before they are reached are skipped,
//! entries added during the pass are left for the next one.

use std::{
  borrow::Borrow,
  collections::{
    BTreeMap,
    btree_map,
  },
  fmt,
  hash::Hash,
  ops::Bound,
};

use foldhash::fast::RandomState;
use hashbrown::HashMap;

/// Identifies one entry under one key.
///
/// Handles are only meaningful together with the key they were issued for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Handle(u64);

impl Handle {
  /// The raw, per-key insertion number.
  pub const fn get(self) -> u64 {
    self.0
  }
}

impl fmt::Display for Handle {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "#{}", self.0)
  }
}

/// The entries of a single key plus the next handle to hand out.
struct Bucket<T> {
  entries: BTreeMap<Handle, T>,
  next:    u64,
}

impl<T> Bucket<T> {
  fn new() -> Self {
    Self {
      entries: BTreeMap::new(),
      next:    0,
    }
  }

  fn push(&mut self, item: T) -> Handle {
    let handle = Handle(self.next);
    self.next += 1;
    self.entries.insert(handle, item);
    handle
  }
}

/// A forward-only position inside one key's entries.
///
/// Obtained from [`ListMap::cursor`]. It remembers the last visited handle and
/// the exclusive upper bound fixed at creation time; it does not borrow the
/// map.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Cursor {
  last: Option<Handle>,
  end:  u64,
}

impl Cursor {
  /// A cursor that yields nothing.
  const fn exhausted() -> Self {
    Self { last: None, end: 0 }
  }

  fn lower_bound(&self) -> Bound<Handle> {
    match self.last {
      Some(handle) => Bound::Excluded(handle),
      None => Bound::Unbounded,
    }
  }
}

/// Ordered lists of entries stored under keys.
pub struct ListMap<K, T> {
  buckets: HashMap<K, Bucket<T>, RandomState>,
}

impl<K, T> Default for ListMap<K, T> {
  fn default() -> Self {
    Self {
      buckets: HashMap::default(),
    }
  }
}

impl<K, T> ListMap<K, T>
where
  K: Eq + Hash,
{
  pub fn new() -> Self {
    Self::default()
  }

  /// Appends `item` under `key` and returns the handle used to remove it.
  ///
  /// The bucket for a key is created on first insertion and kept afterwards,
  /// so handles keep increasing even after the key was emptied.
  pub fn add(&mut self, key: K, item: T) -> Handle {
    self
      .buckets
      .entry(key)
      .or_insert_with(|| {
        log::trace!("allocating bucket for a new key");
        Bucket::new()
      })
      .push(item)
  }

  /// Removes the entry stored under `key` with `handle`.
  ///
  /// Unknown keys, unknown handles and handles that were already removed are
  /// ignored and yield `None`.
  pub fn remove<Q>(&mut self, key: &Q, handle: Handle) -> Option<T>
  where
    K: Borrow<Q>,
    Q: Hash + Eq + ?Sized,
  {
    let removed = self.buckets.get_mut(key)?.entries.remove(&handle);
    if removed.is_none() {
      log::trace!("ignoring removal of unknown handle {handle}");
    }
    removed
  }

  /// Number of entries currently stored under `key`.
  pub fn size<Q>(&self, key: &Q) -> usize
  where
    K: Borrow<Q>,
    Q: Hash + Eq + ?Sized,
  {
    self
      .buckets
      .get(key)
      .map_or(0, |bucket| bucket.entries.len())
  }

  pub fn is_empty<Q>(&self, key: &Q) -> bool
  where
    K: Borrow<Q>,
    Q: Hash + Eq + ?Sized,
  {
    self.size(key) == 0
  }

  /// Collects the entries under `key` in insertion order.
  ///
  /// This allocates; prefer [`ListMap::iter`] or [`ListMap::for_each`] when the
  /// entries only need to be visited.
  pub fn get<Q>(&self, key: &Q) -> Vec<&T>
  where
    K: Borrow<Q>,
    Q: Hash + Eq + ?Sized,
  {
    self.iter(key).collect()
  }

  /// Iterates the entries under `key` in insertion order.
  pub fn iter<Q>(&self, key: &Q) -> Iter<'_, T>
  where
    K: Borrow<Q>,
    Q: Hash + Eq + ?Sized,
  {
    Iter {
      inner: self.buckets.get(key).map(|bucket| bucket.entries.values()),
    }
  }

  /// Calls `visit` once per entry under `key`, in insertion order.
  pub fn for_each<Q, F>(&self, key: &Q, visit: F)
  where
    K: Borrow<Q>,
    Q: Hash + Eq + ?Sized,
    F: FnMut(&T),
  {
    self.iter(key).for_each(visit);
  }

  /// Like [`ListMap::for_each`], but `visit` gets the map back and may add or
  /// remove entries while the pass is running.
  ///
  /// Each entry is cloned before it is handed out. Entries removed before they
  /// are reached are not visited; entries added during the pass are not
  /// visited either.
  pub fn for_each_with<Q, F>(&mut self, key: &Q, mut visit: F)
  where
    K: Borrow<Q>,
    Q: Hash + Eq + ?Sized,
    T: Clone,
    F: FnMut(&mut Self, T),
  {
    let mut cursor = self.cursor(key);
    while let Some(item) = self.advance(key, &mut cursor).cloned() {
      visit(self, item);
    }
  }

  /// Creates a cursor positioned before the first entry under `key`.
  ///
  /// The cursor covers the handles issued so far; later insertions fall
  /// outside of it.
  pub fn cursor<Q>(&self, key: &Q) -> Cursor
  where
    K: Borrow<Q>,
    Q: Hash + Eq + ?Sized,
  {
    match self.buckets.get(key) {
      Some(bucket) => Cursor {
        last: None,
        end:  bucket.next,
      },
      None => Cursor::exhausted(),
    }
  }

  /// Moves `cursor` to the next live entry under `key` and returns it.
  ///
  /// Returns `None` once the cursor has passed its upper bound, and keeps
  /// returning `None` afterwards.
  pub fn advance<Q>(&self, key: &Q, cursor: &mut Cursor) -> Option<&T>
  where
    K: Borrow<Q>,
    Q: Hash + Eq + ?Sized,
  {
    let bucket = self.buckets.get(key)?;
    if cursor.last.is_some_and(|last| last.0 + 1 >= cursor.end) {
      return None;
    }
    let range = (cursor.lower_bound(), Bound::Excluded(Handle(cursor.end)));
    match bucket.entries.range(range).next() {
      Some((&handle, item)) => {
        cursor.last = Some(handle);
        Some(item)
      },
      None => {
        cursor.last = cursor.end.checked_sub(1).map(Handle);
        None
      },
    }
  }
}

impl<K, T> fmt::Debug for ListMap<K, T>
where
  K: fmt::Debug,
  T: fmt::Debug,
{
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_map()
      .entries(
        self
          .buckets
          .iter()
          .map(|(key, bucket)| (key, &bucket.entries)),
      )
      .finish()
  }
}

/// Borrowing iterator over one key's entries, see [`ListMap::iter`].
pub struct Iter<'a, T> {
  inner: Option<btree_map::Values<'a, Handle, T>>,
}

impl<'a, T> Iterator for Iter<'a, T> {
  type Item = &'a T;

  fn next(&mut self) -> Option<Self::Item> {
    self.inner.as_mut()?.next()
  }

  fn size_hint(&self) -> (usize, Option<usize>) {
    self
      .inner
      .as_ref()
      .map_or((0, Some(0)), |values| values.size_hint())
  }
}

impl<T> DoubleEndedIterator for Iter<'_, T> {
  fn next_back(&mut self) -> Option<Self::Item> {
    self.inner.as_mut()?.next_back()
  }
}

impl<T> ExactSizeIterator for Iter<'_, T> {}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn handles_start_at_zero_per_key() {
    let mut map = ListMap::new();
    assert_eq!(map.add("one", 'a').get(), 0);
    assert_eq!(map.add("one", 'b').get(), 1);
    assert_eq!(map.add("two", 'c').get(), 0);
  }

  #[test]
  fn handles_are_not_reused_after_emptying() {
    let mut map = ListMap::new();
    let a = map.add("one", 'a');
    map.remove("one", a);
    assert!(map.is_empty("one"));
    assert_eq!(map.add("one", 'b').get(), 1);
  }

  #[test]
  fn cursor_on_unknown_key_is_exhausted() {
    let mut map: ListMap<&str, char> = ListMap::new();
    let mut cursor = map.cursor("missing");
    map.add("missing", 'a');
    assert_eq!(map.advance("missing", &mut cursor), None);
    assert_eq!(map.advance("missing", &mut cursor), None);
  }

  #[test]
  fn exhausted_cursor_stays_exhausted() {
    let mut map = ListMap::new();
    map.add("one", 'a');
    let mut cursor = map.cursor("one");
    assert_eq!(map.advance("one", &mut cursor), Some(&'a'));
    assert_eq!(map.advance("one", &mut cursor), None);
    assert_eq!(map.advance("one", &mut cursor), None);
  }

  #[test]
  fn iter_is_exact_size() {
    let mut map = ListMap::new();
    map.add("one", 1);
    let b = map.add("one", 2);
    map.add("one", 3);
    map.remove("one", b);
    assert_eq!(map.iter("one").len(), 2);
    assert_eq!(map.iter("other").len(), 0);
    assert_eq!(map.iter("one").rev().copied().collect::<Vec<_>>(), vec![3, 1]);
  }
}
