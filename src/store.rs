//! The store module
//! Provide the append-only session collection of embedded documents

use crate::ranker::{top_k, ScoredItem};
use crate::vector::{generate, Vector};
use log::debug;
use serde::Serialize;

/// A document and its vector, immutable once created
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StoredItem {
    id: u64,
    text: String,
    vector: Vector,
}

impl StoredItem {
    pub fn new(id: u64, text: String, vector: Vector) -> StoredItem {
        StoredItem { id, text, vector }
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn vector(&self) -> &[f64] {
        &self.vector
    }
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum StoreError {
    #[error("item {got} is stale, next id is {expected}")]
    StaleId { expected: u64, got: u64 },
}

#[derive(Debug, Default)]
pub struct VectorStore {
    items: Vec<StoredItem>,
}

impl VectorStore {
    /// Creates a new empty store.
    ///
    /// # Examples
    ///
    /// ```
    /// use vecviz::VectorStore;
    ///
    /// let store = VectorStore::new();
    /// assert_eq!(store.count(), 0);
    /// ```
    pub fn new() -> VectorStore {
        VectorStore { items: Vec::new() }
    }

    /// Embeds `text` and appends it to the store.
    ///
    /// The vector is generated once here and kept with the item. Identifiers
    /// start at 1 and follow insertion order.
    ///
    /// # Examples
    ///
    /// ```
    /// use vecviz::VectorStore;
    ///
    /// let mut store = VectorStore::new();
    /// let id = store.add("The cat sat on the mat").id();
    /// assert_eq!(id, 1);
    /// assert_eq!(store.add("A dog in the park").id(), 2);
    /// ```
    pub fn add(&mut self, text: &str) -> &StoredItem {
        let item = self.prepare(text);
        self.push(item)
    }

    /// Embeds `text` under the next identifier without storing it.
    ///
    /// Use [`commit`](VectorStore::commit) to append the prepared item later.
    /// Nothing else may be appended in between.
    pub fn prepare(&self, text: &str) -> StoredItem {
        StoredItem::new(self.next_id(), text.to_string(), generate(text))
    }

    /// Appends an item built by [`prepare`](VectorStore::prepare).
    ///
    /// # Returns
    ///
    /// * `Ok(&StoredItem)` - The stored item
    /// * `Err(StoreError::StaleId)` - The item's id is not the next id
    ///
    /// # Examples
    ///
    /// ```
    /// use vecviz::VectorStore;
    ///
    /// let mut store = VectorStore::new();
    /// let pending = store.prepare("first");
    /// store.commit(pending.clone()).unwrap();
    ///
    /// // the same item cannot be appended twice
    /// assert!(store.commit(pending).is_err());
    /// ```
    pub fn commit(&mut self, item: StoredItem) -> Result<&StoredItem, StoreError> {
        let expected = self.next_id();
        if item.id != expected {
            return Err(StoreError::StaleId { expected, got: item.id });
        }

        Ok(self.push(item))
    }

    /// Ranks every stored item against the vector of `query`.
    ///
    /// # Examples
    ///
    /// ```
    /// use vecviz::VectorStore;
    ///
    /// let mut store = VectorStore::new();
    /// store.add("apples and oranges");
    /// store.add("a sunny day at the beach");
    ///
    /// let results = store.search("A sunny day at the beach", 1);
    /// assert_eq!(results[0].item.id(), 2);
    /// assert!((results[0].similarity - 1.0).abs() < 1e-9);
    /// ```
    pub fn search(&self, query: &str, k: usize) -> Vec<ScoredItem> {
        self.rank(&generate(query), k)
    }

    /// Ranks every stored item against an already generated vector.
    pub fn rank(&self, query: &[f64], k: usize) -> Vec<ScoredItem> {
        top_k(query, &self.items, k)
    }

    /// Retrieves an item by its ID.
    pub fn get(&self, id: u64) -> Option<&StoredItem> {
        // ids are dense and start at 1
        let index = usize::try_from(id.checked_sub(1)?).ok()?;
        self.items.get(index)
    }

    /// All items in insertion order
    pub fn items(&self) -> &[StoredItem] {
        &self.items
    }

    pub fn count(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    fn next_id(&self) -> u64 {
        self.items.len() as u64 + 1
    }

    fn push(&mut self, item: StoredItem) -> &StoredItem {
        debug!("storing item {} ({} chars)", item.id, item.text.len());
        self.items.push(item);
        &self.items[self.items.len() - 1]
    }
}
