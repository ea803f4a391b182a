//! Storage engine abstraction.
//!
//! The query pipeline only needs equality-on-partition-key plus
//! range-on-sort-key scans with opaque continuation tokens, and plain
//! keyed CRUD. Any engine offering that shape can back a
//! [`crate::GeoTable`] by implementing [`RangeStore`];
//! [`MemoryStore`] is the in-process reference backend.

use std::collections::BTreeMap;
use std::sync::Arc;

use bytes::Bytes;
use parking_lot::RwLock;
use rustc_hash::FxHashMap;
use serde_json::Value;

use crate::error::{GeoTableError, Result};
use crate::item::StoredItem;

/// One partition-equality + sort-key-range scan request.
#[derive(Debug, Clone)]
pub struct RangeQuery {
    /// Partition key the scan is confined to.
    pub hash_key: i64,
    /// Inclusive lower geohash bound.
    pub geohash_min: i64,
    /// Inclusive upper geohash bound.
    pub geohash_max: i64,
    /// Secondary index keyed by (hash key, geohash) to scan.
    pub index_name: String,
    /// Whether a strongly consistent read is requested.
    pub consistent_read: bool,
    /// Opaque continuation token from the previous page, if any.
    pub token: Option<Bytes>,
}

/// One page of range scan results.
#[derive(Debug, Clone)]
pub struct QueryPage {
    /// Items on this page.
    pub items: Vec<StoredItem>,
    /// Token for the next page; `None` when the scan is exhausted.
    pub next_token: Option<Bytes>,
}

/// A partition/sort-key storage engine.
///
/// Implementations must be shareable across concurrent range queries
/// (`&self` methods, `Send + Sync`); no writes occur during a query
/// dispatch. Continuation tokens are engine-defined opaque byte
/// strings that round-trip unmodified through the pagination loop.
#[allow(async_fn_in_trait)]
pub trait RangeStore: Send + Sync {
    /// Fetch one page of a geohash range scan.
    async fn query_page(&self, query: RangeQuery) -> Result<QueryPage>;

    /// Insert or overwrite an item keyed by (hash key, range key).
    async fn put_item(&self, item: StoredItem) -> Result<()>;

    /// Fetch an item by key.
    async fn get_item(
        &self,
        hash_key: i64,
        range_key: &str,
        consistent_read: bool,
    ) -> Result<Option<StoredItem>>;

    /// Merge attribute changes into an existing item.
    async fn update_item(
        &self,
        hash_key: i64,
        range_key: &str,
        updates: BTreeMap<String, Value>,
    ) -> Result<()>;

    /// Delete an item by key, returning the previous value when the
    /// engine reports it.
    async fn delete_item(&self, hash_key: i64, range_key: &str) -> Result<Option<StoredItem>>;

    /// Insert or overwrite a batch of items.
    async fn batch_put_items(&self, items: Vec<StoredItem>) -> Result<()>;
}

/// In-memory reference backend.
///
/// Items live in per-partition maps keyed by range key; range scans
/// sort by (geohash, range key), simulating the geohash secondary
/// index, and paginate with a configurable page size so the
/// pagination loop is exercised in tests.
#[derive(Debug, Clone)]
pub struct MemoryStore {
    partitions: Arc<RwLock<FxHashMap<i64, BTreeMap<String, StoredItem>>>>,
    page_size: usize,
}

const DEFAULT_PAGE_SIZE: usize = 100;

impl MemoryStore {
    /// Create an empty store with the default page size.
    pub fn new() -> Self {
        Self::with_page_size(DEFAULT_PAGE_SIZE)
    }

    /// Create an empty store returning at most `page_size` items per
    /// scan page. Panics when `page_size` is zero.
    pub fn with_page_size(page_size: usize) -> Self {
        assert!(page_size > 0, "Page size must be greater than zero");
        Self {
            partitions: Arc::new(RwLock::new(FxHashMap::default())),
            page_size,
        }
    }

    /// Total number of stored items.
    pub fn len(&self) -> usize {
        self.partitions.read().values().map(BTreeMap::len).sum()
    }

    /// Whether the store holds no items.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn insert(&self, item: StoredItem) {
        self.partitions
            .write()
            .entry(item.hash_key)
            .or_default()
            .insert(item.range_key.clone(), item);
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

/// Cursor after the last item of a page: `"{geohash}:{range_key}"`.
fn encode_token(item: &StoredItem) -> Bytes {
    Bytes::from(format!("{}:{}", item.geohash, item.range_key))
}

fn decode_token(token: &Bytes) -> Result<(i64, String)> {
    let text = std::str::from_utf8(token)
        .map_err(|_| GeoTableError::storage("malformed continuation token"))?;
    let (geohash, range_key) = text
        .split_once(':')
        .ok_or_else(|| GeoTableError::storage("malformed continuation token"))?;
    let geohash = geohash
        .parse::<i64>()
        .map_err(|_| GeoTableError::storage("malformed continuation token"))?;
    Ok((geohash, range_key.to_string()))
}

impl RangeStore for MemoryStore {
    async fn query_page(&self, query: RangeQuery) -> Result<QueryPage> {
        let cursor = query.token.as_ref().map(decode_token).transpose()?;

        let partitions = self.partitions.read();
        let mut matches: Vec<&StoredItem> = partitions
            .get(&query.hash_key)
            .map(|partition| {
                partition
                    .values()
                    .filter(|item| {
                        query.geohash_min <= item.geohash && item.geohash <= query.geohash_max
                    })
                    .collect()
            })
            .unwrap_or_default();

        matches.sort_by(|a, b| {
            (a.geohash, &a.range_key).cmp(&(b.geohash, &b.range_key))
        });

        let start = match &cursor {
            Some((geohash, range_key)) => matches
                .partition_point(|item| (item.geohash, &item.range_key) <= (*geohash, range_key)),
            None => 0,
        };

        let page: Vec<StoredItem> = matches
            .iter()
            .skip(start)
            .take(self.page_size)
            .map(|item| (*item).clone())
            .collect();

        let next_token = if start + page.len() < matches.len() {
            page.last().map(encode_token)
        } else {
            None
        };

        Ok(QueryPage {
            items: page,
            next_token,
        })
    }

    async fn put_item(&self, item: StoredItem) -> Result<()> {
        self.insert(item);
        Ok(())
    }

    async fn get_item(
        &self,
        hash_key: i64,
        range_key: &str,
        _consistent_read: bool,
    ) -> Result<Option<StoredItem>> {
        Ok(self
            .partitions
            .read()
            .get(&hash_key)
            .and_then(|partition| partition.get(range_key))
            .cloned())
    }

    async fn update_item(
        &self,
        hash_key: i64,
        range_key: &str,
        updates: BTreeMap<String, Value>,
    ) -> Result<()> {
        let mut partitions = self.partitions.write();
        let item = partitions
            .get_mut(&hash_key)
            .and_then(|partition| partition.get_mut(range_key))
            .ok_or_else(|| {
                GeoTableError::Storage(format!(
                    "no item with hash key {} and range key {}",
                    hash_key, range_key
                ))
            })?;

        item.attributes.extend(updates);
        Ok(())
    }

    async fn delete_item(&self, hash_key: i64, range_key: &str) -> Result<Option<StoredItem>> {
        let mut partitions = self.partitions.write();
        let removed = partitions
            .get_mut(&hash_key)
            .and_then(|partition| partition.remove(range_key));

        if let Some(partition) = partitions.get(&hash_key) {
            if partition.is_empty() {
                partitions.remove(&hash_key);
            }
        }

        Ok(removed)
    }

    async fn batch_put_items(&self, items: Vec<StoredItem>) -> Result<()> {
        let mut partitions = self.partitions.write();
        for item in items {
            partitions
                .entry(item.hash_key)
                .or_default()
                .insert(item.range_key.clone(), item);
        }
        Ok(())
    }
}
