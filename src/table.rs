//! Geo-aware table built on a [`RangeStore`].
//!
//! [`GeoTable`] owns the full write and query pipeline: points are
//! projected to geohashes on the way in, and radius or rectangle
//! queries are decomposed into per-partition geohash range scans,
//! dispatched concurrently, then post-filtered against the exact
//! query shape.

use std::collections::BTreeMap;

use futures::future::try_join_all;
use geo::Point;
use serde_json::Value;

use crate::covering::Covering;
use crate::error::{GeoTableError, Result};
use crate::geometry::{self, LatLngRect};
use crate::item::{StoredItem, encode_geo_json};
use crate::range::{GeohashRange, generate_hash_key};
use crate::store::{RangeQuery, RangeStore};
use crate::types::TableConfig;

/// One point write: coordinates, caller-chosen range key, and any
/// extra attributes to store alongside the system fields.
#[derive(Debug, Clone)]
pub struct PutPoint {
    pub point: Point,
    pub range_key: String,
    pub attributes: BTreeMap<String, Value>,
}

impl PutPoint {
    pub fn new(point: Point, range_key: impl Into<String>) -> Self {
        Self {
            point,
            range_key: range_key.into(),
            attributes: BTreeMap::new(),
        }
    }

    pub fn with_attribute(mut self, name: impl Into<String>, value: Value) -> Self {
        self.attributes.insert(name.into(), value);
        self
    }
}

/// A geospatial table over a partition/sort-key storage engine.
#[derive(Debug, Clone)]
pub struct GeoTable<S: RangeStore> {
    store: S,
    config: TableConfig,
}

impl<S: RangeStore> GeoTable<S> {
    /// Wrap a storage engine with the given configuration.
    ///
    /// The configuration must be valid; queries issued with a
    /// different hash key length than the one items were written with
    /// will not find them.
    pub fn new(store: S, config: TableConfig) -> Result<Self> {
        config.validate().map_err(GeoTableError::InvalidInput)?;
        Ok(Self { store, config })
    }

    pub fn config(&self) -> &TableConfig {
        &self.config
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Geohash and partition key a point maps to under this table's
    /// configuration.
    pub fn keys_for_point(&self, point: &Point) -> Result<(i64, i64)> {
        geometry::validate_point(point)?;
        let geohash = geometry::generate_geohash(point);
        let hash_key = generate_hash_key(geohash, self.config.hash_key_length);
        Ok((hash_key, geohash))
    }

    fn build_item(&self, put: PutPoint) -> Result<StoredItem> {
        let (hash_key, geohash) = self.keys_for_point(&put.point)?;
        let geo_json = encode_geo_json(&put.point, &self.config);

        let mut attributes = put.attributes;
        self.strip_system_attributes(&mut attributes);

        Ok(StoredItem {
            hash_key,
            range_key: put.range_key,
            geohash,
            geo_json,
            attributes,
        })
    }

    /// Drop caller-supplied entries that collide with the configured
    /// system attribute names; the library owns those fields.
    fn strip_system_attributes(&self, attributes: &mut BTreeMap<String, Value>) {
        attributes.remove(&self.config.hash_key_attribute);
        attributes.remove(&self.config.range_key_attribute);
        attributes.remove(&self.config.geohash_attribute);
        attributes.remove(&self.config.geojson_attribute);
    }

    /// Write one point, overwriting any previous item with the same
    /// derived hash key and range key. Returns the stored item.
    pub async fn put_point(&self, put: PutPoint) -> Result<StoredItem> {
        let item = self.build_item(put)?;
        self.store.put_item(item.clone()).await?;
        Ok(item)
    }

    /// Write a batch of points in one storage round trip.
    pub async fn batch_write_points(&self, puts: Vec<PutPoint>) -> Result<Vec<StoredItem>> {
        let items = puts
            .into_iter()
            .map(|put| self.build_item(put))
            .collect::<Result<Vec<_>>>()?;
        self.store.batch_put_items(items.clone()).await?;
        Ok(items)
    }

    /// Fetch the item stored for a point and range key, if any.
    pub async fn get_point(&self, point: &Point, range_key: &str) -> Result<Option<StoredItem>> {
        let (hash_key, _) = self.keys_for_point(point)?;
        self.store
            .get_item(hash_key, range_key, self.config.consistent_read)
            .await
    }

    /// Merge attribute changes into a stored point.
    ///
    /// Entries named like the configured geohash or geoJSON attributes
    /// (or the key attributes) are silently dropped: the stored
    /// location is immutable, delete and re-put to move a point.
    pub async fn update_point(
        &self,
        point: &Point,
        range_key: &str,
        mut updates: BTreeMap<String, Value>,
    ) -> Result<()> {
        let (hash_key, _) = self.keys_for_point(point)?;
        self.strip_system_attributes(&mut updates);
        self.store.update_item(hash_key, range_key, updates).await
    }

    /// Delete a stored point, returning the previous item when the
    /// engine reports it.
    pub async fn delete_point(&self, point: &Point, range_key: &str) -> Result<Option<StoredItem>> {
        let (hash_key, _) = self.keys_for_point(point)?;
        self.store.delete_item(hash_key, range_key).await
    }

    /// Find all points within `radius_meters` of `center`.
    ///
    /// Covers the bounding rectangle of the radius, scans the covering
    /// ranges concurrently, then keeps only the items whose great
    /// circle distance from the center is within the radius.
    pub async fn query_radius(&self, center: &Point, radius_meters: f64) -> Result<Vec<StoredItem>> {
        geometry::validate_point(center)?;
        let rect = LatLngRect::from_radius(center, radius_meters)?;
        let candidates = self.dispatch_queries(&Covering::of_rect(&rect)).await?;
        self.filter_by_radius(candidates, center, radius_meters)
    }

    /// Find all points within the rectangle spanned by two corners.
    pub async fn query_rectangle(&self, min: &Point, max: &Point) -> Result<Vec<StoredItem>> {
        let rect = LatLngRect::from_corners(min, max)?;
        let candidates = self.dispatch_queries(&Covering::of_rect(&rect)).await?;
        self.filter_by_rectangle(candidates, &rect)
    }

    /// Run every range query of a covering concurrently and collect
    /// the candidate items. Fails fast: the first query error cancels
    /// the remaining in-flight queries.
    pub async fn dispatch_queries(&self, covering: &Covering) -> Result<Vec<StoredItem>> {
        let ranges = covering.geohash_ranges(self.config.hash_key_length);
        log::debug!(
            "dispatching {} range queries for a covering of {} cells",
            ranges.len(),
            covering.cell_count()
        );

        let pages = try_join_all(
            ranges
                .into_iter()
                .map(|range| self.query_geohash(range)),
        )
        .await?;

        Ok(pages.into_iter().flatten().collect())
    }

    /// Scan one geohash range to exhaustion, following continuation
    /// tokens. The partition key is derived from the range minimum;
    /// a range never spans more than one partition.
    pub async fn query_geohash(&self, range: GeohashRange) -> Result<Vec<StoredItem>> {
        let hash_key = generate_hash_key(range.min(), self.config.hash_key_length);
        let mut items = Vec::new();
        let mut token = None;

        loop {
            let page = self
                .store
                .query_page(RangeQuery {
                    hash_key,
                    geohash_min: range.min(),
                    geohash_max: range.max(),
                    index_name: self.config.geohash_index.clone(),
                    consistent_read: self.config.consistent_read,
                    token,
                })
                .await?;

            items.extend(page.items);
            match page.next_token {
                Some(next) => token = Some(next),
                None => break,
            }
        }

        Ok(items)
    }

    fn filter_by_radius(
        &self,
        candidates: Vec<StoredItem>,
        center: &Point,
        radius_meters: f64,
    ) -> Result<Vec<StoredItem>> {
        let mut matches = Vec::with_capacity(candidates.len());
        for item in candidates {
            let point = item.point(&self.config)?;
            if geometry::earth_distance_meters(center, &point) <= radius_meters {
                matches.push(item);
            }
        }
        Ok(matches)
    }

    fn filter_by_rectangle(
        &self,
        candidates: Vec<StoredItem>,
        rect: &LatLngRect,
    ) -> Result<Vec<StoredItem>> {
        let mut matches = Vec::with_capacity(candidates.len());
        for item in candidates {
            let point = item.point(&self.config)?;
            if rect.contains(&point) {
                matches.push(item);
            }
        }
        Ok(matches)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{MemoryStore, QueryPage};

    fn table() -> GeoTable<MemoryStore> {
        GeoTable::new(
            MemoryStore::new(),
            TableConfig::default().with_hash_key_length(3),
        )
        .unwrap()
    }

    fn london() -> Point {
        Point::new(-0.13, 51.51)
    }

    fn cambridge() -> Point {
        Point::new(0.1218, 52.2053)
    }

    fn paris() -> Point {
        Point::new(2.3522, 48.8566)
    }

    async fn seeded_table() -> GeoTable<MemoryStore> {
        let table = table();
        table
            .batch_write_points(vec![
                PutPoint::new(london(), "london"),
                PutPoint::new(cambridge(), "cambridge"),
                PutPoint::new(paris(), "paris"),
            ])
            .await
            .unwrap();
        table
    }

    fn range_keys(mut items: Vec<StoredItem>) -> Vec<String> {
        items.sort_by(|a, b| a.range_key.cmp(&b.range_key));
        items.into_iter().map(|i| i.range_key).collect()
    }

    #[test]
    fn test_new_rejects_invalid_config() {
        let mut config = TableConfig::default();
        config.hash_key_length = 0;
        let result = GeoTable::new(MemoryStore::new(), config);
        assert!(matches!(result, Err(GeoTableError::InvalidInput(_))));
    }

    #[tokio::test]
    async fn test_put_point_derives_keys() {
        let table = table();
        let item = table.put_point(PutPoint::new(london(), "london")).await.unwrap();

        assert_eq!(item.geohash, 5221366118452580119);
        assert_eq!(item.hash_key, 522);
        assert_eq!(item.range_key, "london");
        assert_eq!(
            item.geo_json,
            r#"{"type":"Point","coordinates":[-0.13,51.51]}"#
        );
    }

    #[tokio::test]
    async fn test_put_point_rejects_out_of_range_coordinates() {
        let table = table();
        let result = table
            .put_point(PutPoint::new(Point::new(-0.13, 91.0), "north"))
            .await;
        assert!(matches!(result, Err(GeoTableError::InvalidInput(_))));
    }

    #[tokio::test]
    async fn test_put_point_strips_reserved_attribute_names() {
        let table = table();
        let item = table
            .put_point(
                PutPoint::new(london(), "london")
                    .with_attribute("geohash", Value::from(1))
                    .with_attribute("capital", Value::from(true)),
            )
            .await
            .unwrap();

        assert_eq!(item.geohash, 5221366118452580119);
        assert!(!item.attributes.contains_key("geohash"));
        assert_eq!(item.attributes["capital"], Value::from(true));
    }

    #[tokio::test]
    async fn test_get_point_round_trip() {
        let table = seeded_table().await;

        let fetched = table.get_point(&london(), "london").await.unwrap().unwrap();
        assert_eq!(fetched.range_key, "london");
        assert!(table.get_point(&london(), "rome").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_update_point_drops_location_fields() {
        let table = seeded_table().await;

        table
            .update_point(
                &london(),
                "london",
                BTreeMap::from([
                    ("geohash".to_string(), Value::from(1)),
                    ("geoJson".to_string(), Value::from("spoofed")),
                    ("population".to_string(), Value::from(8_900_000)),
                ]),
            )
            .await
            .unwrap();

        let fetched = table.get_point(&london(), "london").await.unwrap().unwrap();
        assert_eq!(fetched.geohash, 5221366118452580119);
        assert_eq!(
            fetched.geo_json,
            r#"{"type":"Point","coordinates":[-0.13,51.51]}"#
        );
        assert_eq!(fetched.attributes["population"], Value::from(8_900_000));
        assert!(!fetched.attributes.contains_key("geohash"));
    }

    #[tokio::test]
    async fn test_delete_point() {
        let table = seeded_table().await;

        let removed = table.delete_point(&paris(), "paris").await.unwrap();
        assert_eq!(removed.unwrap().range_key, "paris");
        assert!(table.get_point(&paris(), "paris").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_query_radius_filters_exactly() {
        let table = seeded_table().await;

        // Centered between Cambridge and London; Paris is ~400 km out.
        let center = Point::new(0.149593, 52.22573);
        let items = table.query_radius(&center, 100_000.0).await.unwrap();
        assert_eq!(range_keys(items), vec!["cambridge", "london"]);

        let items = table.query_radius(&center, 10_000.0).await.unwrap();
        assert_eq!(range_keys(items), vec!["cambridge"]);
    }

    #[tokio::test]
    async fn test_query_rectangle() {
        let table = seeded_table().await;

        let items = table
            .query_rectangle(&Point::new(0.0, 52.0), &Point::new(0.3, 52.4))
            .await
            .unwrap();
        assert_eq!(range_keys(items), vec!["cambridge"]);
    }

    #[tokio::test]
    async fn test_query_radius_rejects_bad_radius() {
        let table = seeded_table().await;
        let center = Point::new(0.149593, 52.22573);
        assert!(table.query_radius(&center, -1.0).await.is_err());
        assert!(table.query_radius(&center, f64::NAN).await.is_err());
    }

    struct FailingStore;

    impl RangeStore for FailingStore {
        async fn query_page(&self, _query: RangeQuery) -> crate::Result<QueryPage> {
            Err(GeoTableError::Storage("engine offline".to_string()))
        }

        async fn put_item(&self, _item: StoredItem) -> crate::Result<()> {
            Ok(())
        }

        async fn get_item(
            &self,
            _hash_key: i64,
            _range_key: &str,
            _consistent_read: bool,
        ) -> crate::Result<Option<StoredItem>> {
            Ok(None)
        }

        async fn update_item(
            &self,
            _hash_key: i64,
            _range_key: &str,
            _updates: BTreeMap<String, Value>,
        ) -> crate::Result<()> {
            Ok(())
        }

        async fn delete_item(
            &self,
            _hash_key: i64,
            _range_key: &str,
        ) -> crate::Result<Option<StoredItem>> {
            Ok(None)
        }

        async fn batch_put_items(&self, _items: Vec<StoredItem>) -> crate::Result<()> {
            Ok(())
        }
    }

    #[tokio::test]
    async fn test_query_propagates_storage_errors() {
        let table = GeoTable::new(
            FailingStore,
            TableConfig::default().with_hash_key_length(3),
        )
        .unwrap();

        let result = table
            .query_radius(&Point::new(0.149593, 52.22573), 1_000.0)
            .await;
        assert!(matches!(result, Err(GeoTableError::Storage(_))));
    }
}
