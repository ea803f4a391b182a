//! Stored point records.
//!
//! A stored item carries four system attributes (hash key, range key,
//! geohash, geoJson) as struct fields and everything the caller adds
//! in an open extension map. The two shapes meet only at the
//! attribute-map boundary, where the configured attribute names apply.

use std::collections::BTreeMap;

use geo::Point;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{GeoTableError, Result};
use crate::types::TableConfig;

/// The serialized geoJson payload shape. Field order is part of the
/// stored format: `{"type":...,"coordinates":...}`.
#[derive(Debug, Serialize, Deserialize)]
struct GeoJsonPoint {
    #[serde(rename = "type")]
    kind: String,
    coordinates: [f64; 2],
}

/// Render a point as the geoJson payload stored alongside it.
///
/// Coordinate order follows `config.longitude_first`; the `type`
/// literal follows `config.point_type`.
pub fn encode_geo_json(point: &Point, config: &TableConfig) -> String {
    let coordinates = if config.longitude_first {
        [point.x(), point.y()]
    } else {
        [point.y(), point.x()]
    };
    let payload = GeoJsonPoint {
        kind: config.point_type.as_str().to_string(),
        coordinates,
    };
    // Serializing two floats and a static string cannot fail.
    serde_json::to_string(&payload).unwrap_or_default()
}

/// A point record as persisted in the storage engine.
///
/// `geohash` and `geo_json` are derived once at write time and never
/// recomputed; updates through [`crate::GeoTable::update_point`]
/// cannot modify them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredItem {
    /// Partition key: leading decimal digits of the geohash.
    pub hash_key: i64,
    /// Caller-supplied uniqueness key within the partition.
    pub range_key: String,
    /// Full-precision geohash value, the sort key of the geohash
    /// index.
    pub geohash: i64,
    /// Serialized geoJson payload for the point.
    pub geo_json: String,
    /// Open extension map of caller attributes.
    #[serde(default)]
    pub attributes: BTreeMap<String, Value>,
}

impl StoredItem {
    /// Decode the stored geoJson payload back into a point.
    pub fn point(&self, config: &TableConfig) -> Result<Point> {
        let payload: GeoJsonPoint = serde_json::from_str(&self.geo_json)?;
        let [a, b] = payload.coordinates;
        let (longitude, latitude) = if config.longitude_first {
            (a, b)
        } else {
            (b, a)
        };
        Ok(Point::new(longitude, latitude))
    }

    /// Flatten into a single attribute map under the configured
    /// attribute names. System attributes win over caller attributes
    /// that reuse their names.
    pub fn to_attribute_map(&self, config: &TableConfig) -> BTreeMap<String, Value> {
        let mut map = self.attributes.clone();
        map.insert(config.hash_key_attribute.clone(), Value::from(self.hash_key));
        map.insert(
            config.range_key_attribute.clone(),
            Value::from(self.range_key.clone()),
        );
        map.insert(config.geohash_attribute.clone(), Value::from(self.geohash));
        map.insert(
            config.geojson_attribute.clone(),
            Value::from(self.geo_json.clone()),
        );
        map
    }

    /// Rebuild a record from a flat attribute map, separating the
    /// system attributes from caller attributes.
    pub fn from_attribute_map(
        config: &TableConfig,
        mut map: BTreeMap<String, Value>,
    ) -> Result<StoredItem> {
        let hash_key = take_i64(&mut map, &config.hash_key_attribute)?;
        let range_key = take_string(&mut map, &config.range_key_attribute)?;
        let geohash = take_i64(&mut map, &config.geohash_attribute)?;
        let geo_json = take_string(&mut map, &config.geojson_attribute)?;

        Ok(StoredItem {
            hash_key,
            range_key,
            geohash,
            geo_json,
            attributes: map,
        })
    }
}

fn take_i64(map: &mut BTreeMap<String, Value>, key: &str) -> Result<i64> {
    map.remove(key)
        .and_then(|v| v.as_i64())
        .ok_or_else(|| GeoTableError::InvalidInput(format!("missing numeric attribute {}", key)))
}

fn take_string(map: &mut BTreeMap<String, Value>, key: &str) -> Result<String> {
    match map.remove(key) {
        Some(Value::String(s)) => Ok(s),
        _ => Err(GeoTableError::InvalidInput(format!(
            "missing string attribute {}",
            key
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::GeoJsonPointType;

    fn item(config: &TableConfig, point: &Point) -> StoredItem {
        StoredItem {
            hash_key: 52,
            range_key: "london".to_string(),
            geohash: 5221366118452580119,
            geo_json: encode_geo_json(point, config),
            attributes: BTreeMap::from([(
                "capital".to_string(),
                Value::from("London"),
            )]),
        }
    }

    #[test]
    fn test_geo_json_longitude_first() {
        let config = TableConfig::default();
        let payload = encode_geo_json(&Point::new(-0.13, 51.51), &config);
        assert_eq!(payload, r#"{"type":"Point","coordinates":[-0.13,51.51]}"#);
    }

    #[test]
    fn test_geo_json_latitude_first() {
        let config = TableConfig::default()
            .with_longitude_first(false)
            .with_point_type(GeoJsonPointType::UpperPoint);
        let payload = encode_geo_json(&Point::new(-0.13, 51.51), &config);
        assert_eq!(payload, r#"{"type":"POINT","coordinates":[51.51,-0.13]}"#);
    }

    #[test]
    fn test_point_round_trip() {
        for longitude_first in [true, false] {
            let config = TableConfig::default().with_longitude_first(longitude_first);
            let original = Point::new(-0.13, 51.51);
            let stored = item(&config, &original);
            assert_eq!(stored.point(&config).unwrap(), original);
        }
    }

    #[test]
    fn test_point_rejects_malformed_payload() {
        let config = TableConfig::default();
        let mut stored = item(&config, &Point::new(0.0, 0.0));
        stored.geo_json = "not json".to_string();
        assert!(matches!(
            stored.point(&config),
            Err(GeoTableError::InvalidGeoJson(_))
        ));
    }

    #[test]
    fn test_attribute_map_round_trip() {
        let config = TableConfig::default();
        let stored = item(&config, &Point::new(-0.13, 51.51));

        let map = stored.to_attribute_map(&config);
        assert_eq!(map["hashKey"], Value::from(52));
        assert_eq!(map["rangeKey"], Value::from("london"));
        assert_eq!(map["geohash"], Value::from(5221366118452580119i64));
        assert_eq!(map["capital"], Value::from("London"));

        let rebuilt = StoredItem::from_attribute_map(&config, map).unwrap();
        assert_eq!(rebuilt, stored);
    }

    #[test]
    fn test_attribute_map_custom_names() {
        let mut config = TableConfig::default();
        config.hash_key_attribute = "pk".to_string();
        config.range_key_attribute = "sk".to_string();

        let stored = item(&config, &Point::new(-0.13, 51.51));
        let map = stored.to_attribute_map(&config);
        assert!(map.contains_key("pk"));
        assert!(map.contains_key("sk"));
        assert!(!map.contains_key("hashKey"));

        let rebuilt = StoredItem::from_attribute_map(&config, map).unwrap();
        assert_eq!(rebuilt, stored);
    }

    #[test]
    fn test_from_attribute_map_missing_system_attribute() {
        let config = TableConfig::default();
        let stored = item(&config, &Point::new(-0.13, 51.51));
        let mut map = stored.to_attribute_map(&config);
        map.remove("geohash");
        assert!(StoredItem::from_attribute_map(&config, map).is_err());
    }

    #[test]
    fn test_system_attributes_win_over_caller_attributes() {
        let config = TableConfig::default();
        let mut stored = item(&config, &Point::new(-0.13, 51.51));
        stored
            .attributes
            .insert("geohash".to_string(), Value::from("spoofed"));

        let map = stored.to_attribute_map(&config);
        assert_eq!(map["geohash"], Value::from(5221366118452580119i64));
    }
}
