//! Table configuration for geotable.
//!
//! The configuration is serializable and loadable from JSON or TOML
//! while keeping complexity minimal. All fields have documented
//! defaults matching the attribute layout the query pipeline expects.

use serde::de::Error;
use serde::{Deserialize, Serialize};

/// The `type` literal written into stored geoJson payloads.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum GeoJsonPointType {
    /// Standard GeoJSON casing.
    #[default]
    #[serde(rename = "Point")]
    Point,
    /// Legacy uppercase casing some consumers expect.
    #[serde(rename = "POINT")]
    UpperPoint,
}

impl GeoJsonPointType {
    /// The literal written into the payload.
    pub fn as_str(&self) -> &'static str {
        match self {
            GeoJsonPointType::Point => "Point",
            GeoJsonPointType::UpperPoint => "POINT",
        }
    }
}

/// Per-table configuration.
///
/// # Example
///
/// ```rust
/// use geotable::TableConfig;
///
/// let config = TableConfig::default();
/// assert_eq!(config.hash_key_length, 2);
///
/// // Load from JSON
/// let json = r#"{
///     "hash_key_length": 5,
///     "consistent_read": true
/// }"#;
/// let config = TableConfig::from_json(json).unwrap();
/// assert_eq!(config.hash_key_length, 5);
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TableConfig {
    /// Attribute name of the partition key (default: `"hashKey"`).
    #[serde(default = "TableConfig::default_hash_key_attribute")]
    pub hash_key_attribute: String,

    /// Attribute name of the caller-supplied uniqueness key
    /// (default: `"rangeKey"`).
    #[serde(default = "TableConfig::default_range_key_attribute")]
    pub range_key_attribute: String,

    /// Attribute name of the full-precision geohash value
    /// (default: `"geohash"`).
    #[serde(default = "TableConfig::default_geohash_attribute")]
    pub geohash_attribute: String,

    /// Attribute name of the serialized geoJson payload
    /// (default: `"geoJson"`).
    #[serde(default = "TableConfig::default_geojson_attribute")]
    pub geojson_attribute: String,

    /// Name of the secondary index keyed by (hash key, geohash)
    /// (default: `"geohash-index"`).
    #[serde(default = "TableConfig::default_geohash_index")]
    pub geohash_index: String,

    /// Number of leading decimal digits of a geohash used as the
    /// partition key (1-19, default: 2). Larger values narrow each
    /// partition and widen query fan-out.
    #[serde(default = "TableConfig::default_hash_key_length")]
    pub hash_key_length: usize,

    /// Coordinate order in stored geoJson payloads: `[lng, lat]` when
    /// true (default), `[lat, lng]` otherwise.
    #[serde(default = "TableConfig::default_longitude_first")]
    pub longitude_first: bool,

    /// Whether point lookups and range scans request strongly
    /// consistent reads (default: false).
    #[serde(default)]
    pub consistent_read: bool,

    /// The `type` literal for stored geoJson payloads.
    #[serde(default)]
    pub point_type: GeoJsonPointType,
}

impl TableConfig {
    fn default_hash_key_attribute() -> String {
        "hashKey".to_string()
    }

    fn default_range_key_attribute() -> String {
        "rangeKey".to_string()
    }

    fn default_geohash_attribute() -> String {
        "geohash".to_string()
    }

    fn default_geojson_attribute() -> String {
        "geoJson".to_string()
    }

    fn default_geohash_index() -> String {
        "geohash-index".to_string()
    }

    const fn default_hash_key_length() -> usize {
        2
    }

    const fn default_longitude_first() -> bool {
        true
    }

    /// Set the hash key length. Panics when outside 1-19; use
    /// [`TableConfig::validate`] for non-panicking checks.
    pub fn with_hash_key_length(mut self, length: usize) -> Self {
        assert!(
            (1..=19).contains(&length),
            "Hash key length must be between 1 and 19"
        );
        self.hash_key_length = length;
        self
    }

    pub fn with_consistent_read(mut self, consistent: bool) -> Self {
        self.consistent_read = consistent;
        self
    }

    pub fn with_longitude_first(mut self, longitude_first: bool) -> Self {
        self.longitude_first = longitude_first;
        self
    }

    pub fn with_point_type(mut self, point_type: GeoJsonPointType) -> Self {
        self.point_type = point_type;
        self
    }

    /// Validate configuration values.
    pub fn validate(&self) -> Result<(), String> {
        if self.hash_key_length < 1 || self.hash_key_length > 19 {
            return Err("Hash key length must be between 1 and 19".to_string());
        }

        for (name, value) in [
            ("hash_key_attribute", &self.hash_key_attribute),
            ("range_key_attribute", &self.range_key_attribute),
            ("geohash_attribute", &self.geohash_attribute),
            ("geojson_attribute", &self.geojson_attribute),
            ("geohash_index", &self.geohash_index),
        ] {
            if value.is_empty() {
                return Err(format!("{} must not be empty", name));
            }
        }

        Ok(())
    }

    /// Load configuration from JSON string.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        let config: TableConfig = serde_json::from_str(json)?;
        if let Err(e) = config.validate() {
            return Err(Error::custom(e));
        }
        Ok(config)
    }

    /// Save configuration as JSON string.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    /// Load configuration from TOML string (requires toml feature).
    #[cfg(feature = "toml")]
    pub fn from_toml(toml_str: &str) -> Result<Self, toml::de::Error> {
        let config: TableConfig = toml::from_str(toml_str)?;
        if let Err(e) = config.validate() {
            return Err(toml::de::Error::custom(e));
        }
        Ok(config)
    }

    /// Save configuration as TOML string (requires toml feature).
    #[cfg(feature = "toml")]
    pub fn to_toml(&self) -> Result<String, toml::ser::Error> {
        toml::to_string_pretty(self)
    }
}

impl Default for TableConfig {
    fn default() -> Self {
        Self {
            hash_key_attribute: Self::default_hash_key_attribute(),
            range_key_attribute: Self::default_range_key_attribute(),
            geohash_attribute: Self::default_geohash_attribute(),
            geojson_attribute: Self::default_geojson_attribute(),
            geohash_index: Self::default_geohash_index(),
            hash_key_length: Self::default_hash_key_length(),
            longitude_first: Self::default_longitude_first(),
            consistent_read: false,
            point_type: GeoJsonPointType::default(),
        }
    }
}
