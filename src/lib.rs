//! Geospatial query layer for partition/sort-key storage engines.
//!
//! Points are projected onto the S2 space-filling curve, stored under
//! a derived partition key, and queried by decomposing a radius or
//! rectangle into concurrent geohash range scans followed by an exact
//! post-filter.
//!
//! ```rust
//! use geotable::{GeoTable, MemoryStore, Point, PutPoint, TableConfig};
//!
//! # async fn demo() -> geotable::Result<()> {
//! let table = GeoTable::new(MemoryStore::new(), TableConfig::default())?;
//!
//! let point = Point::new(-0.13, 51.51); // lng, lat
//! table.put_point(PutPoint::new(point, "london")).await?;
//! let nearby = table.query_radius(&point, 1000.0).await?;
//! # Ok(())
//! # }
//! ```

pub mod covering;
pub mod error;
pub mod geometry;
pub mod item;
pub mod range;
pub mod store;
pub mod table;
pub mod types;

pub use error::{GeoTableError, Result};

pub use geo::Point;

pub use covering::Covering;
pub use geometry::{LatLngRect, earth_distance_meters, generate_geohash, validate_point};
pub use item::StoredItem;
pub use range::{GeohashRange, generate_hash_key};
pub use store::{MemoryStore, QueryPage, RangeQuery, RangeStore};
pub use table::{GeoTable, PutPoint};
pub use types::{GeoJsonPointType, TableConfig};

pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Common imports
pub mod prelude {

    pub use geo::Point;

    pub use crate::{GeoTable, GeoTableError, Result};

    pub use crate::{GeoJsonPointType, PutPoint, StoredItem, TableConfig};

    pub use crate::{MemoryStore, RangeStore};

    pub use crate::{Covering, GeohashRange, LatLngRect};
}
