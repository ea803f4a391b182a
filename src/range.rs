//! Geohash intervals and hash key digit extraction.
//!
//! A geohash is a 64-bit signed S2 cell id; its leading decimal digits
//! (sign preserved) form the partition key. A covering cell's native
//! geohash interval can straddle several such prefixes, so it must be
//! split into sub-intervals that each map to exactly one hash key
//! before it can be scanned as a partition-equality range query.

use serde::{Deserialize, Serialize};

/// Extract the leading `hash_key_length` decimal digits of a geohash,
/// preserving sign.
///
/// A negative geohash yields the negated leading digits of its
/// magnitude. When the requested length already covers every digit of
/// the value, the value is returned unchanged.
///
/// This is the same digit rule [`GeohashRange::try_split`] uses, so
/// split sub-ranges and hash keys always address the same partition.
///
/// # Examples
///
/// ```rust
/// use geotable::range::generate_hash_key;
///
/// assert_eq!(generate_hash_key(5177531549489041509, 6), 517753);
/// assert_eq!(generate_hash_key(-5177531549489041509, 6), -517753);
/// ```
pub fn generate_hash_key(geohash: i64, hash_key_length: usize) -> i64 {
    // The minus sign occupies a digit slot of its own, exactly like
    // the string representation it is derived from.
    let effective_length = if geohash < 0 {
        hash_key_length + 1
    } else {
        hash_key_length
    };

    let digits = decimal_width(geohash);
    if digits <= effective_length {
        return geohash;
    }

    let denominator = 10i64.pow((digits - effective_length) as u32);
    geohash / denominator
}

/// Number of characters in the base-10 representation, sign included.
fn decimal_width(value: i64) -> usize {
    let mut width = if value < 0 { 2 } else { 1 };
    let mut magnitude = value.unsigned_abs();
    while magnitude >= 10 {
        magnitude /= 10;
        width += 1;
    }
    width
}

/// A contiguous, inclusive span of geohash values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct GeohashRange {
    min: i64,
    max: i64,
}

impl GeohashRange {
    /// Create a range. The bounds are reordered when given reversed.
    pub fn new(min: i64, max: i64) -> Self {
        if min <= max {
            Self { min, max }
        } else {
            Self { min: max, max: min }
        }
    }

    /// Inclusive lower bound.
    pub fn min(&self) -> i64 {
        self.min
    }

    /// Inclusive upper bound.
    pub fn max(&self) -> i64 {
        self.max
    }

    /// Whether `geohash` falls inside this range.
    pub fn contains(&self, geohash: i64) -> bool {
        self.min <= geohash && geohash <= self.max
    }

    /// Split this range at hash-key digit boundaries.
    ///
    /// Returns sub-ranges, ascending and pairwise disjoint, whose
    /// union is exactly `self` and whose bounds each share a single
    /// hash key of `hash_key_length` digits. When the whole range
    /// already maps to one hash key the range is returned as-is.
    ///
    /// Synthetic interior bounds fill the suffix digits with all-`0`
    /// (lower) or all-`9` (upper) at the original digit width;
    /// arithmetic saturates at the i64 ends instead of wrapping.
    pub fn try_split(&self, hash_key_length: usize) -> Vec<GeohashRange> {
        let min_hash_key = generate_hash_key(self.min, hash_key_length);
        let max_hash_key = generate_hash_key(self.max, hash_key_length);

        if min_hash_key == max_hash_key {
            return vec![*self];
        }

        let suffix_digits = decimal_width(self.min) - decimal_width(min_hash_key);
        let denominator = 10i64.pow(suffix_digits as u32);

        // The key span is unbounded (a wide range at a long hash key
        // length yields one sub-range per key), so let the vector grow
        // instead of reserving it up front.
        let mut ranges = Vec::new();
        for key in min_hash_key..=max_hash_key {
            let range = if key > 0 {
                GeohashRange {
                    min: if key == min_hash_key {
                        self.min
                    } else {
                        key.saturating_mul(denominator)
                    },
                    max: if key == max_hash_key {
                        self.max
                    } else {
                        key.saturating_add(1)
                            .saturating_mul(denominator)
                            .saturating_sub(1)
                    },
                }
            } else {
                GeohashRange {
                    min: if key == min_hash_key {
                        self.min
                    } else {
                        key.saturating_sub(1)
                            .saturating_mul(denominator)
                            .saturating_add(1)
                    },
                    max: if key == max_hash_key {
                        self.max
                    } else {
                        key.saturating_mul(denominator)
                    },
                }
            };
            ranges.push(range);
        }

        ranges
    }
}
