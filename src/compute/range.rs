//! Translation of a search circle into geohash key ranges.
//!
//! A circle is covered by the cell containing its center plus the 8
//! surrounding cells at a precision coarse enough that the circle cannot
//! escape that 3x3 block (see [`bounding_box_bits_at`]). Each cell becomes
//! one half-open range over geohash strings; ranges that coincide or touch
//! are merged so a query issues at most 9 reads.

use crate::compute::distance::bounding_box_bits_at;
use crate::compute::geohash::{
    BASE32, BITS_PER_CHAR, GeoHash, MAX_PRECISION, char_value, chars_for_bits, neighbor_cells,
    value_char,
};
use crate::compute::validation::validate_radius;
use crate::config::QueryConfig;
use crate::error::Result;
use crate::types::GeoCoordinate;
use rustc_hash::FxHashSet;
use smallvec::SmallVec;
use std::fmt;

/// Sorts after every character of the geohash alphabet.
const KEY_RANGE_END: char = '~';

/// Half-open interval `[start, end)` of geohash keys.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct KeyRange {
    pub start: String,
    pub end: String,
}

impl KeyRange {
    pub fn new(start: impl Into<String>, end: impl Into<String>) -> Self {
        Self {
            start: start.into(),
            end: end.into(),
        }
    }

    /// Range holding every key inside the cell `hash` truncated to `bits`.
    ///
    /// When `bits` is not a multiple of 5 only the leading bits of the last
    /// character are significant, so the range spans every character that
    /// shares them.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use geoscan::{GeoHash, KeyRange};
    ///
    /// let hash = GeoHash::parse("9q8y").unwrap();
    /// assert_eq!(KeyRange::for_cell(&hash, 20), KeyRange::new("9q8y", "9q8z"));
    ///
    /// // 17 bits: the last character keeps only its top 2 bits
    /// assert_eq!(KeyRange::for_cell(&hash, 17), KeyRange::new("9q8s", "9q9"));
    /// ```
    pub fn for_cell(hash: &GeoHash, bits: u8) -> Self {
        if bits == 0 {
            return KeyRange::new("", KEY_RANGE_END.to_string());
        }

        let precision = chars_for_bits(bits);
        let hash = hash.as_str();
        if hash.len() < precision {
            return KeyRange::new(hash, prefix_successor(hash));
        }

        let (base, last) = hash[..precision].split_at(precision - 1);
        let Some(last_value) = char_value(last.as_bytes()[0]) else {
            return KeyRange::new(&hash[..precision], prefix_successor(&hash[..precision]));
        };

        let significant = bits - (precision as u8 - 1) * BITS_PER_CHAR;
        let unused = BITS_PER_CHAR - significant;
        let start_value = (last_value >> unused) << unused;
        let end_value = start_value + (1 << unused);

        let start = format!("{}{}", base, value_char(start_value));
        let end = if end_value as usize >= BASE32.len() {
            prefix_successor(base)
        } else {
            format!("{}{}", base, value_char(end_value))
        };

        KeyRange { start, end }
    }

    /// Whether `key` falls inside this range.
    pub fn contains(&self, key: &str) -> bool {
        self.start.as_str() <= key && key < self.end.as_str()
    }

    /// Whether the two ranges share a key or meet end-to-start.
    pub fn overlaps_or_touches(&self, other: &KeyRange) -> bool {
        self.start <= other.end && other.start <= self.end
    }
}

impl fmt::Display for KeyRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}, {})", self.start, self.end)
    }
}

/// Smallest key greater than every key starting with `prefix`.
fn prefix_successor(prefix: &str) -> String {
    let trimmed = prefix.trim_end_matches(BASE32[BASE32.len() - 1] as char);
    let Some(last) = trimmed.bytes().last() else {
        return KEY_RANGE_END.to_string();
    };

    match char_value(last) {
        Some(value) => format!("{}{}", &trimmed[..trimmed.len() - 1], value_char(value + 1)),
        None => format!("{}{}", prefix, KEY_RANGE_END),
    }
}

/// Sort `ranges` and merge the ones that overlap or touch.
///
/// The result is sorted by start, no two ranges overlap or touch, and the
/// union of keys is unchanged.
pub fn merge_ranges<I>(ranges: I) -> Vec<KeyRange>
where
    I: IntoIterator<Item = KeyRange>,
{
    let mut sorted: Vec<KeyRange> = ranges.into_iter().collect();
    sorted.sort();

    let mut merged: Vec<KeyRange> = Vec::with_capacity(sorted.len());
    for range in sorted {
        match merged.last_mut() {
            Some(last) if range.start <= last.end => {
                if range.end > last.end {
                    last.end = range.end;
                }
            }
            _ => merged.push(range),
        }
    }

    merged
}

/// The key ranges to read for one radius query.
#[derive(Debug, Clone, PartialEq)]
pub struct QueryPlan {
    center: GeoCoordinate,
    radius_meters: f64,
    bits: u8,
    ranges: SmallVec<[KeyRange; 9]>,
}

impl QueryPlan {
    /// Plan the ranges covering `radius_meters` around `center`.
    ///
    /// Ranges are never cut finer than the stored tags
    /// (`config.stored_precision`), otherwise a range start would sort after
    /// the shorter tags it should hold.
    ///
    /// Fails with `InvalidRadius` when the radius is not positive or exceeds
    /// `config.max_query_radius_m`.
    pub fn new(center: &GeoCoordinate, radius_meters: f64, config: &QueryConfig) -> Result<Self> {
        validate_radius(radius_meters, config.max_query_radius_m)?;

        let stored_bits = config.stored_precision.clamp(1, MAX_PRECISION) as u8 * BITS_PER_CHAR;
        let bits = bounding_box_bits_at(center, radius_meters).min(stored_bits);

        let mut seen = FxHashSet::default();
        let candidates = neighbor_cells(center, bits)
            .into_iter()
            .filter(|cell| seen.insert(cell.clone()))
            .map(|cell| KeyRange::for_cell(&cell, bits));

        let ranges: SmallVec<[KeyRange; 9]> = merge_ranges(candidates).into_iter().collect();

        log::debug!(
            "Planned {} key ranges at {} bits for {} m around {}",
            ranges.len(),
            bits,
            radius_meters,
            center
        );

        Ok(Self {
            center: *center,
            radius_meters,
            bits,
            ranges,
        })
    }

    pub fn center(&self) -> &GeoCoordinate {
        &self.center
    }

    pub fn radius_meters(&self) -> f64 {
        self.radius_meters
    }

    /// Geohash precision in bits the ranges were cut at.
    pub fn bits(&self) -> u8 {
        self.bits
    }

    pub fn ranges(&self) -> &[KeyRange] {
        &self.ranges
    }

    pub fn len(&self) -> usize {
        self.ranges.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ranges.is_empty()
    }

    /// Whether any range of the plan holds `key`.
    pub fn covers(&self, key: &str) -> bool {
        self.ranges.iter().any(|range| range.contains(key))
    }
}
