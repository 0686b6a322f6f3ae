//! Geohash encoding at character and bit precision.
//!
//! Whole-character hashes go through the `geohash` crate. Range planning
//! also needs cells whose width is not a multiple of 5 bits, so
//! [`cell_bounds`] and [`neighbor_cells`] interleave bits directly: bits
//! alternate longitude and latitude, starting with longitude, and are
//! rendered five at a time in the base-32 alphabet below. A coordinate lying
//! exactly on a cell boundary belongs to the upper (north/east) cell.
//!
//! ```text
//! precision  bits  cell (approx, equator)
//!     1        5   5000km x 5000km
//!     4       20   39km x 20km
//!     6       30   1.2km x 0.6km
//!     8       40   38m x 19m
//!    10       50   1.2m x 0.6m
//!    12       60   3.7cm x 1.9cm
//! ```

use crate::error::{GeoScanError, Result};
use crate::types::GeoCoordinate;
use geo::{Rect, coord};
use geohash::Direction;
use std::fmt;

/// Geohash alphabet; its byte order is also the lexicographic key order.
pub const BASE32: &[u8; 32] = b"0123456789bcdefghjkmnpqrstuvwxyz";

pub const BITS_PER_CHAR: u8 = 5;

/// Longest supported geohash in characters.
pub const MAX_PRECISION: usize = 12;

/// Longest supported geohash in bits.
pub const MAX_BITS: u8 = MAX_PRECISION as u8 * BITS_PER_CHAR;

/// Characters needed to hold `bits` bits.
pub fn chars_for_bits(bits: u8) -> usize {
    bits.div_ceil(BITS_PER_CHAR) as usize
}

pub(crate) fn char_value(c: u8) -> Option<u8> {
    BASE32.iter().position(|&b| b == c).map(|idx| idx as u8)
}

pub(crate) fn value_char(value: u8) -> char {
    BASE32[value as usize & 0x1f] as char
}

/// A validated geohash string.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct GeoHash(String);

/// Center and dimensions (in degrees) of a geohash cell.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DecodedCell {
    pub center: GeoCoordinate,
    pub lat_size: f64,
    pub lng_size: f64,
}

/// The eight cells surrounding a geohash at the same precision.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Neighbors {
    pub n: GeoHash,
    pub ne: GeoHash,
    pub e: GeoHash,
    pub se: GeoHash,
    pub s: GeoHash,
    pub sw: GeoHash,
    pub w: GeoHash,
    pub nw: GeoHash,
}

impl Neighbors {
    pub fn iter(&self) -> impl Iterator<Item = &GeoHash> {
        [
            &self.n, &self.ne, &self.e, &self.se, &self.s, &self.sw, &self.w, &self.nw,
        ]
        .into_iter()
    }
}

impl GeoHash {
    /// Encode `coord` with `precision` characters (1-12).
    ///
    /// # Examples
    ///
    /// ```rust
    /// use geoscan::{GeoCoordinate, GeoHash};
    ///
    /// let coord = GeoCoordinate::new(57.64911, 10.40744).unwrap();
    /// let hash = GeoHash::encode(&coord, 11).unwrap();
    /// assert_eq!(hash.as_str(), "u4pruydqqvj");
    /// ```
    pub fn encode(coord: &GeoCoordinate, precision: usize) -> Result<Self> {
        if !(1..=MAX_PRECISION).contains(&precision) {
            return Err(GeoScanError::InvalidPrecision(precision));
        }

        let hash = geohash::encode(coord.to_point().into(), precision)
            .map_err(|e| GeoScanError::InvalidLocation(e.to_string()))?;
        Ok(Self(hash))
    }

    /// Validate an existing geohash string.
    pub fn parse(hash: &str) -> Result<Self> {
        if hash.is_empty() || hash.len() > MAX_PRECISION {
            return Err(GeoScanError::InvalidGeoHash(format!(
                "'{}' must be 1 to {} characters long",
                hash, MAX_PRECISION
            )));
        }

        geohash::decode_bbox(hash)?;
        Ok(Self(hash.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }

    /// Precision in characters.
    pub fn precision(&self) -> usize {
        self.0.len()
    }

    /// Precision in bits.
    pub fn bits(&self) -> u8 {
        self.0.len() as u8 * BITS_PER_CHAR
    }

    /// Decode to the cell center and its dimensions in degrees.
    pub fn decode(&self) -> Result<DecodedCell> {
        let (center, lng_err, lat_err) = geohash::decode(&self.0)?;
        Ok(DecodedCell {
            center: GeoCoordinate::new_unchecked(center.y, center.x),
            lat_size: lat_err * 2.0,
            lng_size: lng_err * 2.0,
        })
    }

    /// Bounding box of the cell (x = longitude, y = latitude).
    pub fn bounding_box(&self) -> Result<Rect> {
        Ok(geohash::decode_bbox(&self.0)?)
    }

    /// The eight adjacent cells at the same precision.
    ///
    /// Longitude wraps around the antimeridian. Latitude is clamped at the
    /// poles, so the northern neighbours of a top-row cell fall back onto
    /// that row.
    pub fn neighbors(&self) -> Result<Neighbors> {
        let bits = self.bits();
        let grid = offset_grid(self.bounding_box()?, bits);

        // geohash::neighbor rejects cells past a pole or the antimeridian
        let cell = |direction: Direction, row: usize, col: usize| {
            geohash::neighbor(&self.0, direction)
                .map(GeoHash)
                .unwrap_or_else(|_| GeoHash(render(grid[row][col], bits)))
        };

        Ok(Neighbors {
            n: cell(Direction::N, 2, 1),
            ne: cell(Direction::NE, 2, 2),
            e: cell(Direction::E, 1, 2),
            se: cell(Direction::SE, 0, 2),
            s: cell(Direction::S, 0, 1),
            sw: cell(Direction::SW, 0, 0),
            w: cell(Direction::W, 1, 0),
            nw: cell(Direction::NW, 2, 0),
        })
    }
}

impl fmt::Display for GeoHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for GeoHash {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Bounds of the cell containing `coord` at `bits` bits of precision.
pub fn cell_bounds(coord: &GeoCoordinate, bits: u8) -> Rect {
    bounds_of(interleave(coord, bits), bits)
}

/// The cell containing `coord` followed by its 8 neighbours at `bits`
/// precision, each rendered with [`chars_for_bits`] characters. Unused
/// trailing bits of the last character are zero.
///
/// Cells repeat near the poles and for very coarse precisions.
pub fn neighbor_cells(coord: &GeoCoordinate, bits: u8) -> [GeoHash; 9] {
    let grid = offset_grid(cell_bounds(coord, bits), bits);
    let cell = |row: usize, col: usize| GeoHash(render(grid[row][col], bits));

    [
        cell(1, 1),
        cell(2, 1),
        cell(2, 2),
        cell(1, 2),
        cell(0, 2),
        cell(0, 1),
        cell(0, 0),
        cell(1, 0),
        cell(2, 0),
    ]
}

/// Bring a longitude back into [-180, 180].
pub fn wrap_longitude(longitude: f64) -> f64 {
    if (-180.0..=180.0).contains(&longitude) {
        return longitude;
    }
    let adjusted = (longitude + 180.0).rem_euclid(360.0) - 180.0;
    if adjusted == -180.0 && longitude > 0.0 {
        180.0
    } else {
        adjusted
    }
}

/// Interleaved cell address of `coord`, most significant bit first.
fn interleave(coord: &GeoCoordinate, bits: u8) -> u64 {
    let mut lat = (-90.0, 90.0);
    let mut lng = (-180.0, 180.0);
    let mut value = 0u64;

    for i in 0..bits {
        let (range, v) = if i % 2 == 0 {
            (&mut lng, coord.longitude())
        } else {
            (&mut lat, coord.latitude())
        };
        let mid = (range.0 + range.1) / 2.0;
        value <<= 1;
        if v >= mid {
            value |= 1;
            range.0 = mid;
        } else {
            range.1 = mid;
        }
    }

    value
}

fn bounds_of(value: u64, bits: u8) -> Rect {
    let mut lat = (-90.0, 90.0);
    let mut lng = (-180.0, 180.0);

    for i in 0..bits {
        let bit = (value >> (bits - 1 - i)) & 1;
        let range = if i % 2 == 0 { &mut lng } else { &mut lat };
        let mid = (range.0 + range.1) / 2.0;
        if bit == 1 {
            range.0 = mid;
        } else {
            range.1 = mid;
        }
    }

    Rect::new(coord! { x: lng.0, y: lat.0 }, coord! { x: lng.1, y: lat.1 })
}

fn render(value: u64, bits: u8) -> String {
    let chars = chars_for_bits(bits);
    let padded = value << (chars as u8 * BITS_PER_CHAR - bits);
    (0..chars)
        .rev()
        .map(|i| value_char(((padded >> (i as u8 * BITS_PER_CHAR)) & 0x1f) as u8))
        .collect()
}

/// Cell addresses around `bounds`, indexed `[row][col]` with row 0 south
/// and col 0 west.
fn offset_grid(bounds: Rect, bits: u8) -> [[u64; 3]; 3] {
    let center = bounds.center();
    let (width, height) = (bounds.width(), bounds.height());
    let mut grid = [[0u64; 3]; 3];

    for (row, dy) in [-1.0, 0.0, 1.0].into_iter().enumerate() {
        for (col, dx) in [-1.0, 0.0, 1.0].into_iter().enumerate() {
            let latitude = (center.y + dy * height).clamp(-90.0, 90.0);
            let longitude = wrap_longitude(center.x + dx * width);
            let shifted = GeoCoordinate::new_unchecked(latitude, longitude);
            grid[row][col] = interleave(&shifted, bits);
        }
    }

    grid
}

#[cfg(test)]
mod tests {
    use super::*;

    fn coord(lat: f64, lng: f64) -> GeoCoordinate {
        GeoCoordinate::new(lat, lng).unwrap()
    }

    #[test]
    fn test_encode_known_values() {
        let hash = GeoHash::encode(&coord(57.64911, 10.40744), 11).unwrap();
        assert_eq!(hash.as_str(), "u4pruydqqvj");

        let hash = GeoHash::encode(&coord(42.605, -5.603), 5).unwrap();
        assert_eq!(hash.as_str(), "ezs42");

        let origin = GeoHash::encode(&coord(0.0, 0.0), 6).unwrap();
        assert_eq!(origin.as_str(), "s00000");
    }

    #[test]
    fn test_encode_corners() {
        let ne = GeoHash::encode(&coord(90.0, 180.0), 4).unwrap();
        assert_eq!(ne.as_str(), "zzzz");

        let sw = GeoHash::encode(&coord(-90.0, -180.0), 4).unwrap();
        assert_eq!(sw.as_str(), "0000");
    }

    #[test]
    fn test_invalid_precision() {
        let c = coord(10.0, 10.0);
        assert!(matches!(
            GeoHash::encode(&c, 0),
            Err(GeoScanError::InvalidPrecision(0))
        ));
        assert!(matches!(
            GeoHash::encode(&c, 13),
            Err(GeoScanError::InvalidPrecision(13))
        ));
    }

    #[test]
    fn test_parse() {
        assert!(GeoHash::parse("9q8yy").is_ok());
        assert!(GeoHash::parse("").is_err());
        assert!(GeoHash::parse("abc").is_err()); // 'a' is not in the alphabet
        assert!(GeoHash::parse("9q8yyk8ytpzzz").is_err()); // 13 chars
    }

    #[test]
    fn test_decode_contains_original() {
        let original = coord(37.7749, -122.4194);
        let hash = GeoHash::encode(&original, 8).unwrap();
        let cell = hash.decode().unwrap();

        assert!((cell.center.latitude() - original.latitude()).abs() <= cell.lat_size / 2.0);
        assert!((cell.center.longitude() - original.longitude()).abs() <= cell.lng_size / 2.0);

        // 40 bits: 20 longitude bits, 20 latitude bits
        assert!((cell.lng_size - 360.0 / f64::from(1u32 << 20)).abs() < 1e-12);
        assert!((cell.lat_size - 180.0 / f64::from(1u32 << 20)).abs() < 1e-12);
    }

    #[test]
    fn test_decode_known_cell() {
        let cell = GeoHash::parse("ezs42").unwrap().decode().unwrap();
        assert!((cell.center.latitude() - 42.605).abs() < 0.03);
        assert!((cell.center.longitude() - (-5.603)).abs() < 0.03);
    }

    #[test]
    fn test_cell_bounds_odd_bits() {
        let bounds = cell_bounds(&coord(10.0, 10.0), 3);
        // 2 longitude bits, 1 latitude bit
        assert_eq!(bounds.width(), 90.0);
        assert_eq!(bounds.height(), 90.0);
        assert_eq!(bounds.min().x, 0.0);
        assert_eq!(bounds.min().y, 0.0);
    }

    #[test]
    fn test_neighbors_are_adjacent() {
        let hash = GeoHash::encode(&coord(40.7128, -74.0060), 7).unwrap();
        let bbox = hash.bounding_box().unwrap();
        let nb = hash.neighbors().unwrap();

        let n = nb.n.bounding_box().unwrap();
        assert!((n.min().y - bbox.max().y).abs() < 1e-9);
        assert!((n.min().x - bbox.min().x).abs() < 1e-9);

        let e = nb.e.bounding_box().unwrap();
        assert!((e.min().x - bbox.max().x).abs() < 1e-9);

        let sw = nb.sw.bounding_box().unwrap();
        assert!((sw.max().x - bbox.min().x).abs() < 1e-9);
        assert!((sw.max().y - bbox.min().y).abs() < 1e-9);

        let unique: std::collections::HashSet<_> = nb.iter().collect();
        assert_eq!(unique.len(), 8);
        assert!(!unique.contains(&hash));
    }

    #[test]
    fn test_neighbors_wrap_longitude() {
        let hash = GeoHash::encode(&coord(0.5, 179.99), 5).unwrap();
        let east = hash.neighbors().unwrap().e.bounding_box().unwrap();
        assert_eq!(east.min().x, -180.0);

        let hash = GeoHash::encode(&coord(0.5, -179.99), 5).unwrap();
        let west = hash.neighbors().unwrap().w.bounding_box().unwrap();
        assert_eq!(west.max().x, 180.0);
    }

    #[test]
    fn test_neighbors_at_pole_collapse() {
        let hash = GeoHash::encode(&coord(89.99, 10.0), 4).unwrap();
        let nb = hash.neighbors().unwrap();

        assert_eq!(nb.n, hash);
        assert_eq!(nb.ne, nb.e);
        assert_eq!(nb.nw, nb.w);
    }

    #[test]
    fn test_neighbor_cells_center_first() {
        let c = coord(-33.8688, 151.2093);
        let cells = neighbor_cells(&c, 25);
        let center = GeoHash::encode(&c, 5).unwrap();

        assert_eq!(cells[0], center);
        let nb = center.neighbors().unwrap();
        for cell in &cells[1..] {
            assert!(nb.iter().any(|n| n == cell));
        }
    }

    #[test]
    fn test_neighbor_cells_partial_character() {
        let cells = neighbor_cells(&coord(10.0, 10.0), 7);
        for cell in &cells {
            assert_eq!(cell.precision(), 2);
            // the low 3 bits of the last character are unused
            let last = char_value(cell.as_str().as_bytes()[1]).unwrap();
            assert_eq!(last & 0b111, 0);
        }
    }

    #[test]
    fn test_wrap_longitude() {
        assert_eq!(wrap_longitude(10.0), 10.0);
        assert_eq!(wrap_longitude(180.0), 180.0);
        assert_eq!(wrap_longitude(190.0), -170.0);
        assert_eq!(wrap_longitude(-190.0), 170.0);
        assert_eq!(wrap_longitude(540.0), 180.0);
    }

    #[test]
    fn test_bit_level_cells_match_character_cells() {
        let samples = [
            (40.7128, -74.0060),
            (37.7749, -122.4194),
            (-33.8688, 151.2093),
            (51.5074, -0.1278),
            (35.6895, 139.6917),
            (-22.9068, -43.1729),
        ];

        for (lat, lng) in samples {
            let c = coord(lat, lng);
            let hash = GeoHash::encode(&c, 9).unwrap();
            let (ours, theirs) = (cell_bounds(&c, 45), hash.bounding_box().unwrap());
            assert!((ours.min().x - theirs.min().x).abs() < 1e-9);
            assert!((ours.min().y - theirs.min().y).abs() < 1e-9);
            assert!((ours.max().x - theirs.max().x).abs() < 1e-9);
            assert!((ours.max().y - theirs.max().y).abs() < 1e-9);

            let cells = neighbor_cells(&c, 45);
            let nb = hash.neighbors().unwrap();
            assert_eq!(cells[0], hash);
            assert_eq!(cells[1], nb.n);
            assert_eq!(cells[4], nb.se);
            assert_eq!(cells[7], nb.w);
        }
    }
}
