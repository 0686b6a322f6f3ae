//! Compute layer for planning radius queries.
//!
//! Everything here is pure and synchronous:
//! - Geohash encoding, cell bounds and neighbours
//! - Great-circle distance and precision selection
//! - Translation of a circle into merged key ranges
//!
//! Nothing in this module touches a store; the query executor consumes the
//! [`range::QueryPlan`] it produces.

pub mod distance;
pub mod geohash;
pub mod range;
pub mod validation;
