//! Grid-accelerated 2D collision index.
//!
//! This crate stores uniquely-identified items at integer 2D positions and
//! answers radius-bounded proximity queries — "which items lie within
//! `radius` of this one?" — faster than an all-pairs scan. It is aimed at
//! workloads such as simulations, games, and geospatial filters that
//! repeatedly insert, move, and query many point entities:
//!
//! - [`SpatialIndex`] - The index: identity map + fixed cell grid behind one API
//! - [`CellCoord`] - Discrete cell addresses in grid space
//! - [`CellBounds`] - Inclusive rectangular cell ranges for bounding-box queries
//! - [`Error`] / [`ConsistencyError`] - Caller-facing errors and the internal invariant check
//!
//! # How It Works
//!
//! The plane is partitioned at construction into a fixed grid of rectangular
//! cells. Every item lives in exactly one cell (derived from its position by
//! floor division), and the index tracks both directions: item to position,
//! and cell to member set. A radius query visits only the cells under a
//! square bounding box around the query circle, then applies the exact
//! Euclidean distance test to their members, so the result is identical to a
//! brute-force scan at a fraction of the cost.
//!
//! Positions are discrete `i64` coordinates ([`Point2<i64>`]); query radii
//! are continuous `f64` values, inclusive, and normalized to their absolute
//! value.
//!
//! # Example
//!
//! ```
//! use collision_grid::{Point2, SpatialIndex};
//!
//! // A 1001x1001 plane with the default 100-unit cells
//! let mut index = SpatialIndex::new(1001, 1001).unwrap();
//!
//! index.insert("hello", Point2::new(1000, 1000)).unwrap();
//! index.insert("dog", Point2::new(800, 1000)).unwrap();
//! index.insert("cat", Point2::new(1000, 1001)).unwrap();
//! index.insert("Y", Point2::new(1000, 1000)).unwrap();
//!
//! index.remove(&"dog");
//!
//! // "hello" is at distance 0, "cat" at distance 1, both inclusive hits
//! let hits = index.collisions_within(&"Y", 1.0).unwrap();
//! assert!(hits.contains("hello"));
//! assert!(hits.contains("cat"));
//! assert_eq!(hits.len(), 2);
//! ```
//!
//! # Out-of-Plane Positions
//!
//! The grid is allocated once and never resizes. Inserting or relocating to
//! a position whose cell falls outside the allocated grid (including any
//! negative coordinate) is rejected with [`Error::OutOfBounds`]; query
//! bounding boxes that poke past the edges are clamped instead.
//!
//! # Concurrency
//!
//! The index is a single-threaded pure data structure: no operation blocks,
//! suspends, or performs I/O. Its two internal structures change together
//! and cannot be locked separately, so embedders that share an index across
//! threads must guard the whole value with one exclusive lock per call.
//!
//! # Consistency Checking
//!
//! [`SpatialIndex::check_consistency`] re-derives the pairing invariants by
//! a full cross-scan. Enabling the `consistency-checks` feature runs it
//! automatically after every mutation (it is always on in the crate's own
//! tests); production builds skip it.

// Safety: Deny unwrap/expect in library code. Tests may use them.
#![cfg_attr(not(test), deny(clippy::unwrap_used, clippy::expect_used))]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

mod cell;
mod error;
mod grid;
mod index;

// Re-export core types
pub use cell::{CellBounds, CellBoundsIter, CellCoord};
pub use error::{ConsistencyError, Error};
pub use index::{SpatialIndex, DEFAULT_CELL_EDGE};

// Re-export the nalgebra point type used for positions
pub use nalgebra::Point2;
