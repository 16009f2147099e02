//! The collision index.

use std::collections::{HashMap, HashSet};
use std::hash::Hash;

use nalgebra::Point2;

use crate::cell::{CellBounds, CellCoord};
use crate::error::{ConsistencyError, Error};
use crate::grid::CellGrid;

/// Default cell edge length in plane units, used by [`SpatialIndex::new`].
pub const DEFAULT_CELL_EDGE: i64 = 100;

/// Squared Euclidean distance between two integer positions.
#[allow(clippy::cast_precision_loss)]
fn distance_sq(a: Point2<i64>, b: Point2<i64>) -> f64 {
    // Comparing squared distance against a squared radius keeps the test
    // exact for the boundary case without a sqrt.
    let dx = (a.x - b.x) as f64;
    let dy = (a.y - b.y) as f64;
    dx.mul_add(dx, dy * dy)
}

/// A grid-accelerated 2D collision index.
///
/// Stores uniquely-identified items at integer positions on a bounded plane
/// and answers radius queries ("which items lie within `radius` of this
/// one?") without scanning the whole population. Internally it keeps two
/// structures in lockstep behind this one API:
///
/// - an **identity map** from item to its current position, and
/// - a **cell grid** partitioning the plane into fixed rectangular cells,
///   each holding the set of items currently inside it.
///
/// A radius query computes the rectangle of cells that could contain a match
/// (a square bounding box around the query circle), clamps it to the grid,
/// and runs the exact distance test only on the members of those cells. The
/// bounding box may visit cells with no true match; the exact filter makes
/// the result identical to a brute-force scan.
///
/// Items are opaque to the index: any `T: Eq + Hash + Clone` works, and two
/// equal values denote the same item.
///
/// # Example
///
/// ```
/// use collision_grid::{Point2, SpatialIndex};
///
/// let mut index = SpatialIndex::new(1001, 1001).unwrap();
/// index.insert("hello", Point2::new(1000, 1000)).unwrap();
/// index.insert("dog", Point2::new(800, 1000)).unwrap();
/// index.insert("cat", Point2::new(1000, 1001)).unwrap();
/// index.insert("Y", Point2::new(1000, 1000)).unwrap();
/// index.remove(&"dog");
///
/// let hits = index.collisions_within(&"Y", 1.0).unwrap();
/// assert_eq!(hits.len(), 2);
/// assert!(hits.contains("hello"));
/// assert!(hits.contains("cat"));
/// ```
#[derive(Debug, Clone)]
pub struct SpatialIndex<T> {
    positions: HashMap<T, Point2<i64>>,
    grid: CellGrid<T>,
}

impl<T: Eq + Hash + Clone> SpatialIndex<T> {
    /// Creates an index over a `width x height` plane with the default cell
    /// edge of [`DEFAULT_CELL_EDGE`] units.
    ///
    /// The grid allocates `ceil(width / edge) + 1` columns and
    /// `ceil(height / edge) + 1` rows; the extra row and column keep
    /// positions landing exactly on the far plane boundary inside the grid.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidDimensions`] if `width` or `height` is not
    /// positive.
    ///
    /// # Example
    ///
    /// ```
    /// use collision_grid::SpatialIndex;
    ///
    /// let index: SpatialIndex<u32> = SpatialIndex::new(1001, 1001).unwrap();
    /// assert_eq!(index.cols(), 12);
    /// assert_eq!(index.rows(), 12);
    /// assert_eq!(index.cell_width(), 100);
    /// ```
    pub fn new(width: i64, height: i64) -> Result<Self, Error> {
        if width <= 0 || height <= 0 {
            return Err(Error::InvalidDimensions { width, height });
        }
        let cols = to_shape((width + DEFAULT_CELL_EDGE - 1) / DEFAULT_CELL_EDGE + 1)?;
        let rows = to_shape((height + DEFAULT_CELL_EDGE - 1) / DEFAULT_CELL_EDGE + 1)?;
        Ok(Self {
            positions: HashMap::new(),
            grid: CellGrid::new(DEFAULT_CELL_EDGE, DEFAULT_CELL_EDGE, rows, cols),
        })
    }

    /// Creates an index over a `width x height` plane partitioned into the
    /// requested number of rows and columns.
    ///
    /// Cell edges are `width / cols` and `height / rows` (integer division);
    /// one guard row and column are allocated on top of the requested shape
    /// so boundary positions stay inside the grid.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidDimensions`] for a non-positive plane, and
    /// [`Error::InvalidShape`] if `rows`/`cols` are non-positive or finer
    /// than one cell per plane unit.
    ///
    /// # Example
    ///
    /// ```
    /// use collision_grid::SpatialIndex;
    ///
    /// let index: SpatialIndex<u32> = SpatialIndex::with_shape(1000, 600, 6, 10).unwrap();
    /// assert_eq!(index.cell_width(), 100);
    /// assert_eq!(index.cell_height(), 100);
    /// assert_eq!(index.cols(), 11);
    /// assert_eq!(index.rows(), 7);
    /// ```
    pub fn with_shape(width: i64, height: i64, rows: i64, cols: i64) -> Result<Self, Error> {
        if width <= 0 || height <= 0 {
            return Err(Error::InvalidDimensions { width, height });
        }
        if rows <= 0 || cols <= 0 || cols > width || rows > height {
            return Err(Error::InvalidShape { rows, cols });
        }
        let cell_w = width / cols;
        let cell_h = height / rows;
        let cols = to_shape(cols + 1)?;
        let rows = to_shape(rows + 1)?;
        Ok(Self {
            positions: HashMap::new(),
            grid: CellGrid::new(cell_w, cell_h, rows, cols),
        })
    }

    /// Adds an item at a position.
    ///
    /// The item is recorded in the identity map and in the member set of the
    /// cell owning `position`, together; a failed insert changes nothing.
    ///
    /// # Errors
    ///
    /// - [`Error::DuplicateItem`] if the item is already present.
    /// - [`Error::OutOfBounds`] if the position's cell falls outside the
    ///   allocated grid (including any negative coordinate).
    ///
    /// # Example
    ///
    /// ```
    /// use collision_grid::{Error, Point2, SpatialIndex};
    ///
    /// let mut index = SpatialIndex::new(500, 500).unwrap();
    /// index.insert("a", Point2::new(10, 20)).unwrap();
    /// assert!(index.contains(&"a"));
    ///
    /// let err = index.insert("a", Point2::new(30, 40)).unwrap_err();
    /// assert!(matches!(err, Error::DuplicateItem));
    /// ```
    pub fn insert(&mut self, item: T, position: Point2<i64>) -> Result<(), Error> {
        if self.positions.contains_key(&item) {
            return Err(Error::DuplicateItem);
        }
        let cell = self.grid.cell_of(position);
        let Some(members) = self.grid.cell_mut(cell) else {
            return Err(Error::OutOfBounds {
                x: position.x,
                y: position.y,
            });
        };
        members.insert(item.clone());
        self.positions.insert(item, position);
        self.debug_check();
        Ok(())
    }

    /// Removes an item, returning the position it vacated.
    ///
    /// Removing an absent item is a no-op returning `None`, never an error
    /// (unlike [`Self::relocate`], which requires presence).
    ///
    /// # Example
    ///
    /// ```
    /// use collision_grid::{Point2, SpatialIndex};
    ///
    /// let mut index = SpatialIndex::new(500, 500).unwrap();
    /// index.insert("a", Point2::new(10, 20)).unwrap();
    ///
    /// assert_eq!(index.remove(&"a"), Some(Point2::new(10, 20)));
    /// assert_eq!(index.remove(&"a"), None);
    /// ```
    pub fn remove(&mut self, item: &T) -> Option<Point2<i64>> {
        let position = self.positions.remove(item)?;
        let cell = self.grid.cell_of(position);
        if let Some(members) = self.grid.cell_mut(cell) {
            members.remove(item);
        }
        self.debug_check();
        Some(position)
    }

    /// Moves a present item to a new position.
    ///
    /// Observably equivalent to remove followed by insert; both failure
    /// conditions are checked before anything mutates, so an error leaves
    /// the item where it was.
    ///
    /// # Errors
    ///
    /// - [`Error::NotFound`] if the item is not present.
    /// - [`Error::OutOfBounds`] if the target cell falls outside the grid.
    ///
    /// # Example
    ///
    /// ```
    /// use collision_grid::{Point2, SpatialIndex};
    ///
    /// let mut index = SpatialIndex::new(500, 500).unwrap();
    /// index.insert("a", Point2::new(10, 20)).unwrap();
    /// index.relocate(&"a", Point2::new(400, 400)).unwrap();
    /// assert_eq!(index.position_of(&"a"), Some(Point2::new(400, 400)));
    /// ```
    pub fn relocate(&mut self, item: &T, position: Point2<i64>) -> Result<(), Error> {
        let Some(&old_position) = self.positions.get(item) else {
            return Err(Error::NotFound);
        };
        let new_cell = self.grid.cell_of(position);
        if !self.grid.in_bounds(new_cell) {
            return Err(Error::OutOfBounds {
                x: position.x,
                y: position.y,
            });
        }
        let old_cell = self.grid.cell_of(old_position);
        if old_cell != new_cell {
            if let Some(members) = self.grid.cell_mut(old_cell) {
                members.remove(item);
            }
            if let Some(members) = self.grid.cell_mut(new_cell) {
                members.insert(item.clone());
            }
        }
        if let Some(stored) = self.positions.get_mut(item) {
            *stored = position;
        }
        self.debug_check();
        Ok(())
    }

    /// Checks whether two present items lie within `radius` of each other.
    ///
    /// The radius is inclusive and normalized to its absolute value: the
    /// result is `true` iff the Euclidean distance between the stored
    /// positions is at most `|radius|`. An item never collides with itself,
    /// for any radius.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotFound`] unless both items are present.
    ///
    /// # Example
    ///
    /// ```
    /// use collision_grid::{Point2, SpatialIndex};
    ///
    /// let mut index = SpatialIndex::new(500, 500).unwrap();
    /// index.insert("a", Point2::new(0, 0)).unwrap();
    /// index.insert("b", Point2::new(3, 4)).unwrap();
    ///
    /// assert!(index.collides(&"a", &"b", 5.0).unwrap()); // distance == 5
    /// assert!(!index.collides(&"a", &"b", 4.9).unwrap());
    /// assert!(!index.collides(&"a", &"a", 100.0).unwrap());
    /// ```
    pub fn collides(&self, a: &T, b: &T, radius: f64) -> Result<bool, Error> {
        let pos_a = *self.positions.get(a).ok_or(Error::NotFound)?;
        let pos_b = *self.positions.get(b).ok_or(Error::NotFound)?;
        if a == b {
            return Ok(false);
        }
        let radius = radius.abs();
        Ok(distance_sq(pos_a, pos_b) <= radius * radius)
    }

    /// Filters a candidate set down to the items colliding with `item`.
    ///
    /// This is the linear filtering primitive behind
    /// [`Self::collisions_within`]; calling it on the whole population
    /// degrades to an O(n) scan, which is exactly what the grid query
    /// avoids.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotFound`] if `item` or any candidate is absent.
    pub fn collisions_among(
        &self,
        item: &T,
        candidates: &HashSet<T>,
        radius: f64,
    ) -> Result<HashSet<T>, Error> {
        let mut hits = HashSet::new();
        for candidate in candidates {
            if self.collides(item, candidate, radius)? {
                hits.insert(candidate.clone());
            }
        }
        Ok(hits)
    }

    /// Returns every present item within `radius` of `item`.
    ///
    /// The radius is inclusive and normalized to its absolute value; the
    /// item itself is never part of the result. The result is identical to
    /// brute-force checking `item` against every other present item, but
    /// only the cells under the query's bounding box are scanned.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotFound`] if `item` is not present.
    ///
    /// # Example
    ///
    /// ```
    /// use collision_grid::{Point2, SpatialIndex};
    ///
    /// let mut index = SpatialIndex::new(500, 500).unwrap();
    /// index.insert("center", Point2::new(250, 250)).unwrap();
    /// index.insert("near", Point2::new(253, 254)).unwrap();
    /// index.insert("far", Point2::new(400, 100)).unwrap();
    ///
    /// let hits = index.collisions_within(&"center", 5.0).unwrap();
    /// assert_eq!(hits.len(), 1);
    /// assert!(hits.contains("near"));
    /// ```
    pub fn collisions_within(&self, item: &T, radius: f64) -> Result<HashSet<T>, Error> {
        let Some(&position) = self.positions.get(item) else {
            return Err(Error::NotFound);
        };
        let radius = radius.abs();

        // Square bounding box around the query circle: probe the cell
        // address at +-radius along each axis independently, then clamp to
        // the allocated grid. A superset of the true result set; the exact
        // distance test below does the rest.
        let min = CellCoord::new(
            self.grid.probe_col(position, -radius),
            self.grid.probe_row(position, -radius),
        );
        let max = CellCoord::new(
            self.grid.probe_col(position, radius),
            self.grid.probe_row(position, radius),
        );
        let bounds = CellBounds::new(min, max).clamp_to(self.grid.last_cell());

        let mut hits = HashSet::new();
        for cell in bounds.iter() {
            if let Some(members) = self.grid.cell(cell) {
                hits.extend(self.collisions_among(item, members, radius)?);
            }
        }
        Ok(hits)
    }

    /// Returns the stored position of an item, or `None` if absent.
    #[must_use]
    pub fn position_of(&self, item: &T) -> Option<Point2<i64>> {
        self.positions.get(item).copied()
    }

    /// Returns the number of items currently present.
    #[must_use]
    pub fn len(&self) -> usize {
        self.positions.len()
    }

    /// Returns `true` if no items are present.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }

    /// Checks whether an item is present.
    #[must_use]
    pub fn contains(&self, item: &T) -> bool {
        self.positions.contains_key(item)
    }

    /// Iterates over every present item.
    ///
    /// The iterator borrows the index, so it cannot observe later mutations;
    /// collect it for a snapshot.
    pub fn items(&self) -> impl Iterator<Item = &T> {
        self.positions.keys()
    }

    /// Iterates over every present item with its position.
    pub fn iter(&self) -> impl Iterator<Item = (&T, Point2<i64>)> {
        self.positions.iter().map(|(item, &position)| (item, position))
    }

    /// Number of grid rows (including the guard row).
    #[must_use]
    pub fn rows(&self) -> usize {
        self.grid.rows()
    }

    /// Number of grid columns (including the guard column).
    #[must_use]
    pub fn cols(&self) -> usize {
        self.grid.cols()
    }

    /// Cell width in plane units.
    #[must_use]
    pub fn cell_width(&self) -> i64 {
        self.grid.cell_width()
    }

    /// Cell height in plane units.
    #[must_use]
    pub fn cell_height(&self) -> i64 {
        self.grid.cell_height()
    }

    /// Resolves the cell address owning a position.
    ///
    /// Pure arithmetic, no bounds check: positions outside the plane resolve
    /// to whatever address the floor division yields, which may lie outside
    /// the allocated grid.
    ///
    /// # Example
    ///
    /// ```
    /// use collision_grid::{CellCoord, Point2, SpatialIndex};
    ///
    /// let index: SpatialIndex<u32> = SpatialIndex::new(1001, 1001).unwrap();
    /// assert_eq!(index.cell_of(Point2::new(250, 1001)), CellCoord::new(2, 10));
    /// assert_eq!(index.cell_of(Point2::new(-1, 0)), CellCoord::new(-1, 0));
    /// ```
    #[must_use]
    pub fn cell_of(&self, position: Point2<i64>) -> CellCoord {
        self.grid.cell_of(position)
    }

    /// Re-derives the index invariants by a full cross-scan.
    ///
    /// Verifies that every cell member has an identity-map entry resolving
    /// to exactly that cell, that no item occupies more than one cell, and
    /// that every identity-map entry appears in its derived cell.
    ///
    /// This is superlinear in the number of items and meant as a debugging
    /// aid, not for hot paths. With the `consistency-checks` feature (or in
    /// this crate's own tests) it runs automatically after every mutation
    /// and panics on violation.
    ///
    /// # Errors
    ///
    /// Returns a [`ConsistencyError`] describing the violated invariant.
    /// Any error here is a defect in the index itself, not caller misuse.
    pub fn check_consistency(&self) -> Result<(), ConsistencyError> {
        let mut counted = 0_usize;
        for (cell, members) in self.grid.iter_cells() {
            for member in members {
                let Some(&position) = self.positions.get(member) else {
                    return Err(ConsistencyError::new(
                        "cell member missing from the identity map",
                    ));
                };
                if self.grid.cell_of(position) != cell {
                    return Err(ConsistencyError::new(
                        "cell member held by a cell its position does not resolve to",
                    ));
                }
                counted += 1;
            }
        }
        // Every member maps to its own cell, so matching totals rule out an
        // item occupying two cells.
        if counted != self.positions.len() {
            return Err(ConsistencyError::new(
                "cell membership total does not match the identity map",
            ));
        }
        for (item, &position) in &self.positions {
            let cell = self.grid.cell_of(position);
            let present = self
                .grid
                .cell(cell)
                .is_some_and(|members| members.contains(item));
            if !present {
                return Err(ConsistencyError::new(
                    "identity-map entry absent from its derived cell",
                ));
            }
        }
        Ok(())
    }

    #[cfg(any(test, feature = "consistency-checks"))]
    fn debug_check(&self) {
        if let Err(violation) = self.check_consistency() {
            panic!("{violation}");
        }
    }

    #[cfg(not(any(test, feature = "consistency-checks")))]
    #[allow(clippy::unused_self)]
    const fn debug_check(&self) {}
}

fn to_shape(value: i64) -> Result<usize, Error> {
    usize::try_from(value).map_err(|_| Error::InvalidShape {
        rows: value,
        cols: value,
    })
}

#[cfg(test)]
#[allow(
    clippy::unwrap_used,
    clippy::cast_possible_truncation,
    clippy::cast_possible_wrap,
    clippy::cast_sign_loss
)]
mod tests {
    use super::*;

    /// Deterministic LCG so the randomized property tests are reproducible.
    struct Lcg(u64);

    impl Lcg {
        fn next(&mut self) -> u64 {
            self.0 = self
                .0
                .wrapping_mul(6_364_136_223_846_793_005)
                .wrapping_add(1_442_695_040_888_963_407);
            self.0 >> 33
        }

        fn coord(&mut self, max: i64) -> i64 {
            (self.next() % (max as u64 + 1)) as i64
        }
    }

    fn brute_force(index: &SpatialIndex<u32>, item: &u32, radius: f64) -> HashSet<u32> {
        index
            .items()
            .filter(|other| index.collides(item, other, radius).unwrap())
            .copied()
            .collect()
    }

    // ==================== Construction ====================

    #[test]
    fn test_new_rejects_non_positive_dimensions() {
        for (width, height) in [(0, 100), (100, 0), (-5, 100), (100, -5)] {
            let result: Result<SpatialIndex<u32>, _> = SpatialIndex::new(width, height);
            assert!(matches!(result, Err(Error::InvalidDimensions { .. })));
        }
    }

    #[test]
    fn test_with_shape_rejects_bad_shapes() {
        for (rows, cols) in [(0, 10), (10, 0), (-1, 10), (10, -1)] {
            let result: Result<SpatialIndex<u32>, _> =
                SpatialIndex::with_shape(100, 100, rows, cols);
            assert!(matches!(result, Err(Error::InvalidShape { .. })));
        }
        // Finer than one cell per unit: the cell edge would round to zero.
        let result: Result<SpatialIndex<u32>, _> = SpatialIndex::with_shape(10, 10, 3, 20);
        assert!(matches!(result, Err(Error::InvalidShape { .. })));
    }

    #[test]
    fn test_default_shape_derivation() {
        let index: SpatialIndex<u32> = SpatialIndex::new(1001, 1001).unwrap();
        assert_eq!(index.cols(), 12);
        assert_eq!(index.rows(), 12);
        assert_eq!(index.cell_width(), 100);
        assert_eq!(index.cell_height(), 100);
        assert!(index.is_empty());
        index.check_consistency().unwrap();
    }

    #[test]
    fn test_explicit_shape_derivation() {
        let index: SpatialIndex<u32> = SpatialIndex::with_shape(1000, 600, 7, 13).unwrap();
        assert_eq!(index.cell_width(), 76); // 1000 / 13
        assert_eq!(index.cell_height(), 85); // 600 / 7
        assert_eq!(index.cols(), 14);
        assert_eq!(index.rows(), 8);
    }

    // ==================== Mutations ====================

    #[test]
    fn test_insert_and_accessors() {
        let mut index = SpatialIndex::new(500, 500).unwrap();
        index.insert(1_u32, Point2::new(10, 20)).unwrap();
        index.insert(2, Point2::new(490, 480)).unwrap();

        assert_eq!(index.len(), 2);
        assert!(index.contains(&1));
        assert!(!index.contains(&3));
        assert_eq!(index.position_of(&1), Some(Point2::new(10, 20)));
        assert_eq!(index.position_of(&3), None);

        let items: HashSet<u32> = index.items().copied().collect();
        assert_eq!(items, HashSet::from([1, 2]));
        assert_eq!(index.iter().count(), 2);
    }

    #[test]
    fn test_insert_duplicate_leaves_state_unchanged() {
        let mut index = SpatialIndex::new(500, 500).unwrap();
        index.insert(1_u32, Point2::new(10, 20)).unwrap();

        let err = index.insert(1, Point2::new(300, 300)).unwrap_err();
        assert!(matches!(err, Error::DuplicateItem));
        assert_eq!(index.len(), 1);
        assert_eq!(index.position_of(&1), Some(Point2::new(10, 20)));
        index.check_consistency().unwrap();
    }

    #[test]
    fn test_insert_out_of_bounds_rejected() {
        let mut index = SpatialIndex::new(500, 500).unwrap();
        // Default shape: 6 guard-padded cells per axis, covering [0, 600).
        let err = index.insert(1_u32, Point2::new(600, 0)).unwrap_err();
        assert!(matches!(err, Error::OutOfBounds { x: 600, y: 0 }));
        let err = index.insert(1_u32, Point2::new(0, -1)).unwrap_err();
        assert!(matches!(err, Error::OutOfBounds { .. }));
        assert!(index.is_empty());
    }

    #[test]
    fn test_boundary_positions_accepted() {
        // Coordinates on the far plane boundary land in the guard cells.
        let mut index = SpatialIndex::new(1001, 1001).unwrap();
        index.insert(1_u32, Point2::new(1001, 1001)).unwrap();
        index.insert(2, Point2::new(0, 1001)).unwrap();
        assert_eq!(index.len(), 2);
    }

    #[test]
    fn test_remove_restores_prior_state() {
        let mut index = SpatialIndex::new(500, 500).unwrap();
        index.insert(1_u32, Point2::new(10, 20)).unwrap();
        let before = index.len();

        index.insert(2, Point2::new(30, 40)).unwrap();
        assert_eq!(index.remove(&2), Some(Point2::new(30, 40)));
        assert_eq!(index.len(), before);
        assert!(!index.contains(&2));
    }

    #[test]
    fn test_remove_absent_is_noop() {
        let mut index: SpatialIndex<u32> = SpatialIndex::new(500, 500).unwrap();
        assert_eq!(index.remove(&42), None);
        assert!(index.is_empty());
    }

    #[test]
    fn test_relocate_moves_between_cells() {
        let mut index = SpatialIndex::new(500, 500).unwrap();
        index.insert(1_u32, Point2::new(10, 20)).unwrap();
        let old_cell = index.cell_of(Point2::new(10, 20));

        index.relocate(&1, Point2::new(450, 450)).unwrap();
        let new_cell = index.cell_of(Point2::new(450, 450));

        assert_eq!(index.position_of(&1), Some(Point2::new(450, 450)));
        assert!(!index.grid.cell(old_cell).unwrap().contains(&1));
        assert!(index.grid.cell(new_cell).unwrap().contains(&1));
    }

    #[test]
    fn test_relocate_within_same_cell() {
        let mut index = SpatialIndex::new(500, 500).unwrap();
        index.insert(1_u32, Point2::new(10, 20)).unwrap();
        index.relocate(&1, Point2::new(15, 25)).unwrap();
        assert_eq!(index.position_of(&1), Some(Point2::new(15, 25)));
        index.check_consistency().unwrap();
    }

    #[test]
    fn test_relocate_absent_fails() {
        let mut index: SpatialIndex<u32> = SpatialIndex::new(500, 500).unwrap();
        let err = index.relocate(&1, Point2::new(10, 10)).unwrap_err();
        assert!(matches!(err, Error::NotFound));
    }

    #[test]
    fn test_relocate_out_of_bounds_is_atomic() {
        let mut index = SpatialIndex::new(500, 500).unwrap();
        index.insert(1_u32, Point2::new(10, 20)).unwrap();

        let err = index.relocate(&1, Point2::new(-50, 20)).unwrap_err();
        assert!(matches!(err, Error::OutOfBounds { .. }));
        // The failed move left the item exactly where it was.
        assert_eq!(index.position_of(&1), Some(Point2::new(10, 20)));
        let cell = index.cell_of(Point2::new(10, 20));
        assert!(index.grid.cell(cell).unwrap().contains(&1));
    }

    // ==================== Pairwise collision ====================

    #[test]
    fn test_never_collides_with_self() {
        let mut index = SpatialIndex::new(500, 500).unwrap();
        index.insert(1_u32, Point2::new(10, 20)).unwrap();
        for radius in [0.0, 1.0, -3.0, 1e9] {
            assert!(!index.collides(&1, &1, radius).unwrap());
        }
    }

    #[test]
    fn test_collides_symmetry() {
        let mut index = SpatialIndex::new(500, 500).unwrap();
        index.insert(1_u32, Point2::new(10, 20)).unwrap();
        index.insert(2, Point2::new(14, 23)).unwrap();
        for radius in [0.0, 4.9, 5.0, 100.0] {
            assert_eq!(
                index.collides(&1, &2, radius).unwrap(),
                index.collides(&2, &1, radius).unwrap()
            );
        }
    }

    #[test]
    fn test_collides_inclusive_boundary() {
        let mut index = SpatialIndex::new(500, 500).unwrap();
        index.insert(1_u32, Point2::new(0, 0)).unwrap();
        index.insert(2, Point2::new(3, 4)).unwrap();
        assert!(index.collides(&1, &2, 5.0).unwrap());
        assert!(!index.collides(&1, &2, 4.999).unwrap());
    }

    #[test]
    fn test_collides_negative_radius_normalized() {
        let mut index = SpatialIndex::new(500, 500).unwrap();
        index.insert(1_u32, Point2::new(0, 0)).unwrap();
        index.insert(2, Point2::new(3, 4)).unwrap();
        assert!(index.collides(&1, &2, -5.0).unwrap());
        assert!(!index.collides(&1, &2, -4.0).unwrap());
    }

    #[test]
    fn test_collides_requires_presence() {
        let mut index = SpatialIndex::new(500, 500).unwrap();
        index.insert(1_u32, Point2::new(0, 0)).unwrap();
        assert!(matches!(index.collides(&1, &9, 5.0), Err(Error::NotFound)));
        assert!(matches!(index.collides(&9, &1, 5.0), Err(Error::NotFound)));
    }

    #[test]
    fn test_collisions_among_filters_candidates() {
        let mut index = SpatialIndex::new(500, 500).unwrap();
        index.insert(1_u32, Point2::new(100, 100)).unwrap();
        index.insert(2, Point2::new(102, 100)).unwrap();
        index.insert(3, Point2::new(100, 109)).unwrap();
        index.insert(4, Point2::new(400, 400)).unwrap();

        let candidates = HashSet::from([1, 2, 3]);
        let hits = index.collisions_among(&1, &candidates, 5.0).unwrap();
        assert_eq!(hits, HashSet::from([2]));

        let absent = HashSet::from([2, 99]);
        assert!(matches!(
            index.collisions_among(&1, &absent, 5.0),
            Err(Error::NotFound)
        ));
    }

    // ==================== Grid query ====================

    #[test]
    fn test_unit_radius_around_cluster() {
        let mut index = SpatialIndex::new(1001, 1001).unwrap();
        index.insert("hello", Point2::new(1000, 1000)).unwrap();
        index.insert("dog", Point2::new(800, 1000)).unwrap();
        index.insert("cat", Point2::new(1000, 1001)).unwrap();
        index.insert("Y", Point2::new(1000, 1000)).unwrap();
        index.remove(&"dog");

        let hits = index.collisions_within(&"Y", 1.0).unwrap();
        let expected: HashSet<&str> = HashSet::from(["hello", "cat"]);
        assert_eq!(hits, expected);
    }

    #[test]
    fn test_query_requires_presence() {
        let index: SpatialIndex<u32> = SpatialIndex::new(500, 500).unwrap();
        assert!(matches!(
            index.collisions_within(&1, 5.0),
            Err(Error::NotFound)
        ));
    }

    #[test]
    fn test_radius_zero_is_exact_match() {
        let mut index = SpatialIndex::new(500, 500).unwrap();
        index.insert(1_u32, Point2::new(250, 250)).unwrap();
        index.insert(2, Point2::new(250, 250)).unwrap();
        index.insert(3, Point2::new(250, 251)).unwrap();

        let hits = index.collisions_within(&1, 0.0).unwrap();
        assert_eq!(hits, HashSet::from([2]));
    }

    #[test]
    fn test_query_spanning_grid_edges() {
        // Item near the origin corner: the bounding box pokes past the grid
        // on two sides and must clamp instead of missing cells.
        let mut index = SpatialIndex::new(1000, 1000).unwrap();
        index.insert(1_u32, Point2::new(3, 3)).unwrap();
        index.insert(2, Point2::new(0, 0)).unwrap();
        index.insert(3, Point2::new(150, 3)).unwrap();

        let hits = index.collisions_within(&1, 250.0).unwrap();
        assert_eq!(hits, HashSet::from([2, 3]));
    }

    #[test]
    fn test_whole_grid_radius_matches_brute_force() {
        let mut index = SpatialIndex::new(1000, 1000).unwrap();
        let mut rng = Lcg(42);
        for id in 0..80_u32 {
            index
                .insert(id, Point2::new(rng.coord(1000), rng.coord(1000)))
                .unwrap();
        }
        let hits = index.collisions_within(&7, 1e9).unwrap();
        assert_eq!(hits, brute_force(&index, &7, 1e9));
        assert_eq!(hits.len(), index.len() - 1); // everyone but the item itself
    }

    #[test]
    fn test_query_matches_brute_force_across_shapes_and_radii() {
        let configs: [(i64, i64, Option<(i64, i64)>); 3] = [
            (1000, 1000, None),
            (1000, 600, Some((7, 13))),
            (50, 50, Some((5, 5))),
        ];
        for (width, height, shape) in configs {
            let mut index = match shape {
                None => SpatialIndex::new(width, height).unwrap(),
                Some((rows, cols)) => SpatialIndex::with_shape(width, height, rows, cols).unwrap(),
            };
            let mut rng = Lcg(0x5eed ^ (width as u64));
            for id in 0..120_u32 {
                index
                    .insert(id, Point2::new(rng.coord(width), rng.coord(height)))
                    .unwrap();
            }
            // Shake the population around, then verify the defining property:
            // grid result set == brute-force result set.
            for id in 0..40_u32 {
                index
                    .relocate(&id, Point2::new(rng.coord(width), rng.coord(height)))
                    .unwrap();
            }
            for radius in [0.0, 1.0, 5.0, 37.5, 120.0, 10_000.0] {
                for probe in [0_u32, 17, 63, 119] {
                    assert_eq!(
                        index.collisions_within(&probe, radius).unwrap(),
                        brute_force(&index, &probe, radius),
                        "shape {shape:?}, radius {radius}, probe {probe}"
                    );
                }
            }
            index.check_consistency().unwrap();
        }
    }

    // ==================== Consistency ====================

    #[test]
    fn test_consistency_after_mixed_operations() {
        let mut index = SpatialIndex::new(800, 800).unwrap();
        let mut rng = Lcg(7);
        for id in 0..60_u32 {
            index
                .insert(id, Point2::new(rng.coord(800), rng.coord(800)))
                .unwrap();
        }
        for id in (0..60_u32).step_by(3) {
            index.remove(&id);
        }
        for id in (1..60_u32).step_by(3) {
            index
                .relocate(&id, Point2::new(rng.coord(800), rng.coord(800)))
                .unwrap();
        }
        index.check_consistency().unwrap();
        assert_eq!(index.len(), index.grid.member_count());
    }

    #[test]
    fn test_consistency_detects_desync() {
        let mut index = SpatialIndex::new(500, 500).unwrap();
        index.insert(1_u32, Point2::new(10, 20)).unwrap();
        // Corrupt the pairing on purpose: reroute the stored position to a
        // different cell without touching the membership sets.
        index.positions.insert(1, Point2::new(400, 400));
        let err = index.check_consistency().unwrap_err();
        assert!(err.to_string().contains("consistency violated"));
    }
}
