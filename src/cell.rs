//! Cell address types.

/// A discrete cell address in the index's grid, as `(column, row)`.
///
/// Uses `i64` components so that address arithmetic on positions outside the
/// configured plane (for example a query bounding box poking past an edge)
/// stays well-defined; out-of-range addresses are clamped or rejected by the
/// code that consumes them.
///
/// # Example
///
/// ```
/// use collision_grid::CellCoord;
///
/// let cell = CellCoord::new(3, 7);
/// assert_eq!(cell.col, 3);
/// assert_eq!(cell.row, 7);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct CellCoord {
    /// Column index (derived from the x axis).
    pub col: i64,
    /// Row index (derived from the y axis).
    pub row: i64,
}

impl CellCoord {
    /// Creates a new cell address.
    ///
    /// # Example
    ///
    /// ```
    /// use collision_grid::CellCoord;
    ///
    /// let cell = CellCoord::new(1, 2);
    /// assert_eq!(cell.as_tuple(), (1, 2));
    /// ```
    #[must_use]
    pub const fn new(col: i64, row: i64) -> Self {
        Self { col, row }
    }

    /// The address of the top-left cell, `(0, 0)`.
    #[must_use]
    pub const fn origin() -> Self {
        Self::new(0, 0)
    }

    /// Returns the address as a `(col, row)` tuple.
    #[must_use]
    pub const fn as_tuple(self) -> (i64, i64) {
        (self.col, self.row)
    }
}

/// An inclusive rectangular range of cell addresses.
///
/// Both corners are part of the range. This is the shape a radius query
/// visits: a conservative bounding box of cells, iterated row-major.
///
/// # Example
///
/// ```
/// use collision_grid::{CellBounds, CellCoord};
///
/// let bounds = CellBounds::new(CellCoord::new(0, 0), CellCoord::new(2, 1));
/// assert!(bounds.contains(CellCoord::new(2, 1)));
/// assert_eq!(bounds.cell_count(), 6);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct CellBounds {
    /// Minimum corner (inclusive).
    pub min: CellCoord,
    /// Maximum corner (inclusive).
    pub max: CellCoord,
}

impl CellBounds {
    /// Creates bounds from two corners, reordering so `min <= max` per axis.
    ///
    /// # Example
    ///
    /// ```
    /// use collision_grid::{CellBounds, CellCoord};
    ///
    /// let bounds = CellBounds::new(CellCoord::new(5, 0), CellCoord::new(0, 5));
    /// assert_eq!(bounds.min, CellCoord::new(0, 0));
    /// assert_eq!(bounds.max, CellCoord::new(5, 5));
    /// ```
    #[must_use]
    pub fn new(a: CellCoord, b: CellCoord) -> Self {
        Self {
            min: CellCoord::new(a.col.min(b.col), a.row.min(b.row)),
            max: CellCoord::new(a.col.max(b.col), a.row.max(b.row)),
        }
    }

    /// Creates bounds covering a single cell.
    #[must_use]
    pub const fn from_cell(cell: CellCoord) -> Self {
        Self {
            min: cell,
            max: cell,
        }
    }

    /// Returns the size of the bounds as `(columns, rows)`, each at least 1.
    ///
    /// # Example
    ///
    /// ```
    /// use collision_grid::{CellBounds, CellCoord};
    ///
    /// let bounds = CellBounds::new(CellCoord::new(0, 0), CellCoord::new(9, 4));
    /// assert_eq!(bounds.size(), (10, 5));
    /// ```
    #[must_use]
    pub const fn size(&self) -> (u64, u64) {
        (
            self.max.col.abs_diff(self.min.col).saturating_add(1),
            self.max.row.abs_diff(self.min.row).saturating_add(1),
        )
    }

    /// Returns the total number of cells in the range.
    #[must_use]
    pub fn cell_count(&self) -> u64 {
        let (cols, rows) = self.size();
        cols.saturating_mul(rows)
    }

    /// Checks whether a cell address lies within the bounds.
    #[must_use]
    pub const fn contains(&self, cell: CellCoord) -> bool {
        cell.col >= self.min.col
            && cell.col <= self.max.col
            && cell.row >= self.min.row
            && cell.row <= self.max.row
    }

    /// Clamps both corners into `[0, last]` per axis.
    ///
    /// This is the query-side edge policy: a bounding box that pokes past the
    /// grid is pulled back to the first/last valid cell.
    ///
    /// # Example
    ///
    /// ```
    /// use collision_grid::{CellBounds, CellCoord};
    ///
    /// let bounds = CellBounds::new(CellCoord::new(-3, 2), CellCoord::new(20, 4))
    ///     .clamp_to(CellCoord::new(9, 9));
    /// assert_eq!(bounds.min, CellCoord::new(0, 2));
    /// assert_eq!(bounds.max, CellCoord::new(9, 4));
    /// ```
    #[must_use]
    pub fn clamp_to(self, last: CellCoord) -> Self {
        Self {
            min: CellCoord::new(self.min.col.clamp(0, last.col), self.min.row.clamp(0, last.row)),
            max: CellCoord::new(self.max.col.clamp(0, last.col), self.max.row.clamp(0, last.row)),
        }
    }

    /// Returns an iterator over every cell address in the range.
    ///
    /// Iterates row-major (column varies fastest).
    ///
    /// # Example
    ///
    /// ```
    /// use collision_grid::{CellBounds, CellCoord};
    ///
    /// let bounds = CellBounds::new(CellCoord::new(0, 0), CellCoord::new(1, 1));
    /// let cells: Vec<_> = bounds.iter().collect();
    /// assert_eq!(cells.len(), 4);
    /// assert_eq!(cells[0], CellCoord::new(0, 0));
    /// assert_eq!(cells[1], CellCoord::new(1, 0));
    /// ```
    #[must_use]
    pub const fn iter(&self) -> CellBoundsIter {
        CellBoundsIter {
            bounds: *self,
            current: Some(self.min),
        }
    }
}

impl IntoIterator for CellBounds {
    type Item = CellCoord;
    type IntoIter = CellBoundsIter;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

impl IntoIterator for &CellBounds {
    type Item = CellCoord;
    type IntoIter = CellBoundsIter;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

/// Iterator over all cell addresses in a [`CellBounds`].
#[derive(Debug, Clone)]
pub struct CellBoundsIter {
    bounds: CellBounds,
    current: Option<CellCoord>,
}

impl Iterator for CellBoundsIter {
    type Item = CellCoord;

    fn next(&mut self) -> Option<Self::Item> {
        let current = self.current?;

        let mut next = current;
        next.col += 1;
        if next.col > self.bounds.max.col {
            next.col = self.bounds.min.col;
            next.row += 1;
            if next.row > self.bounds.max.row {
                self.current = None;
                return Some(current);
            }
        }
        self.current = Some(next);

        Some(current)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = self.current.map_or(0, |current| {
            let remaining_cols = self.bounds.max.col.abs_diff(current.col) + 1;
            let remaining_rows = self.bounds.max.row.abs_diff(current.row);
            let width = self.bounds.max.col.abs_diff(self.bounds.min.col) + 1;

            remaining_cols.saturating_add(remaining_rows.saturating_mul(width))
        });

        let remaining = usize::try_from(remaining).unwrap_or(usize::MAX);
        (remaining, Some(remaining))
    }
}

impl ExactSizeIterator for CellBoundsIter {}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_coord_new() {
        let cell = CellCoord::new(3, -2);
        assert_eq!(cell.col, 3);
        assert_eq!(cell.row, -2);
        assert_eq!(cell.as_tuple(), (3, -2));
    }

    #[test]
    fn test_coord_origin() {
        assert_eq!(CellCoord::origin(), CellCoord::new(0, 0));
    }

    #[test]
    fn test_bounds_auto_order() {
        let bounds = CellBounds::new(CellCoord::new(5, 0), CellCoord::new(0, 5));
        assert_eq!(bounds.min, CellCoord::new(0, 0));
        assert_eq!(bounds.max, CellCoord::new(5, 5));
    }

    #[test]
    fn test_bounds_from_cell() {
        let bounds = CellBounds::from_cell(CellCoord::new(4, 4));
        assert_eq!(bounds.min, bounds.max);
        assert_eq!(bounds.cell_count(), 1);
    }

    #[test]
    fn test_bounds_size() {
        let bounds = CellBounds::new(CellCoord::new(0, 0), CellCoord::new(9, 4));
        assert_eq!(bounds.size(), (10, 5));
        assert_eq!(bounds.cell_count(), 50);
    }

    #[test]
    fn test_bounds_contains() {
        let bounds = CellBounds::new(CellCoord::new(1, 1), CellCoord::new(3, 3));
        assert!(bounds.contains(CellCoord::new(1, 1)));
        assert!(bounds.contains(CellCoord::new(3, 3)));
        assert!(bounds.contains(CellCoord::new(2, 2)));
        assert!(!bounds.contains(CellCoord::new(0, 2)));
        assert!(!bounds.contains(CellCoord::new(2, 4)));
    }

    #[test]
    fn test_bounds_clamp_negative() {
        let bounds = CellBounds::new(CellCoord::new(-3, -1), CellCoord::new(2, 2))
            .clamp_to(CellCoord::new(9, 9));
        assert_eq!(bounds.min, CellCoord::new(0, 0));
        assert_eq!(bounds.max, CellCoord::new(2, 2));
    }

    #[test]
    fn test_bounds_clamp_overflow() {
        let bounds = CellBounds::new(CellCoord::new(5, 5), CellCoord::new(100, 100))
            .clamp_to(CellCoord::new(9, 7));
        assert_eq!(bounds.min, CellCoord::new(5, 5));
        assert_eq!(bounds.max, CellCoord::new(9, 7));
    }

    #[test]
    fn test_bounds_clamp_fully_outside() {
        // A range entirely left of the grid collapses onto column 0.
        let bounds = CellBounds::new(CellCoord::new(-5, 0), CellCoord::new(-2, 0))
            .clamp_to(CellCoord::new(9, 9));
        assert_eq!(bounds.min, CellCoord::new(0, 0));
        assert_eq!(bounds.max, CellCoord::new(0, 0));
    }

    #[test]
    fn test_bounds_iter_row_major() {
        let bounds = CellBounds::new(CellCoord::new(0, 0), CellCoord::new(2, 1));
        let cells: Vec<_> = bounds.iter().collect();
        assert_eq!(
            cells,
            vec![
                CellCoord::new(0, 0),
                CellCoord::new(1, 0),
                CellCoord::new(2, 0),
                CellCoord::new(0, 1),
                CellCoord::new(1, 1),
                CellCoord::new(2, 1),
            ]
        );
    }

    #[test]
    fn test_bounds_iter_single_cell() {
        let bounds = CellBounds::from_cell(CellCoord::new(7, 7));
        let cells: Vec<_> = bounds.into_iter().collect();
        assert_eq!(cells, vec![CellCoord::new(7, 7)]);
    }

    #[test]
    fn test_bounds_iter_exact_size() {
        let bounds = CellBounds::new(CellCoord::new(0, 0), CellCoord::new(3, 4));
        let mut iter = bounds.iter();
        assert_eq!(iter.len(), 20);
        iter.next();
        assert_eq!(iter.len(), 19);
    }

    #[test]
    fn test_bounds_ref_into_iter() {
        let bounds = CellBounds::new(CellCoord::new(0, 0), CellCoord::new(1, 1));
        assert_eq!((&bounds).into_iter().count(), 4);
        assert_eq!(bounds.cell_count(), 4);
    }

    #[test]
    fn test_bounds_iter_negative_range() {
        let bounds = CellBounds::new(CellCoord::new(-2, -1), CellCoord::new(0, 0));
        let cells: Vec<_> = bounds.iter().collect();
        assert_eq!(cells.len(), 6);
        assert_eq!(cells[0], CellCoord::new(-2, -1));
        assert_eq!(cells[5], CellCoord::new(0, 0));
    }
}
