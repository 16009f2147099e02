//! Fixed cell grid storage.
//!
//! Crate-private on purpose: the cell sets and the identity map must only
//! change together, so the grid is reachable solely through
//! [`SpatialIndex`](crate::SpatialIndex).

use std::collections::HashSet;
use std::hash::Hash;

use nalgebra::Point2;

use crate::cell::CellCoord;

/// A dense `rows x cols` grid of per-cell item sets.
///
/// Cells are stored row-major in a single flat `Vec`, pre-populated as empty
/// at construction; the shape never changes afterwards. Coordinate-to-cell
/// arithmetic lives here so that insertion and query range computation share
/// one division policy (Euclidean floor).
#[derive(Debug, Clone)]
pub(crate) struct CellGrid<T> {
    cell_w: i64,
    cell_h: i64,
    origin: Point2<i64>,
    cols: usize,
    rows: usize,
    cells: Vec<HashSet<T>>,
}

impl<T> CellGrid<T> {
    /// Creates a grid of `rows x cols` empty cells.
    ///
    /// Shape and cell edges are validated by the index constructors; this
    /// expects positive edges and non-zero shape.
    pub(crate) fn new(cell_w: i64, cell_h: i64, rows: usize, cols: usize) -> Self {
        let mut cells = Vec::new();
        cells.resize_with(rows * cols, HashSet::new);
        Self {
            cell_w,
            cell_h,
            origin: Point2::origin(),
            cols,
            rows,
            cells,
        }
    }

    pub(crate) const fn rows(&self) -> usize {
        self.rows
    }

    pub(crate) const fn cols(&self) -> usize {
        self.cols
    }

    pub(crate) const fn cell_width(&self) -> i64 {
        self.cell_w
    }

    pub(crate) const fn cell_height(&self) -> i64 {
        self.cell_h
    }

    /// Resolves the cell address owning a position.
    ///
    /// Euclidean division floors toward negative infinity, so positions left
    /// of or above the origin resolve to negative addresses instead of
    /// aliasing into column/row 0.
    pub(crate) fn cell_of(&self, position: Point2<i64>) -> CellCoord {
        CellCoord::new(
            (position.x - self.origin.x).div_euclid(self.cell_w),
            (position.y - self.origin.y).div_euclid(self.cell_h),
        )
    }

    /// Column of the cell owning `position.x + offset`.
    ///
    /// Offsets are real-valued (query radii); the floor matches
    /// [`Self::cell_of`] for integer offsets.
    #[allow(clippy::cast_possible_truncation, clippy::cast_precision_loss)]
    pub(crate) fn probe_col(&self, position: Point2<i64>, offset: f64) -> i64 {
        // Truncation is intentional: a float->int saturating cast of the
        // floored quotient. Saturation only matters for absurd radii, which
        // the query-side clamp pulls back to the grid edge anyway.
        let relative = (position.x - self.origin.x) as f64 + offset;
        (relative / self.cell_w as f64).floor() as i64
    }

    /// Row of the cell owning `position.y + offset`.
    #[allow(clippy::cast_possible_truncation, clippy::cast_precision_loss)]
    pub(crate) fn probe_row(&self, position: Point2<i64>, offset: f64) -> i64 {
        let relative = (position.y - self.origin.y) as f64 + offset;
        (relative / self.cell_h as f64).floor() as i64
    }

    /// Whether a cell address lies inside the allocated grid.
    pub(crate) fn in_bounds(&self, cell: CellCoord) -> bool {
        let col_ok = usize::try_from(cell.col).is_ok_and(|col| col < self.cols);
        let row_ok = usize::try_from(cell.row).is_ok_and(|row| row < self.rows);
        col_ok && row_ok
    }

    /// The address of the bottom-right cell.
    #[allow(clippy::cast_possible_wrap)]
    pub(crate) const fn last_cell(&self) -> CellCoord {
        // The shape originates from validated positive i64 values, so the
        // casts cannot wrap.
        CellCoord::new(self.cols as i64 - 1, self.rows as i64 - 1)
    }

    fn slot(&self, cell: CellCoord) -> Option<usize> {
        let col = usize::try_from(cell.col).ok().filter(|&col| col < self.cols)?;
        let row = usize::try_from(cell.row).ok().filter(|&row| row < self.rows)?;
        Some(row * self.cols + col)
    }

    #[allow(clippy::cast_possible_wrap)]
    fn coord_of_slot(&self, slot: usize) -> CellCoord {
        CellCoord::new((slot % self.cols) as i64, (slot / self.cols) as i64)
    }

    /// The member set of a cell, or `None` for out-of-grid addresses.
    pub(crate) fn cell(&self, cell: CellCoord) -> Option<&HashSet<T>> {
        self.cells.get(self.slot(cell)?)
    }

    /// Mutable member set of a cell, or `None` for out-of-grid addresses.
    pub(crate) fn cell_mut(&mut self, cell: CellCoord) -> Option<&mut HashSet<T>> {
        let slot = self.slot(cell)?;
        self.cells.get_mut(slot)
    }

    /// Iterates every cell with its address, row-major.
    pub(crate) fn iter_cells(&self) -> impl Iterator<Item = (CellCoord, &HashSet<T>)> {
        self.cells
            .iter()
            .enumerate()
            .map(|(slot, members)| (self.coord_of_slot(slot), members))
    }
}

impl<T: Eq + Hash> CellGrid<T> {
    /// Total membership across all cells.
    pub(crate) fn member_count(&self) -> usize {
        self.cells.iter().map(HashSet::len).sum()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn grid() -> CellGrid<u32> {
        CellGrid::new(100, 100, 12, 12)
    }

    #[test]
    fn test_cell_of_floor() {
        let grid = grid();
        assert_eq!(grid.cell_of(Point2::new(0, 0)), CellCoord::new(0, 0));
        assert_eq!(grid.cell_of(Point2::new(99, 99)), CellCoord::new(0, 0));
        assert_eq!(grid.cell_of(Point2::new(100, 99)), CellCoord::new(1, 0));
        assert_eq!(grid.cell_of(Point2::new(1000, 1001)), CellCoord::new(10, 10));
    }

    #[test]
    fn test_cell_of_negative_positions() {
        // Floor division: (-1, -1) belongs to (-1, -1), not (0, 0).
        let grid = grid();
        assert_eq!(grid.cell_of(Point2::new(-1, -1)), CellCoord::new(-1, -1));
        assert_eq!(grid.cell_of(Point2::new(-100, -101)), CellCoord::new(-1, -2));
    }

    #[test]
    fn test_probe_matches_cell_of_for_integer_offsets() {
        let grid = grid();
        let position = Point2::new(250, 430);
        for offset in [-300_i64, -51, -1, 0, 1, 49, 200] {
            let shifted = Point2::new(position.x + offset, position.y + offset);
            #[allow(clippy::cast_precision_loss)]
            let offset_f = offset as f64;
            assert_eq!(grid.probe_col(position, offset_f), grid.cell_of(shifted).col);
            assert_eq!(grid.probe_row(position, offset_f), grid.cell_of(shifted).row);
        }
    }

    #[test]
    fn test_probe_fractional_offsets() {
        let grid = grid();
        let position = Point2::new(100, 100);
        // 100 - 0.5 = 99.5 still floors into column 0.
        assert_eq!(grid.probe_col(position, -0.5), 0);
        assert_eq!(grid.probe_col(position, 0.5), 1);
    }

    #[test]
    fn test_probe_huge_offset_saturates() {
        let grid = grid();
        let col = grid.probe_col(Point2::new(0, 0), 1e30);
        assert_eq!(col, i64::MAX);
    }

    #[test]
    fn test_in_bounds() {
        let grid = grid();
        assert!(grid.in_bounds(CellCoord::new(0, 0)));
        assert!(grid.in_bounds(CellCoord::new(11, 11)));
        assert!(!grid.in_bounds(CellCoord::new(12, 0)));
        assert!(!grid.in_bounds(CellCoord::new(0, 12)));
        assert!(!grid.in_bounds(CellCoord::new(-1, 0)));
    }

    #[test]
    fn test_last_cell() {
        assert_eq!(grid().last_cell(), CellCoord::new(11, 11));
    }

    #[test]
    fn test_cells_pre_populated_empty() {
        let grid = grid();
        assert_eq!(grid.iter_cells().count(), 144);
        assert!(grid.iter_cells().all(|(_, members)| members.is_empty()));
        assert_eq!(grid.member_count(), 0);
    }

    #[test]
    fn test_cell_accessors_out_of_grid() {
        let mut grid = grid();
        assert!(grid.cell(CellCoord::new(12, 0)).is_none());
        assert!(grid.cell_mut(CellCoord::new(0, -1)).is_none());
    }

    #[test]
    fn test_membership_roundtrip() {
        let mut grid = grid();
        let cell = grid.cell_of(Point2::new(250, 30));
        grid.cell_mut(cell).unwrap().insert(7);
        assert!(grid.cell(cell).unwrap().contains(&7));
        assert_eq!(grid.member_count(), 1);
    }

    #[test]
    fn test_slot_layout_row_major() {
        let grid = grid();
        for (slot, (cell, _)) in grid.iter_cells().enumerate() {
            assert_eq!(grid.slot(cell), Some(slot));
        }
    }
}
