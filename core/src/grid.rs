//! Bounds-checked two-dimensional storage shared by the level, the world and
//! the pathfinder.

use serde::{Deserialize, Serialize};

use crate::CellCoord;

/// Dimensions of a rectangular grid measured in whole cells.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct GridSize {
    rows: u32,
    columns: u32,
}

impl GridSize {
    /// Creates a new size descriptor.
    #[must_use]
    pub const fn new(rows: u32, columns: u32) -> Self {
        Self { rows, columns }
    }

    /// Number of rows in the grid.
    #[must_use]
    pub const fn rows(&self) -> u32 {
        self.rows
    }

    /// Number of columns in the grid.
    #[must_use]
    pub const fn columns(&self) -> u32 {
        self.columns
    }

    /// Total number of cells, saturating to zero when it does not fit `usize`.
    #[must_use]
    pub fn cell_count(&self) -> usize {
        let count = u64::from(self.rows) * u64::from(self.columns);
        usize::try_from(count).unwrap_or(0)
    }

    /// Reports whether the cell lies inside the grid.
    #[must_use]
    pub const fn contains(&self, cell: CellCoord) -> bool {
        cell.row() < self.rows && cell.column() < self.columns
    }

    /// Packs a cell into its row-major index.
    #[must_use]
    pub fn index(&self, cell: CellCoord) -> Option<usize> {
        if !self.contains(cell) {
            return None;
        }

        let row = usize::try_from(cell.row()).ok()?;
        let column = usize::try_from(cell.column()).ok()?;
        let width = usize::try_from(self.columns).ok()?;
        row.checked_mul(width)?.checked_add(column)
    }

    /// Unpacks a row-major index back into a cell coordinate.
    #[must_use]
    pub fn cell_at(&self, index: usize) -> Option<CellCoord> {
        if index >= self.cell_count() || self.columns == 0 {
            return None;
        }

        let width = usize::try_from(self.columns).ok()?;
        let row = u32::try_from(index / width).ok()?;
        let column = u32::try_from(index % width).ok()?;
        Some(CellCoord::new(row, column))
    }
}

/// Dense row-major grid with checked `get`/`set` access.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Grid<T> {
    size: GridSize,
    cells: Vec<T>,
}

impl<T: Clone> Grid<T> {
    /// Creates a grid where every cell holds a copy of `value`.
    #[must_use]
    pub fn filled(size: GridSize, value: T) -> Self {
        Self {
            size,
            cells: vec![value; size.cell_count()],
        }
    }
}

impl<T> Grid<T> {
    /// Wraps row-major cell data, returning `None` when the length does not
    /// match the provided dimensions.
    #[must_use]
    pub fn from_cells(size: GridSize, cells: Vec<T>) -> Option<Self> {
        if cells.len() != size.cell_count() {
            return None;
        }
        Some(Self { size, cells })
    }

    /// Dimensions of the grid.
    #[must_use]
    pub const fn size(&self) -> GridSize {
        self.size
    }

    /// Reports whether the cell lies inside the grid.
    #[must_use]
    pub const fn contains(&self, cell: CellCoord) -> bool {
        self.size.contains(cell)
    }

    /// Value stored at the cell, if it lies inside the grid.
    #[must_use]
    pub fn get(&self, cell: CellCoord) -> Option<&T> {
        self.size
            .index(cell)
            .and_then(|index| self.cells.get(index))
    }

    /// Mutable access to the value stored at the cell.
    pub fn get_mut(&mut self, cell: CellCoord) -> Option<&mut T> {
        let index = self.size.index(cell)?;
        self.cells.get_mut(index)
    }

    /// Replaces the value at the cell, returning the previous one.
    ///
    /// Returns `None` and leaves the grid untouched when the cell lies
    /// outside the grid.
    pub fn set(&mut self, cell: CellCoord, value: T) -> Option<T> {
        let slot = self.get_mut(cell)?;
        Some(std::mem::replace(slot, value))
    }

    /// Iterates every cell together with its coordinate in row-major order.
    pub fn iter(&self) -> impl Iterator<Item = (CellCoord, &T)> + '_ {
        self.cells
            .iter()
            .enumerate()
            .filter_map(|(index, value)| self.size.cell_at(index).map(|cell| (cell, value)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn index_round_trips_through_cell_at() {
        let size = GridSize::new(3, 4);
        let cell = CellCoord::new(2, 1);
        let index = size.index(cell).expect("cell inside grid");
        assert_eq!(index, 9);
        assert_eq!(size.cell_at(index), Some(cell));
    }

    #[test]
    fn out_of_bounds_access_is_rejected() {
        let mut grid = Grid::filled(GridSize::new(2, 2), 0_u8);
        assert!(grid.get(CellCoord::new(2, 0)).is_none());
        assert!(grid.set(CellCoord::new(0, 2), 7).is_none());
        assert!(grid.iter().all(|(_, value)| *value == 0));
    }

    #[test]
    fn set_returns_previous_value() {
        let mut grid = Grid::filled(GridSize::new(2, 3), 'a');
        assert_eq!(grid.set(CellCoord::new(1, 2), 'b'), Some('a'));
        assert_eq!(grid.get(CellCoord::new(1, 2)), Some(&'b'));
    }

    #[test]
    fn from_cells_requires_matching_length() {
        assert!(Grid::from_cells(GridSize::new(2, 2), vec![0; 3]).is_none());
        assert!(Grid::from_cells(GridSize::new(2, 2), vec![0; 4]).is_some());
    }
}
