//! Dividing the screen into cells and placing a target in each.

use crate::config::{ConfigError, Placement};
use crate::position::Position;

/// The grid of target positions for one screen.
///
/// The screen, less `padding` pixels on every side, is cut into `cols` by
/// `rows` equal cells. Targets either sit in the middle of each cell, or on
/// every cell corner, which gives one more column and one more row of them.
/// Cells are numbered row by row from the top left.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Grid {
    cols: u32,
    rows: u32,
    placement: Placement,
    padding: u32,
    resolution: (u32, u32),
}

impl Grid {
    pub fn new(
        cols: u32,
        rows: u32,
        placement: Placement,
        padding: u32,
        resolution: (u32, u32),
    ) -> Result<Self, ConfigError> {
        if cols == 0 || rows == 0 {
            return Err(ConfigError::EmptyGrid { cols, rows });
        }
        let (w, h) = resolution;
        if padding.saturating_mul(2) >= w || padding.saturating_mul(2) >= h {
            return Err(ConfigError::PaddingTooLarge {
                padding,
                resolution,
            });
        }
        let area = (w - 2 * padding, h - 2 * padding);
        if cols > area.0 || rows > area.1 {
            return Err(ConfigError::GridTooDense { cols, rows, area });
        }

        Ok(Self {
            cols,
            rows,
            placement,
            padding,
            resolution,
        })
    }

    /// Number of targets per row.
    pub fn effective_cols(&self) -> u32 {
        match self.placement {
            Placement::Middle => self.cols,
            Placement::Corners => self.cols + 1,
        }
    }

    /// Number of targets per column.
    pub fn effective_rows(&self) -> u32 {
        match self.placement {
            Placement::Middle => self.rows,
            Placement::Corners => self.rows + 1,
        }
    }

    /// Total number of target positions.
    pub fn cell_count(&self) -> usize {
        self.effective_cols() as usize * self.effective_rows() as usize
    }

    /// `(col, row)` of the target with the given index.
    pub fn col_row(&self, index: usize) -> (u32, u32) {
        let cols = self.effective_cols() as usize;
        ((index % cols) as u32, (index / cols) as u32)
    }

    /// Pixel position of the target with the given index.
    pub fn target_position(&self, index: usize) -> Position {
        let (col, row) = self.col_row(index);
        let (w, h) = self.resolution;
        let cell_w = (w - 2 * self.padding) / self.cols;
        let cell_h = (h - 2 * self.padding) / self.rows;

        let (x, y) = match self.placement {
            Placement::Middle => (cell_w * col + cell_w / 2, cell_h * row + cell_h / 2),
            Placement::Corners => (cell_w * col, cell_h * row),
        };

        // corner targets on the far edges would land one past the last pixel
        Position::new(
            (self.padding + x).min(w - 1),
            (self.padding + y).min(h - 1),
        )
    }

    /// Every target position, in index order.
    pub fn positions(&self) -> impl Iterator<Item = Position> + '_ {
        (0..self.cell_count()).map(|i| self.target_position(i))
    }

    pub fn resolution(&self) -> (u32, u32) {
        self.resolution
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn middle_of_each_cell() {
        let grid = Grid::new(2, 2, Placement::Middle, 0, (1000, 800)).unwrap();
        assert_eq!(grid.cell_count(), 4);
        let positions: Vec<Position> = grid.positions().collect();
        assert_eq!(
            positions,
            vec![
                Position::new(250, 200),
                Position::new(750, 200),
                Position::new(250, 600),
                Position::new(750, 600),
            ]
        );
    }

    #[test]
    fn index_is_row_major() {
        let grid = Grid::new(5, 3, Placement::Middle, 0, (1920, 1080)).unwrap();
        assert_eq!(grid.col_row(0), (0, 0));
        assert_eq!(grid.col_row(4), (4, 0));
        assert_eq!(grid.col_row(5), (0, 1));
        assert_eq!(grid.col_row(14), (4, 2));
    }

    #[test]
    fn corners() {
        let grid = Grid::new(2, 1, Placement::Corners, 0, (1000, 800)).unwrap();
        assert_eq!(grid.cell_count(), 6);
        assert_eq!(grid.col_row(3), (0, 1));
        assert_eq!(grid.target_position(0), Position::new(0, 0));
        assert_eq!(grid.target_position(1), Position::new(500, 0));
        assert_eq!(grid.target_position(2), Position::new(999, 0));
        assert_eq!(grid.target_position(5), Position::new(999, 799));
    }

    #[test]
    fn padding_shrinks_the_grid() {
        let grid = Grid::new(1, 1, Placement::Corners, 100, (1000, 800)).unwrap();
        assert_eq!(grid.target_position(0), Position::new(100, 100));
        assert_eq!(grid.target_position(3), Position::new(900, 700));

        let grid = Grid::new(2, 1, Placement::Middle, 100, (1000, 800)).unwrap();
        assert_eq!(grid.target_position(0), Position::new(300, 400));
    }

    #[test]
    fn bad_grids() {
        assert!(matches!(
            Grid::new(0, 3, Placement::Middle, 0, (100, 100)),
            Err(ConfigError::EmptyGrid { cols: 0, rows: 3 })
        ));
        assert!(matches!(
            Grid::new(1, 1, Placement::Middle, 50, (100, 200)),
            Err(ConfigError::PaddingTooLarge { .. })
        ));
    }

    #[test]
    fn cells_must_be_at_least_one_unit_wide() {
        assert!(matches!(
            Grid::new(81, 3, Placement::Middle, 0, (80, 24)),
            Err(ConfigError::GridTooDense {
                cols: 81,
                rows: 3,
                area: (80, 24)
            })
        ));
        assert!(matches!(
            Grid::new(5, 21, Placement::Corners, 2, (80, 24)),
            Err(ConfigError::GridTooDense { area: (76, 20), .. })
        ));

        let grid = Grid::new(80, 24, Placement::Middle, 0, (80, 24)).unwrap();
        let first = grid.target_position(0);
        assert_ne!(grid.target_position(1), first);
        assert_ne!(grid.target_position(80), first);
    }
}
