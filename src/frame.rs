//! Quantize field positions into map cells and learning-grid cells.
//!
//! The field is tiled by square map cells. Each map cell is split into the
//! rows x cols learning grid: grid rows run along the x axis and grid columns
//! along the y axis. Intervals are half open on the low side, so a coordinate
//! exactly on a boundary belongs to the cell below it: with 50-wide map cells,
//! x = 50 is in map cell 0 and x = 50.001 in map cell 1.

use std::fmt;

use crate::config::FrameConfig;
use crate::geometry::Point;
use crate::grid::GridState;

/// Index of a coarse map cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MapCell {
    pub x: i64,
    pub y: i64,
}

impl fmt::Display for MapCell {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "[{}, {}]", self.x, self.y)
    }
}

/// Where a position falls: which map cell, and which learning-grid cell
/// inside it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LocalFrame {
    pub map_cell: MapCell,
    pub grid_cell: GridState,
}

#[derive(Debug, Clone)]
pub struct FrameMapper {
    map_cell_size: f64,
    rows: u8,
    cols: u8,
}

impl FrameMapper {
    pub fn new(config: &FrameConfig) -> FrameMapper {
        FrameMapper {
            map_cell_size: config.map_cell_size,
            rows: config.rows,
            cols: config.cols,
        }
    }

    pub fn rows(&self) -> u8 {
        self.rows
    }

    pub fn cols(&self) -> u8 {
        self.cols
    }

    pub fn locate(&self, p: Point) -> LocalFrame {
        let map_x = FrameMapper::bucket(p.x, self.map_cell_size);
        let map_y = FrameMapper::bucket(p.y, self.map_cell_size);
        let local_x = p.x - map_x as f64 * self.map_cell_size;
        let local_y = p.y - map_y as f64 * self.map_cell_size;
        let row = FrameMapper::bucket(local_x, self.map_cell_size / self.rows as f64);
        let col = FrameMapper::bucket(local_y, self.map_cell_size / self.cols as f64);
        LocalFrame {
            map_cell: MapCell { x: map_x, y: map_y },
            grid_cell: GridState {
                row: row.clamp(0, self.rows as i64 - 1) as u8,
                col: col.clamp(0, self.cols as i64 - 1) as u8,
            },
        }
    }

    /// True when both positions fall in the same map cell.
    pub fn same_frame(&self, a: Point, b: Point) -> bool {
        self.locate(a).map_cell == self.locate(b).map_cell
    }

    /// Index i such that v lies in (i * size, (i + 1) * size].
    fn bucket(v: f64, size: f64) -> i64 {
        (v / size).ceil() as i64 - 1
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    fn mapper() -> FrameMapper {
        FrameMapper::new(&FrameConfig::default())
    }

    #[test_case(10.0, 10.0, (0, 0), (0, 0); "Near origin")]
    #[test_case(130.2, 130.2, (2, 2), (2, 2); "Middle of a map cell")]
    #[test_case(151.4, 151.4, (3, 3), (0, 0); "Just past a boundary")]
    #[test_case(200.0, 200.0, (3, 3), (3, 3); "On the upper boundary")]
    #[test_case(112.5, 137.5, (2, 2), (0, 2); "On inner grid boundaries")]
    #[test_case(449.0, 5.0, (8, 0), (3, 0); "Rows follow x")]
    fn locate_position(x: f64, y: f64, map: (i64, i64), grid: (u8, u8)) {
        // Act
        let frame = mapper().locate(Point::new(x, y));
        // Assert
        assert_eq!(frame.map_cell, MapCell { x: map.0, y: map.1 });
        assert_eq!(frame.grid_cell, GridState::new(grid.0, grid.1));
    }

    #[test]
    fn locate_is_deterministic() {
        let m = mapper();
        let p = Point::new(321.7, 88.8);
        assert_eq!(m.locate(p), m.locate(p));
    }

    #[test]
    fn boundary_neighbours_are_adjacent_cells() {
        // Arrange
        let m = mapper();
        // Act
        let below = m.locate(Point::new(100.0, 20.0));
        let above = m.locate(Point::new(100.000_001, 20.0));
        // Assert
        assert_eq!(below.map_cell.x + 1, above.map_cell.x);
        assert_eq!(below.grid_cell.row, 3);
        assert_eq!(above.grid_cell.row, 0);
        assert!(!m.same_frame(Point::new(100.0, 20.0), Point::new(100.000_001, 20.0)));
    }

    #[test]
    fn grid_boundary_inside_map_cell() {
        let m = mapper();
        let below = m.locate(Point::new(62.5, 60.0));
        let above = m.locate(Point::new(62.6, 60.0));
        assert_eq!(below.map_cell, above.map_cell);
        assert_eq!(below.grid_cell.row, 0);
        assert_eq!(above.grid_cell.row, 1);
    }

    #[test]
    fn same_frame_within_map_cell() {
        let m = mapper();
        assert!(m.same_frame(Point::new(151.0, 160.0), Point::new(199.0, 200.0)));
        assert!(!m.same_frame(Point::new(149.0, 160.0), Point::new(151.0, 160.0)));
    }
}
