//! Obstacle layouts read from CSV files with an `x,y` header.

use std::io;
use std::path::Path;

use crate::error::Result;
use crate::geometry::Point;

pub fn from_path(path: &Path) -> Result<Vec<Point>> {
    log::info!("Reading obstacles from {}", path.display());
    let reader = csv::ReaderBuilder::new().trim(csv::Trim::All).from_path(path)?;
    collect(reader)
}

pub fn from_reader<R: io::Read>(rdr: R) -> Result<Vec<Point>> {
    let reader = csv::ReaderBuilder::new().trim(csv::Trim::All).from_reader(rdr);
    collect(reader)
}

fn collect<R: io::Read>(mut reader: csv::Reader<R>) -> Result<Vec<Point>> {
    let mut obstacles = Vec::new();
    for record in reader.deserialize() {
        let point: Point = record?;
        obstacles.push(point);
    }
    log::debug!("Loaded {} obstacles", obstacles.len());
    Ok(obstacles)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ObavoidError;

    #[test]
    fn read_obstacles() {
        // Arrange
        let data = "x,y\n200,200\n 150.5 , 80\n";
        // Act
        let obstacles = from_reader(data.as_bytes()).unwrap();
        // Assert
        assert_eq!(obstacles, vec![Point::new(200.0, 200.0), Point::new(150.5, 80.0)]);
    }

    #[test]
    fn header_only_is_empty() {
        let obstacles = from_reader("x,y\n".as_bytes()).unwrap();
        assert!(obstacles.is_empty());
    }

    #[test]
    fn malformed_row_is_an_error() {
        let result = from_reader("x,y\n200,north\n".as_bytes());
        assert!(matches!(result, Err(ObavoidError::Scenario(_))));
    }

    #[test]
    fn missing_file_is_an_error() {
        let result = from_path(Path::new("no/such/obstacles.csv"));
        assert!(matches!(result, Err(ObavoidError::Scenario(_))));
    }
}
