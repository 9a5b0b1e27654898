//! Utility functions for planar degree math used by filtering and clustering

use geo::Coord;

/// Straight-line distance between two coordinates, measured in degrees
///
/// This is deliberately planar (not geodesic): clusters are compared with each
/// other, never against real-world distances.
#[inline(always)]
pub fn degree_distance(a: Coord<f64>, b: Coord<f64>) -> f64 {
    let d_lat = b.y - a.y;
    let d_lng = b.x - a.x;
    (d_lat * d_lat + d_lng * d_lng).sqrt()
}

/// Integer cell index for a coordinate component, suitable as a hash key
///
/// `resolution` is the number of cells per degree. Values are floored, so
/// negative components land in the cell below zero rather than at zero.
#[inline(always)]
pub fn grid_index(value: f64, resolution: f64) -> i64 {
    (value * resolution).floor() as i64
}

/// Arithmetic mean of a set of coordinates, or `None` for an empty set
pub fn mean_coord(coords: impl IntoIterator<Item = Coord<f64>>) -> Option<Coord<f64>> {
    let mut sum = Coord { x: 0.0, y: 0.0 };
    let mut count = 0usize;
    for c in coords {
        sum.x += c.x;
        sum.y += c.y;
        count += 1;
    }
    if count == 0 {
        return None;
    }
    Some(Coord {
        x: sum.x / count as f64,
        y: sum.y / count as f64,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_degree_distance() {
        let a = Coord { x: 0.0, y: 0.0 };
        let b = Coord { x: 3.0, y: 4.0 };
        assert_eq!(degree_distance(a, b), 5.0);
        assert_eq!(degree_distance(b, a), 5.0);
        assert_eq!(degree_distance(a, a), 0.0);
    }

    #[test]
    fn test_grid_index() {
        assert_eq!(grid_index(39.9042, 10.0), 399);
        assert_eq!(grid_index(-0.15, 10.0), -2);
        assert_eq!(grid_index(-0.05, 10.0), -1);
        assert_eq!(grid_index(5.0, 1.0), 5);
    }

    #[test]
    fn test_grid_index_groups_nearby_values() {
        let res = 300.0;
        assert_eq!(grid_index(116.40001, res), grid_index(116.40002, res));
        assert_ne!(grid_index(116.40, res), grid_index(116.41, res));
    }

    #[test]
    fn test_mean_coord() {
        let coords = [Coord { x: 0.0, y: 0.0 }, Coord { x: 2.0, y: 4.0 }];
        assert_eq!(mean_coord(coords), Some(Coord { x: 1.0, y: 2.0 }));
        assert_eq!(mean_coord(std::iter::empty()), None);
    }
}
