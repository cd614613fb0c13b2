use crate::errors::CalError;
use crate::ipol::interpolate_linear;
use serde::{Deserialize, Serialize};

/// Piecewise linear mapping over a breakpoint table.
///
/// The table holds (input, output) pairs sorted ascending by input. Queries
/// inside the input range interpolate within the surrounding segment, queries
/// outside the range extrapolate along the nearest segment.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SegmentedTable {
    points: Vec<(f64, f64)>,
}

impl SegmentedTable {
    /// Build a table from (input, output) breakpoints.
    ///
    /// At least two breakpoints are required and the inputs must be strictly
    /// ascending.
    pub fn new(points: Vec<(f64, f64)>) -> Result<Self, CalError> {
        if points.len() < 2 {
            return Err(CalError::InvalidTable(format!(
                "At least 2 breakpoints are required, got [{}]",
                points.len()
            )));
        }
        for i in 1..points.len() {
            let (prev, _) = points[i - 1];
            let (cur, _) = points[i];
            if cur <= prev {
                return Err(CalError::InvalidTable(format!(
                    "Breakpoint inputs must be strictly ascending [{} >= {} at index {}]",
                    prev, cur, i
                )));
            }
        }
        Ok(Self { points })
    }

    pub fn breakpoints(&self) -> &[(f64, f64)] {
        &self.points
    }

    /// Map an input to an output by piecewise linear interpolation.
    pub fn value_at(&self, x: f64) -> f64 {
        let n = self.points.len();
        let (first_in, _) = self.points[0];
        let (last_in, _) = self.points[n - 1];
        if x < first_in {
            // extrapolate backward along the first segment
            let (x0, y0) = self.points[0];
            let (x1, y1) = self.points[1];
            return interpolate_linear(x, x0, x1, y0, y1);
        }
        if x > last_in {
            // extrapolate forward along the last segment
            let (x0, y0) = self.points[n - 2];
            let (x1, y1) = self.points[n - 1];
            return interpolate_linear(x, x0, x1, y0, y1);
        }
        for i in 1..n {
            let (x1, y1) = self.points[i];
            if x <= x1 {
                let (x0, y0) = self.points[i - 1];
                return interpolate_linear(x, x0, x1, y0, y1);
            }
        }
        // x == first_in and nothing else matched; cannot happen with a valid table
        self.points[0].1
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn build_two_point_table() -> SegmentedTable {
        SegmentedTable::new(vec![(0.0, 0.0), (10.0, 100.0)]).unwrap()
    }

    fn build_three_point_table() -> SegmentedTable {
        SegmentedTable::new(vec![(0.0, 0.0), (10.0, 100.0), (20.0, 150.0)]).unwrap()
    }

    #[test]
    fn test_interpolation_within_range() {
        let table = build_two_point_table();
        assert_eq!(table.value_at(5.0), 50.0);
        let table = build_three_point_table();
        assert_eq!(table.value_at(15.0), 125.0);
    }

    #[test]
    fn test_breakpoint_hit() {
        let table = build_three_point_table();
        assert_eq!(table.value_at(10.0), 100.0);
        assert_eq!(table.value_at(0.0), 0.0);
        assert_eq!(table.value_at(20.0), 150.0);
    }

    #[test]
    fn test_extrapolation_below_range() {
        let table = build_two_point_table();
        assert_eq!(table.value_at(-5.0), -50.0);
    }

    #[test]
    fn test_extrapolation_above_range() {
        let table = build_two_point_table();
        assert_eq!(table.value_at(15.0), 150.0);
        // slope of the last segment, not the first
        let table = build_three_point_table();
        assert_eq!(table.value_at(30.0), 200.0);
    }

    #[test]
    fn test_deterministic() {
        let table = build_three_point_table();
        let a = table.value_at(12.34);
        let b = table.value_at(12.34);
        assert_eq!(a.to_bits(), b.to_bits());
    }

    #[test]
    fn test_rejects_short_table() {
        assert!(SegmentedTable::new(vec![]).is_err());
        assert!(SegmentedTable::new(vec![(1.0, 2.0)]).is_err());
    }

    #[test]
    fn test_rejects_unsorted_table() {
        assert!(SegmentedTable::new(vec![(10.0, 0.0), (0.0, 100.0)]).is_err());
        assert!(SegmentedTable::new(vec![(0.0, 0.0), (0.0, 100.0)]).is_err());
        assert!(SegmentedTable::new(vec![(0.0, 0.0), (5.0, 1.0), (5.0, 2.0)]).is_err());
    }

    #[test]
    fn test_monotonic_outputs() {
        let table = SegmentedTable::new(vec![(0.0, 1.0), (5.0, 2.0), (10.0, 4.0)]).unwrap();
        let mut prev = table.value_at(-2.0);
        let mut x = -1.8;
        while x < 12.0 {
            let y = table.value_at(x);
            assert!(y >= prev);
            prev = y;
            x += 0.2;
        }
    }
}
