//! Snapping fractal-space points to pixels of a grid.

use crate::Viewport;

/// Fractal-space coordinate of the center of cell `index` along one axis.
fn cell_center(index: i64, size: u32, begin: f64, end: f64) -> f64 {
    begin + (index as f64 + 0.5) / size as f64 * (end - begin)
}

/// Index of the cell whose center is closest to `value` along one axis.
///
/// Bisects the index range by comparing against cell centers instead of
/// rounding, so the choice between two adjacent centers is made on actual
/// distance. Equal distances resolve to the lower index. Values outside
/// `[begin, end]` land on the nearest edge cell.
pub fn find_best_index(size: u32, begin: f64, end: f64, value: f64) -> u32 {
    if size == 0 {
        return 0;
    }

    let mut lower: i64 = 0;
    let mut upper: i64 = size as i64 - 1;

    while lower < upper - 1 {
        let middle = (lower + upper) / 2;
        if value <= cell_center(middle, size, begin, end) {
            upper = middle;
        } else {
            lower = middle;
        }
    }

    let distance_lower = (cell_center(lower, size, begin, end) - value).abs();
    let distance_upper = (cell_center(upper, size, begin, end) - value).abs();

    if distance_lower <= distance_upper {
        lower as u32
    } else {
        upper as u32
    }
}

/// Pixel of a `size` grid over `viewport` whose center is closest to `point`.
pub fn find_best_pixel(size: (u32, u32), viewport: &Viewport, point: (f64, f64)) -> (u32, u32) {
    (
        find_best_index(size.0, viewport.left, viewport.right, point.0),
        find_best_index(size.1, viewport.bottom, viewport.top, point.1),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn snaps_near_corners_of_100_grid() {
        let vp = Viewport::new(0.0, 1.0, 0.0, 1.0);
        assert_eq!(find_best_pixel((100, 100), &vp, (0.005, 0.005)), (0, 0));
        assert_eq!(find_best_pixel((100, 100), &vp, (0.995, 0.995)), (99, 99));
    }

    #[test]
    fn boundary_ties_prefer_lower_index() {
        // Dyadic grid so the boundary is exactly equidistant from both centers.
        assert_eq!(find_best_index(4, 0.0, 1.0, 0.25), 0);
        assert_eq!(find_best_index(4, 0.0, 1.0, 0.5), 1);
        assert_eq!(find_best_index(4, 0.0, 1.0, 0.75), 2);
    }

    #[test]
    fn just_past_boundary_picks_upper() {
        assert_eq!(find_best_index(4, 0.0, 1.0, 0.2501), 1);
        assert_eq!(find_best_index(100, 0.0, 1.0, 0.0101), 1);
    }

    #[test]
    fn outside_values_clamp_to_edges() {
        assert_eq!(find_best_index(10, 0.0, 1.0, -5.0), 0);
        assert_eq!(find_best_index(10, 0.0, 1.0, 5.0), 9);
    }

    #[test]
    fn single_cell_and_two_cell_grids() {
        assert_eq!(find_best_index(1, 0.0, 1.0, 0.9), 0);
        assert_eq!(find_best_index(2, 0.0, 1.0, 0.2), 0);
        assert_eq!(find_best_index(2, 0.0, 1.0, 0.8), 1);
    }

    #[test]
    fn agrees_with_nearest_center_search() {
        let vp = Viewport::new(-2.2, 2.7, 0.0, 10.0);
        let size = (37, 53);
        for i in 0..200 {
            let p = (-2.2 + 4.9 * (i as f64 * 0.618_034).fract(), 10.0 * (i as f64 * 0.414_214).fract());
            let (bx, by) = find_best_pixel(size, &vp, p);
            let brute_x = (0..size.0)
                .min_by(|&a, &b| {
                    let da = (vp.pixel_center(a, 0, size).0 - p.0).abs();
                    let db = (vp.pixel_center(b, 0, size).0 - p.0).abs();
                    da.partial_cmp(&db).unwrap()
                })
                .unwrap();
            let brute_y = (0..size.1)
                .min_by(|&a, &b| {
                    let da = (vp.pixel_center(0, a, size).1 - p.1).abs();
                    let db = (vp.pixel_center(0, b, size).1 - p.1).abs();
                    da.partial_cmp(&db).unwrap()
                })
                .unwrap();
            assert_eq!((bx, by), (brute_x, brute_y), "point {p:?}");
        }
    }
}
