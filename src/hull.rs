use std::cmp::Ordering;

/// Twice the signed area of the triangle `o, a, b`. Positive when `b` lies to the left of `o -> a`.
pub fn cross(o: [f64; 2], a: [f64; 2], b: [f64; 2]) -> f64 {
    (a[0] - o[0]) * (b[1] - o[1]) - (a[1] - o[1]) * (b[0] - o[0])
}

/// Planar convex hull by monotone chain.
///
/// Returns indices into `points` of the hull vertices in counter-clockwise order,
/// starting from the lowest-x (then lowest-y) point. Points on hull edges and repeated
/// coordinates are dropped. Fewer than three distinct points or a collinear input has no
/// hull and yields `None`.
pub fn convex_hull(points: &[[f64; 2]]) -> Option<Vec<usize>> {
    let mut order: Vec<usize> = (0..points.len()).collect();
    order.sort_by(|&a, &b| {
        let (pa, pb) = (points[a], points[b]);
        pa[0]
            .partial_cmp(&pb[0])
            .unwrap_or(Ordering::Equal)
            .then(pa[1].partial_cmp(&pb[1]).unwrap_or(Ordering::Equal))
            .then(a.cmp(&b))
    });
    order.dedup_by(|a, b| points[*a] == points[*b]);
    if order.len() < 3 {
        return None;
    }

    let mut lower: Vec<usize> = Vec::with_capacity(order.len());
    for &i in order.iter() {
        while lower.len() >= 2
            && cross(
                points[lower[lower.len() - 2]],
                points[lower[lower.len() - 1]],
                points[i],
            ) <= 0.0
        {
            lower.pop();
        }
        lower.push(i);
    }

    let mut upper: Vec<usize> = Vec::with_capacity(order.len());
    for &i in order.iter().rev() {
        while upper.len() >= 2
            && cross(
                points[upper[upper.len() - 2]],
                points[upper[upper.len() - 1]],
                points[i],
            ) <= 0.0
        {
            upper.pop();
        }
        upper.push(i);
    }

    lower.pop();
    upper.pop();
    lower.extend(upper);

    if lower.len() < 3 {
        return None;
    }
    Some(lower)
}

/// Length of the closed ring through `ring`.
pub fn ring_perimeter(ring: &[[f64; 2]]) -> f64 {
    if ring.len() < 2 {
        return 0.0;
    }
    ring.iter()
        .zip(ring.iter().cycle().skip(1))
        .map(|(a, b)| ((b[0] - a[0]).powi(2) + (b[1] - a[1]).powi(2)).sqrt())
        .sum()
}

#[cfg(test)]
mod tests {
    use assert_approx_eq::assert_approx_eq;

    use super::*;

    #[test]
    fn square_with_interior_and_edge_points() {
        let points = [
            [0.5, 0.5],
            [0.0, 0.0],
            [1.0, 0.0],
            [0.5, 0.0],
            [1.0, 1.0],
            [0.0, 1.0],
            [1.0, 1.0],
        ];
        let hull = convex_hull(&points).unwrap();
        assert_eq!(hull, vec![1, 2, 4, 5]);
    }

    #[test]
    fn hull_is_counter_clockwise() {
        let points: Vec<[f64; 2]> = (0..12)
            .map(|i| {
                let a = i as f64 * std::f64::consts::TAU / 12.0;
                [3.0 * a.cos(), 2.0 * a.sin()]
            })
            .collect();
        let hull = convex_hull(&points).unwrap();
        assert_eq!(hull.len(), 12);
        let n = hull.len();
        for k in 0..n {
            let (a, b, c) = (
                points[hull[k]],
                points[hull[(k + 1) % n]],
                points[hull[(k + 2) % n]],
            );
            assert!(cross(a, b, c) > 0.0);
        }
    }

    #[test]
    fn degenerate_inputs_have_no_hull() {
        assert!(convex_hull(&[]).is_none());
        assert!(convex_hull(&[[0.0, 0.0], [1.0, 1.0]]).is_none());
        assert!(convex_hull(&[[0.0, 0.0], [0.0, 0.0], [0.0, 0.0]]).is_none());
        assert!(convex_hull(&[[0.0, 0.0], [1.0, 1.0], [2.0, 2.0], [3.0, 3.0]]).is_none());
    }

    #[test]
    fn perimeter_of_unit_square() {
        let ring = [[0.0, 0.0], [1.0, 0.0], [1.0, 1.0], [0.0, 1.0]];
        assert_approx_eq!(ring_perimeter(&ring), 4.0);
        assert_eq!(ring_perimeter(&[[1.0, 1.0]]), 0.0);
    }
}
