use nalgebra::Point3;

use crate::{point::Point, tree::TreePosition};

/// Anything with a location in the survey CRS. The point index is built over this,
/// using only the planar (x, y) part of the position.
pub trait HasPosition {
    fn position(&self) -> &Point3<f64>;

    fn planar(&self) -> [f64; 2] {
        let p = self.position();
        [p.x, p.y]
    }
}

impl HasPosition for Point {
    fn position(&self) -> &Point3<f64> {
        &self.position
    }
}

impl HasPosition for TreePosition {
    fn position(&self) -> &Point3<f64> {
        &self.position
    }
}
