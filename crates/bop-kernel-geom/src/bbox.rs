//! Box filter run before every pairwise intersection.

use bop_kernel_math::{Point3, Vec3};

/// Axis-aligned box, empty until a point is added.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Aabb3 {
    /// Lower corner.
    pub min: Point3,
    /// Upper corner.
    pub max: Point3,
}

impl Aabb3 {
    /// Box between two corners.
    pub fn new(min: Point3, max: Point3) -> Self {
        Self { min, max }
    }

    /// Box containing nothing; every overlap test with it fails.
    pub fn empty() -> Self {
        Self {
            min: Point3::from(Vec3::repeat(f64::INFINITY)),
            max: Point3::from(Vec3::repeat(f64::NEG_INFINITY)),
        }
    }

    /// Smallest box around `points`.
    pub fn from_points<'a>(points: impl IntoIterator<Item = &'a Point3>) -> Self {
        points.into_iter().fold(Self::empty(), |mut b, p| {
            b.include_point(p);
            b
        })
    }

    /// True until a point has been added.
    pub fn is_empty(&self) -> bool {
        (0..3).any(|i| self.min[i] > self.max[i])
    }

    /// Grow to contain `p`.
    pub fn include_point(&mut self, p: &Point3) {
        self.min = self.min.inf(p);
        self.max = self.max.sup(p);
    }

    /// Closed-box overlap: boxes sharing only a face still overlap.
    pub fn overlaps(&self, other: &Aabb3) -> bool {
        !self.is_empty()
            && !other.is_empty()
            && (0..3).all(|i| self.min[i] <= other.max[i] && other.min[i] <= self.max[i])
    }

    /// Copy grown by `gap` on every side. An empty box stays empty.
    pub fn enlarged(&self, gap: f64) -> Self {
        if self.is_empty() {
            return *self;
        }
        let d = Vec3::repeat(gap);
        Self::new(self.min - d, self.max + d)
    }
}

impl Default for Aabb3 {
    fn default() -> Self {
        Self::empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cube(lo: f64, hi: f64) -> Aabb3 {
        Aabb3::new(Point3::new(lo, lo, lo), Point3::new(hi, hi, hi))
    }

    #[test]
    fn test_overlap_is_symmetric() {
        let a = cube(0.0, 2.0);
        let b = cube(1.0, 3.0);
        assert!(a.overlaps(&b) && b.overlaps(&a));
        assert!(!a.overlaps(&cube(5.0, 6.0)));
    }

    #[test]
    fn test_shared_face_overlaps() {
        let a = cube(0.0, 1.0);
        let b = Aabb3::new(Point3::new(1.0, 0.0, 0.0), Point3::new(2.0, 1.0, 1.0));
        assert!(a.overlaps(&b));
    }

    #[test]
    fn test_gap_closed_by_enlarging() {
        let a = cube(0.0, 1.0);
        let b = Aabb3::new(Point3::new(1.1, 0.0, 0.0), Point3::new(2.0, 1.0, 1.0));
        assert!(!a.overlaps(&b));
        assert!(a.enlarged(0.05).overlaps(&b.enlarged(0.05)));
    }

    #[test]
    fn test_empty_box_never_overlaps() {
        let e = Aabb3::default();
        assert!(e.is_empty());
        assert!(e.enlarged(1.0).is_empty());
        assert!(!e.overlaps(&cube(0.0, 1.0)));
    }

    #[test]
    fn test_from_points() {
        let pts = [Point3::new(1.0, -1.0, 0.0), Point3::new(3.0, 1.0, 2.0)];
        let b = Aabb3::from_points(&pts);
        assert_eq!(b.min, Point3::new(1.0, -1.0, 0.0));
        assert_eq!(b.max, Point3::new(3.0, 1.0, 2.0));
    }
}
