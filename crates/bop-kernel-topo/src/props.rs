//! Mass properties of polyhedral shapes.

use bop_kernel_math::Vec3;

use crate::{Orientation, Shape, ShapeKind};

fn is_boundary(orientation: Orientation) -> bool {
    matches!(orientation, Orientation::Forward | Orientation::Reversed)
}

/// Vector area of a face with straight edges, following its orientation.
///
/// Internal and external edges do not bound the face and are skipped.
pub fn face_area_vector(face: &Shape) -> Vec3 {
    let mut sum = Vec3::zeros();
    for edge in face.explore(ShapeKind::Edge) {
        if !is_boundary(edge.orientation()) {
            continue;
        }
        let a = edge.start_vertex().and_then(|v| v.point());
        let b = edge.end_vertex().and_then(|v| v.point());
        if let (Some(a), Some(b)) = (a, b) {
            sum += a.coords.cross(&b.coords);
        }
    }
    sum * 0.5
}

/// Unsigned area of a planar face.
pub fn face_area(face: &Shape) -> f64 {
    let forward = face.oriented(Orientation::Forward);
    match forward.face_normal() {
        Some(n) => face_area_vector(&forward).dot(&n).abs(),
        None => 0.0,
    }
}

/// Signed volume enclosed by oriented faces (divergence theorem).
///
/// Positive when the faces point outward. Internal and external faces
/// are skipped.
pub fn signed_volume(faces: impl IntoIterator<Item = Shape>) -> f64 {
    let mut sum = 0.0;
    for face in faces {
        if !is_boundary(face.orientation()) {
            continue;
        }
        let Some(p) = face
            .sub_shapes(ShapeKind::Vertex)
            .first()
            .and_then(|v| v.point())
        else {
            continue;
        };
        sum += p.coords.dot(&face_area_vector(&face));
    }
    sum / 3.0
}

/// Total volume of the solids in a shape.
pub fn volume(shape: &Shape) -> f64 {
    shape
        .sub_shapes(ShapeKind::Solid)
        .iter()
        .map(|solid| signed_volume(solid.explore(ShapeKind::Face)))
        .sum()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::make_box;
    use approx::assert_relative_eq;
    use bop_kernel_math::Point3;

    #[test]
    fn test_unit_box_volume() {
        let b = make_box(Point3::origin(), 1.0, 1.0, 1.0);
        assert_relative_eq!(volume(&b), 1.0, epsilon = 1e-12);
    }

    #[test]
    fn test_offset_box_volume() {
        let b = make_box(Point3::new(-3.0, 4.0, 2.0), 1.0, 2.0, 3.0);
        assert_relative_eq!(volume(&b), 6.0, epsilon = 1e-9);
    }

    #[test]
    fn test_reversed_faces_give_negative_volume() {
        let b = make_box(Point3::origin(), 2.0, 2.0, 2.0);
        let faces = b.explore(ShapeKind::Face).into_iter().map(|f| f.reversed());
        assert_relative_eq!(signed_volume(faces), -8.0, epsilon = 1e-9);
    }

    #[test]
    fn test_face_area() {
        let b = make_box(Point3::origin(), 1.0, 2.0, 3.0);
        let mut areas: Vec<f64> = b.sub_shapes(ShapeKind::Face).iter().map(face_area).collect();
        areas.sort_by(|a, b| a.total_cmp(b));
        assert_relative_eq!(areas[0], 2.0, epsilon = 1e-12);
        assert_relative_eq!(areas[5], 6.0, epsilon = 1e-12);
    }
}
