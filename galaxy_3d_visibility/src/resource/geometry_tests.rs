use glam::{Mat4, Vec3};
use super::*;
use crate::error::Error;

fn quad(id: u32) -> Geometry {
    Geometry::from_desc(GeometryDesc {
        id: GeometryId(id),
        positions: vec![
            Vec3::new(-1.0, -1.0, 0.0),
            Vec3::new(1.0, -1.0, 0.0),
            Vec3::new(1.0, 1.0, 0.0),
            Vec3::new(-1.0, 1.0, 0.0),
        ],
        indices: vec![0, 1, 2, 0, 2, 3],
        lod_distance: 0.0,
    })
    .unwrap()
}

#[test]
fn test_geometry_bounds_and_triangles() {
    let geometry = quad(3);
    assert_eq!(geometry.id(), GeometryId(3));
    assert!(geometry.is_indexed());
    assert_eq!(geometry.num_triangles(), 2);
    assert_eq!(geometry.bounding_box().max, Vec3::new(1.0, 1.0, 0.0));
    let triangles: Vec<_> = geometry.triangles().collect();
    assert_eq!(triangles[1][2], Vec3::new(-1.0, 1.0, 0.0));
}

#[test]
fn test_geometry_rejects_bad_indices() {
    let desc = GeometryDesc {
        positions: vec![Vec3::ZERO; 3],
        indices: vec![0, 1, 5],
        ..Default::default()
    };
    assert!(matches!(Geometry::from_desc(desc), Err(Error::InvalidResource(_))));

    let desc = GeometryDesc { positions: vec![Vec3::ZERO; 4], ..Default::default() };
    assert!(Geometry::from_desc(desc).is_err());
}

#[test]
fn test_geometry_ray_hit_with_transform() {
    let geometry = quad(0);
    let transform = Mat4::from_scale_rotation_translation(
        Vec3::splat(2.0),
        glam::Quat::IDENTITY,
        Vec3::new(0.0, 0.0, -10.0),
    );

    let hit = geometry.hit_distance(&Ray::new(Vec3::new(1.5, 0.0, 0.0), Vec3::NEG_Z), &transform);
    let (distance, normal) = hit.unwrap();
    assert!((distance - 10.0).abs() < 1e-4);
    assert!((normal.z.abs() - 1.0).abs() < 1e-4);

    assert!(geometry.hit_distance(&Ray::new(Vec3::new(3.0, 0.0, 0.0), Vec3::NEG_Z), &transform).is_none());
}
