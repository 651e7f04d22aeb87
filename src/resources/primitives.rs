//! Procedural mesh data for demos and tests.

use crate::data_structures::model::{MeshData, ModelVertex};

/// An axis-aligned cube centred on the origin with the given edge length.
///
/// Corners are shared between faces and carry averaged (smooth) normals.
/// The shadow-volume extrusion classifies vertices against the light with
/// these normals, so faces crossing the silhouette stretch into the volume's
/// side walls instead of tearing open.
pub fn cube(name: &str, size: f32) -> MeshData {
    let h = size / 2.0;
    let n = 1.0 / 3.0f32.sqrt();

    let corner = |x: f32, y: f32, z: f32, u: f32, v: f32| ModelVertex {
        position: [x * h, y * h, z * h],
        tex_coords: [u, v],
        normal: [x * n, y * n, z * n],
    };

    let vertices = vec![
        corner(-1.0, -1.0, 1.0, 0.0, 0.0),
        corner(1.0, -1.0, 1.0, 1.0, 0.0),
        corner(1.0, 1.0, 1.0, 1.0, 1.0),
        corner(-1.0, 1.0, 1.0, 0.0, 1.0),
        corner(-1.0, -1.0, -1.0, 1.0, 0.0),
        corner(1.0, -1.0, -1.0, 0.0, 0.0),
        corner(1.0, 1.0, -1.0, 0.0, 1.0),
        corner(-1.0, 1.0, -1.0, 1.0, 1.0),
    ];

    // Two triangles per face, wound outward.
    let indices = vec![
        0, 1, 2, 0, 2, 3, // +z
        5, 4, 7, 5, 7, 6, // -z
        1, 5, 6, 1, 6, 2, // +x
        4, 0, 3, 4, 3, 7, // -x
        3, 2, 6, 3, 6, 7, // +y
        4, 5, 1, 4, 1, 0, // -y
    ];

    MeshData {
        name: name.to_string(),
        vertices,
        indices,
    }
}
