//! Camera types and view/projection math.
//!
//! A [`Camera`] controls viewing of a scene. Just like a real camera it has a
//! position and orientation relative to the scene as well as a field of view.
//! Unlike a real camera it also has near (and optionally far) clipping planes.
//! In GPU terms this type encapsulates a view matrix and a projection matrix:
//! it controls how objects in 3D space get mapped to pixels in the 2D
//! viewport.

use cgmath::{Matrix3, Matrix4, SquareMatrix, Vector3};

use crate::{
    data_structures::{model::DrawMesh, scene_graph::DrawCmd},
    scene::Scene,
    viewport::TransformArena,
};

/// Pitch is clamped to +/- 80 degrees so the view can't turn upside down.
pub const MAX_PITCH: f32 = std::f32::consts::PI * 80.0 / 180.0;

const TAU: f32 = std::f32::consts::TAU;

/// The projection math below produces clip-space depth in -1..1, while wgpu
/// expects 0..1. Multiplying on the left remaps z' = 0.5 * z + 0.5 * w.
pub const OPENGL_TO_WGPU_MATRIX: Matrix4<f32> = Matrix4::new(
    1.0, 0.0, 0.0, 0.0, //
    0.0, 1.0, 0.0, 0.0, //
    0.0, 0.0, 0.5, 0.0, //
    0.0, 0.0, 0.5, 1.0,
);

#[derive(Debug, Clone)]
pub struct Camera {
    position: Vector3<f32>,
    yaw: f32,
    pitch: f32,
    view: Matrix4<f32>,
    projection: Matrix4<f32>,
}

impl Camera {
    /// A camera at the origin looking straight ahead, with a default infinite
    /// perspective of 90 degrees in both directions. The projection should
    /// usually be overridden, e.g. by [`crate::viewport::Viewport::on_size`].
    pub fn new() -> Self {
        let mut camera = Self {
            position: Vector3::new(0.0, 0.0, 0.0),
            yaw: 0.0,
            pitch: 0.0,
            view: Matrix4::identity(),
            projection: Matrix4::identity(),
        };
        camera.construct_view_matrix();
        camera.set_infinite_perspective_projection(
            std::f32::consts::FRAC_PI_2,
            std::f32::consts::FRAC_PI_2,
            0.1,
        );
        camera
    }

    /// Use normal perspective with the given horizontal field of view,
    /// vertical field of view, near clip distance and far clip distance.
    pub fn set_perspective_projection(
        &mut self,
        horiz_fov: f32,
        vert_fov: f32,
        z_near: f32,
        z_far: f32,
    ) {
        self.set_perspective_projection_common(horiz_fov, vert_fov, z_near, z_far / (z_far - z_near));
    }

    /// Use infinite perspective with the given horizontal field of view,
    /// vertical field of view and near clip distance. No far clip distance is
    /// needed as geometry can project to infinity. This projection is required
    /// when rendering shadow volumes whose extrusion recedes to infinity.
    pub fn set_infinite_perspective_projection(
        &mut self,
        horiz_fov: f32,
        vert_fov: f32,
        z_near: f32,
    ) {
        // The (2, 2) component is usually z_far / (z_far - z_near). In the
        // limit as z_far goes to infinity this goes to 1 (z_near becomes
        // negligible).
        self.set_perspective_projection_common(horiz_fov, vert_fov, z_near, 1.0);
    }

    fn set_perspective_projection_common(
        &mut self,
        horiz_fov: f32,
        vert_fov: f32,
        z_near: f32,
        matrix_value_22: f32,
    ) {
        // Standard perspective projection, except for how the third row is
        // derived so that the same formula covers the infinite case. See Eric
        // Lengyel's "The Mechanics of Robust Stencil Shadows".
        let mut projection = Matrix4::identity();

        // cgmath matrices index as [column][row].
        projection[0][0] = 1.0 / (horiz_fov / 2.0).tan();
        projection[1][1] = 1.0 / (vert_fov / 2.0).tan();

        projection[2][2] = matrix_value_22;
        projection[3][2] = -(1.0 + matrix_value_22) * z_near;

        projection[2][3] = 1.0;
        projection[3][3] = 0.0;

        self.projection = projection;
    }

    /// Moves the camera by the specified delta, e.g. in response to WASD keys.
    pub fn move_by(&mut self, translation: Vector3<f32>) {
        self.position += translation;
        self.construct_view_matrix();
    }

    /// Rotate the camera by the specified yaw and pitch angles in radians
    /// (mouse-look). Yaw wraps into 0..2pi, which maintains precision without
    /// loss of generality; pitch is clamped to [`MAX_PITCH`].
    pub fn look(&mut self, yaw: f32, pitch: f32) {
        self.yaw = (self.yaw + yaw).rem_euclid(TAU);
        self.pitch = (self.pitch + pitch).clamp(-MAX_PITCH, MAX_PITCH);
        self.construct_view_matrix();
    }

    /// Reconstructs the view matrix from the current position and yaw/pitch.
    /// Called by every function that changes them.
    fn construct_view_matrix(&mut self) {
        let (sin_yaw, cos_yaw) = self.yaw.sin_cos();
        let (sin_pitch, cos_pitch) = self.pitch.sin_cos();

        // Yaw about the vertical axis, then pitch about the local horizontal
        // axis. Written as cgmath columns, so each Vector3 below is one
        // *column* of the rotation.
        let rotation = Matrix3::from_cols(
            Vector3::new(cos_yaw, -sin_pitch * sin_yaw, cos_pitch * sin_yaw),
            Vector3::new(0.0, cos_pitch, sin_pitch),
            Vector3::new(-sin_yaw, -sin_pitch * cos_yaw, cos_pitch * cos_yaw),
        );
        let translation = rotation * -self.position;

        self.view = Matrix4::from_cols(
            rotation.x.extend(0.0),
            rotation.y.extend(0.0),
            rotation.z.extend(0.0),
            translation.extend(1.0),
        );
    }

    pub fn position(&self) -> Vector3<f32> {
        self.position
    }

    pub fn yaw(&self) -> f32 {
        self.yaw
    }

    pub fn pitch(&self) -> f32 {
        self.pitch
    }

    pub fn view_matrix(&self) -> &Matrix4<f32> {
        &self.view
    }

    pub fn projection_matrix(&self) -> &Matrix4<f32> {
        &self.projection
    }

    /// Draw every recorded command from this camera's point of view. The
    /// frame bind group must already contain this camera's matrices (see
    /// [`CameraUniform`]); the per-draw model transform comes from the arena
    /// at the command's recording index.
    pub fn render(
        &self,
        scene: &Scene,
        draws: &[DrawCmd],
        frame_bind_group: &wgpu::BindGroup,
        transforms: &TransformArena,
        pass: &mut wgpu::RenderPass<'_>,
    ) {
        pass.set_bind_group(0, frame_bind_group, &[]);
        for (index, cmd) in draws.iter().enumerate() {
            let Some(mesh) = scene.mesh(cmd.mesh) else {
                continue;
            };
            let Some(material) = scene.material(mesh.material()) else {
                continue;
            };
            pass.set_bind_group(2, transforms.bind_group(), &[transforms.offset(index)]);
            pass.draw_mesh(mesh, material);
        }
    }

    /// Like [`Camera::render`] but draws the shadow-only variant of every
    /// mesh: same geometry, no material setup, one shared shadow pipeline for
    /// all meshes.
    pub fn render_shadow_volumes(
        &self,
        scene: &Scene,
        draws: &[DrawCmd],
        frame_bind_group: &wgpu::BindGroup,
        transforms: &TransformArena,
        pass: &mut wgpu::RenderPass<'_>,
    ) {
        pass.set_bind_group(0, frame_bind_group, &[]);
        for (index, cmd) in draws.iter().enumerate() {
            let Some(mesh) = scene.mesh(cmd.mesh) else {
                continue;
            };
            pass.set_bind_group(2, transforms.bind_group(), &[transforms.offset(index)]);
            pass.draw_mesh_shadow(mesh);
        }
    }
}

impl Default for Camera {
    fn default() -> Self {
        Self::new()
    }
}

/// Vertical field of view that keeps `horiz_fov` constant for a canvas of the
/// given pixel size.
pub fn vertical_fov(horiz_fov: f32, width: u32, height: u32) -> f32 {
    2.0 * ((horiz_fov / 2.0).tan() * height as f32 / width as f32).atan()
}

/// The camera data as it is stored on the GPU.
#[repr(C)]
#[derive(Debug, Copy, Clone, bytemuck::Pod, bytemuck::Zeroable)]
pub struct CameraUniform {
    view: [[f32; 4]; 4],
    projection: [[f32; 4]; 4],
    eye_position: [f32; 4],
}

impl CameraUniform {
    pub fn new() -> Self {
        Self {
            view: Matrix4::identity().into(),
            projection: Matrix4::identity().into(),
            eye_position: [0.0, 0.0, 0.0, 1.0],
        }
    }

    pub fn update_view_proj(&mut self, camera: &Camera) {
        self.view = (*camera.view_matrix()).into();
        self.projection = (OPENGL_TO_WGPU_MATRIX * camera.projection_matrix()).into();
        self.eye_position = camera.position().extend(1.0).into();
    }
}

impl Default for CameraUniform {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cgmath::{InnerSpace, Matrix};

    const EPS: f32 = 1e-5;

    fn rotation_block(view: &Matrix4<f32>) -> Matrix3<f32> {
        Matrix3::from_cols(
            view.x.truncate(),
            view.y.truncate(),
            view.z.truncate(),
        )
    }

    #[test]
    fn look_keeps_yaw_and_pitch_in_range() {
        let mut camera = Camera::new();
        let steps = [
            (0.3, 0.2),
            (10.0, 5.0),
            (-25.0, -9.0),
            (TAU, MAX_PITCH),
            (-0.001, 2.0),
            (123.456, -77.7),
        ];
        for (yaw, pitch) in steps {
            camera.look(yaw, pitch);
            assert!(
                camera.yaw() >= 0.0 && camera.yaw() < TAU,
                "yaw {} out of range",
                camera.yaw()
            );
            assert!(
                camera.pitch().abs() <= MAX_PITCH + EPS,
                "pitch {} out of range",
                camera.pitch()
            );
        }
    }

    #[test]
    fn view_rotation_stays_orthonormal() {
        let mut camera = Camera::new();
        camera.move_by(Vector3::new(3.0, -2.0, 7.5));
        for (yaw, pitch) in [(0.0, 0.0), (0.7, 0.3), (2.9, -1.2), (5.5, 14.0), (-8.0, -3.0)] {
            camera.look(yaw, pitch);
            let rotation = rotation_block(camera.view_matrix());
            let should_be_identity = rotation.transpose() * rotation;
            let identity = Matrix3::<f32>::identity();
            for col in 0..3 {
                for row in 0..3 {
                    assert!(
                        (should_be_identity[col][row] - identity[col][row]).abs() < EPS,
                        "R^T R differs from identity at ({col}, {row})"
                    );
                }
            }
        }
    }

    #[test]
    fn finite_projection_far_plane_coefficient() {
        let mut camera = Camera::new();
        for (z_near, z_far) in [(0.1, 100.0), (0.5, 10.0), (1.0, 5000.0)] {
            camera.set_perspective_projection(1.2, 0.9, z_near, z_far);
            let projection = camera.projection_matrix();
            let m22 = z_far / (z_far - z_near);
            assert!((projection[2][2] - m22).abs() < EPS);
            assert!((projection[3][2] - -(1.0 + m22) * z_near).abs() < EPS);
            assert_eq!(projection[2][3], 1.0);
            assert_eq!(projection[3][3], 0.0);
        }
    }

    #[test]
    fn infinite_projection_far_plane_coefficient() {
        let mut camera = Camera::new();
        camera.set_infinite_perspective_projection(1.2, 0.9, 0.25);
        let projection = camera.projection_matrix();
        assert_eq!(projection[2][2], 1.0);
        assert!((projection[3][2] - -2.0 * 0.25).abs() < EPS);
    }

    #[test]
    fn fov_entries_match_half_angle_tangents() {
        let mut camera = Camera::new();
        camera.set_perspective_projection(1.0, 0.5, 0.1, 100.0);
        let projection = camera.projection_matrix();
        assert!((projection[0][0] - 1.0 / (0.5f32).tan()).abs() < EPS);
        assert!((projection[1][1] - 1.0 / (0.25f32).tan()).abs() < EPS);
    }

    #[test]
    fn vertical_fov_follows_aspect() {
        let horiz_fov = std::f32::consts::FRAC_PI_2;
        let vert_fov = vertical_fov(horiz_fov, 400, 300);
        assert!(
            ((vert_fov / 2.0).tan() - (horiz_fov / 2.0).tan() * 300.0 / 400.0).abs() < EPS
        );
        // Same aspect, same answer.
        assert!((vertical_fov(horiz_fov, 800, 600) - vert_fov).abs() < EPS);
    }

    #[test]
    fn view_maps_camera_position_to_origin() {
        let mut camera = Camera::new();
        camera.look(1.3, -0.4);
        camera.move_by(Vector3::new(5.0, 1.0, -2.0));
        let eye = camera.view_matrix() * camera.position().extend(1.0);
        assert!(eye.truncate().magnitude() < EPS, "eye not at origin: {eye:?}");
    }
}
