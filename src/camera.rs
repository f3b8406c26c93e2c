//! Examiner camera and perspective projection.
//!
//! The camera matrix maps world space into view space. The camera position
//! handed to the shaders is the translation of its inverse.

use cgmath::{Deg, InnerSpace, Matrix4, One, Point3, Quaternion, Rad, Rotation3, SquareMatrix, Vector3};

#[rustfmt::skip]
pub const OPENGL_TO_WGPU_MATRIX: Matrix4<f32> = Matrix4::new(
    1.0, 0.0, 0.0, 0.0,
    0.0, 1.0, 0.0, 0.0,
    0.0, 0.0, 0.5, 0.0,
    0.0, 0.0, 0.5, 1.0,
);

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Camera {
    pub translation: Vector3<f32>,
    pub rotation: Quaternion<f32>,
}

impl Camera {
    pub fn new(translation: impl Into<Vector3<f32>>) -> Self {
        Self {
            translation: translation.into(),
            rotation: Quaternion::one(),
        }
    }

    /// Rotation is applied first, so the scene spins around its own origin.
    pub fn view_matrix(&self) -> Matrix4<f32> {
        Matrix4::from_translation(self.translation) * Matrix4::from(self.rotation)
    }

    pub fn position(&self) -> Point3<f32> {
        let inverse = self.view_matrix().invert().unwrap_or_else(Matrix4::identity);
        Point3::new(inverse.w.x, inverse.w.y, inverse.w.z)
    }

    /// Turns the scene around the view-space y axis (`yaw`) and x axis (`pitch`).
    pub fn rotate(&mut self, yaw: impl Into<Rad<f32>>, pitch: impl Into<Rad<f32>>) {
        let yaw = Quaternion::from_angle_y(yaw.into());
        let pitch = Quaternion::from_angle_x(pitch.into());
        self.rotation = (pitch * yaw * self.rotation).normalize();
    }

    /// Moves the camera along the view axis; positive values move closer.
    pub fn zoom(&mut self, delta: f32) {
        self.translation.z += delta;
    }
}

impl Default for Camera {
    fn default() -> Self {
        Self::new([0.0, 0.0, -1.5])
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Projection {
    aspect: f32,
    fovy: Rad<f32>,
    znear: f32,
    zfar: f32,
}

impl Projection {
    pub fn new(width: u32, height: u32, fovy: impl Into<Rad<f32>>, znear: f32, zfar: f32) -> Self {
        Self {
            aspect: width.max(1) as f32 / height.max(1) as f32,
            fovy: fovy.into(),
            znear,
            zfar,
        }
    }

    pub fn from_degrees(width: u32, height: u32, fovy: f32, znear: f32, zfar: f32) -> Self {
        Self::new(width, height, Deg(fovy), znear, zfar)
    }

    pub fn resize(&mut self, width: u32, height: u32) {
        self.aspect = width.max(1) as f32 / height.max(1) as f32;
    }

    pub fn aspect(&self) -> f32 {
        self.aspect
    }

    pub fn calc_matrix(&self) -> Matrix4<f32> {
        OPENGL_TO_WGPU_MATRIX * cgmath::perspective(self.fovy, self.aspect, self.znear, self.zfar)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn position_inverts_the_translation() {
        let camera = Camera::new([0.0, -0.25, -1.5]);
        let p = camera.position();
        assert!((p.x - 0.0).abs() < 1e-6);
        assert!((p.y - 0.25).abs() < 1e-6);
        assert!((p.z - 1.5).abs() < 1e-6);
    }

    #[test]
    fn resize_ignores_zero_height() {
        let mut projection = Projection::from_degrees(800, 600, 45.0, 0.1, 10.0);
        projection.resize(640, 0);
        assert_eq!(projection.aspect(), 640.0);
    }
}
