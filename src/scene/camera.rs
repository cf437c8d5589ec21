//! 环绕相机
//!
//! 相机位于以原点为中心的球面上，用球坐标 (θ, φ, r) 表示。
//! 左键拖动旋转，右键拖动缩放。

use crate::core::input::MouseDrag;
use crate::math::constants::{DEG_TO_RAD, PI, QUARTER_PI};
use crate::math::{look_at_lh, perspective_fov_lh, spherical_to_cartesian, Matrix4, Point3, Vector3};

/// 每像素旋转角度（度）
const ROTATE_DEGREES_PER_PIXEL: f32 = 0.25;
const MIN_PHI: f32 = 0.1;
const MAX_PHI: f32 = PI - 0.1;
const NEAR_Z: f32 = 1.0;
const FAR_Z: f32 = 1000.0;

/// 半径范围和缩放速度
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OrbitLimits {
    /// 初始半径
    pub radius: f32,
    pub min_radius: f32,
    pub max_radius: f32,
    /// 每像素缩放距离
    pub zoom_per_pixel: f32,
}

impl Default for OrbitLimits {
    fn default() -> Self {
        Self {
            radius: 5.0,
            min_radius: 3.0,
            max_radius: 15.0,
            zoom_per_pixel: 0.005,
        }
    }
}

impl OrbitLimits {
    /// 观察大片地形
    pub fn landscape() -> Self {
        Self {
            radius: 50.0,
            min_radius: 5.0,
            max_radius: 150.0,
            zoom_per_pixel: 0.1,
        }
    }
}

/// 环绕相机
#[derive(Debug, Clone)]
pub struct OrbitCamera {
    theta: f32,
    phi: f32,
    radius: f32,
    limits: OrbitLimits,
    view: Matrix4,
    proj: Matrix4,
}

impl OrbitCamera {
    pub fn new(aspect_ratio: f32) -> Self {
        Self::with_limits(aspect_ratio, OrbitLimits::default())
    }

    pub fn with_limits(aspect_ratio: f32, limits: OrbitLimits) -> Self {
        let mut camera = Self {
            theta: 1.5 * PI,
            phi: QUARTER_PI,
            radius: limits.radius,
            limits,
            view: Matrix4::identity(),
            proj: Matrix4::identity(),
        };
        camera.set_aspect_ratio(aspect_ratio);
        camera.update_view();
        camera
    }

    /// 窗口尺寸变化时重新计算投影矩阵
    pub fn set_aspect_ratio(&mut self, aspect_ratio: f32) {
        self.proj = perspective_fov_lh(QUARTER_PI, aspect_ratio, NEAR_Z, FAR_Z);
    }

    /// 应用一次鼠标拖动
    pub fn on_drag(&mut self, drag: &MouseDrag) {
        if drag.left {
            self.theta += ROTATE_DEGREES_PER_PIXEL * drag.dx * DEG_TO_RAD;
            self.phi = (self.phi + ROTATE_DEGREES_PER_PIXEL * drag.dy * DEG_TO_RAD).clamp(MIN_PHI, MAX_PHI);
        } else if drag.right {
            let zoom = self.limits.zoom_per_pixel;
            let delta = zoom * drag.dx - zoom * drag.dy;
            self.radius = (self.radius + delta).clamp(self.limits.min_radius, self.limits.max_radius);
        }
        self.update_view();
    }

    fn update_view(&mut self) {
        let eye = self.eye();
        self.view = look_at_lh(&eye, &Point3::origin(), &Vector3::y());
    }

    /// 相机位置
    pub fn eye(&self) -> Point3 {
        spherical_to_cartesian(self.radius, self.theta, self.phi)
    }

    pub fn view(&self) -> &Matrix4 {
        &self.view
    }

    pub fn proj(&self) -> &Matrix4 {
        &self.proj
    }

    pub fn view_proj(&self) -> Matrix4 {
        self.proj * self.view
    }

    pub fn radius(&self) -> f32 {
        self.radius
    }

    pub fn phi(&self) -> f32 {
        self.phi
    }

    pub fn theta(&self) -> f32 {
        self.theta
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::math::constants::EPSILON;

    fn drag(dx: f32, dy: f32, left: bool) -> MouseDrag {
        MouseDrag {
            dx,
            dy,
            left,
            right: !left,
        }
    }

    #[test]
    fn test_initial_eye_position() {
        let camera = OrbitCamera::new(1.0);
        let eye = camera.eye();
        // θ = 1.5π 时相机位于 -Z 方向
        assert!(eye.x.abs() < EPSILON);
        assert!(eye.z < 0.0);
        assert!((eye.coords.norm() - 5.0).abs() < 1e-4);
    }

    #[test]
    fn test_phi_and_radius_are_clamped() {
        let mut camera = OrbitCamera::new(1.0);
        camera.on_drag(&drag(0.0, 100_000.0, true));
        assert!((camera.phi() - MAX_PHI).abs() < EPSILON);
        camera.on_drag(&drag(0.0, -100_000.0, true));
        assert!((camera.phi() - MIN_PHI).abs() < EPSILON);

        camera.on_drag(&drag(100_000.0, 0.0, false));
        assert_eq!(camera.radius(), 15.0);
        camera.on_drag(&drag(0.0, 100_000.0, false));
        assert_eq!(camera.radius(), 3.0);
    }

    #[test]
    fn test_landscape_limits_zoom_faster() {
        let mut camera = OrbitCamera::with_limits(1.0, OrbitLimits::landscape());
        assert!((camera.eye().coords.norm() - 50.0).abs() < 1e-3);
        camera.on_drag(&drag(10.0, 0.0, false));
        assert!((camera.radius() - 51.0).abs() < 1e-4);
        camera.on_drag(&drag(0.0, 100_000.0, false));
        assert_eq!(camera.radius(), 5.0);
    }

    #[test]
    fn test_left_drag_rotates_quarter_degree_per_pixel() {
        let mut camera = OrbitCamera::new(1.0);
        let theta = camera.theta();
        camera.on_drag(&drag(4.0, 0.0, true));
        assert!((camera.theta() - theta - DEG_TO_RAD).abs() < EPSILON);
    }
}
