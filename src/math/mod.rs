//! 数学库模块
//!
//! 基于 `nalgebra`，提供左手坐标系下与 DirectXMath 对应的矩阵辅助函数。
//!
//! nalgebra 使用列向量约定（`v' = M * v`），HLSL 端按 `mul(v, M)` 行向量约定读取，
//! 写入常量缓冲区前统一经过 [`to_shader_matrix`] 按行展开。

pub use nalgebra::{Matrix4 as Mat4, Point3 as Pt3, Vector3 as Vec3};

// 类型别名，使用更简洁的名称
pub type Vector3 = Vec3<f32>;
pub type Point3 = Pt3<f32>;
pub type Matrix4 = Mat4<f32>;

/// 数学常量
pub mod constants {
    /// π
    pub const PI: f32 = std::f32::consts::PI;

    /// π/4
    pub const QUARTER_PI: f32 = std::f32::consts::FRAC_PI_4;

    /// 角度转弧度的系数
    pub const DEG_TO_RAD: f32 = PI / 180.0;

    /// 浮点数比较的 epsilon
    pub const EPSILON: f32 = 1e-5;
}

/// 左手坐标系观察矩阵（XMMatrixLookAtLH）
pub fn look_at_lh(eye: &Point3, target: &Point3, up: &Vector3) -> Matrix4 {
    Matrix4::look_at_lh(eye, target, up)
}

/// 左手坐标系透视投影，深度范围 [0, 1]（XMMatrixPerspectiveFovLH）
pub fn perspective_fov_lh(fov_y: f32, aspect: f32, near: f32, far: f32) -> Matrix4 {
    let h = 1.0 / (fov_y * 0.5).tan();
    let w = h / aspect;
    let range = far / (far - near);

    Matrix4::new(
        w, 0.0, 0.0, 0.0,
        0.0, h, 0.0, 0.0,
        0.0, 0.0, range, -range * near,
        0.0, 0.0, 1.0, 0.0,
    )
}

/// 绕 Y 轴旋转
pub fn rotation_y(angle: f32) -> Matrix4 {
    Matrix4::from_axis_angle(&Vector3::y_axis(), angle)
}

/// 缩放 + 平移组合的世界矩阵
pub fn scale_translation(scale: Vector3, translation: Vector3) -> Matrix4 {
    Matrix4::new_translation(&translation) * Matrix4::new_nonuniform_scaling(&scale)
}

/// 球坐标转笛卡尔坐标（y 轴向上）
pub fn spherical_to_cartesian(radius: f32, theta: f32, phi: f32) -> Point3 {
    Point3::new(
        radius * phi.sin() * theta.cos(),
        radius * phi.cos(),
        radius * phi.sin() * theta.sin(),
    )
}

/// 转换为着色器可直接读取的矩阵布局
pub fn to_shader_matrix(m: &Matrix4) -> [[f32; 4]; 4] {
    m.transpose().into()
}

#[cfg(test)]
mod tests {
    use super::*;
    use nalgebra::Vector4;

    fn project(m: &Matrix4, p: Vector3) -> Vector3 {
        let v = m * Vector4::new(p.x, p.y, p.z, 1.0);
        Vector3::new(v.x / v.w, v.y / v.w, v.z / v.w)
    }

    #[test]
    fn test_perspective_depth_range() {
        let proj = perspective_fov_lh(constants::QUARTER_PI, 1.0, 1.0, 1000.0);
        let near = project(&proj, Vector3::new(0.0, 0.0, 1.0));
        let far = project(&proj, Vector3::new(0.0, 0.0, 1000.0));
        assert!(near.z.abs() < constants::EPSILON);
        assert!((far.z - 1.0).abs() < constants::EPSILON);
    }

    #[test]
    fn test_look_at_lh_forward_is_positive_z() {
        let view = look_at_lh(
            &Point3::new(0.0, 0.0, -5.0),
            &Point3::origin(),
            &Vector3::y(),
        );
        let origin = view.transform_point(&Point3::origin());
        assert!((origin.z - 5.0).abs() < constants::EPSILON);
    }

    #[test]
    fn test_spherical_to_cartesian() {
        let p = spherical_to_cartesian(5.0, 0.0, constants::PI / 2.0);
        assert!((p.x - 5.0).abs() < constants::EPSILON);
        assert!(p.y.abs() < constants::EPSILON);
        assert!(p.z.abs() < constants::EPSILON);
    }

    #[test]
    fn test_shader_matrix_layout() {
        let m = Matrix4::new_translation(&Vector3::new(1.0, 2.0, 3.0));
        let packed = to_shader_matrix(&m);
        // 与 XMStoreFloat4x4(XMMatrixTranspose(M)) 的内存布局一致
        assert_eq!(packed[0], [1.0, 0.0, 0.0, 1.0]);
        assert_eq!(packed[1], [0.0, 1.0, 0.0, 2.0]);
        assert_eq!(packed[2], [0.0, 0.0, 1.0, 3.0]);
        assert_eq!(packed[3], [0.0, 0.0, 0.0, 1.0]);
    }
}
