//! 统一的数学库模块
//!
//! 提供渲染核心使用的数学类型和函数，基于 `nalgebra`。
//!
//! # 约定
//!
//! - 使用列向量：`v' = M * v`，世界矩阵为 `Parent * T * R * S`
//! - 左手坐标系，+Z 朝前，+Y 朝上
//! - 旋转顺序与 DirectX `RollPitchYaw` 一致：先绕 Z（roll），再绕 X（pitch），最后绕 Y（yaw）
//!
//! nalgebra 以列主序存储矩阵，列向量约定下的矩阵按列主序写出的字节
//! 与行向量约定下同一变换按行主序写出的字节完全相同，因此可以直接上传给 HLSL。

pub use nalgebra::{
    Matrix3 as Mat3, Matrix4 as Mat4, Point3, Unit, UnitQuaternion,
    Vector2 as Vec2, Vector3 as Vec3, Vector4 as Vec4,
};

// 类型别名，使用更简洁的名称
pub type Vector2 = Vec2<f32>;
pub type Vector3 = Vec3<f32>;
pub type Vector4 = Vec4<f32>;
pub type Matrix3 = Mat3<f32>;
pub type Matrix4 = Mat4<f32>;
pub type Quaternion = UnitQuaternion<f32>;

/// 数学常量
pub mod constants {
    /// π
    pub const PI: f32 = std::f32::consts::PI;

    /// π/2
    pub const HALF_PI: f32 = std::f32::consts::FRAC_PI_2;

    /// 角度转弧度的系数
    pub const DEG_TO_RAD: f32 = PI / 180.0;

    /// 浮点数比较的 epsilon
    pub const EPSILON: f32 = 1e-6;
}

/// 数学工具函数
pub mod utils {
    use super::*;

    /// 限制值在范围内
    pub fn clamp<T: PartialOrd>(value: T, min: T, max: T) -> T {
        if value < min {
            min
        } else if value > max {
            max
        } else {
            value
        }
    }

    /// 角度转弧度
    pub fn deg_to_rad(degrees: f32) -> f32 {
        degrees * constants::DEG_TO_RAD
    }

    /// 逐分量角度转弧度
    pub fn deg_to_rad_vec3(degrees: [f32; 3]) -> Vector3 {
        Vector3::new(
            deg_to_rad(degrees[0]),
            deg_to_rad(degrees[1]),
            deg_to_rad(degrees[2]),
        )
    }

    /// 检查两个浮点数是否近似相等
    pub fn approx_eq(a: f32, b: f32, epsilon: f32) -> bool {
        (a - b).abs() < epsilon
    }

    /// 逐元素比较两个矩阵
    pub fn matrix_approx_eq(a: &Matrix4, b: &Matrix4, epsilon: f32) -> bool {
        a.iter().zip(b.iter()).all(|(x, y)| approx_eq(*x, *y, epsilon))
    }

    /// 逐分量比较两个向量
    pub fn vec3_approx_eq(a: &Vector3, b: &Vector3, epsilon: f32) -> bool {
        a.iter().zip(b.iter()).all(|(x, y)| approx_eq(*x, *y, epsilon))
    }
}

/// 四元数辅助函数
pub mod quaternion {
    use super::*;

    /// 由 (pitch, yaw, roll) 弧度构造旋转
    ///
    /// 等价于 `XMQuaternionRotationRollPitchYaw`：roll(Z) → pitch(X) → yaw(Y)。
    pub fn from_pitch_yaw_roll(pitch_yaw_roll: &Vector3) -> Quaternion {
        let pitch = UnitQuaternion::from_axis_angle(&Vector3::x_axis(), pitch_yaw_roll.x);
        let yaw = UnitQuaternion::from_axis_angle(&Vector3::y_axis(), pitch_yaw_roll.y);
        let roll = UnitQuaternion::from_axis_angle(&Vector3::z_axis(), pitch_yaw_roll.z);
        yaw * pitch * roll
    }
}

/// 矩阵辅助函数
pub mod matrix {
    use super::*;

    /// 平移 * 旋转 * 缩放
    pub fn translation_rotation_scale(
        translation: &Vector3,
        rotation: &Quaternion,
        scale: &Vector3,
    ) -> Matrix4 {
        Matrix4::new_translation(translation)
            * rotation.to_homogeneous()
            * Matrix4::new_nonuniform_scaling(scale)
    }

    /// 逆转置矩阵，用于变换法线
    ///
    /// 矩阵不可逆（例如某个缩放分量为 0）时返回单位矩阵。
    pub fn inverse_transpose(matrix: &Matrix4) -> Matrix4 {
        matrix
            .try_inverse()
            .map(|inverse| inverse.transpose())
            .unwrap_or_else(Matrix4::identity)
    }

    /// 左手坐标系的透视投影（对应 `XMMatrixPerspectiveFovLH`）
    ///
    /// 深度映射到 [0, 1]。
    pub fn perspective_fov_lh(fov_y: f32, aspect: f32, near: f32, far: f32) -> Matrix4 {
        let h = 1.0 / (0.5 * fov_y).tan();
        let w = h / aspect;
        let range = far / (far - near);

        Matrix4::new(
            w, 0.0, 0.0, 0.0,
            0.0, h, 0.0, 0.0,
            0.0, 0.0, range, -range * near,
            0.0, 0.0, 1.0, 0.0,
        )
    }

    /// 左手坐标系的 look-to 视图矩阵（对应 `XMMatrixLookToLH`）
    pub fn look_to_lh(eye: &Vector3, direction: &Vector3, up: &Vector3) -> Matrix4 {
        let r2 = direction.normalize();
        let r0 = up.cross(&r2).normalize();
        let r1 = r2.cross(&r0);

        Matrix4::new(
            r0.x, r0.y, r0.z, -r0.dot(eye),
            r1.x, r1.y, r1.z, -r1.dot(eye),
            r2.x, r2.y, r2.z, -r2.dot(eye),
            0.0, 0.0, 0.0, 1.0,
        )
    }

    /// 转为列主序的二维数组，直接用于常量缓冲区
    pub fn to_cols_array(matrix: &Matrix4) -> [[f32; 4]; 4] {
        (*matrix).into()
    }
}

// 几何处理模块（网格法线、切线等）
pub mod geometry;

#[cfg(test)]
mod tests {
    use super::*;
    use utils::{approx_eq, vec3_approx_eq};

    #[test]
    fn test_yaw_quarter_turn_maps_forward_to_right() {
        let q = quaternion::from_pitch_yaw_roll(&Vector3::new(0.0, constants::HALF_PI, 0.0));
        let forward = q * Vector3::new(0.0, 0.0, 1.0);
        assert!(vec3_approx_eq(&forward, &Vector3::new(1.0, 0.0, 0.0), 1e-5));
    }

    #[test]
    fn test_pitch_tilts_forward_down() {
        // 左手坐标系下正 pitch 让 +Z 朝 -Y 转
        let q = quaternion::from_pitch_yaw_roll(&Vector3::new(constants::HALF_PI, 0.0, 0.0));
        let forward = q * Vector3::new(0.0, 0.0, 1.0);
        assert!(vec3_approx_eq(&forward, &Vector3::new(0.0, -1.0, 0.0), 1e-5));
    }

    #[test]
    fn test_roll_applied_before_yaw() {
        // roll 90° 把 +X 转到 +Y，之后的 yaw 不再影响它
        let q = quaternion::from_pitch_yaw_roll(&Vector3::new(0.0, constants::HALF_PI, constants::HALF_PI));
        let right = q * Vector3::new(1.0, 0.0, 0.0);
        assert!(vec3_approx_eq(&right, &Vector3::new(0.0, 1.0, 0.0), 1e-5));
    }

    #[test]
    fn test_translation_rotation_scale() {
        let m = matrix::translation_rotation_scale(
            &Vector3::new(1.0, 2.0, 3.0),
            &Quaternion::identity(),
            &Vector3::new(2.0, 2.0, 2.0),
        );
        let p = m * Vector4::new(1.0, 0.0, 0.0, 1.0);
        assert!(approx_eq(p.x, 3.0, 1e-6));
        assert!(approx_eq(p.y, 2.0, 1e-6));
        assert!(approx_eq(p.z, 3.0, 1e-6));
    }

    #[test]
    fn test_perspective_fov_lh_depth_range() {
        let proj = matrix::perspective_fov_lh(constants::HALF_PI, 1.0, 1.0, 10.0);

        let near = proj * Vector4::new(0.0, 0.0, 1.0, 1.0);
        let far = proj * Vector4::new(0.0, 0.0, 10.0, 1.0);

        assert!(approx_eq(near.z / near.w, 0.0, 1e-5));
        assert!(approx_eq(far.z / far.w, 1.0, 1e-5));
    }

    #[test]
    fn test_look_to_lh_identity_at_origin() {
        let view = matrix::look_to_lh(
            &Vector3::zeros(),
            &Vector3::new(0.0, 0.0, 1.0),
            &Vector3::new(0.0, 1.0, 0.0),
        );
        assert!(utils::matrix_approx_eq(&view, &Matrix4::identity(), 1e-6));
    }

    #[test]
    fn test_look_to_lh_moves_eye_to_origin() {
        let eye = Vector3::new(0.0, 0.0, -5.0);
        let view = matrix::look_to_lh(&eye, &Vector3::new(0.0, 0.0, 1.0), &Vector3::new(0.0, 1.0, 0.0));
        let p = view * Vector4::new(0.0, 0.0, 0.0, 1.0);
        assert!(approx_eq(p.z, 5.0, 1e-6));
    }

    #[test]
    fn test_inverse_transpose_of_singular_matrix() {
        let m = Matrix4::new_nonuniform_scaling(&Vector3::new(0.0, 1.0, 1.0));
        assert_eq!(matrix::inverse_transpose(&m), Matrix4::identity());
    }

    #[test]
    fn test_cols_array_layout() {
        let m = Matrix4::new_translation(&Vector3::new(1.0, 2.0, 3.0));
        let cols = matrix::to_cols_array(&m);
        // 平移位于最后一列，对应 DirectX 行主序的最后一行
        assert_eq!(cols[3], [1.0, 2.0, 3.0, 1.0]);
    }
}
