//! Camera 组件
//!
//! 第一人称飞行相机。位置和朝向保存在场景的 [`TransformHierarchy`] 中的一个节点上，
//! 相机本身只缓存视图矩阵和投影矩阵。
//!
//! # 坐标系
//!
//! 左手坐标系，+Z 朝前。视图矩阵由节点位置和 forward 构造（look-to），
//! 上方向固定为世界 +Y，所以 pitch 被限制在 ±(π/2 - 0.01) 以内。

use crate::component::transform::{TransformHierarchy, TransformId};
use crate::core::error::Result;
use crate::core::scene::CameraConfig;
use crate::math::{constants, matrix, utils, Matrix4, Vector3};

/// pitch 与 ±π/2 之间保留的余量
const PITCH_LIMIT_OFFSET: f32 = 0.01;

/// 按住 Ctrl 时的移动速度系数
const SLOW_MOVE_SCALE: f32 = 0.3;

/// 一帧的相机输入
///
/// 窗口层把键盘和鼠标状态整理成这个结构交给 [`Camera::update`]。
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct CameraInput {
    /// W
    pub forward: bool,
    /// S
    pub backward: bool,
    /// A
    pub left: bool,
    /// D
    pub right: bool,
    /// E
    pub up: bool,
    /// Q
    pub down: bool,
    /// 左 Ctrl，减速
    pub slow: bool,
    /// 鼠标左键或右键按下
    pub look: bool,
    /// 本帧鼠标位移（像素）
    pub mouse_delta: (f32, f32),
}

/// 相机
#[derive(Debug, Clone)]
pub struct Camera {
    transform: TransformId,
    view: Matrix4,
    projection: Matrix4,
    /// 垂直视野角度（弧度）
    fov: f32,
    aspect: f32,
    near: f32,
    far: f32,
    move_speed: f32,
    look_speed: f32,
}

impl Camera {
    /// 创建相机并在 `transforms` 中为它分配一个节点
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        transforms: &mut TransformHierarchy,
        position: Vector3,
        move_speed: f32,
        look_speed: f32,
        fov: f32,
        aspect: f32,
        near: f32,
        far: f32,
    ) -> Result<Self> {
        let transform = transforms.create_at(position);
        let mut camera = Self {
            transform,
            view: Matrix4::identity(),
            projection: Matrix4::identity(),
            fov,
            aspect,
            near,
            far,
            move_speed,
            look_speed,
        };
        camera.update_projection(aspect);
        camera.update_view_matrix(transforms)?;
        Ok(camera)
    }

    /// 从场景配置创建，配置中的角度为度数
    pub fn from_config(
        transforms: &mut TransformHierarchy,
        config: &CameraConfig,
        aspect: f32,
    ) -> Result<Self> {
        let mut camera = Self::new(
            transforms,
            Vector3::from(config.position),
            config.move_speed,
            config.look_speed,
            utils::deg_to_rad(config.fov),
            aspect,
            config.near,
            config.far,
        )?;
        transforms.set_rotation(camera.transform, utils::deg_to_rad_vec3(config.rotation))?;
        camera.update_view_matrix(transforms)?;
        Ok(camera)
    }

    /// 处理一帧输入，然后重建视图矩阵
    pub fn update(
        &mut self,
        transforms: &mut TransformHierarchy,
        input: &CameraInput,
        delta_time: f32,
    ) -> Result<()> {
        let scale = if input.slow { SLOW_MOVE_SCALE } else { 1.0 };
        let step = self.move_speed * scale * delta_time;
        let id = self.transform;

        if input.forward {
            transforms.move_relative(id, Vector3::new(0.0, 0.0, step))?;
        }
        if input.backward {
            transforms.move_relative(id, Vector3::new(0.0, 0.0, -step))?;
        }
        if input.right {
            transforms.move_relative(id, Vector3::new(step, 0.0, 0.0))?;
        }
        if input.left {
            transforms.move_relative(id, Vector3::new(-step, 0.0, 0.0))?;
        }
        if input.up {
            transforms.move_absolute(id, Vector3::new(0.0, step, 0.0))?;
        }
        if input.down {
            transforms.move_absolute(id, Vector3::new(0.0, -step, 0.0))?;
        }

        if input.look {
            let (dx, dy) = input.mouse_delta;
            transforms.rotate(id, Vector3::new(dy * self.look_speed, dx * self.look_speed, 0.0))?;

            let mut rotation = transforms.rotation(id)?;
            let limit = constants::HALF_PI - PITCH_LIMIT_OFFSET;
            rotation.x = utils::clamp(rotation.x, -limit, limit);
            transforms.set_rotation(id, rotation)?;
        }

        self.update_view_matrix(transforms)
    }

    /// 由节点位置和 forward 重建视图矩阵
    pub fn update_view_matrix(&mut self, transforms: &mut TransformHierarchy) -> Result<()> {
        let position = transforms.position(self.transform)?;
        let forward = transforms.forward(self.transform)?;
        self.view = matrix::look_to_lh(&position, &forward, &Vector3::y());
        Ok(())
    }

    /// 窗口尺寸变化后重建投影矩阵
    pub fn update_projection(&mut self, aspect: f32) {
        self.aspect = aspect;
        self.projection = matrix::perspective_fov_lh(self.fov, aspect, self.near, self.far);
    }

    pub fn view(&self) -> Matrix4 {
        self.view
    }

    pub fn projection(&self) -> Matrix4 {
        self.projection
    }

    /// 相机所在的 Transform 节点
    pub fn transform(&self) -> TransformId {
        self.transform
    }

    pub fn position(&self, transforms: &TransformHierarchy) -> Result<Vector3> {
        transforms.position(self.transform)
    }

    /// 垂直视野角度（弧度）
    pub fn fov(&self) -> f32 {
        self.fov
    }

    pub fn aspect(&self) -> f32 {
        self.aspect
    }

    pub fn near(&self) -> f32 {
        self.near
    }

    pub fn far(&self) -> f32 {
        self.far
    }

    pub fn move_speed(&self) -> f32 {
        self.move_speed
    }

    pub fn look_speed(&self) -> f32 {
        self.look_speed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::math::utils::{approx_eq, vec3_approx_eq};
    use crate::math::Vector4;

    fn camera(transforms: &mut TransformHierarchy) -> Camera {
        Camera::new(
            transforms,
            Vector3::new(0.0, 0.0, -5.0),
            2.0,
            0.01,
            constants::HALF_PI,
            1.0,
            0.1,
            100.0,
        )
        .unwrap()
    }

    #[test]
    fn test_view_transforms_position_to_origin() {
        let mut transforms = TransformHierarchy::new();
        let camera = camera(&mut transforms);

        let eye = camera.view() * Vector4::new(0.0, 0.0, -5.0, 1.0);
        assert!(approx_eq(eye.x, 0.0, 1e-6));
        assert!(approx_eq(eye.y, 0.0, 1e-6));
        assert!(approx_eq(eye.z, 0.0, 1e-6));

        // 相机前方 1 个单位的点在视图空间 +Z
        let ahead = camera.view() * Vector4::new(0.0, 0.0, -4.0, 1.0);
        assert!(approx_eq(ahead.z, 1.0, 1e-6));
    }

    #[test]
    fn test_projection_depth_range() {
        let mut transforms = TransformHierarchy::new();
        let camera = camera(&mut transforms);
        let projection = camera.projection();

        let near = projection * Vector4::new(0.0, 0.0, 0.1, 1.0);
        let far = projection * Vector4::new(0.0, 0.0, 100.0, 1.0);
        assert!(approx_eq(near.z / near.w, 0.0, 1e-5));
        assert!(approx_eq(far.z / far.w, 1.0, 1e-5));
    }

    #[test]
    fn test_update_projection_changes_aspect() {
        let mut transforms = TransformHierarchy::new();
        let mut camera = camera(&mut transforms);
        let before = camera.projection();

        camera.update_projection(2.0);
        assert_eq!(camera.aspect(), 2.0);
        assert!(approx_eq(camera.projection()[(0, 0)], before[(0, 0)] / 2.0, 1e-6));
        assert_eq!(camera.projection()[(1, 1)], before[(1, 1)]);
    }

    #[test]
    fn test_wasd_moves_relative_and_eq_absolute() {
        let mut transforms = TransformHierarchy::new();
        let mut camera = camera(&mut transforms);
        let id = camera.transform();
        transforms.set_rotation(id, Vector3::new(0.0, constants::HALF_PI, 0.0)).unwrap();

        let input = CameraInput {
            forward: true,
            up: true,
            ..Default::default()
        };
        camera.update(&mut transforms, &input, 0.5).unwrap();

        // yaw 90° 时前方是 +X
        let position = camera.position(&transforms).unwrap();
        assert!(vec3_approx_eq(&position, &Vector3::new(1.0, 1.0, -5.0), 1e-5));
    }

    #[test]
    fn test_slow_modifier() {
        let mut transforms = TransformHierarchy::new();
        let mut camera = camera(&mut transforms);

        let input = CameraInput {
            right: true,
            slow: true,
            ..Default::default()
        };
        camera.update(&mut transforms, &input, 1.0).unwrap();

        let position = camera.position(&transforms).unwrap();
        assert!(approx_eq(position.x, 0.6, 1e-6));
    }

    #[test]
    fn test_mouse_look_clamps_pitch() {
        let mut transforms = TransformHierarchy::new();
        let mut camera = camera(&mut transforms);

        let input = CameraInput {
            look: true,
            mouse_delta: (10.0, 1000.0),
            ..Default::default()
        };
        camera.update(&mut transforms, &input, 0.016).unwrap();

        let rotation = transforms.rotation(camera.transform()).unwrap();
        assert!(approx_eq(rotation.x, constants::HALF_PI - 0.01, 1e-6));
        assert!(approx_eq(rotation.y, 0.1, 1e-6));
        assert!(camera.view().iter().all(|v| v.is_finite()));
    }

    #[test]
    fn test_mouse_ignored_without_button() {
        let mut transforms = TransformHierarchy::new();
        let mut camera = camera(&mut transforms);

        let input = CameraInput {
            mouse_delta: (50.0, 50.0),
            ..Default::default()
        };
        camera.update(&mut transforms, &input, 0.016).unwrap();
        assert_eq!(transforms.rotation(camera.transform()).unwrap(), Vector3::zeros());
    }

    #[test]
    fn test_from_config_converts_degrees() {
        let mut transforms = TransformHierarchy::new();
        let config = CameraConfig {
            rotation: [0.0, 90.0, 0.0],
            ..CameraConfig::default()
        };
        let mut camera = Camera::from_config(&mut transforms, &config, 16.0 / 9.0).unwrap();

        assert!(approx_eq(camera.fov(), 60.0f32.to_radians(), 1e-6));
        let forward = transforms.forward(camera.transform()).unwrap();
        assert!(vec3_approx_eq(&forward, &Vector3::new(1.0, 0.0, 0.0), 1e-5));
        camera.update_view_matrix(&mut transforms).unwrap();
    }
}
