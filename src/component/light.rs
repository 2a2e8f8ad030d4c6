//! 光照组件模块
//!
//! 方向光、点光源、聚光灯，以及它们到 GPU 光源记录 [`LightRecord`] 的转换。

use crate::core::scene::{LightConfig, LightKind};
use crate::math::{utils, Vector3};
use crate::renderer::buffers::LightRecord;

/// 光源颜色（RGB）
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Color {
    pub r: f32,
    pub g: f32,
    pub b: f32,
}

impl Color {
    pub fn new(r: f32, g: f32, b: f32) -> Self {
        Self { r, g, b }
    }

    /// 白色
    pub const fn white() -> Self {
        Self { r: 1.0, g: 1.0, b: 1.0 }
    }

    /// 转换为数组
    pub fn to_array(&self) -> [f32; 3] {
        [self.r, self.g, self.b]
    }
}

impl Default for Color {
    fn default() -> Self {
        Self::white()
    }
}

impl From<[f32; 3]> for Color {
    fn from(rgb: [f32; 3]) -> Self {
        Self::new(rgb[0], rgb[1], rgb[2])
    }
}

/// 光源类型，数值与着色器中的常量一致
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u32)]
pub enum LightType {
    /// 方向光
    Directional = 0,
    /// 点光源
    Point = 1,
    /// 聚光灯
    Spot = 2,
}

/// 方向光（平行光）
#[derive(Debug, Clone, PartialEq)]
pub struct DirectionalLight {
    pub color: Color,
    pub intensity: f32,
    /// 光照方向（归一化）
    pub direction: Vector3,
}

impl DirectionalLight {
    pub fn new(direction: Vector3, color: Color, intensity: f32) -> Self {
        Self {
            color,
            intensity,
            direction: normalize_direction(direction),
        }
    }

    pub fn to_record(&self) -> LightRecord {
        LightRecord {
            light_type: LightType::Directional as u32,
            direction: self.direction.into(),
            intensity: self.intensity,
            color: self.color.to_array(),
            ..Default::default()
        }
    }
}

/// 点光源
///
/// 光照强度随距离衰减，超过 `range` 后不再影响表面。
#[derive(Debug, Clone, PartialEq)]
pub struct PointLight {
    pub color: Color,
    pub intensity: f32,
    pub position: Vector3,
    pub range: f32,
}

impl PointLight {
    pub fn new(position: Vector3, range: f32, color: Color, intensity: f32) -> Self {
        Self {
            color,
            intensity,
            position,
            range,
        }
    }

    pub fn to_record(&self) -> LightRecord {
        LightRecord {
            light_type: LightType::Point as u32,
            range: self.range,
            position: self.position.into(),
            intensity: self.intensity,
            color: self.color.to_array(),
            ..Default::default()
        }
    }
}

/// 聚光灯
///
/// 内角以内全亮，内外角之间平滑衰减。角度以弧度保存。
#[derive(Debug, Clone, PartialEq)]
pub struct SpotLight {
    pub color: Color,
    pub intensity: f32,
    pub position: Vector3,
    pub direction: Vector3,
    pub range: f32,
    pub inner_angle: f32,
    pub outer_angle: f32,
}

impl SpotLight {
    pub fn new(position: Vector3, direction: Vector3, range: f32, color: Color, intensity: f32) -> Self {
        Self {
            color,
            intensity,
            position,
            direction: normalize_direction(direction),
            range,
            inner_angle: utils::deg_to_rad(20.0),
            outer_angle: utils::deg_to_rad(30.0),
        }
    }

    /// 设置内外角（度数）
    pub fn with_cone_degrees(mut self, inner: f32, outer: f32) -> Self {
        self.inner_angle = utils::deg_to_rad(inner);
        self.outer_angle = utils::deg_to_rad(outer);
        self
    }

    pub fn to_record(&self) -> LightRecord {
        LightRecord {
            light_type: LightType::Spot as u32,
            direction: self.direction.into(),
            range: self.range,
            position: self.position.into(),
            intensity: self.intensity,
            color: self.color.to_array(),
            spot_inner_angle: self.inner_angle,
            spot_outer_angle: self.outer_angle,
            _padding: [0.0; 2],
        }
    }
}

/// 场景中的任一光源
#[derive(Debug, Clone, PartialEq)]
pub enum Light {
    Directional(DirectionalLight),
    Point(PointLight),
    Spot(SpotLight),
}

impl Light {
    pub fn light_type(&self) -> LightType {
        match self {
            Light::Directional(_) => LightType::Directional,
            Light::Point(_) => LightType::Point,
            Light::Spot(_) => LightType::Spot,
        }
    }

    pub fn to_record(&self) -> LightRecord {
        match self {
            Light::Directional(light) => light.to_record(),
            Light::Point(light) => light.to_record(),
            Light::Spot(light) => light.to_record(),
        }
    }

    /// 从场景配置创建
    pub fn from_config(config: &LightConfig) -> Self {
        let color = Color::from(config.color);
        let direction = Vector3::from(config.direction);
        let position = Vector3::from(config.position);

        match config.kind {
            LightKind::Directional => {
                Light::Directional(DirectionalLight::new(direction, color, config.intensity))
            }
            LightKind::Point => {
                Light::Point(PointLight::new(position, config.range, color, config.intensity))
            }
            LightKind::Spot => Light::Spot(
                SpotLight::new(position, direction, config.range, color, config.intensity)
                    .with_cone_degrees(config.spot_inner_angle, config.spot_outer_angle),
            ),
        }
    }
}

/// 零向量保持为零，避免产生 NaN
fn normalize_direction(direction: Vector3) -> Vector3 {
    direction.try_normalize(1e-12).unwrap_or_else(Vector3::zeros)
}
