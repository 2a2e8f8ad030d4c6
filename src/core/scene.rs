//! 场景配置模块
//!
//! 定义场景描述文件 (scene.toml)：相机、光源和实体列表。
//! 实体之间的父子关系通过 `parent` 字段引用前面实体的下标。
//!
//! ```toml
//! [camera]
//! position = [0.0, 0.0, -5.0]
//! fov = 60.0
//!
//! [[lights]]
//! kind = "directional"
//! direction = [0.0, -1.0, 1.0]
//!
//! [[entities]]
//! name = "parent"
//! mesh = "builtin:quad"
//! position = [0.0, 0.0, 2.0]
//!
//! [[entities]]
//! name = "child"
//! mesh = "builtin:cube"
//! position = [1.5, 0.0, 0.0]
//! parent = 0
//! ```

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

use crate::core::error::{ConfigError, RenderError, Result};

/// 相机配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CameraConfig {
    /// 相机位置
    #[serde(default = "default_camera_position")]
    pub position: [f32; 3],

    /// 初始旋转（度数）(pitch, yaw, roll)
    #[serde(default)]
    pub rotation: [f32; 3],

    /// 垂直视野角度（度数）
    #[serde(default = "default_fov")]
    pub fov: f32,

    /// 近裁剪面距离
    #[serde(default = "default_near")]
    pub near: f32,

    /// 远裁剪面距离
    #[serde(default = "default_far")]
    pub far: f32,

    /// 移动速度（单位/秒）
    #[serde(default = "default_move_speed")]
    pub move_speed: f32,

    /// 鼠标灵敏度（弧度/像素）
    #[serde(default = "default_look_speed")]
    pub look_speed: f32,
}

fn default_camera_position() -> [f32; 3] { [0.0, 0.0, -5.0] }
fn default_fov() -> f32 { 60.0 }
fn default_near() -> f32 { 0.01 }
fn default_far() -> f32 { 1000.0 }
fn default_move_speed() -> f32 { 5.0 }
fn default_look_speed() -> f32 { 0.002 }

impl Default for CameraConfig {
    fn default() -> Self {
        Self {
            position: default_camera_position(),
            rotation: [0.0, 0.0, 0.0],
            fov: default_fov(),
            near: default_near(),
            far: default_far(),
            move_speed: default_move_speed(),
            look_speed: default_look_speed(),
        }
    }
}

/// 光源种类
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LightKind {
    Directional,
    Point,
    Spot,
}

/// 光源配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LightConfig {
    pub kind: LightKind,

    #[serde(default = "default_light_direction")]
    pub direction: [f32; 3],

    #[serde(default)]
    pub position: [f32; 3],

    #[serde(default = "default_light_color")]
    pub color: [f32; 3],

    #[serde(default = "default_intensity")]
    pub intensity: f32,

    #[serde(default = "default_range")]
    pub range: f32,

    /// 聚光灯内角（度数）
    #[serde(default = "default_spot_inner")]
    pub spot_inner_angle: f32,

    /// 聚光灯外角（度数）
    #[serde(default = "default_spot_outer")]
    pub spot_outer_angle: f32,
}

fn default_light_direction() -> [f32; 3] { [0.0, -1.0, 0.0] }
fn default_light_color() -> [f32; 3] { [1.0, 1.0, 1.0] }
fn default_intensity() -> f32 { 1.0 }
fn default_range() -> f32 { 10.0 }
fn default_spot_inner() -> f32 { 20.0 }
fn default_spot_outer() -> f32 { 30.0 }

impl LightConfig {
    /// 默认的方向光
    pub fn directional(direction: [f32; 3]) -> Self {
        Self {
            kind: LightKind::Directional,
            direction,
            position: [0.0, 0.0, 0.0],
            color: default_light_color(),
            intensity: default_intensity(),
            range: default_range(),
            spot_inner_angle: default_spot_inner(),
            spot_outer_angle: default_spot_outer(),
        }
    }
}

/// 材质配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MaterialConfig {
    #[serde(default = "default_color_tint")]
    pub color_tint: [f32; 3],

    #[serde(default = "default_uv_scale")]
    pub uv_scale: [f32; 2],

    #[serde(default)]
    pub uv_offset: [f32; 2],

    /// 着色器可见描述符堆中的纹理下标
    #[serde(default)]
    pub textures: Vec<u32>,
}

fn default_color_tint() -> [f32; 3] { [1.0, 1.0, 1.0] }
fn default_uv_scale() -> [f32; 2] { [1.0, 1.0] }

impl Default for MaterialConfig {
    fn default() -> Self {
        Self {
            color_tint: default_color_tint(),
            uv_scale: default_uv_scale(),
            uv_offset: [0.0, 0.0],
            textures: Vec::new(),
        }
    }
}

/// 实体配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EntityConfig {
    /// 实体名称
    pub name: String,

    /// 网格来源：OBJ 文件路径或 `builtin:quad` / `builtin:cube`
    pub mesh: String,

    #[serde(default)]
    pub position: [f32; 3],

    /// 旋转（度数）(pitch, yaw, roll)
    #[serde(default)]
    pub rotation: [f32; 3],

    #[serde(default = "default_scale")]
    pub scale: [f32; 3],

    /// 父实体在 `entities` 中的下标，必须小于自身下标
    #[serde(default)]
    pub parent: Option<usize>,

    #[serde(default)]
    pub material: MaterialConfig,
}

fn default_scale() -> [f32; 3] { [1.0, 1.0, 1.0] }

impl EntityConfig {
    pub fn new(name: impl Into<String>, mesh: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            mesh: mesh.into(),
            position: [0.0, 0.0, 0.0],
            rotation: [0.0, 0.0, 0.0],
            scale: default_scale(),
            parent: None,
            material: MaterialConfig::default(),
        }
    }
}

/// 场景配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SceneConfig {
    #[serde(default)]
    pub camera: CameraConfig,

    #[serde(default)]
    pub lights: Vec<LightConfig>,

    #[serde(default)]
    pub entities: Vec<EntityConfig>,
}

impl Default for SceneConfig {
    /// 内置场景：一盏方向光，一对父子实体
    fn default() -> Self {
        let parent = EntityConfig {
            position: [0.0, 0.0, 2.0],
            ..EntityConfig::new("parent", "builtin:quad")
        };
        let child = EntityConfig {
            position: [1.5, 0.0, 0.0],
            scale: [0.5, 0.5, 0.5],
            parent: Some(0),
            material: MaterialConfig {
                color_tint: [1.0, 0.5, 0.25],
                ..MaterialConfig::default()
            },
            ..EntityConfig::new("child", "builtin:cube")
        };

        Self {
            camera: CameraConfig::default(),
            lights: vec![LightConfig::directional([0.0, -1.0, 1.0])],
            entities: vec![parent, child],
        }
    }
}

impl SceneConfig {
    /// 从文件加载场景配置
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let contents = fs::read_to_string(path).map_err(|e| {
            RenderError::Config(ConfigError::FileNotFound(format!(
                "Failed to read scene config file '{}': {}",
                path.display(),
                e
            )))
        })?;

        let scene = Self::from_toml_str(&contents)?;
        scene.validate()?;
        Ok(scene)
    }

    /// 从 TOML 文本解析
    pub fn from_toml_str(contents: &str) -> Result<Self> {
        toml::from_str(contents).map_err(|e| {
            RenderError::Config(ConfigError::ParseError(format!(
                "Failed to parse scene config: {}",
                e
            )))
        })
    }

    /// 从文件加载，如果文件不存在或无效则返回内置场景
    pub fn from_file_or_default<P: AsRef<Path>>(path: P) -> Self {
        let path = path.as_ref();
        if path.exists() {
            match Self::from_file(path) {
                Ok(config) => {
                    tracing::info!(path = %path.display(), "Loaded scene config");
                    config
                }
                Err(e) => {
                    tracing::warn!("Failed to load scene config: {}, using defaults", e);
                    Self::default()
                }
            }
        } else {
            tracing::info!("Scene config not found, using defaults");
            Self::default()
        }
    }

    /// 保存配置到文件
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let contents = toml::to_string_pretty(self).map_err(|e| {
            RenderError::Config(ConfigError::ParseError(format!(
                "Failed to serialize scene config: {}",
                e
            )))
        })?;

        fs::write(path, contents)?;
        Ok(())
    }

    /// 检查父下标只引用前面的实体
    pub fn validate(&self) -> Result<()> {
        for (index, entity) in self.entities.iter().enumerate() {
            if let Some(parent) = entity.parent {
                if parent >= index {
                    return Err(ConfigError::InvalidValue {
                        field: format!("entities[{}].parent", index),
                        reason: format!("parent index {} must refer to an earlier entity", parent),
                    }
                    .into());
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_camera() {
        let camera = CameraConfig::default();
        assert_eq!(camera.fov, 60.0);
        assert_eq!(camera.position, [0.0, 0.0, -5.0]);
    }

    #[test]
    fn test_default_scene() {
        let scene = SceneConfig::default();
        assert_eq!(scene.lights.len(), 1);
        assert_eq!(scene.entities.len(), 2);
        assert_eq!(scene.entities[1].parent, Some(0));
        assert!(scene.validate().is_ok());
    }

    #[test]
    fn test_parse_scene() {
        let text = r#"
            [camera]
            fov = 75.0

            [[lights]]
            kind = "point"
            position = [1.0, 2.0, 3.0]
            range = 4.0

            [[entities]]
            name = "root"
            mesh = "builtin:quad"

            [[entities]]
            name = "leaf"
            mesh = "builtin:cube"
            parent = 0
            material = { color_tint = [0.5, 0.5, 0.5], textures = [3, 4] }
        "#;

        let scene = SceneConfig::from_toml_str(text).expect("scene should parse");
        assert_eq!(scene.camera.fov, 75.0);
        assert_eq!(scene.camera.near, 0.01);
        assert_eq!(scene.lights[0].kind, LightKind::Point);
        assert_eq!(scene.lights[0].range, 4.0);
        assert_eq!(scene.entities[1].material.textures, vec![3, 4]);
        assert_eq!(scene.entities[0].scale, [1.0, 1.0, 1.0]);
        assert!(scene.validate().is_ok());
    }

    #[test]
    fn test_forward_parent_reference_rejected() {
        let mut scene = SceneConfig::default();
        scene.entities[0].parent = Some(1);
        assert!(scene.validate().is_err());
    }
}
