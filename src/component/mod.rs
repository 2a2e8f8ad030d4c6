//! 组件模块
//!
//! 场景中的 Transform 层级、相机、光源、材质和实体。

pub mod camera;
pub mod entity;
pub mod light;
pub mod material;
pub mod transform;

pub use camera::{Camera, CameraInput};
pub use entity::{Entity, EntityId, MaterialId, MeshId};
pub use light::{Color, DirectionalLight, Light, LightType, PointLight, SpotLight};
pub use material::Material;
pub use transform::{TransformHierarchy, TransformId};
