//! 可绘制实体
//!
//! 实体把一个 Transform 节点、一个网格和一个材质组合在一起。
//! 三者都以句柄引用，实际数据由 [`Scene`](crate::scene::Scene) 持有。

use slotmap::new_key_type;

use super::transform::TransformId;

new_key_type! {
    /// 实体句柄
    pub struct EntityId;
    /// 网格句柄
    pub struct MeshId;
    /// 材质句柄
    pub struct MaterialId;
}

/// 场景中的实体
#[derive(Debug, Clone)]
pub struct Entity {
    name: String,
    transform: TransformId,
    mesh: MeshId,
    material: MaterialId,

    /// 是否参与绘制
    pub enabled: bool,
}

impl Entity {
    pub fn new(name: impl Into<String>, transform: TransformId, mesh: MeshId, material: MaterialId) -> Self {
        Self {
            name: name.into(),
            transform,
            mesh,
            material,
            enabled: true,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn transform(&self) -> TransformId {
        self.transform
    }

    pub fn mesh(&self) -> MeshId {
        self.mesh
    }

    pub fn set_mesh(&mut self, mesh: MeshId) {
        self.mesh = mesh;
    }

    pub fn material(&self) -> MaterialId {
        self.material
    }

    pub fn set_material(&mut self, material: MaterialId) {
        self.material = material;
    }
}
