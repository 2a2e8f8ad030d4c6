//! 场景容器
//!
//! [`Scene`] 持有 Transform 层级、实体、网格、材质、光源和相机。
//! 所有对象都存放在 `slotmap` 中，通过句柄互相引用。

use std::collections::HashMap;
use std::path::Path;

use slotmap::SlotMap;
use tracing::info;

use crate::component::{
    Camera, CameraInput, Entity, EntityId, Light, Material, MaterialId, MeshId, TransformHierarchy,
    TransformId,
};
use crate::core::error::{RenderError, Result};
use crate::core::scene::{CameraConfig, SceneConfig};
use crate::geometry::loaders::load_mesh;
use crate::geometry::{Mesh, MeshData};
use crate::math::{utils, Vector3};
use crate::renderer::resource::GpuDevice;

/// 内置网格的名称前缀
pub const BUILTIN_MESH_PREFIX: &str = "builtin:";

/// 场景
pub struct Scene {
    transforms: TransformHierarchy,
    entities: SlotMap<EntityId, Entity>,
    meshes: SlotMap<MeshId, Mesh>,
    materials: SlotMap<MaterialId, Material>,
    lights: Vec<Light>,
    camera: Camera,
}

impl Scene {
    /// 创建只有相机的空场景
    pub fn new(camera: &CameraConfig, aspect: f32) -> Result<Self> {
        let mut transforms = TransformHierarchy::new();
        let camera = Camera::from_config(&mut transforms, camera, aspect)?;

        Ok(Self {
            transforms,
            entities: SlotMap::with_key(),
            meshes: SlotMap::with_key(),
            materials: SlotMap::with_key(),
            lights: Vec::new(),
            camera,
        })
    }

    /// 按场景描述构建场景
    ///
    /// 网格按来源去重：`builtin:quad`、`builtin:cube` 使用内置几何体，
    /// 其他路径相对 `base_dir` 加载。父子关系通过 `add_child` 建立。
    pub fn from_config<D: GpuDevice + ?Sized>(
        config: &SceneConfig,
        device: &mut D,
        base_dir: &Path,
        aspect: f32,
    ) -> Result<Self> {
        config.validate()?;

        let mut scene = Self::new(&config.camera, aspect)?;
        for light in &config.lights {
            scene.add_light(Light::from_config(light));
        }

        let mut mesh_cache: HashMap<&str, MeshId> = HashMap::new();
        let mut spawned: Vec<EntityId> = Vec::with_capacity(config.entities.len());

        for entity in &config.entities {
            let mesh = match mesh_cache.get(entity.mesh.as_str()) {
                Some(&mesh) => mesh,
                None => {
                    let data = load_mesh_source(&entity.mesh, base_dir)?;
                    let mesh = scene.add_mesh(Mesh::upload(&mut *device, &data)?);
                    mesh_cache.insert(entity.mesh.as_str(), mesh);
                    mesh
                }
            };
            let material = scene.add_material(Material::from_config(&entity.material)?);

            let id = scene.spawn(entity.name.clone(), mesh, material)?;
            let transform = scene.entity_transform(id)?;
            let transforms = scene.transforms_mut();
            transforms.set_position(transform, Vector3::from(entity.position))?;
            transforms.set_rotation(transform, utils::deg_to_rad_vec3(entity.rotation))?;
            transforms.set_scale(transform, Vector3::from(entity.scale))?;

            if let Some(parent) = entity.parent {
                let parent_transform = scene.entity_transform(spawned[parent])?;
                scene.transforms_mut().add_child(parent_transform, transform)?;
            }
            spawned.push(id);
        }

        info!(
            entities = scene.entity_count(),
            meshes = scene.meshes.len(),
            lights = scene.lights.len(),
            "Scene built"
        );
        Ok(scene)
    }

    // ---- 资源 ----

    pub fn add_mesh(&mut self, mesh: Mesh) -> MeshId {
        self.meshes.insert(mesh)
    }

    pub fn mesh(&self, id: MeshId) -> Option<&Mesh> {
        self.meshes.get(id)
    }

    pub fn add_material(&mut self, material: Material) -> MaterialId {
        self.materials.insert(material)
    }

    pub fn material(&self, id: MaterialId) -> Option<&Material> {
        self.materials.get(id)
    }

    pub fn add_light(&mut self, light: Light) {
        self.lights.push(light);
    }

    pub fn lights(&self) -> &[Light] {
        &self.lights
    }

    // ---- 实体 ----

    /// 创建实体，并为它分配一个单位变换的根节点
    pub fn spawn(&mut self, name: impl Into<String>, mesh: MeshId, material: MaterialId) -> Result<EntityId> {
        if !self.meshes.contains_key(mesh) {
            return Err(RenderError::Runtime("Cannot spawn entity with an unknown mesh".to_string()));
        }
        if !self.materials.contains_key(material) {
            return Err(RenderError::Runtime(
                "Cannot spawn entity with an unknown material".to_string(),
            ));
        }

        let transform = self.transforms.create();
        Ok(self.entities.insert(Entity::new(name, transform, mesh, material)))
    }

    /// 删除实体并销毁它的 Transform 节点
    ///
    /// 子节点成为根节点。节点已经通过 [`Scene::transforms_mut`] 销毁时只删除实体。
    /// 返回实体是否存在。
    pub fn despawn(&mut self, id: EntityId) -> Result<bool> {
        let Some(transform) = self.entities.get(id).map(Entity::transform) else {
            return Ok(false);
        };
        if self.transforms.contains(transform) {
            self.transforms.destroy(transform)?;
        }
        self.entities.remove(id);
        Ok(true)
    }

    pub fn entity(&self, id: EntityId) -> Option<&Entity> {
        self.entities.get(id)
    }

    pub fn entity_mut(&mut self, id: EntityId) -> Option<&mut Entity> {
        self.entities.get_mut(id)
    }

    pub fn entities(&self) -> impl Iterator<Item = (EntityId, &Entity)> + '_ {
        self.entities.iter()
    }

    pub fn entity_count(&self) -> usize {
        self.entities.len()
    }

    /// 实体的 Transform 节点
    pub fn entity_transform(&self, id: EntityId) -> Result<TransformId> {
        self.entities
            .get(id)
            .map(Entity::transform)
            .ok_or_else(|| RenderError::Runtime("Unknown entity handle".to_string()))
    }

    // ---- Transform 与相机 ----

    pub fn transforms(&self) -> &TransformHierarchy {
        &self.transforms
    }

    pub fn transforms_mut(&mut self) -> &mut TransformHierarchy {
        &mut self.transforms
    }

    pub fn camera(&self) -> &Camera {
        &self.camera
    }

    pub fn camera_mut(&mut self) -> &mut Camera {
        &mut self.camera
    }

    /// 处理一帧相机输入
    pub fn update_camera(&mut self, input: &CameraInput, delta_time: f32) -> Result<()> {
        self.camera.update(&mut self.transforms, input, delta_time)
    }

    /// 相机的世界位置
    pub fn camera_position(&self) -> Result<Vector3> {
        self.camera.position(&self.transforms)
    }
}

/// 按来源字符串生成网格数据
fn load_mesh_source(source: &str, base_dir: &Path) -> Result<MeshData> {
    match source.strip_prefix(BUILTIN_MESH_PREFIX) {
        Some("quad") => Ok(MeshData::quad()),
        Some("cube") => Ok(MeshData::cube()),
        Some(other) => Err(RenderError::Runtime(format!("Unknown builtin mesh '{}'", other))),
        None => load_mesh(&base_dir.join(source)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::scene::EntityConfig;
    use crate::math::utils::vec3_approx_eq;
    use crate::renderer::resource::HostDevice;

    fn empty_scene() -> Scene {
        Scene::new(&CameraConfig::default(), 16.0 / 9.0).unwrap()
    }

    #[test]
    fn test_spawn_and_despawn() {
        let mut device = HostDevice::new();
        let mut scene = empty_scene();
        let mesh = scene.add_mesh(Mesh::upload(&mut device, &MeshData::quad()).unwrap());
        let material = scene.add_material(Material::new());

        let a = scene.spawn("a", mesh, material).unwrap();
        let b = scene.spawn("b", mesh, material).unwrap();
        let ta = scene.entity_transform(a).unwrap();
        let tb = scene.entity_transform(b).unwrap();
        scene.transforms_mut().add_child(ta, tb).unwrap();

        assert_eq!(scene.entity_count(), 2);
        assert_eq!(scene.entity(a).unwrap().name(), "a");

        assert!(scene.despawn(a).unwrap());
        assert!(!scene.despawn(a).unwrap());
        assert!(!scene.transforms().contains(ta));
        assert_eq!(scene.transforms().parent(tb).unwrap(), None);
        assert_eq!(scene.entity_count(), 1);
    }

    #[test]
    fn test_despawn_after_node_destroyed() {
        let mut device = HostDevice::new();
        let mut scene = empty_scene();
        let mesh = scene.add_mesh(Mesh::upload(&mut device, &MeshData::quad()).unwrap());
        let material = scene.add_material(Material::new());

        let a = scene.spawn("a", mesh, material).unwrap();
        let ta = scene.entity_transform(a).unwrap();
        scene.transforms_mut().destroy(ta).unwrap();

        assert!(scene.despawn(a).unwrap());
        assert!(scene.entity(a).is_none());
        assert_eq!(scene.entity_count(), 0);
    }

    #[test]
    fn test_spawn_rejects_unknown_handles() {
        let mut device = HostDevice::new();
        let mut scene = empty_scene();
        let mesh = scene.add_mesh(Mesh::upload(&mut device, &MeshData::quad()).unwrap());
        let material = scene.add_material(Material::new());

        assert!(scene.spawn("bad mesh", MeshId::default(), material).is_err());
        assert!(scene.spawn("bad material", mesh, MaterialId::default()).is_err());
        assert_eq!(scene.entity_count(), 0);
        // 只有相机的节点
        assert_eq!(scene.transforms().len(), 1);
    }

    #[test]
    fn test_from_default_config() {
        let mut device = HostDevice::new();
        let config = SceneConfig::default();
        let mut scene = Scene::from_config(&config, &mut device, Path::new("."), 16.0 / 9.0).unwrap();

        assert_eq!(scene.entity_count(), 2);
        assert_eq!(scene.lights().len(), 1);
        // quad 和 cube 各上传一次顶点和索引缓冲区
        assert_eq!(device.buffer_count(), 4);

        let ids: Vec<EntityId> = scene.entities().map(|(id, _)| id).collect();
        let parent = scene.entity_transform(ids[0]).unwrap();
        let child = scene.entity_transform(ids[1]).unwrap();
        assert_eq!(scene.transforms().parent(child).unwrap(), Some(parent));

        // 子实体的世界位置 = 父位置 + 局部位置
        let world = scene.transforms_mut().world_matrix(child).unwrap();
        let translation = world.fixed_view::<3, 1>(0, 3).into_owned();
        assert!(vec3_approx_eq(&translation, &Vector3::new(1.5, 0.0, 2.0), 1e-6));

        let tint = scene.material(scene.entity(ids[1]).unwrap().material()).unwrap().color_tint();
        assert_eq!(tint, Vector3::new(1.0, 0.5, 0.25));
    }

    #[test]
    fn test_meshes_are_shared_by_source() {
        let mut device = HostDevice::new();
        let config = SceneConfig {
            entities: vec![
                EntityConfig::new("a", "builtin:cube"),
                EntityConfig::new("b", "builtin:cube"),
            ],
            ..SceneConfig::default()
        };
        let scene = Scene::from_config(&config, &mut device, Path::new("."), 1.0).unwrap();

        let meshes: Vec<MeshId> = scene.entities().map(|(_, e)| e.mesh()).collect();
        assert_eq!(meshes[0], meshes[1]);
        assert_eq!(device.buffer_count(), 2);
    }

    #[test]
    fn test_unknown_mesh_source_fails() {
        let mut device = HostDevice::new();
        let config = SceneConfig {
            entities: vec![EntityConfig::new("a", "builtin:teapot")],
            ..SceneConfig::default()
        };
        assert!(Scene::from_config(&config, &mut device, Path::new("."), 1.0).is_err());

        let config = SceneConfig {
            entities: vec![EntityConfig::new("a", "missing.obj")],
            ..SceneConfig::default()
        };
        assert!(Scene::from_config(&config, &mut device, Path::new("/nonexistent"), 1.0).is_err());
    }

    #[test]
    fn test_shipped_scene_file() {
        let root = Path::new(env!("CARGO_MANIFEST_DIR"));
        let config = SceneConfig::from_file(root.join("scene.toml")).unwrap();

        let mut device = HostDevice::new();
        let scene = Scene::from_config(&config, &mut device, root, 16.0 / 9.0).unwrap();

        assert_eq!(scene.entity_count(), 3);
        assert_eq!(scene.lights().len(), 3);
        assert_eq!(device.buffer_count(), 6);

        let pyramid = scene
            .entities()
            .find(|(_, e)| e.name() == "pyramid")
            .map(|(_, e)| e.mesh())
            .unwrap();
        // 5 个面：底面 2 个三角形 + 4 个侧面
        assert_eq!(scene.mesh(pyramid).unwrap().index_count(), 18);
    }

    #[test]
    fn test_update_camera_moves_camera_node() {
        let mut scene = empty_scene();
        let before = scene.camera_position().unwrap();

        let input = CameraInput {
            forward: true,
            ..Default::default()
        };
        scene.update_camera(&input, 1.0).unwrap();

        let after = scene.camera_position().unwrap();
        assert!(vec3_approx_eq(&(after - before), &Vector3::new(0.0, 0.0, 5.0), 1e-5));
    }
}
