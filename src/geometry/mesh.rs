/// 网格数据结构模块
///
/// - [`MeshData`]：CPU 侧的顶点/索引数据，由加载器或内置几何体生成
/// - [`Mesh`]：上传到 GPU 的静态顶点缓冲区和索引缓冲区

use super::vertex::Vertex;
use crate::core::error::{MeshLoadError, Result};
use crate::math::Vector3;
use crate::renderer::resource::{GpuDevice, StaticBuffer};

/// CPU 侧网格数据
///
/// 三角形列表，u32 索引，顺时针为正面（左手坐标系）。
#[derive(Debug, Clone, Default)]
pub struct MeshData {
    /// 顶点数组
    pub vertices: Vec<Vertex>,

    /// 索引数组，每 3 个索引定义一个三角形
    pub indices: Vec<u32>,

    /// 网格名称，用于日志和调试
    pub name: Option<String>,
}

impl MeshData {
    /// 创建一个空的网格数据
    pub fn new() -> Self {
        Self::default()
    }

    /// 创建一个指定名称的空网格数据
    pub fn with_name(name: impl Into<String>) -> Self {
        Self {
            name: Some(name.into()),
            ..Self::default()
        }
    }

    #[inline]
    pub fn vertex_count(&self) -> usize {
        self.vertices.len()
    }

    #[inline]
    pub fn index_count(&self) -> usize {
        self.indices.len()
    }

    #[inline]
    pub fn triangle_count(&self) -> usize {
        self.indices.len() / 3
    }

    /// 验证网格数据的有效性
    ///
    /// 检查：
    /// - 至少有一个三角形
    /// - 索引数量是 3 的倍数
    /// - 所有索引都在顶点范围内
    pub fn validate(&self) -> Result<()> {
        if self.indices.is_empty() {
            return Err(MeshLoadError::ValidationError("Mesh contains no triangles".to_string()).into());
        }

        if self.indices.len() % 3 != 0 {
            return Err(MeshLoadError::ValidationError(format!(
                "Index count must be a multiple of 3, got {}",
                self.indices.len()
            ))
            .into());
        }

        let vertex_count = self.vertices.len();
        if let Some((i, &index)) = self
            .indices
            .iter()
            .enumerate()
            .find(|(_, index)| **index as usize >= vertex_count)
        {
            return Err(MeshLoadError::ValidationError(format!(
                "Index {} at position {} is out of range ({} vertices)",
                index, i, vertex_count
            ))
            .into());
        }

        Ok(())
    }

    /// 内置四边形
    ///
    /// 位于 XY 平面，边长 2，法线朝 -Z（面向默认相机）。
    pub fn quad() -> Self {
        let normal = [0.0, 0.0, -1.0];
        let tangent = [1.0, 0.0, 0.0];

        Self {
            vertices: vec![
                Vertex::new([-1.0, 1.0, 0.0], [0.0, 0.0], normal, tangent),
                Vertex::new([1.0, 1.0, 0.0], [1.0, 0.0], normal, tangent),
                Vertex::new([1.0, -1.0, 0.0], [1.0, 1.0], normal, tangent),
                Vertex::new([-1.0, -1.0, 0.0], [0.0, 1.0], normal, tangent),
            ],
            indices: vec![0, 1, 2, 0, 2, 3],
            name: Some("builtin:quad".to_string()),
        }
    }

    /// 内置单位立方体
    ///
    /// 中心在原点，每个面 4 个独立顶点，共 24 个顶点、36 个索引。
    pub fn cube() -> Self {
        // (法线, 观察者视角下的上方向)
        let faces = [
            (Vector3::x(), Vector3::y()),
            (-Vector3::x(), Vector3::y()),
            (Vector3::y(), Vector3::z()),
            (-Vector3::y(), -Vector3::z()),
            (Vector3::z(), Vector3::y()),
            (-Vector3::z(), Vector3::y()),
        ];
        let corners = [
            (-1.0, 1.0, [0.0, 0.0]),
            (1.0, 1.0, [1.0, 0.0]),
            (1.0, -1.0, [1.0, 1.0]),
            (-1.0, -1.0, [0.0, 1.0]),
        ];

        let mut mesh = Self::with_name("builtin:cube");
        for (normal, up) in faces {
            // 左手坐标系下，看向 -normal 时的右方向
            let right = normal.cross(&up);
            let base = mesh.vertices.len() as u32;

            for (x, y, uv) in corners {
                let position = (normal + right * x + up * y) * 0.5;
                mesh.vertices.push(Vertex::new(
                    position.into(),
                    uv,
                    normal.into(),
                    right.into(),
                ));
            }
            mesh.indices
                .extend_from_slice(&[base, base + 1, base + 2, base, base + 2, base + 3]);
        }
        mesh
    }
}

/// GPU 网格
///
/// 顶点和索引缓冲区创建后不再修改，由创建它们的设备持有。
#[derive(Debug, Clone, PartialEq)]
pub struct Mesh {
    name: String,
    vertex_buffer: StaticBuffer,
    index_buffer: StaticBuffer,
    vertex_count: u32,
    index_count: u32,
}

impl Mesh {
    /// 顶点步长（字节）
    pub const VERTEX_STRIDE: u32 = std::mem::size_of::<Vertex>() as u32;

    /// 验证并上传网格数据
    pub fn upload<D: GpuDevice + ?Sized>(device: &mut D, data: &MeshData) -> Result<Self> {
        data.validate()?;

        let vertex_buffer = device.create_static_buffer(bytemuck::cast_slice(&data.vertices))?;
        let index_buffer = device.create_static_buffer(bytemuck::cast_slice(&data.indices))?;

        let name = data.name.clone().unwrap_or_else(|| "unnamed".to_string());
        tracing::debug!(
            mesh = %name,
            vertices = data.vertex_count(),
            indices = data.index_count(),
            "Mesh uploaded"
        );

        Ok(Self {
            name,
            vertex_buffer,
            index_buffer,
            vertex_count: data.vertex_count() as u32,
            index_count: data.index_count() as u32,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn vertex_buffer(&self) -> &StaticBuffer {
        &self.vertex_buffer
    }

    pub fn index_buffer(&self) -> &StaticBuffer {
        &self.index_buffer
    }

    pub fn vertex_count(&self) -> u32 {
        self.vertex_count
    }

    pub fn index_count(&self) -> u32 {
        self.index_count
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::renderer::resource::HostDevice;

    fn assert_faces_match_normals(mesh: &MeshData) {
        for triangle in mesh.indices.chunks_exact(3) {
            let [a, b, c] = [
                &mesh.vertices[triangle[0] as usize],
                &mesh.vertices[triangle[1] as usize],
                &mesh.vertices[triangle[2] as usize],
            ];
            let p0 = Vector3::from(a.position);
            let face = (Vector3::from(b.position) - p0).cross(&(Vector3::from(c.position) - p0));
            assert!(face.dot(&Vector3::from(a.normal)) > 0.0);
        }
    }

    #[test]
    fn test_mesh_data_counts() {
        let mut mesh = MeshData::with_name("TestMesh");
        mesh.vertices.extend_from_slice(&[Vertex::default(); 3]);
        mesh.indices.extend_from_slice(&[0, 1, 2]);

        assert_eq!(mesh.name.as_deref(), Some("TestMesh"));
        assert_eq!(mesh.vertex_count(), 3);
        assert_eq!(mesh.index_count(), 3);
        assert_eq!(mesh.triangle_count(), 1);
        assert!(mesh.validate().is_ok());
    }

    #[test]
    fn test_validation_rejects_bad_indices() {
        let mut mesh = MeshData::new();
        assert!(mesh.validate().is_err());

        mesh.vertices.extend_from_slice(&[Vertex::default(); 3]);
        mesh.indices.extend_from_slice(&[0, 1]);
        assert!(mesh.validate().is_err());

        mesh.indices.push(3);
        assert!(mesh.validate().is_err());
    }

    #[test]
    fn test_builtin_quad() {
        let quad = MeshData::quad();
        assert_eq!(quad.vertex_count(), 4);
        assert_eq!(quad.index_count(), 6);
        assert!(quad.validate().is_ok());
        assert_faces_match_normals(&quad);
    }

    #[test]
    fn test_builtin_cube() {
        let cube = MeshData::cube();
        assert_eq!(cube.vertex_count(), 24);
        assert_eq!(cube.index_count(), 36);
        assert!(cube.validate().is_ok());
        assert_faces_match_normals(&cube);

        for v in &cube.vertices {
            assert!(v.position.iter().all(|c| c.abs() == 0.5));
            let n = Vector3::from(v.normal);
            let t = Vector3::from(v.tangent);
            assert!(n.dot(&t).abs() < 1e-6);
        }
    }

    #[test]
    fn test_upload() {
        let mut device = HostDevice::new();
        let mesh = Mesh::upload(&mut device, &MeshData::quad()).unwrap();

        assert_eq!(mesh.index_count(), 6);
        assert_eq!(mesh.vertex_count(), 4);
        assert_eq!(mesh.name(), "builtin:quad");
        assert_eq!(mesh.vertex_buffer().size, 4 * Mesh::VERTEX_STRIDE as u64);
        assert_eq!(mesh.index_buffer().size, 6 * 4);

        let indices = device.buffer_contents(mesh.index_buffer()).unwrap();
        assert_eq!(bytemuck::pod_read_unaligned::<[u32; 6]>(indices), [0, 1, 2, 0, 2, 3]);
    }

    #[test]
    fn test_upload_rejects_empty_mesh() {
        let mut device = HostDevice::new();
        assert!(Mesh::upload(&mut device, &MeshData::new()).is_err());
        assert_eq!(device.buffer_count(), 0);
    }
}
