/// OBJ 文件加载器
///
/// 使用 tobj crate 解析 Wavefront OBJ，转换到左手坐标系。
use super::MeshLoader;
use crate::core::error::{MeshLoadError, Result};
use crate::geometry::mesh::MeshData;
use crate::geometry::vertex::Vertex;
use crate::math::geometry::{compute_tangent_space, reconstruct_normals};
use std::collections::HashMap;
use std::io::BufReader;
use std::path::Path;

/// OBJ 格式加载器
///
/// # 转换规则
///
/// - 位置和法线的 z 取反（右手 → 左手）
/// - 纹理坐标 `v' = 1 - v`（OBJ 原点在左下，D3D 在左上）
/// - 三角形 (a, b, c) 输出为 (a, c, b)，保持正面朝向
/// - 多边形按扇形三角化：(a,b,c) + (a,c,d) + ...
/// - 位置、法线、UV 逐位相同的顶点合并，首次出现的下标保留
/// - 缺少法线时由面几何重建，最后计算切线
///
/// # 使用示例
///
/// ```rust,no_run
/// use forward_render::geometry::loaders::{MeshLoader, ObjLoader};
/// use std::path::Path;
///
/// let mesh = ObjLoader::load_from_file(Path::new("model.obj"))?;
/// println!("{} vertices", mesh.vertex_count());
/// # Ok::<(), Box<dyn std::error::Error>>(())
/// ```
pub struct ObjLoader;

impl ObjLoader {
    fn load_options() -> tobj::LoadOptions {
        tobj::LoadOptions {
            triangulate: true,
            single_index: false,
            ..Default::default()
        }
    }

    /// 把 tobj 的模型转换成去重后的网格
    fn convert(models: &[tobj::Model], name: &str) -> Result<MeshData> {
        let mut mesh_data = MeshData::with_name(name);
        let mut unique: HashMap<[u32; 8], u32> = HashMap::new();
        let mut all_normals = true;

        for model in models {
            let mesh = &model.mesh;
            let has_normals = !mesh.normals.is_empty() && mesh.normal_indices.len() == mesh.indices.len();
            let has_uvs = !mesh.texcoords.is_empty() && mesh.texcoord_indices.len() == mesh.indices.len();
            all_normals &= has_normals;

            for triangle in 0..mesh.indices.len() / 3 {
                let base = triangle * 3;
                for corner in [base, base + 2, base + 1] {
                    let [x, y, z] = read3(&mesh.positions, mesh.indices[corner], "position")?;
                    let normal = if has_normals {
                        let [nx, ny, nz] = read3(&mesh.normals, mesh.normal_indices[corner], "normal")?;
                        [nx, ny, -nz]
                    } else {
                        [0.0; 3]
                    };
                    let [u, v] = if has_uvs {
                        read2(&mesh.texcoords, mesh.texcoord_indices[corner])?
                    } else {
                        [0.0, 0.0]
                    };

                    let vertex = Vertex::new([x, y, -z], [u, 1.0 - v], normal, [0.0; 3]);
                    let next = mesh_data.vertices.len() as u32;
                    let index = *unique.entry(vertex.dedup_key()).or_insert_with(|| {
                        mesh_data.vertices.push(vertex);
                        next
                    });
                    mesh_data.indices.push(index);
                }
            }
        }

        if !all_normals {
            tracing::debug!(mesh = name, "OBJ has no normals, reconstructing from faces");
            reconstruct_normals(&mut mesh_data.vertices, &mesh_data.indices);
        }
        compute_tangent_space(&mut mesh_data.vertices, &mesh_data.indices);

        mesh_data.validate()?;

        tracing::info!(
            mesh = name,
            vertices = mesh_data.vertex_count(),
            triangles = mesh_data.triangle_count(),
            "OBJ mesh loaded"
        );
        Ok(mesh_data)
    }
}

impl MeshLoader for ObjLoader {
    fn load_from_file(path: &Path) -> Result<MeshData> {
        if !path.exists() {
            return Err(MeshLoadError::FileNotFound(path.to_path_buf()).into());
        }

        let (models, _materials) = tobj::load_obj(path, &Self::load_options()).map_err(|e| match e {
            tobj::LoadError::OpenFileFailed | tobj::LoadError::ReadError => {
                MeshLoadError::FileNotFound(path.to_path_buf())
            }
            other => MeshLoadError::ParseError(format!("{}: {}", path.display(), other)),
        })?;

        let name = path.file_stem().and_then(|s| s.to_str()).unwrap_or("unnamed");
        Self::convert(&models, name)
    }

    fn load_from_memory(data: &[u8]) -> Result<MeshData> {
        let mut reader = BufReader::new(data);
        // 内存中的 OBJ 不加载 mtllib
        let (models, _materials) =
            tobj::load_obj_buf(&mut reader, &Self::load_options(), |_| Err(tobj::LoadError::OpenFileFailed))
                .map_err(|e| MeshLoadError::ParseError(e.to_string()))?;

        Self::convert(&models, "memory")
    }

    fn supported_extensions() -> &'static [&'static str] {
        &["obj"]
    }
}

fn read3(data: &[f32], index: u32, what: &str) -> Result<[f32; 3]> {
    let start = index as usize * 3;
    match data.get(start..start + 3) {
        Some(s) => Ok([s[0], s[1], s[2]]),
        None => Err(MeshLoadError::InvalidGeometry(format!("{} index {} out of range", what, index)).into()),
    }
}

fn read2(data: &[f32], index: u32) -> Result<[f32; 2]> {
    let start = index as usize * 2;
    match data.get(start..start + 2) {
        Some(s) => Ok([s[0], s[1]]),
        None => Err(MeshLoadError::InvalidGeometry(format!("texcoord index {} out of range", index)).into()),
    }
}
