/// 模型加载器模块
///
/// 统一的加载接口 [`MeshLoader`]，以及按扩展名分发的 [`load_mesh`]。
/// 目前只支持 Wavefront OBJ（使用 tobj crate）。
use crate::core::error::{MeshLoadError, Result};
use crate::geometry::mesh::MeshData;
use std::path::Path;

pub mod obj_loader;

pub use obj_loader::ObjLoader;

/// 网格加载器 trait
///
/// 加载器无状态，只返回 CPU 侧的 [`MeshData`]，不涉及 GPU 资源。
pub trait MeshLoader {
    /// 从文件路径加载网格
    ///
    /// 文件不存在时返回 [`MeshLoadError::FileNotFound`]，
    /// 内容无法解析时返回 [`MeshLoadError::ParseError`]。
    fn load_from_file(path: &Path) -> Result<MeshData>;

    /// 从内存数据加载网格
    fn load_from_memory(data: &[u8]) -> Result<MeshData>;

    /// 支持的文件扩展名（小写，不含点号）
    fn supported_extensions() -> &'static [&'static str];
}

/// 根据文件扩展名选择加载器
pub fn load_mesh(path: &Path) -> Result<MeshData> {
    let extension = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_lowercase())
        .ok_or_else(|| {
            MeshLoadError::UnsupportedFormat(format!("{} has no file extension", path.display()))
        })?;

    if ObjLoader::supported_extensions().contains(&extension.as_str()) {
        ObjLoader::load_from_file(path)
    } else {
        Err(MeshLoadError::UnsupportedFormat(format!("Unsupported mesh format: .{}", extension)).into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::error::RenderError;

    #[test]
    fn test_supported_extensions() {
        assert!(ObjLoader::supported_extensions().contains(&"obj"));
    }

    #[test]
    fn test_load_mesh_rejects_unknown_extension() {
        let err = load_mesh(Path::new("model.fbx")).unwrap_err();
        assert!(matches!(
            err,
            RenderError::MeshLoading(MeshLoadError::UnsupportedFormat(_))
        ));
        assert!(load_mesh(Path::new("model")).is_err());
    }

    #[test]
    fn test_load_mesh_dispatches_obj() {
        let err = load_mesh(Path::new("missing/Model.OBJ")).unwrap_err();
        assert!(matches!(
            err,
            RenderError::MeshLoading(MeshLoadError::FileNotFound(_))
        ));
    }
}
