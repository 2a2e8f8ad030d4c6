/// 几何体模块
///
/// 顶点定义、网格数据结构以及模型加载器。
///
/// ```text
/// 文件 (OBJ) / 内置几何体
///     ↓
/// MeshData (CPU 侧数据)
///     ↓  Mesh::upload
/// Mesh (GPU 静态缓冲区)
/// ```

pub mod loaders;
pub mod mesh;
pub mod vertex;

// 重新导出常用类型
pub use mesh::{Mesh, MeshData};
pub use vertex::Vertex;
