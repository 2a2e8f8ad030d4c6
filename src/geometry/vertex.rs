/// 几何体顶点定义模块
///
/// 定义交给光栅化阶段的交错顶点布局。

use bytemuck::{Pod, Zeroable};

/// 完整的3D顶点结构
///
/// 内存布局与输入布局描述一致，使用 `#[repr(C)]` 保证顺序和对齐。
///
/// # 内存布局
///
/// - position: 12 bytes (3 * f32)，偏移 0
/// - uv: 8 bytes (2 * f32)，偏移 12
/// - normal: 12 bytes (3 * f32)，偏移 20
/// - tangent: 12 bytes (3 * f32)，偏移 32
/// - **总计**: 44 bytes
#[repr(C)]
#[derive(Default, Clone, Copy, Debug, PartialEq, Pod, Zeroable)]
pub struct Vertex {
    /// 顶点位置 (x, y, z)
    pub position: [f32; 3],

    /// 纹理坐标 (u, v)，(0,0) 为纹理左上角
    pub uv: [f32; 2],

    /// 法线向量，归一化
    pub normal: [f32; 3],

    /// 切线向量，指向 +U 方向，与法线正交
    pub tangent: [f32; 3],
}

impl Vertex {
    /// 创建一个新的顶点
    #[inline]
    pub fn new(position: [f32; 3], uv: [f32; 2], normal: [f32; 3], tangent: [f32; 3]) -> Self {
        Self {
            position,
            uv,
            normal,
            tangent,
        }
    }

    /// 用于去重的精确位模式键（位置 + 法线 + UV）
    ///
    /// `0.0` 与 `-0.0` 视为不同顶点。
    pub fn dedup_key(&self) -> [u32; 8] {
        [
            self.position[0].to_bits(),
            self.position[1].to_bits(),
            self.position[2].to_bits(),
            self.normal[0].to_bits(),
            self.normal[1].to_bits(),
            self.normal[2].to_bits(),
            self.uv[0].to_bits(),
            self.uv[1].to_bits(),
        ]
    }
}
