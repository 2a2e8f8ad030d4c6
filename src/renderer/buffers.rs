//! 常量缓冲区数据结构
//!
//! 着色器读取的逐绘制/逐帧常量，布局与 HLSL cbuffer 逐字节一致。
//! 所有结构都是 `#[repr(C)]` + `Pod`，可以直接用 `bytemuck::bytes_of` 写入上传堆。

use bytemuck::{Pod, Zeroable};
use tracing::warn;

use crate::math::{matrix, Matrix4, Vector3};

/// 场景常量中光源数组的长度
pub const MAX_LIGHTS: usize = 16;

/// 材质可引用的纹理数量上限
pub const MAX_MATERIAL_TEXTURES: usize = 32;

/// 逐绘制的变换常量（b0）
///
/// 每个矩阵 64 字节，共 256 字节，正好占一个常量缓冲区对齐单元。
#[repr(C)]
#[derive(Clone, Copy, Debug, PartialEq, Pod, Zeroable)]
pub struct TransformRecord {
    pub world: [[f32; 4]; 4],
    pub view: [[f32; 4]; 4],
    pub projection: [[f32; 4]; 4],
    pub world_inverse_transpose: [[f32; 4]; 4],
}

impl TransformRecord {
    pub fn new(
        world: &Matrix4,
        view: &Matrix4,
        projection: &Matrix4,
        world_inverse_transpose: &Matrix4,
    ) -> Self {
        Self {
            world: matrix::to_cols_array(world),
            view: matrix::to_cols_array(view),
            projection: matrix::to_cols_array(projection),
            world_inverse_transpose: matrix::to_cols_array(world_inverse_transpose),
        }
    }
}

/// 逐绘制的材质常量（b1）
#[repr(C)]
#[derive(Clone, Copy, Debug, PartialEq, Pod, Zeroable)]
pub struct MaterialRecord {
    pub uv_scale: [f32; 2],
    pub uv_offset: [f32; 2],
    pub color_tint: [f32; 3],
    /// `texture_indices` 中有效项的数量
    pub texture_count: u32,
    pub texture_indices: [u32; MAX_MATERIAL_TEXTURES],
}

/// GPU 光源（64 字节）
///
/// `light_type`：0 方向光，1 点光源，2 聚光灯。角度为弧度。
#[repr(C)]
#[derive(Clone, Copy, Debug, Default, PartialEq, Pod, Zeroable)]
pub struct LightRecord {
    pub light_type: u32,
    pub direction: [f32; 3],
    pub range: f32,
    pub position: [f32; 3],
    pub intensity: f32,
    pub color: [f32; 3],
    pub spot_inner_angle: f32,
    pub spot_outer_angle: f32,
    pub _padding: [f32; 2],
}

/// 逐帧的场景常量（b2）
#[repr(C)]
#[derive(Clone, Copy, Debug, PartialEq, Pod, Zeroable)]
pub struct SceneRecord {
    pub camera_position: [f32; 3],
    pub gamma: f32,
    pub lights: [LightRecord; MAX_LIGHTS],
    pub light_count: u32,
    pub _padding: [u32; 3],
}

impl SceneRecord {
    /// 打包相机位置和光源
    ///
    /// 超过 [`MAX_LIGHTS`] 的光源被丢弃。
    pub fn new(camera_position: &Vector3, gamma: f32, lights: &[LightRecord]) -> Self {
        if lights.len() > MAX_LIGHTS {
            warn!(
                lights = lights.len(),
                max = MAX_LIGHTS,
                "Too many lights for the scene constant buffer, extra lights ignored"
            );
        }

        let mut record = Self {
            camera_position: (*camera_position).into(),
            gamma,
            lights: [LightRecord::default(); MAX_LIGHTS],
            light_count: 0,
            _padding: [0; 3],
        };

        let count = lights.len().min(MAX_LIGHTS);
        record.lights[..count].copy_from_slice(&lights[..count]);
        record.light_count = count as u32;
        record
    }
}
