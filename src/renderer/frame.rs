//! 帧渲染
//!
//! 每帧的绘制流程：
//!
//! 1. 场景常量（相机位置、gamma、光源）写入一次，绑定到 b2
//! 2. 每个启用的实体：世界矩阵与逆转置 + 相机视图/投影写入 b0，材质写入 b1，索引绘制
//! 3. 关闭并执行命令列表、present、等待 GPU 排空队列
//!
//! 第 3 步的等待保证下一帧的常量缓冲区环不会覆盖 GPU 仍在读取的区域。

use std::time::Instant;

use tracing::{debug, warn};

use crate::component::{EntityId, Light, MaterialId, MeshId, TransformId};
use crate::core::error::{RenderError, Result};
use crate::renderer::buffers::{LightRecord, MaterialRecord, SceneRecord, TransformRecord};
use crate::renderer::command::{root_parameter, CommandRecorder};
use crate::renderer::resource::{StaticBuffer, UploadHeap};
use crate::renderer::ring::ConstantBufferRing;
use crate::renderer::sync::GpuFence;
use crate::geometry::Mesh;
use crate::scene::Scene;

/// 一帧的统计
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameStats {
    /// 从 1 开始的帧序号
    pub frame_index: u64,
    pub draw_count: u32,
    /// 本帧从常量缓冲区环预留的字节数
    pub constant_buffer_bytes: u64,
    /// 帧末等待的 fence 值
    pub fence_value: u64,
}

/// 前向渲染器
pub struct FrameRenderer<H: UploadHeap, C: CommandRecorder, F: GpuFence> {
    ring: ConstantBufferRing<H>,
    recorder: C,
    fence: F,
    vsync: bool,
    gamma: f32,
    frame_index: u64,
}

impl<H: UploadHeap, C: CommandRecorder, F: GpuFence> FrameRenderer<H, C, F> {
    pub fn new(ring: ConstantBufferRing<H>, recorder: C, fence: F, vsync: bool, gamma: f32) -> Self {
        Self {
            ring,
            recorder,
            fence,
            vsync,
            gamma,
            frame_index: 0,
        }
    }

    /// 渲染一帧
    ///
    /// 所有绘制数据在开始录制前解析。录制或提交失败时丢弃本帧，
    /// 渲染器保持可用。
    pub fn render(&mut self, scene: &mut Scene) -> Result<FrameStats> {
        let _span = crate::span_trace!("render_frame").entered();
        let start = Instant::now();

        let lights: Vec<LightRecord> = scene.lights().iter().map(Light::to_record).collect();
        let scene_record = SceneRecord::new(&scene.camera_position()?, self.gamma, &lights);
        let draws = prepare_draws(scene)?;

        self.frame_index += 1;
        self.ring.begin_frame();
        self.recorder.begin_frame()?;

        if let Err(e) = self.record_and_submit(&scene_record, &draws) {
            self.recorder.discard_frame();
            // 可能已经提交了一部分，先排空再复用常量缓冲区环
            if let Err(wait) = self.fence.wait_for_gpu() {
                warn!(error = %wait, "Failed to drain queue after a discarded frame");
            }
            self.ring.end_frame();
            warn!(frame = self.frame_index, error = %e, "Frame discarded");
            return Err(e);
        }

        let fence_value = self.fence.wait_for_gpu()?;
        let constant_buffer_bytes = self.ring.end_frame();

        let stats = FrameStats {
            frame_index: self.frame_index,
            draw_count: draws.len() as u32,
            constant_buffer_bytes,
            fence_value: fence_value.value(),
        };
        debug!(
            frame = stats.frame_index,
            draws = stats.draw_count,
            cbuffer_bytes = stats.constant_buffer_bytes,
            elapsed_us = start.elapsed().as_micros() as u64,
            "Frame rendered"
        );
        Ok(stats)
    }

    fn record_and_submit(&mut self, scene_record: &SceneRecord, draws: &[PreparedDraw]) -> Result<()> {
        let region = self.ring.fill_next_pod(scene_record)?;
        self.recorder
            .set_descriptor_table(root_parameter::SCENE, region.descriptor)?;

        for draw in draws {
            let region = self.ring.fill_next_pod(&draw.transform)?;
            self.recorder
                .set_descriptor_table(root_parameter::TRANSFORM, region.descriptor)?;

            let region = self.ring.fill_next_pod(&draw.material)?;
            self.recorder
                .set_descriptor_table(root_parameter::MATERIAL, region.descriptor)?;

            self.recorder
                .set_geometry(&draw.vertex_buffer, Mesh::VERTEX_STRIDE, &draw.index_buffer)?;
            self.recorder.draw_indexed(draw.index_count)?;
        }

        self.recorder.close_and_execute()?;
        self.recorder.present(self.vsync)
    }

    /// 窗口尺寸变化，宽或高为 0（最小化）时忽略
    pub fn resize(&mut self, scene: &mut Scene, width: u32, height: u32) {
        if width == 0 || height == 0 {
            return;
        }
        scene
            .camera_mut()
            .update_projection(width as f32 / height as f32);
        debug!(width, height, "Projection updated");
    }

    pub fn frame_index(&self) -> u64 {
        self.frame_index
    }

    pub fn vsync(&self) -> bool {
        self.vsync
    }

    pub fn set_vsync(&mut self, vsync: bool) {
        self.vsync = vsync;
    }

    pub fn gamma(&self) -> f32 {
        self.gamma
    }

    pub fn ring(&self) -> &ConstantBufferRing<H> {
        &self.ring
    }

    pub fn recorder(&self) -> &C {
        &self.recorder
    }

    pub fn fence(&self) -> &F {
        &self.fence
    }
}

/// 一次绘制的常量和几何数据
struct PreparedDraw {
    transform: TransformRecord,
    material: MaterialRecord,
    vertex_buffer: StaticBuffer,
    index_buffer: StaticBuffer,
    index_count: u32,
}

/// 解析每个启用实体的矩阵、材质和网格
fn prepare_draws(scene: &mut Scene) -> Result<Vec<PreparedDraw>> {
    let targets: Vec<(EntityId, TransformId, MeshId, MaterialId)> = scene
        .entities()
        .filter(|(_, entity)| entity.enabled)
        .map(|(id, entity)| (id, entity.transform(), entity.mesh(), entity.material()))
        .collect();

    let view = scene.camera().view();
    let projection = scene.camera().projection();
    let mut draws = Vec::with_capacity(targets.len());

    for (entity, transform, mesh_id, material_id) in targets {
        let transforms = scene.transforms_mut();
        if !transforms.contains(transform) {
            return Err(RenderError::Runtime(format!(
                "Entity {:?} references a destroyed transform node",
                entity
            )));
        }
        let world = transforms.world_matrix(transform)?;
        let world_inverse_transpose = transforms.world_inverse_transpose_matrix(transform)?;

        let material = scene
            .material(material_id)
            .ok_or_else(|| RenderError::Runtime("Entity references a missing material".to_string()))?;
        let mesh = scene
            .mesh(mesh_id)
            .ok_or_else(|| RenderError::Runtime("Entity references a missing mesh".to_string()))?;

        draws.push(PreparedDraw {
            transform: TransformRecord::new(&world, &view, &projection, &world_inverse_transpose),
            material: material.to_record(),
            vertex_buffer: *mesh.vertex_buffer(),
            index_buffer: *mesh.index_buffer(),
            index_count: mesh.index_count(),
        });
    }
    Ok(draws)
}
