//! forward_render 无窗口演示
//!
//! 加载配置和场景，用主机端的上传堆、命令列表和 fence 渲染若干帧，
//! 输出每帧的绘制数和常量缓冲区用量。
//!
//! # 使用方法
//!
//! ```bash
//! cargo run
//! cargo run -- --frames 10 --no-vsync
//! RUST_LOG=trace cargo run   # 查看常量缓冲区环回绕
//! ```

use std::path::Path;

use anyhow::{Context, Result};
use tracing::info;

use forward_render::component::CameraInput;
use forward_render::core::{log, Config, SceneConfig};
use forward_render::renderer::{
    ConstantBufferRing, FrameRenderer, HostDevice, HostFence, HostUploadHeap, RecordingCommandList,
};
use forward_render::scene::Scene;
use forward_render::{engine_error, engine_info, engine_warn};

/// 演示使用的固定帧时间
const FRAME_TIME: f32 = 1.0 / 60.0;

fn main() -> Result<()> {
    run().inspect_err(|e| engine_error!("forward_render failed: {:#}", e))
}

fn run() -> Result<()> {
    // 1. 加载配置（在初始化日志之前）
    let mut config = Config::from_file_or_default("config.toml");
    config.apply_args(std::env::args().skip(1));
    config.validate().context("Invalid configuration")?;

    // 2. 初始化日志系统
    let log_file = config
        .logging
        .file_output
        .then_some(config.logging.log_file.as_str());
    log::init_logger(config.logging.level, config.logging.file_output, log_file)
        .context("Failed to initialize logging")?;
    info!(version = env!("CARGO_PKG_VERSION"), "forward_render starting");

    // 3. 构建场景
    let scene_config = SceneConfig::from_file_or_default("scene.toml");
    let mut device = HostDevice::new();
    let mut scene = Scene::from_config(&scene_config, &mut device, Path::new("."), config.aspect_ratio())
        .context("Failed to build scene")?;
    info!(
        entities = scene.entity_count(),
        lights = scene.lights().len(),
        static_buffers = device.buffer_count(),
        "Scene ready"
    );

    // 4. 渲染器
    let max_cbuffers = config.graphics.max_cbuffers;
    let ring = ConstantBufferRing::new(HostUploadHeap::for_cbuffers(max_cbuffers), max_cbuffers)
        .context("Failed to create constant buffer ring")?;
    let mut renderer = FrameRenderer::new(
        ring,
        RecordingCommandList::new(),
        HostFence::new(),
        config.graphics.vsync,
        config.graphics.gamma,
    );
    renderer.resize(&mut scene, config.window.width, config.window.height);

    // 5. 帧循环：相机缓慢前进
    let input = CameraInput {
        forward: true,
        ..Default::default()
    };
    for _ in 0..config.run.frames {
        scene
            .update_camera(&input, FRAME_TIME)
            .context("Camera update failed")?;
        let stats = renderer.render(&mut scene).context("Frame failed")?;
        engine_info!(
            frame = stats.frame_index,
            draws = stats.draw_count,
            cbuffer_bytes = stats.constant_buffer_bytes,
            fence = stats.fence_value,
            "Frame complete"
        );
        if renderer.ring().frame_overflowed() {
            engine_warn!(
                frame = stats.frame_index,
                "Raise graphics.max_cbuffers, this frame overwrote its own constants"
            );
        }
    }

    info!(
        frames = renderer.frame_index(),
        ring_wraps = renderer.ring().wrap_count(),
        "forward_render finished"
    );
    Ok(())
}
