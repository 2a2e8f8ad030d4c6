//! forward_render - 前向渲染核心
//!
//! 一个 D3D12 风格的前向渲染器核心，两块重点：
//!
//! - Transform 层级：arena + 代际句柄，世界矩阵和方向向量惰性重算
//! - 常量缓冲区环：固定大小的上传堆，按 256 字节对齐逐绘制流式写入常量
//!
//! # 模块结构
//!
//! - `core`: 配置、日志、错误处理、场景描述文件
//! - `math`: nalgebra 类型别名，左手坐标系的视图/投影矩阵
//! - `geometry`: 顶点格式、网格数据、OBJ 加载器
//! - `component`: Transform、相机、光源、材质、实体
//! - `renderer`: 常量缓冲区环、命令录制、同步、帧循环
//! - `scene`: 场景容器
//! - `gfx`: DirectX 12 实现（仅 Windows）
//!
//! # 使用示例
//!
//! ```no_run
//! use forward_render::core::SceneConfig;
//! use forward_render::renderer::{
//!     ConstantBufferRing, FrameRenderer, HostDevice, HostFence, HostUploadHeap, RecordingCommandList,
//! };
//! use forward_render::scene::Scene;
//! use std::path::Path;
//!
//! let mut device = HostDevice::new();
//! let mut scene = Scene::from_config(&SceneConfig::default(), &mut device, Path::new("."), 16.0 / 9.0)?;
//!
//! let ring = ConstantBufferRing::new(HostUploadHeap::for_cbuffers(1000), 1000)?;
//! let mut renderer = FrameRenderer::new(ring, RecordingCommandList::new(), HostFence::new(), true, 2.2);
//! let stats = renderer.render(&mut scene)?;
//! println!("{} draws", stats.draw_count);
//! # Ok::<(), forward_render::core::RenderError>(())
//! ```

pub mod component;
pub mod core;
pub mod geometry;
pub mod gfx;
pub mod math;
pub mod renderer;
pub mod scene;
