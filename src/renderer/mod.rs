//! 渲染器模块
//!
//! 与具体图形 API 无关的渲染核心。GPU 相关的操作都经过这里定义的 trait：
//!
//! - [`resource::UploadHeap`]：常量缓冲区使用的上传堆和描述符堆
//! - [`resource::GpuDevice`]：静态顶点/索引缓冲区
//! - [`command::CommandRecorder`]：命令列表录制、提交和 present
//! - [`sync::GpuFence`]：CPU 等待 GPU
//!
//! 主机端实现（`HostUploadHeap`、`HostDevice`、`RecordingCommandList`、`HostFence`）
//! 用于测试和无窗口演示；Windows 上的 D3D12 实现在 `gfx::dx12` 中。

pub mod buffers;
pub mod command;
pub mod descriptor;
pub mod frame;
pub mod resource;
pub mod ring;
pub mod sync;

pub use command::{CommandRecorder, RecordingCommandList};
pub use frame::{FrameRenderer, FrameStats};
pub use resource::{GpuDevice, HostDevice, HostUploadHeap, StaticBuffer, UploadHeap};
pub use ring::{ConstantBufferRegion, ConstantBufferRing};
pub use sync::{FenceValue, GpuFence, HostFence};
