//! 图形后端模块
//!
//! 渲染核心 trait（`UploadHeap`、`GpuDevice`、`GpuFence`、`CommandRecorder`）的
//! 图形 API 实现。目前只有 Windows 上的 DirectX 12。

#[cfg(target_os = "windows")]
pub mod dx12;

#[cfg(target_os = "windows")]
pub use dx12::{Dx12CommandRecorder, Dx12Device, Dx12Fence, Dx12RenderTargets, Dx12UploadHeap};
