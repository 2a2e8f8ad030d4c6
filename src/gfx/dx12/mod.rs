//! DirectX 12 实现
//!
//! - [`Dx12UploadHeap`]：持久映射的上传堆 + 着色器可见的 CBV 描述符堆
//! - [`Dx12Device`]：静态顶点/索引缓冲区
//! - [`Dx12Fence`]：`ID3D12Fence` + 事件句柄
//! - [`Dx12CommandRecorder`]：命令分配器、命令列表与交换链
//!
//! 设备、队列、交换链、根签名和 PSO 由调用方创建后传入。

pub mod command;
pub mod device;
pub mod fence;
pub mod upload_heap;

pub use command::{Dx12CommandRecorder, Dx12RenderTargets};
pub use device::Dx12Device;
pub use fence::Dx12Fence;
pub use upload_heap::Dx12UploadHeap;

use windows::Win32::Graphics::Direct3D12::*;
use windows::Win32::Graphics::Dxgi::Common::DXGI_SAMPLE_DESC;

use crate::core::error::{GraphicsError, RenderError, Result};

/// 缓冲区资源描述
pub(crate) fn buffer_desc(size: u64) -> D3D12_RESOURCE_DESC {
    D3D12_RESOURCE_DESC {
        Dimension: D3D12_RESOURCE_DIMENSION_BUFFER,
        Width: size,
        Height: 1,
        DepthOrArraySize: 1,
        MipLevels: 1,
        SampleDesc: DXGI_SAMPLE_DESC { Count: 1, Quality: 0 },
        Layout: D3D12_TEXTURE_LAYOUT_ROW_MAJOR,
        ..Default::default()
    }
}

/// 在上传堆上创建一个 GENERIC_READ 状态的缓冲区
pub(crate) fn create_upload_buffer(device: &ID3D12Device, size: u64) -> Result<ID3D12Resource> {
    let heap_props = D3D12_HEAP_PROPERTIES {
        Type: D3D12_HEAP_TYPE_UPLOAD,
        ..Default::default()
    };
    let desc = buffer_desc(size);

    let mut resource: Option<ID3D12Resource> = None;
    unsafe {
        device
            .CreateCommittedResource(
                &heap_props,
                D3D12_HEAP_FLAG_NONE,
                &desc,
                D3D12_RESOURCE_STATE_GENERIC_READ,
                None,
                &mut resource,
            )
            .map_err(|e| resource_error(format!("Failed to create upload buffer of {} bytes", size), e))?;
    }
    resource.ok_or_else(|| {
        GraphicsError::ResourceCreation("CreateCommittedResource returned no resource".to_string()).into()
    })
}

pub(crate) fn resource_error(context: impl std::fmt::Display, e: windows::core::Error) -> RenderError {
    GraphicsError::ResourceCreation(format!("{}: {:?}", context, e)).into()
}

pub(crate) fn command_error(context: impl std::fmt::Display, e: windows::core::Error) -> RenderError {
    GraphicsError::CommandExecution(format!("{}: {:?}", context, e)).into()
}
