//! DX12 静态缓冲区

use tracing::debug;
use windows::Win32::Graphics::Direct3D12::*;

use super::{create_upload_buffer, resource_error, Dx12Fence};
use crate::core::error::{GraphicsError, Result};
use crate::renderer::resource::{GpuDevice, StaticBuffer};
use crate::renderer::sync::GpuFence;

/// 静态顶点/索引缓冲区的创建者和持有者
///
/// 缓冲区放在上传堆上，Map 拷贝后 Unmap。每次创建后排空一次队列。
pub struct Dx12Device {
    device: ID3D12Device,
    fence: Dx12Fence,
    buffers: Vec<ID3D12Resource>,
}

impl Dx12Device {
    pub fn new(device: ID3D12Device, queue: &ID3D12CommandQueue) -> Result<Self> {
        let fence = Dx12Fence::new(&device, queue)?;
        Ok(Self {
            device,
            fence,
            buffers: Vec::new(),
        })
    }

    pub fn device(&self) -> &ID3D12Device {
        &self.device
    }

    /// 持有的缓冲区数量
    pub fn buffer_count(&self) -> usize {
        self.buffers.len()
    }
}

impl GpuDevice for Dx12Device {
    fn create_static_buffer(&mut self, data: &[u8]) -> Result<StaticBuffer> {
        if data.is_empty() {
            return Err(GraphicsError::ResourceCreation(
                "Static buffer must not be empty".to_string(),
            )
            .into());
        }

        let size = data.len() as u64;
        let resource = create_upload_buffer(&self.device, size)?;

        let gpu_address = unsafe {
            let mut mapped = std::ptr::null_mut();
            resource
                .Map(0, None, Some(&mut mapped))
                .map_err(|e| resource_error("Failed to map static buffer", e))?;
            std::ptr::copy_nonoverlapping(data.as_ptr(), mapped as *mut u8, data.len());
            resource.Unmap(0, None);
            resource.GetGPUVirtualAddress()
        };

        self.buffers.push(resource);
        self.fence.wait_for_gpu()?;
        debug!(address = gpu_address, size, "Static buffer created");

        Ok(StaticBuffer { gpu_address, size })
    }
}
