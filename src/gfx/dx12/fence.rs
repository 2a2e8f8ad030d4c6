//! DX12 fence

use tracing::trace;
use windows::Win32::Foundation::{CloseHandle, HANDLE};
use windows::Win32::Graphics::Direct3D12::*;
use windows::Win32::System::Threading::{CreateEventA, WaitForSingleObject, INFINITE};

use super::{command_error, resource_error};
use crate::core::error::Result;
use crate::renderer::sync::{FenceValue, GpuFence};

/// 绑定到一个命令队列的 fence
pub struct Dx12Fence {
    queue: ID3D12CommandQueue,
    fence: ID3D12Fence,
    event: HANDLE,
    last_signaled: FenceValue,
}

impl Dx12Fence {
    pub fn new(device: &ID3D12Device, queue: &ID3D12CommandQueue) -> Result<Self> {
        unsafe {
            let fence: ID3D12Fence = device
                .CreateFence(0, D3D12_FENCE_FLAG_NONE)
                .map_err(|e| resource_error("Failed to create fence", e))?;
            let event = CreateEventA(None, false, false, None)
                .map_err(|e| resource_error("Failed to create fence event", e))?;

            Ok(Self {
                queue: queue.clone(),
                fence,
                event,
                last_signaled: FenceValue::default(),
            })
        }
    }
}

impl GpuFence for Dx12Fence {
    fn signal(&mut self) -> Result<FenceValue> {
        let value = self.last_signaled.next();
        unsafe {
            self.queue
                .Signal(&self.fence, value.value())
                .map_err(|e| command_error("Failed to signal fence", e))?;
        }
        self.last_signaled = value;
        Ok(value)
    }

    fn wait(&mut self, value: FenceValue) -> Result<()> {
        if self.completed_value() >= value {
            return Ok(());
        }
        unsafe {
            self.fence
                .SetEventOnCompletion(value.value(), self.event)
                .map_err(|e| command_error("Failed to set fence event", e))?;
            WaitForSingleObject(self.event, INFINITE);
        }
        trace!(fence_value = value.value(), "GPU wait completed");
        Ok(())
    }

    fn completed_value(&self) -> FenceValue {
        FenceValue::new(unsafe { self.fence.GetCompletedValue() })
    }
}

impl Drop for Dx12Fence {
    fn drop(&mut self) {
        unsafe {
            let _ = CloseHandle(self.event);
        }
    }
}
