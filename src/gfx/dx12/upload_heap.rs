//! DX12 上传堆

use tracing::info;
use windows::Win32::Graphics::Direct3D12::*;

use super::{create_upload_buffer, resource_error};
use crate::core::error::Result;
use crate::renderer::descriptor::{DescriptorHeapLayout, GpuDescriptorHandle};
use crate::renderer::resource::{check_heap_range, UploadHeap, CONSTANT_BUFFER_ALIGNMENT};

/// 持久映射的上传堆
///
/// 资源在整个生命周期内保持映射，`write` 直接拷贝到映射内存。
pub struct Dx12UploadHeap {
    device: ID3D12Device,
    resource: ID3D12Resource,
    mapped: *mut u8,
    capacity: u64,
    gpu_address: u64,
    cbv_heap: ID3D12DescriptorHeap,
    descriptors: DescriptorHeapLayout,
}

impl Dx12UploadHeap {
    /// 为 `max_cbuffers` 个常量缓冲区创建上传堆和 CBV 堆
    pub fn new(device: &ID3D12Device, max_cbuffers: u32) -> Result<Self> {
        let capacity = max_cbuffers as u64 * CONSTANT_BUFFER_ALIGNMENT;
        let resource = create_upload_buffer(device, capacity)?;

        unsafe {
            let mut mapped = std::ptr::null_mut();
            resource
                .Map(0, None, Some(&mut mapped))
                .map_err(|e| resource_error("Failed to map upload heap", e))?;

            let heap_desc = D3D12_DESCRIPTOR_HEAP_DESC {
                Type: D3D12_DESCRIPTOR_HEAP_TYPE_CBV_SRV_UAV,
                NumDescriptors: max_cbuffers,
                Flags: D3D12_DESCRIPTOR_HEAP_FLAG_SHADER_VISIBLE,
                NodeMask: 0,
            };
            let cbv_heap: ID3D12DescriptorHeap = device
                .CreateDescriptorHeap(&heap_desc)
                .map_err(|e| resource_error("Failed to create CBV descriptor heap", e))?;

            let increment = device.GetDescriptorHandleIncrementSize(D3D12_DESCRIPTOR_HEAP_TYPE_CBV_SRV_UAV);
            let descriptors = DescriptorHeapLayout::new(
                cbv_heap.GetCPUDescriptorHandleForHeapStart().ptr,
                cbv_heap.GetGPUDescriptorHandleForHeapStart().ptr,
                increment,
                max_cbuffers,
            );
            let gpu_address = resource.GetGPUVirtualAddress();

            info!(capacity, descriptors = max_cbuffers, "DX12 upload heap created");

            Ok(Self {
                device: device.clone(),
                resource,
                mapped: mapped as *mut u8,
                capacity,
                gpu_address,
                cbv_heap,
                descriptors,
            })
        }
    }

    /// 绑定到命令列表的描述符堆
    pub fn descriptor_heap(&self) -> &ID3D12DescriptorHeap {
        &self.cbv_heap
    }
}

impl UploadHeap for Dx12UploadHeap {
    fn capacity(&self) -> u64 {
        self.capacity
    }

    fn gpu_virtual_address(&self) -> u64 {
        self.gpu_address
    }

    fn descriptor_capacity(&self) -> u32 {
        self.descriptors.capacity()
    }

    fn write(&mut self, offset: u64, data: &[u8]) -> Result<()> {
        check_heap_range(offset, data.len() as u64, self.capacity)?;
        unsafe {
            std::ptr::copy_nonoverlapping(data.as_ptr(), self.mapped.add(offset as usize), data.len());
        }
        Ok(())
    }

    fn read(&self, offset: u64, len: u64) -> Result<&[u8]> {
        check_heap_range(offset, len, self.capacity)?;
        unsafe {
            Ok(std::slice::from_raw_parts(
                self.mapped.add(offset as usize),
                len as usize,
            ))
        }
    }

    fn create_constant_buffer_view(
        &mut self,
        slot: u32,
        location: u64,
        size: u64,
    ) -> Result<GpuDescriptorHandle> {
        let cpu = self.descriptors.cpu_handle(slot)?;
        let gpu = self.descriptors.gpu_handle(slot)?;

        let desc = D3D12_CONSTANT_BUFFER_VIEW_DESC {
            BufferLocation: location,
            SizeInBytes: size as u32,
        };
        unsafe {
            self.device
                .CreateConstantBufferView(Some(&desc), D3D12_CPU_DESCRIPTOR_HANDLE { ptr: cpu.ptr });
        }
        Ok(gpu)
    }
}

impl Drop for Dx12UploadHeap {
    fn drop(&mut self) {
        unsafe {
            self.resource.Unmap(0, None);
        }
    }
}
