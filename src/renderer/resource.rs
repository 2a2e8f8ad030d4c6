//! 资源管理模块
//!
//! 渲染核心需要的 GPU 资源都通过这里的 trait 访问：
//!
//! - [`UploadHeap`]：CPU 可写、持久映射的上传堆，加上一个着色器可见的 CBV 描述符堆
//! - [`GpuDevice`]：创建静态几何缓冲区
//!
//! 主机端实现 ([`HostUploadHeap`]、[`HostDevice`]) 用普通内存模拟，
//! 用于测试、非 Windows 平台以及无窗口演示。DX12 实现位于 `gfx::dx12`。

use crate::core::error::{GraphicsError, Result};
use crate::renderer::descriptor::{DescriptorHeapLayout, GpuDescriptorHandle};

/// DX12 常量缓冲区的对齐要求（字节）
pub const CONSTANT_BUFFER_ALIGNMENT: u64 = 256;

/// 向上对齐到 256 字节
pub const fn align_constant_buffer_size(size: u64) -> u64 {
    ((size + CONSTANT_BUFFER_ALIGNMENT - 1) / CONSTANT_BUFFER_ALIGNMENT) * CONSTANT_BUFFER_ALIGNMENT
}

/// 一个常量缓冲视图覆盖的 GPU 地址范围
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConstantBufferView {
    /// GPU 虚拟地址
    pub location: u64,
    /// 视图大小（256 的倍数）
    pub size: u64,
}

/// 上传堆后端
///
/// 上传堆本身是一块固定大小的字节区域；`create_constant_buffer_view`
/// 在描述符堆的指定槽位写入一个覆盖 `[location, location + size)` 的 CBV。
pub trait UploadHeap {
    /// 上传堆容量（字节）
    fn capacity(&self) -> u64;

    /// 上传堆起始 GPU 虚拟地址
    fn gpu_virtual_address(&self) -> u64;

    /// 描述符堆中的槽位数量
    fn descriptor_capacity(&self) -> u32;

    /// 把 `data` 写入偏移 `offset` 处
    fn write(&mut self, offset: u64, data: &[u8]) -> Result<()>;

    /// 读回偏移 `offset` 处的 `len` 字节
    fn read(&self, offset: u64, len: u64) -> Result<&[u8]>;

    /// 在 `slot` 创建常量缓冲视图，返回该槽位的 GPU 描述符句柄
    fn create_constant_buffer_view(
        &mut self,
        slot: u32,
        location: u64,
        size: u64,
    ) -> Result<GpuDescriptorHandle>;
}

/// 检查写入/读取范围是否落在堆内
pub(crate) fn check_heap_range(offset: u64, len: u64, capacity: u64) -> Result<()> {
    match offset.checked_add(len) {
        Some(end) if end <= capacity => Ok(()),
        _ => Err(GraphicsError::UploadOutOfBounds {
            offset,
            len,
            capacity,
        }
        .into()),
    }
}

/// 主机内存模拟的上传堆
pub struct HostUploadHeap {
    memory: Vec<u8>,
    gpu_base: u64,
    descriptors: DescriptorHeapLayout,
    views: Vec<Option<ConstantBufferView>>,
}

impl HostUploadHeap {
    /// 合成的 GPU 虚拟地址起点
    pub const GPU_BASE_ADDRESS: u64 = 0x0001_0000_0000;

    /// 合成的描述符堆起点
    pub const DESCRIPTOR_BASE: u64 = 0x0002_0000_0000;

    /// 合成的描述符增量（与常见硬件的 CBV/SRV/UAV 增量一致）
    pub const DESCRIPTOR_INCREMENT: u32 = 32;

    /// 创建容量为 `capacity` 字节、`descriptor_count` 个槽位的上传堆
    pub fn new(capacity: u64, descriptor_count: u32) -> Self {
        Self {
            memory: vec![0; capacity as usize],
            gpu_base: Self::GPU_BASE_ADDRESS,
            descriptors: DescriptorHeapLayout::new(
                Self::DESCRIPTOR_BASE as usize,
                Self::DESCRIPTOR_BASE,
                Self::DESCRIPTOR_INCREMENT,
                descriptor_count,
            ),
            views: vec![None; descriptor_count as usize],
        }
    }

    /// 按常量缓冲区数量创建：`max_cbuffers * 256` 字节、`max_cbuffers` 个槽位
    pub fn for_cbuffers(max_cbuffers: u32) -> Self {
        Self::new(max_cbuffers as u64 * CONSTANT_BUFFER_ALIGNMENT, max_cbuffers)
    }

    /// 槽位上最近一次创建的视图
    pub fn view(&self, slot: u32) -> Option<ConstantBufferView> {
        self.views.get(slot as usize).copied().flatten()
    }
}

impl UploadHeap for HostUploadHeap {
    fn capacity(&self) -> u64 {
        self.memory.len() as u64
    }

    fn gpu_virtual_address(&self) -> u64 {
        self.gpu_base
    }

    fn descriptor_capacity(&self) -> u32 {
        self.descriptors.capacity()
    }

    fn write(&mut self, offset: u64, data: &[u8]) -> Result<()> {
        check_heap_range(offset, data.len() as u64, self.capacity())?;
        let start = offset as usize;
        self.memory[start..start + data.len()].copy_from_slice(data);
        Ok(())
    }

    fn read(&self, offset: u64, len: u64) -> Result<&[u8]> {
        check_heap_range(offset, len, self.capacity())?;
        let start = offset as usize;
        Ok(&self.memory[start..start + len as usize])
    }

    fn create_constant_buffer_view(
        &mut self,
        slot: u32,
        location: u64,
        size: u64,
    ) -> Result<GpuDescriptorHandle> {
        let handle = self.descriptors.gpu_handle(slot)?;
        self.views[slot as usize] = Some(ConstantBufferView { location, size });
        Ok(handle)
    }
}

/// 静态缓冲区（顶点/索引）的 GPU 视图
///
/// 底层资源由创建它的设备持有，生命周期与设备一致。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StaticBuffer {
    /// GPU 虚拟地址
    pub gpu_address: u64,
    /// 大小（字节）
    pub size: u64,
}

/// 静态几何缓冲区的创建接口
pub trait GpuDevice {
    /// 创建一个内容为 `data` 的 GPU 缓冲区
    fn create_static_buffer(&mut self, data: &[u8]) -> Result<StaticBuffer>;
}

/// 主机内存模拟的设备，记录每次上传
#[derive(Debug)]
pub struct HostDevice {
    buffers: Vec<(StaticBuffer, Vec<u8>)>,
    next_address: u64,
}

impl HostDevice {
    /// 合成的静态缓冲区地址起点
    pub const BUFFER_BASE_ADDRESS: u64 = 0x0004_0000_0000;

    pub fn new() -> Self {
        Self {
            buffers: Vec::new(),
            next_address: Self::BUFFER_BASE_ADDRESS,
        }
    }

    /// 已创建的缓冲区数量
    pub fn buffer_count(&self) -> usize {
        self.buffers.len()
    }

    /// 按地址取回缓冲区内容
    pub fn buffer_contents(&self, buffer: &StaticBuffer) -> Option<&[u8]> {
        self.buffers
            .iter()
            .find(|(b, _)| b.gpu_address == buffer.gpu_address)
            .map(|(_, bytes)| bytes.as_slice())
    }
}

impl Default for HostDevice {
    fn default() -> Self {
        Self::new()
    }
}

impl GpuDevice for HostDevice {
    fn create_static_buffer(&mut self, data: &[u8]) -> Result<StaticBuffer> {
        if data.is_empty() {
            return Err(GraphicsError::ResourceCreation(
                "Static buffer must not be empty".to_string(),
            )
            .into());
        }

        let buffer = StaticBuffer {
            gpu_address: self.next_address,
            size: data.len() as u64,
        };
        // 保持 256 字节对齐，和真实驱动的放置方式接近
        self.next_address += align_constant_buffer_size(buffer.size);
        self.buffers.push((buffer, data.to_vec()));

        tracing::trace!(address = buffer.gpu_address, size = buffer.size, "Static buffer created");
        Ok(buffer)
    }
}
