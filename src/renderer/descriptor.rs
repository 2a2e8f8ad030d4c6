//! 描述符管理模块
//!
//! 描述符句柄、描述符堆的线性布局，以及常量缓冲视图 (CBV) 使用的槽位环。
//!
//! DX12 的着色器可见 CBV/SRV/UAV 堆是一段连续的描述符，第 `i` 个描述符的句柄为
//! `start + i * increment`。主机端实现用同样的规则生成合成句柄。

use crate::core::error::{GraphicsError, Result};

/// 描述符句柄（CPU 可见）
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CpuDescriptorHandle {
    /// 句柄指针值
    pub ptr: usize,
    /// 描述符索引
    pub index: u32,
}

impl CpuDescriptorHandle {
    /// 创建新的 CPU 描述符句柄
    pub fn new(ptr: usize, index: u32) -> Self {
        Self { ptr, index }
    }
}

/// 描述符句柄（GPU 可见）
///
/// 绘制时作为描述符表的起点绑定到根签名。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GpuDescriptorHandle {
    /// 句柄指针值
    pub ptr: u64,
    /// 描述符索引
    pub index: u32,
}

impl GpuDescriptorHandle {
    /// 创建新的 GPU 描述符句柄
    pub fn new(ptr: u64, index: u32) -> Self {
        Self { ptr, index }
    }
}

/// 描述符堆布局
///
/// 记录堆起点、增量和容量，把槽位下标换算成句柄。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DescriptorHeapLayout {
    cpu_start: usize,
    gpu_start: u64,
    increment: u32,
    capacity: u32,
}

impl DescriptorHeapLayout {
    pub fn new(cpu_start: usize, gpu_start: u64, increment: u32, capacity: u32) -> Self {
        Self {
            cpu_start,
            gpu_start,
            increment,
            capacity,
        }
    }

    /// 描述符数量
    pub fn capacity(&self) -> u32 {
        self.capacity
    }

    /// 描述符增量大小
    pub fn increment(&self) -> u32 {
        self.increment
    }

    /// 指定槽位的 CPU 句柄
    pub fn cpu_handle(&self, slot: u32) -> Result<CpuDescriptorHandle> {
        self.check(slot)?;
        Ok(CpuDescriptorHandle::new(
            self.cpu_start + slot as usize * self.increment as usize,
            slot,
        ))
    }

    /// 指定槽位的 GPU 句柄
    pub fn gpu_handle(&self, slot: u32) -> Result<GpuDescriptorHandle> {
        self.check(slot)?;
        Ok(GpuDescriptorHandle::new(
            self.gpu_start + slot as u64 * self.increment as u64,
            slot,
        ))
    }

    fn check(&self, slot: u32) -> Result<()> {
        if slot >= self.capacity {
            return Err(GraphicsError::DescriptorOutOfRange {
                slot,
                capacity: self.capacity,
            }
            .into());
        }
        Ok(())
    }
}

/// 描述符槽位环
///
/// 每次 `advance` 返回当前槽位并前进一格，到达容量后回到 0。
/// 与字节游标相互独立。
#[derive(Debug, Clone)]
pub struct DescriptorSlotRing {
    next: u32,
    capacity: u32,
}

impl DescriptorSlotRing {
    /// `capacity` 必须大于 0
    pub fn new(capacity: u32) -> Self {
        Self { next: 0, capacity }
    }

    /// 下一个要使用的槽位
    pub fn current(&self) -> u32 {
        self.next
    }

    pub fn capacity(&self) -> u32 {
        self.capacity
    }

    /// 取出当前槽位并前进
    pub fn advance(&mut self) -> u32 {
        let slot = self.next;
        self.next = (self.next + 1) % self.capacity;
        slot
    }
}
