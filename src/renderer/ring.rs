//! 常量缓冲区环形分配器
//!
//! 一块固定大小的上传堆加一个并行的描述符槽位环。每次 [`ConstantBufferRing::fill_next`]
//! 预留一段 256 字节对齐的区域，拷贝数据，在当前槽位创建覆盖整段预留的 CBV，
//! 然后两个游标各自前进：
//!
//! - 字节游标：剩余空间放不下本次预留时回到 0，区域永远不会跨越堆末尾
//! - 槽位游标：按槽位容量取模
//!
//! 复用安全性依赖每帧结束时的 `wait_for_gpu`：上一帧的区域在被覆盖前已经被 GPU 消费。
//! 单帧内预留超过容量时，本帧会覆盖自己尚未执行的区域，此时每帧记录一次警告。

use bytemuck::Pod;
use tracing::{trace, warn};

use crate::core::error::{GraphicsError, Result};
use crate::renderer::descriptor::{DescriptorSlotRing, GpuDescriptorHandle};
use crate::renderer::resource::{align_constant_buffer_size, UploadHeap, CONSTANT_BUFFER_ALIGNMENT};

/// 一次分配得到的区域
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConstantBufferRegion {
    /// 在上传堆中的字节偏移
    pub offset: u64,
    /// 预留大小（256 的倍数）
    pub size: u64,
    /// 描述符槽位
    pub slot: u32,
    /// 区域起始的 GPU 虚拟地址
    pub gpu_address: u64,
    /// 绑定到根签名的描述符句柄
    pub descriptor: GpuDescriptorHandle,
}

/// 常量缓冲区环形分配器
pub struct ConstantBufferRing<H: UploadHeap> {
    heap: H,
    offset: u64,
    slots: DescriptorSlotRing,
    wrap_count: u64,
    frame_bytes: u64,
    frame_fills: u32,
    overflow_reported: bool,
}

impl<H: UploadHeap> ConstantBufferRing<H> {
    /// 在 `heap` 上创建分配器，使用 `max_cbuffers` 个描述符槽位
    pub fn new(heap: H, max_cbuffers: u32) -> Result<Self> {
        if heap.capacity() < CONSTANT_BUFFER_ALIGNMENT {
            return Err(GraphicsError::ResourceCreation(format!(
                "Upload heap of {} bytes cannot hold a single constant buffer",
                heap.capacity()
            ))
            .into());
        }
        if max_cbuffers == 0 {
            return Err(GraphicsError::ResourceCreation(
                "Constant buffer ring needs at least one descriptor slot".to_string(),
            )
            .into());
        }
        if max_cbuffers > heap.descriptor_capacity() {
            return Err(GraphicsError::DescriptorOutOfRange {
                slot: max_cbuffers - 1,
                capacity: heap.descriptor_capacity(),
            }
            .into());
        }

        Ok(Self {
            heap,
            offset: 0,
            slots: DescriptorSlotRing::new(max_cbuffers),
            wrap_count: 0,
            frame_bytes: 0,
            frame_fills: 0,
            overflow_reported: false,
        })
    }

    /// 数据长度对应的预留大小
    pub const fn reservation_size(len: u64) -> u64 {
        align_constant_buffer_size(len)
    }

    /// 把 `data` 写入下一段区域并创建 CBV
    pub fn fill_next(&mut self, data: &[u8]) -> Result<ConstantBufferRegion> {
        let len = data.len() as u64;
        let reservation = Self::reservation_size(len);
        let capacity = self.heap.capacity();

        if len == 0 {
            return Err(GraphicsError::EmptyReservation.into());
        }
        if reservation > capacity {
            return Err(GraphicsError::ReservationTooLarge {
                size: reservation,
                capacity,
            }
            .into());
        }

        if self.offset + reservation > capacity {
            trace!(
                offset = self.offset,
                reservation,
                capacity,
                "Constant buffer ring wrapped"
            );
            self.offset = 0;
            self.wrap_count += 1;
        }

        let offset = self.offset;
        self.heap.write(offset, data)?;

        let gpu_address = self.heap.gpu_virtual_address() + offset;
        let slot = self.slots.current();
        let descriptor = self
            .heap
            .create_constant_buffer_view(slot, gpu_address, reservation)?;

        self.slots.advance();
        self.offset += reservation;
        self.account(reservation);

        Ok(ConstantBufferRegion {
            offset,
            size: reservation,
            slot,
            gpu_address,
            descriptor,
        })
    }

    /// 写入一个 `Pod` 值
    pub fn fill_next_pod<T: Pod>(&mut self, value: &T) -> Result<ConstantBufferRegion> {
        self.fill_next(bytemuck::bytes_of(value))
    }

    /// 开始新的一帧，清零帧内统计
    pub fn begin_frame(&mut self) {
        self.frame_bytes = 0;
        self.frame_fills = 0;
        self.overflow_reported = false;
    }

    /// 结束一帧，返回本帧预留的字节数
    pub fn end_frame(&mut self) -> u64 {
        self.frame_bytes
    }

    fn account(&mut self, reservation: u64) {
        self.frame_bytes += reservation;
        self.frame_fills += 1;

        let overflowed = self.frame_bytes > self.heap.capacity()
            || self.frame_fills > self.slots.capacity();
        if overflowed && !self.overflow_reported {
            warn!(
                frame_bytes = self.frame_bytes,
                capacity = self.heap.capacity(),
                fills = self.frame_fills,
                slots = self.slots.capacity(),
                "Constant buffer ring overflowed within one frame, in-flight regions overwritten"
            );
            self.overflow_reported = true;
        }
    }

    /// 下一次分配的字节偏移（回绕之前）
    pub fn offset(&self) -> u64 {
        self.offset
    }

    /// 下一次分配使用的槽位
    pub fn slot(&self) -> u32 {
        self.slots.current()
    }

    pub fn capacity(&self) -> u64 {
        self.heap.capacity()
    }

    pub fn slot_capacity(&self) -> u32 {
        self.slots.capacity()
    }

    /// 当前帧已预留的字节数
    pub fn frame_bytes(&self) -> u64 {
        self.frame_bytes
    }

    /// 字节游标回绕的次数
    pub fn wrap_count(&self) -> u64 {
        self.wrap_count
    }

    /// 当前帧是否发生过溢出
    pub fn frame_overflowed(&self) -> bool {
        self.overflow_reported
    }

    pub fn heap(&self) -> &H {
        &self.heap
    }
}
