//! GPU 同步机制模块
//!
//! CPU 等待 GPU 的 fence 抽象。渲染核心在每帧 present 之后调用
//! [`GpuFence::wait_for_gpu`] 排空整个队列，常量缓冲区环依赖这一点复用上一帧的区域。

use crate::core::error::Result;

/// Fence 值
///
/// 单调递增，CPU 可以等待 GPU 完成到某个值为止的工作。
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord)]
pub struct FenceValue(u64);

impl FenceValue {
    /// 创建新的Fence值
    pub fn new(value: u64) -> Self {
        Self(value)
    }

    /// 获取内部值
    pub fn value(&self) -> u64 {
        self.0
    }

    /// 下一个Fence值
    pub fn next(&self) -> Self {
        Self(self.0 + 1)
    }
}

/// GPU fence
pub trait GpuFence {
    /// 在队列中插入一个新的 signal，返回其值
    fn signal(&mut self) -> Result<FenceValue>;

    /// 阻塞直到 GPU 完成 `value`（无超时）
    fn wait(&mut self, value: FenceValue) -> Result<()>;

    /// GPU 已完成的最大值
    fn completed_value(&self) -> FenceValue;

    /// signal 并等待，排空队列中已提交的全部工作
    fn wait_for_gpu(&mut self) -> Result<FenceValue> {
        let value = self.signal()?;
        self.wait(value)?;
        Ok(value)
    }
}

/// 主机端 fence
///
/// 没有真实队列，signal 立即完成。
#[derive(Debug, Default)]
pub struct HostFence {
    last_signaled: FenceValue,
    completed: FenceValue,
    wait_count: u64,
}

impl HostFence {
    pub fn new() -> Self {
        Self::default()
    }

    /// 已执行的等待次数
    pub fn wait_count(&self) -> u64 {
        self.wait_count
    }

    /// 最近一次 signal 的值
    pub fn last_signaled(&self) -> FenceValue {
        self.last_signaled
    }
}

impl GpuFence for HostFence {
    fn signal(&mut self) -> Result<FenceValue> {
        self.last_signaled = self.last_signaled.next();
        Ok(self.last_signaled)
    }

    fn wait(&mut self, value: FenceValue) -> Result<()> {
        self.wait_count += 1;
        if value > self.completed {
            self.completed = value.min(self.last_signaled);
        }
        Ok(())
    }

    fn completed_value(&self) -> FenceValue {
        self.completed
    }
}
