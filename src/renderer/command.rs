//! 命令记录模块
//!
//! 渲染核心只需要很少的命令：绑定描述符表、绑定几何缓冲区、索引绘制、
//! 提交与呈现。[`CommandRecorder`] 把这些操作抽象出来，
//! DX12 实现位于 `gfx::dx12`，[`RecordingCommandList`] 在主机端记录命令，供测试和无窗口演示使用。
//!
//! # 状态机
//!
//! ```text
//! Initial --begin_frame--> Recording --close_and_execute--> Executable --present--> Initial
//! ```
//!
//! 录制或提交中途出错时，[`CommandRecorder::discard_frame`] 丢弃本帧并回到 `Initial`。

use crate::core::error::{GraphicsError, Result};
use crate::renderer::descriptor::GpuDescriptorHandle;
use crate::renderer::resource::StaticBuffer;

/// 根签名中的描述符表槽位
pub mod root_parameter {
    /// 每次绘制的变换常量（b0）
    pub const TRANSFORM: u32 = 0;
    /// 每次绘制的材质常量（b1）
    pub const MATERIAL: u32 = 1;
    /// 每帧的场景常量（b2）
    pub const SCENE: u32 = 2;
}

/// 命令列表状态
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandListState {
    /// 初始状态，可以开始新的一帧
    Initial,
    /// 正在记录
    Recording,
    /// 已关闭并提交，等待呈现
    Executable,
}

/// 记录下来的一条命令
#[derive(Debug, Clone, PartialEq)]
pub enum RecordedCommand {
    /// 绑定描述符表
    SetDescriptorTable {
        root_parameter: u32,
        handle: GpuDescriptorHandle,
    },
    /// 绑定顶点/索引缓冲区
    SetGeometry {
        vertex_buffer: StaticBuffer,
        vertex_stride: u32,
        index_buffer: StaticBuffer,
    },
    /// 索引绘制
    DrawIndexed { index_count: u32 },
}

/// 命令记录接口
pub trait CommandRecorder {
    /// 重置命令分配器与命令列表，开始记录新的一帧
    fn begin_frame(&mut self) -> Result<()>;

    /// 把 `handle` 起始的描述符表绑定到 `root_parameter`
    fn set_descriptor_table(&mut self, root_parameter: u32, handle: GpuDescriptorHandle) -> Result<()>;

    /// 绑定顶点缓冲区（u32 索引）
    fn set_geometry(
        &mut self,
        vertex_buffer: &StaticBuffer,
        vertex_stride: u32,
        index_buffer: &StaticBuffer,
    ) -> Result<()>;

    /// 三角形列表索引绘制
    fn draw_indexed(&mut self, index_count: u32) -> Result<()>;

    /// 关闭命令列表并提交到队列
    fn close_and_execute(&mut self) -> Result<()>;

    /// 呈现交换链
    fn present(&mut self, vsync: bool) -> Result<()>;

    /// 丢弃未完成的一帧，回到 `Initial`
    fn discard_frame(&mut self);
}

/// 主机端命令列表
///
/// 校验状态机并保存每一帧提交的命令。
#[derive(Debug)]
pub struct RecordingCommandList {
    state: CommandListState,
    recording: Vec<RecordedCommand>,
    submitted: Vec<RecordedCommand>,
    submit_count: u64,
    present_count: u64,
    last_vsync: Option<bool>,
}

impl RecordingCommandList {
    pub fn new() -> Self {
        Self {
            state: CommandListState::Initial,
            recording: Vec::new(),
            submitted: Vec::new(),
            submit_count: 0,
            present_count: 0,
            last_vsync: None,
        }
    }

    /// 当前状态
    pub fn state(&self) -> CommandListState {
        self.state
    }

    /// 最近一次提交的命令
    pub fn submitted(&self) -> &[RecordedCommand] {
        &self.submitted
    }

    /// 最近一次提交中的绘制次数
    pub fn draw_count(&self) -> usize {
        self.submitted
            .iter()
            .filter(|command| matches!(command, RecordedCommand::DrawIndexed { .. }))
            .count()
    }

    pub fn submit_count(&self) -> u64 {
        self.submit_count
    }

    pub fn present_count(&self) -> u64 {
        self.present_count
    }

    /// 最近一次 present 使用的垂直同步设置
    pub fn last_vsync(&self) -> Option<bool> {
        self.last_vsync
    }

    fn expect_state(&self, expected: CommandListState, operation: &str) -> Result<()> {
        if self.state != expected {
            return Err(GraphicsError::CommandExecution(format!(
                "{} requires state {:?}, command list is {:?}",
                operation, expected, self.state
            ))
            .into());
        }
        Ok(())
    }

    fn record(&mut self, command: RecordedCommand, operation: &str) -> Result<()> {
        self.expect_state(CommandListState::Recording, operation)?;
        self.recording.push(command);
        Ok(())
    }
}

impl Default for RecordingCommandList {
    fn default() -> Self {
        Self::new()
    }
}

impl CommandRecorder for RecordingCommandList {
    fn begin_frame(&mut self) -> Result<()> {
        self.expect_state(CommandListState::Initial, "begin_frame")?;
        self.recording.clear();
        self.state = CommandListState::Recording;
        Ok(())
    }

    fn set_descriptor_table(&mut self, root_parameter: u32, handle: GpuDescriptorHandle) -> Result<()> {
        self.record(
            RecordedCommand::SetDescriptorTable {
                root_parameter,
                handle,
            },
            "set_descriptor_table",
        )
    }

    fn set_geometry(
        &mut self,
        vertex_buffer: &StaticBuffer,
        vertex_stride: u32,
        index_buffer: &StaticBuffer,
    ) -> Result<()> {
        self.record(
            RecordedCommand::SetGeometry {
                vertex_buffer: *vertex_buffer,
                vertex_stride,
                index_buffer: *index_buffer,
            },
            "set_geometry",
        )
    }

    fn draw_indexed(&mut self, index_count: u32) -> Result<()> {
        self.record(RecordedCommand::DrawIndexed { index_count }, "draw_indexed")
    }

    fn close_and_execute(&mut self) -> Result<()> {
        self.expect_state(CommandListState::Recording, "close_and_execute")?;
        self.submitted = std::mem::take(&mut self.recording);
        self.submit_count += 1;
        self.state = CommandListState::Executable;
        Ok(())
    }

    fn present(&mut self, vsync: bool) -> Result<()> {
        self.expect_state(CommandListState::Executable, "present")?;
        self.present_count += 1;
        self.last_vsync = Some(vsync);
        self.state = CommandListState::Initial;
        Ok(())
    }

    fn discard_frame(&mut self) {
        self.recording.clear();
        self.state = CommandListState::Initial;
    }
}
