//! DX12 命令录制
//!
//! 每帧流程：重置分配器和命令列表 → 绑定根签名、PSO、CBV 堆、视口 →
//! 后缓冲区 PRESENT → RENDER_TARGET → 清屏 → 绘制 → RENDER_TARGET → PRESENT →
//! 关闭、执行、Present。

use std::mem::ManuallyDrop;

use tracing::{debug, trace, warn};
use windows::Win32::Foundation::RECT;
use windows::Win32::Graphics::Direct3D::D3D_PRIMITIVE_TOPOLOGY_TRIANGLELIST;
use windows::Win32::Graphics::Direct3D12::*;
use windows::Win32::Graphics::Dxgi::Common::DXGI_FORMAT_R32_UINT;
use windows::Win32::Graphics::Dxgi::{IDXGISwapChain3, DXGI_PRESENT};

use super::{command_error, resource_error};
use crate::core::error::{GraphicsError, Result};
use crate::renderer::command::{CommandListState, CommandRecorder};
use crate::renderer::descriptor::GpuDescriptorHandle;
use crate::renderer::resource::StaticBuffer;

/// 渲染目标
///
/// 交换链的 RTV 堆与可选的深度缓冲视图，由调用方创建。
pub struct Dx12RenderTargets {
    pub rtv_heap: ID3D12DescriptorHeap,
    pub rtv_descriptor_size: usize,
    pub depth_stencil: Option<D3D12_CPU_DESCRIPTOR_HANDLE>,
    pub width: u32,
    pub height: u32,
}

/// 命令录制器
pub struct Dx12CommandRecorder {
    queue: ID3D12CommandQueue,
    allocator: ID3D12CommandAllocator,
    command_list: ID3D12GraphicsCommandList,
    swap_chain: IDXGISwapChain3,
    root_signature: ID3D12RootSignature,
    pso: ID3D12PipelineState,
    cbv_heap: ID3D12DescriptorHeap,
    targets: Dx12RenderTargets,
    back_buffer: Option<ID3D12Resource>,
    clear_color: [f32; 4],
    state: CommandListState,
}

impl Dx12CommandRecorder {
    /// 创建命令分配器和命令列表
    ///
    /// `cbv_heap` 通常是 [`super::Dx12UploadHeap::descriptor_heap`]。
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        device: &ID3D12Device,
        queue: &ID3D12CommandQueue,
        swap_chain: IDXGISwapChain3,
        root_signature: ID3D12RootSignature,
        pso: ID3D12PipelineState,
        cbv_heap: ID3D12DescriptorHeap,
        targets: Dx12RenderTargets,
    ) -> Result<Self> {
        unsafe {
            let allocator: ID3D12CommandAllocator = device
                .CreateCommandAllocator(D3D12_COMMAND_LIST_TYPE_DIRECT)
                .map_err(|e| resource_error("Failed to create command allocator", e))?;
            let command_list: ID3D12GraphicsCommandList = device
                .CreateCommandList(0, D3D12_COMMAND_LIST_TYPE_DIRECT, &allocator, Some(&pso))
                .map_err(|e| resource_error("Failed to create command list", e))?;
            // 新建的命令列表处于录制状态
            command_list
                .Close()
                .map_err(|e| command_error("Failed to close initial command list", e))?;

            Ok(Self {
                queue: queue.clone(),
                allocator,
                command_list,
                swap_chain,
                root_signature,
                pso,
                cbv_heap,
                targets,
                back_buffer: None,
                clear_color: [0.0, 0.0, 0.0, 1.0],
                state: CommandListState::Initial,
            })
        }
    }

    pub fn set_clear_color(&mut self, color: [f32; 4]) {
        self.clear_color = color;
    }

    /// 交换链重建后更新渲染目标
    pub fn set_render_targets(&mut self, targets: Dx12RenderTargets) {
        self.targets = targets;
    }

    pub fn state(&self) -> CommandListState {
        self.state
    }

    fn expect_recording(&self, operation: &str) -> Result<()> {
        if self.state != CommandListState::Recording {
            return Err(GraphicsError::CommandExecution(format!(
                "{} called while command list is {:?}",
                operation, self.state
            ))
            .into());
        }
        Ok(())
    }

    fn transition(&self, resource: &ID3D12Resource, before: D3D12_RESOURCE_STATES, after: D3D12_RESOURCE_STATES) {
        let barrier = D3D12_RESOURCE_BARRIER {
            Type: D3D12_RESOURCE_BARRIER_TYPE_TRANSITION,
            Flags: D3D12_RESOURCE_BARRIER_FLAG_NONE,
            Anonymous: D3D12_RESOURCE_BARRIER_0 {
                Transition: ManuallyDrop::new(D3D12_RESOURCE_TRANSITION_BARRIER {
                    pResource: ManuallyDrop::new(Some(resource.clone())),
                    Subresource: D3D12_RESOURCE_BARRIER_ALL_SUBRESOURCES,
                    StateBefore: before,
                    StateAfter: after,
                }),
            },
        };
        unsafe {
            self.command_list.ResourceBarrier(&[barrier]);
        }
    }
}

impl CommandRecorder for Dx12CommandRecorder {
    fn begin_frame(&mut self) -> Result<()> {
        if self.state == CommandListState::Recording {
            return Err(GraphicsError::CommandExecution(
                "begin_frame called while already recording".to_string(),
            )
            .into());
        }

        unsafe {
            self.allocator
                .Reset()
                .map_err(|e| command_error("Failed to reset command allocator", e))?;
            self.command_list
                .Reset(&self.allocator, Some(&self.pso))
                .map_err(|e| command_error("Failed to reset command list", e))?;

            let index = self.swap_chain.GetCurrentBackBufferIndex();
            let back_buffer: ID3D12Resource = self
                .swap_chain
                .GetBuffer(index)
                .map_err(|e| resource_error("Failed to get swap chain buffer", e))?;
            self.transition(&back_buffer, D3D12_RESOURCE_STATE_PRESENT, D3D12_RESOURCE_STATE_RENDER_TARGET);

            let rtv = D3D12_CPU_DESCRIPTOR_HANDLE {
                ptr: self.targets.rtv_heap.GetCPUDescriptorHandleForHeapStart().ptr
                    + index as usize * self.targets.rtv_descriptor_size,
            };
            let dsv = self.targets.depth_stencil;
            self.command_list
                .OMSetRenderTargets(1, Some(&rtv), false, dsv.as_ref().map(|h| h as *const _));
            self.command_list.ClearRenderTargetView(rtv, &self.clear_color, None);
            if let Some(dsv) = dsv {
                self.command_list
                    .ClearDepthStencilView(dsv, D3D12_CLEAR_FLAG_DEPTH, 1.0, 0, None);
            }

            let viewport = D3D12_VIEWPORT {
                TopLeftX: 0.0,
                TopLeftY: 0.0,
                Width: self.targets.width as f32,
                Height: self.targets.height as f32,
                MinDepth: 0.0,
                MaxDepth: 1.0,
            };
            let scissor = RECT {
                left: 0,
                top: 0,
                right: self.targets.width as i32,
                bottom: self.targets.height as i32,
            };
            self.command_list.SetGraphicsRootSignature(&self.root_signature);
            self.command_list.SetDescriptorHeaps(&[Some(self.cbv_heap.clone())]);
            self.command_list.RSSetViewports(&[viewport]);
            self.command_list.RSSetScissorRects(&[scissor]);
            self.command_list.IASetPrimitiveTopology(D3D_PRIMITIVE_TOPOLOGY_TRIANGLELIST);

            self.back_buffer = Some(back_buffer);
        }

        self.state = CommandListState::Recording;
        Ok(())
    }

    fn set_descriptor_table(&mut self, root_parameter: u32, handle: GpuDescriptorHandle) -> Result<()> {
        self.expect_recording("set_descriptor_table")?;
        unsafe {
            self.command_list.SetGraphicsRootDescriptorTable(
                root_parameter,
                D3D12_GPU_DESCRIPTOR_HANDLE { ptr: handle.ptr },
            );
        }
        Ok(())
    }

    fn set_geometry(
        &mut self,
        vertex_buffer: &StaticBuffer,
        vertex_stride: u32,
        index_buffer: &StaticBuffer,
    ) -> Result<()> {
        self.expect_recording("set_geometry")?;

        let vertex_view = D3D12_VERTEX_BUFFER_VIEW {
            BufferLocation: vertex_buffer.gpu_address,
            SizeInBytes: vertex_buffer.size as u32,
            StrideInBytes: vertex_stride,
        };
        let index_view = D3D12_INDEX_BUFFER_VIEW {
            BufferLocation: index_buffer.gpu_address,
            SizeInBytes: index_buffer.size as u32,
            Format: DXGI_FORMAT_R32_UINT,
        };
        unsafe {
            self.command_list.IASetVertexBuffers(0, Some(&[vertex_view]));
            self.command_list.IASetIndexBuffer(Some(&index_view));
        }
        Ok(())
    }

    fn draw_indexed(&mut self, index_count: u32) -> Result<()> {
        self.expect_recording("draw_indexed")?;
        unsafe {
            self.command_list.DrawIndexedInstanced(index_count, 1, 0, 0, 0);
        }
        Ok(())
    }

    fn close_and_execute(&mut self) -> Result<()> {
        self.expect_recording("close_and_execute")?;

        if let Some(back_buffer) = self.back_buffer.take() {
            self.transition(&back_buffer, D3D12_RESOURCE_STATE_RENDER_TARGET, D3D12_RESOURCE_STATE_PRESENT);
        }

        unsafe {
            self.command_list
                .Close()
                .map_err(|e| command_error("Failed to close command list", e))?;
            let command_lists = [Some(self.command_list.clone().into())];
            self.queue.ExecuteCommandLists(&command_lists);
        }

        trace!("Command list executed");
        self.state = CommandListState::Executable;
        Ok(())
    }

    fn present(&mut self, vsync: bool) -> Result<()> {
        if self.state != CommandListState::Executable {
            return Err(GraphicsError::CommandExecution(format!(
                "present called while command list is {:?}",
                self.state
            ))
            .into());
        }

        let sync_interval = if vsync { 1 } else { 0 };
        unsafe {
            self.swap_chain
                .Present(sync_interval, DXGI_PRESENT(0))
                .ok()
                .map_err(|e| command_error("Failed to present", e))?;
        }

        self.state = CommandListState::Initial;
        Ok(())
    }

    fn discard_frame(&mut self) {
        if self.state == CommandListState::Recording {
            // 关闭后下一次 begin_frame 才能 Reset
            if let Err(e) = unsafe { self.command_list.Close() } {
                warn!(error = %e, "Failed to close discarded command list");
            }
        }
        self.back_buffer = None;
        self.state = CommandListState::Initial;
        debug!("Frame discarded");
    }
}
