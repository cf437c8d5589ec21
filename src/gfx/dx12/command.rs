//! DX12 命令分配器与命令列表
//!
//! 句柄在录制时从共享资源表中解析，资源表在录制期间只读借用。

use std::mem::ManuallyDrop;

use windows::Win32::Foundation::RECT;
use windows::Win32::Graphics::Direct3D::D3D_PRIMITIVE_TOPOLOGY_TRIANGLELIST;
use windows::Win32::Graphics::Direct3D12::*;

use crate::core::error::{GraphicsError, Result};
use crate::gfx::dx12::device::SharedObjects;
use crate::gfx::dx12::resource::{Dx12UploadMemory, TEXTURE_FORMAT};
use crate::gfx::dx12::ApiResultExt;
use crate::renderer::backend::{HeapId, MeshId, TextureId};
use crate::renderer::command::{
    CommandAllocator, CommandList, DrawArgs, PipelineKind, ResourceId, ResourceState, Viewport,
};
use crate::renderer::sync::QueueKind;

fn resource_state(state: ResourceState) -> D3D12_RESOURCE_STATES {
    match state {
        ResourceState::Present => D3D12_RESOURCE_STATE_PRESENT,
        ResourceState::RenderTarget => D3D12_RESOURCE_STATE_RENDER_TARGET,
        ResourceState::UnorderedAccess => D3D12_RESOURCE_STATE_UNORDERED_ACCESS,
        ResourceState::NonPixelShaderResource => D3D12_RESOURCE_STATE_NON_PIXEL_SHADER_RESOURCE,
        ResourceState::CopyDest => D3D12_RESOURCE_STATE_COPY_DEST,
        ResourceState::Common => D3D12_RESOURCE_STATE_COMMON,
    }
}

fn transition_barrier(
    resource: &ID3D12Resource,
    before: D3D12_RESOURCE_STATES,
    after: D3D12_RESOURCE_STATES,
) -> D3D12_RESOURCE_BARRIER {
    D3D12_RESOURCE_BARRIER {
        Type: D3D12_RESOURCE_BARRIER_TYPE_TRANSITION,
        Flags: D3D12_RESOURCE_BARRIER_FLAG_NONE,
        Anonymous: D3D12_RESOURCE_BARRIER_0 {
            Transition: ManuallyDrop::new(D3D12_RESOURCE_TRANSITION_BARRIER {
                // 借用而不增加引用计数，屏障不负责释放
                pResource: unsafe { std::mem::transmute_copy(resource) },
                Subresource: D3D12_RESOURCE_BARRIER_ALL_SUBRESOURCES,
                StateBefore: before,
                StateAfter: after,
            }),
        },
    }
}

/// 命令分配器
pub struct Dx12CommandAllocator {
    allocator: ID3D12CommandAllocator,
    kind: QueueKind,
}

impl Dx12CommandAllocator {
    pub fn new(allocator: ID3D12CommandAllocator, kind: QueueKind) -> Self {
        Self { allocator, kind }
    }

    pub fn allocator(&self) -> &ID3D12CommandAllocator {
        &self.allocator
    }

    pub fn kind(&self) -> QueueKind {
        self.kind
    }
}

impl CommandAllocator for Dx12CommandAllocator {
    fn reset(&self) -> Result<()> {
        unsafe { self.allocator.Reset() }.context("ID3D12CommandAllocator::Reset")
    }
}

/// 图形或计算命令列表
pub struct Dx12CommandList {
    list: ID3D12GraphicsCommandList,
    kind: QueueKind,
    objects: SharedObjects,
    bound_heap: Option<HeapId>,
}

impl Dx12CommandList {
    pub(crate) fn new(list: ID3D12GraphicsCommandList, kind: QueueKind, objects: SharedObjects) -> Self {
        Self {
            list,
            kind,
            objects,
            bound_heap: None,
        }
    }

    pub fn raw(&self) -> &ID3D12GraphicsCommandList {
        &self.list
    }

    pub fn kind(&self) -> QueueKind {
        self.kind
    }

    fn bound_heap(&self) -> Result<HeapId> {
        self.bound_heap.ok_or_else(|| {
            GraphicsError::InvalidCommandState {
                command: "set_descriptor_table",
                state: "no descriptor heap bound",
            }
            .into()
        })
    }
}

impl CommandList for Dx12CommandList {
    type Allocator = Dx12CommandAllocator;
    type Memory = Dx12UploadMemory;

    fn reset(&mut self, allocator: &Dx12CommandAllocator, pipeline: PipelineKind) -> Result<()> {
        // 静态纹理上传时流水线可能还没创建
        let initial = self.objects.borrow().pipelines.get(&pipeline).cloned();
        unsafe { self.list.Reset(allocator.allocator(), initial.as_ref()) }.context("ID3D12GraphicsCommandList::Reset")?;
        self.bound_heap = None;
        Ok(())
    }

    fn set_viewport(&mut self, viewport: &Viewport) -> Result<()> {
        let d3d_viewport = D3D12_VIEWPORT {
            TopLeftX: 0.0,
            TopLeftY: 0.0,
            Width: viewport.width as f32,
            Height: viewport.height as f32,
            MinDepth: 0.0,
            MaxDepth: 1.0,
        };
        let scissor_rect = RECT {
            left: 0,
            top: 0,
            right: viewport.width as i32,
            bottom: viewport.height as i32,
        };
        unsafe {
            self.list.RSSetViewports(&[d3d_viewport]);
            self.list.RSSetScissorRects(&[scissor_rect]);
        }
        Ok(())
    }

    fn set_pipeline(&mut self, pipeline: PipelineKind) -> Result<()> {
        let objects = self.objects.borrow();
        let pso = objects.pipeline(pipeline)?;
        unsafe { self.list.SetPipelineState(pso) };
        Ok(())
    }

    fn set_descriptor_heap(&mut self, heap: HeapId) -> Result<()> {
        let objects = self.objects.borrow();
        let descriptor_heap = objects.heap(heap)?;
        unsafe {
            self.list.SetDescriptorHeaps(&[Some(descriptor_heap.heap().clone())]);
        }
        self.bound_heap = Some(heap);
        Ok(())
    }

    fn set_root_signature(&mut self, pipeline: PipelineKind) -> Result<()> {
        let objects = self.objects.borrow();
        let root = objects.root_signature(pipeline.is_compute())?;
        unsafe {
            if pipeline.is_compute() {
                self.list.SetComputeRootSignature(root);
            } else {
                self.list.SetGraphicsRootSignature(root);
            }
        }
        Ok(())
    }

    fn set_descriptor_table(&mut self, compute: bool, parameter: u32, heap_index: u32) -> Result<()> {
        let heap = self.bound_heap()?;
        let objects = self.objects.borrow();
        let handle = objects.heap(heap)?.gpu_handle(heap_index)?;
        unsafe {
            if compute {
                self.list.SetComputeRootDescriptorTable(parameter, handle);
            } else {
                self.list.SetGraphicsRootDescriptorTable(parameter, handle);
            }
        }
        Ok(())
    }

    fn transition(&mut self, resource: ResourceId, before: ResourceState, after: ResourceState) -> Result<()> {
        let objects = self.objects.borrow();
        let target = match resource {
            ResourceId::BackBuffer(index) => objects.back_buffer(index)?,
            ResourceId::Texture(texture) => objects.texture(texture)?,
        };
        let barrier = transition_barrier(target, resource_state(before), resource_state(after));
        unsafe { self.list.ResourceBarrier(&[barrier]) };
        Ok(())
    }

    fn clear_render_target(&mut self, back_buffer: usize, color: [f32; 4]) -> Result<()> {
        let objects = self.objects.borrow();
        let rtv = objects.render_target_view(back_buffer)?;
        unsafe { self.list.ClearRenderTargetView(rtv, &color, None) };
        Ok(())
    }

    fn clear_depth(&mut self) -> Result<()> {
        let objects = self.objects.borrow();
        let dsv = objects.depth_stencil_view()?;
        unsafe { self.list.ClearDepthStencilView(dsv, D3D12_CLEAR_FLAG_DEPTH, 1.0, 0, None) };
        Ok(())
    }

    fn set_render_target(&mut self, back_buffer: usize) -> Result<()> {
        let objects = self.objects.borrow();
        let rtv = objects.render_target_view(back_buffer)?;
        let dsv = objects.depth_stencil_view()?;
        unsafe { self.list.OMSetRenderTargets(1, Some(&rtv), false, Some(&dsv)) };
        Ok(())
    }

    fn set_mesh(&mut self, mesh: MeshId) -> Result<()> {
        let objects = self.objects.borrow();
        let mesh = objects.mesh(mesh)?;
        unsafe {
            self.list.IASetPrimitiveTopology(D3D_PRIMITIVE_TOPOLOGY_TRIANGLELIST);
            self.list.IASetVertexBuffers(0, Some(&[mesh.vertex_view]));
            self.list.IASetIndexBuffer(Some(&mesh.index_view));
        }
        Ok(())
    }

    fn set_vertex_buffer(&mut self, gpu_address: u64, byte_size: u64, stride: u32) -> Result<()> {
        let size = u32::try_from(byte_size)
            .map_err(|_| GraphicsError::ResourceCreation(format!("Vertex buffer of {} bytes is too large", byte_size)))?;
        let view = D3D12_VERTEX_BUFFER_VIEW {
            BufferLocation: gpu_address,
            SizeInBytes: size,
            StrideInBytes: stride,
        };
        unsafe { self.list.IASetVertexBuffers(0, Some(&[view])) };
        Ok(())
    }

    fn draw_indexed(&mut self, args: DrawArgs) -> Result<()> {
        unsafe {
            self.list
                .DrawIndexedInstanced(args.index_count, 1, args.start_index, args.base_vertex, 0);
        }
        Ok(())
    }

    fn dispatch(&mut self, x: u32, y: u32, z: u32) -> Result<()> {
        unsafe { self.list.Dispatch(x, y, z) };
        Ok(())
    }

    fn copy_to_texture(
        &mut self,
        source: &Dx12UploadMemory,
        texture: TextureId,
        width: u32,
        height: u32,
        row_pitch: u64,
    ) -> Result<()> {
        let objects = self.objects.borrow();
        let destination = objects.texture(texture)?;

        let dst = D3D12_TEXTURE_COPY_LOCATION {
            pResource: unsafe { std::mem::transmute_copy(destination) },
            Type: D3D12_TEXTURE_COPY_TYPE_SUBRESOURCE_INDEX,
            Anonymous: D3D12_TEXTURE_COPY_LOCATION_0 { SubresourceIndex: 0 },
        };
        let src = D3D12_TEXTURE_COPY_LOCATION {
            pResource: unsafe { std::mem::transmute_copy(source.resource()) },
            Type: D3D12_TEXTURE_COPY_TYPE_PLACED_FOOTPRINT,
            Anonymous: D3D12_TEXTURE_COPY_LOCATION_0 {
                PlacedFootprint: D3D12_PLACED_SUBRESOURCE_FOOTPRINT {
                    Offset: 0,
                    Footprint: D3D12_SUBRESOURCE_FOOTPRINT {
                        Format: TEXTURE_FORMAT,
                        Width: width,
                        Height: height,
                        Depth: 1,
                        RowPitch: row_pitch as u32,
                    },
                },
            },
        };
        unsafe { self.list.CopyTextureRegion(&dst, 0, 0, 0, &src, None) };
        Ok(())
    }

    fn close(&mut self) -> Result<()> {
        unsafe { self.list.Close() }.context("ID3D12GraphicsCommandList::Close")
    }
}
