//! DX12 设备与资源表
//!
//! [`Dx12Device`] 创建的对象都放进 [`Dx12Objects`]，对外只返回句柄。
//! 命令列表和交换链持有同一张表的引用，在录制时把句柄解析成 COM 对象。

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use tracing::{debug, info};
use windows::Win32::Graphics::Direct3D12::*;

use crate::core::error::{GraphicsError, Result};
use crate::geometry::MeshData;
use crate::gfx::dx12::command::{Dx12CommandAllocator, Dx12CommandList};
use crate::gfx::dx12::descriptor::Dx12DescriptorHeap;
use crate::gfx::dx12::pipeline;
use crate::gfx::dx12::resource::{self, Dx12Mesh, Dx12UploadMemory, TEXTURE_FORMAT};
use crate::gfx::dx12::sync::{list_type, Dx12Fence, Dx12Queue};
use crate::gfx::dx12::ApiResultExt;
use crate::renderer::backend::{GpuDevice, HeapId, MeshId, ShaderBytecode, TextureId, TextureUsage};
use crate::renderer::command::PipelineKind;
use crate::renderer::descriptor::{DescriptorHeapDescriptor, GraphicsRootLayout};
use crate::renderer::resource::CONSTANT_BUFFER_ALIGNMENT;
use crate::renderer::sync::QueueKind;

/// 设备创建的所有 GPU 对象
#[derive(Default)]
pub struct Dx12Objects {
    pub heaps: Vec<Dx12DescriptorHeap>,
    pub textures: Vec<ID3D12Resource>,
    pub meshes: Vec<Dx12Mesh>,
    pub graphics_root: Option<ID3D12RootSignature>,
    pub compute_root: Option<ID3D12RootSignature>,
    pub pipelines: HashMap<PipelineKind, ID3D12PipelineState>,
    /// 交换链的后台缓冲，由 [`Dx12Presenter`](super::Dx12Presenter) 维护
    pub back_buffers: Vec<ID3D12Resource>,
    pub rtv_heap: Option<Dx12DescriptorHeap>,
    pub dsv_heap: Option<Dx12DescriptorHeap>,
    pub depth_buffer: Option<ID3D12Resource>,
}

pub(crate) type SharedObjects = Rc<RefCell<Dx12Objects>>;

impl Dx12Objects {
    pub fn heap(&self, id: HeapId) -> Result<&Dx12DescriptorHeap> {
        self.heaps
            .get(id.0)
            .ok_or_else(|| GraphicsError::out_of_range("Descriptor heap", id.0, self.heaps.len()).into())
    }

    pub fn texture(&self, id: TextureId) -> Result<&ID3D12Resource> {
        self.textures
            .get(id.0)
            .ok_or_else(|| GraphicsError::out_of_range("Texture", id.0, self.textures.len()).into())
    }

    pub fn mesh(&self, id: MeshId) -> Result<&Dx12Mesh> {
        self.meshes
            .get(id.0)
            .ok_or_else(|| GraphicsError::out_of_range("Mesh", id.0, self.meshes.len()).into())
    }

    pub fn back_buffer(&self, index: usize) -> Result<&ID3D12Resource> {
        self.back_buffers
            .get(index)
            .ok_or_else(|| GraphicsError::out_of_range("Back buffer", index, self.back_buffers.len()).into())
    }

    pub fn pipeline(&self, kind: PipelineKind) -> Result<&ID3D12PipelineState> {
        self.pipelines
            .get(&kind)
            .ok_or_else(|| GraphicsError::ResourceCreation(format!("{:?} pipeline has not been created", kind)).into())
    }

    pub fn root_signature(&self, compute: bool) -> Result<&ID3D12RootSignature> {
        let root = if compute { &self.compute_root } else { &self.graphics_root };
        root.as_ref().ok_or_else(|| {
            GraphicsError::ResourceCreation(format!(
                "{} root signature has not been created",
                if compute { "Compute" } else { "Graphics" }
            ))
            .into()
        })
    }

    /// 第 `index` 个后台缓冲的 RTV
    pub fn render_target_view(&self, index: usize) -> Result<D3D12_CPU_DESCRIPTOR_HANDLE> {
        self.rtv_heap
            .as_ref()
            .ok_or_else(|| GraphicsError::Swapchain("RTV heap missing".to_string()))?
            .cpu_handle(index as u32)
    }

    pub fn depth_stencil_view(&self) -> Result<D3D12_CPU_DESCRIPTOR_HANDLE> {
        self.dsv_heap
            .as_ref()
            .ok_or_else(|| GraphicsError::Swapchain("DSV heap missing".to_string()))?
            .cpu_handle(0)
    }
}

/// Direct3D 12 设备
pub struct Dx12Device {
    device: ID3D12Device,
    objects: SharedObjects,
}

impl Dx12Device {
    pub fn new(device: ID3D12Device) -> Self {
        Self {
            device,
            objects: Rc::new(RefCell::new(Dx12Objects::default())),
        }
    }

    pub fn raw(&self) -> &ID3D12Device {
        &self.device
    }

    pub(crate) fn objects(&self) -> SharedObjects {
        self.objects.clone()
    }
}

impl GpuDevice for Dx12Device {
    type Fence = Dx12Fence;
    type Allocator = Dx12CommandAllocator;
    type Memory = Dx12UploadMemory;
    type List = Dx12CommandList;
    type Queue = Dx12Queue;

    fn name(&self) -> &'static str {
        "Direct3D 12"
    }

    fn create_queue(&self, kind: QueueKind) -> Result<Dx12Queue> {
        Dx12Queue::new(&self.device, kind)
    }

    fn create_fence(&self) -> Result<Dx12Fence> {
        Dx12Fence::new(&self.device)
    }

    fn create_allocator(&self, kind: QueueKind) -> Result<Dx12CommandAllocator> {
        let allocator: ID3D12CommandAllocator = unsafe { self.device.CreateCommandAllocator(list_type(kind)) }
            .context(&format!("CreateCommandAllocator({})", kind.name()))?;
        Ok(Dx12CommandAllocator::new(allocator, kind))
    }

    fn create_command_list(&self, kind: QueueKind, allocator: &Dx12CommandAllocator) -> Result<Dx12CommandList> {
        if allocator.kind() != kind {
            return Err(GraphicsError::ResourceCreation("Allocator type does not match command list".to_string()).into());
        }
        let list: ID3D12GraphicsCommandList = unsafe {
            self.device
                .CreateCommandList(0, list_type(kind), allocator.allocator(), None::<&ID3D12PipelineState>)
                .context(&format!("CreateCommandList({})", kind.name()))?
        };
        // 新建的命令列表处于录制状态，关闭后交给帧循环 Reset
        unsafe { list.Close() }.context("ID3D12GraphicsCommandList::Close")?;
        Ok(Dx12CommandList::new(list, kind, self.objects()))
    }

    fn create_upload_memory(&self, byte_size: u64) -> Result<Dx12UploadMemory> {
        Dx12UploadMemory::new(&self.device, byte_size)
    }

    fn create_descriptor_heap(&self, desc: &DescriptorHeapDescriptor) -> Result<HeapId> {
        if desc.num_descriptors == 0 {
            return Err(GraphicsError::ResourceCreation("Descriptor heap must not be empty".to_string()).into());
        }
        let heap = Dx12DescriptorHeap::new(&self.device, desc)?;
        let mut objects = self.objects.borrow_mut();
        objects.heaps.push(heap);
        debug!(
            heap = objects.heaps.len() - 1,
            kind = desc.descriptor_type.name(),
            descriptors = desc.num_descriptors,
            "Descriptor heap created"
        );
        Ok(HeapId(objects.heaps.len() - 1))
    }

    fn create_constant_buffer_view(&self, heap: HeapId, index: u32, gpu_address: u64, byte_size: u64) -> Result<()> {
        if byte_size % CONSTANT_BUFFER_ALIGNMENT != 0 {
            return Err(GraphicsError::ResourceCreation(format!("CBV size {} is not 256-byte aligned", byte_size)).into());
        }
        let objects = self.objects.borrow();
        let handle = objects.heap(heap)?.cpu_handle(index)?;
        let desc = D3D12_CONSTANT_BUFFER_VIEW_DESC {
            BufferLocation: gpu_address,
            SizeInBytes: byte_size as u32,
        };
        unsafe { self.device.CreateConstantBufferView(Some(&desc), handle) };
        Ok(())
    }

    fn create_texture(&self, width: u32, height: u32, usage: TextureUsage) -> Result<TextureId> {
        if width == 0 || height == 0 {
            return Err(GraphicsError::ResourceCreation(format!("Invalid texture size {}x{}", width, height)).into());
        }
        let texture = resource::create_texture(&self.device, width, height, usage)?;
        let mut objects = self.objects.borrow_mut();
        objects.textures.push(texture);
        Ok(TextureId(objects.textures.len() - 1))
    }

    fn create_shader_resource_view(&self, heap: HeapId, index: u32, texture: TextureId) -> Result<()> {
        let objects = self.objects.borrow();
        let handle = objects.heap(heap)?.cpu_handle(index)?;
        let desc = D3D12_SHADER_RESOURCE_VIEW_DESC {
            Format: TEXTURE_FORMAT,
            ViewDimension: D3D12_SRV_DIMENSION_TEXTURE2D,
            Shader4ComponentMapping: D3D12_DEFAULT_SHADER_4_COMPONENT_MAPPING,
            Anonymous: D3D12_SHADER_RESOURCE_VIEW_DESC_0 {
                Texture2D: D3D12_TEX2D_SRV {
                    MipLevels: 1,
                    ..Default::default()
                },
            },
        };
        unsafe {
            self.device
                .CreateShaderResourceView(objects.texture(texture)?, Some(&desc), handle)
        };
        Ok(())
    }

    fn create_unordered_access_view(&self, heap: HeapId, index: u32, texture: TextureId) -> Result<()> {
        let objects = self.objects.borrow();
        let handle = objects.heap(heap)?.cpu_handle(index)?;
        let target = objects.texture(texture)?;
        let desc = unsafe { target.GetDesc() };
        if (desc.Flags & D3D12_RESOURCE_FLAG_ALLOW_UNORDERED_ACCESS).0 == 0 {
            return Err(GraphicsError::ResourceCreation("UAV requires a storage texture".to_string()).into());
        }
        let uav_desc = D3D12_UNORDERED_ACCESS_VIEW_DESC {
            Format: TEXTURE_FORMAT,
            ViewDimension: D3D12_UAV_DIMENSION_TEXTURE2D,
            Anonymous: D3D12_UNORDERED_ACCESS_VIEW_DESC_0 {
                Texture2D: D3D12_TEX2D_UAV::default(),
            },
        };
        unsafe {
            self.device
                .CreateUnorderedAccessView(target, None::<&ID3D12Resource>, Some(&uav_desc), handle)
        };
        Ok(())
    }

    fn create_mesh(&self, mesh: &MeshData) -> Result<MeshId> {
        if mesh.indices.iter().any(|i| *i as usize >= mesh.vertices.len()) {
            return Err(GraphicsError::ResourceCreation("Mesh index exceeds vertex count".to_string()).into());
        }
        let gpu_mesh = Dx12Mesh::new(&self.device, mesh)?;
        let mut objects = self.objects.borrow_mut();
        objects.meshes.push(gpu_mesh);
        debug!(
            vertices = mesh.vertices.len(),
            indices = mesh.indices.len(),
            "Mesh uploaded"
        );
        Ok(MeshId(objects.meshes.len() - 1))
    }

    fn create_graphics_pipelines(&self, root: &GraphicsRootLayout, shaders: &ShaderBytecode) -> Result<()> {
        let root_signature = pipeline::create_graphics_root_signature(&self.device, root)?;
        let opaque = pipeline::create_graphics_pipeline(
            &self.device,
            &root_signature,
            &shaders.vertex,
            &shaders.pixel,
            D3D12_FILL_MODE_SOLID,
        )?;
        let wireframe = pipeline::create_graphics_pipeline(
            &self.device,
            &root_signature,
            &shaders.vertex,
            &shaders.pixel,
            D3D12_FILL_MODE_WIREFRAME,
        )?;

        let mut objects = self.objects.borrow_mut();
        objects.graphics_root = Some(root_signature);
        objects.pipelines.insert(PipelineKind::Opaque, opaque);
        objects.pipelines.insert(PipelineKind::Wireframe, wireframe);
        info!(
            material = root.material,
            textures = root.texture_count,
            "Graphics pipelines created"
        );
        Ok(())
    }

    fn create_compute_pipeline(&self, shader: &[u8]) -> Result<()> {
        let root_signature = pipeline::create_compute_root_signature(&self.device)?;
        let pso = pipeline::create_compute_pipeline(&self.device, &root_signature, shader)?;

        let mut objects = self.objects.borrow_mut();
        objects.compute_root = Some(root_signature);
        objects.pipelines.insert(PipelineKind::Compute, pso);
        info!("Compute pipeline created");
        Ok(())
    }

    fn has_pipeline(&self, pipeline: PipelineKind) -> bool {
        self.objects.borrow().pipelines.contains_key(&pipeline)
    }
}
