//! DX12 资源：上传堆内存、纹理、网格缓冲和深度缓冲

use std::ffi::c_void;

use windows::Win32::Graphics::Direct3D12::*;
use windows::Win32::Graphics::Dxgi::Common::*;

use crate::core::error::{GraphicsError, Result};
use crate::geometry::{MeshData, Vertex};
use crate::gfx::dx12::ApiResultExt;
use crate::renderer::backend::TextureUsage;
use crate::renderer::resource::UploadMemory;

/// 纹理和画布的像素格式
pub const TEXTURE_FORMAT: DXGI_FORMAT = DXGI_FORMAT_R8G8B8A8_UNORM;

/// 深度缓冲格式
pub const DEPTH_FORMAT: DXGI_FORMAT = DXGI_FORMAT_D32_FLOAT;

fn buffer_desc(byte_size: u64) -> D3D12_RESOURCE_DESC {
    D3D12_RESOURCE_DESC {
        Dimension: D3D12_RESOURCE_DIMENSION_BUFFER,
        Width: byte_size,
        Height: 1,
        DepthOrArraySize: 1,
        MipLevels: 1,
        SampleDesc: DXGI_SAMPLE_DESC { Count: 1, Quality: 0 },
        Layout: D3D12_TEXTURE_LAYOUT_ROW_MAJOR,
        ..Default::default()
    }
}

fn texture_desc(width: u32, height: u32, format: DXGI_FORMAT, flags: D3D12_RESOURCE_FLAGS) -> D3D12_RESOURCE_DESC {
    D3D12_RESOURCE_DESC {
        Dimension: D3D12_RESOURCE_DIMENSION_TEXTURE2D,
        Width: width as u64,
        Height: height,
        DepthOrArraySize: 1,
        MipLevels: 1,
        Format: format,
        SampleDesc: DXGI_SAMPLE_DESC { Count: 1, Quality: 0 },
        Layout: D3D12_TEXTURE_LAYOUT_UNKNOWN,
        Flags: flags,
        ..Default::default()
    }
}

fn committed_resource(
    device: &ID3D12Device,
    heap_type: D3D12_HEAP_TYPE,
    desc: &D3D12_RESOURCE_DESC,
    state: D3D12_RESOURCE_STATES,
    clear_value: Option<&D3D12_CLEAR_VALUE>,
    what: &str,
) -> Result<ID3D12Resource> {
    let heap_props = D3D12_HEAP_PROPERTIES {
        Type: heap_type,
        ..Default::default()
    };

    let mut resource: Option<ID3D12Resource> = None;
    unsafe {
        device
            .CreateCommittedResource(
                &heap_props,
                D3D12_HEAP_FLAG_NONE,
                desc,
                state,
                clear_value,
                &mut resource,
            )
            .context(what)?;
    }
    resource.ok_or_else(|| GraphicsError::ResourceCreation(format!("{} returned no resource", what)).into())
}

/// 持久映射的上传堆缓冲
///
/// 创建时 Map 一次，直到释放才 Unmap。CPU 只写不读。
pub struct Dx12UploadMemory {
    resource: ID3D12Resource,
    mapped: *mut u8,
    byte_size: u64,
}

impl Dx12UploadMemory {
    pub fn new(device: &ID3D12Device, byte_size: u64) -> Result<Self> {
        let byte_size = byte_size.max(1);
        let resource = committed_resource(
            device,
            D3D12_HEAP_TYPE_UPLOAD,
            &buffer_desc(byte_size),
            D3D12_RESOURCE_STATE_GENERIC_READ,
            None,
            "CreateCommittedResource(upload buffer)",
        )?;

        let mut data: *mut c_void = std::ptr::null_mut();
        unsafe {
            // 空读取范围：CPU 不读回
            resource
                .Map(0, Some(&D3D12_RANGE { Begin: 0, End: 0 }), Some(&mut data))
                .context("Map(upload buffer)")?;
        }
        if data.is_null() {
            return Err(GraphicsError::ResourceCreation("Upload buffer mapped to null".to_string()).into());
        }

        Ok(Self {
            resource,
            mapped: data as *mut u8,
            byte_size,
        })
    }

    pub fn resource(&self) -> &ID3D12Resource {
        &self.resource
    }
}

impl UploadMemory for Dx12UploadMemory {
    fn bytes_mut(&mut self) -> &mut [u8] {
        unsafe { std::slice::from_raw_parts_mut(self.mapped, self.byte_size as usize) }
    }

    fn gpu_address(&self) -> u64 {
        unsafe { self.resource.GetGPUVirtualAddress() }
    }

    fn byte_size(&self) -> u64 {
        self.byte_size
    }
}

impl Drop for Dx12UploadMemory {
    fn drop(&mut self) {
        unsafe {
            self.resource.Unmap(0, None);
        }
    }
}

/// 创建默认堆上的 RGBA8 纹理，初始状态 COMMON
pub fn create_texture(device: &ID3D12Device, width: u32, height: u32, usage: TextureUsage) -> Result<ID3D12Resource> {
    let flags = match usage {
        TextureUsage::Sampled => D3D12_RESOURCE_FLAG_NONE,
        TextureUsage::Storage => D3D12_RESOURCE_FLAG_ALLOW_UNORDERED_ACCESS,
    };
    committed_resource(
        device,
        D3D12_HEAP_TYPE_DEFAULT,
        &texture_desc(width, height, TEXTURE_FORMAT, flags),
        D3D12_RESOURCE_STATE_COMMON,
        None,
        "CreateCommittedResource(texture)",
    )
}

/// 创建深度缓冲，状态保持 DEPTH_WRITE
pub fn create_depth_buffer(device: &ID3D12Device, width: u32, height: u32) -> Result<ID3D12Resource> {
    let clear_value = D3D12_CLEAR_VALUE {
        Format: DEPTH_FORMAT,
        Anonymous: D3D12_CLEAR_VALUE_0 {
            DepthStencil: D3D12_DEPTH_STENCIL_VALUE {
                Depth: 1.0,
                Stencil: 0,
            },
        },
    };
    committed_resource(
        device,
        D3D12_HEAP_TYPE_DEFAULT,
        &texture_desc(width, height, DEPTH_FORMAT, D3D12_RESOURCE_FLAG_ALLOW_DEPTH_STENCIL),
        D3D12_RESOURCE_STATE_DEPTH_WRITE,
        Some(&clear_value),
        "CreateCommittedResource(depth buffer)",
    )
}

/// GPU 上的网格
///
/// 顶点和索引放在上传堆里，只在创建时写一次。
pub struct Dx12Mesh {
    _vertex_buffer: Dx12UploadMemory,
    _index_buffer: Dx12UploadMemory,
    pub vertex_view: D3D12_VERTEX_BUFFER_VIEW,
    pub index_view: D3D12_INDEX_BUFFER_VIEW,
}

impl Dx12Mesh {
    pub fn new(device: &ID3D12Device, mesh: &MeshData) -> Result<Self> {
        let vertex_bytes = mesh.vertex_bytes();
        let index_bytes = mesh.index_bytes();

        let mut vertex_buffer = Dx12UploadMemory::new(device, vertex_bytes.len() as u64)?;
        vertex_buffer.bytes_mut()[..vertex_bytes.len()].copy_from_slice(vertex_bytes);
        let mut index_buffer = Dx12UploadMemory::new(device, index_bytes.len() as u64)?;
        index_buffer.bytes_mut()[..index_bytes.len()].copy_from_slice(index_bytes);

        let vertex_view = D3D12_VERTEX_BUFFER_VIEW {
            BufferLocation: vertex_buffer.gpu_address(),
            SizeInBytes: vertex_bytes.len() as u32,
            StrideInBytes: Vertex::stride(),
        };
        let index_view = D3D12_INDEX_BUFFER_VIEW {
            BufferLocation: index_buffer.gpu_address(),
            SizeInBytes: index_bytes.len() as u32,
            Format: DXGI_FORMAT_R16_UINT,
        };

        Ok(Self {
            _vertex_buffer: vertex_buffer,
            _index_buffer: index_buffer,
            vertex_view,
            index_view,
        })
    }
}
