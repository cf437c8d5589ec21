//! DX12 描述符堆

use windows::core::Interface;
use windows::Win32::Graphics::Direct3D12::*;

use crate::core::error::{GraphicsError, Result};
use crate::gfx::dx12::{set_name, ApiResultExt};
use crate::renderer::descriptor::{
    CpuDescriptorHandle, DescriptorHeapDescriptor, DescriptorType, GpuDescriptorHandle,
};

/// DX12 描述符堆
///
/// 封装 ID3D12DescriptorHeap，按索引换算 CPU/GPU 句柄。
pub struct Dx12DescriptorHeap {
    heap: ID3D12DescriptorHeap,
    descriptor_type: DescriptorType,
    increment_size: u32,
    cpu_start: usize,
    /// 仅着色器可见的堆有 GPU 句柄
    gpu_start: Option<u64>,
    num_descriptors: u32,
}

impl Dx12DescriptorHeap {
    /// 创建描述符堆
    ///
    /// # 参数
    ///
    /// * `device` - DX12 设备
    /// * `desc` - 描述符堆描述信息
    pub fn new(device: &ID3D12Device, desc: &DescriptorHeapDescriptor) -> Result<Self> {
        let heap_type = match desc.descriptor_type {
            DescriptorType::RenderTargetView => D3D12_DESCRIPTOR_HEAP_TYPE_RTV,
            DescriptorType::DepthStencilView => D3D12_DESCRIPTOR_HEAP_TYPE_DSV,
            DescriptorType::CbvSrvUav => D3D12_DESCRIPTOR_HEAP_TYPE_CBV_SRV_UAV,
        };
        let flags = if desc.shader_visible {
            D3D12_DESCRIPTOR_HEAP_FLAG_SHADER_VISIBLE
        } else {
            D3D12_DESCRIPTOR_HEAP_FLAG_NONE
        };

        let heap_desc = D3D12_DESCRIPTOR_HEAP_DESC {
            Type: heap_type,
            NumDescriptors: desc.num_descriptors,
            Flags: flags,
            NodeMask: 0,
        };

        unsafe {
            let heap: ID3D12DescriptorHeap = device
                .CreateDescriptorHeap(&heap_desc)
                .context(&format!("CreateDescriptorHeap({})", desc.descriptor_type.name()))?;

            if let Some(name) = &desc.name {
                if let Ok(object) = heap.cast::<ID3D12Object>() {
                    set_name(&object, name);
                }
            }

            let increment_size = device.GetDescriptorHandleIncrementSize(heap_type);
            let cpu_start = heap.GetCPUDescriptorHandleForHeapStart().ptr;
            let gpu_start = desc
                .shader_visible
                .then(|| heap.GetGPUDescriptorHandleForHeapStart().ptr);

            Ok(Self {
                heap,
                descriptor_type: desc.descriptor_type,
                increment_size,
                cpu_start,
                gpu_start,
                num_descriptors: desc.num_descriptors,
            })
        }
    }

    pub fn heap(&self) -> &ID3D12DescriptorHeap {
        &self.heap
    }

    pub fn descriptor_type(&self) -> DescriptorType {
        self.descriptor_type
    }

    pub fn num_descriptors(&self) -> u32 {
        self.num_descriptors
    }

    /// 第 `index` 个描述符的 CPU 句柄
    pub fn cpu_handle(&self, index: u32) -> Result<D3D12_CPU_DESCRIPTOR_HANDLE> {
        self.check(index)?;
        let handle = CpuDescriptorHandle::new(self.cpu_start, 0).offset(index, self.increment_size);
        Ok(D3D12_CPU_DESCRIPTOR_HANDLE { ptr: handle.ptr })
    }

    /// 第 `index` 个描述符的 GPU 句柄（仅着色器可见的堆）
    pub fn gpu_handle(&self, index: u32) -> Result<D3D12_GPU_DESCRIPTOR_HANDLE> {
        self.check(index)?;
        let start = self.gpu_start.ok_or_else(|| {
            GraphicsError::ResourceCreation(format!(
                "{} heap is not shader visible",
                self.descriptor_type.name()
            ))
        })?;
        let handle = GpuDescriptorHandle::new(start, 0).offset(index, self.increment_size);
        Ok(D3D12_GPU_DESCRIPTOR_HANDLE { ptr: handle.ptr })
    }

    fn check(&self, index: u32) -> Result<()> {
        if index >= self.num_descriptors {
            return Err(GraphicsError::out_of_range(
                "Descriptor",
                index as usize,
                self.num_descriptors as usize,
            )
            .into());
        }
        Ok(())
    }
}
