//! 根签名与流水线状态对象
//!
//! 图形根签名全部由描述符表组成，顺序与 [`GraphicsRootLayout::parameter`] 一致：
//!
//! ```text
//! 0: b0 物体常量   1: b1 渲染过程常量   [2: b2 材质常量]   [n: t0..tN 纹理]
//! ```
//!
//! 计算根签名固定为 b0 参数、t0 源帧、u0 画布三张表。

use std::mem::ManuallyDrop;

use windows::Win32::Graphics::Direct3D::*;
use windows::Win32::Graphics::Direct3D12::*;
use windows::Win32::Graphics::Dxgi::Common::*;

use crate::core::error::{GraphicsError, Result};
use crate::geometry::VERTEX_LAYOUT;
use crate::gfx::dx12::resource::{DEPTH_FORMAT, TEXTURE_FORMAT};
use crate::gfx::dx12::ApiResultExt;
use crate::renderer::descriptor::{ComputeRootSlot, GraphicsRootLayout, RootSlot};

fn descriptor_range(range_type: D3D12_DESCRIPTOR_RANGE_TYPE, count: u32, register: u32) -> D3D12_DESCRIPTOR_RANGE {
    D3D12_DESCRIPTOR_RANGE {
        RangeType: range_type,
        NumDescriptors: count,
        BaseShaderRegister: register,
        RegisterSpace: 0,
        OffsetInDescriptorsFromTableStart: D3D12_DESCRIPTOR_RANGE_OFFSET_APPEND,
    }
}

fn table_parameter(range: &D3D12_DESCRIPTOR_RANGE, visibility: D3D12_SHADER_VISIBILITY) -> D3D12_ROOT_PARAMETER {
    D3D12_ROOT_PARAMETER {
        ParameterType: D3D12_ROOT_PARAMETER_TYPE_DESCRIPTOR_TABLE,
        Anonymous: D3D12_ROOT_PARAMETER_0 {
            DescriptorTable: D3D12_ROOT_DESCRIPTOR_TABLE {
                NumDescriptorRanges: 1,
                pDescriptorRanges: range,
            },
        },
        ShaderVisibility: visibility,
    }
}

fn linear_wrap_sampler() -> D3D12_STATIC_SAMPLER_DESC {
    D3D12_STATIC_SAMPLER_DESC {
        Filter: D3D12_FILTER_MIN_MAG_MIP_LINEAR,
        AddressU: D3D12_TEXTURE_ADDRESS_MODE_WRAP,
        AddressV: D3D12_TEXTURE_ADDRESS_MODE_WRAP,
        AddressW: D3D12_TEXTURE_ADDRESS_MODE_WRAP,
        MipLODBias: 0.0,
        MaxAnisotropy: 1,
        ComparisonFunc: D3D12_COMPARISON_FUNC_ALWAYS,
        BorderColor: D3D12_STATIC_BORDER_COLOR_OPAQUE_BLACK,
        MinLOD: 0.0,
        MaxLOD: D3D12_FLOAT32_MAX,
        ShaderRegister: 0,
        RegisterSpace: 0,
        ShaderVisibility: D3D12_SHADER_VISIBILITY_PIXEL,
    }
}

fn serialize_root_signature(device: &ID3D12Device, desc: &D3D12_ROOT_SIGNATURE_DESC, what: &str) -> Result<ID3D12RootSignature> {
    unsafe {
        let mut signature: Option<ID3DBlob> = None;
        D3D12SerializeRootSignature(desc, D3D_ROOT_SIGNATURE_VERSION_1, &mut signature, None).context(what)?;
        let signature = signature
            .ok_or_else(|| GraphicsError::ResourceCreation(format!("{} serialized to nothing", what)))?;

        device
            .CreateRootSignature(
                0,
                std::slice::from_raw_parts(signature.GetBufferPointer() as *const u8, signature.GetBufferSize()),
            )
            .context(what)
    }
}

/// 按布局创建图形根签名
pub fn create_graphics_root_signature(device: &ID3D12Device, layout: &GraphicsRootLayout) -> Result<ID3D12RootSignature> {
    let object_range = descriptor_range(D3D12_DESCRIPTOR_RANGE_TYPE_CBV, 1, 0);
    let pass_range = descriptor_range(D3D12_DESCRIPTOR_RANGE_TYPE_CBV, 1, 1);
    let material_range = descriptor_range(D3D12_DESCRIPTOR_RANGE_TYPE_CBV, 1, 2);
    let texture_range = descriptor_range(D3D12_DESCRIPTOR_RANGE_TYPE_SRV, layout.texture_count, 0);

    let mut parameters = vec![D3D12_ROOT_PARAMETER::default(); layout.parameter_count() as usize];
    parameters[layout.parameter(RootSlot::Object)? as usize] =
        table_parameter(&object_range, D3D12_SHADER_VISIBILITY_ALL);
    parameters[layout.parameter(RootSlot::Pass)? as usize] = table_parameter(&pass_range, D3D12_SHADER_VISIBILITY_ALL);
    if layout.material {
        parameters[layout.parameter(RootSlot::Material)? as usize] =
            table_parameter(&material_range, D3D12_SHADER_VISIBILITY_PIXEL);
    }
    if layout.texture_count > 0 {
        parameters[layout.parameter(RootSlot::Textures)? as usize] =
            table_parameter(&texture_range, D3D12_SHADER_VISIBILITY_PIXEL);
    }

    let samplers = [linear_wrap_sampler()];
    let desc = D3D12_ROOT_SIGNATURE_DESC {
        NumParameters: parameters.len() as u32,
        pParameters: parameters.as_ptr(),
        NumStaticSamplers: samplers.len() as u32,
        pStaticSamplers: samplers.as_ptr(),
        Flags: D3D12_ROOT_SIGNATURE_FLAG_ALLOW_INPUT_ASSEMBLER_INPUT_LAYOUT,
    };
    serialize_root_signature(device, &desc, "graphics root signature")
}

/// GIF 合成的计算根签名
pub fn create_compute_root_signature(device: &ID3D12Device) -> Result<ID3D12RootSignature> {
    let params_range = descriptor_range(D3D12_DESCRIPTOR_RANGE_TYPE_CBV, 1, 0);
    let source_range = descriptor_range(D3D12_DESCRIPTOR_RANGE_TYPE_SRV, 1, 0);
    let canvas_range = descriptor_range(D3D12_DESCRIPTOR_RANGE_TYPE_UAV, 1, 0);

    let mut parameters = [D3D12_ROOT_PARAMETER::default(); 3];
    parameters[ComputeRootSlot::Params.parameter() as usize] =
        table_parameter(&params_range, D3D12_SHADER_VISIBILITY_ALL);
    parameters[ComputeRootSlot::Source.parameter() as usize] =
        table_parameter(&source_range, D3D12_SHADER_VISIBILITY_ALL);
    parameters[ComputeRootSlot::Canvas.parameter() as usize] =
        table_parameter(&canvas_range, D3D12_SHADER_VISIBILITY_ALL);

    let desc = D3D12_ROOT_SIGNATURE_DESC {
        NumParameters: parameters.len() as u32,
        pParameters: parameters.as_ptr(),
        NumStaticSamplers: 0,
        pStaticSamplers: std::ptr::null(),
        Flags: D3D12_ROOT_SIGNATURE_FLAG_NONE,
    };
    serialize_root_signature(device, &desc, "compute root signature")
}

fn bytecode(bytes: &[u8]) -> D3D12_SHADER_BYTECODE {
    D3D12_SHADER_BYTECODE {
        pShaderBytecode: bytes.as_ptr() as *const _,
        BytecodeLength: bytes.len(),
    }
}

fn input_layout() -> Vec<D3D12_INPUT_ELEMENT_DESC> {
    VERTEX_LAYOUT
        .iter()
        .map(|attribute| D3D12_INPUT_ELEMENT_DESC {
            SemanticName: windows::core::PCSTR(attribute.semantic.as_ptr()),
            SemanticIndex: 0,
            Format: match attribute.components {
                2 => DXGI_FORMAT_R32G32_FLOAT,
                3 => DXGI_FORMAT_R32G32B32_FLOAT,
                _ => DXGI_FORMAT_R32G32B32A32_FLOAT,
            },
            InputSlot: 0,
            AlignedByteOffset: attribute.offset,
            InputSlotClass: D3D12_INPUT_CLASSIFICATION_PER_VERTEX_DATA,
            InstanceDataStepRate: 0,
        })
        .collect()
}

/// 创建一条图形流水线，`fill_mode` 区分实心和线框
pub fn create_graphics_pipeline(
    device: &ID3D12Device,
    root_signature: &ID3D12RootSignature,
    vertex_shader: &[u8],
    pixel_shader: &[u8],
    fill_mode: D3D12_FILL_MODE,
) -> Result<ID3D12PipelineState> {
    let input_elements = input_layout();

    let mut pso_desc = D3D12_GRAPHICS_PIPELINE_STATE_DESC::default();
    pso_desc.pRootSignature = ManuallyDrop::new(Some(root_signature.clone()));
    pso_desc.VS = bytecode(vertex_shader);
    pso_desc.PS = bytecode(pixel_shader);
    pso_desc.BlendState.RenderTarget[0] = D3D12_RENDER_TARGET_BLEND_DESC {
        BlendEnable: false.into(),
        LogicOpEnable: false.into(),
        RenderTargetWriteMask: D3D12_COLOR_WRITE_ENABLE_ALL.0 as u8,
        ..Default::default()
    };
    pso_desc.RasterizerState = D3D12_RASTERIZER_DESC {
        FillMode: fill_mode,
        CullMode: D3D12_CULL_MODE_BACK,
        DepthClipEnable: true.into(),
        ..Default::default()
    };
    pso_desc.DepthStencilState = D3D12_DEPTH_STENCIL_DESC {
        DepthEnable: true.into(),
        DepthWriteMask: D3D12_DEPTH_WRITE_MASK_ALL,
        DepthFunc: D3D12_COMPARISON_FUNC_LESS,
        StencilEnable: false.into(),
        ..Default::default()
    };
    pso_desc.SampleMask = u32::MAX;
    pso_desc.DSVFormat = DEPTH_FORMAT;
    pso_desc.InputLayout = D3D12_INPUT_LAYOUT_DESC {
        pInputElementDescs: input_elements.as_ptr(),
        NumElements: input_elements.len() as u32,
    };
    pso_desc.PrimitiveTopologyType = D3D12_PRIMITIVE_TOPOLOGY_TYPE_TRIANGLE;
    pso_desc.NumRenderTargets = 1;
    pso_desc.RTVFormats[0] = TEXTURE_FORMAT;
    pso_desc.SampleDesc.Count = 1;

    let result = unsafe { device.CreateGraphicsPipelineState(&pso_desc) }.context("CreateGraphicsPipelineState");
    unsafe {
        ManuallyDrop::drop(&mut pso_desc.pRootSignature);
    }
    result
}

/// 创建计算流水线
pub fn create_compute_pipeline(
    device: &ID3D12Device,
    root_signature: &ID3D12RootSignature,
    shader: &[u8],
) -> Result<ID3D12PipelineState> {
    let mut pso_desc = D3D12_COMPUTE_PIPELINE_STATE_DESC {
        pRootSignature: ManuallyDrop::new(Some(root_signature.clone())),
        CS: bytecode(shader),
        ..Default::default()
    };
    let result = unsafe { device.CreateComputePipelineState(&pso_desc) }.context("CreateComputePipelineState");
    unsafe {
        ManuallyDrop::drop(&mut pso_desc.pRootSignature);
    }
    result
}
