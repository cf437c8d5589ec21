//! DirectX 12 上下文创建与交换链
//!
//! # 初始化流程
//!
//! 1. 启用调试层（`graphics.debug_layer`）
//! 2. 创建 DXGI 工厂
//! 3. 创建 D3D12 设备
//! 4. 创建图形队列，GIF 演示额外创建计算队列
//! 5. 创建交换链、RTV/DSV 堆和深度缓冲
//! 6. 创建共享 Fence（见 [`GpuContext::new`]）

use raw_window_handle::{HasWindowHandle, RawWindowHandle};
use tracing::debug;
use windows::core::Interface;
use windows::Win32::Foundation::HWND;
use windows::Win32::Graphics::Direct3D::D3D_FEATURE_LEVEL_11_0;
use windows::Win32::Graphics::Direct3D12::*;
use windows::Win32::Graphics::Dxgi::Common::*;
use windows::Win32::Graphics::Dxgi::*;
use winit::window::Window;

use crate::core::config::Config;
use crate::core::error::{GraphicsError, Result};
use crate::gfx::dx12::descriptor::Dx12DescriptorHeap;
use crate::gfx::dx12::device::{Dx12Device, SharedObjects};
use crate::gfx::dx12::resource::{create_depth_buffer, TEXTURE_FORMAT};
use crate::gfx::dx12::sync::Dx12Queue;
use crate::gfx::dx12::ApiResultExt;
use crate::renderer::backend::GpuDevice;
use crate::renderer::descriptor::DescriptorHeapDescriptor;
use crate::renderer::swapchain::{validate_buffer_count, Presenter};
use crate::renderer::sync::QueueKind;
use crate::renderer::GpuContext;
use crate::{engine_error, engine_info, engine_warn};

/// DXGI 交换链
///
/// 后台缓冲、RTV 和深度缓冲写入设备的资源表，命令列表按后台缓冲索引取用。
pub struct Dx12Presenter {
    device: ID3D12Device,
    swap_chain: IDXGISwapChain3,
    objects: SharedObjects,
    buffer_count: usize,
    current: usize,
    extent: (u32, u32),
}

impl Dx12Presenter {
    fn new(
        device: &Dx12Device,
        factory: &IDXGIFactory4,
        queue: &Dx12Queue,
        hwnd: HWND,
        buffer_count: usize,
        extent: (u32, u32),
    ) -> Result<Self> {
        validate_buffer_count(buffer_count)?;
        let (width, height) = (extent.0.max(1), extent.1.max(1));

        let swap_chain_desc = DXGI_SWAP_CHAIN_DESC1 {
            Width: width,
            Height: height,
            Format: TEXTURE_FORMAT,
            SampleDesc: DXGI_SAMPLE_DESC {
                Count: 1,
                ..Default::default()
            },
            BufferUsage: DXGI_USAGE_RENDER_TARGET_OUTPUT,
            BufferCount: buffer_count as u32,
            SwapEffect: DXGI_SWAP_EFFECT_FLIP_DISCARD,
            ..Default::default()
        };

        let swap_chain: IDXGISwapChain3 = unsafe {
            let swap_chain: IDXGISwapChain1 = factory
                .CreateSwapChainForHwnd(queue.queue(), hwnd, &swap_chain_desc, None, None)
                .context("CreateSwapChainForHwnd")?;
            swap_chain.cast().context("IDXGISwapChain1::cast::<IDXGISwapChain3>")?
        };

        let rtv_heap = Dx12DescriptorHeap::new(
            device.raw(),
            &DescriptorHeapDescriptor::rtv(buffer_count as u32).with_name("Swapchain RTV Heap"),
        )?;
        let dsv_heap = Dx12DescriptorHeap::new(
            device.raw(),
            &DescriptorHeapDescriptor::dsv(1).with_name("Depth DSV Heap"),
        )?;
        {
            let objects = device.objects();
            let mut objects = objects.borrow_mut();
            objects.rtv_heap = Some(rtv_heap);
            objects.dsv_heap = Some(dsv_heap);
        }

        let mut presenter = Self {
            device: device.raw().clone(),
            current: unsafe { swap_chain.GetCurrentBackBufferIndex() } as usize,
            swap_chain,
            objects: device.objects(),
            buffer_count,
            extent: (width, height),
        };
        presenter.create_views()?;

        engine_info!(width, height, buffers = buffer_count, "Swap chain created");
        Ok(presenter)
    }

    /// 取出后台缓冲并重建 RTV、深度缓冲和 DSV
    fn create_views(&mut self) -> Result<()> {
        let mut objects = self.objects.borrow_mut();
        objects.back_buffers.clear();

        for i in 0..self.buffer_count {
            let surface: ID3D12Resource =
                unsafe { self.swap_chain.GetBuffer(i as u32) }.context("IDXGISwapChain3::GetBuffer")?;
            let handle = objects.render_target_view(i)?;
            unsafe { self.device.CreateRenderTargetView(&surface, None, handle) };
            objects.back_buffers.push(surface);
        }

        let depth_buffer = create_depth_buffer(&self.device, self.extent.0, self.extent.1)?;
        let dsv = objects.depth_stencil_view()?;
        unsafe { self.device.CreateDepthStencilView(&depth_buffer, None, dsv) };
        objects.depth_buffer = Some(depth_buffer);

        debug!(width = self.extent.0, height = self.extent.1, "Render target views rebuilt");
        Ok(())
    }
}

impl Presenter for Dx12Presenter {
    fn buffer_count(&self) -> usize {
        self.buffer_count
    }

    fn current_back_buffer(&self) -> usize {
        self.current
    }

    fn present(&mut self, sync_interval: u32) -> Result<usize> {
        let hr = unsafe { self.swap_chain.Present(sync_interval, DXGI_PRESENT(0)) };
        if hr == DXGI_ERROR_DEVICE_REMOVED || hr == DXGI_ERROR_DEVICE_RESET {
            let reason = unsafe { self.device.GetDeviceRemovedReason() };
            engine_error!(result = ?hr, reason = ?reason, "Device lost during present");
        }
        hr.ok().context("IDXGISwapChain::Present")?;
        self.current = unsafe { self.swap_chain.GetCurrentBackBufferIndex() } as usize;
        Ok(self.current)
    }

    fn resize(&mut self, width: u32, height: u32) -> Result<()> {
        // 最小化时尺寸为 0，保留原缓冲
        if width == 0 || height == 0 || (width, height) == self.extent {
            return Ok(());
        }

        {
            // ResizeBuffers 要求释放所有后台缓冲引用
            let mut objects = self.objects.borrow_mut();
            objects.back_buffers.clear();
            objects.depth_buffer = None;
        }

        unsafe {
            self.swap_chain
                .ResizeBuffers(
                    self.buffer_count as u32,
                    width,
                    height,
                    TEXTURE_FORMAT,
                    DXGI_SWAP_CHAIN_FLAG(0),
                )
                .context("IDXGISwapChain::ResizeBuffers")?;
        }
        self.extent = (width, height);
        self.current = unsafe { self.swap_chain.GetCurrentBackBufferIndex() } as usize;
        self.create_views()?;

        engine_info!(width, height, "Swap chain resized");
        Ok(())
    }

    fn extent(&self) -> (u32, u32) {
        self.extent
    }
}

fn enable_debug_layer() {
    let mut debug_interface: Option<ID3D12Debug> = None;
    match unsafe { D3D12GetDebugInterface(&mut debug_interface) } {
        Ok(()) => {
            if let Some(debug_interface) = debug_interface {
                unsafe { debug_interface.EnableDebugLayer() };
                debug!("DX12 debug layer enabled");
            }
        }
        Err(e) => engine_warn!(error = %e, "Failed to enable DX12 debug layer"),
    }
}

fn window_hwnd(window: &Window) -> Result<HWND> {
    let handle = window
        .window_handle()
        .map_err(|e| GraphicsError::Swapchain(format!("Failed to get window handle: {}", e)))?;
    match handle.as_raw() {
        RawWindowHandle::Win32(win32_handle) => Ok(HWND(win32_handle.hwnd.get() as *mut std::ffi::c_void)),
        _ => Err(GraphicsError::Swapchain("Expected a Win32 window handle".to_string()).into()),
    }
}

/// 为窗口创建 Direct3D 12 上下文
///
/// # 参数
///
/// * `window` - 要呈现到的窗口
/// * `config` - 读取 `graphics.frame_count`、`graphics.debug_layer` 和演示种类
pub fn create_context(window: &Window, config: &Config) -> Result<GpuContext<Dx12Device, Dx12Presenter>> {
    if config.graphics.debug_layer {
        enable_debug_layer();
    }

    let factory_flags = if config.graphics.debug_layer {
        DXGI_CREATE_FACTORY_DEBUG
    } else {
        DXGI_CREATE_FACTORY_FLAGS(0)
    };
    let factory: IDXGIFactory4 = unsafe { CreateDXGIFactory2(factory_flags) }.context("CreateDXGIFactory2")?;

    let mut device: Option<ID3D12Device> = None;
    unsafe { D3D12CreateDevice(None, D3D_FEATURE_LEVEL_11_0, &mut device) }.context("D3D12CreateDevice")?;
    let device = Dx12Device::new(
        device.ok_or_else(|| GraphicsError::DeviceCreation("D3D12CreateDevice returned no device".to_string()))?,
    );
    debug!("D3D12 device created");

    let graphics_queue = device.create_queue(QueueKind::Graphics)?;
    let compute_queue = if config.demo.kind.uses_compute() {
        Some(device.create_queue(QueueKind::Compute)?)
    } else {
        None
    };

    let size = window.inner_size();
    let presenter = Dx12Presenter::new(
        &device,
        &factory,
        &graphics_queue,
        window_hwnd(window)?,
        config.graphics.frame_count,
        (size.width, size.height),
    )?;

    GpuContext::new(device, graphics_queue, compute_queue, presenter)
}
