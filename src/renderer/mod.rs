//! 渲染器模块
//!
//! 与具体图形 API 无关的帧流水线：帧资源环、上传缓冲、描述符布局、
//! 命令录制状态机和跨队列同步。具体实现在 `gfx::dx12`（Direct3D 12）
//! 和 [`host`]（进程内模拟）中。
//!
//! # 架构设计
//!
//! ```text
//! GpuContext (设备 / 队列 / Fence 时间线 / 交换链)
//!     ↓
//! FrameRing<FrameResources> (每帧独占的分配器与常量缓冲)
//!     ↓
//! FrameEncoder (录制 → 关闭 → 提交 → 呈现)
//! ```

use tracing::info;

use crate::core::error::Result;

pub mod backend;
pub mod command;
pub mod constants;
pub mod descriptor;
pub mod frame;
pub mod host;
pub mod resource;
pub mod shaders;
pub mod swapchain;
pub mod sync;

pub use backend::{GpuDevice, HeapId, MeshId, ShaderBytecode, TextureId, TextureUsage};
pub use command::{FrameEncoder, FramePhase, PipelineKind, ResourceId, ResourceState, Viewport};
pub use descriptor::{DescriptorLayout, GraphicsRootLayout, PerFrameDescriptors, StaticDescriptors};
pub use frame::{FrameResourceDesc, FrameResources, FrameRing, FrameSlot};
pub use resource::UploadBuffer;
pub use swapchain::Presenter;
pub use sync::{FenceTimeline, FenceToken, FenceValue, QueueKind};

/// 设备级共享对象
///
/// 设备、两个队列、共享 Fence 和交换链在程序生命周期内只有一份。
pub struct GpuContext<D: GpuDevice, P> {
    pub device: D,
    pub graphics_queue: D::Queue,
    pub compute_queue: Option<D::Queue>,
    pub timeline: FenceTimeline<D::Fence>,
    pub presenter: P,
}

impl<D: GpuDevice, P: Presenter> GpuContext<D, P> {
    pub fn new(device: D, graphics_queue: D::Queue, compute_queue: Option<D::Queue>, presenter: P) -> Result<Self> {
        let timeline = FenceTimeline::new(device.create_fence()?);
        info!(
            backend = device.name(),
            buffers = presenter.buffer_count(),
            compute = compute_queue.is_some(),
            "GPU context ready"
        );
        Ok(Self {
            device,
            graphics_queue,
            compute_queue,
            timeline,
            presenter,
        })
    }

    /// 等待所有已提交的 GPU 工作完成
    ///
    /// 计算队列的工作都被之后的图形队列 Wait 覆盖，刷新图形队列即可。
    pub fn flush(&mut self) -> Result<()> {
        self.timeline.flush(&self.graphics_queue)
    }
}

impl<P: Presenter> GpuContext<host::HostDevice, P> {
    /// 在模拟 GPU 上创建上下文
    pub fn host(gpu: &host::HostGpu, compute: bool, presenter: P) -> Result<Self> {
        let device = gpu.device();
        let graphics_queue = device.create_queue(QueueKind::Graphics)?;
        let compute_queue = if compute {
            Some(device.create_queue(QueueKind::Compute)?)
        } else {
            None
        };
        Self::new(device, graphics_queue, compute_queue, presenter)
    }
}
