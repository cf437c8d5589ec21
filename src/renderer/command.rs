//! 命令记录模块
//!
//! [`CommandList`] 是后端命令列表的录制接口，[`FrameEncoder`] 在其上跟踪一帧的录制状态：
//!
//! ```text
//! Idle → Recording → RenderTarget → Drawing → Present → Closed → Submitted → Presented
//! ```
//!
//! 计算命令列表走 `Recording → Drawing → Closed → Submitted`。
//!
//! # 规则
//!
//! - 分配器只能在帧槽位的 Fence 完成后重置，由 [`FrameRing`](super::frame::FrameRing) 保证
//! - 绘制前后台缓冲必须从 PRESENT 转换到 RENDER_TARGET，关闭前必须转换回来
//! - 每个被跟踪的资源在关闭时必须回到其静止状态，否则 `close` 返回错误
//! - 资源转换的起始状态必须与跟踪的当前状态一致

use bytemuck::Pod;
use tracing::trace;

use crate::core::error::{GraphicsError, Result};
use crate::renderer::backend::{HeapId, MeshId, TextureId};
use crate::renderer::resource::{UploadBuffer, UploadMemory};
use crate::renderer::swapchain::Presenter;
use crate::renderer::sync::{CommandQueue, QueueKind};

/// 资源状态（对应 D3D12_RESOURCE_STATES 的子集）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResourceState {
    Present,
    RenderTarget,
    UnorderedAccess,
    NonPixelShaderResource,
    CopyDest,
    Common,
}

impl ResourceState {
    pub fn name(&self) -> &'static str {
        match self {
            ResourceState::Present => "PRESENT",
            ResourceState::RenderTarget => "RENDER_TARGET",
            ResourceState::UnorderedAccess => "UNORDERED_ACCESS",
            ResourceState::NonPixelShaderResource => "NON_PIXEL_SHADER_RESOURCE",
            ResourceState::CopyDest => "COPY_DEST",
            ResourceState::Common => "COMMON",
        }
    }
}

/// 需要转换状态的资源
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResourceId {
    /// 交换链第 n 个后台缓冲
    BackBuffer(usize),
    /// 纹理
    Texture(TextureId),
}

/// 流水线种类
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PipelineKind {
    /// 实心填充
    Opaque,
    /// 线框（F2 切换）
    Wireframe,
    /// GIF 合成计算着色器
    Compute,
}

impl PipelineKind {
    pub fn is_compute(&self) -> bool {
        matches!(self, PipelineKind::Compute)
    }
}

/// 视口，裁剪矩形与视口相同
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Viewport {
    pub width: u32,
    pub height: u32,
}

impl Viewport {
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    pub fn aspect_ratio(&self) -> f32 {
        self.width as f32 / self.height.max(1) as f32
    }
}

/// DrawIndexedInstanced 参数（实例数固定为 1）
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DrawArgs {
    pub index_count: u32,
    pub start_index: u32,
    pub base_vertex: i32,
}

/// 命令分配器
pub trait CommandAllocator {
    /// 重置分配器，回收其命令内存
    ///
    /// 调用者必须保证所有使用过它的命令列表已在 GPU 上执行完毕。
    fn reset(&self) -> Result<()>;
}

/// 后端命令列表的录制接口
///
/// 每个方法对应一个 D3D12 命令，参数以资源句柄表示，由后端解析。
pub trait CommandList {
    type Allocator: CommandAllocator;
    type Memory;

    /// 在 `allocator` 上重新开始录制，并设置初始流水线
    fn reset(&mut self, allocator: &Self::Allocator, pipeline: PipelineKind) -> Result<()>;

    fn set_viewport(&mut self, viewport: &Viewport) -> Result<()>;

    fn set_pipeline(&mut self, pipeline: PipelineKind) -> Result<()>;

    /// 绑定 CBV/SRV/UAV 描述符堆
    fn set_descriptor_heap(&mut self, heap: HeapId) -> Result<()>;

    /// 绑定与流水线对应的根签名（图形或计算）
    fn set_root_signature(&mut self, pipeline: PipelineKind) -> Result<()>;

    /// 根参数 `parameter` 指向已绑定堆中的第 `heap_index` 个描述符
    fn set_descriptor_table(&mut self, compute: bool, parameter: u32, heap_index: u32) -> Result<()>;

    fn transition(&mut self, resource: ResourceId, before: ResourceState, after: ResourceState) -> Result<()>;

    fn clear_render_target(&mut self, back_buffer: usize, color: [f32; 4]) -> Result<()>;

    fn clear_depth(&mut self) -> Result<()>;

    /// 设置后台缓冲和深度缓冲为渲染目标
    fn set_render_target(&mut self, back_buffer: usize) -> Result<()>;

    /// 绑定网格的顶点/索引缓冲（三角形列表）
    fn set_mesh(&mut self, mesh: MeshId) -> Result<()>;

    /// 用上传堆中的顶点替换槽 0 的顶点缓冲，索引缓冲保持不变
    fn set_vertex_buffer(&mut self, gpu_address: u64, byte_size: u64, stride: u32) -> Result<()>;

    fn draw_indexed(&mut self, args: DrawArgs) -> Result<()>;

    fn dispatch(&mut self, x: u32, y: u32, z: u32) -> Result<()>;

    /// 从上传内存按行距拷贝整张纹理
    fn copy_to_texture(&mut self, source: &Self::Memory, texture: TextureId, width: u32, height: u32, row_pitch: u64) -> Result<()>;

    fn close(&mut self) -> Result<()>;
}

/// 帧录制阶段
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FramePhase {
    Idle,
    Recording,
    RenderTarget,
    Drawing,
    Present,
    Closed,
    Submitted,
    Presented,
}

impl FramePhase {
    pub fn name(&self) -> &'static str {
        match self {
            FramePhase::Idle => "Idle",
            FramePhase::Recording => "Recording",
            FramePhase::RenderTarget => "RenderTarget",
            FramePhase::Drawing => "Drawing",
            FramePhase::Present => "Present",
            FramePhase::Closed => "Closed",
            FramePhase::Submitted => "Submitted",
            FramePhase::Presented => "Presented",
        }
    }

    fn is_open(&self) -> bool {
        matches!(
            self,
            FramePhase::Recording | FramePhase::RenderTarget | FramePhase::Drawing | FramePhase::Present
        )
    }
}

#[derive(Debug, Clone, Copy)]
struct TrackedResource {
    id: ResourceId,
    current: ResourceState,
    rest: ResourceState,
}

/// 帧命令编码器
///
/// 包装一个命令列表，按固定顺序录制并跟踪资源状态。
///
/// # 示例
///
/// ```ignore
/// let mut encoder = FrameEncoder::begin(&mut list, &slot.resources.allocator, PipelineKind::Opaque, QueueKind::Graphics)?;
/// encoder.set_viewport(&viewport)?;
/// encoder.begin_render_target(back_buffer)?;
/// encoder.clear_and_bind_target(clear_color)?;
/// // ... 绑定与绘制 ...
/// encoder.end_render_target()?;
/// encoder.close()?;
/// encoder.submit(&graphics_queue)?;
/// ```
pub struct FrameEncoder<'a, L: CommandList> {
    list: &'a mut L,
    queue: QueueKind,
    phase: FramePhase,
    tracked: Vec<TrackedResource>,
    back_buffer: Option<usize>,
    pipeline: PipelineKind,
    root_bound: bool,
    mesh_bound: bool,
}

impl<'a, L: CommandList> FrameEncoder<'a, L> {
    /// 重置分配器和命令列表，进入 Recording
    pub fn begin(list: &'a mut L, allocator: &L::Allocator, pipeline: PipelineKind, queue: QueueKind) -> Result<Self> {
        if pipeline.is_compute() != (queue == QueueKind::Compute) {
            return Err(GraphicsError::InvalidCommandState {
                command: "begin",
                state: "pipeline does not match queue",
            }
            .into());
        }

        allocator.reset()?;
        list.reset(allocator, pipeline)?;

        Ok(Self {
            list,
            queue,
            phase: FramePhase::Recording,
            tracked: Vec::new(),
            back_buffer: None,
            pipeline,
            root_bound: false,
            mesh_bound: false,
        })
    }

    pub fn phase(&self) -> FramePhase {
        self.phase
    }

    pub fn pipeline(&self) -> PipelineKind {
        self.pipeline
    }

    /// 当前跟踪的资源状态
    pub fn state_of(&self, resource: ResourceId) -> Option<ResourceState> {
        self.tracked.iter().find(|t| t.id == resource).map(|t| t.current)
    }

    /// 开始跟踪资源，`rest` 是其在录制开始和关闭时的状态
    pub fn track(&mut self, resource: ResourceId, rest: ResourceState) -> Result<()> {
        self.expect_open("track")?;
        if self.state_of(resource).is_none() {
            self.tracked.push(TrackedResource {
                id: resource,
                current: rest,
                rest,
            });
        }
        Ok(())
    }

    /// 录制资源屏障
    pub fn transition(&mut self, resource: ResourceId, after: ResourceState) -> Result<()> {
        self.expect_open("transition")?;
        let tracked = self
            .tracked
            .iter_mut()
            .find(|t| t.id == resource)
            .ok_or(GraphicsError::InvalidCommandState {
                command: "transition",
                state: "resource is not tracked",
            })?;

        let before = tracked.current;
        if before == after {
            return Err(GraphicsError::InvalidCommandState {
                command: "transition",
                state: after.name(),
            }
            .into());
        }

        self.list.transition(resource, before, after)?;
        tracked.current = after;
        trace!(?resource, from = before.name(), to = after.name(), "Resource barrier");
        Ok(())
    }

    pub fn set_viewport(&mut self, viewport: &Viewport) -> Result<()> {
        self.expect_open("set_viewport")?;
        self.list.set_viewport(viewport)
    }

    pub fn set_pipeline(&mut self, pipeline: PipelineKind) -> Result<()> {
        self.expect_open("set_pipeline")?;
        if pipeline.is_compute() != self.pipeline.is_compute() {
            return Err(GraphicsError::InvalidCommandState {
                command: "set_pipeline",
                state: "pipeline does not match queue",
            }
            .into());
        }
        self.list.set_pipeline(pipeline)?;
        self.pipeline = pipeline;
        Ok(())
    }

    /// 后台缓冲 PRESENT → RENDER_TARGET
    pub fn begin_render_target(&mut self, back_buffer: usize) -> Result<()> {
        self.expect_phase("begin_render_target", FramePhase::Recording)?;
        let resource = ResourceId::BackBuffer(back_buffer);
        self.track(resource, ResourceState::Present)?;
        self.transition(resource, ResourceState::RenderTarget)?;
        self.back_buffer = Some(back_buffer);
        self.phase = FramePhase::RenderTarget;
        Ok(())
    }

    /// 清屏并绑定渲染目标
    pub fn clear_and_bind_target(&mut self, color: [f32; 4]) -> Result<()> {
        self.expect_phase("clear_and_bind_target", FramePhase::RenderTarget)?;
        let back_buffer = self.back_buffer.ok_or(GraphicsError::InvalidCommandState {
            command: "clear_and_bind_target",
            state: "no back buffer",
        })?;

        self.list.clear_render_target(back_buffer, color)?;
        self.list.clear_depth()?;
        self.list.set_render_target(back_buffer)?;
        self.phase = FramePhase::Drawing;
        Ok(())
    }

    /// 绑定描述符堆和根签名
    pub fn bind_heap(&mut self, heap: HeapId) -> Result<()> {
        self.expect_open("bind_heap")?;
        self.list.set_descriptor_heap(heap)?;
        self.list.set_root_signature(self.pipeline)?;
        self.root_bound = true;
        if self.pipeline.is_compute() {
            self.phase = FramePhase::Drawing;
        }
        Ok(())
    }

    /// 设置描述符表
    pub fn set_table(&mut self, parameter: u32, heap_index: u32) -> Result<()> {
        if !self.root_bound {
            return Err(GraphicsError::InvalidCommandState {
                command: "set_table",
                state: "root signature not bound",
            }
            .into());
        }
        self.expect_phase("set_table", FramePhase::Drawing)?;
        self.list.set_descriptor_table(self.pipeline.is_compute(), parameter, heap_index)
    }

    pub fn set_mesh(&mut self, mesh: MeshId) -> Result<()> {
        self.expect_phase("set_mesh", FramePhase::Drawing)?;
        self.list.set_mesh(mesh)?;
        self.mesh_bound = true;
        Ok(())
    }

    /// 绑定每帧重写的顶点缓冲，必须在 `set_mesh` 之后
    pub fn set_vertex_buffer<T: Pod, M: UploadMemory>(&mut self, vertices: &UploadBuffer<T, M>) -> Result<()> {
        self.expect_phase("set_vertex_buffer", FramePhase::Drawing)?;
        if !self.mesh_bound {
            return Err(GraphicsError::InvalidCommandState {
                command: "set_vertex_buffer",
                state: "mesh not bound",
            }
            .into());
        }
        if vertices.is_constant_buffer() {
            return Err(GraphicsError::InvalidCommandState {
                command: "set_vertex_buffer",
                state: "constant buffer",
            }
            .into());
        }
        let stride = u32::try_from(vertices.element_stride())
            .map_err(|_| GraphicsError::ResourceCreation("vertex stride exceeds u32".to_string()))?;
        self.list.set_vertex_buffer(vertices.memory().gpu_address(), vertices.byte_len(), stride)
    }

    pub fn draw(&mut self, args: DrawArgs) -> Result<()> {
        self.expect_phase("draw", FramePhase::Drawing)?;
        if !self.root_bound || !self.mesh_bound {
            return Err(GraphicsError::InvalidCommandState {
                command: "draw",
                state: "root signature or mesh not bound",
            }
            .into());
        }
        self.list.draw_indexed(args)
    }

    pub fn dispatch(&mut self, x: u32, y: u32, z: u32) -> Result<()> {
        self.expect_phase("dispatch", FramePhase::Drawing)?;
        if !self.pipeline.is_compute() || !self.root_bound {
            return Err(GraphicsError::InvalidCommandState {
                command: "dispatch",
                state: "compute pipeline not bound",
            }
            .into());
        }
        self.list.dispatch(x, y, z)
    }

    /// 拷贝上传内存到纹理，纹理必须处于 COPY_DEST
    pub fn copy_to_texture(&mut self, source: &L::Memory, texture: TextureId, width: u32, height: u32, row_pitch: u64) -> Result<()> {
        self.expect_open("copy_to_texture")?;
        if self.state_of(ResourceId::Texture(texture)) != Some(ResourceState::CopyDest) {
            return Err(GraphicsError::InvalidCommandState {
                command: "copy_to_texture",
                state: "texture not in COPY_DEST",
            }
            .into());
        }
        self.list.copy_to_texture(source, texture, width, height, row_pitch)
    }

    /// 后台缓冲 RENDER_TARGET → PRESENT
    pub fn end_render_target(&mut self) -> Result<()> {
        let back_buffer = self.back_buffer.ok_or(GraphicsError::InvalidCommandState {
            command: "end_render_target",
            state: "no back buffer",
        })?;
        if !matches!(self.phase, FramePhase::RenderTarget | FramePhase::Drawing) {
            return Err(self.phase_error("end_render_target"));
        }
        self.transition(ResourceId::BackBuffer(back_buffer), ResourceState::Present)?;
        self.phase = FramePhase::Present;
        Ok(())
    }

    /// 关闭命令列表
    ///
    /// 所有跟踪的资源必须已回到静止状态。
    pub fn close(&mut self) -> Result<()> {
        self.expect_open("close")?;
        if let Some(pending) = self.tracked.iter().find(|t| t.current != t.rest) {
            return Err(GraphicsError::InvalidCommandState {
                command: "close",
                state: pending.current.name(),
            }
            .into());
        }
        if self.back_buffer.is_some() && self.phase != FramePhase::Present {
            return Err(self.phase_error("close"));
        }

        self.list.close()?;
        self.phase = FramePhase::Closed;
        Ok(())
    }

    /// 提交到队列
    pub fn submit<Q>(&mut self, queue: &Q) -> Result<()>
    where
        Q: CommandQueue<List = L>,
    {
        self.expect_phase("submit", FramePhase::Closed)?;
        if queue.kind() != self.queue {
            return Err(GraphicsError::InvalidCommandState {
                command: "submit",
                state: "list recorded for another queue",
            }
            .into());
        }
        queue.execute(self.list)?;
        self.phase = FramePhase::Submitted;
        Ok(())
    }

    /// 呈现，返回新的后台缓冲索引
    pub fn present<P: Presenter>(&mut self, presenter: &mut P, sync_interval: u32) -> Result<usize> {
        self.expect_phase("present", FramePhase::Submitted)?;
        if self.back_buffer.is_none() {
            return Err(self.phase_error("present"));
        }
        let next = presenter.present(sync_interval)?;
        self.phase = FramePhase::Presented;
        Ok(next)
    }

    fn expect_open(&self, command: &'static str) -> Result<()> {
        if self.phase.is_open() {
            Ok(())
        } else {
            Err(self.phase_error(command))
        }
    }

    fn expect_phase(&self, command: &'static str, phase: FramePhase) -> Result<()> {
        if self.phase == phase {
            Ok(())
        } else {
            Err(self.phase_error(command))
        }
    }

    fn phase_error(&self, command: &'static str) -> crate::core::error::DemoError {
        GraphicsError::InvalidCommandState {
            command,
            state: self.phase.name(),
        }
        .into()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::error::DemoError;
    use crate::renderer::host::{HostCommand, HostGpu, HostUploadMemory};

    const CLEAR: [f32; 4] = [0.0, 0.0, 0.0, 1.0];

    #[test]
    fn test_graphics_frame_state_machine() {
        let gpu = HostGpu::new(8);
        let queue = gpu.queue(QueueKind::Graphics);
        let allocator = gpu.allocator(QueueKind::Graphics);
        let mut list = gpu.command_list(QueueKind::Graphics);
        let mut presenter = gpu.presenter(3, 64, 64);

        let mut encoder = FrameEncoder::begin(&mut list, &allocator, PipelineKind::Opaque, QueueKind::Graphics).unwrap();
        assert_eq!(encoder.phase(), FramePhase::Recording);
        encoder.set_viewport(&Viewport::new(64, 64)).unwrap();
        encoder.begin_render_target(0).unwrap();
        assert_eq!(encoder.phase(), FramePhase::RenderTarget);
        encoder.clear_and_bind_target(CLEAR).unwrap();
        assert_eq!(encoder.phase(), FramePhase::Drawing);
        encoder.bind_heap(HeapId(0)).unwrap();
        encoder.set_table(0, 0).unwrap();
        encoder.set_mesh(MeshId(0)).unwrap();
        encoder
            .draw(DrawArgs {
                index_count: 6,
                start_index: 0,
                base_vertex: 0,
            })
            .unwrap();
        encoder.end_render_target().unwrap();
        assert_eq!(encoder.phase(), FramePhase::Present);
        encoder.close().unwrap();
        encoder.submit(&queue).unwrap();
        assert_eq!(encoder.present(&mut presenter, 1).unwrap(), 1);
        assert_eq!(encoder.phase(), FramePhase::Presented);

        let commands = gpu.executed_commands(QueueKind::Graphics);
        let first_barrier = commands
            .iter()
            .position(|c| matches!(c, HostCommand::Transition { after: ResourceState::RenderTarget, .. }))
            .unwrap();
        let draw = commands.iter().position(|c| matches!(c, HostCommand::DrawIndexed(_))).unwrap();
        let last_barrier = commands
            .iter()
            .position(|c| matches!(c, HostCommand::Transition { after: ResourceState::Present, .. }))
            .unwrap();
        assert!(first_barrier < draw && draw < last_barrier);
    }

    #[test]
    fn test_close_with_back_buffer_in_render_target_fails() {
        let gpu = HostGpu::new(8);
        let allocator = gpu.allocator(QueueKind::Graphics);
        let mut list = gpu.command_list(QueueKind::Graphics);

        let mut encoder = FrameEncoder::begin(&mut list, &allocator, PipelineKind::Opaque, QueueKind::Graphics).unwrap();
        encoder.begin_render_target(1).unwrap();
        encoder.clear_and_bind_target(CLEAR).unwrap();

        let err = encoder.close().unwrap_err();
        assert!(matches!(
            err,
            DemoError::Graphics(GraphicsError::InvalidCommandState {
                command: "close",
                state: "RENDER_TARGET"
            })
        ));
    }

    #[test]
    fn test_draw_requires_bound_target() {
        let gpu = HostGpu::new(8);
        let allocator = gpu.allocator(QueueKind::Graphics);
        let mut list = gpu.command_list(QueueKind::Graphics);

        let mut encoder = FrameEncoder::begin(&mut list, &allocator, PipelineKind::Opaque, QueueKind::Graphics).unwrap();
        let args = DrawArgs {
            index_count: 3,
            start_index: 0,
            base_vertex: 0,
        };
        assert!(encoder.draw(args).is_err());
        assert!(encoder.set_mesh(MeshId(0)).is_err());
    }

    #[test]
    fn test_dynamic_vertex_buffer_follows_mesh() {
        let gpu = HostGpu::new(8);
        let allocator = gpu.allocator(QueueKind::Graphics);
        let mut list = gpu.command_list(QueueKind::Graphics);
        let vertices =
            UploadBuffer::<[f32; 3], _>::new(HostUploadMemory::new(36, 0x4000), 3, false).unwrap();
        let constants = UploadBuffer::<[f32; 3], _>::new(HostUploadMemory::new(768, 0x8000), 3, true).unwrap();

        let mut encoder = FrameEncoder::begin(&mut list, &allocator, PipelineKind::Opaque, QueueKind::Graphics).unwrap();
        encoder.begin_render_target(0).unwrap();
        encoder.clear_and_bind_target(CLEAR).unwrap();
        encoder.bind_heap(HeapId(0)).unwrap();
        assert!(encoder.set_vertex_buffer(&vertices).is_err());
        encoder.set_mesh(MeshId(0)).unwrap();
        assert!(encoder.set_vertex_buffer(&constants).is_err());
        encoder.set_vertex_buffer(&vertices).unwrap();
        encoder.end_render_target().unwrap();
        encoder.close().unwrap();

        assert!(list.commands().contains(&HostCommand::SetVertexBuffer {
            gpu_address: 0x4000,
            byte_size: 36,
            stride: 12,
        }));
    }

    #[test]
    fn test_submit_before_close_fails() {
        let gpu = HostGpu::new(8);
        let queue = gpu.queue(QueueKind::Graphics);
        let allocator = gpu.allocator(QueueKind::Graphics);
        let mut list = gpu.command_list(QueueKind::Graphics);

        let mut encoder = FrameEncoder::begin(&mut list, &allocator, PipelineKind::Opaque, QueueKind::Graphics).unwrap();
        assert!(encoder.submit(&queue).is_err());
    }

    #[test]
    fn test_compute_dispatch_and_texture_states() {
        let gpu = HostGpu::new(8);
        let queue = gpu.queue(QueueKind::Compute);
        let allocator = gpu.allocator(QueueKind::Compute);
        let mut list = gpu.command_list(QueueKind::Compute);
        let canvas = ResourceId::Texture(TextureId(0));

        let mut encoder = FrameEncoder::begin(&mut list, &allocator, PipelineKind::Compute, QueueKind::Compute).unwrap();
        encoder.track(canvas, ResourceState::Common).unwrap();
        encoder.transition(canvas, ResourceState::UnorderedAccess).unwrap();
        assert!(encoder.dispatch(4, 4, 1).is_err());
        encoder.bind_heap(HeapId(1)).unwrap();
        encoder.set_table(0, 2).unwrap();
        encoder.dispatch(4, 4, 1).unwrap();

        // UAV 状态未恢复时不能关闭
        assert!(encoder.close().is_err());
        encoder.transition(canvas, ResourceState::Common).unwrap();
        encoder.close().unwrap();
        encoder.submit(&queue).unwrap();
        assert_eq!(encoder.phase(), FramePhase::Submitted);
    }

    #[test]
    fn test_transition_from_wrong_state_rejected() {
        let gpu = HostGpu::new(8);
        let allocator = gpu.allocator(QueueKind::Compute);
        let mut list = gpu.command_list(QueueKind::Compute);
        let texture = ResourceId::Texture(TextureId(3));

        let mut encoder = FrameEncoder::begin(&mut list, &allocator, PipelineKind::Compute, QueueKind::Compute).unwrap();
        assert!(encoder.transition(texture, ResourceState::CopyDest).is_err());
        encoder.track(texture, ResourceState::Common).unwrap();
        assert!(encoder.transition(texture, ResourceState::Common).is_err());
    }

    #[test]
    fn test_pipeline_must_match_queue() {
        let gpu = HostGpu::new(8);
        let allocator = gpu.allocator(QueueKind::Graphics);
        let mut list = gpu.command_list(QueueKind::Graphics);
        assert!(FrameEncoder::begin(&mut list, &allocator, PipelineKind::Compute, QueueKind::Graphics).is_err());

        let mut encoder = FrameEncoder::begin(&mut list, &allocator, PipelineKind::Opaque, QueueKind::Graphics).unwrap();
        encoder.set_pipeline(PipelineKind::Wireframe).unwrap();
        assert_eq!(encoder.pipeline(), PipelineKind::Wireframe);
        assert!(encoder.set_pipeline(PipelineKind::Compute).is_err());
    }
}
