//! 进程内模拟后端
//!
//! 实现与 Direct3D 12 后端相同的 trait，但所有"GPU 工作"只记录为事件。
//! 用于单元测试、集成测试和 `--headless` 运行。
//!
//! # 模拟模型
//!
//! - 所有队列的 Signal 进入同一个待完成队列，GPU 按提交顺序完成
//! - 待完成的 Signal 超过 `latency` 个时，最早的一个自动完成（模拟 GPU 延迟）
//! - CPU 等待未完成的值时依次完成待完成的 Signal，并记一次阻塞
//! - 等待一个从未 Signal 过的值会永远阻塞，这里返回 `SyncError::Deadlock`

use std::cell::RefCell;
use std::collections::{HashSet, VecDeque};
use std::rc::Rc;

use crate::core::error::{GraphicsError, Result, SyncError};
use crate::geometry::MeshData;
use crate::renderer::backend::{GpuDevice, HeapId, MeshId, ShaderBytecode, TextureId, TextureUsage};
use crate::renderer::command::{
    CommandAllocator, CommandList, DrawArgs, PipelineKind, ResourceId, ResourceState, Viewport,
};
use crate::renderer::descriptor::{DescriptorHeapDescriptor, GraphicsRootLayout};
use crate::renderer::resource::{align_up, UploadMemory, CONSTANT_BUFFER_ALIGNMENT};
use crate::renderer::swapchain::{validate_buffer_count, Presenter};
use crate::renderer::sync::{CommandQueue, Fence, QueueKind};

/// 上传内存的模拟 GPU 地址起点
const UPLOAD_BASE_ADDRESS: u64 = 0x1000_0000;

/// 录制到模拟命令列表中的命令
#[derive(Debug, Clone, PartialEq)]
pub enum HostCommand {
    Reset(PipelineKind),
    SetViewport(Viewport),
    SetPipeline(PipelineKind),
    SetDescriptorHeap(HeapId),
    SetRootSignature(PipelineKind),
    SetDescriptorTable { compute: bool, parameter: u32, heap_index: u32 },
    Transition { resource: ResourceId, before: ResourceState, after: ResourceState },
    ClearRenderTarget { back_buffer: usize, color: [f32; 4] },
    ClearDepth,
    SetRenderTarget(usize),
    SetMesh(MeshId),
    SetVertexBuffer { gpu_address: u64, byte_size: u64, stride: u32 },
    DrawIndexed(DrawArgs),
    Dispatch { x: u32, y: u32, z: u32 },
    CopyToTexture { texture: TextureId, width: u32, height: u32, row_pitch: u64 },
}

/// 描述符内容
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HostView {
    ConstantBuffer { gpu_address: u64, byte_size: u64 },
    ShaderResource(TextureId),
    UnorderedAccess(TextureId),
}

/// 模拟 GPU 上发生的事件，按发生顺序记录
#[derive(Debug, Clone, PartialEq)]
pub enum HostEvent {
    Execute { queue: QueueKind, commands: Vec<HostCommand> },
    Signal { queue: QueueKind, value: u64 },
    Wait { queue: QueueKind, value: u64 },
    CpuWait { value: u64 },
    Present { back_buffer: usize, sync_interval: u32 },
    Resize { width: u32, height: u32 },
    CreateView { heap: HeapId, index: u32, view: HostView },
    /// CPU 映射设备分配的上传内存准备写入，`completed` 是此刻 Fence 的完成值
    UploadWrite { gpu_address: u64, completed: u64 },
}

impl HostEvent {
    pub fn is_signal(&self, kind: QueueKind, expected: u64) -> bool {
        matches!(self, HostEvent::Signal { queue, value } if *queue == kind && *value == expected)
    }

    pub fn is_wait(&self, kind: QueueKind, expected: u64) -> bool {
        matches!(self, HostEvent::Wait { queue, value } if *queue == kind && *value == expected)
    }
}

#[derive(Debug, Default)]
struct HostState {
    events: Vec<HostEvent>,
    latency: usize,
    completed: u64,
    last_signaled: u64,
    pending: VecDeque<u64>,
    stalls: u64,
    heaps: Vec<u32>,
    textures: Vec<(u32, u32, TextureUsage)>,
    meshes: usize,
    pipelines: HashSet<PipelineKind>,
    next_address: u64,
}

type SharedState = Rc<RefCell<HostState>>;

/// 模拟 GPU
///
/// 所有模拟对象共享同一份状态，因此从同一个 `HostGpu` 取出的队列、Fence
/// 和设备彼此可见。
#[derive(Clone)]
pub struct HostGpu {
    state: SharedState,
}

impl HostGpu {
    /// `latency`：最多允许多少个 Signal 处于未完成状态
    pub fn new(latency: usize) -> Self {
        Self {
            state: Rc::new(RefCell::new(HostState {
                latency,
                next_address: UPLOAD_BASE_ADDRESS,
                ..Default::default()
            })),
        }
    }

    pub fn queue(&self, kind: QueueKind) -> HostQueue {
        HostQueue {
            kind,
            state: self.state.clone(),
        }
    }

    /// 共享 Fence 的句柄
    pub fn fence(&self) -> HostFence {
        HostFence {
            state: self.state.clone(),
        }
    }

    pub fn device(&self) -> HostDevice {
        HostDevice {
            state: self.state.clone(),
        }
    }

    pub fn allocator(&self, kind: QueueKind) -> HostCommandAllocator {
        HostCommandAllocator { kind }
    }

    pub fn command_list(&self, kind: QueueKind) -> HostCommandList {
        HostCommandList {
            kind,
            commands: Vec::new(),
            open: false,
            bound_heap: None,
            state: self.state.clone(),
        }
    }

    pub fn presenter(&self, buffer_count: usize, width: u32, height: u32) -> HostPresenter {
        HostPresenter {
            buffer_count,
            current: 0,
            extent: (width, height),
            state: self.state.clone(),
        }
    }

    /// 目前为止的全部事件
    pub fn events(&self) -> Vec<HostEvent> {
        self.state.borrow().events.clone()
    }

    /// 某个队列上执行过的全部命令
    pub fn executed_commands(&self, kind: QueueKind) -> Vec<HostCommand> {
        self.state
            .borrow()
            .events
            .iter()
            .filter_map(|e| match e {
                HostEvent::Execute { queue, commands } if *queue == kind => Some(commands.clone()),
                _ => None,
            })
            .flatten()
            .collect()
    }

    pub fn completed_value(&self) -> u64 {
        self.state.borrow().completed
    }

    pub fn last_signaled(&self) -> u64 {
        self.state.borrow().last_signaled
    }

    /// CPU 因等待 Fence 而阻塞的次数
    pub fn stalls(&self) -> u64 {
        self.state.borrow().stalls
    }
}

/// 模拟 Fence
#[derive(Clone)]
pub struct HostFence {
    state: SharedState,
}

impl Fence for HostFence {
    fn completed_value(&self) -> u64 {
        self.state.borrow().completed
    }

    fn wait_for(&self, value: u64) -> Result<()> {
        let mut state = self.state.borrow_mut();
        if state.completed >= value {
            return Ok(());
        }

        state.stalls += 1;
        while state.completed < value {
            match state.pending.pop_front() {
                Some(retired) => state.completed = retired,
                None => {
                    return Err(SyncError::Deadlock {
                        value,
                        last_signaled: state.last_signaled,
                    }
                    .into())
                }
            }
        }
        state.events.push(HostEvent::CpuWait { value });
        Ok(())
    }
}

/// 模拟命令队列
pub struct HostQueue {
    kind: QueueKind,
    state: SharedState,
}

impl CommandQueue for HostQueue {
    type Fence = HostFence;
    type List = HostCommandList;

    fn kind(&self) -> QueueKind {
        self.kind
    }

    fn execute(&self, list: &HostCommandList) -> Result<()> {
        if list.open {
            return Err(GraphicsError::InvalidCommandState {
                command: "execute",
                state: "command list still open",
            }
            .into());
        }
        if list.kind != self.kind {
            return Err(GraphicsError::InvalidCommandState {
                command: "execute",
                state: "command list type does not match queue",
            }
            .into());
        }

        self.state.borrow_mut().events.push(HostEvent::Execute {
            queue: self.kind,
            commands: list.commands.clone(),
        });
        Ok(())
    }

    fn signal(&self, _fence: &HostFence, value: u64) -> Result<()> {
        let mut state = self.state.borrow_mut();
        if value <= state.last_signaled {
            return Err(SyncError::NonMonotonic {
                value,
                last: state.last_signaled,
            }
            .into());
        }

        state.last_signaled = value;
        state.pending.push_back(value);
        state.events.push(HostEvent::Signal { queue: self.kind, value });

        while state.pending.len() > state.latency {
            if let Some(retired) = state.pending.pop_front() {
                state.completed = retired;
            }
        }
        Ok(())
    }

    fn wait(&self, _fence: &HostFence, value: u64) -> Result<()> {
        let mut state = self.state.borrow_mut();
        if value > state.last_signaled {
            return Err(SyncError::Deadlock {
                value,
                last_signaled: state.last_signaled,
            }
            .into());
        }
        state.events.push(HostEvent::Wait { queue: self.kind, value });
        Ok(())
    }
}

/// 模拟命令分配器
pub struct HostCommandAllocator {
    kind: QueueKind,
}

impl HostCommandAllocator {
    pub fn kind(&self) -> QueueKind {
        self.kind
    }
}

impl CommandAllocator for HostCommandAllocator {
    fn reset(&self) -> Result<()> {
        Ok(())
    }
}

/// 模拟命令列表
pub struct HostCommandList {
    kind: QueueKind,
    commands: Vec<HostCommand>,
    open: bool,
    bound_heap: Option<HeapId>,
    state: SharedState,
}

impl HostCommandList {
    /// 上一次录制的命令
    pub fn commands(&self) -> &[HostCommand] {
        &self.commands
    }

    fn record(&mut self, command: HostCommand) -> Result<()> {
        if !self.open {
            return Err(GraphicsError::InvalidCommandState {
                command: "record",
                state: "command list closed",
            }
            .into());
        }
        self.commands.push(command);
        Ok(())
    }
}

impl CommandList for HostCommandList {
    type Allocator = HostCommandAllocator;
    type Memory = HostUploadMemory;

    fn reset(&mut self, allocator: &HostCommandAllocator, pipeline: PipelineKind) -> Result<()> {
        if self.open {
            return Err(GraphicsError::InvalidCommandState {
                command: "reset",
                state: "command list still open",
            }
            .into());
        }
        if allocator.kind != self.kind {
            return Err(GraphicsError::InvalidCommandState {
                command: "reset",
                state: "allocator type does not match list",
            }
            .into());
        }

        self.commands.clear();
        self.bound_heap = None;
        self.open = true;
        self.record(HostCommand::Reset(pipeline))
    }

    fn set_viewport(&mut self, viewport: &Viewport) -> Result<()> {
        self.record(HostCommand::SetViewport(*viewport))
    }

    fn set_pipeline(&mut self, pipeline: PipelineKind) -> Result<()> {
        self.record(HostCommand::SetPipeline(pipeline))
    }

    fn set_descriptor_heap(&mut self, heap: HeapId) -> Result<()> {
        self.bound_heap = Some(heap);
        self.record(HostCommand::SetDescriptorHeap(heap))
    }

    fn set_root_signature(&mut self, pipeline: PipelineKind) -> Result<()> {
        self.record(HostCommand::SetRootSignature(pipeline))
    }

    fn set_descriptor_table(&mut self, compute: bool, parameter: u32, heap_index: u32) -> Result<()> {
        let capacity = self
            .bound_heap
            .and_then(|heap| self.state.borrow().heaps.get(heap.0).copied());
        if let Some(capacity) = capacity {
            if heap_index >= capacity {
                return Err(GraphicsError::out_of_range("Descriptor table", heap_index as usize, capacity as usize).into());
            }
        }
        self.record(HostCommand::SetDescriptorTable {
            compute,
            parameter,
            heap_index,
        })
    }

    fn transition(&mut self, resource: ResourceId, before: ResourceState, after: ResourceState) -> Result<()> {
        self.record(HostCommand::Transition { resource, before, after })
    }

    fn clear_render_target(&mut self, back_buffer: usize, color: [f32; 4]) -> Result<()> {
        self.record(HostCommand::ClearRenderTarget { back_buffer, color })
    }

    fn clear_depth(&mut self) -> Result<()> {
        self.record(HostCommand::ClearDepth)
    }

    fn set_render_target(&mut self, back_buffer: usize) -> Result<()> {
        self.record(HostCommand::SetRenderTarget(back_buffer))
    }

    fn set_mesh(&mut self, mesh: MeshId) -> Result<()> {
        self.record(HostCommand::SetMesh(mesh))
    }

    fn set_vertex_buffer(&mut self, gpu_address: u64, byte_size: u64, stride: u32) -> Result<()> {
        if stride == 0 || byte_size % stride as u64 != 0 {
            return Err(GraphicsError::ResourceCreation(format!(
                "Vertex buffer of {} bytes is not a multiple of stride {}",
                byte_size, stride
            ))
            .into());
        }
        self.record(HostCommand::SetVertexBuffer {
            gpu_address,
            byte_size,
            stride,
        })
    }

    fn draw_indexed(&mut self, args: DrawArgs) -> Result<()> {
        self.record(HostCommand::DrawIndexed(args))
    }

    fn dispatch(&mut self, x: u32, y: u32, z: u32) -> Result<()> {
        self.record(HostCommand::Dispatch { x, y, z })
    }

    fn copy_to_texture(&mut self, source: &HostUploadMemory, texture: TextureId, width: u32, height: u32, row_pitch: u64) -> Result<()> {
        let required = row_pitch * height as u64;
        if source.byte_size() < required {
            return Err(GraphicsError::out_of_range("Texture copy byte", required as usize, source.byte_size() as usize).into());
        }
        self.record(HostCommand::CopyToTexture {
            texture,
            width,
            height,
            row_pitch,
        })
    }

    fn close(&mut self) -> Result<()> {
        if !self.open {
            return Err(GraphicsError::InvalidCommandState {
                command: "close",
                state: "command list already closed",
            }
            .into());
        }
        self.open = false;
        Ok(())
    }
}

/// 模拟上传堆内存
#[derive(Debug, Clone)]
pub struct HostUploadMemory {
    bytes: Vec<u8>,
    base_address: u64,
    state: Option<SharedState>,
}

impl HostUploadMemory {
    pub fn new(byte_size: u64, base_address: u64) -> Self {
        Self {
            bytes: vec![0; byte_size as usize],
            base_address,
            state: None,
        }
    }

    /// 当前内容（测试用来检查 CPU 写入）
    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }
}

impl UploadMemory for HostUploadMemory {
    fn bytes_mut(&mut self) -> &mut [u8] {
        if let Some(state) = &self.state {
            let mut state = state.borrow_mut();
            let completed = state.completed;
            state.events.push(HostEvent::UploadWrite {
                gpu_address: self.base_address,
                completed,
            });
        }
        &mut self.bytes
    }

    fn gpu_address(&self) -> u64 {
        self.base_address
    }

    fn byte_size(&self) -> u64 {
        self.bytes.len() as u64
    }
}

/// 模拟设备
pub struct HostDevice {
    state: SharedState,
}

impl HostDevice {
    fn push_view(&self, heap: HeapId, index: u32, view: HostView) -> Result<()> {
        let mut state = self.state.borrow_mut();
        let capacity = *state
            .heaps
            .get(heap.0)
            .ok_or(GraphicsError::out_of_range("Descriptor heap", heap.0, state.heaps.len()))?;
        if index >= capacity {
            return Err(GraphicsError::out_of_range("Descriptor", index as usize, capacity as usize).into());
        }
        state.events.push(HostEvent::CreateView { heap, index, view });
        Ok(())
    }

    fn texture(&self, texture: TextureId) -> Result<(u32, u32, TextureUsage)> {
        let state = self.state.borrow();
        state
            .textures
            .get(texture.0)
            .copied()
            .ok_or_else(|| GraphicsError::out_of_range("Texture", texture.0, state.textures.len()).into())
    }
}

impl GpuDevice for HostDevice {
    type Fence = HostFence;
    type Allocator = HostCommandAllocator;
    type Memory = HostUploadMemory;
    type List = HostCommandList;
    type Queue = HostQueue;

    fn name(&self) -> &'static str {
        "Host"
    }

    fn create_queue(&self, kind: QueueKind) -> Result<HostQueue> {
        Ok(HostQueue {
            kind,
            state: self.state.clone(),
        })
    }

    fn create_fence(&self) -> Result<HostFence> {
        Ok(HostFence {
            state: self.state.clone(),
        })
    }

    fn create_allocator(&self, kind: QueueKind) -> Result<HostCommandAllocator> {
        Ok(HostCommandAllocator { kind })
    }

    fn create_command_list(&self, kind: QueueKind, allocator: &HostCommandAllocator) -> Result<HostCommandList> {
        if allocator.kind != kind {
            return Err(GraphicsError::ResourceCreation("Allocator type does not match command list".to_string()).into());
        }
        Ok(HostCommandList {
            kind,
            commands: Vec::new(),
            open: false,
            bound_heap: None,
            state: self.state.clone(),
        })
    }

    fn create_upload_memory(&self, byte_size: u64) -> Result<HostUploadMemory> {
        let mut state = self.state.borrow_mut();
        let base = state.next_address;
        state.next_address += align_up(byte_size.max(1), CONSTANT_BUFFER_ALIGNMENT);
        Ok(HostUploadMemory {
            state: Some(self.state.clone()),
            ..HostUploadMemory::new(byte_size, base)
        })
    }

    fn create_descriptor_heap(&self, desc: &DescriptorHeapDescriptor) -> Result<HeapId> {
        if desc.num_descriptors == 0 {
            return Err(GraphicsError::ResourceCreation("Descriptor heap must not be empty".to_string()).into());
        }
        let mut state = self.state.borrow_mut();
        state.heaps.push(desc.num_descriptors);
        Ok(HeapId(state.heaps.len() - 1))
    }

    fn create_constant_buffer_view(&self, heap: HeapId, index: u32, gpu_address: u64, byte_size: u64) -> Result<()> {
        if byte_size % CONSTANT_BUFFER_ALIGNMENT != 0 {
            return Err(GraphicsError::ResourceCreation(format!("CBV size {} is not 256-byte aligned", byte_size)).into());
        }
        self.push_view(heap, index, HostView::ConstantBuffer { gpu_address, byte_size })
    }

    fn create_texture(&self, width: u32, height: u32, usage: TextureUsage) -> Result<TextureId> {
        if width == 0 || height == 0 {
            return Err(GraphicsError::ResourceCreation(format!("Invalid texture size {}x{}", width, height)).into());
        }
        let mut state = self.state.borrow_mut();
        state.textures.push((width, height, usage));
        Ok(TextureId(state.textures.len() - 1))
    }

    fn create_shader_resource_view(&self, heap: HeapId, index: u32, texture: TextureId) -> Result<()> {
        self.texture(texture)?;
        self.push_view(heap, index, HostView::ShaderResource(texture))
    }

    fn create_unordered_access_view(&self, heap: HeapId, index: u32, texture: TextureId) -> Result<()> {
        let (_, _, usage) = self.texture(texture)?;
        if usage != TextureUsage::Storage {
            return Err(GraphicsError::ResourceCreation("UAV requires a storage texture".to_string()).into());
        }
        self.push_view(heap, index, HostView::UnorderedAccess(texture))
    }

    fn create_mesh(&self, mesh: &MeshData) -> Result<MeshId> {
        if mesh.indices.iter().any(|i| *i as usize >= mesh.vertices.len()) {
            return Err(GraphicsError::ResourceCreation("Mesh index exceeds vertex count".to_string()).into());
        }
        let mut state = self.state.borrow_mut();
        state.meshes += 1;
        Ok(MeshId(state.meshes - 1))
    }

    fn create_graphics_pipelines(&self, _root: &GraphicsRootLayout, _shaders: &ShaderBytecode) -> Result<()> {
        let mut state = self.state.borrow_mut();
        state.pipelines.insert(PipelineKind::Opaque);
        state.pipelines.insert(PipelineKind::Wireframe);
        Ok(())
    }

    fn create_compute_pipeline(&self, _shader: &[u8]) -> Result<()> {
        self.state.borrow_mut().pipelines.insert(PipelineKind::Compute);
        Ok(())
    }

    fn has_pipeline(&self, pipeline: PipelineKind) -> bool {
        self.state.borrow().pipelines.contains(&pipeline)
    }
}

/// 模拟交换链
pub struct HostPresenter {
    buffer_count: usize,
    current: usize,
    extent: (u32, u32),
    state: SharedState,
}

impl HostPresenter {
    /// 检查缓冲数量后创建
    pub fn create(gpu: &HostGpu, buffer_count: usize, width: u32, height: u32) -> Result<Self> {
        validate_buffer_count(buffer_count)?;
        Ok(gpu.presenter(buffer_count, width, height))
    }
}

impl Presenter for HostPresenter {
    fn buffer_count(&self) -> usize {
        self.buffer_count
    }

    fn current_back_buffer(&self) -> usize {
        self.current
    }

    fn present(&mut self, sync_interval: u32) -> Result<usize> {
        self.state.borrow_mut().events.push(HostEvent::Present {
            back_buffer: self.current,
            sync_interval,
        });
        self.current = (self.current + 1) % self.buffer_count;
        Ok(self.current)
    }

    fn resize(&mut self, width: u32, height: u32) -> Result<()> {
        if width == 0 || height == 0 {
            return Err(GraphicsError::Swapchain(format!("Cannot resize to {}x{}", width, height)).into());
        }
        self.extent = (width, height);
        self.current = 0;
        self.state.borrow_mut().events.push(HostEvent::Resize { width, height });
        Ok(())
    }

    fn extent(&self) -> (u32, u32) {
        self.extent
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::error::DemoError;

    #[test]
    fn test_latency_retires_oldest_signal() {
        let gpu = HostGpu::new(2);
        let queue = gpu.queue(QueueKind::Graphics);
        let fence = gpu.fence();

        for value in 1..=3 {
            queue.signal(&fence, value).unwrap();
        }
        assert_eq!(fence.completed_value(), 1);
        assert_eq!(gpu.last_signaled(), 3);
    }

    #[test]
    fn test_wait_drains_and_counts_stall() {
        let gpu = HostGpu::new(8);
        let queue = gpu.queue(QueueKind::Compute);
        let fence = gpu.fence();
        queue.signal(&fence, 1).unwrap();
        queue.signal(&fence, 2).unwrap();

        fence.wait_for(2).unwrap();
        assert_eq!(fence.completed_value(), 2);
        assert_eq!(gpu.stalls(), 1);

        // 已完成的值不再阻塞
        fence.wait_for(1).unwrap();
        assert_eq!(gpu.stalls(), 1);
    }

    #[test]
    fn test_queue_wait_on_unsignaled_value_is_deadlock() {
        let gpu = HostGpu::new(8);
        let queue = gpu.queue(QueueKind::Graphics);
        let err = queue.wait(&gpu.fence(), 1).unwrap_err();
        assert!(matches!(err, DemoError::Sync(SyncError::Deadlock { value: 1, last_signaled: 0 })));
    }

    #[test]
    fn test_upload_write_records_completed_value() {
        let gpu = HostGpu::new(1);
        let queue = gpu.queue(QueueKind::Graphics);
        let mut memory = gpu.device().create_upload_memory(64).unwrap();
        queue.signal(&gpu.fence(), 1).unwrap();
        queue.signal(&gpu.fence(), 2).unwrap();

        memory.bytes_mut()[0] = 7;
        assert_eq!(
            gpu.events().last(),
            Some(&HostEvent::UploadWrite {
                gpu_address: UPLOAD_BASE_ADDRESS,
                completed: 1,
            })
        );
        // 测试里直接构造的内存不记录事件
        let before = gpu.events().len();
        HostUploadMemory::new(64, 0).bytes_mut()[0] = 1;
        assert_eq!(gpu.events().len(), before);
    }

    #[test]
    fn test_vertex_buffer_size_must_match_stride() {
        let gpu = HostGpu::new(8);
        let allocator = gpu.allocator(QueueKind::Graphics);
        let mut list = gpu.command_list(QueueKind::Graphics);
        list.reset(&allocator, PipelineKind::Opaque).unwrap();
        assert!(list.set_vertex_buffer(0x1000, 100, 36).is_err());
        assert!(list.set_vertex_buffer(0x1000, 72, 0).is_err());
        list.set_vertex_buffer(0x1000, 72, 36).unwrap();
    }

    #[test]
    fn test_signal_must_increase() {
        let gpu = HostGpu::new(8);
        let queue = gpu.queue(QueueKind::Graphics);
        queue.signal(&gpu.fence(), 2).unwrap();
        assert!(queue.signal(&gpu.fence(), 2).is_err());
    }

    #[test]
    fn test_execute_requires_closed_list() {
        let gpu = HostGpu::new(8);
        let queue = gpu.queue(QueueKind::Graphics);
        let allocator = gpu.allocator(QueueKind::Graphics);
        let mut list = gpu.command_list(QueueKind::Graphics);

        list.reset(&allocator, PipelineKind::Opaque).unwrap();
        assert!(queue.execute(&list).is_err());
        list.close().unwrap();
        queue.execute(&list).unwrap();
        assert!(list.set_viewport(&Viewport::new(1, 1)).is_err());
    }

    #[test]
    fn test_descriptor_views_are_bounds_checked() {
        let gpu = HostGpu::new(8);
        let device = gpu.device();
        let heap = device
            .create_descriptor_heap(&DescriptorHeapDescriptor::new(
                crate::renderer::descriptor::DescriptorType::CbvSrvUav,
                2,
            ))
            .unwrap();
        let texture = device.create_texture(4, 4, TextureUsage::Sampled).unwrap();

        device.create_shader_resource_view(heap, 1, texture).unwrap();
        assert!(device.create_shader_resource_view(heap, 2, texture).is_err());
        assert!(device.create_unordered_access_view(heap, 0, texture).is_err());
        assert!(device.create_constant_buffer_view(heap, 0, 0, 100).is_err());
    }

    #[test]
    fn test_presenter_cycles_back_buffers() {
        let gpu = HostGpu::new(8);
        let mut presenter = HostPresenter::create(&gpu, 2, 8, 8).unwrap();
        assert_eq!(presenter.present(1).unwrap(), 1);
        assert_eq!(presenter.present(1).unwrap(), 0);
        assert!(HostPresenter::create(&gpu, 4, 8, 8).is_err());
        assert!(presenter.resize(0, 8).is_err());
    }
}
