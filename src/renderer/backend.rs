//! 图形设备接口
//!
//! 演示程序的帧循环只依赖这里的 trait，具体实现有两个：
//!
//! - `gfx::dx12`：真正的 Direct3D 12 设备（仅 Windows）
//! - [`host`](super::host)：进程内的确定性模拟，用于测试和无窗口运行
//!
//! GPU 资源以轻量句柄（[`MeshId`]、[`TextureId`]、[`HeapId`]）表示，
//! 由设备在内部资源表中解析。

use crate::core::error::Result;
use crate::geometry::MeshData;
use crate::renderer::command::{CommandAllocator, CommandList, PipelineKind};
use crate::renderer::descriptor::{DescriptorHeapDescriptor, GraphicsRootLayout};
use crate::renderer::resource::UploadMemory;
use crate::renderer::sync::{CommandQueue, Fence, QueueKind};

/// 网格句柄
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MeshId(pub usize);

/// 纹理句柄
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TextureId(pub usize);

/// 描述符堆句柄
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct HeapId(pub usize);

/// 纹理用途
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextureUsage {
    /// 只读采样
    Sampled,
    /// 计算着色器可写（UAV）
    Storage,
}

/// 预编译着色器字节码
#[derive(Debug, Clone, Default)]
pub struct ShaderBytecode {
    pub vertex: Vec<u8>,
    pub pixel: Vec<u8>,
}

/// 图形设备
///
/// 创建所有 GPU 对象。设备、队列和描述符堆在整个程序中共享，
/// 帧资源（分配器、上传缓冲）由各自的帧槽位独占。
pub trait GpuDevice {
    type Fence: Fence;
    type Allocator: CommandAllocator;
    type Memory: UploadMemory;
    type List: CommandList<Allocator = Self::Allocator, Memory = Self::Memory>;
    type Queue: CommandQueue<Fence = Self::Fence, List = Self::List>;

    /// 后端名称，用于日志和窗口标题
    fn name(&self) -> &'static str;

    fn create_queue(&self, kind: QueueKind) -> Result<Self::Queue>;

    /// 创建初始值为 0 的 Fence
    fn create_fence(&self) -> Result<Self::Fence>;

    fn create_allocator(&self, kind: QueueKind) -> Result<Self::Allocator>;

    /// 创建处于关闭状态的命令列表
    fn create_command_list(&self, kind: QueueKind, allocator: &Self::Allocator) -> Result<Self::List>;

    /// 分配一块持久映射的上传堆内存
    fn create_upload_memory(&self, byte_size: u64) -> Result<Self::Memory>;

    fn create_descriptor_heap(&self, desc: &DescriptorHeapDescriptor) -> Result<HeapId>;

    /// 在堆的第 `index` 个位置创建 CBV
    fn create_constant_buffer_view(&self, heap: HeapId, index: u32, gpu_address: u64, byte_size: u64) -> Result<()>;

    /// 创建默认堆上的 RGBA8 纹理，初始状态 COMMON
    fn create_texture(&self, width: u32, height: u32, usage: TextureUsage) -> Result<TextureId>;

    fn create_shader_resource_view(&self, heap: HeapId, index: u32, texture: TextureId) -> Result<()>;

    fn create_unordered_access_view(&self, heap: HeapId, index: u32, texture: TextureId) -> Result<()>;

    /// 上传网格的顶点和索引数据
    fn create_mesh(&self, mesh: &MeshData) -> Result<MeshId>;

    /// 创建实心和线框两条图形流水线，共享一个根签名
    fn create_graphics_pipelines(&self, root: &GraphicsRootLayout, shaders: &ShaderBytecode) -> Result<()>;

    /// 创建 GIF 合成计算流水线
    fn create_compute_pipeline(&self, shader: &[u8]) -> Result<()>;

    /// 流水线是否已创建
    fn has_pipeline(&self, pipeline: PipelineKind) -> bool;
}
