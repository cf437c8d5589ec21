//! 帧资源环
//!
//! N 个预先分配的帧槽位，第 n 帧使用槽位 `n % N`。每个槽位持有自己的命令分配器
//! 和常量缓冲，以及提交时盖上的 Fence 值。复用槽位前 CPU 必须等到该值完成，
//! 因此 CPU 最多领先 GPU `N - 1` 帧，再加上正在录制的一帧。

use tracing::{debug, trace};

use crate::core::error::{ConfigError, GraphicsError, Result, SyncError};
use crate::geometry::Vertex;
use crate::renderer::backend::GpuDevice;
use crate::renderer::constants::{GifFrameParams, MaterialConstants, ObjectConstants, PassConstants};
use crate::renderer::resource::{texture_row_pitch, UploadBuffer, UploadMemory};
use crate::renderer::sync::{Fence, FenceTimeline, FenceValue, QueueKind};

/// 帧槽位
pub struct FrameSlot<T> {
    index: usize,
    fence_value: FenceValue,
    /// 槽位独占的资源
    pub resources: T,
}

impl<T> FrameSlot<T> {
    /// 槽位在环中的索引
    pub fn index(&self) -> usize {
        self.index
    }

    /// 最近一次提交盖上的 Fence 值，0 表示从未提交
    pub fn fence_value(&self) -> FenceValue {
        self.fence_value
    }

    /// 盖上本帧最后一次 Signal 的值
    pub fn stamp(&mut self, value: FenceValue) -> Result<()> {
        if value <= self.fence_value {
            return Err(SyncError::NonMonotonic {
                value: value.value(),
                last: self.fence_value.value(),
            }
            .into());
        }
        self.fence_value = value;
        Ok(())
    }
}

/// 帧资源环
pub struct FrameRing<T> {
    slots: Vec<FrameSlot<T>>,
    frame_number: u64,
    stalls: u64,
}

impl<T> FrameRing<T> {
    /// 用预先创建好的资源构建环，至少需要 2 个槽位
    pub fn new(resources: Vec<T>) -> Result<Self> {
        if resources.len() < 2 {
            return Err(ConfigError::InvalidValue {
                field: "graphics.frame_count".to_string(),
                reason: format!("frame ring needs at least 2 slots, got {}", resources.len()),
            }
            .into());
        }

        let slots = resources
            .into_iter()
            .enumerate()
            .map(|(index, resources)| FrameSlot {
                index,
                fence_value: FenceValue::default(),
                resources,
            })
            .collect();

        Ok(Self {
            slots,
            frame_number: 0,
            stalls: 0,
        })
    }

    /// 获取下一帧的槽位
    ///
    /// 如果槽位上一次提交的工作还未完成，阻塞等待。
    pub fn acquire<F: Fence>(&mut self, timeline: &FenceTimeline<F>) -> Result<&mut FrameSlot<T>> {
        let index = (self.frame_number % self.slots.len() as u64) as usize;
        self.frame_number += 1;

        let pending = self.slots[index].fence_value;
        if !pending.is_initial() && timeline.completed_value() < pending {
            self.stalls += 1;
            debug!(slot = index, fence = pending.value(), "Waiting for frame slot");
            timeline.wait_cpu(pending)?;
        }

        trace!(slot = index, frame = self.frame_number, "Frame slot acquired");
        Ok(&mut self.slots[index])
    }

    /// 最近一次 acquire 得到的槽位
    pub fn current_mut(&mut self) -> Result<&mut FrameSlot<T>> {
        let index = self.current_index().ok_or(GraphicsError::InvalidCommandState {
            command: "current_mut",
            state: "no frame slot acquired",
        })?;
        Ok(&mut self.slots[index])
    }

    /// 最近一次 acquire 得到的槽位索引
    pub fn current_index(&self) -> Option<usize> {
        self.frame_number
            .checked_sub(1)
            .map(|n| (n % self.slots.len() as u64) as usize)
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// 已获取过的帧数
    pub fn frame_number(&self) -> u64 {
        self.frame_number
    }

    /// acquire 阻塞等待的次数
    pub fn stalls(&self) -> u64 {
        self.stalls
    }
}

/// 创建帧资源所需的参数
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameResourceDesc {
    /// 渲染项数量（物体常量个数）
    pub object_count: usize,
    /// 是否有材质常量
    pub material: bool,
    /// GIF 画布尺寸，Some 表示需要计算队列资源
    pub gif_canvas: Option<(u32, u32)>,
    /// 每帧由 CPU 重写的顶点数
    pub dynamic_vertices: Option<usize>,
}

/// 每帧独占的资源
pub struct FrameResources<A, M> {
    /// 图形命令分配器
    pub allocator: A,
    /// 计算命令分配器
    pub compute_allocator: Option<A>,
    pub object_constants: UploadBuffer<ObjectConstants, M>,
    pub pass_constants: UploadBuffer<PassConstants, M>,
    pub material_constants: Option<UploadBuffer<MaterialConstants, M>>,
    /// GIF 合成参数
    pub gif_constants: Option<UploadBuffer<GifFrameParams, M>>,
    /// GIF 帧像素的暂存上传内存
    pub gif_staging: Option<M>,
    /// 每帧重写的顶点缓冲（波浪网格），只有在槽位 Fence 完成后才能写入
    pub dynamic_vertices: Option<UploadBuffer<Vertex, M>>,
}

impl<A, M: UploadMemory> FrameResources<A, M> {
    /// 在设备上创建一个槽位的资源
    pub fn new<D>(device: &D, desc: &FrameResourceDesc) -> Result<Self>
    where
        D: GpuDevice<Allocator = A, Memory = M>,
    {
        let allocator = device.create_allocator(QueueKind::Graphics)?;
        let object_constants = constant_buffer(device, desc.object_count)?;
        let pass_constants = constant_buffer(device, 1)?;
        let material_constants = if desc.material {
            Some(constant_buffer(device, 1)?)
        } else {
            None
        };

        let (compute_allocator, gif_constants, gif_staging) = match desc.gif_canvas {
            Some((width, height)) => (
                Some(device.create_allocator(QueueKind::Compute)?),
                Some(constant_buffer(device, 1)?),
                Some(device.create_upload_memory(texture_row_pitch(width) * height as u64)?),
            ),
            None => (None, None, None),
        };

        let dynamic_vertices = match desc.dynamic_vertices {
            Some(count) => {
                let memory = device.create_upload_memory(UploadBuffer::<Vertex, M>::byte_size_for(count, false))?;
                Some(UploadBuffer::new(memory, count, false)?)
            }
            None => None,
        };

        Ok(Self {
            allocator,
            compute_allocator,
            object_constants,
            pass_constants,
            material_constants,
            gif_constants,
            gif_staging,
            dynamic_vertices,
        })
    }
}

fn constant_buffer<T, D>(device: &D, count: usize) -> Result<UploadBuffer<T, D::Memory>>
where
    T: bytemuck::Pod,
    D: GpuDevice,
{
    let memory = device.create_upload_memory(UploadBuffer::<T, D::Memory>::byte_size_for(count, true))?;
    UploadBuffer::new(memory, count, true)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::error::DemoError;
    use crate::renderer::host::HostGpu;

    #[test]
    fn test_ring_requires_two_slots() {
        assert!(FrameRing::new(vec![()]).is_err());
        let mut ring = FrameRing::new(vec![(), ()]).unwrap();
        assert_eq!(ring.len(), 2);
        assert!(ring.current_mut().is_err());
    }

    #[test]
    fn test_round_robin_and_stall() {
        let gpu = HostGpu::new(16);
        let queue = gpu.queue(QueueKind::Graphics);
        let mut timeline = FenceTimeline::new(gpu.fence());
        let mut ring = FrameRing::new(vec![(), (), ()]).unwrap();

        let mut order = Vec::new();
        for _ in 0..7 {
            let slot = ring.acquire(&timeline).unwrap();
            order.push(slot.index());
            let token = timeline.signal(&queue).unwrap();
            slot.stamp(token.value()).unwrap();
        }

        assert_eq!(order, vec![0, 1, 2, 0, 1, 2, 0]);
        assert_eq!(ring.current_index(), Some(0));
        assert_eq!(ring.current_mut().unwrap().index(), 0);
        // GPU 从不主动完成，前三帧之后每次获取都要等待
        assert_eq!(ring.stalls(), 4);
        assert_eq!(ring.frame_number(), 7);
    }

    #[test]
    fn test_stamp_must_increase() {
        let mut ring = FrameRing::new(vec![(), ()]).unwrap();
        let gpu = HostGpu::new(4);
        let timeline = FenceTimeline::new(gpu.fence());

        let slot = ring.acquire(&timeline).unwrap();
        slot.stamp(FenceValue::new(2)).unwrap();
        let err = slot.stamp(FenceValue::new(2)).unwrap_err();
        assert!(matches!(err, DemoError::Sync(SyncError::NonMonotonic { value: 2, last: 2 })));
    }

    #[test]
    fn test_frame_resources_layout() {
        let gpu = HostGpu::new(4);
        let device = gpu.device();
        let desc = FrameResourceDesc {
            object_count: 3,
            material: true,
            gif_canvas: Some((100, 10)),
            dynamic_vertices: None,
        };

        let resources = FrameResources::new(&device, &desc).unwrap();
        assert_eq!(resources.object_constants.element_count(), 3);
        assert_eq!(resources.object_constants.element_stride(), 256);
        assert!(resources.material_constants.is_some());
        assert!(resources.compute_allocator.is_some());
        assert_eq!(resources.gif_staging.as_ref().unwrap().byte_size(), 512 * 10);
        assert!(resources.dynamic_vertices.is_none());
    }

    #[test]
    fn test_dynamic_vertices_are_packed() {
        let gpu = HostGpu::new(4);
        let desc = FrameResourceDesc {
            object_count: 2,
            material: false,
            gif_canvas: None,
            dynamic_vertices: Some(100),
        };

        let resources = FrameResources::new(&gpu.device(), &desc).unwrap();
        let vertices = resources.dynamic_vertices.as_ref().unwrap();
        assert!(!vertices.is_constant_buffer());
        assert_eq!(vertices.element_stride(), Vertex::stride() as u64);
        assert_eq!(vertices.byte_len(), 100 * Vertex::stride() as u64);
    }
}
