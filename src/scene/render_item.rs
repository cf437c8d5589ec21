//! 渲染项
//!
//! 一个渲染项对应一次绘制：世界矩阵、共享网格中的一段索引、在物体常量缓冲中的位置。
//! 世界矩阵改变后，环中每个帧槽位都需要写一次新值，因此脏计数重置为环大小，
//! 每写入一帧减一。
//!
//! 顶点每帧由 CPU 重写的渲染项（水面）在绘制时改用帧槽位的动态顶点缓冲。

use crate::core::error::Result;
use crate::math::Matrix4;
use crate::renderer::backend::MeshId;
use crate::renderer::command::DrawArgs;
use crate::renderer::constants::ObjectConstants;
use crate::renderer::resource::{UploadBuffer, UploadMemory};

#[derive(Debug, Clone)]
pub struct RenderItem {
    world: Matrix4,
    dirty_frames: usize,
    /// 物体常量缓冲中的索引，同时决定描述符位置
    pub object_index: u32,
    pub mesh: MeshId,
    pub draw: DrawArgs,
    /// 绘制时绑定帧槽位的动态顶点缓冲，只沿用网格的索引缓冲
    pub dynamic_vertices: bool,
}

impl RenderItem {
    /// 新建的渲染项对所有帧槽位都是脏的
    pub fn new(world: Matrix4, object_index: u32, mesh: MeshId, draw: DrawArgs, ring_size: usize) -> Self {
        Self {
            world,
            dirty_frames: ring_size,
            object_index,
            mesh,
            draw,
            dynamic_vertices: false,
        }
    }

    pub fn with_dynamic_vertices(mut self) -> Self {
        self.dynamic_vertices = true;
        self
    }

    pub fn set_world(&mut self, world: Matrix4, ring_size: usize) {
        self.world = world;
        self.mark_dirty(ring_size);
    }

    pub fn mark_dirty(&mut self, ring_size: usize) {
        self.dirty_frames = ring_size;
    }

    pub fn dirty_frames(&self) -> usize {
        self.dirty_frames
    }

    /// 如果仍是脏的，把世界矩阵写入当前帧的物体常量缓冲，返回是否写入
    pub fn update_object_constants<M: UploadMemory>(&mut self, buffer: &mut UploadBuffer<ObjectConstants, M>) -> Result<bool> {
        if self.dirty_frames == 0 {
            return Ok(false);
        }
        buffer.copy_data(self.object_index as usize, &ObjectConstants::new(&self.world))?;
        self.dirty_frames -= 1;
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::math::rotation_y;
    use crate::renderer::host::HostUploadMemory;

    const ARGS: DrawArgs = DrawArgs {
        index_count: 36,
        start_index: 0,
        base_vertex: 0,
    };

    fn buffers(ring: usize) -> Vec<UploadBuffer<ObjectConstants, HostUploadMemory>> {
        (0..ring)
            .map(|_| UploadBuffer::new(HostUploadMemory::new(512, 0), 2, true).unwrap())
            .collect()
    }

    #[test]
    fn test_dirty_counter_covers_every_slot() {
        let ring = 3;
        let mut slots = buffers(ring);
        let mut item = RenderItem::new(Matrix4::identity(), 1, MeshId(0), ARGS, ring);

        let world = rotation_y(0.5);
        item.set_world(world, ring);
        for slot in slots.iter_mut() {
            assert!(item.update_object_constants(slot).unwrap());
        }
        assert_eq!(item.dirty_frames(), 0);
        assert!(!item.update_object_constants(&mut slots[0]).unwrap());

        let expected = ObjectConstants::new(&world);
        for slot in &slots {
            let bytes = &slot.memory().bytes()[256..256 + 64];
            assert_eq!(bytes, bytemuck::bytes_of(&expected));
        }
    }

    #[test]
    fn test_out_of_range_object_index() {
        let mut slots = buffers(2);
        let mut item = RenderItem::new(Matrix4::identity(), 2, MeshId(0), ARGS, 2);
        assert!(item.update_object_constants(&mut slots[0]).is_err());
    }
}
