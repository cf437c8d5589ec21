//! 资源管理模块
//!
//! 提供类型化、持久映射的上传缓冲区，用于每帧更新的常量数据。
//!
//! # 设计原则
//!
//! - **自动对齐**：常量缓冲区元素步长按 256 字节对齐
//! - **越界检查**：`copy_data` 的索引必须小于元素数量，否则返回错误
//! - **只写**：环内的常量缓冲区 CPU 只写不读，映射时读范围为空
//! - **生命周期**：映射在整个缓冲区生命周期内保持，GPU/CPU 互斥由帧资源环保证

use bytemuck::Pod;
use std::marker::PhantomData;

use crate::core::error::{GraphicsError, Result};

/// 常量缓冲区对齐（D3D12_CONSTANT_BUFFER_DATA_PLACEMENT_ALIGNMENT）
pub const CONSTANT_BUFFER_ALIGNMENT: u64 = 256;

/// 纹理上传时每行的对齐（D3D12_TEXTURE_DATA_PITCH_ALIGNMENT）
pub const TEXTURE_PITCH_ALIGNMENT: u64 = 256;

/// 向上对齐到 `alignment`（必须是 2 的幂）
pub fn align_up(size: u64, alignment: u64) -> u64 {
    debug_assert!(alignment.is_power_of_two());
    (size + alignment - 1) & !(alignment - 1)
}

/// 常量缓冲区大小向上对齐到 256 字节
pub fn constant_buffer_byte_size(size: u64) -> u64 {
    align_up(size, CONSTANT_BUFFER_ALIGNMENT)
}

/// 纹理上传缓冲区中一行 RGBA8 像素的字节数
pub fn texture_row_pitch(width: u32) -> u64 {
    align_up(width as u64 * 4, TEXTURE_PITCH_ALIGNMENT)
}

/// 上传堆内存
///
/// 对应一块 CPU 可写、GPU 可读的持久映射内存。
pub trait UploadMemory {
    /// 映射后的 CPU 可写字节
    fn bytes_mut(&mut self) -> &mut [u8];

    /// 内存起始处的 GPU 虚拟地址
    fn gpu_address(&self) -> u64;

    /// 字节数
    fn byte_size(&self) -> u64;
}

/// 上传缓冲区（CPU -> GPU）
///
/// 元素 `i` 位于 `i * element_stride` 处。用作常量缓冲区时步长为
/// `size_of::<T>()` 向上对齐到 256 字节。
///
/// # 示例
///
/// ```ignore
/// let mut buffer = UploadBuffer::<ObjectConstants, _>::new(memory, object_count, true)?;
/// buffer.copy_data(0, &constants)?;
/// ```
pub struct UploadBuffer<T, M> {
    memory: M,
    element_count: usize,
    element_stride: u64,
    is_constant_buffer: bool,
    _phantom: PhantomData<T>,
}

impl<T: Pod, M: UploadMemory> UploadBuffer<T, M> {
    /// 元素步长
    pub fn stride_for(is_constant_buffer: bool) -> u64 {
        let size = std::mem::size_of::<T>() as u64;
        if is_constant_buffer {
            constant_buffer_byte_size(size)
        } else {
            size
        }
    }

    /// 容纳 `element_count` 个元素需要的字节数
    pub fn byte_size_for(element_count: usize, is_constant_buffer: bool) -> u64 {
        Self::stride_for(is_constant_buffer) * element_count as u64
    }

    /// 在已分配的上传内存上创建缓冲区
    pub fn new(memory: M, element_count: usize, is_constant_buffer: bool) -> Result<Self> {
        let required = Self::byte_size_for(element_count, is_constant_buffer);
        if memory.byte_size() < required {
            return Err(GraphicsError::ResourceCreation(format!(
                "Upload memory holds {} bytes, {} required for {} elements",
                memory.byte_size(),
                required,
                element_count
            ))
            .into());
        }

        Ok(Self {
            memory,
            element_count,
            element_stride: Self::stride_for(is_constant_buffer),
            is_constant_buffer,
            _phantom: PhantomData,
        })
    }

    /// 将 `value` 写入第 `index` 个元素
    pub fn copy_data(&mut self, index: usize, value: &T) -> Result<()> {
        let offset = self.element_offset(index)? as usize;
        let bytes = bytemuck::bytes_of(value);
        self.memory.bytes_mut()[offset..offset + bytes.len()].copy_from_slice(bytes);
        Ok(())
    }

    /// 从第 `first` 个元素起连续写入 `values`
    ///
    /// 只用于顶点等紧密排列的缓冲区；常量缓冲区元素间有填充，需逐个 `copy_data`。
    pub fn copy_slice(&mut self, first: usize, values: &[T]) -> Result<()> {
        if self.is_constant_buffer {
            return Err(GraphicsError::ResourceCreation("copy_slice on a constant buffer".to_string()).into());
        }
        let end = first + values.len();
        if end > self.element_count {
            return Err(GraphicsError::out_of_range("Upload buffer element", end.saturating_sub(1), self.element_count).into());
        }
        let offset = self.element_stride as usize * first;
        let bytes: &[u8] = bytemuck::cast_slice(values);
        self.memory.bytes_mut()[offset..offset + bytes.len()].copy_from_slice(bytes);
        Ok(())
    }

    /// 缓冲区中元素占用的总字节数
    pub fn byte_len(&self) -> u64 {
        self.element_stride * self.element_count as u64
    }

    /// 第 `index` 个元素的字节偏移
    pub fn element_offset(&self, index: usize) -> Result<u64> {
        if index >= self.element_count {
            return Err(GraphicsError::out_of_range("Upload buffer element", index, self.element_count).into());
        }
        Ok(self.element_stride * index as u64)
    }

    /// 第 `index` 个元素的 GPU 地址，用于创建 CBV
    pub fn element_gpu_address(&self, index: usize) -> Result<u64> {
        Ok(self.memory.gpu_address() + self.element_offset(index)?)
    }

    pub fn element_count(&self) -> usize {
        self.element_count
    }

    pub fn element_stride(&self) -> u64 {
        self.element_stride
    }

    pub fn is_constant_buffer(&self) -> bool {
        self.is_constant_buffer
    }

    pub fn memory(&self) -> &M {
        &self.memory
    }
}

/// 把 RGBA8 像素按对齐后的行距写入上传内存
pub fn write_texture_rows<M: UploadMemory>(memory: &mut M, pixels: &[u8], width: u32, height: u32) -> Result<u64> {
    let pitch = texture_row_pitch(width);
    let row_bytes = width as usize * 4;
    let required = pitch * height as u64;

    if pixels.len() < row_bytes * height as usize {
        return Err(GraphicsError::ResourceCreation(format!(
            "Pixel data holds {} bytes, {}x{} RGBA8 needs {}",
            pixels.len(),
            width,
            height,
            row_bytes * height as usize
        ))
        .into());
    }
    if memory.byte_size() < required {
        return Err(GraphicsError::out_of_range("Texture upload byte", required as usize, memory.byte_size() as usize).into());
    }

    let bytes = memory.bytes_mut();
    for (row, src) in pixels.chunks_exact(row_bytes).take(height as usize).enumerate() {
        let dst = row * pitch as usize;
        bytes[dst..dst + row_bytes].copy_from_slice(src);
    }
    Ok(pitch)
}
