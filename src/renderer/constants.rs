//! 着色器常量结构
//!
//! 与 HLSL 中 cbuffer 的布局一一对应，全部是 POD，可以直接按字节写入上传缓冲区。

use bytemuck::{Pod, Zeroable};

use crate::math::{to_shader_matrix, Matrix4};

/// 物体常量（b0）
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct ObjectConstants {
    pub world: [[f32; 4]; 4],
}

impl ObjectConstants {
    pub fn new(world: &Matrix4) -> Self {
        Self {
            world: to_shader_matrix(world),
        }
    }
}

impl Default for ObjectConstants {
    fn default() -> Self {
        Self::new(&Matrix4::identity())
    }
}

/// 渲染过程常量（b1）
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct PassConstants {
    pub view_proj: [[f32; 4]; 4],
    pub total_time: f32,
    pub _padding: [f32; 3],
}

impl PassConstants {
    pub fn new(view_proj: &Matrix4, total_time: f32) -> Self {
        Self {
            view_proj: to_shader_matrix(view_proj),
            total_time,
            _padding: [0.0; 3],
        }
    }
}

/// 材质常量（b2），选择纹理数组中的哪一张
#[repr(C)]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Pod, Zeroable)]
pub struct MaterialConstants {
    pub texture_index: u32,
    pub _padding: [u32; 3],
}

impl MaterialConstants {
    pub fn new(texture_index: u32) -> Self {
        Self {
            texture_index,
            _padding: [0; 3],
        }
    }
}

/// GIF 合成参数（计算着色器 b0）
#[repr(C)]
#[derive(Debug, Clone, Copy, Default, PartialEq, Pod, Zeroable)]
pub struct GifFrameParams {
    pub background_color: [f32; 4],
    pub current_frame: u32,
    pub disposal: u32,
    pub left_top: [u32; 2],
    pub size: [u32; 2],
    pub _padding: [u32; 2],
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_constant_sizes_are_16_byte_multiples() {
        assert_eq!(std::mem::size_of::<ObjectConstants>(), 64);
        assert_eq!(std::mem::size_of::<PassConstants>(), 80);
        assert_eq!(std::mem::size_of::<MaterialConstants>(), 16);
        assert_eq!(std::mem::size_of::<GifFrameParams>(), 48);
    }
}
