/// 顶点定义模块
///
/// 所有演示共用一种顶点格式，与 HLSL 输入布局
/// `POSITION` / `COLOR` / `TEXCOORD` 一一对应。

use bytemuck::{Pod, Zeroable};

/// 顶点结构
///
/// # 内存布局
///
/// - position: 12 bytes (3 * f32)
/// - color: 16 bytes (4 * f32)
/// - texcoord: 8 bytes (2 * f32)
/// - **总计**: 36 bytes
#[repr(C)]
#[derive(Default, Clone, Copy, Debug, PartialEq, Pod, Zeroable)]
pub struct Vertex {
    /// 顶点位置 (x, y, z)
    pub position: [f32; 3],

    /// 顶点颜色 (r, g, b, a)
    pub color: [f32; 4],

    /// 纹理坐标 (u, v)
    pub texcoord: [f32; 2],
}

impl Vertex {
    #[inline]
    pub fn new(position: [f32; 3], color: [f32; 4], texcoord: [f32; 2]) -> Self {
        Self {
            position,
            color,
            texcoord,
        }
    }

    /// 顶点步长（字节）
    pub const fn stride() -> u32 {
        std::mem::size_of::<Self>() as u32
    }
}

/// 输入布局元素描述，后端据此创建 D3D12_INPUT_ELEMENT_DESC
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VertexAttribute {
    /// 语义名（以 NUL 结尾，便于直接传给图形 API）
    pub semantic: &'static [u8],
    /// 分量数
    pub components: u32,
    /// 字节偏移
    pub offset: u32,
}

/// 顶点的输入布局
pub const VERTEX_LAYOUT: [VertexAttribute; 3] = [
    VertexAttribute {
        semantic: b"POSITION\0",
        components: 3,
        offset: 0,
    },
    VertexAttribute {
        semantic: b"COLOR\0",
        components: 4,
        offset: 12,
    },
    VertexAttribute {
        semantic: b"TEXCOORD\0",
        components: 2,
        offset: 28,
    },
];

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_vertex_layout() {
        assert_eq!(Vertex::stride(), 36);
        assert_eq!(std::mem::offset_of!(Vertex, color) as u32, VERTEX_LAYOUT[1].offset);
        assert_eq!(std::mem::offset_of!(Vertex, texcoord) as u32, VERTEX_LAYOUT[2].offset);
    }
}
