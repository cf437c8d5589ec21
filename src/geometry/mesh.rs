/// 网格数据结构模块
///
/// CPU 侧的网格容器。多个几何体可以合并到同一对顶点/索引缓冲中，
/// 每个几何体以 [`Submesh`] 记录自己在缓冲中的位置。

use super::vertex::Vertex;
use crate::renderer::command::DrawArgs;

/// 子网格
///
/// 描述合并缓冲中的一段索引范围，绘制时直接转成 `DrawIndexedInstanced` 参数。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Submesh {
    /// 子网格名称（"box"、"grid" 等）
    pub name: String,

    /// 索引数量
    pub index_count: u32,

    /// 在索引缓冲中的起始位置
    pub start_index: u32,

    /// 加到每个索引上的顶点偏移
    pub base_vertex: i32,
}

impl Submesh {
    /// 绘制参数
    #[inline]
    pub fn draw_args(&self) -> DrawArgs {
        DrawArgs {
            index_count: self.index_count,
            start_index: self.start_index,
            base_vertex: self.base_vertex,
        }
    }
}

/// CPU侧网格数据
///
/// 16 位索引，演示用几何体的顶点数远小于 65535。
#[derive(Debug, Clone, Default)]
pub struct MeshData {
    /// 顶点数组
    pub vertices: Vec<Vertex>,

    /// 索引数组（三角形列表）
    pub indices: Vec<u16>,

    /// 子网格列表
    pub submeshes: Vec<Submesh>,

    /// 网格名称
    pub name: Option<String>,
}

impl MeshData {
    /// 单个几何体，整体作为一个子网格
    pub fn single(name: &str, vertices: Vec<Vertex>, indices: Vec<u16>) -> Self {
        let submesh = Submesh {
            name: name.to_string(),
            index_count: indices.len() as u32,
            start_index: 0,
            base_vertex: 0,
        };
        Self {
            vertices,
            indices,
            submeshes: vec![submesh],
            name: Some(name.to_string()),
        }
    }

    /// 把多个网格合并到一对缓冲中
    ///
    /// 索引保持各自局部的值，由子网格的 `base_vertex` 偏移。
    pub fn merge(name: &str, parts: Vec<MeshData>) -> Self {
        let mut merged = MeshData {
            name: Some(name.to_string()),
            ..Default::default()
        };

        for part in parts {
            let base_vertex = merged.vertices.len() as i32;
            let start_index = merged.indices.len() as u32;
            for sub in &part.submeshes {
                merged.submeshes.push(Submesh {
                    name: sub.name.clone(),
                    index_count: sub.index_count,
                    start_index: start_index + sub.start_index,
                    base_vertex: base_vertex + sub.base_vertex,
                });
            }
            merged.vertices.extend(part.vertices);
            merged.indices.extend(part.indices);
        }
        merged
    }

    /// 按名称查找子网格
    pub fn submesh(&self, name: &str) -> Option<&Submesh> {
        self.submeshes.iter().find(|s| s.name == name)
    }

    pub fn vertex_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.vertices)
    }

    pub fn index_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.indices)
    }

    #[inline]
    pub fn vertex_count(&self) -> usize {
        self.vertices.len()
    }

    #[inline]
    pub fn index_count(&self) -> usize {
        self.indices.len()
    }

    /// 三角形数量
    #[inline]
    pub fn triangle_count(&self) -> usize {
        self.indices.len() / 3
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn triangle(name: &str) -> MeshData {
        MeshData::single(
            name,
            vec![Vertex::default(); 3],
            vec![0, 1, 2],
        )
    }

    #[test]
    fn test_merge_offsets_submeshes() {
        let merged = MeshData::merge("shapes", vec![triangle("a"), triangle("b")]);
        assert_eq!(merged.vertex_count(), 6);
        assert_eq!(merged.index_count(), 6);

        let b = merged.submesh("b").unwrap();
        assert_eq!(b.start_index, 3);
        assert_eq!(b.base_vertex, 3);
        assert_eq!(b.draw_args().index_count, 3);
        assert!(merged.submesh("c").is_none());
    }

    #[test]
    fn test_byte_views() {
        let mesh = triangle("t");
        assert_eq!(mesh.vertex_bytes().len(), 3 * 36);
        assert_eq!(mesh.index_bytes().len(), 6);
        assert_eq!(mesh.triangle_count(), 1);
    }
}
