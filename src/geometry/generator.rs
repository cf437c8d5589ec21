/// 简单几何体生成
///
/// 左手坐标系，正面为顺时针环绕。

use super::mesh::MeshData;
use super::vertex::Vertex;

const WHITE: [f32; 4] = [1.0, 1.0, 1.0, 1.0];

/// 立方体各面颜色（前、后、上、下、左、右）
const FACE_COLORS: [[f32; 4]; 6] = [
    [1.0, 0.0, 0.0, 1.0],
    [0.0, 1.0, 0.0, 1.0],
    [0.0, 0.0, 1.0, 1.0],
    [1.0, 1.0, 0.0, 1.0],
    [0.0, 1.0, 1.0, 1.0],
    [1.0, 0.0, 1.0, 1.0],
];

/// 两个三角形组成的四边形索引
fn quad_indices(base: u16) -> [u16; 6] {
    [base, base + 1, base + 2, base, base + 2, base + 3]
}

/// XY 平面上居中的四边形，面向 -Z
pub fn create_quad(width: f32, height: f32) -> MeshData {
    let (w, h) = (width * 0.5, height * 0.5);
    let vertices = vec![
        Vertex::new([-w, -h, 0.0], WHITE, [0.0, 1.0]),
        Vertex::new([-w, h, 0.0], WHITE, [0.0, 0.0]),
        Vertex::new([w, h, 0.0], WHITE, [1.0, 0.0]),
        Vertex::new([w, -h, 0.0], WHITE, [1.0, 1.0]),
    ];
    MeshData::single("quad", vertices, quad_indices(0).to_vec())
}

/// 中心在原点的长方体，每个面 4 个独立顶点
pub fn create_box(width: f32, height: f32, depth: f32) -> MeshData {
    let (w, h, d) = (width * 0.5, height * 0.5, depth * 0.5);

    let faces: [[[f32; 3]; 4]; 6] = [
        // 前
        [[-w, -h, -d], [-w, h, -d], [w, h, -d], [w, -h, -d]],
        // 后
        [[-w, -h, d], [w, -h, d], [w, h, d], [-w, h, d]],
        // 上
        [[-w, h, -d], [-w, h, d], [w, h, d], [w, h, -d]],
        // 下
        [[-w, -h, -d], [w, -h, -d], [w, -h, d], [-w, -h, d]],
        // 左
        [[-w, -h, d], [-w, h, d], [-w, h, -d], [-w, -h, -d]],
        // 右
        [[w, -h, -d], [w, h, -d], [w, h, d], [w, -h, d]],
    ];
    let uvs = [[0.0, 1.0], [0.0, 0.0], [1.0, 0.0], [1.0, 1.0]];

    let mut vertices = Vec::with_capacity(24);
    let mut indices = Vec::with_capacity(36);
    for (face, corners) in faces.iter().enumerate() {
        indices.extend_from_slice(&quad_indices(vertices.len() as u16));
        for (corner, uv) in corners.iter().zip(uvs) {
            vertices.push(Vertex::new(*corner, FACE_COLORS[face], uv));
        }
    }

    MeshData::single("box", vertices, indices)
}

/// XZ 平面上 `rows x cols` 个顶点的网格
pub fn create_grid(width: f32, depth: f32, rows: u16, cols: u16) -> MeshData {
    let (rows, cols) = (rows.max(2), cols.max(2));
    let dx = width / (cols - 1) as f32;
    let dz = depth / (rows - 1) as f32;
    let du = 1.0 / (cols - 1) as f32;
    let dv = 1.0 / (rows - 1) as f32;

    let mut vertices = Vec::with_capacity(rows as usize * cols as usize);
    for i in 0..rows {
        let z = depth * 0.5 - i as f32 * dz;
        for j in 0..cols {
            let x = -width * 0.5 + j as f32 * dx;
            vertices.push(Vertex::new([x, 0.0, z], WHITE, [j as f32 * du, i as f32 * dv]));
        }
    }

    let mut indices = Vec::with_capacity((rows as usize - 1) * (cols as usize - 1) * 6);
    for i in 0..rows - 1 {
        for j in 0..cols - 1 {
            let a = i * cols + j;
            let b = (i + 1) * cols + j;
            indices.extend_from_slice(&[a, a + 1, b, b, a + 1, b + 1]);
        }
    }

    MeshData::single("grid", vertices, indices)
}

/// 山丘高度函数的参数
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HillsShape {
    /// 整体振幅
    pub total_scale: f32,
    /// x 方向频率
    pub x_scale: f32,
    /// z 方向频率
    pub z_scale: f32,
}

impl Default for HillsShape {
    fn default() -> Self {
        Self {
            total_scale: 0.3,
            x_scale: 0.1,
            z_scale: 0.1,
        }
    }
}

impl HillsShape {
    /// 地面上 (x, z) 处的高度
    pub fn height(&self, x: f32, z: f32) -> f32 {
        self.total_scale * (z * (self.x_scale * x).sin() + x * (self.z_scale * z).cos())
    }

    /// 按高度着色：沙滩、草地、树林、岩石、雪
    pub fn color(height: f32) -> [f32; 4] {
        if height < -10.0 {
            [1.0, 0.96, 0.62, 1.0]
        } else if height < 5.0 {
            [0.48, 0.77, 0.46, 1.0]
        } else if height < 12.0 {
            [0.1, 0.48, 0.19, 1.0]
        } else if height < 20.0 {
            [0.45, 0.39, 0.34, 1.0]
        } else {
            [1.0, 1.0, 1.0, 1.0]
        }
    }
}

/// 起伏的地面：平面网格按 [`HillsShape`] 抬高并着色
pub fn create_hills(width: f32, depth: f32, rows: u16, cols: u16, shape: &HillsShape) -> MeshData {
    let mut mesh = create_grid(width, depth, rows, cols);
    for vertex in mesh.vertices.iter_mut() {
        let [x, _, z] = vertex.position;
        let y = shape.height(x, z);
        vertex.position[1] = y;
        vertex.color = HillsShape::color(y);
    }
    rename(mesh, "hills")
}

fn rename(mut mesh: MeshData, name: &str) -> MeshData {
    for submesh in mesh.submeshes.iter_mut() {
        submesh.name = name.to_string();
    }
    mesh.name = Some(name.to_string());
    mesh
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_box_counts() {
        let mesh = create_box(1.0, 1.0, 1.0);
        assert_eq!(mesh.vertex_count(), 24);
        assert_eq!(mesh.index_count(), 36);
        assert!(mesh.indices.iter().all(|i| (*i as usize) < mesh.vertex_count()));
    }

    #[test]
    fn test_grid_counts() {
        let mesh = create_grid(20.0, 30.0, 60, 40);
        assert_eq!(mesh.vertex_count(), 2400);
        assert_eq!(mesh.triangle_count(), 2 * 59 * 39);
        assert!(mesh.indices.iter().all(|i| (*i as usize) < mesh.vertex_count()));
        assert_eq!(mesh.vertices[0].position, [-10.0, 0.0, 15.0]);
    }

    #[test]
    fn test_hills_follow_height_function() {
        let shape = HillsShape::default();
        let mesh = create_hills(160.0, 160.0, 50, 50, &shape);
        assert_eq!(mesh.vertex_count(), 2500);
        assert!(mesh.submesh("hills").is_some());
        for vertex in &mesh.vertices {
            let [x, y, z] = vertex.position;
            assert!((y - shape.height(x, z)).abs() < 1e-5);
            assert_eq!(vertex.color, HillsShape::color(y));
        }
        // 原点处没有起伏
        assert_eq!(shape.height(0.0, 0.0), 0.0);
    }

    #[test]
    fn test_quad_is_two_triangles() {
        let mesh = create_quad(2.0, 2.0);
        assert_eq!(mesh.triangle_count(), 2);
        assert_eq!(mesh.submesh("quad").unwrap().index_count, 6);
    }
}
