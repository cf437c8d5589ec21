//! 水面波浪
//!
//! 在 `rows x cols` 的网格上用有限差分求解二维波动方程。每个时间步只更新内部点，
//! 边界高度固定为 0。CPU 每帧把顶点写进当前帧槽位的动态顶点缓冲。

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tracing::trace;

use crate::core::error::{GraphicsError, Result};
use crate::geometry::{create_grid, MeshData, Vertex};
use crate::renderer::resource::{UploadBuffer, UploadMemory};

const WATER: [f32; 4] = [0.15, 0.35, 0.75, 1.0];

/// 波浪参数
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WaveParams {
    pub rows: u16,
    pub cols: u16,
    /// 相邻顶点的间距
    pub spatial_step: f32,
    /// 模拟步长（秒）
    pub time_step: f32,
    /// 波速
    pub speed: f32,
    /// 阻尼
    pub damping: f32,
}

impl Default for WaveParams {
    fn default() -> Self {
        Self {
            rows: 128,
            cols: 128,
            spatial_step: 1.0,
            time_step: 0.03,
            speed: 4.0,
            damping: 0.2,
        }
    }
}

/// 波浪模拟
pub struct Waves {
    rows: usize,
    cols: usize,
    time_step: f32,
    k1: f32,
    k2: f32,
    k3: f32,
    accumulated: f32,
    prev: Vec<f32>,
    curr: Vec<f32>,
    vertices: Vec<Vertex>,
    mesh: MeshData,
}

impl Waves {
    pub fn new(params: WaveParams) -> Result<Self> {
        let rows = params.rows as usize;
        let cols = params.cols as usize;
        if rows < 3 || cols < 3 || rows * cols > u16::MAX as usize {
            return Err(GraphicsError::ResourceCreation(format!("Wave grid {}x{} is not supported", rows, cols)).into());
        }

        let d = params.damping * params.time_step + 2.0;
        let e = (params.speed * params.speed) * (params.time_step * params.time_step)
            / (params.spatial_step * params.spatial_step);
        let k1 = (params.damping * params.time_step - 2.0) / d;
        let k2 = (4.0 - 8.0 * e) / d;
        let k3 = (2.0 * e) / d;

        let width = (cols - 1) as f32 * params.spatial_step;
        let depth = (rows - 1) as f32 * params.spatial_step;
        let mut mesh = create_grid(width, depth, params.rows, params.cols);
        for vertex in mesh.vertices.iter_mut() {
            vertex.color = WATER;
        }
        for submesh in mesh.submeshes.iter_mut() {
            submesh.name = "waves".to_string();
        }
        mesh.name = Some("waves".to_string());
        let vertices = mesh.vertices.clone();

        Ok(Self {
            rows,
            cols,
            time_step: params.time_step,
            k1,
            k2,
            k3,
            accumulated: 0.0,
            prev: vec![0.0; rows * cols],
            curr: vec![0.0; rows * cols],
            vertices,
            mesh,
        })
    }

    /// 静止水面的网格，索引缓冲在整个生命周期内不变
    pub fn mesh(&self) -> &MeshData {
        &self.mesh
    }

    pub fn vertex_count(&self) -> usize {
        self.vertices.len()
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn cols(&self) -> usize {
        self.cols
    }

    /// 第 (i, j) 个顶点的高度
    pub fn height(&self, i: usize, j: usize) -> f32 {
        self.curr[i * self.cols + j]
    }

    /// 累积时间，满一个模拟步长时推进一步，返回是否推进
    pub fn update(&mut self, dt: f32) -> bool {
        self.accumulated += dt;
        if self.accumulated < self.time_step {
            return false;
        }
        self.accumulated = 0.0;

        let n = self.cols;
        for i in 1..self.rows - 1 {
            for j in 1..n - 1 {
                let at = i * n + j;
                let neighbours = self.curr[at + n] + self.curr[at - n] + self.curr[at + 1] + self.curr[at - 1];
                self.prev[at] = self.k1 * self.prev[at] + self.k2 * self.curr[at] + self.k3 * neighbours;
            }
        }
        // prev 中已是新的解
        std::mem::swap(&mut self.prev, &mut self.curr);

        for (vertex, height) in self.vertices.iter_mut().zip(&self.curr) {
            vertex.position[1] = *height;
        }
        true
    }

    /// 在内部点 (i, j) 处抬高水面，四邻点抬高一半
    pub fn disturb(&mut self, i: usize, j: usize, magnitude: f32) -> Result<()> {
        if i < 2 || i + 2 >= self.rows {
            return Err(GraphicsError::out_of_range("Wave row", i, self.rows - 2).into());
        }
        if j < 2 || j + 2 >= self.cols {
            return Err(GraphicsError::out_of_range("Wave column", j, self.cols - 2).into());
        }

        let n = self.cols;
        let half = 0.5 * magnitude;
        let at = i * n + j;
        self.curr[at] += magnitude;
        self.curr[at + 1] += half;
        self.curr[at - 1] += half;
        self.curr[at + n] += half;
        self.curr[at - n] += half;
        Ok(())
    }

    /// 把当前顶点写入帧槽位的顶点缓冲
    pub fn write_vertices<M: UploadMemory>(&self, buffer: &mut UploadBuffer<Vertex, M>) -> Result<()> {
        buffer.copy_slice(0, &self.vertices)
    }
}

/// 按固定间隔在随机位置扰动水面
pub struct WaveDisturber {
    rng: StdRng,
    interval: f32,
    elapsed: f32,
    disturbances: u64,
}

impl WaveDisturber {
    pub fn new(seed: u64, interval: f32) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
            interval,
            elapsed: 0.0,
            disturbances: 0,
        }
    }

    /// 返回本次是否扰动
    pub fn tick(&mut self, waves: &mut Waves, dt: f32) -> Result<bool> {
        self.elapsed += dt;
        if self.elapsed < self.interval {
            return Ok(false);
        }
        self.elapsed = 0.0;

        if waves.rows() < 10 || waves.cols() < 10 {
            return Err(GraphicsError::ResourceCreation(format!(
                "Wave grid {}x{} is too small to disturb",
                waves.rows(),
                waves.cols()
            ))
            .into());
        }
        let i = self.rng.gen_range(4..waves.rows() - 5);
        let j = self.rng.gen_range(4..waves.cols() - 5);
        let magnitude = self.rng.gen_range(0.2f32..0.5);
        waves.disturb(i, j, magnitude)?;
        self.disturbances += 1;
        trace!(i, j, magnitude, "Wave disturbed");
        Ok(true)
    }

    pub fn disturbances(&self) -> u64 {
        self.disturbances
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::renderer::host::HostUploadMemory;

    fn small() -> Waves {
        Waves::new(WaveParams {
            rows: 16,
            cols: 16,
            ..Default::default()
        })
        .unwrap()
    }

    #[test]
    fn test_mesh_is_a_water_grid() {
        let waves = Waves::new(WaveParams::default()).unwrap();
        assert_eq!(waves.vertex_count(), 128 * 128);
        assert_eq!(waves.mesh().index_count(), 127 * 127 * 6);
        assert!(waves.mesh().submesh("waves").is_some());
        assert!(waves.mesh().vertices.iter().all(|v| v.color == WATER));
    }

    #[test]
    fn test_disturbance_spreads_to_neighbours() {
        let mut waves = small();
        waves.disturb(8, 8, 1.0).unwrap();
        assert_eq!(waves.height(8, 8), 1.0);
        assert_eq!(waves.height(8, 9), 0.5);
        assert_eq!(waves.height(10, 8), 0.0);

        // 不满一个步长不推进
        assert!(!waves.update(0.01));
        assert!(waves.update(0.03));
        assert!(waves.height(10, 8) > 0.0);
        // 边界固定
        assert_eq!(waves.height(0, 8), 0.0);
    }

    #[test]
    fn test_disturb_rejects_border() {
        let mut waves = small();
        assert!(waves.disturb(1, 8, 1.0).is_err());
        assert!(waves.disturb(8, 14, 1.0).is_err());
        assert!(waves.disturb(2, 13, 1.0).is_ok());
    }

    #[test]
    fn test_damping_settles_the_surface() {
        let mut waves = small();
        waves.disturb(8, 8, 1.0).unwrap();
        for _ in 0..2000 {
            waves.update(0.03);
        }
        assert!(waves.height(8, 8).abs() < 0.05);
    }

    #[test]
    fn test_vertices_follow_heights() {
        let mut waves = small();
        waves.disturb(5, 6, 0.4).unwrap();
        waves.update(0.03);

        let count = waves.vertex_count();
        let memory = HostUploadMemory::new(UploadBuffer::<Vertex, HostUploadMemory>::byte_size_for(count, false), 0);
        let mut buffer = UploadBuffer::<Vertex, _>::new(memory, count, false).unwrap();
        waves.write_vertices(&mut buffer).unwrap();

        let bytes = buffer.memory().bytes();
        let stride = Vertex::stride() as usize;
        for i in 0..waves.rows() {
            for j in 0..waves.cols() {
                let offset = (i * waves.cols() + j) * stride;
                let written: Vertex = bytemuck::pod_read_unaligned(&bytes[offset..offset + stride]);
                assert_eq!(written.position[1], waves.height(i, j));
            }
        }
    }

    #[test]
    fn test_disturber_is_periodic_and_seeded() {
        let mut a = small();
        let mut b = small();
        let mut first = WaveDisturber::new(7, 0.25);
        let mut second = WaveDisturber::new(7, 0.25);
        for _ in 0..40 {
            first.tick(&mut a, 0.125).unwrap();
            second.tick(&mut b, 0.125).unwrap();
        }
        // 每 2 次 tick 扰动一次
        assert_eq!(first.disturbances(), 20);

        let mut tiny = Waves::new(WaveParams {
            rows: 6,
            cols: 6,
            ..Default::default()
        })
        .unwrap();
        assert!(WaveDisturber::new(7, 0.25).tick(&mut tiny, 0.5).is_err());
        for i in 0..a.rows() {
            for j in 0..a.cols() {
                assert_eq!(a.height(i, j), b.height(i, j));
            }
        }
    }
}
