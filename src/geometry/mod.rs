/// 几何体模块
///
/// 顶点格式、CPU 侧网格数据和演示用的简单几何体生成。
///
/// # 模块结构
///
/// - `vertex`: 顶点数据结构和输入布局
/// - `mesh`: 网格数据和子网格
/// - `generator`: 四边形、立方体、网格地面、山丘
///
/// # 架构设计
///
/// ```text
/// generator (quad / box / grid)
///     ↓
/// MeshData::merge (CPU侧数据)
///     ↓
/// GpuDevice::create_mesh (上传到GPU)
/// ```

pub mod vertex;
pub mod mesh;
pub mod generator;

// 重新导出常用类型
pub use generator::{create_box, create_grid, create_hills, create_quad, HillsShape};
pub use mesh::{MeshData, Submesh};
pub use vertex::{Vertex, VERTEX_LAYOUT};
