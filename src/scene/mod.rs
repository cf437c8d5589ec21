//! 场景模块
//!
//! 演示程序的 CPU 侧状态：相机、渲染项、纹理、GIF 动画和水面波浪。

pub mod camera;
pub mod gif;
pub mod render_item;
pub mod texture;
pub mod waves;

pub use camera::{OrbitCamera, OrbitLimits};
pub use gif::{load_gif, Disposal, GifAnimation, GifFrame, GifPlayback, PlaybackAction};
pub use render_item::RenderItem;
pub use texture::{load_image, ImageData};
pub use waves::{WaveDisturber, WaveParams, Waves};

use crate::core::config::{Config, DemoKind};
use crate::core::error::Result;

/// 演示需要的全部外部资源
#[derive(Debug, Clone, Default)]
pub struct DemoAssets {
    pub textures: Vec<ImageData>,
    pub gif: Option<GifAnimation>,
}

impl DemoAssets {
    /// 按配置从磁盘加载
    pub fn load(config: &Config) -> Result<Self> {
        let kind = config.demo.kind;
        let textures = match kind {
            DemoKind::Quad | DemoKind::Shapes => config
                .demo
                .textures
                .iter()
                .map(load_image)
                .collect::<Result<Vec<_>>>()?,
            DemoKind::Cube | DemoKind::Gif | DemoKind::Waves => Vec::new(),
        };
        let gif = match kind {
            DemoKind::Gif => Some(load_gif(&config.demo.gif)?),
            _ => None,
        };
        Ok(Self { textures, gif })
    }

    /// 不读文件的占位资源，用于无窗口运行和测试
    pub fn placeholder(kind: DemoKind) -> Self {
        let checker = |a: [u8; 4]| ImageData::solid(8, 8, a);
        match kind {
            DemoKind::Quad => Self {
                textures: vec![checker([200, 200, 200, 255])],
                gif: None,
            },
            DemoKind::Shapes => Self {
                textures: vec![checker([255, 0, 0, 255]), checker([0, 255, 0, 255]), checker([0, 0, 255, 255])],
                gif: None,
            },
            DemoKind::Cube | DemoKind::Waves => Self::default(),
            DemoKind::Gif => {
                let frames = [40u32, 60, 80]
                    .iter()
                    .enumerate()
                    .map(|(i, delay_ms)| GifFrame {
                        image: ImageData::solid(16, 16, [(i * 80) as u8, 0, 0, 255]),
                        left: 0,
                        top: 0,
                        delay_ms: *delay_ms,
                        disposal: Disposal::None,
                    })
                    .collect();
                Self {
                    textures: Vec::new(),
                    gif: GifAnimation::new(16, 16, frames).ok(),
                }
            }
        }
    }
}
