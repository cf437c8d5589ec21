//! 着色器字节码加载
//!
//! 着色器离线编译为 DXBC，每个演示一个目录：
//!
//! ```text
//! <shader_dir>/<demo>/vs.bin   顶点着色器
//! <shader_dir>/<demo>/ps.bin   像素着色器
//! <shader_dir>/<demo>/cs.bin   计算着色器（仅 gif）
//! ```
//!
//! 运行时只读取字节，不做编译。

use std::path::Path;

use tracing::debug;

use crate::core::config::Config;
use crate::core::error::{GraphicsError, Result};
use crate::renderer::backend::ShaderBytecode;

/// 一个演示需要的全部着色器
#[derive(Debug, Clone, Default)]
pub struct DemoShaders {
    pub graphics: ShaderBytecode,
    /// GIF 合成计算着色器，其他演示为空
    pub compute: Vec<u8>,
}

impl DemoShaders {
    pub fn load(config: &Config) -> Result<Self> {
        let kind = config.demo.kind;
        let read = |file: &str| read_bytecode(&config.shader_path(&format!("{}/{}", kind.name(), file)));

        let graphics = ShaderBytecode {
            vertex: read("vs.bin")?,
            pixel: read("ps.bin")?,
        };
        let compute = if kind.uses_compute() { read("cs.bin")? } else { Vec::new() };

        Ok(Self { graphics, compute })
    }
}

/// 读取一个着色器文件
pub fn read_bytecode(path: &Path) -> Result<Vec<u8>> {
    let bytes = std::fs::read(path).map_err(|e| GraphicsError::ShaderLoad {
        path: path.display().to_string(),
        reason: e.to_string(),
    })?;
    if bytes.is_empty() {
        return Err(GraphicsError::ShaderLoad {
            path: path.display().to_string(),
            reason: "file is empty".to_string(),
        }
        .into());
    }
    debug!(path = %path.display(), bytes = bytes.len(), "Shader bytecode loaded");
    Ok(bytes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::error::DemoError;

    #[test]
    fn test_missing_shader_reports_path() {
        let mut config = Config::default();
        config.graphics.shader_dir = "no_such_dir".to_string();
        let err = DemoShaders::load(&config).unwrap_err();
        match err {
            DemoError::Graphics(GraphicsError::ShaderLoad { path, .. }) => {
                assert!(path.ends_with("vs.bin"));
                assert!(path.contains("shapes"));
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }
}
