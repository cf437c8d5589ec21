//! 配置管理模块
//!
//! 提供演示程序配置的加载、解析和管理功能。
//! 支持从 TOML 配置文件加载，也支持命令行参数覆盖。
//!
//! # 配置文件格式 (config.toml)
//!
//! ```toml
//! [window]
//! width = 800
//! height = 600
//! title = "D3D12 Demos"
//! resizable = true
//!
//! [graphics]
//! frame_count = 3     # 帧资源环大小，2 或 3
//! vsync = true
//! debug_layer = true
//! shader_dir = "shaders"
//!
//! [demo]
//! kind = "shapes"     # quad, cube, shapes, gif, waves
//! textures = ["textures/grass.png", "textures/water.png"]
//! gif = "textures/animation.gif"
//!
//! [logging]
//! level = "info"      # trace, debug, info, warn, error
//! file_output = false
//! ```

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::str::FromStr;

use super::error::{ConfigError, Result};

/// 帧资源环允许的最小长度
pub const MIN_FRAME_COUNT: usize = 2;
/// 帧资源环允许的最大长度
pub const MAX_FRAME_COUNT: usize = 3;

/// 演示程序配置
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// 窗口配置
    #[serde(default)]
    pub window: WindowConfig,

    /// 图形配置
    #[serde(default)]
    pub graphics: GraphicsConfig,

    /// 演示场景配置
    #[serde(default)]
    pub demo: DemoConfig,

    /// 日志配置
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// 窗口配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WindowConfig {
    /// 窗口宽度
    #[serde(default = "default_width")]
    pub width: u32,

    /// 窗口高度
    #[serde(default = "default_height")]
    pub height: u32,

    /// 窗口标题
    #[serde(default = "default_title")]
    pub title: String,

    /// 是否可调整大小
    #[serde(default = "default_resizable")]
    pub resizable: bool,
}

/// 图形配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GraphicsConfig {
    /// 帧资源环大小（同时也是交换链缓冲数）
    #[serde(default = "default_frame_count")]
    pub frame_count: usize,

    /// 垂直同步（Present 的 sync interval 为 1 或 0）
    #[serde(default = "default_vsync")]
    pub vsync: bool,

    /// 是否启用 D3D12 调试层
    #[serde(default = "default_debug_layer")]
    pub debug_layer: bool,

    /// 预编译着色器目录（vs.bin / ps.bin / cs.bin）
    #[serde(default = "default_shader_dir")]
    pub shader_dir: String,

    /// 无窗口模式下模拟的帧数，None 表示正常窗口运行
    #[serde(default)]
    pub headless_frames: Option<u32>,
}

/// 演示场景种类
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DemoKind {
    /// 单个贴图四边形
    Quad,
    /// 旋转立方体
    Cube,
    /// 多物体场景（立方体 + 网格地面）
    Shapes,
    /// 计算着色器播放 GIF
    Gif,
    /// 山丘地形 + 每帧由 CPU 更新的水面
    Waves,
}

/// 演示场景配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DemoConfig {
    /// 运行哪个演示
    #[serde(default = "default_demo_kind")]
    pub kind: DemoKind,

    /// 静态纹理列表（shapes 演示按时间轮换）
    #[serde(default = "default_textures")]
    pub textures: Vec<String>,

    /// GIF 文件路径
    #[serde(default = "default_gif")]
    pub gif: String,

    /// 清屏颜色
    #[serde(default = "default_clear_color")]
    pub clear_color: [f32; 4],

    /// GIF 背景色（第一帧及 DISPOSE_BACKGROUND 时填充）
    #[serde(default = "default_gif_background")]
    pub gif_background: [f32; 4],
}

/// 日志配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// 日志级别
    #[serde(default = "default_log_level")]
    pub level: LogLevel,

    /// 是否输出到文件
    #[serde(default = "default_file_output")]
    pub file_output: bool,

    /// 日志文件路径
    #[serde(default = "default_log_file")]
    pub log_file: String,
}

/// 日志级别
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Trace,
    Debug,
    Info,
    Warn,
    Error,
}

// 默认值函数
fn default_width() -> u32 { 800 }
fn default_height() -> u32 { 600 }
fn default_title() -> String { "D3D12 Demos".to_string() }
fn default_resizable() -> bool { true }
fn default_frame_count() -> usize { 3 }
fn default_vsync() -> bool { true }
fn default_debug_layer() -> bool { cfg!(debug_assertions) }
fn default_shader_dir() -> String { "shaders".to_string() }
fn default_demo_kind() -> DemoKind { DemoKind::Shapes }
fn default_textures() -> Vec<String> { vec!["textures/grass.png".to_string()] }
fn default_gif() -> String { "textures/animation.gif".to_string() }
fn default_clear_color() -> [f32; 4] { [0.690, 0.769, 0.871, 1.0] }
fn default_gif_background() -> [f32; 4] { [0.0, 0.0, 0.0, 0.0] }
fn default_log_level() -> LogLevel { LogLevel::Info }
fn default_file_output() -> bool { false }
fn default_log_file() -> String { "d3d12_demos.log".to_string() }

impl Default for WindowConfig {
    fn default() -> Self {
        Self {
            width: default_width(),
            height: default_height(),
            title: default_title(),
            resizable: default_resizable(),
        }
    }
}

impl Default for GraphicsConfig {
    fn default() -> Self {
        Self {
            frame_count: default_frame_count(),
            vsync: default_vsync(),
            debug_layer: default_debug_layer(),
            shader_dir: default_shader_dir(),
            headless_frames: None,
        }
    }
}

impl Default for DemoConfig {
    fn default() -> Self {
        Self {
            kind: default_demo_kind(),
            textures: default_textures(),
            gif: default_gif(),
            clear_color: default_clear_color(),
            gif_background: default_gif_background(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            file_output: default_file_output(),
            log_file: default_log_file(),
        }
    }
}

impl Config {
    /// 从配置文件加载
    ///
    /// # 示例
    ///
    /// ```no_run
    /// use d3d12_demos::core::Config;
    ///
    /// let config = Config::from_file("config.toml").unwrap();
    /// ```
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path_str = path.as_ref().to_string_lossy().to_string();

        let contents = std::fs::read_to_string(path)
            .map_err(|_| ConfigError::FileNotFound(path_str.clone()))?;

        toml::from_str(&contents)
            .map_err(|e| ConfigError::ParseError(e.to_string()).into())
    }

    /// 从配置文件加载，如果文件不存在或解析失败则使用默认配置
    pub fn from_file_or_default<P: AsRef<Path>>(path: P) -> Self {
        Self::from_file(path).unwrap_or_default()
    }

    /// 从命令行参数覆盖配置
    ///
    /// 支持的参数：
    /// - `--demo <quad|cube|shapes|gif|waves>`: 选择演示
    /// - `--width <value>` / `--height <value>`: 窗口尺寸
    /// - `--frames <2|3>`: 帧资源环大小
    /// - `--no-vsync`: 关闭垂直同步
    /// - `--gif <path>`: GIF 文件
    /// - `--headless <frames>`: 不创建窗口，用模拟后端跑指定帧数
    ///
    /// 数值参数无法解析时返回 [`ConfigError::InvalidValue`]。
    pub fn apply_args<I>(&mut self, args: I) -> Result<()>
    where
        I: IntoIterator,
        I::Item: AsRef<str>,
    {
        let args: Vec<String> = args.into_iter().map(|s| s.as_ref().to_string()).collect();

        if let Some(kind) = flag_value(&args, "--demo") {
            self.demo.kind = kind.parse()?;
        }

        if let Some(width) = parsed_flag(&args, "--width", "window.width")? {
            self.window.width = width;
        }

        if let Some(height) = parsed_flag(&args, "--height", "window.height")? {
            self.window.height = height;
        }

        if let Some(frames) = parsed_flag(&args, "--frames", "graphics.frame_count")? {
            self.graphics.frame_count = frames;
        }

        if args.iter().any(|a| a == "--no-vsync") {
            self.graphics.vsync = false;
        }

        if let Some(gif) = flag_value(&args, "--gif") {
            self.demo.gif = gif.to_string();
        }

        if let Some(frames) = parsed_flag(&args, "--headless", "graphics.headless_frames")? {
            self.graphics.headless_frames = Some(frames);
        }

        Ok(())
    }

    /// 验证配置的有效性
    pub fn validate(&self) -> Result<()> {
        if self.window.width == 0 || self.window.height == 0 {
            return Err(ConfigError::InvalidValue {
                field: "window.width/height".to_string(),
                reason: "Window dimensions must be greater than 0".to_string(),
            }
            .into());
        }

        if !(MIN_FRAME_COUNT..=MAX_FRAME_COUNT).contains(&self.graphics.frame_count) {
            return Err(ConfigError::InvalidValue {
                field: "graphics.frame_count".to_string(),
                reason: format!(
                    "Frame resource ring must hold {} to {} frames",
                    MIN_FRAME_COUNT, MAX_FRAME_COUNT
                ),
            }
            .into());
        }

        match self.demo.kind {
            DemoKind::Quad | DemoKind::Shapes if self.demo.textures.is_empty() => {
                Err(ConfigError::InvalidValue {
                    field: "demo.textures".to_string(),
                    reason: format!("The {} demo needs at least one texture", self.demo.kind.name()),
                }
                .into())
            }
            DemoKind::Gif if self.demo.gif.is_empty() => Err(ConfigError::InvalidValue {
                field: "demo.gif".to_string(),
                reason: "The gif demo needs a GIF file".to_string(),
            }
            .into()),
            _ => Ok(()),
        }
    }

    /// 着色器字节码路径
    pub fn shader_path(&self, file_name: &str) -> PathBuf {
        Path::new(&self.graphics.shader_dir).join(file_name)
    }

    /// Present 的同步间隔
    pub fn sync_interval(&self) -> u32 {
        if self.graphics.vsync { 1 } else { 0 }
    }
}

fn flag_value<'a>(args: &'a [String], flag: &str) -> Option<&'a str> {
    let idx = args.iter().position(|a| a == flag)?;
    args.get(idx + 1).map(|s| s.as_str())
}

/// 解析数值参数；参数存在但缺值或无法解析时报错
fn parsed_flag<T>(args: &[String], flag: &str, field: &str) -> Result<Option<T>>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    if !args.iter().any(|a| a == flag) {
        return Ok(None);
    }
    let value = flag_value(args, flag).ok_or_else(|| ConfigError::InvalidValue {
        field: field.to_string(),
        reason: format!("{} expects a value", flag),
    })?;
    value.parse().map(Some).map_err(|e: T::Err| {
        ConfigError::InvalidValue {
            field: field.to_string(),
            reason: format!("{} '{}': {}", flag, value, e),
        }
        .into()
    })
}

impl DemoKind {
    /// 获取演示名称
    pub fn name(&self) -> &'static str {
        match self {
            DemoKind::Quad => "quad",
            DemoKind::Cube => "cube",
            DemoKind::Shapes => "shapes",
            DemoKind::Gif => "gif",
            DemoKind::Waves => "waves",
        }
    }

    /// 是否使用计算队列
    pub fn uses_compute(&self) -> bool {
        matches!(self, DemoKind::Gif)
    }
}

impl FromStr for DemoKind {
    type Err = ConfigError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "quad" => Ok(DemoKind::Quad),
            "cube" => Ok(DemoKind::Cube),
            "shapes" => Ok(DemoKind::Shapes),
            "gif" => Ok(DemoKind::Gif),
            "waves" => Ok(DemoKind::Waves),
            other => Err(ConfigError::InvalidValue {
                field: "demo.kind".to_string(),
                reason: format!("Unknown demo '{}'", other),
            }),
        }
    }
}
