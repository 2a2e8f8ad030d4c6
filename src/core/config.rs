//! 配置管理模块
//!
//! 提供渲染核心配置的加载、解析和管理功能。
//! 支持从 TOML 配置文件加载，也支持命令行参数覆盖。
//!
//! # 配置文件格式 (config.toml)
//!
//! ```toml
//! [window]
//! width = 1280
//! height = 720
//!
//! [graphics]
//! vsync = true
//! max_cbuffers = 1000   # 常量缓冲区环的槽位数量
//! gamma = 2.2
//!
//! [logging]
//! level = "info"      # trace, debug, info, warn, error
//! file_output = false
//!
//! [run]
//! frames = 3          # 无窗口演示渲染的帧数
//! ```

use serde::{Deserialize, Serialize};
use std::path::Path;

use super::error::{ConfigError, Result};

/// 常量缓冲区槽位数量的上限
pub const MAX_CBUFFER_SLOTS: u32 = 1_000_000;

/// 引擎配置
///
/// 包含了渲染核心运行所需的所有配置项。
/// 可以从配置文件加载，也可以通过代码构建。
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// 窗口配置
    #[serde(default)]
    pub window: WindowConfig,

    /// 图形配置
    #[serde(default)]
    pub graphics: GraphicsConfig,

    /// 日志配置
    #[serde(default)]
    pub logging: LoggingConfig,

    /// 演示运行配置
    #[serde(default)]
    pub run: RunConfig,
}

/// 窗口配置
///
/// 没有真实窗口时，宽高只用于计算投影的宽高比。
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WindowConfig {
    /// 窗口宽度
    #[serde(default = "default_width")]
    pub width: u32,

    /// 窗口高度
    #[serde(default = "default_height")]
    pub height: u32,
}

/// 图形配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GraphicsConfig {
    /// 垂直同步
    #[serde(default = "default_vsync")]
    pub vsync: bool,

    /// 常量缓冲区环的槽位数量（上传堆大小 = 槽位数 * 256 字节）
    #[serde(default = "default_max_cbuffers")]
    pub max_cbuffers: u32,

    /// 输出 gamma，写入场景常量
    #[serde(default = "default_gamma")]
    pub gamma: f32,
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

/// 演示运行配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunConfig {
    /// 渲染的帧数
    #[serde(default = "default_frames")]
    pub frames: u32,
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
fn default_width() -> u32 { 1280 }
fn default_height() -> u32 { 720 }
fn default_vsync() -> bool { true }
fn default_max_cbuffers() -> u32 { 1000 }
fn default_gamma() -> f32 { 2.2 }
fn default_log_level() -> LogLevel { LogLevel::Info }
fn default_file_output() -> bool { false }
fn default_log_file() -> String { "forward_render.log".to_string() }
fn default_frames() -> u32 { 3 }

impl Default for WindowConfig {
    fn default() -> Self {
        Self {
            width: default_width(),
            height: default_height(),
        }
    }
}

impl Default for GraphicsConfig {
    fn default() -> Self {
        Self {
            vsync: default_vsync(),
            max_cbuffers: default_max_cbuffers(),
            gamma: default_gamma(),
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

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            frames: default_frames(),
        }
    }
}

impl Config {
    /// 从配置文件加载
    ///
    /// # 参数
    ///
    /// * `path` - 配置文件路径
    ///
    /// # 返回值
    ///
    /// 成功返回 `Config` 实例，失败返回错误
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path_str = path.as_ref().to_string_lossy().to_string();

        let contents = std::fs::read_to_string(path)
            .map_err(|_| ConfigError::FileNotFound(path_str.clone()))?;

        Self::from_toml_str(&contents)
    }

    /// 从 TOML 文本解析
    pub fn from_toml_str(contents: &str) -> Result<Self> {
        toml::from_str(contents)
            .map_err(|e| ConfigError::ParseError(e.to_string()).into())
    }

    /// 从配置文件加载，如果文件不存在或无法解析则使用默认配置
    pub fn from_file_or_default<P: AsRef<Path>>(path: P) -> Self {
        Self::from_file(path).unwrap_or_default()
    }

    /// 保存配置到文件
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let contents = toml::to_string_pretty(self)
            .map_err(|e| ConfigError::ParseError(e.to_string()))?;

        std::fs::write(path, contents)?;
        Ok(())
    }

    /// 从命令行参数覆盖配置
    ///
    /// # 说明
    ///
    /// 支持的参数：
    /// - `--width <value>`: 设置窗口宽度
    /// - `--height <value>`: 设置窗口高度
    /// - `--frames <value>`: 设置演示渲染的帧数
    /// - `--no-vsync`: 关闭垂直同步
    ///
    /// 无法解析的值会被忽略。
    pub fn apply_args<I>(&mut self, args: I)
    where
        I: IntoIterator,
        I::Item: AsRef<str>,
    {
        let args: Vec<String> = args.into_iter().map(|s| s.as_ref().to_string()).collect();

        if args.iter().any(|a| a == "--no-vsync") {
            self.graphics.vsync = false;
        }

        if let Some(width) = parse_flag_value(&args, "--width") {
            self.window.width = width;
        }

        if let Some(height) = parse_flag_value(&args, "--height") {
            self.window.height = height;
        }

        if let Some(frames) = parse_flag_value(&args, "--frames") {
            self.run.frames = frames;
        }
    }

    /// 验证配置的有效性
    pub fn validate(&self) -> Result<()> {
        if self.window.width == 0 || self.window.height == 0 {
            return Err(ConfigError::InvalidValue {
                field: "window.width/height".to_string(),
                reason: "Window dimensions must be greater than 0".to_string(),
            }.into());
        }

        if self.graphics.max_cbuffers == 0 || self.graphics.max_cbuffers > MAX_CBUFFER_SLOTS {
            return Err(ConfigError::InvalidValue {
                field: "graphics.max_cbuffers".to_string(),
                reason: format!("Must be in 1..={}", MAX_CBUFFER_SLOTS),
            }.into());
        }

        if !(self.graphics.gamma > 0.0) {
            return Err(ConfigError::InvalidValue {
                field: "graphics.gamma".to_string(),
                reason: "Gamma must be a positive number".to_string(),
            }.into());
        }

        Ok(())
    }

    /// 当前窗口的宽高比
    pub fn aspect_ratio(&self) -> f32 {
        self.window.width as f32 / self.window.height.max(1) as f32
    }
}

fn parse_flag_value<T: std::str::FromStr>(args: &[String], flag: &str) -> Option<T> {
    let idx = args.iter().position(|a| a == flag)?;
    args.get(idx + 1)?.parse().ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.window.width, 1280);
        assert_eq!(config.window.height, 720);
        assert_eq!(config.graphics.max_cbuffers, 1000);
        assert!((config.graphics.gamma - 2.2).abs() < 1e-6);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_validation() {
        let mut config = Config::default();
        config.window.width = 0;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.graphics.max_cbuffers = 0;
        assert!(config.validate().is_err());

        config.graphics.max_cbuffers = MAX_CBUFFER_SLOTS + 1;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.graphics.gamma = 0.0;
        assert!(config.validate().is_err());

        config.graphics.gamma = f32::NAN;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_apply_args() {
        let mut config = Config::default();
        config.apply_args(["forward_render", "--width", "640", "--height", "480", "--frames", "10", "--no-vsync"]);

        assert_eq!(config.window.width, 640);
        assert_eq!(config.window.height, 480);
        assert_eq!(config.run.frames, 10);
        assert!(!config.graphics.vsync);
    }

    #[test]
    fn test_apply_args_ignores_bad_values() {
        let mut config = Config::default();
        config.apply_args(["--width", "wide", "--height"]);

        assert_eq!(config.window.width, 1280);
        assert_eq!(config.window.height, 720);
    }

    #[test]
    fn test_partial_toml_uses_defaults() {
        let config = Config::from_toml_str("[graphics]\nmax_cbuffers = 64\n")
            .expect("partial config should parse");

        assert_eq!(config.graphics.max_cbuffers, 64);
        assert!(config.graphics.vsync);
        assert_eq!(config.window.width, 1280);
        assert_eq!(config.logging.level, LogLevel::Info);
    }

    #[test]
    fn test_save_and_reload() {
        let path = std::env::temp_dir().join(format!("forward_render_config_{}.toml", std::process::id()));
        let mut config = Config::default();
        config.graphics.max_cbuffers = 32;
        config.save_to_file(&path).expect("save config");

        let loaded = Config::from_file(&path).expect("reload config");
        assert_eq!(loaded.graphics.max_cbuffers, 32);

        let _ = std::fs::remove_file(&path);
    }

    #[test]
    fn test_missing_file_falls_back() {
        let config = Config::from_file_or_default("definitely/not/here.toml");
        assert_eq!(config.graphics.max_cbuffers, 1000);
    }
}
