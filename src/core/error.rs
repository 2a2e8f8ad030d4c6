//! 错误处理模块
//!
//! 定义了引擎中使用的统一错误类型。
//!
//! # 设计原则
//!
//! - 为每种错误类型提供清晰的上下文信息
//! - 支持错误链（error source）
//! - 易于模式匹配和错误处理
//! - 程序误用（越界索引、移除不存在的子节点）同样以错误返回，不做静默容忍

use std::fmt;
use std::path::PathBuf;

/// 引擎统一的 Result 类型
///
/// 所有可能返回错误的函数都应该使用这个类型。
pub type Result<T> = std::result::Result<T, RenderError>;

/// 渲染核心的错误类型
#[derive(Debug)]
pub enum RenderError {
    /// 配置错误
    Config(ConfigError),

    /// 图形 API 错误
    Graphics(GraphicsError),

    /// 网格加载错误
    MeshLoading(MeshLoadError),

    /// Transform 层级误用
    Hierarchy(HierarchyError),

    /// 材质错误
    Material(MaterialError),

    /// IO 错误
    Io(std::io::Error),

    /// 初始化错误
    Initialization(String),

    /// 运行时错误
    Runtime(String),
}

/// 配置相关的错误
#[derive(Debug)]
pub enum ConfigError {
    /// 配置文件未找到
    FileNotFound(String),

    /// 配置文件解析失败
    ParseError(String),

    /// 配置值无效
    InvalidValue { field: String, reason: String },
}

/// 图形 API 相关的错误
#[derive(Debug)]
pub enum GraphicsError {
    /// 设备创建失败
    DeviceCreation(String),

    /// 资源创建失败
    ResourceCreation(String),

    /// 渲染命令执行失败
    CommandExecution(String),

    /// 单次常量缓冲区预留超过环形缓冲区容量
    ReservationTooLarge { size: u64, capacity: u64 },

    /// 常量缓冲区数据为空
    EmptyReservation,

    /// 写入超出上传堆范围
    UploadOutOfBounds { offset: u64, len: u64, capacity: u64 },

    /// 描述符槽位超出描述符堆容量
    DescriptorOutOfRange { slot: u32, capacity: u32 },
}

/// 网格加载相关的错误
#[derive(Debug)]
pub enum MeshLoadError {
    /// 文件不存在或无法读取
    FileNotFound(PathBuf),

    /// 不支持的文件格式
    UnsupportedFormat(String),

    /// 解析失败
    ParseError(String),

    /// 数据验证失败
    ValidationError(String),

    /// 几何数据无效
    InvalidGeometry(String),
}

/// Transform 层级相关的错误
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HierarchyError {
    /// 句柄指向的节点已被销毁
    StaleHandle,

    /// 子节点索引越界
    ChildIndexOutOfRange { index: usize, count: usize },

    /// 要移除的节点不是该父节点的子节点
    ChildNotFound,

    /// 设置父节点会形成环
    CycleDetected,
}

/// 材质相关的错误
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MaterialError {
    /// 纹理索引表已满
    TextureTableFull { capacity: usize },
}

impl fmt::Display for RenderError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RenderError::Config(e) => write!(f, "Configuration error: {}", e),
            RenderError::Graphics(e) => write!(f, "Graphics error: {}", e),
            RenderError::MeshLoading(e) => write!(f, "Mesh loading error: {}", e),
            RenderError::Hierarchy(e) => write!(f, "Transform hierarchy error: {}", e),
            RenderError::Material(e) => write!(f, "Material error: {}", e),
            RenderError::Io(e) => write!(f, "IO error: {}", e),
            RenderError::Initialization(msg) => write!(f, "Initialization error: {}", msg),
            RenderError::Runtime(msg) => write!(f, "Runtime error: {}", msg),
        }
    }
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::FileNotFound(path) => write!(f, "Config file not found: {}", path),
            ConfigError::ParseError(msg) => write!(f, "Failed to parse config: {}", msg),
            ConfigError::InvalidValue { field, reason } => {
                write!(f, "Invalid value for '{}': {}", field, reason)
            }
        }
    }
}

impl fmt::Display for GraphicsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GraphicsError::DeviceCreation(msg) => write!(f, "Device creation failed: {}", msg),
            GraphicsError::ResourceCreation(msg) => write!(f, "Resource creation failed: {}", msg),
            GraphicsError::CommandExecution(msg) => write!(f, "Command execution failed: {}", msg),
            GraphicsError::ReservationTooLarge { size, capacity } => write!(
                f,
                "Constant buffer reservation of {} bytes does not fit a ring of {} bytes",
                size, capacity
            ),
            GraphicsError::EmptyReservation => {
                write!(f, "Constant buffer data is empty, nothing to reserve")
            }
            GraphicsError::UploadOutOfBounds { offset, len, capacity } => write!(
                f,
                "Upload write [{}, {}) is outside a heap of {} bytes",
                offset,
                offset + len,
                capacity
            ),
            GraphicsError::DescriptorOutOfRange { slot, capacity } => write!(
                f,
                "Descriptor slot {} is outside a heap of {} descriptors",
                slot, capacity
            ),
        }
    }
}

impl fmt::Display for MeshLoadError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MeshLoadError::FileNotFound(path) => write!(f, "Mesh file not found: {}", path.display()),
            MeshLoadError::UnsupportedFormat(msg) => write!(f, "Unsupported mesh format: {}", msg),
            MeshLoadError::ParseError(msg) => write!(f, "Failed to parse mesh: {}", msg),
            MeshLoadError::ValidationError(msg) => write!(f, "Mesh validation failed: {}", msg),
            MeshLoadError::InvalidGeometry(msg) => write!(f, "Invalid geometry data: {}", msg),
        }
    }
}

impl fmt::Display for HierarchyError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HierarchyError::StaleHandle => write!(f, "Transform handle refers to a destroyed node"),
            HierarchyError::ChildIndexOutOfRange { index, count } => {
                write!(f, "Child index {} out of range (node has {} children)", index, count)
            }
            HierarchyError::ChildNotFound => write!(f, "Node is not a child of the given parent"),
            HierarchyError::CycleDetected => write!(f, "Parenting would create a cycle"),
        }
    }
}

impl fmt::Display for MaterialError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MaterialError::TextureTableFull { capacity } => {
                write!(f, "Material texture table is full ({} entries)", capacity)
            }
        }
    }
}

impl std::error::Error for RenderError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            RenderError::Io(e) => Some(e),
            RenderError::Config(e) => Some(e),
            RenderError::Graphics(e) => Some(e),
            RenderError::MeshLoading(e) => Some(e),
            RenderError::Hierarchy(e) => Some(e),
            RenderError::Material(e) => Some(e),
            _ => None,
        }
    }
}

impl std::error::Error for ConfigError {}
impl std::error::Error for GraphicsError {}
impl std::error::Error for MeshLoadError {}
impl std::error::Error for HierarchyError {}
impl std::error::Error for MaterialError {}

// 实现 From trait 以便于错误转换
impl From<std::io::Error> for RenderError {
    fn from(err: std::io::Error) -> Self {
        RenderError::Io(err)
    }
}

impl From<ConfigError> for RenderError {
    fn from(err: ConfigError) -> Self {
        RenderError::Config(err)
    }
}

impl From<GraphicsError> for RenderError {
    fn from(err: GraphicsError) -> Self {
        RenderError::Graphics(err)
    }
}

impl From<MeshLoadError> for RenderError {
    fn from(err: MeshLoadError) -> Self {
        RenderError::MeshLoading(err)
    }
}

impl From<HierarchyError> for RenderError {
    fn from(err: HierarchyError) -> Self {
        RenderError::Hierarchy(err)
    }
}

impl From<MaterialError> for RenderError {
    fn from(err: MaterialError) -> Self {
        RenderError::Material(err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error;

    #[test]
    fn test_hierarchy_error_display() {
        let err: RenderError = HierarchyError::ChildIndexOutOfRange { index: 3, count: 2 }.into();
        let msg = err.to_string();
        assert!(msg.contains("Child index 3"));
        assert!(msg.contains("2 children"));
    }

    #[test]
    fn test_error_source_chain() {
        let err: RenderError = GraphicsError::ReservationTooLarge { size: 512, capacity: 256 }.into();
        assert!(err.source().is_some());

        let err = RenderError::Runtime("boom".to_string());
        assert!(err.source().is_none());
    }

    #[test]
    fn test_io_error_conversion() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "missing");
        let err: RenderError = io.into();
        assert!(matches!(err, RenderError::Io(_)));
    }
}
