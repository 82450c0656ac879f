//! 错误类型定义
//! Error types for the tracking controller

use std::path::PathBuf;

/// 配置错误 (启动时致命)
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("cannot access config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("cannot parse config file: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("invalid configuration: {0}")]
    Invalid(String),
}

/// 舵机链路错误 (瞬时故障,不致命)
///
/// 由 `ActuatorTransport` 返回,由 `ActuatorLink` 消费:
/// 失败只会把链路标记为不可达,下一帧自然重试。
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LinkError {
    #[error("actuator request timed out")]
    Timeout,

    #[error("actuator connection failed: {0}")]
    Connection(String),

    #[error("actuator returned status {0}")]
    Status(u16),

    #[error("actuator transport error: {0}")]
    Transport(String),
}

/// 检测输入错误
#[derive(Debug, thiserror::Error)]
pub enum SourceError {
    #[error("detection source read failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("malformed detection frame at line {line}: {reason}")]
    Malformed { line: u64, reason: String },
}

/// 告警输出错误
#[derive(Debug, thiserror::Error)]
pub enum AlertError {
    #[error("alert clip not found: {}", .0.display())]
    MissingClip(PathBuf),

    #[error("cannot start alert player: {0}")]
    Spawn(#[from] std::io::Error),
}
