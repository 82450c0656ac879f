// Ultralytics 🚀 AGPL-3.0 License - https://ultralytics.com/license
pub mod alert; // 声音告警系统
pub mod config; // 跟踪控制器配置
pub mod detection; // 检测输入与目标选择
pub mod error; // 错误类型
pub mod pipeline; // 逐帧控制循环
pub mod servo; // 舵机规划与链路

pub use crate::config::TrackerConfig;
pub use crate::detection::{Detection, FrameDetections, FrameSize, TargetSelector};
pub use crate::error::{AlertError, ConfigError, LinkError, SourceError};
pub use crate::pipeline::{ControlCommand, FrameLoop, FrameReport};
pub use crate::servo::{ActuatorLink, ActuatorTransport, HttpTransport, PositionPlanner};
