/// 声音告警系统 (Audio Alert System)
///
/// - Notifier: 冷却门, 决定是否触发
/// - Sink:     外部播放器, 触发后立即返回
pub mod notifier;
pub mod sink;

pub use notifier::Notifier;
pub use sink::{AlertSink, CommandSink, LogSink};
