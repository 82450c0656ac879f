/// 控制流水线 (Control Pipeline)
///
/// 单线程逐帧执行, 帧内严格顺序:
/// 检测输入 → 目标选择 → (取消归位 → 规划 → 步进发送) 或 (归位计时) → 告警 → 状态输出
///
/// 操作指令 (手动归位/强制告警/退出) 通过 crossbeam 通道传入, 每帧非阻塞检查一次。
pub mod frame_loop;

pub use frame_loop::FrameLoop;

use serde::Serialize;

use crate::detection::Detection;
use crate::servo::{LinkPhase, LinkStats, PlanResult};

// ========== 通道消息定义 ==========

/// 操作指令 (操作线程 → 控制循环)
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ControlCommand {
    /// 立即归位, 跳过步长限制和归位延迟
    ResetHome,
    /// 跳过冷却强制告警
    ForceAlert,
    Shutdown,
}

impl ControlCommand {
    /// 终端按键 → 指令 (r / a / q)
    pub fn from_key(input: &str) -> Option<Self> {
        match input.trim().to_ascii_lowercase().as_str() {
            "r" | "reset" => Some(Self::ResetHome),
            "a" | "alert" => Some(Self::ForceAlert),
            "q" | "quit" => Some(Self::Shutdown),
            _ => None,
        }
    }
}

/// 被跟踪目标的摘要
#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct TargetInfo {
    pub center: (f32, f32),
    pub area: f32,
    pub confidence: f32,
}

impl From<&Detection> for TargetInfo {
    fn from(detection: &Detection) -> Self {
        Self {
            center: detection.center(),
            area: detection.area(),
            confidence: detection.confidence,
        }
    }
}

/// 单帧观测记录
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct FrameReport {
    pub frame_index: u64,
    pub targets: usize,
    pub target: Option<TargetInfo>,
    pub plan: Option<PlanResult>,
    /// 本帧成功发送的角度
    pub command: Option<i32>,
    /// 本帧发送失败的原因
    pub command_error: Option<String>,
    pub position: i32,
    pub reachable: bool,
    pub phase: LinkPhase,
    /// 距离归位还需等待的秒数
    pub return_wait_secs: Option<f64>,
    pub notified: bool,
    pub alert_active: bool,
}

/// 运行统计
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct RunSummary {
    pub frames: u64,
    pub source_errors: u64,
    pub alerts: u64,
    pub link: LinkStats,
}
