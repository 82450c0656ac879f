/// 舵机控制系统 (Servo Control System)
///
/// - Planner:   画面偏移 → 目标角度 (纯计算)
/// - Link:      步长限制、归位计时、可达性 (唯一的跨帧状态)
/// - Transport: 与 ESP32 舵机控制器的 HTTP 往返
pub mod link;
pub mod planner;
pub mod transport;

pub use link::{
    ActuatorLink, ActuatorState, LinkPhase, LinkSettings, LinkStats, Reachability, ReturnHome,
};
pub use planner::{PanDirection, PlanResult, PositionPlanner};
pub use transport::{ActuatorTransport, DeviceStatus, HttpTransport};
