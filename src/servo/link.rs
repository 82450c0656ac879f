//! 舵机链路 (Actuator Link)
//!
//! 唯一跨帧的可变状态: 当前角度、归位计时、可达性。
//!
//! ```text
//!            有目标                 无目标(首帧)         等待 >= 归位延迟
//! AtRest ─────────────▶ Tracking ─────────────▶ (计时) ─────────────────▶ ReturningHome
//!    ▲                    ▲  │                                                  │
//!    │                    │  └──────── 有目标: 取消计时 ◀────────────────────────┤
//!    └────────────────────┴──────────── 进入归位容差: 清除计时 ◀─────────────────┘
//! ```
//!
//! 约束:
//! - `min <= current_position <= max`
//! - `current_position` 只在发送成功后改变, 发送失败只记录为不可达
//! - 可达性变化只在跳变时记录一次

use std::time::{Duration, Instant};

use serde::Serialize;

use super::transport::{ActuatorTransport, DeviceStatus};
use crate::config::TrackerConfig;
use crate::error::LinkError;

/// 链路阶段
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LinkPhase {
    AtRest,
    Tracking,
    ReturningHome,
}

/// 可达性 (与阶段正交)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Reachability {
    Unknown,
    Reachable,
    Unreachable,
}

/// 舵机状态, 只能通过 `ActuatorLink` 修改
#[derive(Debug, Clone)]
pub struct ActuatorState {
    current_position: i32,
    home_position: i32,
    target_position: i32,
    reachability: Reachability,
    no_target_since: Option<Instant>,
    phase: LinkPhase,
}

impl ActuatorState {
    fn at_home(home: i32) -> Self {
        Self {
            current_position: home,
            home_position: home,
            target_position: home,
            reachability: Reachability::Unknown,
            no_target_since: None,
            phase: LinkPhase::AtRest,
        }
    }

    pub fn current_position(&self) -> i32 {
        self.current_position
    }

    pub fn home_position(&self) -> i32 {
        self.home_position
    }

    pub fn target_position(&self) -> i32 {
        self.target_position
    }

    pub fn reachability(&self) -> Reachability {
        self.reachability
    }

    pub fn is_reachable(&self) -> bool {
        self.reachability == Reachability::Reachable
    }

    pub fn no_target_since(&self) -> Option<Instant> {
        self.no_target_since
    }

    pub fn phase(&self) -> LinkPhase {
        self.phase
    }
}

/// 链路参数
#[derive(Debug, Clone)]
pub struct LinkSettings {
    pub min: i32,
    pub max: i32,
    pub home: i32,
    pub max_step: u32,
    pub tolerance: u32,
    pub return_home_delay: Duration,
    /// 归位是否受步长限制 (false: 直接发送归位角度)
    pub smooth_return: bool,
}

impl LinkSettings {
    pub fn from_config(config: &TrackerConfig) -> Self {
        Self {
            min: config.actuator_min,
            max: config.actuator_max,
            home: config.actuator_home,
            max_step: config.max_step_deg,
            tolerance: config.position_tolerance_deg,
            return_home_delay: config.return_home_delay(),
            smooth_return: config.smooth_return_home,
        }
    }
}

/// 链路统计
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct LinkStats {
    pub commands_sent: u64,
    pub commands_failed: u64,
    pub reachability_changes: u64,
    pub last_command: Option<i32>,
}

/// 无目标帧的归位判定结果
#[derive(Debug, Clone, PartialEq)]
pub enum ReturnHome {
    /// 本帧开始计时, 不动
    Armed,
    /// 仍在等待
    Waiting { remaining: Duration },
    /// 已发送归位指令 (或平滑归位的一步)
    Returning { command: Result<i32, LinkError> },
    /// 已在归位容差内, 不再发送
    AtRest,
}

impl ReturnHome {
    pub fn sent_command(&self) -> bool {
        matches!(self, Self::Returning { .. })
    }
}

pub struct ActuatorLink<T> {
    transport: T,
    settings: LinkSettings,
    state: ActuatorState,
    stats: LinkStats,
}

impl<T: ActuatorTransport> ActuatorLink<T> {
    /// 创建链路, 假定舵机从归位位置启动
    pub fn new(transport: T, settings: LinkSettings) -> Self {
        let state = ActuatorState::at_home(settings.home);
        Self {
            transport,
            settings,
            state,
            stats: LinkStats::default(),
        }
    }

    pub fn state(&self) -> &ActuatorState {
        &self.state
    }

    pub fn stats(&self) -> &LinkStats {
        &self.stats
    }

    pub fn settings(&self) -> &LinkSettings {
        &self.settings
    }

    pub fn position(&self) -> i32 {
        self.state.current_position
    }

    pub fn is_reachable(&self) -> bool {
        self.state.is_reachable()
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn transport_mut(&mut self) -> &mut T {
        &mut self.transport
    }

    /// 启动时的只读探测, 只影响可达性
    pub fn probe(&mut self) -> Result<DeviceStatus, LinkError> {
        let result = self.transport.probe();
        self.record_reachability(result.as_ref().err());
        result
    }

    /// 目标重新出现: 取消归位计时
    pub fn cancel_return_home(&mut self) {
        self.state.no_target_since = None;
        self.state.phase = LinkPhase::Tracking;
    }

    /// 朝目标角度移动一步 (步长受 max_step 限制)
    pub fn track(&mut self, target: i32) -> Result<i32, LinkError> {
        let target = self.clamp(target);
        self.state.target_position = target;
        self.state.phase = LinkPhase::Tracking;
        let next = self.next_step(target);
        self.send(next)
    }

    /// 无目标帧调用
    pub fn evaluate_return_home(&mut self, now: Instant) -> ReturnHome {
        let home = self.settings.home;
        let within_tolerance = self.within_tolerance();

        let since = match self.state.no_target_since {
            Some(since) => since,
            None => {
                // 已经静止在归位位置: 不再计时
                if self.state.phase == LinkPhase::AtRest && within_tolerance {
                    return ReturnHome::AtRest;
                }
                self.state.no_target_since = Some(now);
                return ReturnHome::Armed;
            }
        };

        let elapsed = now.saturating_duration_since(since);
        if elapsed < self.settings.return_home_delay {
            return ReturnHome::Waiting {
                remaining: self.settings.return_home_delay - elapsed,
            };
        }

        if within_tolerance {
            self.state.no_target_since = None;
            self.state.phase = LinkPhase::AtRest;
            return ReturnHome::AtRest;
        }

        self.state.phase = LinkPhase::ReturningHome;
        self.state.target_position = home;
        let next = if self.settings.smooth_return {
            self.next_step(home)
        } else {
            home
        };
        ReturnHome::Returning {
            command: self.send(next),
        }
    }

    /// 手动归位: 跳过步长限制和归位延迟
    pub fn reset_to_home(&mut self) -> Result<i32, LinkError> {
        let home = self.settings.home;
        self.state.no_target_since = None;
        self.state.target_position = home;

        let result = self.send(home);
        if result.is_ok() {
            self.state.phase = LinkPhase::AtRest;
        }
        result
    }

    /// 距离归位位置还剩多少等待时间 (未计时返回 None)
    pub fn remaining_wait(&self, now: Instant) -> Option<Duration> {
        self.state.no_target_since.map(|since| {
            self.settings
                .return_home_delay
                .saturating_sub(now.saturating_duration_since(since))
        })
    }

    /// 下一步要发送的角度
    pub fn next_step(&self, target: i32) -> i32 {
        let current = self.state.current_position;
        let diff = target - current;
        let step = i32::try_from(self.settings.max_step).unwrap_or(i32::MAX);
        if diff.abs() <= step {
            target
        } else {
            current + step * diff.signum()
        }
    }

    fn within_tolerance(&self) -> bool {
        (self.state.current_position - self.settings.home).unsigned_abs() <= self.settings.tolerance
    }

    fn clamp(&self, position: i32) -> i32 {
        position.clamp(self.settings.min, self.settings.max)
    }

    /// 唯一修改 current_position 的地方
    fn send(&mut self, position: i32) -> Result<i32, LinkError> {
        let position = self.clamp(position);
        let result = self.transport.send_position(position);
        self.record_reachability(result.as_ref().err());

        match result {
            Ok(()) => {
                self.state.current_position = position;
                self.stats.commands_sent += 1;
                self.stats.last_command = Some(position);
                tracing::debug!(position, "servo command delivered");
                Ok(position)
            }
            Err(e) => {
                self.stats.commands_failed += 1;
                tracing::debug!(position, error = %e, "servo command failed");
                Err(e)
            }
        }
    }

    fn record_reachability(&mut self, error: Option<&LinkError>) {
        let next = if error.is_none() {
            Reachability::Reachable
        } else {
            Reachability::Unreachable
        };
        let previous = self.state.reachability;
        if previous == next {
            return;
        }

        self.state.reachability = next;
        self.stats.reachability_changes += 1;
        match (previous, error) {
            (_, Some(e)) => tracing::warn!("⚠️  舵机控制器不可达: {}", e),
            (Reachability::Unreachable, None) => tracing::info!("✅ 舵机控制器恢复连接"),
            (_, None) => tracing::info!("✅ 舵机控制器已连接"),
        }
    }
}
