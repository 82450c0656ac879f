//! 告警冷却门 (Notifier)
//!
//! 只决定"是否触发", 真正的播放交给 `AlertSink`。
//! 与舵机状态完全独立: 冷却不会阻塞舵机, 舵机也不会阻塞告警。

use std::time::{Duration, Instant};

#[derive(Debug, Clone)]
pub struct Notifier {
    cooldown: Duration,
    last_fired_at: Option<Instant>,
    fire_count: u64,
}

impl Notifier {
    pub fn new(cooldown: Duration) -> Self {
        Self {
            cooldown,
            last_fired_at: None,
            fire_count: 0,
        }
    }

    pub fn cooldown(&self) -> Duration {
        self.cooldown
    }

    pub fn last_fired_at(&self) -> Option<Instant> {
        self.last_fired_at
    }

    pub fn fire_count(&self) -> u64 {
        self.fire_count
    }

    /// 目标在场且冷却结束时返回 true 并记录触发时间
    pub fn consider(&mut self, target_present: bool, now: Instant) -> bool {
        if !target_present {
            return false;
        }
        if self.remaining_cooldown(now).is_some() {
            return false;
        }
        self.fire(now);
        true
    }

    /// 跳过冷却强制触发, 同样更新触发时间
    pub fn force(&mut self, now: Instant) -> bool {
        self.fire(now);
        true
    }

    /// 冷却剩余时间, None 表示可以触发
    pub fn remaining_cooldown(&self, now: Instant) -> Option<Duration> {
        let last = self.last_fired_at?;
        // 时间倒退时按 0 处理, 冷却保持生效
        let elapsed = now.saturating_duration_since(last);
        if elapsed >= self.cooldown {
            None
        } else {
            Some(self.cooldown - elapsed)
        }
    }

    fn fire(&mut self, now: Instant) {
        // 触发时间只前进
        self.last_fired_at = Some(match self.last_fired_at {
            Some(last) if last > now => last,
            _ => now,
        });
        self.fire_count += 1;
    }
}
