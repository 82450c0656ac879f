//! 位置规划器 (Position Planner)
//!
//! 目标在画面中的水平偏移 → 舵机目标角度。纯函数, 不访问网络和状态。
//!
//! ```text
//! offset_x = cx - frame_cx
//! |offset_x| <= dead_zone  → 居中, 不动
//! 否则 adjustment = offset_x * (max - min) / frame_width * pan_gain
//!      target     = clamp(current + adjustment, min, max)
//! ```

use serde::Serialize;

use crate::config::TrackerConfig;
use crate::detection::FrameSize;

/// 调整方向 (按 adjustment 符号)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum PanDirection {
    Left,
    Right,
    Centered,
}

impl PanDirection {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Left => "left",
            Self::Right => "right",
            Self::Centered => "centered",
        }
    }
}

/// 规划结果
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct PlanResult {
    pub target_position: i32,
    pub needs_adjustment: bool,
    pub direction: PanDirection,
    pub offset_x: f32,
    /// 垂直偏移仅用于观测, 单轴系统不据此驱动
    pub offset_y: f32,
    pub adjustment: f32,
}

#[derive(Debug, Clone)]
pub struct PositionPlanner {
    dead_zone_px: f32,
    actuator_min: i32,
    actuator_max: i32,
    pan_gain: f32,
}

impl PositionPlanner {
    pub fn new(dead_zone_px: f32, actuator_min: i32, actuator_max: i32, pan_gain: f32) -> Self {
        Self {
            dead_zone_px,
            actuator_min,
            actuator_max,
            pan_gain,
        }
    }

    pub fn from_config(config: &TrackerConfig) -> Self {
        Self::new(
            config.dead_zone_px,
            config.actuator_min,
            config.actuator_max,
            config.pan_gain,
        )
    }

    /// 每像素对应的角度
    pub fn degrees_per_pixel(&self, frame: FrameSize) -> f32 {
        (self.actuator_max - self.actuator_min) as f32 / frame.width.max(1) as f32
    }

    pub fn plan(&self, target_center: (f32, f32), current_position: i32, frame: FrameSize) -> PlanResult {
        let (cx, cy) = target_center;
        let (frame_cx, frame_cy) = frame.center();
        let offset_x = cx - frame_cx;
        let offset_y = cy - frame_cy;

        if offset_x.abs() <= self.dead_zone_px {
            return PlanResult {
                target_position: current_position,
                needs_adjustment: false,
                direction: PanDirection::Centered,
                offset_x,
                offset_y,
                adjustment: 0.0,
            };
        }

        let adjustment = offset_x * self.degrees_per_pixel(frame) * self.pan_gain;
        let target = (current_position as f32 + adjustment)
            .clamp(self.actuator_min as f32, self.actuator_max as f32);

        let direction = if adjustment > 0.0 {
            PanDirection::Right
        } else if adjustment < 0.0 {
            PanDirection::Left
        } else {
            PanDirection::Centered
        };

        PlanResult {
            target_position: target as i32,
            needs_adjustment: true,
            direction,
            offset_x,
            offset_y,
            adjustment,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const FRAME: FrameSize = FrameSize {
        width: 640,
        height: 480,
    };

    fn planner() -> PositionPlanner {
        PositionPlanner::new(50.0, 0, 180, -1.0)
    }

    #[test]
    fn test_target_right_of_center_moves_left() {
        // offset +80 > dead zone 50, 镜像安装 → 负方向
        let plan = planner().plan((400.0, 240.0), 90, FRAME);
        assert!(plan.needs_adjustment);
        assert_eq!(plan.direction, PanDirection::Left);
        assert_eq!(plan.offset_x, 80.0);
        assert!((plan.adjustment - (-22.5)).abs() < 1e-4);
        assert_eq!(plan.target_position, 67);
    }

    #[test]
    fn test_positive_gain_flips_direction() {
        let planner = PositionPlanner::new(50.0, 0, 180, 1.0);
        let plan = planner.plan((400.0, 240.0), 90, FRAME);
        assert_eq!(plan.direction, PanDirection::Right);
        assert_eq!(plan.target_position, 112);
    }

    #[test]
    fn test_dead_zone_holds_position() {
        let planner = planner();
        for cx in [270.0, 300.0, 320.0, 345.5, 370.0] {
            let plan = planner.plan((cx, 10.0), 123, FRAME);
            assert!(!plan.needs_adjustment, "cx={}", cx);
            assert_eq!(plan.target_position, 123);
            assert_eq!(plan.direction, PanDirection::Centered);
        }
    }

    #[test]
    fn test_vertical_offset_is_reported_only() {
        let plan = planner().plan((320.0, 0.0), 90, FRAME);
        assert_eq!(plan.offset_y, -240.0);
        assert!(!plan.needs_adjustment);
    }

    #[test]
    fn test_output_clamped_for_extreme_offsets() {
        let planner = planner();
        for cx in [-1.0e6, -5000.0, 0.0, 639.0, 5000.0, 1.0e6] {
            for current in [0, 45, 90, 180] {
                let plan = planner.plan((cx, 240.0), current, FRAME);
                assert!(
                    (0..=180).contains(&plan.target_position),
                    "cx={} current={} target={}",
                    cx,
                    current,
                    plan.target_position
                );
            }
        }
    }
}
