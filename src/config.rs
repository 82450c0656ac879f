//! 跟踪控制器配置 - 通过JSON文件调整参数
//!
//! 所有参数在启动时加载一次并校验,之后以不可变引用的形式
//! 传给各个组件,运行期间不再修改。

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use std::time::Duration;

use crate::error::ConfigError;

/// 跟踪控制器参数配置
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrackerConfig {
    // === 检测参数 ===
    pub confidence_threshold: f32, // 检测置信度阈值
    pub target_class: Option<u32>, // 只跟踪该类别 (None = 上游已过滤)

    // === 画面参数 ===
    pub frame_width: u32,  // 帧宽 (帧本身不带尺寸时使用)
    pub frame_height: u32, // 帧高
    pub dead_zone_px: f32, // 水平死区 (像素)

    // === 舵机参数 ===
    pub actuator_min: i32,           // 最左位置 (度)
    pub actuator_max: i32,           // 最右位置 (度)
    pub actuator_home: i32,          // 归位位置 (度)
    pub max_step_deg: u32,           // 每条指令最大移动角度
    pub position_tolerance_deg: u32, // 归位容差
    pub return_home_delay_secs: f64, // 目标消失后等待多久归位
    pub smooth_return_home: bool,    // 归位时也按 max_step_deg 逐步移动 (默认一步到位)
    pub pan_gain: f32,               // 像素→角度增益符号/倍率 (安装镜像为负)

    // === 网络参数 ===
    pub actuator_url: String,    // 舵机控制器地址, 例如 http://192.168.4.1
    pub command_path: String,    // 位置指令接口
    pub status_path: String,     // 状态探测接口
    pub request_timeout_ms: u64, // 单次请求超时

    // === 告警参数 ===
    pub alert_id: String,           // 告警音频文件
    pub alert_cooldown_secs: f64,   // 两次告警最小间隔
    pub alert_volume: f32,          // 音量 0.0-1.0
    pub alert_player: Vec<String>,  // 外部播放器命令前缀 (空 = 只记录日志)

    // === 日志 ===
    pub report_interval_frames: u64, // 每N帧输出一次状态
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self {
            // 检测
            confidence_threshold: 0.5,
            target_class: None,

            // 画面
            frame_width: 640,
            frame_height: 480,
            dead_zone_px: 50.0,

            // 舵机
            actuator_min: 0,
            actuator_max: 180,
            actuator_home: 90,
            max_step_deg: 2,
            position_tolerance_deg: 2,
            return_home_delay_secs: 3.0,
            smooth_return_home: false,
            pan_gain: -1.0,

            // 网络
            actuator_url: "http://192.168.4.1".to_string(),
            command_path: "/servo".to_string(),
            status_path: "/status".to_string(),
            request_timeout_ms: 1000,

            // 告警
            alert_id: "alert.mp3".to_string(),
            alert_cooldown_secs: 10.0,
            alert_volume: 0.8,
            alert_player: vec![
                "ffplay".to_string(),
                "-nodisp".to_string(),
                "-autoexit".to_string(),
                "-loglevel".to_string(),
                "quiet".to_string(),
            ],

            report_interval_frames: 30,
        }
    }
}

impl TrackerConfig {
    /// 从JSON文件加载配置
    ///
    /// 文件不存在时写出一份默认配置;解析失败或校验失败都是致命错误。
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        if !path.exists() {
            tracing::info!("📝 配置文件不存在,创建默认配置: {}", path.display());
            let config = Self::default();
            config.save(path)?;
            return Ok(config);
        }

        let json = fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&json)?;
        config.validate()?;
        tracing::info!("✅ 配置已从 {} 加载", path.display());
        Ok(config)
    }

    /// 保存配置到JSON文件
    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), ConfigError> {
        let json = serde_json::to_string_pretty(self)?;
        fs::write(path.as_ref(), json)?;
        tracing::info!("💾 配置已保存到 {}", path.as_ref().display());
        Ok(())
    }

    /// 校验配置, 任何违规都拒绝启动
    pub fn validate(&self) -> Result<(), ConfigError> {
        fn invalid(msg: String) -> Result<(), ConfigError> {
            Err(ConfigError::Invalid(msg))
        }

        if !(0.0..=1.0).contains(&self.confidence_threshold) {
            return invalid(format!(
                "confidence_threshold must be within [0, 1], got {}",
                self.confidence_threshold
            ));
        }
        if self.frame_width == 0 || self.frame_height == 0 {
            return invalid(format!(
                "frame size must be non-zero, got {}x{}",
                self.frame_width, self.frame_height
            ));
        }
        if self.actuator_min > self.actuator_max {
            return invalid(format!(
                "actuator_min ({}) is greater than actuator_max ({})",
                self.actuator_min, self.actuator_max
            ));
        }
        if self.actuator_home < self.actuator_min || self.actuator_home > self.actuator_max {
            return invalid(format!(
                "actuator_home ({}) is outside [{}, {}]",
                self.actuator_home, self.actuator_min, self.actuator_max
            ));
        }
        if self.max_step_deg == 0 {
            return invalid("max_step_deg must be at least 1".to_string());
        }
        let travel = i64::from(self.actuator_max) - i64::from(self.actuator_min);
        if i64::from(self.max_step_deg) > travel.max(1) {
            return invalid(format!(
                "max_step_deg ({}) exceeds actuator travel ({}°)",
                self.max_step_deg, travel
            ));
        }
        // 死区覆盖整个半帧时舵机永远不会被驱动
        if !self.dead_zone_px.is_finite()
            || self.dead_zone_px < 0.0
            || self.dead_zone_px >= self.frame_width as f32 / 2.0
        {
            return invalid(format!(
                "dead_zone_px ({}) must be within [0, {})",
                self.dead_zone_px,
                self.frame_width as f32 / 2.0
            ));
        }
        if !self.pan_gain.is_finite() || self.pan_gain == 0.0 {
            return invalid(format!("pan_gain must be finite and non-zero, got {}", self.pan_gain));
        }
        if !self.return_home_delay_secs.is_finite() || self.return_home_delay_secs < 0.0 {
            return invalid(format!(
                "return_home_delay_secs must be >= 0, got {}",
                self.return_home_delay_secs
            ));
        }
        if !self.alert_cooldown_secs.is_finite() || self.alert_cooldown_secs < 0.0 {
            return invalid(format!(
                "alert_cooldown_secs must be >= 0, got {}",
                self.alert_cooldown_secs
            ));
        }
        if !(0.0..=1.0).contains(&self.alert_volume) {
            return invalid(format!("alert_volume must be within [0, 1], got {}", self.alert_volume));
        }
        if self.request_timeout_ms == 0 {
            return invalid("request_timeout_ms must be non-zero".to_string());
        }
        if self.report_interval_frames == 0 {
            return invalid("report_interval_frames must be non-zero".to_string());
        }
        if self.actuator_url.trim().is_empty() {
            return invalid("actuator_url must not be empty".to_string());
        }
        if self.alert_id.trim().is_empty() {
            return invalid("alert_id must not be empty".to_string());
        }
        Ok(())
    }

    pub fn return_home_delay(&self) -> Duration {
        Duration::from_secs_f64(self.return_home_delay_secs)
    }

    pub fn alert_cooldown(&self) -> Duration {
        Duration::from_secs_f64(self.alert_cooldown_secs)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }

    /// 位置指令完整URL
    pub fn command_url(&self) -> String {
        format!("{}{}", self.actuator_url.trim_end_matches('/'), self.command_path)
    }

    /// 状态探测完整URL
    pub fn status_url(&self) -> String {
        format!("{}{}", self.actuator_url.trim_end_matches('/'), self.status_path)
    }

    /// 打印当前配置
    pub fn print_summary(&self) {
        tracing::info!("🎛️  当前跟踪配置:");
        tracing::info!("  检测置信度: {:.2}", self.confidence_threshold);
        tracing::info!(
            "  舵机范围: {}° - {}° (归位 {}°), 每步最大 {}°",
            self.actuator_min,
            self.actuator_max,
            self.actuator_home,
            self.max_step_deg
        );
        tracing::info!("  死区: ±{:.0}px, 增益系数 {:.2}", self.dead_zone_px, self.pan_gain);
        tracing::info!("  归位延迟: {:.1}s", self.return_home_delay_secs);
        tracing::info!("  舵机地址: {}", self.command_url());
        tracing::info!(
            "  告警: {} (冷却 {:.0}s)",
            self.alert_id,
            self.alert_cooldown_secs
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_default_is_valid() {
        let config = TrackerConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.actuator_home, 90);
        assert_eq!(config.command_url(), "http://192.168.4.1/servo");
    }

    #[test]
    fn test_min_greater_than_max_rejected() {
        let config = TrackerConfig {
            actuator_min: 100,
            actuator_max: 10,
            actuator_home: 50,
            ..Default::default()
        };
        assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn test_dead_zone_covering_frame_rejected() {
        let config = TrackerConfig {
            dead_zone_px: 320.0,
            ..Default::default()
        };
        assert!(config.validate().is_err());

        let config = TrackerConfig {
            dead_zone_px: 319.0,
            ..Default::default()
        };
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_home_outside_range_rejected() {
        let config = TrackerConfig {
            actuator_home: 200,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_zero_gain_and_step_rejected() {
        let config = TrackerConfig {
            pan_gain: 0.0,
            ..Default::default()
        };
        assert!(config.validate().is_err());

        let config = TrackerConfig {
            max_step_deg: 0,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_step_larger_than_travel_rejected() {
        let config = TrackerConfig {
            max_step_deg: 3_000_000_000,
            ..Default::default()
        };
        assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));

        let config = TrackerConfig {
            max_step_deg: 181,
            ..Default::default()
        };
        assert!(config.validate().is_err());

        // 一步走完全程是允许的
        let config = TrackerConfig {
            max_step_deg: 180,
            ..Default::default()
        };
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_empty_alert_clip_rejected() {
        let config = TrackerConfig {
            alert_id: "  ".to_string(),
            ..Default::default()
        };
        assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let config: TrackerConfig =
            serde_json::from_str(r#"{"actuator_url": "http://10.0.0.7/", "max_step_deg": 5}"#)
                .unwrap();
        assert_eq!(config.max_step_deg, 5);
        assert_eq!(config.command_url(), "http://10.0.0.7/servo");
        assert_eq!(config.confidence_threshold, 0.5);
    }

    #[test]
    fn test_load_creates_default_file() {
        let path = std::env::temp_dir().join(format!(
            "yolo-servo-config-{}.json",
            std::process::id()
        ));
        let _ = fs::remove_file(&path);

        let config = TrackerConfig::load(&path).unwrap();
        assert_eq!(config, TrackerConfig::default());
        assert!(path.exists());

        let reloaded = TrackerConfig::load(&path).unwrap();
        assert_eq!(reloaded, config);
        let _ = fs::remove_file(&path);
    }

    #[test]
    fn test_load_rejects_invalid_values() {
        let path = std::env::temp_dir().join(format!(
            "yolo-servo-invalid-{}.json",
            std::process::id()
        ));
        fs::write(&path, r#"{"confidence_threshold": 1.5}"#).unwrap();
        assert!(matches!(
            TrackerConfig::load(&path),
            Err(ConfigError::Invalid(_))
        ));
        fs::write(&path, "{ not json").unwrap();
        assert!(matches!(TrackerConfig::load(&path), Err(ConfigError::Parse(_))));
        let _ = fs::remove_file(&path);
    }
}
