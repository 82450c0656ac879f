//! 告警输出 (Notification Sink)
//!
//! 播放由外部播放器进程完成 (默认 ffplay), 这里只负责启动它:
//! 启动后立即返回, `is_active` 用 `try_wait` 非阻塞查询是否还在播放。

use std::path::Path;
use std::process::{Child, Command, Stdio};

use crate::config::TrackerConfig;
use crate::error::AlertError;

/// 告警输出接口
pub trait AlertSink {
    /// 立即播放, 不等待播放结束
    fn play(&mut self, alert_id: &str) -> Result<(), AlertError>;

    /// 是否仍在播放 (非阻塞)
    fn is_active(&mut self) -> bool;

    /// 停止当前播放
    fn stop(&mut self);
}

impl<S: AlertSink + ?Sized> AlertSink for Box<S> {
    fn play(&mut self, alert_id: &str) -> Result<(), AlertError> {
        (**self).play(alert_id)
    }

    fn is_active(&mut self) -> bool {
        (**self).is_active()
    }

    fn stop(&mut self) {
        (**self).stop()
    }
}

/// 按配置创建告警输出: 未配置播放器时只记录日志
pub fn from_config(config: &TrackerConfig) -> Box<dyn AlertSink + Send> {
    match config.alert_player.split_first() {
        Some((program, args)) => Box::new(CommandSink::new(
            program.clone(),
            args.to_vec(),
            config.alert_volume,
        )),
        None => Box::new(LogSink::default()),
    }
}

/// 只记录日志的告警输出
#[derive(Debug, Default)]
pub struct LogSink {
    played: u64,
}

impl LogSink {
    pub fn played(&self) -> u64 {
        self.played
    }
}

impl AlertSink for LogSink {
    fn play(&mut self, alert_id: &str) -> Result<(), AlertError> {
        self.played += 1;
        tracing::info!(
            "[{}] 🔊 告警: {}",
            chrono::Local::now().format("%H:%M:%S"),
            alert_id
        );
        Ok(())
    }

    fn is_active(&mut self) -> bool {
        false
    }

    fn stop(&mut self) {}
}

/// 外部播放器进程
///
/// 参数中的 `{volume}` 会被替换为 0-100 的音量, 音频文件路径追加在最后。
pub struct CommandSink {
    program: String,
    args: Vec<String>,
    volume: f32,
    child: Option<Child>,
}

impl CommandSink {
    pub fn new(program: impl Into<String>, args: Vec<String>, volume: f32) -> Self {
        Self {
            program: program.into(),
            args,
            volume,
            child: None,
        }
    }

    fn build_command(&self, clip: &str) -> Command {
        let volume = format!("{}", (self.volume.clamp(0.0, 1.0) * 100.0).round() as u32);
        let mut command = Command::new(&self.program);
        command
            .args(self.args.iter().map(|arg| arg.replace("{volume}", &volume)))
            .arg(clip)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null());
        command
    }
}

impl AlertSink for CommandSink {
    fn play(&mut self, alert_id: &str) -> Result<(), AlertError> {
        if !Path::new(alert_id).exists() {
            return Err(AlertError::MissingClip(alert_id.into()));
        }

        // 新告警打断旧告警
        self.stop();

        let child = self.build_command(alert_id).spawn()?;
        self.child = Some(child);
        tracing::info!(
            "[{}] 🔊 播放告警: {}",
            chrono::Local::now().format("%H:%M:%S"),
            Path::new(alert_id)
                .file_name()
                .map(|name| name.to_string_lossy().into_owned())
                .unwrap_or_else(|| alert_id.to_string())
        );
        Ok(())
    }

    fn is_active(&mut self) -> bool {
        let Some(child) = self.child.as_mut() else {
            return false;
        };
        match child.try_wait() {
            Ok(None) => true,
            Ok(Some(_)) | Err(_) => {
                self.child = None;
                false
            }
        }
    }

    fn stop(&mut self) {
        if let Some(mut child) = self.child.take() {
            let _ = child.kill();
            let _ = child.wait();
        }
    }
}

impl Drop for CommandSink {
    fn drop(&mut self) {
        self.stop();
    }
}
