//! 舵机网络传输 (ESP32 WiFi舵机控制器)
//!
//! 控制器只提供两个接口:
//! - `POST /servo  {"position": 0-180}` → 200
//! - `GET  /status` → `{"status":"ok","position":90,"uptime":..,"wifi_strength":..}`
//!
//! 位置不回读: 链路自己记录当前角度, `/status` 只在启动时探测一次。

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::LinkError;

/// 控制器状态 (尽力解析, 字段缺失不算错误)
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct DeviceStatus {
    pub status: Option<String>,
    pub position: Option<i32>,
    pub uptime: Option<u64>,
    pub wifi_strength: Option<i32>,
}

/// 舵机传输接口
///
/// 每次调用都是一次有超时的同步往返, 失败以 `LinkError` 返回, 不重试。
pub trait ActuatorTransport {
    /// 发送位置指令
    fn send_position(&mut self, position: i32) -> Result<(), LinkError>;

    /// 只读状态探测
    fn probe(&mut self) -> Result<DeviceStatus, LinkError>;
}

#[derive(Serialize)]
struct PositionCommand {
    position: i32,
}

/// HTTP传输 (ureq 同步客户端)
pub struct HttpTransport {
    agent: ureq::Agent,
    command_url: String,
    status_url: String,
}

impl HttpTransport {
    pub fn new(command_url: impl Into<String>, status_url: impl Into<String>, timeout: Duration) -> Self {
        let agent = ureq::AgentBuilder::new().timeout(timeout).build();
        Self {
            agent,
            command_url: command_url.into(),
            status_url: status_url.into(),
        }
    }

    pub fn command_url(&self) -> &str {
        &self.command_url
    }
}

impl ActuatorTransport for HttpTransport {
    fn send_position(&mut self, position: i32) -> Result<(), LinkError> {
        let body = serde_json::to_string(&PositionCommand { position })
            .map_err(|e| LinkError::Transport(e.to_string()))?;

        let response = self
            .agent
            .post(&self.command_url)
            .set("Content-Type", "application/json")
            .send_string(&body)
            .map_err(map_ureq_error)?;

        // 控制器成功时固定返回200
        match response.status() {
            200 => Ok(()),
            code => Err(LinkError::Status(code)),
        }
    }

    fn probe(&mut self) -> Result<DeviceStatus, LinkError> {
        let response = self.agent.get(&self.status_url).call().map_err(map_ureq_error)?;
        if response.status() != 200 {
            return Err(LinkError::Status(response.status()));
        }

        let body = response
            .into_string()
            .map_err(|e| LinkError::Transport(e.to_string()))?;
        Ok(serde_json::from_str(&body).unwrap_or_default())
    }
}

/// ureq错误 → 链路错误
fn map_ureq_error(err: ureq::Error) -> LinkError {
    match err {
        ureq::Error::Status(code, _) => LinkError::Status(code),
        ureq::Error::Transport(transport) => {
            if is_timeout(&transport) {
                return LinkError::Timeout;
            }
            match transport.kind() {
                ureq::ErrorKind::Dns | ureq::ErrorKind::ConnectionFailed | ureq::ErrorKind::Io => {
                    LinkError::Connection(transport.to_string())
                }
                _ => LinkError::Transport(transport.to_string()),
            }
        }
    }
}

fn is_timeout(transport: &ureq::Transport) -> bool {
    std::error::Error::source(transport)
        .and_then(|source| source.downcast_ref::<std::io::Error>())
        .map_or(false, |io| {
            matches!(
                io.kind(),
                std::io::ErrorKind::TimedOut | std::io::ErrorKind::WouldBlock
            )
        })
}
