//! 检测输入 (Detection Adapter)
//!
//! 检测模型本身在进程外运行, 这里只负责把它的输出接进来:
//! 每行一个JSON帧, 例如
//!
//! ```text
//! {"width":640,"height":480,"detections":[{"confidence":0.91,"bbox":[300,120,420,260],"class_id":0}]}
//! ```
//!
//! 读取线程 → crossbeam通道 → 控制循环, 与解码线程/推理线程的分工一致。

use std::io::BufRead;
use std::thread::JoinHandle;
use std::time::Duration;

use crossbeam_channel::{bounded, Receiver, RecvTimeoutError};
use serde::Deserialize;

use super::types::{Detection, FrameDetections, FrameSize};
use crate::error::SourceError;

/// 检测输入接口
pub trait DetectionSource {
    /// 取下一帧
    ///
    /// # 返回
    /// - `Ok(Some(frame))`: 新的一帧
    /// - `Ok(None)`: 输入已结束, 控制循环应退出
    /// - `Err(_)`: 单帧故障, 记录后继续
    fn next_frame(&mut self) -> Result<Option<FrameDetections>, SourceError>;

    /// 最多等待 `timeout` 取下一帧, 让控制循环在输入停顿时仍能处理操作指令
    ///
    /// 默认实现直接阻塞在 `next_frame` 上, 适用于不会停顿的输入。
    fn poll_frame(&mut self, _timeout: Duration) -> Result<SourcePoll, SourceError> {
        Ok(match self.next_frame()? {
            Some(frame) => SourcePoll::Frame(frame),
            None => SourcePoll::Closed,
        })
    }
}

/// `poll_frame` 的结果
#[derive(Debug)]
pub enum SourcePoll {
    Frame(FrameDetections),
    /// 超时内没有新帧
    Idle,
    /// 输入已结束
    Closed,
}

#[derive(Debug, Deserialize)]
struct RawFrame {
    width: Option<u32>,
    height: Option<u32>,
    #[serde(default)]
    detections: Vec<RawDetection>,
}

#[derive(Debug, Deserialize)]
struct RawDetection {
    confidence: f32,
    bbox: [f32; 4],
    #[serde(default)]
    class_id: u32,
}

/// 解析一行JSON帧
///
/// 退化的检测框 (零面积/非有限坐标) 和置信度超出 [0, 1] 的检测在这里丢弃, 不会进入控制器。
pub fn parse_frame(line: &str, line_no: u64, index: u64) -> Result<FrameDetections, SourceError> {
    let raw: RawFrame = serde_json::from_str(line).map_err(|e| SourceError::Malformed {
        line: line_no,
        reason: e.to_string(),
    })?;

    let size = match (raw.width, raw.height) {
        (Some(w), Some(h)) if w > 0 && h > 0 => Some(FrameSize::new(w, h)),
        (None, None) => None,
        (w, h) => {
            return Err(SourceError::Malformed {
                line: line_no,
                reason: format!("incomplete frame size {:?}x{:?}", w, h),
            })
        }
    };

    let detections = raw
        .detections
        .into_iter()
        .map(|d| {
            let [x1, y1, x2, y2] = d.bbox;
            Detection::new(x1, y1, x2, y2, d.confidence, d.class_id)
        })
        .filter(|d| d.bbox.is_valid() && (0.0..=1.0).contains(&d.confidence))
        .collect();

    Ok(FrameDetections {
        index,
        size,
        detections,
    })
}

/// 同步JSON行读取器
pub struct JsonLinesSource<R> {
    reader: R,
    line_no: u64,
    frame_index: u64,
    buf: String,
}

impl<R: BufRead> JsonLinesSource<R> {
    pub fn new(reader: R) -> Self {
        Self {
            reader,
            line_no: 0,
            frame_index: 0,
            buf: String::new(),
        }
    }
}

impl<R: BufRead> DetectionSource for JsonLinesSource<R> {
    fn next_frame(&mut self) -> Result<Option<FrameDetections>, SourceError> {
        loop {
            self.buf.clear();
            if self.reader.read_line(&mut self.buf)? == 0 {
                return Ok(None);
            }
            self.line_no += 1;

            let line = self.buf.trim();
            if line.is_empty() {
                continue;
            }

            let frame = parse_frame(line, self.line_no, self.frame_index + 1)?;
            self.frame_index += 1;
            return Ok(Some(frame));
        }
    }
}

/// 通道输入: 读取线程发送, 控制循环接收
pub struct ChannelSource {
    rx: Receiver<Result<FrameDetections, SourceError>>,
}

impl ChannelSource {
    pub fn new(rx: Receiver<Result<FrameDetections, SourceError>>) -> Self {
        Self { rx }
    }
}

impl DetectionSource for ChannelSource {
    fn next_frame(&mut self) -> Result<Option<FrameDetections>, SourceError> {
        match self.rx.recv() {
            Ok(item) => item.map(Some),
            // 发送端已关闭 = 输入结束
            Err(_) => Ok(None),
        }
    }

    fn poll_frame(&mut self, timeout: Duration) -> Result<SourcePoll, SourceError> {
        match self.rx.recv_timeout(timeout) {
            Ok(item) => item.map(SourcePoll::Frame),
            Err(RecvTimeoutError::Timeout) => Ok(SourcePoll::Idle),
            Err(RecvTimeoutError::Disconnected) => Ok(SourcePoll::Closed),
        }
    }
}

/// 启动读取线程
///
/// 格式错误的行照常转发 (由控制循环记录后跳过); IO错误转发后线程退出。
pub fn spawn_reader<R>(reader: R, capacity: usize) -> (ChannelSource, JoinHandle<()>)
where
    R: BufRead + Send + 'static,
{
    let (tx, rx) = bounded(capacity.max(1));

    let handle = std::thread::spawn(move || {
        tracing::info!("✅ 检测输入线程启动");
        let mut source = JsonLinesSource::new(reader);
        loop {
            let item = match source.next_frame() {
                Ok(Some(frame)) => Ok(frame),
                Ok(None) => break,
                Err(e) => Err(e),
            };
            let fatal = matches!(item, Err(SourceError::Io(_)));
            if tx.send(item).is_err() || fatal {
                break;
            }
        }
        tracing::info!("检测输入线程退出 (共{}帧)", source.frame_index);
    });

    (ChannelSource::new(rx), handle)
}
