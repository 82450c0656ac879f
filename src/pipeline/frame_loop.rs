//! 控制循环 (Frame Loop Orchestrator)
//! 职责: 逐帧调度 选择器 → 规划器 → 舵机链路 → 告警, 退出时保证舵机归位

use std::time::{Duration, Instant};

use crossbeam_channel::{Receiver, TryRecvError};

use super::{ControlCommand, FrameReport, RunSummary, TargetInfo};
use crate::alert::{AlertSink, Notifier};
use crate::config::TrackerConfig;
use crate::detection::{DetectionSource, FrameDetections, FrameSize, SourcePoll, TargetSelector};
use crate::servo::{
    ActuatorLink, ActuatorTransport, LinkPhase, LinkSettings, PositionPlanner, ReturnHome,
};

/// 输入停顿时检查操作指令的间隔
const SOURCE_POLL_INTERVAL: Duration = Duration::from_millis(100);

pub struct FrameLoop<S, T, A>
where
    S: DetectionSource,
    T: ActuatorTransport,
    A: AlertSink,
{
    source: S,
    link: ActuatorLink<T>,
    selector: TargetSelector,
    planner: PositionPlanner,
    notifier: Notifier,
    sink: A,
    control: Option<Receiver<ControlCommand>>,

    alert_id: String,
    default_frame: FrameSize,
    report_interval: u64,

    // 统计
    frames: u64,
    source_errors: u64,
    parked: bool,
}

impl<S, T, A> FrameLoop<S, T, A>
where
    S: DetectionSource,
    T: ActuatorTransport,
    A: AlertSink,
{
    pub fn new(config: &TrackerConfig, source: S, transport: T, sink: A) -> Self {
        Self {
            source,
            link: ActuatorLink::new(transport, LinkSettings::from_config(config)),
            selector: TargetSelector::new(config.confidence_threshold, config.target_class),
            planner: PositionPlanner::from_config(config),
            notifier: Notifier::new(config.alert_cooldown()),
            sink,
            control: None,
            alert_id: config.alert_id.clone(),
            default_frame: FrameSize::new(config.frame_width, config.frame_height),
            report_interval: config.report_interval_frames.max(1),
            frames: 0,
            source_errors: 0,
            parked: false,
        }
    }

    /// 接入操作指令通道
    pub fn with_control(mut self, control: Receiver<ControlCommand>) -> Self {
        self.control = Some(control);
        self
    }

    pub fn link(&self) -> &ActuatorLink<T> {
        &self.link
    }

    pub fn link_mut(&mut self) -> &mut ActuatorLink<T> {
        &mut self.link
    }

    pub fn notifier(&self) -> &Notifier {
        &self.notifier
    }

    pub fn sink(&self) -> &A {
        &self.sink
    }

    pub fn summary(&self) -> RunSummary {
        RunSummary {
            frames: self.frames,
            source_errors: self.source_errors,
            alerts: self.notifier.fire_count(),
            link: self.link.stats().clone(),
        }
    }

    /// 启动: 探测控制器, 然后归位
    pub fn startup(&mut self) {
        match self.link.probe() {
            Ok(status) => tracing::info!(
                position = ?status.position,
                uptime = ?status.uptime,
                wifi = ?status.wifi_strength,
                "✅ 舵机控制器在线"
            ),
            Err(e) => tracing::warn!("⚠️  舵机控制器无响应 ({}), 运行中会继续重试", e),
        }

        match self.link.reset_to_home() {
            Ok(home) => tracing::info!("✓ 舵机归位 ({}°)", home),
            Err(e) => tracing::warn!("⚠️  启动归位失败: {}", e),
        }
        self.parked = false;
    }

    /// 主循环: 直到输入结束或收到退出指令, 退出前一定归位
    pub fn run(&mut self) -> RunSummary {
        self.startup();
        tracing::info!("🎬 开始跟踪...");

        loop {
            if !self.poll_control(Instant::now()) {
                tracing::info!("⏹️  收到退出指令");
                break;
            }

            match self.source.poll_frame(SOURCE_POLL_INTERVAL) {
                Ok(SourcePoll::Frame(frame)) => {
                    self.process_frame(&frame, Instant::now());
                }
                // 输入停顿: 回到循环顶部检查退出指令
                Ok(SourcePoll::Idle) => {}
                Ok(SourcePoll::Closed) => {
                    tracing::info!("📹 检测输入结束");
                    break;
                }
                Err(e) => {
                    // 单帧故障: 记录后继续
                    self.source_errors += 1;
                    tracing::warn!("⚠️  检测输入异常: {}", e);
                }
            }
        }

        self.shutdown();
        self.summary()
    }

    /// 处理待执行的操作指令, 返回 false 表示应退出
    pub fn poll_control(&mut self, now: Instant) -> bool {
        let Some(control) = self.control.as_ref() else {
            return true;
        };

        let mut commands = Vec::new();
        let mut disconnected = false;
        loop {
            match control.try_recv() {
                Ok(command) => commands.push(command),
                Err(TryRecvError::Empty) => break,
                Err(TryRecvError::Disconnected) => {
                    disconnected = true;
                    break;
                }
            }
        }
        // 操作端关闭不影响跟踪
        if disconnected {
            self.control = None;
        }

        for command in commands {
            match command {
                ControlCommand::ResetHome => match self.link.reset_to_home() {
                    Ok(home) => tracing::info!("🔄 手动归位 ({}°)", home),
                    Err(e) => tracing::warn!("⚠️  手动归位失败: {}", e),
                },
                ControlCommand::ForceAlert => {
                    self.notifier.force(now);
                    self.trigger_alert();
                }
                ControlCommand::Shutdown => return false,
            }
        }
        true
    }

    /// 单帧处理
    pub fn process_frame(&mut self, frame: &FrameDetections, now: Instant) -> FrameReport {
        self.frames += 1;
        let frame_index = if frame.index > 0 { frame.index } else { self.frames };
        let frame_size = frame.size.unwrap_or(self.default_frame);

        // 1. 目标选择
        let selection = self.selector.select(&frame.detections);

        let mut plan = None;
        let mut command = None;
        let mut command_error = None;

        match selection.target.as_ref() {
            // 2. 有目标: 取消归位 → 规划 → 步进发送
            Some(target) => {
                self.link.cancel_return_home();
                let result = self.planner.plan(target.center(), self.link.position(), frame_size);
                if result.needs_adjustment {
                    match self.link.track(result.target_position) {
                        Ok(position) => command = Some(position),
                        Err(e) => command_error = Some(e.to_string()),
                    }
                }
                plan = Some(result);
            }
            // 3. 无目标: 归位计时
            None => {
                if let ReturnHome::Returning { command: sent } = self.link.evaluate_return_home(now) {
                    match sent {
                        Ok(position) => command = Some(position),
                        Err(e) => command_error = Some(e.to_string()),
                    }
                }
            }
        }

        // 4. 告警 (与舵机互不影响)
        let notified = self.notifier.consider(selection.has_target(), now);
        if notified {
            self.trigger_alert();
        }
        let alert_active = self.sink.is_active();

        let report = FrameReport {
            frame_index,
            targets: selection.targets.len(),
            target: selection.target.as_ref().map(TargetInfo::from),
            plan,
            command,
            command_error,
            position: self.link.position(),
            reachable: self.link.is_reachable(),
            phase: self.link.state().phase(),
            return_wait_secs: self.link.remaining_wait(now).map(|d| d.as_secs_f64()),
            notified,
            alert_active,
        };

        // 5. 周期性状态输出, 避免每帧刷屏
        if frame_index % self.report_interval == 0 {
            log_report(&report);
        }
        report
    }

    /// 退出清理: 停止告警, 舵机归位 (只执行一次)
    pub fn shutdown(&mut self) {
        if self.parked {
            return;
        }
        self.parked = true;

        self.sink.stop();
        tracing::info!("舵机归位中...");
        match self.link.reset_to_home() {
            Ok(home) => tracing::info!("✓ 舵机已归位 ({}°)", home),
            Err(e) => tracing::error!("❌ 退出归位失败: {}", e),
        }
    }

    fn trigger_alert(&mut self) {
        if let Err(e) = self.sink.play(&self.alert_id) {
            tracing::warn!("⚠️  告警播放失败: {}", e);
        }
    }
}

impl<S, T, A> Drop for FrameLoop<S, T, A>
where
    S: DetectionSource,
    T: ActuatorTransport,
    A: AlertSink,
{
    fn drop(&mut self) {
        // 异常退出 (panic/提前返回) 时同样归位
        self.shutdown();
    }
}

fn log_report(report: &FrameReport) {
    let link = if report.reachable { "✓" } else { "✗" };

    if let Some(target) = &report.target {
        let goal = report
            .plan
            .as_ref()
            .map(|plan| plan.target_position)
            .unwrap_or(report.position);
        tracing::info!(
            "[帧{}] 目标: {} | 中心: ({:.0}, {:.0}) | 舵机: {}° → {}° | 控制器: {}",
            report.frame_index,
            report.targets,
            target.center.0,
            target.center.1,
            report.position,
            goal,
            link
        );
        return;
    }

    match (report.phase, report.return_wait_secs) {
        (_, Some(wait)) if wait > 0.0 => tracing::info!(
            "[帧{}] 无目标 - {:.1}s 后归位 | 控制器: {}",
            report.frame_index,
            wait,
            link
        ),
        (LinkPhase::ReturningHome, _) => tracing::info!(
            "[帧{}] 无目标 - 正在归位 | 舵机: {}° | 控制器: {}",
            report.frame_index,
            report.position,
            link
        ),
        _ => tracing::info!(
            "[帧{}] 无目标 - 已在归位位置 ({}°) | 控制器: {}",
            report.frame_index,
            report.position,
            link
        ),
    }
}
