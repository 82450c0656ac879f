/// 数字卫兵 (Digital Sentinel)
///
/// 目标跟踪云台: 检测结果 → 舵机跟随 + 声音告警
///
/// 系统架构:
/// 1. 输入线程: 读取检测结果 (JSON行, 文件或标准输入)
/// 2. 操作线程: 终端按键 r/a/q (仅当检测结果来自文件时)
/// 3. 主线程:   逐帧控制循环, 退出前舵机归位
///
/// Ctrl-C 不直接结束进程, 而是发送退出指令, 保证舵机归位后再退出。
use std::fs::File;
use std::io::{BufRead, BufReader};

use anyhow::{Context, Result};
use clap::Parser;
use crossbeam_channel::unbounded;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use yolo_servo_rs::alert::{self, AlertSink, LogSink};
use yolo_servo_rs::detection::spawn_reader;
use yolo_servo_rs::pipeline::{ControlCommand, FrameLoop};
use yolo_servo_rs::servo::HttpTransport;
use yolo_servo_rs::TrackerConfig;

/// 数字卫兵参数
#[derive(Parser, Debug)]
#[command(author, version, about = "数字卫兵 - 目标跟踪舵机云台", long_about = None)]
struct Args {
    /// 配置文件 (不存在时自动创建)
    #[arg(short, long, default_value = "tracker_config.json")]
    config: String,

    /// 检测结果输入: JSON行文件, "-" 为标准输入
    #[arg(short, long, default_value = "-")]
    source: String,

    /// 覆盖舵机控制器地址, 例如 http://192.168.4.1
    #[arg(long)]
    actuator_url: Option<String>,

    /// 覆盖置信度阈值
    #[arg(long)]
    confidence: Option<f32>,

    /// 覆盖状态输出间隔 (帧)
    #[arg(long)]
    report_interval: Option<u64>,

    /// 只记录告警, 不启动播放器
    #[arg(long)]
    no_alert: bool,
}

fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "yolo_servo_rs=info,sentinel=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let args = Args::parse();

    // ========== 加载配置 ==========
    let mut config = TrackerConfig::load(&args.config)
        .with_context(|| format!("加载配置失败: {}", args.config))?;
    if let Some(url) = args.actuator_url {
        config.actuator_url = url;
    }
    if let Some(confidence) = args.confidence {
        config.confidence_threshold = confidence;
    }
    if let Some(interval) = args.report_interval {
        config.report_interval_frames = interval;
    }
    config.validate().context("配置校验失败, 拒绝启动")?;

    tracing::info!("🚀 数字卫兵系统启动 v{}", env!("CARGO_PKG_VERSION"));
    config.print_summary();

    // ========== 启动输入线程 ==========
    let from_stdin = args.source == "-";
    let reader: Box<dyn BufRead + Send> = if from_stdin {
        tracing::info!("📹 检测输入: 标准输入");
        Box::new(BufReader::new(std::io::stdin()))
    } else {
        tracing::info!("📹 检测输入: {}", args.source);
        let file = File::open(&args.source)
            .with_context(|| format!("无法打开检测输入: {}", args.source))?;
        Box::new(BufReader::new(file))
    };
    let (source, _reader_handle) = spawn_reader(reader, 8);

    // ========== 启动操作线程 ==========
    let (control_tx, control_rx) = unbounded();

    let interrupt_tx = control_tx.clone();
    ctrlc::set_handler(move || {
        tracing::info!("🛑 收到 Ctrl-C, 舵机归位后退出");
        let _ = interrupt_tx.send(ControlCommand::Shutdown);
    })
    .context("注册 Ctrl-C 处理失败")?;

    if !from_stdin {
        tracing::info!("⌨️  按 r 回车手动归位, a 回车强制告警, q 回车退出");
        std::thread::spawn(move || {
            for line in std::io::stdin().lines() {
                let Ok(line) = line else { break };
                if let Some(command) = ControlCommand::from_key(&line) {
                    if control_tx.send(command).is_err() || command == ControlCommand::Shutdown {
                        break;
                    }
                }
            }
        });
    }

    // ========== 主线程: 控制循环 ==========
    let transport = HttpTransport::new(config.command_url(), config.status_url(), config.request_timeout());
    let sink: Box<dyn AlertSink + Send> = if args.no_alert {
        Box::new(LogSink::default())
    } else {
        alert::sink::from_config(&config)
    };

    let mut frame_loop = FrameLoop::new(&config, source, transport, sink).with_control(control_rx);
    let summary = frame_loop.run();

    tracing::info!(
        frames = summary.frames,
        source_errors = summary.source_errors,
        alerts = summary.alerts,
        commands_sent = summary.link.commands_sent,
        commands_failed = summary.link.commands_failed,
        "✓ 清理完成"
    );
    Ok(())
}
