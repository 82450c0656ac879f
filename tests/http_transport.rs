//! HttpTransport 集成测试: 本地 TcpListener 模拟 ESP32 控制器

use std::io::{Read, Write};
use std::net::{TcpListener, TcpStream};
use std::sync::mpsc;
use std::thread;
use std::time::Duration;

use yolo_servo_rs::{ActuatorTransport, HttpTransport, LinkError};

/// 读取一个完整的HTTP请求 (头 + Content-Length 指定的正文)
fn read_request(stream: &mut TcpStream) -> String {
    let mut data = Vec::new();
    let mut buf = [0u8; 1024];
    loop {
        let n = stream.read(&mut buf).unwrap();
        if n == 0 {
            break;
        }
        data.extend_from_slice(&buf[..n]);

        let text = String::from_utf8_lossy(&data).to_string();
        if let Some(header_end) = text.find("\r\n\r\n") {
            let content_length = text[..header_end]
                .lines()
                .find_map(|line| {
                    let (name, value) = line.split_once(':')?;
                    name.eq_ignore_ascii_case("content-length")
                        .then(|| value.trim().parse::<usize>().ok())
                        .flatten()
                })
                .unwrap_or(0);
            if data.len() >= header_end + 4 + content_length {
                return text;
            }
        }
    }
    String::from_utf8_lossy(&data).to_string()
}

/// 单次应答的模拟控制器, 返回 (base_url, 收到的请求)
fn serve_once(status_line: &'static str, body: &'static str) -> (String, mpsc::Receiver<String>) {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let url = format!("http://{}", listener.local_addr().unwrap());
    let (tx, rx) = mpsc::channel();

    thread::spawn(move || {
        let (mut stream, _) = listener.accept().unwrap();
        let request = read_request(&mut stream);
        let response = format!(
            "HTTP/1.1 {}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
            status_line,
            body.len(),
            body
        );
        stream.write_all(response.as_bytes()).unwrap();
        let _ = tx.send(request);
    });

    (url, rx)
}

fn transport(base: &str, timeout: Duration) -> HttpTransport {
    HttpTransport::new(format!("{}/servo", base), format!("{}/status", base), timeout)
}

#[test]
fn position_command_is_posted_as_json() {
    let (base, requests) = serve_once("200 OK", "");
    let mut transport = transport(&base, Duration::from_secs(2));

    assert_eq!(transport.send_position(67), Ok(()));

    let request = requests.recv_timeout(Duration::from_secs(2)).unwrap();
    assert!(request.starts_with("POST /servo "));
    assert!(request.to_ascii_lowercase().contains("content-type: application/json"));
    assert!(request.ends_with(r#"{"position":67}"#));
}

#[test]
fn non_200_is_status_error() {
    let (base, _requests) = serve_once("500 Internal Server Error", "");
    let mut transport = transport(&base, Duration::from_secs(2));

    assert_eq!(transport.send_position(90), Err(LinkError::Status(500)));
}

#[test]
fn probe_parses_device_status() {
    let (base, requests) = serve_once(
        "200 OK",
        r#"{"status":"ok","position":90,"uptime":5321,"wifi_strength":-61}"#,
    );
    let mut transport = transport(&base, Duration::from_secs(2));

    let status = transport.probe().unwrap();
    assert_eq!(status.status.as_deref(), Some("ok"));
    assert_eq!(status.position, Some(90));
    assert_eq!(status.uptime, Some(5321));
    assert_eq!(status.wifi_strength, Some(-61));

    let request = requests.recv_timeout(Duration::from_secs(2)).unwrap();
    assert!(request.starts_with("GET /status "));
}

#[test]
fn probe_tolerates_unexpected_body() {
    let (base, _requests) = serve_once("200 OK", "pong");
    let mut transport = transport(&base, Duration::from_secs(2));

    let status = transport.probe().unwrap();
    assert_eq!(status.position, None);
}

#[test]
fn refused_connection_is_reported() {
    // 绑定后立即释放, 端口上没有监听者
    let addr = TcpListener::bind("127.0.0.1:0").unwrap().local_addr().unwrap();
    let mut transport = transport(&format!("http://{}", addr), Duration::from_millis(500));

    match transport.send_position(90) {
        Err(LinkError::Connection(_)) | Err(LinkError::Timeout) => {}
        other => panic!("unexpected result: {:?}", other),
    }
}

#[test]
fn silent_controller_times_out() {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let base = format!("http://{}", listener.local_addr().unwrap());
    let (done_tx, done_rx) = mpsc::channel::<()>();

    // 接受连接但从不应答
    thread::spawn(move || {
        let (_stream, _) = listener.accept().unwrap();
        let _ = done_rx.recv_timeout(Duration::from_secs(5));
    });

    let mut transport = transport(&base, Duration::from_millis(200));
    let result = transport.send_position(90);
    let _ = done_tx.send(());

    assert!(result.is_err());
    assert!(!matches!(result, Err(LinkError::Status(_))));
}
