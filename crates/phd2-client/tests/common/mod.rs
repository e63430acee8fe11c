//! Scripted fake guider server over the in-memory mock stream

#![allow(dead_code)]

use phd2_client::{Guider, GuiderConfig};
use phd2_transport::{MockPeer, mock_pair};
use serde_json::{Value, json};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

#[derive(Debug, Clone, PartialEq)]
pub struct Request {
    pub method: String,
    pub params: Value,
}

pub fn ok(result: Value) -> String {
    json!({"jsonrpc": "2.0", "result": result, "id": 1}).to_string()
}

pub fn rpc_error(message: &str) -> String {
    json!({"jsonrpc": "2.0", "error": {"code": 1, "message": message}, "id": 1}).to_string()
}

pub fn event(ev: Value) -> String {
    ev.to_string()
}

/// Answers like an idle simulator profile
pub fn default_reply(req: &Request) -> Vec<String> {
    match req.method.as_str() {
        "get_pixel_scale" => vec![ok(json!(1.5))],
        "get_exposure" => vec![ok(json!(20))],
        "get_app_state" => vec![ok(json!("Stopped"))],
        "get_settling" => vec![ok(json!(false))],
        "get_profile" => vec![ok(json!({"id": 1, "name": "Simulator"}))],
        "get_profiles" => vec![ok(json!([
            {"id": 1, "name": "Simulator"},
            {"id": 4, "name": "Backyard EQ6"}
        ]))],
        "save_image" => vec![ok(json!({"filename": "/tmp/phd2_save_000.fits"}))],
        "stop_capture" => vec![event(json!({"Event": "GuidingStopped"})), ok(json!(0))],
        "loop" => vec![event(json!({"Event": "LoopingExposures", "Frame": 1})), ok(json!(0))],
        _ => vec![ok(json!(0))],
    }
}

pub fn test_config() -> GuiderConfig {
    GuiderConfig {
        read_timeout_ms: 20,
        stop_capture_timeout_secs: 1,
        loop_timeout_secs: 1,
        poll_interval_ms: 20,
        ..Default::default()
    }
}

pub struct FakeServer {
    peer: MockPeer,
    requests: Arc<Mutex<Vec<Request>>>,
    running: Arc<AtomicBool>,
    handle: Option<JoinHandle<()>>,
}

impl FakeServer {
    /// Connected guider plus a server thread answering with `handler`.
    pub fn start<F>(mut handler: F) -> (Guider, FakeServer)
    where
        F: FnMut(&Request) -> Vec<String> + Send + 'static,
    {
        let (stream, peer) = mock_pair(Duration::from_millis(20));
        let mut guider = Guider::with_config(test_config());
        guider.connect_with(stream).unwrap();

        let requests = Arc::new(Mutex::new(Vec::new()));
        let running = Arc::new(AtomicBool::new(true));

        let handle = {
            let peer = peer.clone();
            let requests = requests.clone();
            let running = running.clone();
            thread::spawn(move || {
                while running.load(Ordering::Acquire) {
                    let Some(line) = peer.recv_line_timeout(Duration::from_millis(20)) else {
                        continue;
                    };
                    let value: Value = serde_json::from_str(&line).unwrap();
                    let req = Request {
                        method: value["method"].as_str().unwrap().to_string(),
                        params: value.get("params").cloned().unwrap_or(Value::Null),
                    };
                    requests.lock().unwrap().push(req.clone());
                    for reply in handler(&req) {
                        peer.send_line(&reply);
                    }
                }
            })
        };

        (
            guider,
            FakeServer {
                peer,
                requests,
                running,
                handle: Some(handle),
            },
        )
    }

    pub fn with_defaults() -> (Guider, FakeServer) {
        Self::start(default_reply)
    }

    pub fn send_event(&self, ev: Value) {
        self.peer.send_line(&ev.to_string());
    }

    pub fn send_raw(&self, text: &str) {
        self.peer.send_raw(text);
    }

    pub fn requests(&self) -> Vec<Request> {
        self.requests.lock().unwrap().clone()
    }

    pub fn methods(&self) -> Vec<String> {
        self.requests().into_iter().map(|r| r.method).collect()
    }

    /// Hang up, as if the server process exited.
    pub fn close(&self) {
        self.peer.close();
    }
}

impl Drop for FakeServer {
    fn drop(&mut self) {
        self.running.store(false, Ordering::Release);
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

/// Round trip that guarantees every event sent before it has been applied.
pub fn barrier(guider: &Guider) {
    guider.call("get_pixel_scale", Value::Null).unwrap();
}

pub fn wait_until(mut cond: impl FnMut() -> bool, timeout: Duration) -> bool {
    let deadline = Instant::now() + timeout;
    while Instant::now() < deadline {
        if cond() {
            return true;
        }
        thread::sleep(Duration::from_millis(5));
    }
    cond()
}
