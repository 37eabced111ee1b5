//! Round-trip tests against a scripted mock RPC service.
//!
//! The mock reads newline-delimited JSON requests from stdin and answers on
//! stdout, handling each request on its own thread so responses can
//! interleave like a real service's would.

use std::collections::HashMap;
use std::path::PathBuf;
use std::time::{Duration, Instant};

use switchboard_core::types::{ServiceDescriptor, ServiceKind, ToolCallRequest};
use switchboard_executor::ToolExecutor;

const MOCK_SERVER: &str = r#"
import json
import os
import sys
import threading
import time

lock = threading.Lock()
counters = {"reject": 0}

def send(obj):
    with lock:
        sys.stdout.write(json.dumps(obj) + "\n")
        sys.stdout.flush()

def handle(msg):
    method = msg.get("method", "")
    msg_id = msg.get("id")
    if method == "tools/list":
        send({"id": msg_id, "result": {"tools": [{"name": "echo"}, {"name": "sleep"}]}})
        return
    if method != "tools/call":
        send({"id": msg_id, "error": {"code": -32601, "message": "unknown method"}})
        return
    params = msg.get("params", {})
    name = params.get("name", "")
    args = params.get("arguments", {})
    if name == "echo":
        send({"id": msg_id, "result": {"echo": args.get("message", "")}})
    elif name == "sleep":
        time.sleep(float(args.get("seconds", 0.2)))
        send({"id": msg_id, "result": {"slept": args.get("seconds", 0.2)}})
    elif name == "noise":
        send({"id": 999999, "result": {"spurious": True}})
        send({"id": msg_id, "result": {"ok": True}})
    elif name == "reject":
        with lock:
            counters["reject"] += 1
            n = counters["reject"]
        send({"id": msg_id, "error": {"code": -32000, "message": "rejected call %d" % n}})
    elif name == "die":
        os._exit(1)
    else:
        send({"id": msg_id, "error": {"code": -32601, "message": "unknown tool"}})

for line in sys.stdin:
    line = line.strip()
    if not line:
        continue
    try:
        msg = json.loads(line)
    except Exception:
        continue
    threading.Thread(target=handle, args=(msg,), daemon=True).start()
"#;

struct MockService {
    _dir: tempfile::TempDir,
    script: PathBuf,
}

impl MockService {
    fn write() -> Self {
        let dir = tempfile::tempdir().unwrap();
        let script = dir.path().join("mock_service.py");
        std::fs::write(&script, MOCK_SERVER).unwrap();
        Self { _dir: dir, script }
    }

    fn descriptor(&self, id: &str, timeout_secs: u64) -> ServiceDescriptor {
        ServiceDescriptor {
            service_id: id.to_string(),
            kind: ServiceKind::NativeBinary,
            command: "python3".to_string(),
            args: vec![self.script.to_string_lossy().to_string()],
            env: HashMap::new(),
            enabled: true,
            timeout_secs,
            working_directory: None,
            package: None,
        }
    }
}

#[tokio::test]
async fn test_echo_round_trip() {
    let mock = MockService::write();
    let service = mock.descriptor("mock", 5);
    let executor = ToolExecutor::new(4, 2, Duration::from_millis(50));

    let request = ToolCallRequest::new("echo", serde_json::json!({"message": "hello world"}));
    let response = executor.call(&service, &request).await.unwrap();

    assert!(response.is_success());
    assert_eq!(response.request_id, request.request_id);
    assert_eq!(response.result.unwrap()["echo"], "hello world");

    executor.shutdown_all().await;
}

#[tokio::test]
async fn test_interleaved_responses_match_by_id() {
    let mock = MockService::write();
    let service = mock.descriptor("mock", 5);
    let executor = ToolExecutor::new(4, 1, Duration::from_millis(50));

    // Warm up so both calls below share the same connection.
    let warmup = ToolCallRequest::new("echo", serde_json::json!({"message": "warmup"}));
    executor.call(&service, &warmup).await.unwrap();

    // The slow call is issued first; the fast one answers before it. Each
    // response must still land on its own request.
    let slow = ToolCallRequest::new("sleep", serde_json::json!({"seconds": 0.5}));
    let fast = ToolCallRequest::new("echo", serde_json::json!({"message": "quick"}));

    let calls = vec![
        (service.clone(), slow.clone()),
        (service.clone(), fast.clone()),
    ];
    let results = executor.call_many(&calls).await;

    let slow_response = results[0].as_ref().unwrap();
    let fast_response = results[1].as_ref().unwrap();
    assert_eq!(slow_response.request_id, slow.request_id);
    assert_eq!(fast_response.request_id, fast.request_id);
    assert_eq!(fast_response.result.as_ref().unwrap()["echo"], "quick");
    assert!(slow_response.result.as_ref().unwrap()["slept"].is_number());

    executor.shutdown_all().await;
}

#[tokio::test]
async fn test_rejection_is_returned_without_retry() {
    let mock = MockService::write();
    let service = mock.descriptor("mock", 5);
    let executor = ToolExecutor::new(4, 3, Duration::from_millis(10));

    let request = ToolCallRequest::new("reject", serde_json::json!({}));
    let response = executor.call(&service, &request).await.unwrap();

    assert!(!response.is_success());
    let error = response.error.unwrap();
    assert_eq!(error.code, -32000);
    // "call 1" proves the executor asked exactly once.
    assert_eq!(error.message, "rejected call 1");

    executor.shutdown_all().await;
}

#[tokio::test]
async fn test_unmatched_response_is_dropped() {
    let mock = MockService::write();
    let service = mock.descriptor("mock", 5);
    let executor = ToolExecutor::new(4, 1, Duration::from_millis(50));

    let noise = ToolCallRequest::new("noise", serde_json::json!({}));
    let response = executor.call(&service, &noise).await.unwrap();
    assert!(response.is_success());

    // The spurious frame must not have poisoned the channel.
    let echo = ToolCallRequest::new("echo", serde_json::json!({"message": "still here"}));
    let response = executor.call(&service, &echo).await.unwrap();
    assert_eq!(response.result.unwrap()["echo"], "still here");

    executor.shutdown_all().await;
}

#[tokio::test]
async fn test_call_timeout_surfaces() {
    let mock = MockService::write();
    let service = mock.descriptor("mock", 1);
    let executor = ToolExecutor::new(4, 1, Duration::from_millis(10));

    let request = ToolCallRequest::new("sleep", serde_json::json!({"seconds": 3.0}));
    let result = executor.call(&service, &request).await;

    assert!(matches!(
        result,
        Err(switchboard_core::Error::ExecutionTimeout(_))
    ));

    executor.shutdown_all().await;
}

#[tokio::test]
async fn test_crashed_service_is_respawned_on_next_call() {
    let mock = MockService::write();
    let service = mock.descriptor("mock", 2);
    let executor = ToolExecutor::new(4, 1, Duration::from_millis(10));

    let kill = ToolCallRequest::new("die", serde_json::json!({}));
    let result = executor.call(&service, &kill).await;
    assert!(result.is_err(), "call against a dying process must fail");

    // The failed connection is discarded; a fresh process serves this call.
    let echo = ToolCallRequest::new("echo", serde_json::json!({"message": "reborn"}));
    let response = executor.call(&service, &echo).await.unwrap();
    assert_eq!(response.result.unwrap()["echo"], "reborn");

    executor.shutdown_all().await;
}

#[tokio::test]
async fn test_concurrency_ceiling_queues_excess_calls() {
    let mock = MockService::write();
    let service = mock.descriptor("mock", 10);
    let executor = ToolExecutor::new(2, 1, Duration::from_millis(10));

    let calls: Vec<(ServiceDescriptor, ToolCallRequest)> = (0..4)
        .map(|_| {
            (
                service.clone(),
                ToolCallRequest::new("sleep", serde_json::json!({"seconds": 0.4})),
            )
        })
        .collect();

    let start = Instant::now();
    let results = executor.call_many(&calls).await;
    let elapsed = start.elapsed();

    for result in &results {
        assert!(result.as_ref().unwrap().is_success());
    }
    // Four 0.4s sleeps through a ceiling of two need at least two waves.
    assert!(
        elapsed >= Duration::from_millis(750),
        "ceiling not enforced: finished in {:?}",
        elapsed
    );

    executor.shutdown_all().await;
}

#[tokio::test]
async fn test_list_remote_tools() {
    let mock = MockService::write();
    let service = mock.descriptor("mock", 5);
    let executor = ToolExecutor::new(4, 1, Duration::from_millis(10));

    let listing = executor.list_remote_tools(&service).await.unwrap();
    let names: Vec<&str> = listing["tools"]
        .as_array()
        .unwrap()
        .iter()
        .filter_map(|t| t["name"].as_str())
        .collect();
    assert!(names.contains(&"echo"));

    executor.shutdown_all().await;
}
