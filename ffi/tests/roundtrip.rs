//! Drive the C entry points end to end against the live mock server.
//!
//! # Design
//! The mock server runs on its own thread and runtime, the way a real target
//! lives outside the host process. The test thread plays the host: it builds
//! C strings, calls the exported functions and frees the replies.

use std::ffi::{CStr, CString};
use std::net::SocketAddr;
use std::time::Instant;

use fanout_ffi::{fanout_free_string, fanout_proc, fanout_proc_with_timeout};
use mock_server::Echo;
use serde_json::{json, Value};

fn start_server() -> SocketAddr {
    let std_listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = std_listener.local_addr().unwrap();
    std_listener.set_nonblocking(true).unwrap();

    std::thread::spawn(move || {
        let rt = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .unwrap();
        rt.block_on(async {
            let listener = tokio::net::TcpListener::from_std(std_listener).unwrap();
            mock_server::run(listener).await
        })
        .unwrap();
    });

    addr
}

fn take_reply(reply: *mut std::os::raw::c_char) -> Value {
    assert!(!reply.is_null());
    let text = unsafe { CStr::from_ptr(reply) }.to_str().unwrap().to_string();
    fanout_free_string(reply);
    serde_json::from_str(&text).unwrap()
}

fn proc(batch: &Value) -> Value {
    let input = CString::new(batch.to_string()).unwrap();
    take_reply(fanout_proc(input.as_ptr()))
}

#[test]
fn batch_round_trip_keeps_order_and_isolates_failures() {
    let addr = start_server();
    let dead = {
        let l = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        l.local_addr().unwrap()
    };

    let batch = json!([
        { "method": "GET", "uri": format!("http://{addr}/echo?id=0&delay_ms=150") },
        { "method": "POST", "uri": format!("http://{addr}/echo?id=1"), "body": {"n": 1} },
        { "method": "GET", "uri": format!("http://{dead}/") },
        { "method": "PUT", "uri": format!("http://{addr}/echo?id=3&status=409"), "body": null },
    ]);

    let reply = proc(&batch);
    let results = reply.as_array().expect("array reply");
    assert_eq!(results.len(), 4);

    let echo0: Echo = serde_json::from_str(results[0]["body"].as_str().unwrap()).unwrap();
    assert_eq!(echo0.id.as_deref(), Some("0"));

    let echo1: Echo = serde_json::from_str(results[1]["body"].as_str().unwrap()).unwrap();
    assert_eq!(echo1.method, "POST");
    assert_eq!(echo1.body, r#"{"n":1}"#);

    assert_eq!(results[2]["status"], 500);
    assert!(results[2].get("request").is_some());

    assert_eq!(results[3]["status"], 409);
    let echo3: Echo = serde_json::from_str(results[3]["body"].as_str().unwrap()).unwrap();
    assert_eq!(echo3.body_len, 0);
}

#[test]
fn timeout_fails_only_slow_requests() {
    let addr = start_server();
    let batch = json!([
        { "method": "GET", "uri": format!("http://{addr}/echo?id=fast") },
        { "method": "GET", "uri": format!("http://{addr}/echo?id=slow&delay_ms=3000") },
    ]);
    let input = CString::new(batch.to_string()).unwrap();

    let started = Instant::now();
    let reply = take_reply(fanout_proc_with_timeout(input.as_ptr(), 250));
    assert!(started.elapsed().as_millis() < 2000);

    let results = reply.as_array().unwrap();
    assert_eq!(results[0]["status"], 200);
    assert_eq!(results[1]["status"], 500);
    let body: Value = serde_json::from_str(results[1]["body"].as_str().unwrap()).unwrap();
    assert_eq!(body["error"], "Error creating request: deadline exceeded");
}

#[test]
fn repeated_calls_share_the_runtime() {
    let addr = start_server();
    for round in 0..3 {
        let batch = json!([{ "method": "GET", "uri": format!("http://{addr}/echo?id={round}") }]);
        let reply = proc(&batch);
        assert_eq!(reply[0]["status"], 200, "round {round}");
    }
}
