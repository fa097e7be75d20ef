use std::io::{BufRead, BufReader, Write};
use std::net::TcpStream;
use std::thread;
use std::time::Duration;

use calltrace::api::server::{start_server, ApiContext};
use serde_json::{json, Value};

#[test]
fn test_ipc_server_lifecycle() {
    // 1. Start server in background thread
    let port = 4655; // Use non-standard port for test
    thread::spawn(move || {
        let context = ApiContext::new("python3".to_string(), None, 64);
        if let Err(e) = start_server(port, context) {
            eprintln!("Server failed: {}", e);
        }
    });

    // Give server a moment to start
    thread::sleep(Duration::from_millis(500));

    // 2. Connect client
    let mut stream = TcpStream::connect(format!("127.0.0.1:{}", port))
        .expect("Failed to connect to server");

    let mut reader = BufReader::new(stream.try_clone().unwrap());

    // 3. PING
    let ping_cmd = r#"{"command": "PING"}"#;
    stream.write_all(ping_cmd.as_bytes()).unwrap();
    stream.write_all(b"\n").unwrap();

    let mut response = String::new();
    reader.read_line(&mut response).unwrap();
    assert!(response.contains("PONG"));
    assert!(response.contains("success"));

    // 4. ANALYZE a ready-made AST dump and check the tree comes back
    let dir = tempfile::tempdir().unwrap();
    let dump_path = dir.path().join("app.ast.json");
    let ast = json!({"type": "Module", "body": [
        {"type": "FunctionDef", "name": "main", "lineno": 1, "end_lineno": 3, "body": [
            {"type": "Expr", "value": {"type": "Call", "func": {"type": "Name", "id": "helper"}}},
        ]},
        {"type": "FunctionDef", "name": "helper", "lineno": 5, "end_lineno": 6, "body": []},
    ]});
    std::fs::write(&dump_path, serde_json::to_string(&ast).unwrap()).unwrap();

    let analyze_cmd = json!({
        "command": "ANALYZE",
        "params": {"path": dump_path.to_str().unwrap(), "function": "main"}
    });
    stream
        .write_all(serde_json::to_string(&analyze_cmd).unwrap().as_bytes())
        .unwrap();
    stream.write_all(b"\n").unwrap();

    response.clear();
    reader.read_line(&mut response).unwrap();
    let parsed: Value = serde_json::from_str(&response).unwrap();
    assert_eq!(parsed["status"], "success");
    assert_eq!(parsed["data"]["root"], "main");
    assert_eq!(parsed["data"]["max_depth"], 2);
    assert_eq!(parsed["data"]["tree"]["label"], "main");
    assert_eq!(parsed["data"]["tree"]["children"][0]["label"], "helper");

    // 5. REROOT against the cached graph, no re-parse
    let reroot_cmd = json!({
        "command": "REROOT",
        "params": {"path": dump_path.to_str().unwrap(), "function": "helper"}
    });
    stream
        .write_all(serde_json::to_string(&reroot_cmd).unwrap().as_bytes())
        .unwrap();
    stream.write_all(b"\n").unwrap();

    response.clear();
    reader.read_line(&mut response).unwrap();
    let parsed: Value = serde_json::from_str(&response).unwrap();
    assert_eq!(parsed["status"], "success");
    assert_eq!(parsed["data"]["root"], "helper");

    // 6. Cursor-line root selection via the stored spans
    let line_cmd = json!({
        "command": "REROOT",
        "params": {"path": dump_path.to_str().unwrap(), "line": 2}
    });
    stream
        .write_all(serde_json::to_string(&line_cmd).unwrap().as_bytes())
        .unwrap();
    stream.write_all(b"\n").unwrap();

    response.clear();
    reader.read_line(&mut response).unwrap();
    let parsed: Value = serde_json::from_str(&response).unwrap();
    assert_eq!(parsed["data"]["root"], "main");

    // 7. ANALYZE a missing path must report an error, not crash
    let bad_cmd = r#"{"command": "ANALYZE", "params": {"path": "/invalid/path/app.py", "function": "main"}}"#;
    stream.write_all(bad_cmd.as_bytes()).unwrap();
    stream.write_all(b"\n").unwrap();

    response.clear();
    reader.read_line(&mut response).unwrap();
    assert!(response.contains("error"));
    assert!(response.contains("Source path not found"));

    // NOTE: SHUTDOWN is deliberately not sent here; it exits the whole test
    // process. The connection close below exercises the loop exit instead.
}
