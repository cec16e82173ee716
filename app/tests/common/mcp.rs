use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};
use std::process::{Child, ChildStdin, Command, Stdio};
use std::sync::mpsc;
use std::thread;
use std::time::Duration;

use serde_json::Value;

pub struct McpServerProcess {
    child: Child,
    stdin: ChildStdin,
    rx: mpsc::Receiver<String>,
    pub log_path: Option<PathBuf>,
}

impl McpServerProcess {
    pub fn spawn(output_dir: &Path, endpoint: &str) -> Self {
        Self::spawn_with_log(output_dir, endpoint, None)
    }

    pub fn spawn_with_log(output_dir: &Path, endpoint: &str, log_path: Option<PathBuf>) -> Self {
        let mut cmd = Command::new(env!("CARGO_BIN_EXE_gv"));
        cmd.arg("server")
            .arg("--output-dir")
            .arg(output_dir)
            .arg("--endpoint")
            .arg(endpoint)
            .arg("--delay-ms")
            .arg("0")
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::null());

        if let Some(path) = log_path.as_ref() {
            cmd.env("GREPVAULT_LOG_PATH", path);
        }

        let mut child = cmd.spawn().expect("Failed to start gv server");

        let stdin = child.stdin.take().expect("Failed to take stdin");
        let stdout = child.stdout.take().expect("Failed to take stdout");

        let (tx, rx) = mpsc::channel::<String>();
        thread::spawn(move || {
            let mut reader = BufReader::new(stdout);
            loop {
                let mut line = String::new();
                match reader.read_line(&mut line) {
                    Ok(0) => break,
                    Ok(_) => {
                        let _ = tx.send(line);
                    }
                    Err(_) => break,
                }
            }
        });

        Self {
            child,
            stdin,
            rx,
            log_path,
        }
    }

    pub fn send_line(&mut self, line: &str) {
        writeln!(self.stdin, "{line}").expect("Failed to write to server stdin");
        self.stdin.flush().expect("Failed to flush server stdin");
    }

    pub fn recv_json(&mut self, timeout: Duration) -> Option<Value> {
        let line = self.rx.recv_timeout(timeout).ok()?;
        serde_json::from_str::<Value>(line.trim()).ok()
    }

    pub fn initialize(&mut self) -> Value {
        let init_request = r#"{"jsonrpc":"2.0","id":1,"method":"initialize","params":{"protocolVersion":"2024-11-05","capabilities":{},"clientInfo":{"name":"test","version":"1.0"}}}"#;
        self.send_line(init_request);
        let resp = self
            .recv_json(Duration::from_secs(5))
            .expect("No initialize response from server");

        // MCP requires a `notifications/initialized` notification after successful initialize.
        let initialized = r#"{"jsonrpc":"2.0","method":"notifications/initialized","params":{}}"#;
        self.send_line(initialized);

        resp
    }

    pub fn call_tool(&mut self, id: u64, name: &str, arguments: Value) -> Value {
        let req = serde_json::json!({
            "jsonrpc": "2.0",
            "id": id,
            "method": "tools/call",
            "params": { "name": name, "arguments": arguments },
        });
        self.send_line(&req.to_string());

        let deadline = Duration::from_secs(20);
        let start = std::time::Instant::now();
        loop {
            let remaining = deadline.saturating_sub(start.elapsed());
            let Some(msg) = self.recv_json(remaining) else {
                panic!("Timed out waiting for tools/call response");
            };
            if msg.get("id").and_then(|v| v.as_u64()) == Some(id) {
                return msg;
            }
        }
    }

    pub fn list_tools(&mut self, id: u64) -> Value {
        let req = format!(r#"{{"jsonrpc":"2.0","id":{id},"method":"tools/list","params":{{}}}}"#);
        self.send_line(&req);
        loop {
            let msg = self
                .recv_json(Duration::from_secs(5))
                .expect("Timed out waiting for tools/list response");
            if msg.get("id").and_then(|v| v.as_u64()) == Some(id) {
                return msg;
            }
        }
    }

    pub fn kill(&mut self) {
        let _ = self.child.kill();
        let _ = self.child.wait();
    }
}

impl Drop for McpServerProcess {
    fn drop(&mut self) {
        self.kill();
    }
}

/// Concatenated text items of a tools/call result.
pub fn response_text_blob(resp: &Value) -> String {
    let mut out = String::new();
    let Some(contents) = resp
        .get("result")
        .and_then(|r| r.get("content"))
        .and_then(|c| c.as_array())
    else {
        return out;
    };

    for item in contents {
        if let Some(text) = item.get("text").and_then(|t| t.as_str()) {
            out.push_str(text);
            out.push('\n');
        }
    }
    out
}
