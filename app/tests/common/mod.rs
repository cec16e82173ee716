//! Test helper module for E2E tests
//!
//! Provides `TestFixture` for running the `gv` CLI in a temp directory and
//! `FakeGrepApp`, a local HTTP server that serves canned search pages.

#![allow(dead_code)] // Test helpers may not be used in all test modules
#![allow(deprecated)] // cargo_bin() deprecation - the new API requires more investigation

pub mod mcp;

use assert_cmd::Command;
use assert_fs::TempDir;
use std::io::{Read, Write};
use std::net::{TcpListener, TcpStream};
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use std::thread;

/// Test fixture providing a temporary directory for exported CSV files.
pub struct TestFixture {
    pub dir: TempDir,
}

impl TestFixture {
    /// Create a new test environment with a fresh temp directory
    pub fn new() -> Self {
        Self {
            dir: TempDir::new().unwrap(),
        }
    }

    pub fn root(&self) -> PathBuf {
        self.dir.path().to_path_buf()
    }

    /// Where `search` writes its CSV
    pub fn csv_path(&self) -> PathBuf {
        self.root().join("results.csv")
    }

    /// Create a Command for running `gv`
    pub fn gv(&self) -> Command {
        let mut cmd = Command::cargo_bin("gv").unwrap();
        cmd.current_dir(self.root());
        cmd.env_remove("GREPVAULT_ENDPOINT");
        cmd
    }

    /// Run `gv search` against `endpoint` with no pacing delay
    pub fn search(&self, endpoint: &str, query: &str, extra: &[&str]) -> std::process::Output {
        self.gv()
            .arg("search")
            .arg(query)
            .arg("--endpoint")
            .arg(endpoint)
            .arg("--delay-ms")
            .arg("0")
            .arg("--output")
            .arg(self.csv_path())
            .args(extra)
            .output()
            .expect("gv search failed")
    }

    /// Read the exported CSV, header included
    pub fn read_csv(&self) -> Vec<Vec<String>> {
        let mut reader = csv::ReaderBuilder::new()
            .has_headers(false)
            .from_path(self.csv_path())
            .unwrap();
        reader
            .records()
            .map(|r| r.unwrap().iter().map(str::to_string).collect())
            .collect()
    }
}

impl Default for TestFixture {
    fn default() -> Self {
        Self::new()
    }
}

/// One canned response, served for the page at the same (1-based) position.
#[derive(Clone)]
pub struct CannedPage {
    pub status: u16,
    pub body: String,
}

impl CannedPage {
    pub fn ok(body: String) -> Self {
        Self { status: 200, body }
    }

    pub fn status(status: u16) -> Self {
        Self {
            status,
            body: String::new(),
        }
    }
}

/// Minimal HTTP/1.1 server answering `GET /api/search?...&page=N`.
pub struct FakeGrepApp {
    port: u16,
    requests: Arc<Mutex<Vec<String>>>,
}

impl FakeGrepApp {
    pub fn start(pages: Vec<CannedPage>) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let port = listener.local_addr().unwrap().port();
        let requests = Arc::new(Mutex::new(Vec::new()));
        let seen = Arc::clone(&requests);

        thread::spawn(move || {
            for stream in listener.incoming() {
                let Ok(stream) = stream else { break };
                handle(stream, &pages, &seen);
            }
        });

        Self { port, requests }
    }

    pub fn endpoint(&self) -> String {
        format!("http://127.0.0.1:{}/api/search", self.port)
    }

    /// Request targets (path and query string) in arrival order
    pub fn requests(&self) -> Vec<String> {
        self.requests.lock().unwrap().clone()
    }

    pub fn requested_pages(&self) -> Vec<String> {
        self.requests()
            .iter()
            .filter_map(|target| query_param(target, "page"))
            .collect()
    }
}

fn handle(mut stream: TcpStream, pages: &[CannedPage], seen: &Mutex<Vec<String>>) {
    let mut buf = Vec::new();
    let mut chunk = [0u8; 1024];
    while !buf.windows(4).any(|w| w == b"\r\n\r\n") {
        match stream.read(&mut chunk) {
            Ok(0) | Err(_) => return,
            Ok(n) => buf.extend_from_slice(&chunk[..n]),
        }
    }

    let head = String::from_utf8_lossy(&buf);
    let target = head
        .lines()
        .next()
        .and_then(|line| line.split_whitespace().nth(1))
        .unwrap_or("/")
        .to_string();
    seen.lock().unwrap().push(target.clone());

    let page = query_param(&target, "page")
        .and_then(|p| p.parse::<usize>().ok())
        .unwrap_or(0);
    let canned = page
        .checked_sub(1)
        .and_then(|idx| pages.get(idx))
        .cloned()
        .unwrap_or_else(|| CannedPage::status(404));

    let response = format!(
        "HTTP/1.1 {} Canned\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
        canned.status,
        canned.body.len(),
        canned.body
    );
    let _ = stream.write_all(response.as_bytes());
    let _ = stream.flush();
}

pub fn query_param(target: &str, key: &str) -> Option<String> {
    let query = target.split_once('?')?.1;
    query.split('&').find_map(|pair| {
        let (k, v) = pair.split_once('=')?;
        (k == key).then(|| v.to_string())
    })
}

/// Snippet table with a single code row.
pub fn snippet(line_no: &str, code: &str) -> String {
    format!(
        r#"<table class="highlight-table"><tr data-line="{line_no}"><td><div class="lineno">{line_no}</div></td><td><div class="highlight"><pre>{code}</pre></div></td></tr></table>"#
    )
}

/// Search response body in grep.app's shape.
pub fn page_body(count: u64, entries: &[(&str, &str, String)]) -> String {
    let hits: Vec<serde_json::Value> = entries
        .iter()
        .map(|(repo, path, snippet)| {
            serde_json::json!({
                "repo": { "raw": repo },
                "path": { "raw": path },
                "content": { "snippet": snippet },
            })
        })
        .collect();
    serde_json::json!({ "facets": { "count": count }, "hits": { "hits": hits } }).to_string()
}
