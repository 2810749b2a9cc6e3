// tests/common/mod.rs
// One-request-per-connection HTTP server on 127.0.0.1 that replays canned
// responses in order and records what it was sent.
#![allow(dead_code)]

use std::io::{BufRead, BufReader, Read, Write};
use std::net::TcpListener;
use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use tr_scrape::config::options::{PolitenessOptions, Settings};

#[derive(Clone, Debug, Default)]
pub struct Request {
    pub method: String,
    pub target: String,
    pub headers: Vec<(String, String)>,
    pub body: String,
}

impl Request {
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }
}

#[derive(Clone, Debug)]
pub struct Reply {
    pub status: u16,
    pub headers: Vec<(String, String)>,
    pub body: Vec<u8>,
    /// Advertise this many bytes but send only `body` (simulates a cut transfer).
    pub claimed_len: Option<usize>,
    /// Read the request, then never answer; the connection is held until the client drops it.
    pub silent: bool,
}

impl Reply {
    pub fn html(body: &str) -> Self {
        Self::ok("text/html; charset=utf-8", body.as_bytes())
    }

    pub fn ok(content_type: &str, body: &[u8]) -> Self {
        Self {
            status: 200,
            headers: vec![("Content-Type".into(), content_type.into())],
            body: body.to_vec(),
            claimed_len: None,
            silent: false,
        }
    }

    pub fn status(status: u16) -> Self {
        Self { status, headers: Vec::new(), body: b"error".to_vec(), claimed_len: None, silent: false }
    }

    pub fn silent() -> Self {
        Self { silent: true, ..Self::status(200) }
    }

    pub fn with_header(mut self, name: &str, value: &str) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    pub fn truncated(mut self, claimed: usize) -> Self {
        self.claimed_len = Some(claimed);
        self
    }
}

pub struct Server {
    pub origin: String,
    pub requests: Arc<Mutex<Vec<Request>>>,
    handle: Option<JoinHandle<()>>,
}

impl Server {
    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.origin, path)
    }

    /// Requests seen so far; waits for the server thread to finish first.
    pub fn finish(mut self) -> Vec<Request> {
        if let Some(h) = self.handle.take() {
            h.join().unwrap();
        }
        self.requests.lock().unwrap().clone()
    }
}

pub fn serve(replies: Vec<Reply>) -> Server {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let origin = format!("http://{}", listener.local_addr().unwrap());
    let requests = Arc::new(Mutex::new(Vec::new()));
    let seen = Arc::clone(&requests);

    let handle = thread::spawn(move || {
        for reply in replies {
            let (mut stream, _) = listener.accept().unwrap();
            let mut reader = BufReader::new(stream.try_clone().unwrap());
            let req = read_request(&mut reader);
            seen.lock().unwrap().push(req);

            if reply.silent {
                let _ = stream.set_read_timeout(Some(Duration::from_secs(10)));
                let _ = reader.read_to_end(&mut Vec::new());
                continue;
            }

            let len = reply.claimed_len.unwrap_or(reply.body.len());
            let mut head = format!("HTTP/1.1 {} X\r\nContent-Length: {len}\r\nConnection: close\r\n", reply.status);
            for (k, v) in &reply.headers {
                head.push_str(&format!("{k}: {v}\r\n"));
            }
            head.push_str("\r\n");
            let _ = stream.write_all(head.as_bytes());
            let _ = stream.write_all(&reply.body);
            let _ = stream.flush();
        }
    });

    Server { origin, requests, handle: Some(handle) }
}

fn read_request<R: BufRead>(reader: &mut R) -> Request {
    let mut line = String::new();
    reader.read_line(&mut line).unwrap();
    let mut parts = line.split_whitespace();
    let method = parts.next().unwrap_or("").to_string();
    let target = parts.next().unwrap_or("").to_string();

    let mut headers = Vec::new();
    loop {
        let mut h = String::new();
        if reader.read_line(&mut h).unwrap() == 0 {
            break;
        }
        let h = h.trim_end();
        if h.is_empty() {
            break;
        }
        if let Some((k, v)) = h.split_once(':') {
            headers.push((k.trim().to_string(), v.trim().to_string()));
        }
    }

    let len = headers
        .iter()
        .find(|(k, _): &&(String, String)| k.eq_ignore_ascii_case("content-length"))
        .and_then(|(_, v)| v.parse::<usize>().ok())
        .unwrap_or(0);
    let mut body = vec![0u8; len];
    reader.read_exact(&mut body).unwrap();

    Request { method, target, headers, body: String::from_utf8_lossy(&body).into_owned() }
}

/// Settings pointed at `server`, with no pauses and quick retries.
pub fn settings_for(server: &Server) -> Settings {
    let mut s = Settings::default();
    s.portal.base_url = server.url("/cs/idcplg");
    s.portal.origin = server.origin.clone();
    s.politeness = PolitenessOptions::none();
    s.http.retry_backoff_ms = 10;
    s.http.request_timeout_secs = 10;
    s
}
