//! In-process similarity service for integration tests
//!
//! A minimal HTTP/1.1 server speaking the reference API:
//! - POST /add_person           - store `{name, features}` (400 on wrong length)
//! - GET  /get_similar_person   - rank stored identities by cosine similarity
//!
//! Writes can be made visible only after a delay to mimic asynchronous indexing.

#![allow(dead_code)]

use parking_lot::RwLock;
use std::io::{BufRead, BufReader, Read, Write};
use std::net::{SocketAddr, TcpListener, TcpStream};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

struct Stored {
    name: String,
    features: Vec<f64>,
    visible_at: Instant,
}

struct State {
    features_length: usize,
    index_delay: Duration,
    store: RwLock<Vec<Stored>>,
    registrations: AtomicUsize,
    queries: AtomicUsize,
}

/// Handle to a running mock service. The listener thread is detached and
/// lives until the test process exits.
pub struct MockSimilarityService {
    addr: SocketAddr,
    state: Arc<State>,
}

impl MockSimilarityService {
    pub fn start(features_length: usize) -> Self {
        Self::with_index_delay(features_length, Duration::ZERO)
    }

    /// Stored identities only show up in queries `delay` after registration
    pub fn with_index_delay(features_length: usize, delay: Duration) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").expect("Failed to bind");
        let addr = listener.local_addr().expect("No local address");
        let state = Arc::new(State {
            features_length,
            index_delay: delay,
            store: RwLock::new(Vec::new()),
            registrations: AtomicUsize::new(0),
            queries: AtomicUsize::new(0),
        });

        let accept_state = Arc::clone(&state);
        thread::spawn(move || {
            for stream in listener.incoming() {
                match stream {
                    Ok(stream) => {
                        let state = Arc::clone(&accept_state);
                        thread::spawn(move || handle_connection(stream, &state));
                    }
                    Err(e) => eprintln!("Connection error: {}", e),
                }
            }
        });

        Self { addr, state }
    }

    pub fn url(&self) -> String {
        format!("http://{}", self.addr)
    }

    /// Number of identities stored (visible or not)
    pub fn len(&self) -> usize {
        self.state.store.read().len()
    }

    pub fn names(&self) -> Vec<String> {
        self.state.store.read().iter().map(|s| s.name.clone()).collect()
    }

    pub fn registrations(&self) -> usize {
        self.state.registrations.load(Ordering::SeqCst)
    }

    pub fn queries(&self) -> usize {
        self.state.queries.load(Ordering::SeqCst)
    }
}

/// An address nothing listens on
pub fn closed_port_url() -> String {
    let listener = TcpListener::bind("127.0.0.1:0").expect("Failed to bind");
    let addr = listener.local_addr().expect("No local address");
    drop(listener);
    format!("http://{}", addr)
}

fn handle_connection(mut stream: TcpStream, state: &State) {
    let mut reader = BufReader::new(&stream);

    let mut request_line = String::new();
    if reader.read_line(&mut request_line).is_err() {
        return;
    }

    let parts: Vec<&str> = request_line.split_whitespace().collect();
    if parts.len() < 2 {
        send_response(&mut stream, 400, "Bad Request", "text/plain", "Invalid request line");
        return;
    }
    let method = parts[0].to_string();
    let target = parts[1].to_string();

    let mut content_length: usize = 0;
    loop {
        let mut header = String::new();
        if reader.read_line(&mut header).is_err() {
            break;
        }
        let header = header.trim();
        if header.is_empty() {
            break;
        }
        if header.to_lowercase().starts_with("content-length:") {
            if let Some(len_str) = header.split(':').nth(1) {
                content_length = len_str.trim().parse().unwrap_or(0);
            }
        }
    }

    let mut body = vec![0u8; content_length];
    if content_length > 0 && reader.read_exact(&mut body).is_err() {
        return;
    }

    let (path, query) = match target.split_once('?') {
        Some((p, q)) => (p, q),
        None => (target.as_str(), ""),
    };

    match (method.as_str(), path) {
        ("POST", "/add_person") => handle_add(&mut stream, state, &body),
        ("GET", "/get_similar_person") => handle_similar(&mut stream, state, query),
        _ => send_response(&mut stream, 404, "Not Found", "text/plain", "Endpoint not found"),
    }
}

fn handle_add(stream: &mut TcpStream, state: &State, body: &[u8]) {
    state.registrations.fetch_add(1, Ordering::SeqCst);

    let value: serde_json::Value = match serde_json::from_slice(body) {
        Ok(v) => v,
        Err(e) => {
            let msg = format!("Invalid request payload: {}", e);
            send_response(stream, 400, "Bad Request", "text/plain", &msg);
            return;
        }
    };
    let name = value["name"].as_str().unwrap_or_default().to_string();
    let features: Vec<f64> = value["features"]
        .as_array()
        .map(|arr| arr.iter().filter_map(|v| v.as_f64()).collect())
        .unwrap_or_default();

    if name.is_empty() || features.len() != state.features_length {
        let msg = format!("Features must be an array of size {}", state.features_length);
        send_response(stream, 400, "Bad Request", "text/plain", &msg);
        return;
    }

    state.store.write().push(Stored {
        name,
        features,
        visible_at: Instant::now() + state.index_delay,
    });
    send_response(stream, 200, "OK", "application/json", r#"{"status":"success"}"#);
}

fn handle_similar(stream: &mut TcpStream, state: &State, query: &str) {
    state.queries.fetch_add(1, Ordering::SeqCst);

    let mut features = Vec::new();
    let mut top_n: usize = 3;
    for pair in query.split('&').filter(|p| !p.is_empty()) {
        let (key, value) = pair.split_once('=').unwrap_or((pair, ""));
        match key {
            "features" => match value.parse::<f64>() {
                Ok(f) => features.push(f),
                Err(e) => {
                    let msg = format!("Invalid features value: {}", e);
                    send_response(stream, 400, "Bad Request", "text/plain", &msg);
                    return;
                }
            },
            "top_n" => match value.parse::<usize>() {
                Ok(n) if n > 0 => top_n = n,
                _ => {
                    let msg = "Invalid top_n value: must be a positive integer";
                    send_response(stream, 400, "Bad Request", "text/plain", msg);
                    return;
                }
            },
            _ => {}
        }
    }

    if features.len() != state.features_length {
        let msg = format!("Features must be an array of size {}", state.features_length);
        send_response(stream, 400, "Bad Request", "text/plain", &msg);
        return;
    }

    let now = Instant::now();
    let mut matches: Vec<(String, Vec<f64>, f64)> = state
        .store
        .read()
        .iter()
        .filter(|s| s.visible_at <= now)
        .map(|s| (s.name.clone(), s.features.clone(), cosine(&features, &s.features)))
        .collect();
    matches.sort_by(|a, b| b.2.partial_cmp(&a.2).unwrap_or(std::cmp::Ordering::Equal));
    matches.truncate(top_n);

    let persons = if matches.is_empty() {
        serde_json::Value::Null
    } else {
        matches
            .into_iter()
            .map(|(name, features, score)| {
                serde_json::json!({
                    "Person": { "Name": name, "Features": features },
                    "Score": score
                })
            })
            .collect()
    };
    let body = serde_json::json!({ "persons": persons }).to_string();
    send_response(stream, 200, "OK", "application/json", &body);
}

fn cosine(a: &[f64], b: &[f64]) -> f64 {
    if a.len() != b.len() {
        return 0.0;
    }
    let dot: f64 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let norm_a: f64 = a.iter().map(|x| x * x).sum::<f64>().sqrt();
    let norm_b: f64 = b.iter().map(|x| x * x).sum::<f64>().sqrt();
    if norm_a > 0.0 && norm_b > 0.0 {
        dot / (norm_a * norm_b)
    } else {
        0.0
    }
}

fn send_response(stream: &mut TcpStream, status: u16, status_text: &str, content_type: &str, body: &str) {
    let response = format!(
        "HTTP/1.1 {} {}\r\n\
         Content-Type: {}\r\n\
         Content-Length: {}\r\n\
         Connection: close\r\n\
         \r\n\
         {}",
        status,
        status_text,
        content_type,
        body.len(),
        body
    );
    let _ = stream.write_all(response.as_bytes());
    let _ = stream.flush();
}
