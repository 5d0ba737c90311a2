/*!
 * Loopback HTTP/1.1 collector for integration tests.
 *
 * Accepts one connection per scripted step, records the request, then
 * either answers and closes or holds the connection open without a word,
 * noting when the client gives up on it.
 */
#![allow(dead_code)]

use std::io::{BufRead, BufReader, ErrorKind, Read, Write};
use std::net::{SocketAddr, TcpListener, TcpStream};
use std::thread;
use std::time::Duration;

use crossbeam_channel::{Receiver, Sender};

/// One request as the collector saw it.
#[derive(Debug, Clone)]
pub struct Recorded {
    pub method: String,
    pub path: String,
    pub headers: Vec<(String, String)>,
    pub body: String,
}

impl Recorded {
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }
}

/// What the collector does with the next connection.
pub enum Step {
    Respond {
        status: u16,
        headers: Vec<(&'static str, String)>,
        body: Vec<u8>,
        /// Runs once the response is written and the connection closed.
        after: Option<Box<dyn FnOnce() + Send>>,
    },
    /// Read the request, then never answer.
    Hang,
}

impl Step {
    pub fn ok(body: &str) -> Self {
        Step::status(200, body)
    }

    pub fn status(status: u16, body: &str) -> Self {
        Step::bytes(status, body.as_bytes())
    }

    pub fn bytes(status: u16, body: &[u8]) -> Self {
        Step::Respond {
            status,
            headers: Vec::new(),
            body: body.to_vec(),
            after: None,
        }
    }

    pub fn with_header(mut self, name: &'static str, value: impl Into<String>) -> Self {
        if let Step::Respond { headers, .. } = &mut self {
            headers.push((name, value.into()));
        }
        self
    }

    pub fn then(mut self, action: impl FnOnce() + Send + 'static) -> Self {
        if let Step::Respond { after, .. } = &mut self {
            *after = Some(Box::new(action));
        }
        self
    }
}

pub struct TestServer {
    pub addr: SocketAddr,
    requests: Receiver<Recorded>,
    hangups: Receiver<()>,
}

impl TestServer {
    /**
     * Binds `127.0.0.1:0` and serves the steps returned by `script`, which
     * receives the bound address (handy for redirect targets).
     */
    pub fn start(script: impl FnOnce(SocketAddr) -> Vec<Step>) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").expect("bind loopback");
        let addr = listener.local_addr().expect("local addr");
        let steps = script(addr);
        let (tx, rx) = crossbeam_channel::unbounded();
        let (hangup_tx, hangup_rx) = crossbeam_channel::unbounded();

        thread::spawn(move || serve(listener, steps, tx, hangup_tx));

        Self {
            addr,
            requests: rx,
            hangups: hangup_rx,
        }
    }

    pub fn url(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }

    /// Waits for the next recorded request.
    pub fn next_request(&self) -> Recorded {
        self.requests
            .recv_timeout(Duration::from_secs(5))
            .expect("collector received no request")
    }

    /// The next recorded request, if one arrives within `wait`.
    pub fn request_within(&self, wait: Duration) -> Option<Recorded> {
        self.requests.recv_timeout(wait).ok()
    }

    /// `true` once the client closes a connection held open by `Step::Hang`.
    pub fn hung_up_within(&self, wait: Duration) -> bool {
        self.hangups.recv_timeout(wait).is_ok()
    }
}

/// Address nobody listens on.
pub fn closed_port_url() -> String {
    let listener = TcpListener::bind("127.0.0.1:0").expect("bind loopback");
    let addr = listener.local_addr().expect("local addr");
    drop(listener);
    format!("http://{addr}/")
}

fn serve(listener: TcpListener, steps: Vec<Step>, tx: Sender<Recorded>, hangups: Sender<()>) {
    for step in steps {
        let Ok((stream, _)) = listener.accept() else {
            return;
        };
        let mut reader = BufReader::new(stream);
        let Some(recorded) = read_request(&mut reader) else {
            continue;
        };
        let _ = tx.send(recorded);
        let mut stream = reader.into_inner();

        match step {
            Step::Respond {
                status,
                headers,
                body,
                after,
            } => {
                write_response(&mut stream, status, &headers, &body);
                drop(stream);
                if let Some(action) = after {
                    action();
                }
            }
            Step::Hang => {
                if wait_for_hangup(&mut stream) {
                    let _ = hangups.send(());
                }
            }
        }
    }
}

fn read_request(reader: &mut BufReader<TcpStream>) -> Option<Recorded> {
    let mut line = String::new();
    reader.read_line(&mut line).ok()?;
    let mut parts = line.split_whitespace();
    let method = parts.next()?.to_string();
    let path = parts.next()?.to_string();

    let mut headers = Vec::new();
    loop {
        let mut line = String::new();
        reader.read_line(&mut line).ok()?;
        let line = line.trim_end();
        if line.is_empty() {
            break;
        }
        if let Some((name, value)) = line.split_once(':') {
            headers.push((name.trim().to_string(), value.trim().to_string()));
        }
    }

    let length = headers
        .iter()
        .find(|(n, _)| n.eq_ignore_ascii_case("content-length"))
        .and_then(|(_, v)| v.parse::<usize>().ok())
        .unwrap_or(0);
    let mut body = vec![0; length];
    reader.read_exact(&mut body).ok()?;

    Some(Recorded {
        method,
        path,
        headers,
        body: String::from_utf8_lossy(&body).into_owned(),
    })
}

/// Blocks until the peer closes or resets the connection, up to a minute.
fn wait_for_hangup(stream: &mut TcpStream) -> bool {
    let _ = stream.set_read_timeout(Some(Duration::from_secs(60)));
    let mut buf = [0; 256];
    loop {
        match stream.read(&mut buf) {
            Ok(0) => return true,
            Ok(_) => continue,
            Err(err) => {
                return matches!(
                    err.kind(),
                    ErrorKind::ConnectionReset | ErrorKind::ConnectionAborted
                )
            }
        }
    }
}

fn write_response(stream: &mut TcpStream, status: u16, headers: &[(&str, String)], body: &[u8]) {
    let reason = match status {
        200 => "OK",
        204 => "No Content",
        302 => "Found",
        404 => "Not Found",
        _ => "Status",
    };

    let mut head = format!(
        "HTTP/1.1 {status} {reason}\r\nContent-Length: {}\r\nConnection: close\r\n",
        body.len()
    );
    for (name, value) in headers {
        head.push_str(&format!("{name}: {value}\r\n"));
    }
    head.push_str("\r\n");

    let _ = stream.write_all(head.as_bytes());
    let _ = stream.write_all(body);
    let _ = stream.flush();
}
