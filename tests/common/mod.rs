// fake sockets shared by the integration tests
#![allow(dead_code)]

use rusty_ircc::{Event, EventBus, EventKind};
use std::collections::VecDeque;
use std::io;
use std::pin::Pin;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::task::{Context, Poll, Waker};
use tokio::io::{AsyncRead, AsyncWrite, ReadBuf};

pub type Log = Arc<Mutex<Vec<String>>>;

pub fn init_logger() {
    let _ = env_logger::builder().is_test(true).try_init();
}

pub fn new_log() -> Log {
    Arc::new(Mutex::new(Vec::new()))
}

pub fn snapshot(log: &Log) -> Vec<String> {
    log.lock().unwrap().clone()
}

pub const ALL_KINDS: [EventKind; 8] = [
    EventKind::Connect,
    EventKind::Welcome,
    EventKind::Join,
    EventKind::Part,
    EventKind::Ping,
    EventKind::Error,
    EventKind::Quit,
    EventKind::Disconnect,
];

/// Subscribes to every kind, pushing `event <Debug>` into `log`.
pub fn record_events(bus: &EventBus, log: &Log) {
    for kind in ALL_KINDS.iter() {
        let log = Arc::clone(log);
        bus.on(*kind, move |event: &Event| {
            log.lock().unwrap().push(format!("event {:?}", event));
        });
    }
}

/// Only the `event ...` entries of a log.
pub fn events_only(log: &Log) -> Vec<String> {
    snapshot(log)
        .into_iter()
        .filter(|entry| entry.starts_with("event "))
        .collect()
}

pub fn position(log: &[String], entry: &str) -> usize {
    log.iter()
        .position(|e| e == entry)
        .unwrap_or_else(|| panic!("{:?} not found in {:?}", entry, log))
}

/// Hands out pre-cut chunks, one per read, then end-of-stream.
pub struct ChunkedReader {
    chunks: VecDeque<Vec<u8>>,
    reads: Arc<AtomicUsize>,
}

impl ChunkedReader {
    pub fn new(chunks: Vec<Vec<u8>>) -> ChunkedReader {
        ChunkedReader {
            chunks: chunks.into(),
            reads: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn read_counter(&self) -> Arc<AtomicUsize> {
        Arc::clone(&self.reads)
    }
}

impl AsyncRead for ChunkedReader {
    fn poll_read(mut self: Pin<&mut Self>, _cx: &mut Context<'_>, buf: &mut ReadBuf<'_>) -> Poll<io::Result<()>> {
        self.reads.fetch_add(1, Ordering::SeqCst);
        if let Some(mut chunk) = self.chunks.pop_front() {
            let n = chunk.len().min(buf.remaining());
            buf.put_slice(&chunk[..n]);
            if n < chunk.len() {
                let rest = chunk.split_off(n);
                self.chunks.push_front(rest);
            }
        }
        Poll::Ready(Ok(()))
    }
}

/// A writer whose every write fails, like a socket the peer reset.
pub struct BrokenWriter;

impl AsyncWrite for BrokenWriter {
    fn poll_write(self: Pin<&mut Self>, _cx: &mut Context<'_>, _buf: &[u8]) -> Poll<io::Result<usize>> {
        Poll::Ready(Err(io::Error::new(io::ErrorKind::BrokenPipe, "broken pipe")))
    }

    fn poll_flush(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        Poll::Ready(Ok(()))
    }

    fn poll_shutdown(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        Poll::Ready(Ok(()))
    }
}

struct PeerState {
    inbound: VecDeque<u8>,
    // no more inbound data once `inbound` is drained
    closed: bool,
    // answer our QUIT the way servers do with an ERROR
    answer_quit: bool,
    // and hang up right after it
    hang_up_on_quit: bool,
    written: Vec<u8>,
    waker: Option<Waker>,
    log: Log,
}

/// In-memory server end of a connection.
///
/// Everything the client writes is logged as `> line` (terminator removed)
/// into the same log the event recorder uses, so write/publish ordering can
/// be checked. A shutdown of the write side is logged as `closed`.
#[derive(Clone)]
pub struct Peer {
    state: Arc<Mutex<PeerState>>,
}

impl Peer {
    fn with(log: &Log, script: &str, closed: bool, answer_quit: bool, hang_up_on_quit: bool) -> Peer {
        Peer {
            state: Arc::new(Mutex::new(PeerState {
                inbound: script.as_bytes().iter().copied().collect(),
                closed,
                answer_quit,
                hang_up_on_quit,
                written: Vec::new(),
                waker: None,
                log: Arc::clone(log),
            })),
        }
    }

    /// Sends `script` and then closes the connection.
    pub fn scripted(log: &Log, script: &str) -> Peer {
        Peer::with(log, script, true, false, false)
    }

    /// Sends `script`, then stays open until QUIT arrives.
    pub fn server(log: &Log, script: &str) -> Peer {
        Peer::with(log, script, false, true, true)
    }

    /// Answers QUIT with ERROR but keeps the socket open regardless.
    pub fn lingering(log: &Log) -> Peer {
        Peer::with(log, "", false, true, false)
    }

    /// Stays open and silent until told otherwise; QUIT is not answered.
    pub fn silent(log: &Log) -> Peer {
        Peer::with(log, "", false, false, false)
    }

    pub fn push(&self, data: &str) {
        let mut state = self.state.lock().unwrap();
        state.inbound.extend(data.as_bytes());
        if let Some(waker) = state.waker.take() {
            waker.wake();
        }
    }

    pub fn hang_up(&self) {
        let mut state = self.state.lock().unwrap();
        state.closed = true;
        if let Some(waker) = state.waker.take() {
            waker.wake();
        }
    }
}

impl AsyncRead for Peer {
    fn poll_read(self: Pin<&mut Self>, cx: &mut Context<'_>, buf: &mut ReadBuf<'_>) -> Poll<io::Result<()>> {
        let mut state = self.state.lock().unwrap();
        if !state.inbound.is_empty() {
            let n = state.inbound.len().min(buf.remaining());
            let chunk: Vec<u8> = state.inbound.drain(..n).collect();
            buf.put_slice(&chunk);
            Poll::Ready(Ok(()))
        } else if state.closed {
            Poll::Ready(Ok(()))
        } else {
            state.waker = Some(cx.waker().clone());
            Poll::Pending
        }
    }
}

impl AsyncWrite for Peer {
    fn poll_write(self: Pin<&mut Self>, _cx: &mut Context<'_>, buf: &[u8]) -> Poll<io::Result<usize>> {
        let mut state = self.state.lock().unwrap();
        state.written.extend_from_slice(buf);
        while let Some(i) = state.written.windows(2).position(|w| w == b"\r\n") {
            let line = String::from_utf8_lossy(&state.written[..i]).to_string();
            state.written.drain(..i + 2);
            state.log.lock().unwrap().push(format!("> {}", line));
            if state.answer_quit && line.starts_with("QUIT") {
                state.inbound.extend(b"ERROR :Closing Link: bot (Client Quit)\r\n");
                state.closed = state.hang_up_on_quit;
                if let Some(waker) = state.waker.take() {
                    waker.wake();
                }
            }
        }
        Poll::Ready(Ok(buf.len()))
    }

    fn poll_flush(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        Poll::Ready(Ok(()))
    }

    fn poll_shutdown(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        let state = self.state.lock().unwrap();
        state.log.lock().unwrap().push("closed".to_string());
        Poll::Ready(Ok(()))
    }
}
