//! Outbound notification channel.
//!
//! The session reports recording start and each pulse outcome as one
//! UTF-8 text line. Delivery is best effort: the session logs a
//! [`TransportError`] and keeps going.
//!
//! # Connection lifecycle
//!
//! [`TcpChannel`] never touches the socket on the caller's thread.
//! `send_line` only enqueues onto a bounded queue; a worker thread owns
//! at most one connection:
//!
//! 1. `Idle`: nothing is open yet. The worker connects with a bounded
//!    timeout when the first line arrives.
//! 2. `Open`: lines are written with a bounded write timeout. A failed
//!    connect or write is logged, the connection is dropped, and the next
//!    line reconnects.
//! 3. `Closed`: terminal. Entered by `close()` at session end, which
//!    drains the queue and joins the worker; further sends fail with
//!    [`TransportError::Closed`].

use std::io::Write;
use std::net::{TcpStream, ToSocketAddrs};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use crossbeam_channel::{Receiver, Sender, TrySendError, bounded};
use tracing::{debug, info, warn};

use crate::config::NotifyConfig;
use crate::error::TransportError;

/// Lines that may wait for the worker before `send_line` reports
/// [`TransportError::QueueFull`].
pub const SEND_QUEUE_CAPACITY: usize = 64;

/// Sends text lines to an external listener.
pub trait NotificationChannel {
    /// Send one line. A trailing newline is added by the channel.
    ///
    /// Must not block the frame loop.
    ///
    /// # Errors
    ///
    /// Returns a [`TransportError`] if the line cannot be accepted.
    fn send_line(&mut self, line: &str) -> Result<(), TransportError>;

    /// Release the connection. Idempotent.
    fn close(&mut self);
}

impl<C: NotificationChannel + ?Sized> NotificationChannel for Box<C> {
    fn send_line(&mut self, line: &str) -> Result<(), TransportError> {
        (**self).send_line(line)
    }

    fn close(&mut self) {
        (**self).close();
    }
}

/// Lifecycle state of a [`TcpChannel`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChannelState {
    /// No connection; the next line connects.
    Idle,
    /// Connected.
    Open,
    /// Closed for good.
    Closed,
}

/// Connection status shared between a [`TcpChannel`] and its worker.
#[derive(Debug, Default)]
struct LinkStatus {
    connected: AtomicBool,
    failures: AtomicU32,
}

/// Lazily-connected TCP line sender backed by a worker thread.
#[derive(Debug)]
pub struct TcpChannel {
    address: String,
    queue: Option<Sender<String>>,
    worker: Option<JoinHandle<()>>,
    status: Arc<LinkStatus>,
}

impl TcpChannel {
    /// Create a channel for `address` (`host:port`) and start its worker.
    /// Nothing is opened until the first line is sent.
    pub fn new(
        address: impl Into<String>,
        connect_timeout: Duration,
        write_timeout: Duration,
    ) -> Self {
        let address = address.into();
        let status = Arc::new(LinkStatus::default());
        let (queue, lines) = bounded::<String>(SEND_QUEUE_CAPACITY);

        let worker = LinkWorker {
            address: address.clone(),
            // Zero timeouts are rejected by the socket API.
            connect_timeout: connect_timeout.max(Duration::from_millis(1)),
            write_timeout: write_timeout.max(Duration::from_millis(1)),
            stream: None,
            status: Arc::clone(&status),
        };
        let worker = thread::spawn(move || worker.run(&lines));

        Self {
            address,
            queue: Some(queue),
            worker: Some(worker),
            status,
        }
    }

    /// Create a channel from the `notify` config section.
    pub fn from_config(config: &NotifyConfig) -> Self {
        Self::new(
            config.address.clone(),
            Duration::from_millis(config.connect_timeout_ms),
            Duration::from_millis(config.write_timeout_ms),
        )
    }

    /// Target address.
    pub fn address(&self) -> &str {
        &self.address
    }

    /// Current lifecycle state.
    pub fn state(&self) -> ChannelState {
        if self.queue.is_none() {
            ChannelState::Closed
        } else if self.status.connected.load(Ordering::Acquire) {
            ChannelState::Open
        } else {
            ChannelState::Idle
        }
    }

    /// Lines the worker failed to deliver so far.
    pub fn delivery_failures(&self) -> u32 {
        self.status.failures.load(Ordering::Acquire)
    }
}

impl NotificationChannel for TcpChannel {
    fn send_line(&mut self, line: &str) -> Result<(), TransportError> {
        let Some(queue) = &self.queue else {
            return Err(TransportError::Closed);
        };
        match queue.try_send(line.to_owned()) {
            Ok(()) => Ok(()),
            Err(TrySendError::Full(_)) => Err(TransportError::QueueFull {
                address: self.address.clone(),
                capacity: SEND_QUEUE_CAPACITY,
            }),
            Err(TrySendError::Disconnected(_)) => Err(TransportError::Closed),
        }
    }

    fn close(&mut self) {
        // Dropping the sender ends the worker once the queue is drained.
        if self.queue.take().is_some()
            && let Some(worker) = self.worker.take()
        {
            if worker.join().is_err() {
                warn!(address = %self.address, "Notification worker panicked");
            }
            info!(address = %self.address, "Notification channel closed");
        }
    }
}

impl Drop for TcpChannel {
    fn drop(&mut self) {
        self.close();
    }
}

/// Worker side of a [`TcpChannel`]: owns the socket.
struct LinkWorker {
    address: String,
    connect_timeout: Duration,
    write_timeout: Duration,
    stream: Option<TcpStream>,
    status: Arc<LinkStatus>,
}

impl LinkWorker {
    fn run(mut self, lines: &Receiver<String>) {
        for line in lines {
            if let Err(err) = self.deliver(&line) {
                self.status.failures.fetch_add(1, Ordering::AcqRel);
                warn!(error = %err, line = %line, "Notification not delivered");
            }
        }
        if self.stream.take().is_some() {
            self.status.connected.store(false, Ordering::Release);
            debug!(address = %self.address, "Notification connection released");
        }
    }

    fn deliver(&mut self, line: &str) -> Result<(), TransportError> {
        let mut stream = match self.stream.take() {
            Some(stream) => stream,
            None => {
                let stream = self.connect()?;
                self.status.connected.store(true, Ordering::Release);
                stream
            }
        };

        let payload = format!("{line}\n");
        match stream.write_all(payload.as_bytes()).and_then(|()| stream.flush()) {
            Ok(()) => {
                debug!(address = %self.address, line, "Notification sent");
                self.stream = Some(stream);
                Ok(())
            }
            // The stream is dropped here; the next line reconnects.
            Err(source) => {
                self.status.connected.store(false, Ordering::Release);
                Err(TransportError::Write {
                    address: self.address.clone(),
                    source,
                })
            }
        }
    }

    fn connect(&self) -> Result<TcpStream, TransportError> {
        let addr = self
            .address
            .to_socket_addrs()
            .map_err(|source| TransportError::Connect {
                address: self.address.clone(),
                source,
            })?
            .next()
            .ok_or_else(|| TransportError::Unresolved {
                address: self.address.clone(),
            })?;

        let stream = TcpStream::connect_timeout(&addr, self.connect_timeout).map_err(|source| {
            TransportError::Connect {
                address: self.address.clone(),
                source,
            }
        })?;
        stream
            .set_write_timeout(Some(self.write_timeout))
            .map_err(|source| TransportError::Connect {
                address: self.address.clone(),
                source,
            })?;
        // Lines are tiny; send them straight away.
        stream
            .set_nodelay(true)
            .map_err(|source| TransportError::Connect {
                address: self.address.clone(),
                source,
            })?;

        info!(address = %self.address, "Notification channel connected");
        Ok(stream)
    }
}


/// Channel that accepts and discards every line. Used when
/// notifications are disabled.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullChannel;

impl NotificationChannel for NullChannel {
    fn send_line(&mut self, line: &str) -> Result<(), TransportError> {
        debug!(line, "Notification discarded (channel disabled)");
        Ok(())
    }

    fn close(&mut self) {}
}

/// In-memory channel that records lines. Can be told to fail, which is
/// how tests exercise the swallow-and-continue path.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MemoryChannel {
    lines: Vec<String>,
    failing: bool,
    closed: bool,
    failures: u32,
}

impl MemoryChannel {
    /// An empty, healthy channel.
    pub fn new() -> Self {
        Self::default()
    }

    /// A channel whose every send fails with a write error.
    pub fn failing() -> Self {
        Self {
            failing: true,
            ..Self::default()
        }
    }

    /// Lines delivered so far, without trailing newlines.
    pub fn lines(&self) -> &[String] {
        &self.lines
    }

    /// Number of sends that failed.
    pub const fn failures(&self) -> u32 {
        self.failures
    }

    /// Whether `close` has been called.
    pub const fn is_closed(&self) -> bool {
        self.closed
    }
}

impl NotificationChannel for MemoryChannel {
    fn send_line(&mut self, line: &str) -> Result<(), TransportError> {
        if self.closed {
            return Err(TransportError::Closed);
        }
        if self.failing {
            self.failures = self.failures.saturating_add(1);
            return Err(TransportError::Write {
                address: "memory".to_owned(),
                source: std::io::Error::new(std::io::ErrorKind::BrokenPipe, "simulated failure"),
            });
        }
        self.lines.push(line.to_owned());
        Ok(())
    }

    fn close(&mut self) {
        self.closed = true;
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::io::{BufRead, BufReader};
    use std::net::TcpListener;
    use std::time::Instant;

    use super::*;

    #[test]
    fn tcp_channel_is_lazy_and_delivers_lines() {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let address = listener.local_addr().unwrap().to_string();

        let mut channel = TcpChannel::new(
            address,
            Duration::from_millis(500),
            Duration::from_millis(500),
        );
        assert_eq!(channel.state(), ChannelState::Idle);

        channel.send_line("Recording has started").unwrap();
        channel.send_line("Pulse 1: user is LOOKING").unwrap();

        let (socket, _) = listener.accept().unwrap();
        let mut reader = BufReader::new(socket);
        let mut first = String::new();
        reader.read_line(&mut first).unwrap();
        let mut second = String::new();
        reader.read_line(&mut second).unwrap();
        assert_eq!(first, "Recording has started\n");
        assert_eq!(second, "Pulse 1: user is LOOKING\n");
        assert_eq!(channel.state(), ChannelState::Open);

        channel.close();
        assert_eq!(channel.state(), ChannelState::Closed);
        assert_eq!(channel.delivery_failures(), 0);
        assert!(matches!(
            channel.send_line("late"),
            Err(TransportError::Closed)
        ));
    }

    #[test]
    fn tcp_channel_counts_refused_connection() {
        // Bind then drop to get a port with nothing listening.
        let address = {
            let listener = TcpListener::bind("127.0.0.1:0").unwrap();
            listener.local_addr().unwrap().to_string()
        };
        let mut channel = TcpChannel::new(
            address,
            Duration::from_millis(200),
            Duration::from_millis(200),
        );
        assert!(channel.send_line("Recording has started").is_ok());
        channel.close();
        assert_eq!(channel.delivery_failures(), 1);
    }

    #[test]
    fn send_to_unresponsive_listener_does_not_stall() {
        // Non-routable: a connect attempt hangs until its timeout.
        let mut channel = TcpChannel::new(
            "10.255.255.1:65432",
            Duration::from_millis(300),
            Duration::from_millis(300),
        );
        let started = Instant::now();
        channel.send_line("Recording has started").unwrap();
        channel.send_line("Pulse 1: user is LOOKING").unwrap();
        let elapsed = started.elapsed();
        // One 30 fps frame is 33 ms.
        assert!(elapsed < Duration::from_millis(10), "send took {elapsed:?}");

        channel.close();
        assert_eq!(channel.state(), ChannelState::Closed);
    }

    #[test]
    fn unresolvable_address_is_a_delivery_failure() {
        let mut channel = TcpChannel::new(
            "not an address",
            Duration::from_millis(50),
            Duration::from_millis(50),
        );
        assert!(channel.send_line("x").is_ok());
        channel.close();
        assert_eq!(channel.delivery_failures(), 1);
    }

    #[test]
    fn memory_channel_records_and_fails_on_demand() {
        let mut ok = MemoryChannel::new();
        ok.send_line("a").unwrap();
        assert_eq!(ok.lines(), ["a".to_owned()]);

        let mut bad = MemoryChannel::failing();
        assert!(bad.send_line("a").is_err());
        assert_eq!(bad.failures(), 1);
        assert!(bad.lines().is_empty());
    }

    #[test]
    fn boxed_channel_forwards() {
        let mut boxed: Box<dyn NotificationChannel> = Box::new(NullChannel);
        assert!(boxed.send_line("ignored").is_ok());
        boxed.close();
    }
}
