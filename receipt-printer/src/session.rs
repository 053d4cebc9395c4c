//! Printer session: one connection, one owner
//!
//! A [`PrinterSession`] is a handle to a background task that owns the
//! connection state. Every operation is a message to that task, so there is a
//! single writer for the state and the socket:
//!
//! ```text
//!              connect                 transport ok
//!   Idle ───────────────► Connecting ───────────────► Ready
//!    ▲                        │ error / timeout          │ send error / timeout
//!    │                        ▼                          ▼
//!    │                     Failed ◄──────────────────────┘
//!    │                        │
//!    │     connect again      │   disconnect (from any state but Idle)
//!    └─ Closed ◄──────────────┴──────────────────────────────────────
//! ```
//!
//! Sends are queued FIFO and written one at a time by a per-connection writer
//! task; each caller gets its own completion. `connect` while Connecting or
//! Ready is rejected with [`ConnectionError::AlreadyActive`].

use crate::error::ConnectionError;
use crate::escpos::{CommandBuffer, commands};
use crate::transport::{TcpTransport, Transport};
use std::fmt;
use std::future::Future;
use std::io;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};
use std::time::Duration;
use tokio::io::{AsyncWrite, AsyncWriteExt};
use tokio::sync::{mpsc, oneshot, watch};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{Instrument, debug, info, info_span, instrument, warn};

/// Connection state of a session
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionState {
    Idle,
    Connecting,
    Ready,
    /// Connect or send failed; carries the cause
    Failed(String),
    Closed,
}

impl SessionState {
    pub fn is_ready(&self) -> bool {
        matches!(self, SessionState::Ready)
    }
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SessionState::Idle => f.write_str("idle"),
            SessionState::Connecting => f.write_str("connecting"),
            SessionState::Ready => f.write_str("ready"),
            SessionState::Failed(cause) => write!(f, "failed: {}", cause),
            SessionState::Closed => f.write_str("closed"),
        }
    }
}

/// Timeouts applied by the session
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionOptions {
    pub connect_timeout: Duration,
    /// Per send, from the start of the write until the flush completes
    pub send_timeout: Duration,
}

impl Default for SessionOptions {
    fn default() -> Self {
        Self {
            connect_timeout: Duration::from_secs(5),
            send_timeout: Duration::from_secs(10),
        }
    }
}

type Reply = oneshot::Sender<Result<(), ConnectionError>>;

enum Request {
    Connect {
        host: String,
        port: u16,
        reply: Reply,
    },
    Send {
        bytes: CommandBuffer,
        reply: Reply,
    },
    Disconnect {
        reply: oneshot::Sender<()>,
    },
}

/// Completion of a send queued with [`PrinterSession::enqueue`]
#[must_use = "a send completes only when awaited"]
#[derive(Debug)]
pub struct SendHandle {
    rx: oneshot::Receiver<Result<(), ConnectionError>>,
}

impl Future for SendHandle {
    type Output = Result<(), ConnectionError>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        Pin::new(&mut self.rx)
            .poll(cx)
            .map(|r| r.unwrap_or(Err(ConnectionError::SessionClosed)))
    }
}

/// Handle to a printer session task.
///
/// Cheap to clone; all clones drive the same session. The task stops and
/// releases its connection once every handle is dropped.
#[derive(Debug, Clone)]
pub struct PrinterSession {
    requests: mpsc::UnboundedSender<Request>,
    state: watch::Receiver<SessionState>,
}

impl PrinterSession {
    /// Session over plain TCP.
    ///
    /// # Panics
    ///
    /// Must be called from within a tokio runtime.
    pub fn new(options: SessionOptions) -> Self {
        Self::with_transport(TcpTransport, options)
    }

    /// Session over a custom transport.
    ///
    /// # Panics
    ///
    /// Must be called from within a tokio runtime.
    pub fn with_transport<T: Transport>(transport: T, options: SessionOptions) -> Self {
        let (requests_tx, requests_rx) = mpsc::unbounded_channel();
        let (state_tx, state_rx) = watch::channel(SessionState::Idle);
        let (events_tx, events_rx) = mpsc::unbounded_channel();

        let task = SessionTask {
            transport: Arc::new(transport),
            options,
            state: state_tx,
            events: events_tx,
            epoch: 0,
            connecting: None,
            pending_connect: None,
            link: None,
        };
        tokio::spawn(
            task.run(requests_rx, events_rx)
                .instrument(info_span!("printer_session")),
        );

        Self {
            requests: requests_tx,
            state: state_rx,
        }
    }

    /// Current state
    pub fn state(&self) -> SessionState {
        self.state.borrow().clone()
    }

    pub fn is_ready(&self) -> bool {
        self.state.borrow().is_ready()
    }

    /// Watch state transitions
    pub fn subscribe(&self) -> watch::Receiver<SessionState> {
        self.state.clone()
    }

    /// Connect to `host:port`.
    ///
    /// Resolves once the transport is ready or has failed. Fails fast with
    /// `AlreadyActive` when a connection is pending or established.
    #[instrument(skip(self))]
    pub async fn connect(&self, host: &str, port: u16) -> Result<(), ConnectionError> {
        let (reply, rx) = oneshot::channel();
        let _ = self.requests.send(Request::Connect {
            host: host.to_string(),
            port,
            reply,
        });
        rx.await.unwrap_or(Err(ConnectionError::SessionClosed))
    }

    /// Queue bytes for sending and return their completion.
    ///
    /// The queue position is taken when this is called, so completions of
    /// successive calls resolve in call order. Fails with `NotConnected` if
    /// the session is not Ready when the request is processed.
    pub fn enqueue(&self, bytes: impl Into<CommandBuffer>) -> SendHandle {
        let (reply, rx) = oneshot::channel();
        // A closed session drops the reply, which the handle reports as SessionClosed
        let _ = self.requests.send(Request::Send {
            bytes: bytes.into(),
            reply,
        });
        SendHandle { rx }
    }

    /// Send bytes and wait until they are flushed to the printer
    pub async fn send(&self, bytes: impl Into<CommandBuffer>) -> Result<(), ConnectionError> {
        self.enqueue(bytes).await
    }

    /// Full paper cut (GS V 66 0)
    pub async fn cut_paper(&self) -> Result<(), ConnectionError> {
        self.send(commands::CUT_PAPER).await
    }

    /// Drop the connection and move to Closed.
    ///
    /// No-op when Idle or already Closed. A pending connect resolves with
    /// `SessionClosed`, and so do queued sends that had not been written yet.
    pub async fn disconnect(&self) {
        let (reply, rx) = oneshot::channel();
        if self.requests.send(Request::Disconnect { reply }).is_ok() {
            let _ = rx.await;
        }
    }

    /// One-off reachability check, see [`crate::transport::probe`]
    pub async fn probe(host: &str, port: u16, timeout: Duration) -> bool {
        crate::transport::probe(host, port, timeout).await
    }
}

enum Event<C> {
    Connected {
        epoch: u64,
        result: Result<C, ConnectionError>,
    },
    LinkFailed {
        epoch: u64,
        error: ConnectionError,
    },
}

/// Writer side of an established connection
struct Link {
    writes: mpsc::UnboundedSender<WriteJob>,
    cancel: CancellationToken,
}

struct WriteJob {
    bytes: CommandBuffer,
    reply: Reply,
}

struct SessionTask<T: Transport> {
    transport: Arc<T>,
    options: SessionOptions,
    state: watch::Sender<SessionState>,
    events: mpsc::UnboundedSender<Event<T::Connection>>,
    /// Bumped on every connect and disconnect; stale events are ignored
    epoch: u64,
    connecting: Option<JoinHandle<()>>,
    pending_connect: Option<Reply>,
    link: Option<Link>,
}

impl<T: Transport> SessionTask<T> {
    async fn run(
        mut self,
        mut requests: mpsc::UnboundedReceiver<Request>,
        mut events: mpsc::UnboundedReceiver<Event<T::Connection>>,
    ) {
        loop {
            tokio::select! {
                request = requests.recv() => match request {
                    Some(request) => self.handle_request(request),
                    None => break,
                },
                Some(event) = events.recv() => self.handle_event(event),
            }
        }

        debug!("All session handles dropped, stopping");
        self.close();
    }

    fn current(&self) -> SessionState {
        self.state.borrow().clone()
    }

    fn set_state(&self, next: SessionState) {
        let prev = self.state.send_replace(next.clone());
        if prev != next {
            info!(from = %prev, to = %next, "Session state changed");
        }
    }

    fn handle_request(&mut self, request: Request) {
        match request {
            Request::Connect { host, port, reply } => self.start_connect(host, port, reply),
            Request::Send { bytes, reply } => self.dispatch_send(bytes, reply),
            Request::Disconnect { reply } => {
                self.close();
                let _ = reply.send(());
            }
        }
    }

    fn start_connect(&mut self, host: String, port: u16, reply: Reply) {
        let current = self.current();
        if matches!(current, SessionState::Connecting | SessionState::Ready) {
            warn!(state = %current, "Connect rejected, session already active");
            let _ = reply.send(Err(ConnectionError::AlreadyActive(current)));
            return;
        }

        self.epoch += 1;
        self.pending_connect = Some(reply);
        self.set_state(SessionState::Connecting);

        let epoch = self.epoch;
        let transport = self.transport.clone();
        let events = self.events.clone();
        let timeout = self.options.connect_timeout;
        let span = info_span!("connect", addr = %format!("{}:{}", host, port));

        let handle = tokio::spawn(
            async move {
                info!("Connecting to printer");
                let result =
                    match tokio::time::timeout(timeout, transport.connect(&host, port)).await {
                        Ok(Ok(conn)) => Ok(conn),
                        Ok(Err(e)) => Err(ConnectionError::TransportFailure(format!(
                            "{}:{}: {}",
                            host, port, e
                        ))),
                        Err(_) => Err(ConnectionError::TimedOut(format!(
                            "connect to {}:{} after {:?}",
                            host, port, timeout
                        ))),
                    };
                let _ = events.send(Event::Connected { epoch, result });
            }
            .instrument(span),
        );
        self.connecting = Some(handle);
    }

    fn dispatch_send(&mut self, bytes: CommandBuffer, reply: Reply) {
        let Some(link) = self.link.as_ref().filter(|_| self.current().is_ready()) else {
            debug!(bytes = bytes.len(), "Send rejected, session not ready");
            let _ = reply.send(Err(ConnectionError::NotConnected));
            return;
        };

        if let Err(mpsc::error::SendError(job)) = link.writes.send(WriteJob { bytes, reply }) {
            // Writer already gone; its LinkFailed event is on the way
            let _ = job.reply.send(Err(ConnectionError::NotConnected));
        }
    }

    fn handle_event(&mut self, event: Event<T::Connection>) {
        match event {
            Event::Connected { epoch, result } => {
                if epoch != self.epoch {
                    debug!(epoch, current = self.epoch, "Dropping stale connect result");
                    return;
                }
                self.connecting = None;
                let reply = self.pending_connect.take();

                let outcome = match result {
                    Ok(conn) => {
                        self.link = Some(self.spawn_writer(conn));
                        self.set_state(SessionState::Ready);
                        Ok(())
                    }
                    Err(e) => {
                        warn!(error = %e, "Connect failed");
                        self.set_state(SessionState::Failed(e.to_string()));
                        Err(e)
                    }
                };
                if let Some(reply) = reply {
                    let _ = reply.send(outcome);
                }
            }
            Event::LinkFailed { epoch, error } => {
                if epoch != self.epoch {
                    return;
                }
                if let Some(link) = self.link.take() {
                    link.cancel.cancel();
                }
                self.set_state(SessionState::Failed(error.to_string()));
            }
        }
    }

    fn spawn_writer(&self, conn: T::Connection) -> Link {
        let (writes_tx, writes_rx) = mpsc::unbounded_channel();
        let cancel = CancellationToken::new();

        let writer = Writer {
            epoch: self.epoch,
            send_timeout: self.options.send_timeout,
            cancel: cancel.clone(),
            events: self.events.clone(),
        };
        tokio::spawn(
            writer
                .run(conn, writes_rx)
                .instrument(info_span!("printer_writer", epoch = self.epoch)),
        );

        Link {
            writes: writes_tx,
            cancel,
        }
    }

    /// Release everything and move to Closed (unless never connected)
    fn close(&mut self) {
        if matches!(self.current(), SessionState::Idle | SessionState::Closed) {
            return;
        }

        self.epoch += 1;
        if let Some(handle) = self.connecting.take() {
            handle.abort();
        }
        if let Some(reply) = self.pending_connect.take() {
            let _ = reply.send(Err(ConnectionError::SessionClosed));
        }
        if let Some(link) = self.link.take() {
            link.cancel.cancel();
        }
        self.set_state(SessionState::Closed);
    }
}

/// Per-connection writer: drains the send queue one job at a time
struct Writer<C> {
    epoch: u64,
    send_timeout: Duration,
    cancel: CancellationToken,
    events: mpsc::UnboundedSender<Event<C>>,
}

impl<C: AsyncWrite + Unpin + Send + 'static> Writer<C> {
    async fn run(self, mut conn: C, mut jobs: mpsc::UnboundedReceiver<WriteJob>) {
        let reason = loop {
            let job = tokio::select! {
                _ = self.cancel.cancelled() => break ConnectionError::SessionClosed,
                job = jobs.recv() => match job {
                    Some(job) => job,
                    None => break ConnectionError::SessionClosed,
                },
            };

            let outcome = tokio::select! {
                _ = self.cancel.cancelled() => None,
                r = tokio::time::timeout(self.send_timeout, write_flush(&mut conn, &job.bytes)) => Some(r),
            };

            let error = match outcome {
                Some(Ok(Ok(()))) => {
                    debug!(bytes = job.bytes.len(), "Bytes flushed");
                    let _ = job.reply.send(Ok(()));
                    continue;
                }
                Some(Ok(Err(e))) => ConnectionError::TransportFailure(format!("write failed: {}", e)),
                Some(Err(_)) => ConnectionError::TimedOut(format!(
                    "send of {} bytes after {:?}",
                    job.bytes.len(),
                    self.send_timeout
                )),
                None => {
                    let _ = job.reply.send(Err(ConnectionError::SessionClosed));
                    break ConnectionError::SessionClosed;
                }
            };

            warn!(error = %error, "Send failed, dropping connection");
            let _ = job.reply.send(Err(error.clone()));
            let _ = self.events.send(Event::LinkFailed {
                epoch: self.epoch,
                error: error.clone(),
            });
            break error;
        };

        // Whatever is still queued never reached the socket
        jobs.close();
        while let Ok(job) = jobs.try_recv() {
            let _ = job.reply.send(Err(reason.clone()));
        }
        let _ = conn.shutdown().await;
        debug!("Writer stopped");
    }
}

async fn write_flush<C: AsyncWrite + Unpin>(conn: &mut C, bytes: &[u8]) -> io::Result<()> {
    conn.write_all(bytes).await?;
    conn.flush().await
}
