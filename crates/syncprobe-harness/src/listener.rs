//! Event listener: the serialized accept loop that owns the ledger.
//!
//! ## Processing Model
//!
//! One connection carries one lifecycle message. Each accepted connection is
//! read, applied to the ledger and answered before the next `accept`, so
//! exactly one logical-clock mutation is ever in flight. Control commands
//! (reset, snapshot) are served by the same loop between connections.
//!
//! A reset first closes every connection already queued on the socket, so a
//! report sent by a previous run's leftover process never reaches the next
//! run's ledger.
//!
//! ## Shutdown
//!
//! [`ListenerHandle::stop`] cancels the loop through a `CancellationToken`
//! raced against `accept` and against the read of an accepted connection,
//! then joins the task. When it returns, the task has exited and the
//! listening socket is closed.

use std::future::poll_fn;
use std::net::SocketAddr;
use std::task::Poll;

use snafu::ResultExt;
use syncprobe_constants::wire::LISTENER_BACKLOG;
use syncprobe_constants::wire::MESSAGE_READ_TIMEOUT;
use syncprobe_constants::wire::MESSAGE_SIZE;
use syncprobe_core::DelaySchedule;
use syncprobe_core::Ledger;
use syncprobe_core::LifecycleMessage;
use syncprobe_core::WireError;
use syncprobe_core::wire::encode_reply;
use tokio::io::AsyncReadExt;
use tokio::io::AsyncWriteExt;
use tokio::net::TcpListener;
use tokio::net::TcpSocket;
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::debug;
use tracing::info;
use tracing::warn;

use crate::error::BindSnafu;
use crate::error::JoinSnafu;
use crate::error::ListenerError;

/// Capacity of the control channel. Commands are issued one at a time.
const CONTROL_CHANNEL_CAPACITY: usize = 4;

/// Requests served by the listener loop between connections.
enum ControlCommand {
    /// Clear the ledger and install a new delay schedule.
    Reset {
        schedule: DelaySchedule,
        done: oneshot::Sender<()>,
    },
    /// Copy the current ledger out.
    Snapshot { reply: oneshot::Sender<Ledger> },
}

/// A bound, not yet running event listener.
pub struct EventListener {
    listener: TcpListener,
    local_addr: SocketAddr,
}

impl EventListener {
    /// Bind the listening socket with `SO_REUSEADDR`, so the well-known port
    /// can be rebound immediately after a previous harness exits.
    pub fn bind(addr: SocketAddr) -> Result<Self, ListenerError> {
        let socket = if addr.is_ipv4() {
            TcpSocket::new_v4()
        } else {
            TcpSocket::new_v6()
        }
        .context(BindSnafu { addr })?;
        socket.set_reuseaddr(true).context(BindSnafu { addr })?;
        socket.bind(addr).context(BindSnafu { addr })?;
        let listener = socket.listen(LISTENER_BACKLOG).context(BindSnafu { addr })?;
        let local_addr = listener.local_addr().context(BindSnafu { addr })?;

        info!(%local_addr, "event listener bound");
        Ok(Self { listener, local_addr })
    }

    /// Address the listener is bound to (useful when binding port 0).
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Start the accept loop on the current tokio runtime.
    pub fn spawn(self) -> ListenerHandle {
        let (control_tx, control_rx) = mpsc::channel(CONTROL_CHANNEL_CAPACITY);
        let cancel = CancellationToken::new();
        let local_addr = self.local_addr;
        let task = tokio::spawn(self.serve(control_rx, cancel.clone()));

        ListenerHandle {
            local_addr,
            control_tx,
            cancel,
            task: Some(task),
        }
    }

    async fn serve(self, mut control_rx: mpsc::Receiver<ControlCommand>, cancel: CancellationToken) {
        let mut ledger = Ledger::new();

        loop {
            tokio::select! {
                biased;
                _ = cancel.cancelled() => break,
                Some(command) = control_rx.recv() => handle_control(&self.listener, &mut ledger, command).await,
                accepted = self.listener.accept() => match accepted {
                    Ok((stream, peer)) => handle_connection(&mut ledger, stream, peer, &cancel).await,
                    Err(e) => warn!(error = %e, "accept failed"),
                },
            }
        }

        drop(self.listener);
        info!(local_addr = %self.local_addr, "event listener stopped");
    }
}

async fn handle_control(listener: &TcpListener, ledger: &mut Ledger, command: ControlCommand) {
    match command {
        ControlCommand::Reset { schedule, done } => {
            let drained = drain_pending(listener).await;
            debug!(delayed = schedule.len(), drained, "resetting ledger");
            ledger.reset(schedule);
            let _ = done.send(());
        }
        ControlCommand::Snapshot { reply } => {
            let _ = reply.send(ledger.clone());
        }
    }
}

/// Close every connection already waiting in the accept queue, unanswered.
async fn drain_pending(listener: &TcpListener) -> usize {
    let mut drained = 0;
    loop {
        let pending = poll_fn(|cx| match listener.poll_accept(cx) {
            Poll::Ready(accepted) => Poll::Ready(Some(accepted)),
            Poll::Pending => Poll::Ready(None),
        })
        .await;
        match pending {
            Some(Ok((stream, peer))) => {
                debug!(%peer, "dropping connection left over from a previous run");
                drop(stream);
                drained += 1;
            }
            Some(Err(e)) => {
                warn!(error = %e, "accept failed while draining");
                return drained;
            }
            None => return drained,
        }
    }
}

/// Read one message, apply it and answer with the delay (or 0).
///
/// The connection is dropped unanswered if the listener is cancelled first.
async fn handle_connection(ledger: &mut Ledger, mut stream: TcpStream, peer: SocketAddr, cancel: &CancellationToken) {
    let read = tokio::select! {
        _ = cancel.cancelled() => {
            debug!(%peer, "listener stopping, connection dropped");
            return;
        }
        read = read_message(&mut stream) => read,
    };

    let delay_us = match read {
        Ok(msg) => match ledger.apply(&msg) {
            Ok(delay_us) => {
                debug!(
                    %peer,
                    participant = %msg.key(),
                    kind = msg.kind,
                    clock = ledger.clock(),
                    delay_us,
                    "lifecycle event accepted"
                );
                delay_us
            }
            Err(err) => {
                warn!(%peer, error = %err, "lifecycle protocol violation");
                0
            }
        },
        Err(err) => {
            warn!(%peer, error = %err, "malformed lifecycle message");
            ledger.record_malformed(&err);
            0
        }
    };

    if let Err(e) = stream.write_all(&encode_reply(delay_us)).await {
        debug!(%peer, error = %e, "failed to send reply");
    }
}

/// Read exactly one message, stopping early on EOF, error or timeout.
async fn read_message(stream: &mut TcpStream) -> Result<LifecycleMessage, WireError> {
    let mut buf = [0u8; MESSAGE_SIZE];
    let mut filled = 0;

    let read = async {
        while filled < MESSAGE_SIZE {
            match stream.read(&mut buf[filled..]).await {
                Ok(0) => break,
                Ok(n) => filled += n,
                Err(e) => {
                    debug!(error = %e, "read failed");
                    break;
                }
            }
        }
    };

    if tokio::time::timeout(MESSAGE_READ_TIMEOUT, read).await.is_err() {
        return Err(WireError::Stalled {
            received: filled,
            expected: MESSAGE_SIZE,
        });
    }
    LifecycleMessage::decode(&buf[..filled])
}

/// Handle to a running event listener.
///
/// Dropping the handle cancels the loop without waiting for it; call
/// [`stop`](Self::stop) to wait for the socket to close.
pub struct ListenerHandle {
    local_addr: SocketAddr,
    control_tx: mpsc::Sender<ControlCommand>,
    cancel: CancellationToken,
    task: Option<JoinHandle<()>>,
}

impl ListenerHandle {
    /// Address subjects should connect to.
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Clear the ledger and install `schedule` for the next run.
    ///
    /// Must only be called while no subject is running; the loop applies it
    /// between connections.
    pub async fn reset(&self, schedule: DelaySchedule) -> Result<(), ListenerError> {
        let (done, rx) = oneshot::channel();
        self.control_tx
            .send(ControlCommand::Reset { schedule, done })
            .await
            .map_err(|_| ListenerError::Stopped)?;
        rx.await.map_err(|_| ListenerError::Stopped)
    }

    /// Copy of the ledger as of the last fully handled connection.
    pub async fn snapshot(&self) -> Result<Ledger, ListenerError> {
        let (reply, rx) = oneshot::channel();
        self.control_tx
            .send(ControlCommand::Snapshot { reply })
            .await
            .map_err(|_| ListenerError::Stopped)?;
        rx.await.map_err(|_| ListenerError::Stopped)
    }

    /// Stop the loop and wait until the task has exited and the socket is closed.
    pub async fn stop(mut self) -> Result<(), ListenerError> {
        self.cancel.cancel();
        if let Some(task) = self.task.take() {
            task.await.context(JoinSnafu)?;
        }
        Ok(())
    }
}

impl Drop for ListenerHandle {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}
