//! Long-lived server-to-client push channels.
//!
//! A channel is split in two halves. [`PushChannel`] is kept by the session
//! state and used to write events, [`ChannelStream`] is handed to the HTTP
//! response body. Dropping the stream half (client went away, network error)
//! fires the channel's close signal exactly once.

use std::convert::Infallible;
use std::time::Duration;

use futures_util::Stream;
use tokio::sync::mpsc::error::TryRecvError;
use tokio::sync::{mpsc, oneshot};
use tokio::task::{AbortHandle, JoinHandle};
use tokio::time::{Instant, interval_at};
use uuid::Uuid;

use super::event::PushEvent;

/// Default period between keep-open frames.
pub const DEFAULT_HEARTBEAT_INTERVAL: Duration = Duration::from_secs(30);

/// Writer half of a push channel.
///
/// Owns its heartbeat timer and close subscription. Killing the channel (or
/// dropping it) cancels both and ends the stream once queued events drain.
#[derive(Debug)]
pub struct PushChannel {
    id: Uuid,
    owner: String,
    tx: Option<mpsc::UnboundedSender<PushEvent>>,
    heartbeat_interval: Duration,
    heartbeat: Option<JoinHandle<()>>,
    closed: Option<oneshot::Receiver<()>>,
    close_hook: Option<AbortHandle>,
}

/// Reader half of a push channel.
#[derive(Debug)]
pub struct ChannelStream {
    rx: mpsc::UnboundedReceiver<PushEvent>,
    _closed: oneshot::Sender<()>,
}

impl PushChannel {
    /// Open a channel for `owner` and start its heartbeat.
    ///
    /// An initial heartbeat frame is queued right away so the response headers
    /// are flushed. Must be called from within a Tokio runtime.
    pub fn open(owner: impl Into<String>, heartbeat_interval: Duration) -> (Self, ChannelStream) {
        let (tx, rx) = mpsc::unbounded_channel();
        let (closed_tx, closed_rx) = oneshot::channel();

        let mut channel = Self {
            id: Uuid::new_v4(),
            owner: owner.into(),
            tx: Some(tx),
            heartbeat_interval,
            heartbeat: None,
            closed: Some(closed_rx),
            close_hook: None,
        };
        channel.start_heartbeat();

        let stream = ChannelStream {
            rx,
            _closed: closed_tx,
        };
        (channel, stream)
    }

    #[must_use]
    pub const fn id(&self) -> Uuid {
        self.id
    }

    #[must_use]
    pub fn owner(&self) -> &str {
        &self.owner
    }

    /// Whether the channel has been neither killed nor closed by the client.
    #[must_use]
    pub fn is_open(&self) -> bool {
        self.tx.as_ref().is_some_and(|tx| !tx.is_closed())
    }

    /// Queue an event. Writing to a killed or closed channel is a no-op and
    /// returns `false`.
    pub fn send(&self, event: PushEvent) -> bool {
        let delivered = self.tx.as_ref().is_some_and(|tx| tx.send(event).is_ok());
        if !delivered {
            tracing::trace!(
                owner = %self.owner,
                channel_id = %self.id,
                "dropped write to ended channel"
            );
        }
        delivered
    }

    /// Run `handler` once when the client side of the channel goes away.
    ///
    /// Only the first subscription counts. Killing the channel cancels it.
    pub fn on_close<F>(&mut self, handler: F)
    where
        F: FnOnce() + Send + 'static,
    {
        let Some(closed) = self.closed.take() else {
            return;
        };

        let task = tokio::spawn(async move {
            // Resolves with an error once the stream half is dropped.
            let _ = closed.await;
            handler();
        });
        self.close_hook = Some(task.abort_handle());
    }

    /// Replace this channel with `replacement`, killing the old one.
    pub fn supersede(&mut self, replacement: Self) {
        let mut old = std::mem::replace(self, replacement);
        tracing::debug!(owner = %old.owner, old = %old.id, new = %self.id, "channel superseded");
        old.kill();
    }

    /// Cancel and restart the heartbeat, emitting a heartbeat frame at once.
    pub fn restart_heartbeat(&mut self) {
        self.stop_heartbeat();
        self.start_heartbeat();
    }

    /// Cancel the heartbeat and close subscription and end the stream.
    ///
    /// Events queued before the kill are still delivered. Idempotent.
    pub fn kill(&mut self) {
        self.stop_heartbeat();
        if let Some(hook) = self.close_hook.take() {
            hook.abort();
        }
        self.closed = None;
        if self.tx.take().is_some() {
            tracing::trace!(owner = %self.owner, channel_id = %self.id, "channel killed");
        }
    }

    fn start_heartbeat(&mut self) {
        let Some(tx) = &self.tx else {
            return;
        };
        let _ = tx.send(PushEvent::Heartbeat);

        // A weak handle, so a killed channel's stream can end while the timer task winds down.
        let weak = tx.downgrade();
        let period = self.heartbeat_interval;
        self.heartbeat = Some(tokio::spawn(async move {
            let mut ticker = interval_at(Instant::now() + period, period);
            loop {
                ticker.tick().await;
                let Some(tx) = weak.upgrade() else {
                    break;
                };
                if tx.send(PushEvent::Heartbeat).is_err() {
                    break;
                }
            }
        }));
    }

    fn stop_heartbeat(&mut self) {
        if let Some(timer) = self.heartbeat.take() {
            timer.abort();
        }
    }
}

impl Drop for PushChannel {
    fn drop(&mut self) {
        self.kill();
    }
}

impl ChannelStream {
    /// Wait for the next event. `None` once the channel has ended and drained.
    pub async fn recv(&mut self) -> Option<PushEvent> {
        self.rx.recv().await
    }

    /// Take the next queued event without waiting.
    ///
    /// # Errors
    ///
    /// [`TryRecvError::Empty`] when nothing is queued yet,
    /// [`TryRecvError::Disconnected`] once the channel has ended and drained.
    pub fn try_recv(&mut self) -> Result<PushEvent, TryRecvError> {
        self.rx.try_recv()
    }

    /// Turn the stream into encoded frames for an HTTP response body.
    pub fn into_frames(self) -> impl Stream<Item = Result<String, Infallible>> + Send + 'static {
        futures_util::stream::unfold(self, |mut stream| async move {
            let event = stream.rx.recv().await?;
            Some((Ok(event.encode()), stream))
        })
    }
}
