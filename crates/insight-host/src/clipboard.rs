//! System clipboard access and the transient "copied" acknowledgment.

use async_trait::async_trait;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{mpsc, Arc};
use std::time::Duration;
use thiserror::Error;
use tokio::sync::{oneshot, watch};

/// How long the "copied" acknowledgment stays up after the latest copy.
pub const COPY_ACK_WINDOW: Duration = Duration::from_millis(2000);

#[derive(Error, Debug)]
pub enum ClipboardError {
    #[error("clipboard unavailable: {0}")]
    Unavailable(String),
    #[error("failed to write clipboard: {0}")]
    Write(String),
    #[error("clipboard thread exited")]
    ChannelClosed,
}

#[async_trait]
pub trait Clipboard: Send + Sync {
    async fn set_text(&self, text: &str) -> Result<(), ClipboardError>;
}

struct SetText {
    text: String,
    reply: oneshot::Sender<Result<(), ClipboardError>>,
}

/// Handle to a dedicated thread that owns the platform clipboard.
///
/// On X11 and Wayland the copied text only survives while its owner is
/// alive, so the owner lives on its own thread for the whole process.
#[derive(Clone)]
pub struct SystemClipboard {
    tx: mpsc::Sender<SetText>,
}

impl SystemClipboard {
    /// Open the clipboard on a dedicated thread. Fails fast if the platform has none.
    pub fn spawn() -> Result<Self, ClipboardError> {
        let (tx, rx) = mpsc::channel::<SetText>();
        let (ready_tx, ready_rx) = mpsc::channel::<Result<(), ClipboardError>>();

        std::thread::Builder::new()
            .name("insight-clipboard".into())
            .spawn(move || {
                let mut clipboard = match arboard::Clipboard::new() {
                    Ok(c) => {
                        let _ = ready_tx.send(Ok(()));
                        c
                    }
                    Err(e) => {
                        let _ = ready_tx.send(Err(ClipboardError::Unavailable(e.to_string())));
                        return;
                    }
                };
                tracing::debug!("clipboard thread started");
                while let Ok(req) = rx.recv() {
                    let result = clipboard
                        .set_text(req.text)
                        .map_err(|e| ClipboardError::Write(e.to_string()));
                    let _ = req.reply.send(result);
                }
                tracing::debug!("clipboard thread exiting");
            })
            .map_err(|e| ClipboardError::Unavailable(e.to_string()))?;

        ready_rx.recv().map_err(|_| ClipboardError::ChannelClosed)??;
        Ok(Self { tx })
    }
}

#[async_trait]
impl Clipboard for SystemClipboard {
    async fn set_text(&self, text: &str) -> Result<(), ClipboardError> {
        let (reply, reply_rx) = oneshot::channel();
        self.tx
            .send(SetText {
                text: text.to_string(),
                reply,
            })
            .map_err(|_| ClipboardError::ChannelClosed)?;
        reply_rx.await.map_err(|_| ClipboardError::ChannelClosed)?
    }
}

struct AckInner {
    generation: AtomicU64,
    copied: watch::Sender<bool>,
}

/// "Copied" flag that reverts [`COPY_ACK_WINDOW`] after the most recent copy.
///
/// Every [`acknowledge`](Self::acknowledge) restarts the window; timers from
/// earlier copies see a newer generation and leave the flag alone.
#[derive(Clone)]
pub struct CopyAck {
    inner: Arc<AckInner>,
}

impl Default for CopyAck {
    fn default() -> Self {
        Self::new()
    }
}

impl CopyAck {
    pub fn new() -> Self {
        let (copied, _) = watch::channel(false);
        Self {
            inner: Arc::new(AckInner {
                generation: AtomicU64::new(0),
                copied,
            }),
        }
    }

    pub fn is_copied(&self) -> bool {
        *self.inner.copied.borrow()
    }

    pub fn subscribe(&self) -> watch::Receiver<bool> {
        self.inner.copied.subscribe()
    }

    /// Raise the flag and (re)start the revert timer. Must run inside a tokio runtime.
    pub fn acknowledge(&self) {
        let generation = self.inner.generation.fetch_add(1, Ordering::SeqCst) + 1;
        self.inner.copied.send_replace(true);

        let inner = Arc::clone(&self.inner);
        tokio::spawn(async move {
            tokio::time::sleep(COPY_ACK_WINDOW).await;
            if inner.generation.load(Ordering::SeqCst) == generation {
                inner.copied.send_replace(false);
            }
        });
    }
}

/// Copy `text` and raise the acknowledgment on success.
pub async fn copy_text(
    clipboard: &dyn Clipboard,
    ack: &CopyAck,
    text: &str,
) -> Result<(), ClipboardError> {
    clipboard.set_text(text).await?;
    ack.acknowledge();
    tracing::info!(chars = text.chars().count(), "result copied to clipboard");
    Ok(())
}
