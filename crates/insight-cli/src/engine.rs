use chrono::Utc;
use insight_core::analysis::{AnalysisRequest, Analyzer};
use insight_core::{encoder, AnalysisResult, CycleId, Phase, SelectedImage, Session, Status};
use insight_core::{AnalysisError, Preview, Transition, UploadError};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::{mpsc, oneshot, watch};

#[derive(Error, Debug)]
pub enum EngineError {
    #[error(transparent)]
    Upload(#[from] UploadError),
    #[error("engine task exited")]
    ChannelClosed,
}

/// Messages sent from front ends to the engine task.
enum EngineRequest {
    Upload {
        image: SelectedImage,
        reply: oneshot::Sender<Result<CycleId, UploadError>>,
    },
    Reset {
        reply: oneshot::Sender<()>,
    },
}

/// Completions reported by per-cycle worker tasks.
enum CycleEvent {
    Encoded {
        cycle: CycleId,
        preview: Preview,
    },
    EncodeFailed {
        cycle: CycleId,
        message: String,
    },
    Completed {
        cycle: CycleId,
        outcome: Result<AnalysisResult, AnalysisError>,
    },
}

/// Clone-safe handle to the engine task.
#[derive(Clone)]
pub struct EngineHandle {
    tx: mpsc::Sender<EngineRequest>,
    status: watch::Receiver<Status>,
}

impl EngineHandle {
    /// Validate and start a new cycle. Any cycle in flight is abandoned.
    pub async fn upload(&self, image: SelectedImage) -> Result<CycleId, EngineError> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.tx
            .send(EngineRequest::Upload {
                image,
                reply: reply_tx,
            })
            .await
            .map_err(|_| EngineError::ChannelClosed)?;
        Ok(reply_rx.await.map_err(|_| EngineError::ChannelClosed)??)
    }

    /// Return to idle. Completions of the abandoned cycle are discarded.
    pub async fn reset(&self) -> Result<(), EngineError> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.tx
            .send(EngineRequest::Reset { reply: reply_tx })
            .await
            .map_err(|_| EngineError::ChannelClosed)?;
        reply_rx.await.map_err(|_| EngineError::ChannelClosed)
    }

    /// Current status snapshot.
    pub fn status(&self) -> Status {
        self.status.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<Status> {
        self.status.clone()
    }

    /// Wait until `cycle` has left previewing.
    ///
    /// Returns the loading status while the remote call is pending, `None` once
    /// the cycle has settled or been superseded.
    pub async fn loading(&self, cycle: CycleId) -> Option<Status> {
        let mut rx = self.status.clone();
        loop {
            {
                let status = rx.borrow_and_update();
                if status.cycle() != Some(cycle) {
                    return None;
                }
                match status.phase() {
                    Phase::Previewing => {}
                    Phase::Loading => return Some(status.clone()),
                    _ => return None,
                }
            }
            if rx.changed().await.is_err() {
                return None;
            }
        }
    }

    /// Wait until `cycle` reaches success or error, or is superseded.
    pub async fn settled(&self, cycle: CycleId) -> Status {
        let mut rx = self.status.clone();
        loop {
            {
                let status = rx.borrow_and_update();
                let in_flight = matches!(status.phase(), Phase::Previewing | Phase::Loading);
                if status.cycle() != Some(cycle) || !in_flight {
                    return status.clone();
                }
            }
            if rx.changed().await.is_err() {
                return rx.borrow().clone();
            }
        }
    }
}

/// Spawn the engine task that owns the [`Session`].
///
/// Encoding and the remote call for each cycle run in their own task and
/// report back tagged with the cycle id.
pub fn spawn_engine(analyzer: Arc<dyn Analyzer>, prompt: String) -> EngineHandle {
    let (tx, mut rx) = mpsc::channel::<EngineRequest>(8);
    let (events_tx, mut events_rx) = mpsc::unbounded_channel::<CycleEvent>();
    let (status_tx, status_rx) = watch::channel(Status::default());
    // Id of the cycle in flight (0 = none); lets workers skip the remote call for abandoned cycles.
    let current = Arc::new(AtomicU64::new(0));

    tokio::spawn(async move {
        tracing::info!(model = analyzer.model(), "engine task started");
        let mut session = Session::new();

        loop {
            tokio::select! {
                req = rx.recv() => {
                    let Some(req) = req else { break };
                    match req {
                        EngineRequest::Upload { image, reply } => {
                            let result = session.upload(image.clone());
                            if let Ok(cycle) = result {
                                current.store(cycle.0, Ordering::SeqCst);
                                tokio::spawn(run_cycle(
                                    cycle,
                                    image,
                                    Arc::clone(&analyzer),
                                    prompt.clone(),
                                    Arc::clone(&current),
                                    events_tx.clone(),
                                ));
                            }
                            status_tx.send_replace(session.status().clone());
                            let _ = reply.send(result);
                        }
                        EngineRequest::Reset { reply } => {
                            session.reset();
                            current.store(0, Ordering::SeqCst);
                            status_tx.send_replace(session.status().clone());
                            let _ = reply.send(());
                        }
                    }
                }
                Some(event) = events_rx.recv() => {
                    let transition = match event {
                        CycleEvent::Encoded { cycle, preview } => session.encoded(cycle, preview),
                        CycleEvent::EncodeFailed { cycle, message } => {
                            session.encode_failed(cycle, message)
                        }
                        CycleEvent::Completed { cycle, outcome } => session.completed(cycle, outcome),
                    };
                    if transition == Transition::Applied {
                        if !matches!(session.status().phase(), Phase::Previewing | Phase::Loading) {
                            current.store(0, Ordering::SeqCst);
                        }
                        status_tx.send_replace(session.status().clone());
                    }
                }
            }
        }
        tracing::info!("engine task exiting");
    });

    EngineHandle {
        tx,
        status: status_rx,
    }
}

/// Encode, then make the single remote call for `cycle`.
async fn run_cycle(
    cycle: CycleId,
    image: SelectedImage,
    analyzer: Arc<dyn Analyzer>,
    prompt: String,
    current: Arc<AtomicU64>,
    events: mpsc::UnboundedSender<CycleEvent>,
) {
    let encoded = match encoder::encode(&image).await {
        Ok(encoded) => encoded,
        Err(err) => {
            tracing::warn!(%cycle, error = %err, "encode failed");
            let _ = events.send(CycleEvent::EncodeFailed {
                cycle,
                message: err.to_string(),
            });
            return;
        }
    };
    let _ = events.send(CycleEvent::Encoded {
        cycle,
        preview: encoded.preview(),
    });

    if current.load(Ordering::SeqCst) != cycle.0 {
        tracing::debug!(%cycle, "cycle abandoned before the remote call");
        return;
    }

    let request = AnalysisRequest {
        mime_type: image.mime_type,
        payload: encoded.payload,
        prompt,
    };
    let outcome = analyzer
        .analyze(&request)
        .await
        .map(|text| AnalysisResult {
            text,
            model: analyzer.model().to_string(),
            completed_at: Utc::now(),
        });
    if let Err(err) = &outcome {
        tracing::warn!(%cycle, error = %err, "analysis failed");
    }
    let _ = events.send(CycleEvent::Completed { cycle, outcome });
}
