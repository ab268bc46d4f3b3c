use crate::error::NegotiationStage;
use crate::media::LocalTrack;
use crate::session::SessionKey;
use crate::transport::PeerConnection;
use anyhow::Result;
use peermesh_core::{IceCandidate, SessionDescription};
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

/// Platform work for one session, executed strictly in order.
#[derive(Debug)]
pub enum NegotiationOp {
    AttachTrack(LocalTrack),
    /// Swap the outgoing track of the same kind, adding a sender if none exists.
    ReplaceTrack(LocalTrack),
    CreateOffer,
    AcceptOffer(SessionDescription),
    ApplyAnswer(SessionDescription),
    AddCandidate(IceCandidate),
}

#[derive(Debug)]
pub enum NegotiationOutcome {
    OfferCreated(SessionDescription),
    AnswerCreated(SessionDescription),
    AnswerApplied,
}

/// Completions re-entering the room actor. Each carries the key of the
/// session it belongs to so completions for replaced sessions can be dropped.
pub enum NegotiationEvent {
    Created {
        key: SessionKey,
        result: Result<Arc<dyn PeerConnection>>,
    },
    Completed {
        key: SessionKey,
        outcome: NegotiationOutcome,
    },
    Failed {
        key: SessionKey,
        stage: NegotiationStage,
        error: anyhow::Error,
    },
    OfferTimeout {
        key: SessionKey,
    },
}

impl NegotiationEvent {
    pub fn key(&self) -> &SessionKey {
        match self {
            NegotiationEvent::Created { key, .. }
            | NegotiationEvent::Completed { key, .. }
            | NegotiationEvent::Failed { key, .. }
            | NegotiationEvent::OfferTimeout { key } => key,
        }
    }
}

/// Start the worker that owns the platform calls for one session.
pub fn spawn_negotiator(
    key: SessionKey,
    connection: Arc<dyn PeerConnection>,
    events: mpsc::UnboundedSender<NegotiationEvent>,
) -> (mpsc::UnboundedSender<NegotiationOp>, JoinHandle<()>) {
    let (ops_tx, ops_rx) = mpsc::unbounded_channel();
    let worker = tokio::spawn(run_negotiator(key, connection, ops_rx, events));
    (ops_tx, worker)
}

async fn run_negotiator(
    key: SessionKey,
    connection: Arc<dyn PeerConnection>,
    mut ops: mpsc::UnboundedReceiver<NegotiationOp>,
    events: mpsc::UnboundedSender<NegotiationEvent>,
) {
    while let Some(op) = ops.recv().await {
        let step = match op {
            NegotiationOp::AttachTrack(track) => {
                if let Err(e) = connection.add_track(&track).await {
                    warn!("Failed to attach {} track for {}: {:?}", track.kind(), key, e);
                }
                continue;
            }
            NegotiationOp::ReplaceTrack(track) => {
                replace_or_add(&key, connection.as_ref(), &track).await;
                continue;
            }
            NegotiationOp::AddCandidate(candidate) => {
                if let Err(e) = connection.add_ice_candidate(candidate).await {
                    warn!("Failed to add ICE candidate for {}: {:?}", key, e);
                }
                continue;
            }
            NegotiationOp::CreateOffer => (
                NegotiationStage::CreateOffer,
                create_offer(connection.as_ref()).await,
            ),
            NegotiationOp::AcceptOffer(offer) => (
                NegotiationStage::AcceptOffer,
                accept_offer(connection.as_ref(), offer).await,
            ),
            NegotiationOp::ApplyAnswer(answer) => (
                NegotiationStage::ApplyAnswer,
                connection
                    .set_remote_description(answer)
                    .await
                    .map(|()| NegotiationOutcome::AnswerApplied),
            ),
        };

        let event = match step {
            (_, Ok(outcome)) => NegotiationEvent::Completed {
                key: key.clone(),
                outcome,
            },
            (stage, Err(error)) => {
                let _ = events.send(NegotiationEvent::Failed {
                    key: key.clone(),
                    stage,
                    error,
                });
                break;
            }
        };
        if events.send(event).is_err() {
            break;
        }
    }
    debug!("Negotiator for {} finished", key);
}

async fn create_offer(connection: &dyn PeerConnection) -> Result<NegotiationOutcome> {
    let offer = connection.create_offer().await?;
    connection.set_local_description(offer.clone()).await?;
    Ok(NegotiationOutcome::OfferCreated(offer))
}

async fn accept_offer(
    connection: &dyn PeerConnection,
    offer: SessionDescription,
) -> Result<NegotiationOutcome> {
    connection.set_remote_description(offer).await?;
    let answer = connection.create_answer().await?;
    connection.set_local_description(answer.clone()).await?;
    Ok(NegotiationOutcome::AnswerCreated(answer))
}

async fn replace_or_add(key: &SessionKey, connection: &dyn PeerConnection, track: &LocalTrack) {
    match connection.replace_track(track).await {
        Ok(true) => {}
        Ok(false) => {
            debug!("No {} sender for {}, adding one", track.kind(), key);
            if let Err(e) = connection.add_track(track).await {
                warn!("Failed to add {} track for {}: {:?}", track.kind(), key, e);
            }
        }
        Err(e) => warn!("Failed to replace {} track for {}: {:?}", track.kind(), key, e),
    }
}
