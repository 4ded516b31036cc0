// Auto-detect recording control
//
// Bridges the conversation detector's event stream to the recording
// coordinator: a Started event begins a recording, an Ended event stops it
// and forwards the finalized meeting to whoever persists it. Detector and
// coordinator are constructed by the caller and passed in; this module
// keeps no global state.

use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{error, info, warn};

use super::coordinator::RecordingCoordinator;
use crate::detect::ConversationEvent;
use crate::meeting::FinalizedMeeting;

const FINALIZED_CHANNEL_CAPACITY: usize = 4;

/// Drives the coordinator from conversation detection events
pub struct AutoRecorder {
    task: JoinHandle<()>,
}

impl AutoRecorder {
    /// Spawn the controller. Returns the receiver of finalized meetings.
    pub fn spawn(
        coordinator: Arc<RecordingCoordinator>,
        mut events: mpsc::Receiver<ConversationEvent>,
    ) -> (Self, mpsc::Receiver<FinalizedMeeting>) {
        let (finalized_tx, finalized_rx) = mpsc::channel(FINALIZED_CHANNEL_CAPACITY);

        let task = tokio::spawn(async move {
            info!("Auto-detect recording controller started");

            while let Some(event) = events.recv().await {
                match event {
                    ConversationEvent::Started { confidence, .. } => {
                        if coordinator.is_recording() {
                            continue;
                        }
                        info!(
                            "Conversation detected (confidence {:.2}), starting recording",
                            confidence
                        );
                        if let Err(e) = coordinator.start().await {
                            error!("Auto-start failed: {}", e);
                        }
                    }
                    ConversationEvent::Ended { .. } => {
                        if !coordinator.is_recording() {
                            continue;
                        }
                        info!("Conversation ended, stopping recording");
                        match coordinator.stop().await {
                            Ok(meeting) => {
                                if finalized_tx.send(meeting).await.is_err() {
                                    warn!("Finalized meeting receiver dropped");
                                    break;
                                }
                            }
                            Err(e) => error!("Auto-stop failed: {}", e),
                        }
                    }
                }
            }

            info!("Auto-detect recording controller stopped");
        });

        (Self { task }, finalized_rx)
    }

    /// Stop the controller task (does not stop an in-progress recording)
    pub fn shutdown(self) {
        self.task.abort();
    }
}
