use std::sync::{Arc, Weak};

use pfcpsim_client_core::{AssociationAction, AssociationEvent, AssociationState};
use pfcpsim_core::message;
use pfcpsim_metrics::HEARTBEAT_MISSES_TOTAL;
use tokio::time::{interval, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::client::{ClientEvent, ClientInner, PfcpClient};
use crate::error::{ClientError, Result};

/// Feeds `on_abort` to the state machine if the operation is dropped midway
struct AssociationGuard<'a> {
    client: &'a PfcpClient,
    on_abort: Option<AssociationEvent>,
}

impl AssociationGuard<'_> {
    fn disarm(mut self) {
        self.on_abort = None;
    }
}

impl Drop for AssociationGuard<'_> {
    fn drop(&mut self) {
        if let Some(event) = self.on_abort.take() {
            let actions = self.client.inner.association.lock().step(event);
            if let Ok(actions) = actions {
                self.client.apply_association_actions(actions);
            }
        }
    }
}

impl PfcpClient {
    fn step_association(&self, event: AssociationEvent) -> Result<Vec<AssociationAction>> {
        let actions = self
            .inner
            .association
            .lock()
            .step(event)
            .map_err(|e| ClientError::InvalidState(e.to_string()))?;
        Ok(actions)
    }

    pub(crate) fn require_associated(&self) -> Result<()> {
        match self.association_state() {
            AssociationState::Associated => Ok(()),
            _ => Err(ClientError::NotAssociated),
        }
    }

    /// Association Setup: Unassociated -> Associated, then start heartbeats
    pub async fn associate(&self) -> Result<()> {
        let actions = self.step_association(AssociationEvent::SetupRequested)?;
        self.apply_association_actions(actions);
        let guard = AssociationGuard {
            client: self,
            on_abort: Some(AssociationEvent::SetupTimedOut),
        };

        info!(
            peer = %self.peer_address(),
            node_id = %self.inner.node_id,
            "Sending association setup request"
        );
        let node_id = self.inner.node_id.clone();
        let recovery = self.inner.recovery;
        let outcome = self
            .request(
                |seq| message::association_setup_request(seq, &node_id, recovery),
                self.inner.config.retry,
            )
            .await;
        guard.disarm();

        let response = match outcome {
            Ok(response) => response,
            Err(ClientError::RequestTimedOut { attempts, .. }) => {
                self.step_association(AssociationEvent::SetupTimedOut)?;
                warn!(attempts, "Association setup timed out");
                return Err(ClientError::AssociationFailed {
                    reason: format!("no response after {attempts} attempts"),
                });
            }
            Err(e) => {
                self.step_association(AssociationEvent::SetupTimedOut)?;
                return Err(e);
            }
        };

        match response.cause() {
            Some(cause) if cause.is_accepted() => {
                let peer_recovery = response.recovery_time_stamp();
                let actions =
                    self.step_association(AssociationEvent::SetupAccepted { peer_recovery })?;
                self.apply_association_actions(actions);
                info!(peer = %self.peer_address(), "Association established");
                self.emit(ClientEvent::Associated { peer_recovery });
                Ok(())
            }
            Some(cause) => {
                self.step_association(AssociationEvent::SetupRejected { cause })?;
                warn!(%cause, "Association setup rejected");
                Err(ClientError::AssociationFailed {
                    reason: format!("peer rejected setup: {cause}"),
                })
            }
            None => {
                self.step_association(AssociationEvent::SetupTimedOut)?;
                Err(ClientError::AssociationFailed {
                    reason: "setup response carries no cause".to_string(),
                })
            }
        }
    }

    /// Association Release. Best effort: a timeout still completes the release.
    pub async fn release(&self) -> Result<()> {
        let actions = match self.step_association(AssociationEvent::ReleaseRequested) {
            Ok(actions) => actions,
            Err(_) if self.association_state() == AssociationState::Unassociated => {
                return Err(ClientError::NotAssociated)
            }
            Err(e) => return Err(e),
        };
        self.apply_association_actions(actions);
        let guard = AssociationGuard {
            client: self,
            on_abort: Some(AssociationEvent::ReleaseCompleted),
        };

        let node_id = self.inner.node_id.clone();
        let outcome = self
            .request(
                |seq| message::association_release_request(seq, &node_id),
                self.inner.config.retry,
            )
            .await;
        guard.disarm();

        self.step_association(AssociationEvent::ReleaseCompleted)?;
        let dropped = self.drop_sessions();
        self.emit(ClientEvent::Released);

        match outcome {
            Ok(response) => {
                match response.cause() {
                    Some(cause) if cause.is_accepted() => {}
                    cause => warn!(cause = ?cause, "Association release not accepted"),
                }
                info!(sessions = dropped.len(), "Association released");
                Ok(())
            }
            Err(ClientError::RequestTimedOut { attempts, .. }) => {
                warn!(attempts, "Association release unanswered, released locally");
                Ok(())
            }
            Err(e) => Err(e),
        }
    }

    // ========================================
    // Heartbeat
    // ========================================

    pub(crate) fn start_heartbeat(&self) {
        let token = self.inner.shutdown.child_token();
        if let Some(previous) = self.inner.heartbeat.lock().replace(token.clone()) {
            previous.cancel();
        }
        tokio::spawn(run_heartbeat(Arc::downgrade(&self.inner), token));
    }

    pub(crate) fn stop_heartbeat(&self) {
        if let Some(token) = self.inner.heartbeat.lock().take() {
            token.cancel();
        }
    }
}

async fn run_heartbeat(weak: Weak<ClientInner>, token: CancellationToken) {
    let period = match weak.upgrade() {
        Some(inner) => inner.config.heartbeat_interval,
        None => return,
    };
    let mut ticker = interval(period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
    // First tick completes immediately
    ticker.tick().await;

    loop {
        tokio::select! {
            _ = token.cancelled() => break,
            _ = ticker.tick() => {}
        }

        let Some(inner) = weak.upgrade() else {
            break;
        };
        let client = PfcpClient { inner };
        let recovery = client.inner.recovery;
        let policy = client.inner.config.heartbeat_retry;

        let outcome = tokio::select! {
            _ = token.cancelled() => break,
            outcome = client.request(|seq| message::heartbeat_request(seq, recovery), policy) => outcome,
        };

        let event = match outcome {
            Ok(response) => AssociationEvent::HeartbeatAnswered {
                peer_recovery: response.recovery_time_stamp(),
            },
            Err(ClientError::AssociationLost | ClientError::ShuttingDown) => break,
            Err(e) => {
                HEARTBEAT_MISSES_TOTAL.inc();
                warn!(error = %e, "Heartbeat missed");
                AssociationEvent::HeartbeatMissed
            }
        };

        let stepped = client.inner.association.lock().step(event);
        match stepped {
            Ok(actions) => client.apply_association_actions(actions),
            Err(e) => debug!(error = %e, "Heartbeat outcome ignored"),
        }
    }

    debug!("Heartbeat loop stopped");
}
