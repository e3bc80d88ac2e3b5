use pfcpsim_core::{Cause, RecoveryTimeStamp};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AssociationState {
    Unassociated,
    Associating,
    Associated,
    Releasing,
}

impl std::fmt::Display for AssociationState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Unassociated => "unassociated",
            Self::Associating => "associating",
            Self::Associated => "associated",
            Self::Releasing => "releasing",
        };
        f.write_str(name)
    }
}

/// Input to the association state machine
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AssociationEvent {
    SetupRequested,
    SetupAccepted { peer_recovery: Option<RecoveryTimeStamp> },
    SetupRejected { cause: Cause },
    /// Setup retries exhausted
    SetupTimedOut,
    HeartbeatAnswered { peer_recovery: Option<RecoveryTimeStamp> },
    HeartbeatMissed,
    ReleaseRequested,
    /// Release answered or timed out
    ReleaseCompleted,
}

/// Output of the association state machine, executed by the runtime
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AssociationAction {
    SendSetupRequest,
    StartHeartbeat,
    StopHeartbeat,
    SendReleaseRequest,
    /// Fail in-flight requests and drop the sessions of this association
    NotifyAssociationLost,
    /// Heartbeat carried a new recovery timestamp
    PeerRestarted,
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Event {event:?} is not valid in state {state}")]
pub struct InvalidTransition {
    pub state: AssociationState,
    pub event: AssociationEvent,
}

#[derive(Debug, Clone)]
pub struct AssociationFsm {
    state: AssociationState,
    max_missed_heartbeats: u32,
    missed_heartbeats: u32, // consecutive
    peer_recovery: Option<RecoveryTimeStamp>,
}

impl AssociationFsm {
    pub fn new(max_missed_heartbeats: u32) -> Self {
        Self {
            state: AssociationState::Unassociated,
            max_missed_heartbeats: max_missed_heartbeats.max(1),
            missed_heartbeats: 0,
            peer_recovery: None,
        }
    }

    pub fn state(&self) -> AssociationState {
        self.state
    }

    pub fn missed_heartbeats(&self) -> u32 {
        self.missed_heartbeats
    }

    pub fn peer_recovery(&self) -> Option<RecoveryTimeStamp> {
        self.peer_recovery
    }

    pub fn step(
        &mut self,
        event: AssociationEvent,
    ) -> Result<Vec<AssociationAction>, InvalidTransition> {
        use AssociationAction as Action;
        use AssociationEvent as Event;
        use AssociationState as State;

        let mut actions = Vec::new();
        let from = self.state;

        match (self.state, &event) {
            // Setup
            (State::Unassociated, Event::SetupRequested) => {
                self.state = State::Associating;
                actions.push(Action::SendSetupRequest);
            }
            (State::Associating, Event::SetupAccepted { peer_recovery }) => {
                self.state = State::Associated;
                self.missed_heartbeats = 0;
                self.peer_recovery = *peer_recovery;
                actions.push(Action::StartHeartbeat);
            }
            (State::Associating, Event::SetupRejected { .. } | Event::SetupTimedOut) => {
                self.state = State::Unassociated;
            }

            // Keep-alive
            (State::Associated, Event::HeartbeatAnswered { peer_recovery }) => {
                self.missed_heartbeats = 0;
                if let (Some(known), Some(seen)) = (self.peer_recovery, *peer_recovery) {
                    if known != seen {
                        actions.push(Action::PeerRestarted);
                    }
                }
                if peer_recovery.is_some() {
                    self.peer_recovery = *peer_recovery;
                }
            }
            (State::Associated, Event::HeartbeatMissed) => {
                self.missed_heartbeats += 1;
                if self.missed_heartbeats >= self.max_missed_heartbeats {
                    self.state = State::Unassociated;
                    actions.push(Action::StopHeartbeat);
                    actions.push(Action::NotifyAssociationLost);
                }
            }
            // Late heartbeat outcome after the association went away
            (_, Event::HeartbeatAnswered { .. } | Event::HeartbeatMissed) => {}

            // Release
            (State::Associated, Event::ReleaseRequested) => {
                self.state = State::Releasing;
                actions.push(Action::StopHeartbeat);
                actions.push(Action::SendReleaseRequest);
            }
            (State::Associating, Event::ReleaseRequested) => {
                self.state = State::Releasing;
                actions.push(Action::SendReleaseRequest);
            }
            (State::Releasing, Event::ReleaseCompleted) => {
                self.state = State::Unassociated;
                self.missed_heartbeats = 0;
                self.peer_recovery = None;
            }

            _ => {
                return Err(InvalidTransition {
                    state: self.state,
                    event: event.clone(),
                })
            }
        }

        if from != self.state {
            debug!(from = %from, to = %self.state, event = ?event, "Association state changed");
        }
        Ok(actions)
    }
}
