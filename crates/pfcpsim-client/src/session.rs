use pfcpsim_client_core::{AssociationState, Session, TransitionError};
use pfcpsim_core::{FSeid, MessageType, PdnType, PfcpPacket};
use pfcpsim_metrics::{ACTIVE_SESSIONS, PFCP_REJECTIONS_TOTAL};
use pfcpsim_rules::{BuiltRule, SessionBuilder, SessionRequest};
use tracing::{info, warn};

use crate::client::PfcpClient;
use crate::error::{ClientError, Result};

/// Rules and parameters of a session to establish
#[derive(Debug, Clone, Default)]
pub struct SessionSpec {
    pub rules: Vec<BuiltRule>,
    pub pdn_type: Option<PdnType>,
}

impl SessionSpec {
    pub fn new(rules: Vec<BuiltRule>) -> Self {
        Self {
            rules,
            pdn_type: None,
        }
    }

    pub fn with_pdn_type(mut self, pdn_type: PdnType) -> Self {
        self.pdn_type = Some(pdn_type);
        self
    }
}

/// Puts the session back to Established unless the operation completed
struct SessionStateGuard<'a> {
    client: &'a PfcpClient,
    seid: u64,
    armed: bool,
}

impl SessionStateGuard<'_> {
    fn disarm(&mut self) {
        self.armed = false;
    }
}

impl Drop for SessionStateGuard<'_> {
    fn drop(&mut self) {
        if self.armed {
            if let Some(mut session) = self.client.inner.sessions.get_mut(&self.seid) {
                session.abort_operation();
            }
        }
    }
}

fn transition_error(seid: u64, err: TransitionError) -> ClientError {
    match err {
        TransitionError::Busy(_) => ClientError::SessionBusy(seid),
        TransitionError::NotEstablished(state) => {
            ClientError::InvalidState(format!("session {seid:#x} is {state}"))
        }
    }
}

fn unexpected(request: MessageType, reason: &str) -> ClientError {
    ClientError::UnexpectedResponse {
        request,
        reason: reason.to_string(),
    }
}

impl PfcpClient {
    async fn send_session_request(&self, request: &SessionRequest) -> Result<PfcpPacket> {
        self.request(|seq| request.to_packet(seq), self.inner.config.retry)
            .await
    }

    /// Enter a transient state, failing fast when another operation holds the session
    fn begin_operation(
        &self,
        seid: u64,
        begin: impl FnOnce(&mut Session) -> std::result::Result<(), TransitionError>,
    ) -> Result<(SessionStateGuard<'_>, FSeid, u64)> {
        let mut session = self
            .inner
            .sessions
            .get_mut(&seid)
            .ok_or(ClientError::SessionNotFound(seid))?;
        begin(&mut *session).map_err(|e| transition_error(seid, e))?;
        let local_fseid = session.local_fseid.clone();
        let remote_seid = session.remote_seid().unwrap_or_default();
        drop(session);

        let guard = SessionStateGuard {
            client: self,
            seid,
            armed: true,
        };
        Ok((guard, local_fseid, remote_seid))
    }

    /// Add an established session unless the association went away meanwhile
    fn record_session(&self, session: Session) -> Result<()> {
        // Association loss drops sessions only after leaving Associated, so
        // holding the lock over check and insert keeps the two ordered
        let association = self.inner.association.lock();
        if association.state() != AssociationState::Associated {
            return Err(ClientError::AssociationLost);
        }
        self.inner.sessions.insert(session.local_seid(), session);
        ACTIVE_SESSIONS.inc();
        Ok(())
    }

    /// Session Establishment. The session is only recorded once the peer accepts it.
    pub async fn establish_session(&self, spec: SessionSpec) -> Result<Session> {
        self.require_associated()?;

        let seid = self.allocate_seid();
        let local_fseid = FSeid::new(seid, self.inner.local_address);
        let mut builder = SessionBuilder::new(self.inner.node_id.clone())
            .with_local_fseid(local_fseid.clone())
            .add_rules(spec.rules);
        if let Some(pdn_type) = spec.pdn_type {
            builder = builder.with_pdn_type(pdn_type);
        }
        let request = builder.build_establishment()?;

        let response = self.send_session_request(&request).await?;
        let message_type = request.message_type();
        let cause = response
            .cause()
            .ok_or_else(|| unexpected(message_type, "missing cause"))?;
        if !cause.is_accepted() {
            PFCP_REJECTIONS_TOTAL
                .with_label_values(&[message_type.name()])
                .inc();
            warn!(seid, %cause, "Session establishment rejected");
            return Err(ClientError::SessionRejected { cause });
        }

        let remote_fseid = response
            .f_seid()?
            .ok_or_else(|| unexpected(message_type, "accepted without UP F-SEID"))?;

        let mut session = Session::new(local_fseid);
        session.establish(Some(remote_fseid), &request.rules);
        self.record_session(session.clone())?;

        info!(
            seid,
            remote_seid = session.remote_seid().unwrap_or_default(),
            rules = session.rules.len(),
            "Session established"
        );
        Ok(session)
    }

    /// Session Modification. Rejected changes leave the rule set untouched.
    pub async fn modify_session(&self, local_seid: u64, changes: Vec<BuiltRule>) -> Result<Session> {
        self.require_associated()?;
        let (mut guard, local_fseid, remote_seid) =
            self.begin_operation(local_seid, Session::begin_modification)?;

        let request = SessionBuilder::new(self.inner.node_id.clone())
            .with_local_fseid(local_fseid)
            .with_remote_seid(remote_seid)
            .add_rules(changes)
            .build_modification()?;

        let response = self.send_session_request(&request).await?;
        let message_type = request.message_type();
        let cause = response
            .cause()
            .ok_or_else(|| unexpected(message_type, "missing cause"))?;
        if !cause.is_accepted() {
            PFCP_REJECTIONS_TOTAL
                .with_label_values(&[message_type.name()])
                .inc();
            warn!(seid = local_seid, %cause, "Session modification rejected");
            return Err(ClientError::SessionRejected { cause });
        }

        guard.disarm();
        let mut session = self
            .inner
            .sessions
            .get_mut(&local_seid)
            .ok_or(ClientError::AssociationLost)?;
        session.finish_modification(Some(request.rules.as_slice()));

        info!(seid = local_seid, changes = request.rules.len(), "Session modified");
        Ok(session.clone())
    }

    /// Session Deletion. Any response removes the session; a rejecting cause is still reported.
    pub async fn delete_session(&self, local_seid: u64) -> Result<()> {
        self.require_associated()?;
        let (mut guard, local_fseid, remote_seid) =
            self.begin_operation(local_seid, Session::begin_deletion)?;

        let request = SessionBuilder::new(self.inner.node_id.clone())
            .with_local_fseid(local_fseid)
            .with_remote_seid(remote_seid)
            .build_deletion()?;

        let response = self.send_session_request(&request).await?;
        guard.disarm();

        if let Some((_, mut session)) = self.inner.sessions.remove(&local_seid) {
            session.finish_deletion();
            ACTIVE_SESSIONS.dec();
        }

        match response.cause() {
            Some(cause) if cause.is_accepted() => {
                info!(seid = local_seid, "Session deleted");
                Ok(())
            }
            Some(cause) => {
                PFCP_REJECTIONS_TOTAL
                    .with_label_values(&[request.message_type().name()])
                    .inc();
                warn!(seid = local_seid, %cause, "Session deletion rejected, removed locally");
                Err(ClientError::SessionRejected { cause })
            }
            None => Err(unexpected(request.message_type(), "missing cause")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ClientConfig;
    use pfcpsim_client_core::AssociationEvent;
    use std::net::{IpAddr, Ipv4Addr};

    fn established(seid: u64) -> Session {
        let mut session = Session::new(FSeid::new(seid, IpAddr::V4(Ipv4Addr::LOCALHOST)));
        session.establish(None, &[]);
        session
    }

    #[tokio::test]
    async fn test_session_not_recorded_after_association_loss() {
        let silent = tokio::net::UdpSocket::bind("127.0.0.1:0").await.unwrap();
        let client = PfcpClient::connect(
            ClientConfig::new(silent.local_addr().unwrap()).with_max_missed_heartbeats(3),
        )
        .await
        .unwrap();
        {
            let mut fsm = client.inner.association.lock();
            fsm.step(AssociationEvent::SetupRequested).unwrap();
            fsm.step(AssociationEvent::SetupAccepted { peer_recovery: None })
                .unwrap();
        }

        client.record_session(established(1)).unwrap();
        assert_eq!(client.sessions().len(), 1);

        // Loss lands while a second establishment waits for its answer
        for _ in 0..3 {
            let actions = client
                .inner
                .association
                .lock()
                .step(AssociationEvent::HeartbeatMissed)
                .unwrap();
            client.apply_association_actions(actions);
        }
        assert!(client.sessions().is_empty());

        let err = client.record_session(established(2)).unwrap_err();
        assert!(matches!(err, ClientError::AssociationLost));
        assert!(client.sessions().is_empty());
        client.shutdown();
    }
}
