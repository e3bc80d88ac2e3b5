use std::net::Ipv4Addr;
use std::ops::Range;

use dashmap::DashMap;
use parking_lot::RwLock;
use pfcpsim_client::{AssociationState, ClientError, PfcpClient, SessionSpec};
use pfcpsim_config::{parse_ipv4_pool, parse_peer_address, SimConfig};
use pfcpsim_core::PdnType;
use pfcpsim_proto::{
    AssociateRequest, ConfigureRequest, CreateSessionRequest, DeleteSessionRequest,
    ModifySessionRequest, Response,
};
use tokio::sync::Mutex;
use tracing::{info, warn};

use crate::error::ServiceError;
use crate::plan::{self, Endpoints};
use crate::settings::client_config;

type ServiceResult = Result<String, ServiceError>;

/// Simulator control surface. Each instance drives at most one association.
#[derive(Debug)]
pub struct PfcpSimService {
    config: RwLock<SimConfig>,
    /// Held across associate/disassociate so lifecycle calls never interleave
    client: Mutex<Option<PfcpClient>>,
    /// Operator session ID -> local SEID
    sessions: DashMap<u32, u64>,
}

fn respond(operation: &str, result: ServiceResult) -> Response {
    match result {
        Ok(message) => {
            info!(operation, "{}", message);
            Response::ok(message)
        }
        Err(e) => {
            let status = e.status_code();
            warn!(operation, status = ?status, error = %e, "Operation failed");
            Response::error(status, e.to_string())
        }
    }
}

fn parse_ipv4(field: &str, value: &str) -> Result<Ipv4Addr, ServiceError> {
    value
        .parse()
        .map_err(|_| ServiceError::InvalidArgument(format!("{field}: '{value}' is not an IPv4 address")))
}

fn id_range(count: u32, base_id: u32) -> Result<Range<u32>, ServiceError> {
    if count == 0 {
        return Err(ServiceError::InvalidArgument("count must be positive".to_string()));
    }
    if base_id == 0 {
        return Err(ServiceError::InvalidArgument("base_id must be positive".to_string()));
    }
    let end = base_id
        .checked_add(count)
        .ok_or_else(|| ServiceError::InvalidArgument("session ID range overflows".to_string()))?;
    Ok(base_id..end)
}

impl PfcpSimService {
    pub fn new(config: SimConfig) -> Self {
        Self {
            config: RwLock::new(config),
            client: Mutex::new(None),
            sessions: DashMap::new(),
        }
    }

    pub fn config(&self) -> SimConfig {
        self.config.read().clone()
    }

    /// Local SEID of the session created under `id`
    pub fn session_seid(&self, id: u32) -> Option<u64> {
        self.sessions.get(&id).map(|seid| *seid)
    }

    pub fn session_count(&self) -> usize {
        self.sessions.len()
    }

    pub async fn client(&self) -> Option<PfcpClient> {
        self.client.lock().await.clone()
    }

    async fn associated_client(&self) -> Result<PfcpClient, ServiceError> {
        match self.client().await {
            Some(client) if client.association_state() == AssociationState::Associated => Ok(client),
            _ => Err(ServiceError::NotAssociated),
        }
    }

    // ========================================
    // Association
    // ========================================

    pub async fn configure(&self, request: ConfigureRequest) -> Response {
        respond("configure", self.try_configure(request).await)
    }

    async fn try_configure(&self, request: ConfigureRequest) -> ServiceResult {
        let peer = parse_peer_address(&request.remote_peer_address)?;
        let upf_n3 = parse_ipv4("upf_n3_address", &request.upf_n3_address)?;

        let client = self.client.lock().await;
        if let Some(current) = client.as_ref() {
            if current.association_state() != AssociationState::Unassociated {
                return Err(ServiceError::AlreadyAssociated(current.peer_address()));
            }
        }

        let mut config = self.config.write();
        config.peer_address = peer.to_string();
        config.upf_n3_address = upf_n3;
        Ok(format!("Peer set to {peer}, UPF N3 address {upf_n3}"))
    }

    pub async fn associate(&self, request: AssociateRequest) -> Response {
        respond("associate", self.try_associate(request).await)
    }

    async fn try_associate(&self, request: AssociateRequest) -> ServiceResult {
        let mut slot = self.client.lock().await;
        if let Some(current) = slot.as_ref() {
            if current.association_state() == AssociationState::Associated {
                return Err(ServiceError::AlreadyAssociated(current.peer_address()));
            }
        }
        // A client whose association was lost is replaced
        if let Some(stale) = slot.take() {
            stale.shutdown();
            self.sessions.clear();
        }

        let mut config = self.config();
        if let Some(peer) = request.peer_address {
            config.peer_address = peer;
        }
        let client = PfcpClient::connect(client_config(&config)?).await?;
        if let Err(e) = client.associate().await {
            client.shutdown();
            return Err(e.into());
        }

        let peer = client.peer_address();
        *slot = Some(client);
        Ok(format!("Associated with {peer}"))
    }

    pub async fn disassociate(&self) -> Response {
        respond("disassociate", self.try_disassociate().await)
    }

    async fn try_disassociate(&self) -> ServiceResult {
        let mut slot = self.client.lock().await;
        let client = slot.take().ok_or(ServiceError::NotAssociated)?;
        let peer = client.peer_address();

        let released = client.release().await;
        client.shutdown();
        self.sessions.clear();

        match released {
            Ok(()) => Ok(format!("Association with {peer} released")),
            Err(ClientError::NotAssociated) => Ok(format!("Association with {peer} was already gone")),
            Err(e) => Err(e.into()),
        }
    }

    // ========================================
    // Sessions
    // ========================================

    pub async fn create_session(&self, request: CreateSessionRequest) -> Response {
        respond("create_session", self.try_create_session(request).await)
    }

    async fn try_create_session(&self, request: CreateSessionRequest) -> ServiceResult {
        let ids = id_range(request.count, request.base_id)?;
        let endpoints = Endpoints {
            upf_n3: self.config.read().upf_n3_address,
            gnb: parse_ipv4("gnb_address", &request.gnb_address)?,
        };
        let (network, prefix_len) = parse_ipv4_pool(&request.ue_address_pool).ok_or_else(|| {
            ServiceError::InvalidArgument(format!(
                "ue_address_pool: '{}' is not an IPv4 prefix",
                request.ue_address_pool
            ))
        })?;

        // Check everything before touching the peer
        let mut planned = Vec::with_capacity(ids.len());
        for id in ids {
            if self.sessions.contains_key(&id) {
                return Err(ServiceError::SessionExists(id));
            }
            let ue = plan::ue_address(network, prefix_len, id)
                .ok_or_else(|| ServiceError::PoolExhausted(request.ue_address_pool.clone()))?;
            planned.push((id, plan::session_rules(id, endpoints, ue, request.qfi)?));
        }

        let client = self.associated_client().await?;
        for (id, rules) in planned {
            let spec = SessionSpec::new(rules).with_pdn_type(PdnType::Ipv4);
            let session = client.establish_session(spec).await?;
            self.sessions.insert(id, session.local_seid());
        }
        Ok(format!("{} sessions created", request.count))
    }

    pub async fn modify_session(&self, request: ModifySessionRequest) -> Response {
        respond("modify_session", self.try_modify_session(request).await)
    }

    async fn try_modify_session(&self, request: ModifySessionRequest) -> ServiceResult {
        let ids = id_range(request.count, request.base_id)?;
        let gnb = parse_ipv4("gnb_address", &request.gnb_address)?;
        let targets = self.lookup(ids)?;

        let client = self.associated_client().await?;
        for (id, seid) in targets {
            let change = plan::downlink_update(id, gnb, request.buffer, request.notify_cp)?;
            client.modify_session(seid, vec![change]).await?;
        }
        Ok(format!("{} sessions modified", request.count))
    }

    pub async fn delete_session(&self, request: DeleteSessionRequest) -> Response {
        respond("delete_session", self.try_delete_session(request).await)
    }

    async fn try_delete_session(&self, request: DeleteSessionRequest) -> ServiceResult {
        let ids = id_range(request.count, request.base_id)?;
        let targets = self.lookup(ids)?;

        let client = self.associated_client().await?;
        for (id, seid) in targets {
            let deleted = client.delete_session(seid).await;
            // The client forgets the session on any answer, even a rejection
            if client.session(seid).is_none() {
                self.sessions.remove(&id);
            }
            deleted?;
        }
        Ok(format!("{} sessions deleted", request.count))
    }

    fn lookup(&self, ids: Range<u32>) -> Result<Vec<(u32, u64)>, ServiceError> {
        ids.map(|id| {
            self.session_seid(id)
                .map(|seid| (id, seid))
                .ok_or(ServiceError::SessionNotFound(id))
        })
        .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pfcpsim_proto::StatusCode;

    #[tokio::test]
    async fn test_session_calls_require_association() {
        let service = PfcpSimService::new(SimConfig::default());

        let response = service
            .create_session(CreateSessionRequest {
                count: 1,
                base_id: 1,
                gnb_address: "10.0.0.3".to_string(),
                ue_address_pool: "17.0.0.0/24".to_string(),
                qfi: 9,
            })
            .await;
        assert_eq!(response.status_code, StatusCode::FailedPrecondition);

        let response = service.disassociate().await;
        assert_eq!(response.status_code, StatusCode::FailedPrecondition);
    }

    #[tokio::test]
    async fn test_invalid_arguments() {
        let service = PfcpSimService::new(SimConfig::default());

        let response = service
            .configure(ConfigureRequest {
                remote_peer_address: "upf".to_string(),
                upf_n3_address: "198.18.0.1".to_string(),
            })
            .await;
        assert_eq!(response.status_code, StatusCode::InvalidArgument);

        let response = service
            .delete_session(DeleteSessionRequest {
                count: 0,
                base_id: 1,
            })
            .await;
        assert_eq!(response.status_code, StatusCode::InvalidArgument);

        let response = service
            .modify_session(ModifySessionRequest {
                count: 1,
                base_id: 1,
                gnb_address: "10.0.0.3".to_string(),
                buffer: false,
                notify_cp: false,
            })
            .await;
        assert_eq!(response.status_code, StatusCode::NotFound);
    }

    #[tokio::test]
    async fn test_configure_updates_peer() {
        let service = PfcpSimService::new(SimConfig::default());

        let response = service
            .configure(ConfigureRequest {
                remote_peer_address: "10.0.0.2".to_string(),
                upf_n3_address: "198.18.0.9".to_string(),
            })
            .await;

        assert!(response.is_ok());
        let config = service.config();
        assert_eq!(config.peer_address, "10.0.0.2:8805");
        assert_eq!(config.upf_n3_address, Ipv4Addr::new(198, 18, 0, 9));
    }
}
