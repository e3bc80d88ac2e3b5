use std::collections::BTreeMap;

use pfcpsim_core::FSeid;
use pfcpsim_rules::{BuiltRule, FarConfig, IeMethod, PdrConfig, QerConfig, RuleDefinition, RuleKind};
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionState {
    Pending,
    Established,
    Modifying,
    Deleting,
    Deleted,
}

impl std::fmt::Display for SessionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:?}", self)
    }
}

#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransitionError {
    #[error("Session has an operation in flight ({0})")]
    Busy(SessionState),

    #[error("Session is not established ({0})")]
    NotEstablished(SessionState),
}

/// Rules installed on the peer, ordered by kind and ID
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RuleSet {
    rules: BTreeMap<(RuleKind, u32), RuleDefinition>,
}

impl RuleSet {
    pub fn from_rules(rules: &[BuiltRule]) -> Self {
        let mut set = Self::default();
        set.apply(rules);
        set
    }

    /// Merge a change set: created and updated rules replace, removed rules go away
    pub fn apply(&mut self, changes: &[BuiltRule]) {
        for rule in changes {
            let key = (rule.kind(), rule.id());
            match rule.method {
                IeMethod::Create | IeMethod::Update => {
                    self.rules.insert(key, rule.definition.clone());
                }
                IeMethod::Delete => {
                    self.rules.remove(&key);
                }
            }
        }
    }

    pub fn get(&self, kind: RuleKind, id: u32) -> Option<&RuleDefinition> {
        self.rules.get(&(kind, id))
    }

    pub fn pdrs(&self) -> impl Iterator<Item = &PdrConfig> {
        self.rules.values().filter_map(|r| match r {
            RuleDefinition::Pdr(pdr) => Some(pdr),
            _ => None,
        })
    }

    pub fn fars(&self) -> impl Iterator<Item = &FarConfig> {
        self.rules.values().filter_map(|r| match r {
            RuleDefinition::Far(far) => Some(far),
            _ => None,
        })
    }

    pub fn qers(&self) -> impl Iterator<Item = &QerConfig> {
        self.rules.values().filter_map(|r| match r {
            RuleDefinition::Qer(qer) => Some(qer),
            _ => None,
        })
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}

/// One PFCP session as seen from the CP side
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    pub local_fseid: FSeid,
    pub remote_fseid: Option<FSeid>,
    pub state: SessionState,
    pub rules: RuleSet,
}

impl Session {
    pub fn new(local_fseid: FSeid) -> Self {
        Self {
            local_fseid,
            remote_fseid: None,
            state: SessionState::Pending,
            rules: RuleSet::default(),
        }
    }

    pub fn local_seid(&self) -> u64 {
        self.local_fseid.seid
    }

    pub fn remote_seid(&self) -> Option<u64> {
        self.remote_fseid.as_ref().map(|f| f.seid)
    }

    pub fn establish(&mut self, remote_fseid: Option<FSeid>, rules: &[BuiltRule]) {
        self.remote_fseid = remote_fseid;
        self.rules = RuleSet::from_rules(rules);
        self.state = SessionState::Established;
    }

    fn begin(&mut self, next: SessionState) -> Result<(), TransitionError> {
        match self.state {
            SessionState::Established => {
                self.state = next;
                Ok(())
            }
            SessionState::Modifying | SessionState::Deleting => {
                Err(TransitionError::Busy(self.state))
            }
            state => Err(TransitionError::NotEstablished(state)),
        }
    }

    pub fn begin_modification(&mut self) -> Result<(), TransitionError> {
        self.begin(SessionState::Modifying)
    }

    /// Merge the accepted changes; `None` keeps the rule set untouched
    pub fn finish_modification(&mut self, accepted: Option<&[BuiltRule]>) {
        if let Some(changes) = accepted {
            self.rules.apply(changes);
        }
        self.state = SessionState::Established;
    }

    pub fn begin_deletion(&mut self) -> Result<(), TransitionError> {
        self.begin(SessionState::Deleting)
    }

    pub fn finish_deletion(&mut self) {
        self.state = SessionState::Deleted;
    }

    /// Back to Established after an abandoned operation
    pub fn abort_operation(&mut self) {
        if matches!(self.state, SessionState::Modifying | SessionState::Deleting) {
            self.state = SessionState::Established;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pfcpsim_core::{ApplyAction, Interface};
    use pfcpsim_rules::FarBuilder;
    use std::net::{IpAddr, Ipv4Addr};

    fn far(id: u32, method: IeMethod, teid: u32) -> BuiltRule {
        FarBuilder::new()
            .with_id(id)
            .with_action(ApplyAction::FORWARD)
            .with_dst_interface(Interface::Access)
            .with_teid(teid)
            .with_downlink_ip(Ipv4Addr::new(10, 0, 0, 1))
            .build(method)
            .unwrap()
    }

    fn established() -> Session {
        let mut session = Session::new(FSeid::new(1, IpAddr::V4(Ipv4Addr::LOCALHOST)));
        session.establish(
            Some(FSeid::new(99, IpAddr::V4(Ipv4Addr::LOCALHOST))),
            &[far(1, IeMethod::Create, 10), far(2, IeMethod::Create, 20)],
        );
        session
    }

    #[test]
    fn test_establish() {
        let session = established();
        assert_eq!(session.state, SessionState::Established);
        assert_eq!(session.remote_seid(), Some(99));
        assert_eq!(session.rules.fars().count(), 2);
    }

    #[test]
    fn test_modification_merges_changes() {
        let mut session = established();
        session.begin_modification().unwrap();
        assert_eq!(session.state, SessionState::Modifying);

        let changes = vec![
            far(1, IeMethod::Delete, 0),
            far(2, IeMethod::Update, 21),
            far(3, IeMethod::Create, 30),
        ];
        session.finish_modification(Some(changes.as_slice()));

        assert_eq!(session.state, SessionState::Established);
        let teids: Vec<(u32, u32)> = session.rules.fars().map(|f| (f.id, f.teid)).collect();
        assert_eq!(teids, vec![(2, 21), (3, 30)]);
    }

    #[test]
    fn test_failed_modification_keeps_rules() {
        let mut session = established();
        let before = session.rules.clone();
        session.begin_modification().unwrap();
        session.finish_modification(None);
        assert_eq!(session.rules, before);
        assert_eq!(session.state, SessionState::Established);
    }

    #[test]
    fn test_busy_and_not_established() {
        let mut session = established();
        session.begin_modification().unwrap();
        assert_eq!(
            session.begin_deletion(),
            Err(TransitionError::Busy(SessionState::Modifying))
        );

        session.abort_operation();
        session.begin_deletion().unwrap();
        session.finish_deletion();
        assert_eq!(
            session.begin_modification(),
            Err(TransitionError::NotEstablished(SessionState::Deleted))
        );
    }
}
