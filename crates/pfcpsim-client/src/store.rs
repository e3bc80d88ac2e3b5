use dashmap::DashMap;
use pfcpsim_client_core::PendingRequest;
use pfcpsim_core::PfcpPacket;
use tokio::sync::oneshot;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum FailReason {
    AssociationLost,
    ShuttingDown,
}

/// What a waiting request receives
#[derive(Debug)]
pub(crate) enum Delivery {
    Response(PfcpPacket),
    Failed(FailReason),
}

#[derive(Debug, PartialEq, Eq)]
pub(crate) enum Completion {
    Delivered,
    /// No request with this sequence number
    Unmatched,
    /// Sequence number known, message type does not answer it
    WrongType,
}

type Waiter = oneshot::Sender<Delivery>;

/// Outstanding requests keyed by sequence number
#[derive(Debug, Default)]
pub(crate) struct PendingStore {
    requests: DashMap<u32, PendingRequest<Waiter>>,
}

impl PendingStore {
    pub fn new() -> Self {
        Self {
            requests: DashMap::new(),
        }
    }

    pub fn register(&self, request: PendingRequest<Waiter>) {
        self.requests.insert(request.sequence, request);
    }

    /// Hand a response to the request it answers
    pub fn complete(&self, response: PfcpPacket) -> Completion {
        let sequence = response.sequence_number();
        let answered = self
            .requests
            .remove_if(&sequence, |_, p| p.is_answered_by(response.message_type()));

        match answered {
            Some((_, request)) => {
                // Receiver gone means the caller was cancelled; nothing left to do
                let _ = request.waiter.send(Delivery::Response(response));
                Completion::Delivered
            }
            None if self.requests.contains_key(&sequence) => Completion::WrongType,
            None => Completion::Unmatched,
        }
    }

    pub fn record_retransmission(&self, sequence: u32) -> Option<u32> {
        self.requests.get_mut(&sequence).map(|mut p| {
            p.retransmitted();
            p.retries
        })
    }

    pub fn remove(&self, sequence: u32) -> bool {
        self.requests.remove(&sequence).is_some()
    }

    /// Fail every outstanding request, returning how many there were
    pub fn fail_all(&self, reason: FailReason) -> usize {
        let sequences: Vec<u32> = self.requests.iter().map(|entry| *entry.key()).collect();
        let mut failed = 0;
        for sequence in sequences {
            if let Some((_, request)) = self.requests.remove(&sequence) {
                let _ = request.waiter.send(Delivery::Failed(reason));
                failed += 1;
            }
        }
        failed
    }

    pub fn len(&self) -> usize {
        self.requests.len()
    }
}
