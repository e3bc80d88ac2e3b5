mod common;

use std::net::Ipv4Addr;
use std::time::Duration;

use common::{Behaviour, MockUpf};
use pfcpsim_client::{AssociationState, ClientError, ClientEvent, PfcpClient, RetryPolicy, SessionSpec};
use pfcpsim_core::{ApplyAction, Interface, MessageType};
use pfcpsim_rules::{FarBuilder, IeMethod, PdrBuilder};

fn session_spec() -> SessionSpec {
    SessionSpec::new(vec![
        PdrBuilder::uplink(1, 100, 0x10, Ipv4Addr::new(10, 0, 0, 1))
            .with_far_id(1)
            .build(IeMethod::Create)
            .unwrap(),
        FarBuilder::new()
            .with_id(1)
            .with_action(ApplyAction::FORWARD)
            .with_dst_interface(Interface::Core)
            .build(IeMethod::Create)
            .unwrap(),
    ])
}

#[tokio::test]
async fn test_associate() {
    pfcpsim_logging::init_test();
    let upf = MockUpf::accepting().await;
    let client = PfcpClient::connect(upf.client_config()).await.unwrap();
    let mut events = client.subscribe();
    assert_eq!(client.association_state(), AssociationState::Unassociated);

    client.associate().await.unwrap();

    assert_eq!(client.association_state(), AssociationState::Associated);
    assert!(matches!(
        events.recv().await.unwrap(),
        ClientEvent::Associated { peer_recovery: Some(_) }
    ));
    let setup = upf.received_of(MessageType::AssociationSetupRequest);
    assert_eq!(setup.len(), 1);
    assert_eq!(setup[0].node_id().unwrap().as_ref(), Some(client.node_id()));
    assert_eq!(
        setup[0].recovery_time_stamp(),
        Some(client.recovery_time_stamp())
    );

    // Already associated
    assert!(matches!(
        client.associate().await,
        Err(ClientError::InvalidState(_))
    ));
}

#[tokio::test]
async fn test_associate_rejected() {
    pfcpsim_logging::init_test();
    let upf = MockUpf::start(Behaviour {
        association_cause: Some(64),
        ..Behaviour::default()
    })
    .await;
    let client = PfcpClient::connect(upf.client_config()).await.unwrap();

    let err = client.associate().await.unwrap_err();

    assert!(matches!(err, ClientError::AssociationFailed { .. }));
    assert_eq!(client.association_state(), AssociationState::Unassociated);
}

#[tokio::test]
async fn test_associate_unanswered() {
    pfcpsim_logging::init_test();
    let upf = MockUpf::start(Behaviour {
        association_cause: None,
        ..Behaviour::default()
    })
    .await;
    let client = PfcpClient::connect(upf.client_config()).await.unwrap();

    let err = client.associate().await.unwrap_err();

    assert!(matches!(err, ClientError::AssociationFailed { .. }));
    assert_eq!(upf.received_of(MessageType::AssociationSetupRequest).len(), 3);
    assert_eq!(client.association_state(), AssociationState::Unassociated);

    // A later attempt may succeed
    upf.update(|b| b.association_cause = Some(1));
    client.associate().await.unwrap();
}

#[tokio::test]
async fn test_heartbeats_are_sent_while_associated() {
    pfcpsim_logging::init_test();
    let upf = MockUpf::accepting().await;
    let client = PfcpClient::connect(
        upf.client_config()
            .with_heartbeat_interval(Duration::from_millis(50)),
    )
    .await
    .unwrap();
    client.associate().await.unwrap();

    tokio::time::sleep(Duration::from_millis(300)).await;

    assert!(upf.received_of(MessageType::HeartbeatRequest).len() >= 3);
    assert_eq!(client.association_state(), AssociationState::Associated);
}

#[tokio::test]
async fn test_missed_heartbeats_fail_in_flight_requests() {
    pfcpsim_logging::init_test();
    let upf = MockUpf::accepting().await;
    let client = PfcpClient::connect(
        upf.client_config()
            .with_heartbeat_interval(Duration::from_millis(50))
            .with_max_missed_heartbeats(3)
            .with_heartbeat_retry(RetryPolicy::fixed(0, Duration::from_millis(50)))
            .with_retry(RetryPolicy::fixed(0, Duration::from_secs(5))),
    )
    .await
    .unwrap();
    client.associate().await.unwrap();
    let established = client.establish_session(session_spec()).await.unwrap();
    let mut events = client.subscribe();

    upf.update(|b| {
        b.heartbeat = false;
        b.establishment_cause = None;
    });

    let err = tokio::time::timeout(
        Duration::from_secs(2),
        client.establish_session(session_spec()),
    )
    .await
    .expect("association loss should end the request early")
    .unwrap_err();

    assert!(matches!(err, ClientError::AssociationLost));
    assert_eq!(client.association_state(), AssociationState::Unassociated);
    assert!(client.sessions().is_empty());
    assert_eq!(client.pending_requests(), 0);
    assert_eq!(client.sequences_in_flight(), 0);

    match events.recv().await.unwrap() {
        ClientEvent::AssociationLost { sessions } => {
            assert_eq!(sessions, vec![established.local_seid()]);
        }
        other => panic!("unexpected event {other:?}"),
    }

    let err = client.establish_session(session_spec()).await.unwrap_err();
    assert!(matches!(err, ClientError::NotAssociated));
}

#[tokio::test]
async fn test_zero_heartbeat_interval_is_rejected() {
    pfcpsim_logging::init_test();
    let upf = MockUpf::accepting().await;

    let err = PfcpClient::connect(upf.client_config().with_heartbeat_interval(Duration::ZERO))
        .await
        .unwrap_err();

    assert!(matches!(err, ClientError::InvalidConfig(_)));
    assert!(upf.received().is_empty());
}

#[tokio::test]
async fn test_peer_heartbeat_is_answered() {
    pfcpsim_logging::init_test();
    let upf = MockUpf::accepting().await;
    let client = PfcpClient::connect(upf.client_config()).await.unwrap();
    let local = client.local_socket_addr().unwrap();

    let response = upf.probe_heartbeat(local, 0x42).await.unwrap();

    assert_eq!(response.message_type(), MessageType::HeartbeatResponse);
    assert_eq!(response.sequence_number(), 0x42);
    assert_eq!(
        response.recovery_time_stamp(),
        Some(client.recovery_time_stamp())
    );
}

#[tokio::test]
async fn test_release() {
    pfcpsim_logging::init_test();
    let upf = MockUpf::accepting().await;
    let client = PfcpClient::connect(upf.client_config()).await.unwrap();

    assert!(matches!(client.release().await, Err(ClientError::NotAssociated)));

    client.associate().await.unwrap();
    client.establish_session(session_spec()).await.unwrap();
    let mut events = client.subscribe();

    client.release().await.unwrap();

    assert_eq!(client.association_state(), AssociationState::Unassociated);
    assert!(client.sessions().is_empty());
    assert_eq!(events.recv().await.unwrap(), ClientEvent::Released);
    assert_eq!(upf.received_of(MessageType::AssociationReleaseRequest).len(), 1);
}

#[tokio::test]
async fn test_release_without_answer_completes_locally() {
    pfcpsim_logging::init_test();
    let upf = MockUpf::accepting().await;
    let client = PfcpClient::connect(upf.client_config()).await.unwrap();
    client.associate().await.unwrap();
    upf.update(|b| b.release_cause = None);

    client.release().await.unwrap();

    assert_eq!(client.association_state(), AssociationState::Unassociated);
    assert_eq!(upf.received_of(MessageType::AssociationReleaseRequest).len(), 3);
}

#[tokio::test]
async fn test_shutdown_fails_later_requests() {
    pfcpsim_logging::init_test();
    let upf = MockUpf::accepting().await;
    let client = PfcpClient::connect(upf.client_config()).await.unwrap();
    client.associate().await.unwrap();

    client.shutdown();

    let err = client.establish_session(session_spec()).await.unwrap_err();
    assert!(matches!(err, ClientError::ShuttingDown));
}
