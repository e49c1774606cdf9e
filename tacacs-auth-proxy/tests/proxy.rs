use futures::StreamExt;
use tonic::{Code, Request};

use tacacs_auth_proxy::proto::openolt::indication::Data;
use tacacs_auth_proxy::proto::openolt::{Empty, Flow, Indication, Interface, OltIndication};
use tacacs_auth_proxy::AaaConfig;
use tacacs_plus::protocol::{accounting, authentication, authorization};
use tacacs_plus::AuthenticationType;

mod support;
use support::{
    aaa_config, authorized, eventually, FakeAgent, Record, Script, TacacsServer, ADMIN_CREDENTIALS,
    HEARTBEAT_SIGNATURE, REBOOT_REFUSED,
};

fn olt_indication(state: &str) -> Indication {
    Indication {
        data: Some(Data::OltInd(OltIndication {
            oper_state: state.to_owned(),
        })),
    }
}

#[tokio::test]
async fn authorized_call_is_forwarded_and_accounted() {
    let tacacs = TacacsServer::start(Script::default()).await;
    let agent = FakeAgent::default();
    let mut client = support::start(aaa_config(tacacs.address, false), agent.clone()).await;

    client
        .disable_olt(authorized(Empty {}, ADMIN_CREDENTIALS))
        .await
        .unwrap();

    assert_eq!(agent.calls(), ["disable_olt"]);

    let records = tacacs.records();
    assert_eq!(records.len(), 4, "{records:?}");

    assert_eq!(
        records[0],
        Record::AuthenticationStart {
            user: "admin".to_owned(),
            port: "ttyS0".to_owned(),
            remote_address: "127.0.0.1".to_owned(),
            data: b"secret".to_vec(),
        }
    );

    assert_eq!(
        records[1],
        Record::Authorization {
            user: "admin".to_owned(),
            arguments: vec!["service=shell".to_owned(), "cmd=disableolt".to_owned()],
        }
    );

    let (start, stop) = (&records[2], &records[3]);
    assert!(matches!(start, Record::Accounting { flags, .. } if *flags == accounting::Flags::StartRecord));
    assert!(matches!(stop, Record::Accounting { flags, .. } if *flags == accounting::Flags::StopRecord));

    assert!(start.argument("task_id").is_some());
    assert_eq!(start.argument("task_id"), stop.argument("task_id"));
    assert_eq!(start.argument("cmd"), Some("disableolt"));
    assert_eq!(stop.argument("cmd"), Some("disableolt"));

    let start_time: u64 = start.argument("start_time").unwrap().parse().unwrap();
    let stop_time: u64 = stop.argument("stop_time").unwrap().parse().unwrap();
    let elapsed: u64 = stop.argument("elapsed_time").unwrap().parse().unwrap();
    assert_eq!(stop_time - start_time, elapsed);

    assert_eq!(stop.argument("err_msg"), None);
}

#[tokio::test]
async fn backend_response_is_returned_unchanged() {
    let tacacs = TacacsServer::start(Script::default()).await;
    let mut client = support::start(aaa_config(tacacs.address, false), FakeAgent::default()).await;

    let heartbeat = client
        .heartbeat_check(authorized(Empty {}, ADMIN_CREDENTIALS))
        .await
        .unwrap()
        .into_inner();
    assert_eq!(heartbeat.heartbeat_signature, HEARTBEAT_SIGNATURE);

    let interface = client
        .get_pon_if(authorized(Interface { intf_id: 7 }, ADMIN_CREDENTIALS))
        .await
        .unwrap()
        .into_inner();
    assert_eq!(interface.intf_id, 7);
    assert_eq!(interface.oper_state, "up");
}

#[tokio::test]
async fn backend_error_is_passed_through_and_accounted() {
    let tacacs = TacacsServer::start(Script::default()).await;
    let agent = FakeAgent::default();
    let mut client = support::start(aaa_config(tacacs.address, false), agent.clone()).await;

    let status = client
        .reboot(authorized(Empty {}, ADMIN_CREDENTIALS))
        .await
        .unwrap_err();
    assert_eq!(status.code(), Code::Unavailable);
    assert_eq!(status.message(), REBOOT_REFUSED);
    assert_eq!(agent.calls(), ["reboot"]);

    let accounting = tacacs.accounting_records();
    assert_eq!(accounting.len(), 2);
    assert_eq!(accounting[1].argument("cmd"), Some("reboot"));
    assert_eq!(accounting[1].argument("err_msg"), Some(REBOOT_REFUSED));
}

#[tokio::test]
async fn missing_credentials_are_rejected_without_contacting_anyone() {
    let tacacs = TacacsServer::start(Script::default()).await;
    let agent = FakeAgent::default();
    let mut client = support::start(aaa_config(tacacs.address, true), agent.clone()).await;

    let status = client.disable_olt(Request::new(Empty {})).await.unwrap_err();

    assert_eq!(status.code(), Code::InvalidArgument);
    assert_eq!(
        status.message(),
        "Unable to find or extract credentials from incoming gRPC request"
    );
    assert_eq!(tacacs.connection_count(), 0);
    assert!(agent.calls().is_empty());
}

#[tokio::test]
async fn failed_authentication_stops_the_call() {
    let script = Script {
        authentication: vec![authentication::Status::Fail],
        ..Default::default()
    };
    let tacacs = TacacsServer::start(script).await;
    let agent = FakeAgent::default();
    let mut client = support::start(aaa_config(tacacs.address, true), agent.clone()).await;

    let status = client
        .reenable_olt(authorized(Empty {}, ADMIN_CREDENTIALS))
        .await
        .unwrap_err();

    assert_eq!(status.code(), Code::Unauthenticated);
    assert_eq!(status.message(), "Authentication against TACACS+ server failed");
    assert!(agent.calls().is_empty());

    let records = tacacs.records();
    assert_eq!(records.len(), 1);
    assert!(matches!(records[0], Record::AuthenticationStart { .. }));
}

#[tokio::test]
async fn failed_authorization_stops_the_call() {
    let script = Script {
        authorization: authorization::Status::Fail,
        ..Default::default()
    };
    let tacacs = TacacsServer::start(script).await;
    let agent = FakeAgent::default();
    let mut client = support::start(aaa_config(tacacs.address, true), agent.clone()).await;

    let status = client
        .disable_olt(authorized(Empty {}, ADMIN_CREDENTIALS))
        .await
        .unwrap_err();

    assert_eq!(status.code(), Code::PermissionDenied);
    assert_eq!(
        status.message(),
        "Authorization of user for invoked operation against TACACS+ server failed"
    );
    assert!(agent.calls().is_empty());
    assert!(tacacs.accounting_records().is_empty());
}

#[tokio::test]
async fn authentication_error_status_is_allowed_under_fallback_pass() {
    let script = Script {
        authentication: vec![authentication::Status::Error],
        ..Default::default()
    };
    let tacacs = TacacsServer::start(script).await;
    let agent = FakeAgent::default();
    let mut client = support::start(aaa_config(tacacs.address, true), agent.clone()).await;

    client
        .disable_olt(authorized(Empty {}, ADMIN_CREDENTIALS))
        .await
        .unwrap();
    assert_eq!(agent.calls(), ["disable_olt"]);

    // the server answered, so the rest of the call still goes to it
    let records = tacacs.records();
    assert_eq!(records.len(), 4, "{records:?}");
    assert!(matches!(records[1], Record::Authorization { .. }));
}

#[tokio::test]
async fn authentication_error_status_is_denied_without_fallback() {
    let script = Script {
        authentication: vec![authentication::Status::Error],
        ..Default::default()
    };
    let tacacs = TacacsServer::start(script).await;
    let agent = FakeAgent::default();
    let mut client = support::start(aaa_config(tacacs.address, false), agent.clone()).await;

    let status = client
        .disable_olt(authorized(Empty {}, ADMIN_CREDENTIALS))
        .await
        .unwrap_err();

    assert_eq!(status.code(), Code::Unauthenticated);
    assert_eq!(status.message(), "Authentication against TACACS+ server failed");
    assert!(agent.calls().is_empty());
    assert_eq!(tacacs.records().len(), 1);
}

#[tokio::test]
async fn authorization_error_status_is_allowed_under_fallback_pass() {
    let script = Script {
        authorization: authorization::Status::Error,
        ..Default::default()
    };
    let tacacs = TacacsServer::start(script).await;
    let agent = FakeAgent::default();
    let mut client = support::start(aaa_config(tacacs.address, true), agent.clone()).await;

    client
        .flow_add(authorized(Flow::default(), ADMIN_CREDENTIALS))
        .await
        .unwrap();
    assert_eq!(agent.calls(), ["flow_add"]);

    let accounting = tacacs.accounting_records();
    assert_eq!(accounting.len(), 2);
    assert_eq!(accounting[0].argument("cmd"), Some("flowadd"));
}

#[tokio::test]
async fn authorization_error_status_is_denied_without_fallback() {
    let script = Script {
        authorization: authorization::Status::Error,
        ..Default::default()
    };
    let tacacs = TacacsServer::start(script).await;
    let agent = FakeAgent::default();
    let mut client = support::start(aaa_config(tacacs.address, false), agent.clone()).await;

    let status = client
        .flow_add(authorized(Flow::default(), ADMIN_CREDENTIALS))
        .await
        .unwrap_err();

    assert_eq!(status.code(), Code::PermissionDenied);
    assert_eq!(
        status.message(),
        "Authorization of user for invoked operation against TACACS+ server failed"
    );
    assert!(agent.calls().is_empty());
    assert!(tacacs.accounting_records().is_empty());
}

#[tokio::test]
async fn unreachable_server_follows_fallback_policy() {
    // bind and drop to get a port nothing listens on
    let closed = std::net::TcpListener::bind("127.0.0.1:0")
        .unwrap()
        .local_addr()
        .unwrap();

    let strict_agent = FakeAgent::default();
    let mut strict = support::start(aaa_config(closed, false), strict_agent.clone()).await;
    let status = strict
        .disable_olt(authorized(Empty {}, ADMIN_CREDENTIALS))
        .await
        .unwrap_err();
    assert_eq!(status.code(), Code::Unavailable);
    assert_eq!(status.message(), "TACACS+ server unavailable");
    assert!(strict_agent.calls().is_empty());

    let lenient_agent = FakeAgent::default();
    let mut lenient = support::start(aaa_config(closed, true), lenient_agent.clone()).await;
    lenient
        .disable_olt(authorized(Empty {}, ADMIN_CREDENTIALS))
        .await
        .unwrap();
    assert_eq!(lenient_agent.calls(), ["disable_olt"]);
}

#[tokio::test]
async fn disabled_aaa_forwards_everything() {
    let agent = FakeAgent::default();
    let mut client = support::start(AaaConfig::default(), agent.clone()).await;

    client.disable_olt(Request::new(Empty {})).await.unwrap();
    client
        .heartbeat_check(Request::new(Empty {}))
        .await
        .unwrap();

    assert_eq!(agent.calls(), ["disable_olt", "heartbeat_check"]);
}

#[tokio::test]
async fn ascii_login_answers_server_prompts() {
    let script = Script {
        authentication: vec![authentication::Status::GetPassword, authentication::Status::Pass],
        ..Default::default()
    };
    let tacacs = TacacsServer::start(script).await;
    let agent = FakeAgent::default();

    let config = AaaConfig {
        authentication_type: AuthenticationType::Ascii,
        ..aaa_config(tacacs.address, false)
    };
    let mut client = support::start(config, agent.clone()).await;

    client
        .disable_olt(authorized(Empty {}, ADMIN_CREDENTIALS))
        .await
        .unwrap();
    assert_eq!(agent.calls(), ["disable_olt"]);

    let records = tacacs.records();
    assert!(
        matches!(&records[0], Record::AuthenticationStart { user, data, .. } if user == "admin" && data.is_empty())
    );
    assert_eq!(
        records[1],
        Record::AuthenticationContinue {
            user_message: b"secret".to_vec()
        }
    );
}

#[tokio::test]
async fn indication_stream_is_relayed_then_accounted() {
    let tacacs = TacacsServer::start(Script::default()).await;
    let agent =
        FakeAgent::with_indications(vec![olt_indication("up"), olt_indication("down")], false);
    let mut client = support::start(aaa_config(tacacs.address, false), agent.clone()).await;

    let stream = client
        .enable_indication(authorized(Empty {}, ADMIN_CREDENTIALS))
        .await
        .unwrap()
        .into_inner();
    let received: Vec<Indication> = stream.map(Result::unwrap).collect().await;

    assert_eq!(received, [olt_indication("up"), olt_indication("down")]);
    assert_eq!(agent.calls(), ["enable_indication"]);

    eventually(|| tacacs.accounting_records().len() == 2).await;
    let accounting = tacacs.accounting_records();
    assert_eq!(accounting[1].argument("cmd"), Some("enableindication"));
    assert_eq!(accounting[1].argument("err_msg"), None);
}

#[tokio::test]
async fn abandoned_indication_stream_is_accounted_as_cancelled() {
    let tacacs = TacacsServer::start(Script::default()).await;
    let agent = FakeAgent::with_indications(vec![olt_indication("up")], true);
    let mut client = support::start(aaa_config(tacacs.address, false), agent.clone()).await;

    let mut stream = client
        .enable_indication(authorized(Empty {}, ADMIN_CREDENTIALS))
        .await
        .unwrap()
        .into_inner();
    let first = stream.message().await.unwrap();
    assert_eq!(first, Some(olt_indication("up")));
    drop(stream);

    eventually(|| tacacs.accounting_records().len() == 2).await;
    let accounting = tacacs.accounting_records();
    assert_eq!(
        accounting[1].argument("err_msg"),
        Some("call cancelled by client")
    );
}
