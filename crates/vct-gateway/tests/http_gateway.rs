use std::time::Duration;
use vct_errors::{GatewayError, TransportReason};
use vct_gateway::{HttpTeamGateway, TeamGateway};
use vct_testkit::{
    MockHttpResponse, MockHttpServer, THREE_REGIONS_PROMPT, three_region_team,
    unreachable_endpoint,
};

fn gateway_for(server: &MockHttpServer) -> HttpTeamGateway {
    HttpTeamGateway::new(server.endpoint(), Duration::from_secs(5)).expect("gateway")
}

#[test]
fn successful_response_is_returned_without_field_loss() {
    let server = MockHttpServer::start(vec![MockHttpResponse::team(&three_region_team())]);
    let result = gateway_for(&server)
        .generate(THREE_REGIONS_PROMPT)
        .expect("team result");
    assert_eq!(result, three_region_team());
    assert_eq!(server.request_count(), 1);
}

#[test]
fn request_body_carries_prompt_field() {
    let server = MockHttpServer::start(vec![MockHttpResponse::team(&three_region_team())]);
    gateway_for(&server)
        .generate(THREE_REGIONS_PROMPT)
        .expect("team result");
    let bodies = server.request_bodies();
    assert_eq!(bodies.len(), 1);
    let sent: serde_json::Value = serde_json::from_str(&bodies[0]).expect("json body");
    assert_eq!(sent, serde_json::json!({ "prompt": THREE_REGIONS_PROMPT }));
}

#[test]
fn server_error_is_a_transport_failure_and_not_retried() {
    let server = MockHttpServer::start(vec![MockHttpResponse::json(
        500,
        r#"{"error":"Unable to load player data"}"#,
    )]);
    let err = gateway_for(&server)
        .generate("Build a team")
        .expect_err("500 should fail");
    match err {
        GatewayError::Transport { reason, detail } => {
            assert_eq!(reason, TransportReason::Status(500));
            assert!(detail.contains("Unable to load player data"), "{detail}");
        }
        other => panic!("expected transport failure, got {other:?}"),
    }
    assert_eq!(server.request_count(), 1);
}

#[test]
fn malformed_json_is_a_decode_failure() {
    let server = MockHttpServer::start(vec![MockHttpResponse::json(200, "{\"team\": [")]);
    let err = gateway_for(&server)
        .generate("Build a team")
        .expect_err("malformed body should fail");
    assert!(err.is_decode(), "{err:?}");
}

#[test]
fn missing_fields_are_a_decode_failure() {
    let server = MockHttpServer::start(vec![MockHttpResponse::json(
        200,
        r#"{"team":[{"name":"TenZ","role":"Duelist","agent":"Jett","region":"NA","league":"VCT"}],"strategy":"x","igl":"TenZ"}"#,
    )]);
    let err = gateway_for(&server)
        .generate("Build a team")
        .expect_err("missing strengths should fail");
    assert!(err.is_decode(), "{err:?}");
}

#[test]
fn unreachable_host_is_a_transport_failure() {
    let gateway =
        HttpTeamGateway::new(unreachable_endpoint(), Duration::from_secs(2)).expect("gateway");
    let err = gateway.generate("Build a team").expect_err("should fail");
    assert!(err.is_transport(), "{err:?}");
}

#[test]
fn slow_service_times_out_as_transport_failure() {
    let server = MockHttpServer::start(vec![
        MockHttpResponse::team(&three_region_team()).delayed(Duration::from_millis(1500)),
    ]);
    let gateway =
        HttpTeamGateway::new(server.endpoint(), Duration::from_millis(200)).expect("gateway");
    let err = gateway.generate("Build a team").expect_err("should time out");
    assert_eq!(err.kind(), "transport");
}
