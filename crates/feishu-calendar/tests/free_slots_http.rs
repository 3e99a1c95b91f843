//! End-to-end free slot search against a mock Feishu server.

use std::sync::Arc;

use chrono::NaiveDate;
use feishu_auth::{TenantTokenEndpoint, TokenCache};
use feishu_calendar::{CalendarError, FreeBusyClient, FreeBusyResolver, FreeSlot, FreeSlotQuery};
use wiremock::matchers::{body_partial_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const TOKEN_PATH: &str = "/auth/v3/tenant_access_token/internal";
const FREEBUSY_PATH: &str = "/calendar/v4/freebusy/list";

fn busy_reply(periods: &[(&str, &str)]) -> ResponseTemplate {
    let list: Vec<_> = periods
        .iter()
        .map(|(start, end)| serde_json::json!({"start_time": start, "end_time": end}))
        .collect();

    ResponseTemplate::new(200).set_body_json(serde_json::json!({
        "code": 0,
        "msg": "success",
        "data": {"freebusy_list": list}
    }))
}

async fn mount_user(server: &MockServer, user_id: &str, reply: ResponseTemplate) {
    Mock::given(method("POST"))
        .and(path(FREEBUSY_PATH))
        .and(body_partial_json(serde_json::json!({"user_id": user_id})))
        .respond_with(reply)
        .expect(1)
        .mount(server)
        .await;
}

fn resolver_for(server: &MockServer) -> FreeBusyResolver<FreeBusyClient> {
    let endpoint = TenantTokenEndpoint::new(&server.uri(), "cli_test", "secret").unwrap();
    let tokens = Arc::new(TokenCache::new(endpoint));
    FreeBusyResolver::new(FreeBusyClient::new(&server.uri(), tokens).unwrap())
}

fn query(users: &[&str]) -> FreeSlotQuery {
    FreeSlotQuery::new(
        users.iter().map(|u| u.to_string()).collect(),
        NaiveDate::from_ymd_opt(2024, 1, 15).unwrap(),
    )
}

#[tokio::test]
async fn test_common_free_time_for_three_users() {
    let mock_server = MockServer::start().await;

    // One exchange serves every user lookup
    Mock::given(method("POST"))
        .and(path(TOKEN_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "code": 0,
            "tenant_access_token": "t-shared",
            "expire": 7200
        })))
        .expect(1)
        .mount(&mock_server)
        .await;

    mount_user(
        &mock_server,
        "ou_alice",
        busy_reply(&[("2024-01-15T09:00:00+08:00", "2024-01-15T10:00:00+08:00")]),
    )
    .await;
    mount_user(
        &mock_server,
        "ou_bob",
        busy_reply(&[
            ("2024-01-15T10:00:00+08:00", "2024-01-15T11:00:00+08:00"),
            ("2024-01-15T16:00:00+08:00", "2024-01-15T20:00:00+08:00"),
        ]),
    )
    .await;
    mount_user(
        &mock_server,
        "ou_carol",
        ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "code": 191002,
            "msg": "no permission to read calendar"
        })),
    )
    .await;

    let resolver = resolver_for(&mock_server);
    let slots = resolver
        .find_free_slots(&query(&["ou_alice", "ou_bob", "ou_carol"]))
        .await
        .unwrap();

    assert_eq!(
        slots,
        vec![FreeSlot {
            start: "11:00".to_string(),
            end: "16:00".to_string(),
            duration_minutes: 300,
        }]
    );
}

#[tokio::test]
async fn test_bad_credentials_fail_the_search() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path(TOKEN_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "code": 10014,
            "msg": "app secret invalid"
        })))
        .mount(&mock_server)
        .await;

    Mock::given(method("POST"))
        .and(path(FREEBUSY_PATH))
        .respond_with(busy_reply(&[]))
        .expect(0)
        .mount(&mock_server)
        .await;

    let resolver = resolver_for(&mock_server);
    let result = resolver.find_free_slots(&query(&["ou_alice"])).await;

    assert!(matches!(result, Err(CalendarError::Auth(_))));
}

#[tokio::test]
async fn test_server_outage_for_one_user_is_tolerated() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path(TOKEN_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "code": 0,
            "tenant_access_token": "t-shared",
            "expire": 7200
        })))
        .mount(&mock_server)
        .await;

    mount_user(
        &mock_server,
        "ou_alice",
        ResponseTemplate::new(502).set_body_string("Bad Gateway"),
    )
    .await;

    let resolver = resolver_for(&mock_server);
    let slots = resolver
        .find_free_slots(&query(&["ou_alice"]).with_window(13, 15))
        .await
        .unwrap();

    assert_eq!(slots.len(), 1);
    assert_eq!(slots[0].start, "13:00");
    assert_eq!(slots[0].end, "15:00");
}

#[tokio::test]
async fn test_token_rejected_twice_fails_the_search() {
    let mock_server = MockServer::start().await;

    // Initial exchange plus one refresh after the first 401
    Mock::given(method("POST"))
        .and(path(TOKEN_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "code": 0,
            "tenant_access_token": "t-revoked",
            "expire": 7200
        })))
        .expect(2)
        .mount(&mock_server)
        .await;

    Mock::given(method("POST"))
        .and(path(FREEBUSY_PATH))
        .respond_with(ResponseTemplate::new(401))
        .expect(2)
        .mount(&mock_server)
        .await;

    let resolver = resolver_for(&mock_server);
    let result = resolver.find_free_slots(&query(&["ou_alice"])).await;

    assert!(matches!(result, Err(CalendarError::TokenExpired)));
}
