use chrono::{DateTime, Duration, NaiveDate, TimeZone, Utc};
use secrecy::SecretString;
use serde_json::json;
use std::collections::HashMap;
use std::num::NonZeroU32;
use std::path::Path;
use std::sync::Arc;
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use medichaser::notifier::{Channel, Notifier, SendOutcome};
use medichaser::run_loop::{CycleReport, RunLoop};
use medichaser::scheduler::NextRun;
use medichaser_auth::testing::{ManualClock, StaticLogin};
use medichaser_auth::{
    AuthContext, AuthError, Authenticator, Session, StoredToken, TokenClient, TokenGrant,
    TokenStore,
};
use medicover_api::endpoints::appointments::FilterCriteria;
use medicover_api::AppointmentFinder;

const TOKEN: &str = "/connect/token";
const SEARCH: &str = "/appointments/api/search-appointments/slots";

fn t0() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 1, 1, 8, 0, 0).unwrap()
}

fn criteria() -> FilterCriteria {
    FilterCriteria {
        region: 204,
        specialty: [132].into_iter().collect(),
        clinic: None,
        start_date: NaiveDate::from_ymd_opt(2025, 1, 1).unwrap(),
        end_date: None,
        language: None,
        doctor: None,
    }
}

fn persist(token_path: &Path, expires_at: DateTime<Utc>) {
    TokenStore::new(token_path.to_path_buf())
        .save_token(&StoredToken {
            access_token: "stored-access".into(),
            refresh_token: "stored-refresh".into(),
            expires_at,
        })
        .unwrap();
}

fn run_loop(
    server: &MockServer,
    token_path: &Path,
    clock: &ManualClock,
    interval: Option<u32>,
) -> RunLoop<StaticLogin> {
    let session = Session::with_client(reqwest::Client::new());
    let clock: Arc<ManualClock> = Arc::new(clock.clone());

    let context = AuthContext {
        session: session.clone(),
        token_client: TokenClient::new(
            format!("{}{}", server.uri(), TOKEN),
            "web".into(),
            "openid offline_access profile".into(),
        ),
        token_store: TokenStore::new(token_path.to_path_buf()),
        clock: clock.clone(),
        refresh_margin: Duration::seconds(60),
    };
    let login = StaticLogin::succeeding(TokenGrant {
        access_token: "login-access".into(),
        refresh_token: "login-refresh".into(),
        expires_in: 1800,
    });
    let authenticator = Authenticator::new("patient", SecretString::from("secret"), login, context);

    let env: HashMap<String, String> = [
        ("GOTIFY_HOST".to_string(), server.uri()),
        ("GOTIFY_TOKEN".to_string(), "gotify-token".to_string()),
    ]
    .into_iter()
    .collect();

    RunLoop::new(
        authenticator,
        AppointmentFinder::new(session, server.uri()),
        Notifier::new(reqwest::Client::new(), Arc::new(env)),
        NextRun::new(interval.and_then(NonZeroU32::new), clock),
        criteria(),
    )
    .notify_via(Channel::Gotify, Some("Kardiolog".into()))
}

async fn mount_refresh(server: &MockServer) {
    Mock::given(method("POST"))
        .and(path(TOKEN))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "access_token": "A",
            "refresh_token": "B",
            "expires_in": 3600,
        })))
        .mount(server)
        .await;
}

#[tokio::test]
async fn one_shot_run_refreshes_searches_and_notifies() {
    let server = MockServer::start().await;
    let dir = tempfile::tempdir().unwrap();
    let token_path = dir.path().join("token.json");
    let clock = ManualClock::new(t0());
    persist(&token_path, t0() - Duration::minutes(5));

    mount_refresh(&server).await;
    Mock::given(method("GET"))
        .and(path(SEARCH))
        .and(header("authorization", "Bearer A"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "items": [{
                "appointmentDate": "2025-01-03T09:30:00",
                "clinic": {"name": "Centrum Medyczne"},
                "doctor": {"name": "Dr. Nowak"},
                "specialty": {"name": "Kardiologia"},
                "doctorLanguages": [{"name": "Polski"}]
            }]
        })))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/message"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;

    let mut run_loop = run_loop(&server, &token_path, &clock, None);
    run_loop.run().await.unwrap();

    let credentials = run_loop.authenticator().credentials().unwrap();
    assert_eq!(credentials.access_token, "A");
    assert_eq!(credentials.expires_at, t0() + Duration::seconds(3600));
}

#[tokio::test]
async fn invalid_grant_halts_before_searching() {
    let server = MockServer::start().await;
    let dir = tempfile::tempdir().unwrap();
    let token_path = dir.path().join("token.json");
    let clock = ManualClock::new(t0());
    persist(&token_path, t0() - Duration::minutes(5));

    Mock::given(method("POST"))
        .and(path(TOKEN))
        .respond_with(ResponseTemplate::new(400).set_body_json(json!({"error": "invalid_grant"})))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path(SEARCH))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"items": []})))
        .expect(0)
        .mount(&server)
        .await;

    let mut run_loop = run_loop(&server, &token_path, &clock, Some(30));
    let err = run_loop.run().await.unwrap_err();

    assert!(matches!(err, AuthError::InvalidGrant));
    assert!(!token_path.exists());
}

#[tokio::test]
async fn transient_refresh_failure_skips_the_cycle() {
    let server = MockServer::start().await;
    let dir = tempfile::tempdir().unwrap();
    let token_path = dir.path().join("token.json");
    let clock = ManualClock::new(t0());
    persist(&token_path, t0() - Duration::minutes(5));

    Mock::given(method("POST"))
        .and(path(TOKEN))
        .respond_with(ResponseTemplate::new(503).set_body_string("Service Unavailable"))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path(SEARCH))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"items": []})))
        .expect(0)
        .mount(&server)
        .await;

    let mut run_loop = run_loop(&server, &token_path, &clock, None);

    assert_eq!(run_loop.run_cycle().await.unwrap(), CycleReport::Skipped);
    assert!(token_path.exists());
}

#[tokio::test]
async fn one_shot_run_reports_failed_authentication() {
    let server = MockServer::start().await;
    let dir = tempfile::tempdir().unwrap();
    let token_path = dir.path().join("token.json");
    let clock = ManualClock::new(t0());
    persist(&token_path, t0() - Duration::minutes(5));

    Mock::given(method("POST"))
        .and(path(TOKEN))
        .respond_with(ResponseTemplate::new(503).set_body_string("Service Unavailable"))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path(SEARCH))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"items": []})))
        .expect(0)
        .mount(&server)
        .await;

    let mut run_loop = run_loop(&server, &token_path, &clock, None);
    let err = run_loop.run().await.unwrap_err();

    assert!(matches!(err, AuthError::Refresh(_)));
    assert!(!err.is_terminal());
}

#[tokio::test]
async fn empty_results_are_not_notified() {
    let server = MockServer::start().await;
    let dir = tempfile::tempdir().unwrap();
    let token_path = dir.path().join("token.json");
    let clock = ManualClock::new(t0());
    persist(&token_path, t0() + Duration::hours(1));

    Mock::given(method("GET"))
        .and(path(SEARCH))
        .and(header("authorization", "Bearer stored-access"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"items": []})))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/message"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let mut run_loop = run_loop(&server, &token_path, &clock, None);
    let report = run_loop.run_cycle().await.unwrap();

    assert_eq!(
        report,
        CycleReport::Completed {
            found: 0,
            notified: None
        }
    );
}

#[tokio::test]
async fn later_cycles_refresh_an_expired_token_first() {
    let server = MockServer::start().await;
    let dir = tempfile::tempdir().unwrap();
    let token_path = dir.path().join("token.json");
    let clock = ManualClock::new(t0());
    persist(&token_path, t0() + Duration::hours(1));

    Mock::given(method("POST"))
        .and(path(TOKEN))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "access_token": "A",
            "refresh_token": "B",
            "expires_in": 3600,
        })))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path(SEARCH))
        .and(header("authorization", "Bearer stored-access"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"items": [{"id": 1}]})))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path(SEARCH))
        .and(header("authorization", "Bearer A"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"items": [{"id": 1}]})))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/message"))
        .respond_with(ResponseTemplate::new(200))
        .expect(2)
        .mount(&server)
        .await;

    let mut run_loop = run_loop(&server, &token_path, &clock, Some(90));

    let first = run_loop.run_cycle().await.unwrap();
    assert_eq!(
        first,
        CycleReport::Completed {
            found: 1,
            notified: Some(SendOutcome::Delivered)
        }
    );

    clock.advance(Duration::minutes(90));
    assert!(run_loop.next_run().is_time_to_run());

    let second = run_loop.run_cycle().await.unwrap();
    assert!(matches!(second, CycleReport::Completed { found: 1, .. }));
}
