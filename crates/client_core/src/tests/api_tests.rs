use super::*;
use std::collections::HashMap;

use axum::{
    body::Bytes,
    extract::{Multipart, Path, State},
    http::{HeaderMap, StatusCode},
    routing::{get, post},
    Router,
};
use shared::protocol::{RemoteJobStatus, QUOTA_LIMIT_MARKER};
use tokio::{net::TcpListener, sync::Mutex};

use crate::{controller::events::SubmitFailure, media::MediaFile};

#[derive(Debug, Clone)]
struct FormField {
    file_name: Option<String>,
    content_type: Option<String>,
    data: Vec<u8>,
}

#[derive(Clone)]
struct Reply {
    status: StatusCode,
    body: String,
}

impl Reply {
    fn ok(body: &str) -> Self {
        Self {
            status: StatusCode::OK,
            body: body.to_string(),
        }
    }

    fn status(status: StatusCode, body: &str) -> Self {
        Self {
            status,
            body: body.to_string(),
        }
    }
}

#[derive(Clone)]
struct ServerState {
    create_reply: Reply,
    status_reply: Reply,
    download_reply: Vec<u8>,
    form: Arc<Mutex<HashMap<String, FormField>>>,
    emails: Arc<Mutex<Vec<(String, Option<String>, String)>>>,
    status_requests: Arc<Mutex<Vec<String>>>,
}

impl ServerState {
    fn new(create_reply: Reply, status_reply: Reply) -> Self {
        Self {
            create_reply,
            status_reply,
            download_reply: b"dubbed-bytes".to_vec(),
            form: Arc::new(Mutex::new(HashMap::new())),
            emails: Arc::new(Mutex::new(Vec::new())),
            status_requests: Arc::new(Mutex::new(Vec::new())),
        }
    }
}

async fn handle_create(
    State(state): State<ServerState>,
    mut multipart: Multipart,
) -> (StatusCode, String) {
    while let Ok(Some(field)) = multipart.next_field().await {
        let name = field.name().unwrap_or_default().to_string();
        let file_name = field.file_name().map(str::to_string);
        let content_type = field.content_type().map(str::to_string);
        let data = field.bytes().await.map(|b| b.to_vec()).unwrap_or_default();
        state.form.lock().await.insert(
            name,
            FormField {
                file_name,
                content_type,
                data,
            },
        );
    }
    (state.create_reply.status, state.create_reply.body.clone())
}

async fn handle_status(
    State(state): State<ServerState>,
    Path(job_id): Path<String>,
) -> (StatusCode, String) {
    state.status_requests.lock().await.push(job_id);
    (state.status_reply.status, state.status_reply.body.clone())
}

async fn handle_update_email(
    State(state): State<ServerState>,
    Path(job_id): Path<String>,
    headers: HeaderMap,
    body: String,
) -> StatusCode {
    let content_type = headers
        .get("content-type")
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);
    state.emails.lock().await.push((job_id, content_type, body));
    StatusCode::NO_CONTENT
}

async fn handle_download(State(state): State<ServerState>) -> Bytes {
    Bytes::from(state.download_reply.clone())
}

async fn spawn_dubbing_server(state: ServerState) -> anyhow::Result<String> {
    std::env::set_var("NO_PROXY", "127.0.0.1,localhost");
    let listener = TcpListener::bind("127.0.0.1:0").await?;
    let addr = listener.local_addr()?;
    let app = Router::new()
        .route("/jobs/create", post(handle_create))
        .route("/jobs/:job_id/status", get(handle_status))
        .route("/jobs/:job_id/update-email", post(handle_update_email))
        .route("/files/result.mp3", get(handle_download))
        .with_state(state);
    tokio::spawn(async move {
        let _ = axum::serve(listener, app).await;
    });
    Ok(format!("http://{addr}"))
}

fn request(email: Option<&str>) -> SubmitRequest {
    SubmitRequest {
        file: MediaFile::new("interview.mp3", Some("audio/mp3"), b"ID3-fake-audio".to_vec()),
        source_locale: "en_US".into(),
        target_locale: "es_ES".into(),
        email: email.map(str::to_string),
    }
}

#[tokio::test]
async fn create_job_posts_the_multipart_form() {
    let state = ServerState::new(Reply::ok(r#"{"job_id":"job-42"}"#), Reply::ok("{}"));
    let url = spawn_dubbing_server(state.clone()).await.expect("spawn server");
    let api = HttpDubbingApi::new(format!("{url}/")).expect("client");
    assert_eq!(api.base_url(), url);

    let response = api
        .create_job(&request(Some("fan@example.com")))
        .await
        .expect("create job");
    assert_eq!(response.job_id, Some(JobId::from("job-42")));

    let form = state.form.lock().await;
    assert_eq!(form[form_fields::FILE_NAME].data, b"interview.mp3");
    assert_eq!(form[form_fields::SOURCE_LOCALE].data, b"en_US");
    assert_eq!(form[form_fields::TARGET_LOCALE].data, b"es_ES");
    assert_eq!(form[form_fields::EMAIL].data, b"fan@example.com");
    let file = &form[form_fields::FILE];
    assert_eq!(file.file_name.as_deref(), Some("interview.mp3"));
    assert_eq!(file.content_type.as_deref(), Some("audio/mp3"));
    assert_eq!(file.data, b"ID3-fake-audio");
}

#[tokio::test]
async fn create_job_omits_email_and_tolerates_missing_job_id() {
    let state = ServerState::new(Reply::ok("{}"), Reply::ok("{}"));
    let url = spawn_dubbing_server(state.clone()).await.expect("spawn server");
    let api = HttpDubbingApi::new(url).expect("client");

    let response = api.create_job(&request(None)).await.expect("create job");
    assert_eq!(response.job_id, None);
    assert!(!state.form.lock().await.contains_key(form_fields::EMAIL));
}

#[tokio::test]
async fn quota_rejection_keeps_the_service_text() {
    let state = ServerState::new(
        Reply::status(
            StatusCode::TOO_MANY_REQUESTS,
            "User has submitted max free dubs allowed",
        ),
        Reply::ok("{}"),
    );
    let url = spawn_dubbing_server(state).await.expect("spawn server");
    let api = HttpDubbingApi::new(url).expect("client");

    let err = api.create_job(&request(None)).await.expect_err("quota error");
    match &err {
        RemoteError::Rejected { status, body } => {
            assert_eq!(*status, 429);
            assert!(body.contains(QUOTA_LIMIT_MARKER));
        }
        other => panic!("unexpected error: {other:?}"),
    }
    assert_eq!(SubmitFailure::from(err), SubmitFailure::QuotaExceeded);
}

#[tokio::test]
async fn empty_error_body_falls_back_to_the_status_line() {
    let state = ServerState::new(
        Reply::status(StatusCode::BAD_GATEWAY, ""),
        Reply::ok("{}"),
    );
    let url = spawn_dubbing_server(state).await.expect("spawn server");
    let err = HttpDubbingApi::new(url).expect("client")
        .create_job(&request(None))
        .await
        .expect_err("gateway error");
    assert_eq!(
        err,
        RemoteError::Rejected {
            status: 502,
            body: "502 Bad Gateway".into()
        }
    );
    assert!(!err.is_transient());
}

#[tokio::test]
async fn job_status_parses_completion_details() {
    let state = ServerState::new(
        Reply::ok("{}"),
        Reply::ok(
            r#"{"status":"COMPLETED","download_details":[{"download_url":"https://cdn.test/out.mp3"}]}"#,
        ),
    );
    let url = spawn_dubbing_server(state.clone()).await.expect("spawn server");
    let api = HttpDubbingApi::new(url).expect("client");

    let status = api
        .job_status(&JobId::from("job-7"))
        .await
        .expect("status");
    assert_eq!(status.status, RemoteJobStatus::Completed);
    assert_eq!(status.download_url(), Some("https://cdn.test/out.mp3"));
    assert_eq!(*state.status_requests.lock().await, vec!["job-7".to_string()]);
}

#[tokio::test]
async fn job_status_maps_unrecognised_statuses_to_unknown() {
    let state = ServerState::new(
        Reply::ok("{}"),
        Reply::ok(r#"{"status":"WARMING_UP","failure_reason":null}"#),
    );
    let url = spawn_dubbing_server(state).await.expect("spawn server");
    let status = HttpDubbingApi::new(url).expect("client")
        .job_status(&JobId::from("job-8"))
        .await
        .expect("status");
    assert_eq!(status.status, RemoteJobStatus::Unknown);
}

#[tokio::test]
async fn job_status_with_garbage_body_is_malformed() {
    let state = ServerState::new(Reply::ok("{}"), Reply::ok("<html>oops</html>"));
    let url = spawn_dubbing_server(state).await.expect("spawn server");
    let err = HttpDubbingApi::new(url).expect("client")
        .job_status(&JobId::from("job-9"))
        .await
        .expect_err("decode error");
    assert!(matches!(err, RemoteError::Malformed(_)), "{err:?}");
}

#[tokio::test]
async fn update_email_sends_plain_text() {
    let state = ServerState::new(Reply::ok("{}"), Reply::ok("{}"));
    let url = spawn_dubbing_server(state.clone()).await.expect("spawn server");
    HttpDubbingApi::new(url).expect("client")
        .update_email(&JobId::from("job-3"), "fan@example.com")
        .await
        .expect("update email");

    let emails = state.emails.lock().await;
    assert_eq!(emails.len(), 1);
    let (job_id, content_type, body) = &emails[0];
    assert_eq!(job_id, "job-3");
    assert_eq!(content_type.as_deref(), Some("text/plain"));
    assert_eq!(body, "fan@example.com");
}

#[tokio::test]
async fn download_returns_the_raw_bytes() {
    let state = ServerState::new(Reply::ok("{}"), Reply::ok("{}"));
    let url = spawn_dubbing_server(state).await.expect("spawn server");
    let api = HttpDubbingApi::new(url.clone()).expect("client");

    let data = api
        .download(&format!("{url}/files/result.mp3"))
        .await
        .expect("download");
    assert_eq!(&data[..], b"dubbed-bytes");

    let err = api
        .download(&format!("{url}/files/missing.mp3"))
        .await
        .expect_err("missing file");
    assert!(matches!(err, RemoteError::Rejected { status: 404, .. }));
}

#[tokio::test]
async fn hung_status_request_times_out_as_transient() {
    std::env::set_var("NO_PROXY", "127.0.0.1,localhost");
    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
    let addr = listener.local_addr().expect("addr");
    let app = Router::new().route(
        "/jobs/:job_id/status",
        get(|| async {
            tokio::time::sleep(std::time::Duration::from_secs(30)).await;
            r#"{"status":"QUEUED"}"#
        }),
    );
    tokio::spawn(async move {
        let _ = axum::serve(listener, app).await;
    });

    let api = HttpDubbingApi::with_timeout(
        format!("http://{addr}"),
        std::time::Duration::from_millis(200),
    )
    .expect("client");
    let err = api
        .job_status(&JobId::from("job-1"))
        .await
        .expect_err("timeout");
    assert!(err.is_transient(), "{err:?}");
}

#[tokio::test]
async fn closed_port_is_reported_as_unreachable() {
    std::env::set_var("NO_PROXY", "127.0.0.1,localhost");
    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
    let addr = listener.local_addr().expect("addr");
    drop(listener);

    let err = HttpDubbingApi::new(format!("http://{addr}")).expect("client")
        .job_status(&JobId::from("job-1"))
        .await
        .expect_err("connection refused");
    assert!(err.is_transient(), "{err:?}");
}
