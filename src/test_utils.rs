#![cfg(test)]

use crate::{host::STATUS_PATH, types::StatusRecord};
use http::StatusCode;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Body of a healthy `/healthz` response
pub(crate) const MOCK_STATUS: &str = r#"{
    "application": "Memcache2",
    "version": "1.0.1",
    "uptime": 4637719417,
    "requestCount": 5194800029,
    "errorCount": 1042813251,
    "successCount": 4151986778
}"#;

pub(crate) fn record(application: &str, version: &str, requests: u64, successes: u64) -> StatusRecord {
    StatusRecord {
        application: application.to_string(),
        version: version.to_string(),
        uptime_seconds: 0,
        request_count: requests,
        error_count: requests.saturating_sub(successes),
        success_count: successes,
    }
}

pub(crate) async fn get_mock_server<S>(response_code: S) -> MockServer
where
    S: Into<StatusCode>,
{
    get_mock_server_with_content(response_code, None).await
}

pub(crate) async fn get_mock_server_with_content<S>(
    response_code: S,
    content: Option<&str>,
) -> MockServer
where
    S: Into<StatusCode>,
{
    let mock_server = MockServer::start().await;
    let status: StatusCode = response_code.into();
    let template = ResponseTemplate::new(status.as_u16());

    let template = if let Some(s) = content {
        template.set_body_string(s)
    } else {
        template
    };

    Mock::given(method("GET"))
        .and(path(STATUS_PATH))
        .respond_with(template)
        .mount(&mock_server)
        .await;

    mock_server
}
