// Survey API client: async wrappers over the remote survey service.
//
// Each call is independent. There is no retry, caching, or request
// coordination; failures are logged where they happen and handed back to
// the caller as descriptive errors.

use std::time::Duration;

use reqwest::multipart;
use serde::{Deserialize, Serialize};

const DEFAULT_BASE_URL: &str = "https://simple-survey-api-james.vercel.app";
const REQUEST_TIMEOUT_SECS: u64 = 30;

/// First page, used by callers that take the service defaults.
pub const DEFAULT_PAGE: u32 = 1;
/// Responses per page when the caller does not choose one.
pub const DEFAULT_PAGE_SIZE: u32 = 10;

/// Errors surfaced by the API wrappers.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// The request never produced a usable response.
    #[error("request failed: {0}")]
    Transport(String),

    /// The service answered with a non-success status.
    #[error("request failed with status {status}: {message}")]
    Status { status: u16, message: String },

    /// The service answered 2xx with a body that does not match the
    /// expected shape.
    #[error("unexpected response shape: {0}")]
    Shape(String),
}

/// One survey question as served by the API.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Question {
    #[serde(default)]
    pub name: String,
    #[serde(rename = "type", default)]
    pub question_type: String,
    /// `"yes"`/`"no"` in older deployments of the service, a boolean in
    /// newer ones.
    #[serde(default)]
    pub required: serde_json::Value,
    #[serde(default)]
    pub text: String,
    #[serde(default)]
    pub description: Option<String>,
    /// Choice lists and similar per-type payloads; the shape varies with
    /// the question type.
    #[serde(default)]
    pub options: Option<serde_json::Value>,
    #[serde(default)]
    pub file_properties: Option<serde_json::Value>,
}

impl Question {
    pub fn is_required(&self) -> bool {
        match &self.required {
            serde_json::Value::Bool(flag) => *flag,
            serde_json::Value::String(word) => word.eq_ignore_ascii_case("yes"),
            _ => false,
        }
    }
}

/// Envelope for the question list; the service nests the array under a
/// `question` key.
#[derive(Debug, Clone, Deserialize)]
pub struct QuestionList {
    pub question: Vec<Question>,
}

/// A certificate attached to a submitted response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Certificate {
    pub id: u64,
    #[serde(default)]
    pub name: String,
}

/// A submitted survey response as returned by the service.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuestionResponse {
    #[serde(default)]
    pub id: Option<u64>,
    #[serde(default)]
    pub full_name: String,
    #[serde(default)]
    pub email_address: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub gender: String,
    #[serde(default)]
    pub programming_stack: String,
    #[serde(default)]
    pub certificates: Vec<Certificate>,
    #[serde(default)]
    pub date_responded: Option<String>,
}

/// One page of submitted responses. The `question_response` list is the
/// only field the service guarantees; the pagination metadata defaults to
/// zero when absent.
#[derive(Debug, Clone, Deserialize)]
pub struct QuestionResponseList {
    pub question_response: Vec<QuestionResponse>,
    #[serde(default)]
    pub current_page: u32,
    #[serde(default)]
    pub last_page: u32,
    #[serde(default)]
    pub page_size: u32,
    #[serde(default)]
    pub total_count: u64,
}

/// A certificate file to attach to a submission.
#[derive(Debug, Clone)]
pub struct CertificateUpload {
    pub file_name: String,
    pub bytes: Vec<u8>,
}

/// A filled-in survey, sent as a multipart form with one file part per
/// certificate.
#[derive(Debug, Clone, Default)]
pub struct SurveySubmission {
    pub full_name: String,
    pub email_address: String,
    pub description: String,
    pub gender: String,
    pub programming_stack: String,
    pub certificates: Vec<CertificateUpload>,
}

/// Client for the survey service.
pub struct SurveyApi {
    http: reqwest::Client,
    base_url: String,
}

impl SurveyApi {
    /// Client against the production endpoint.
    pub fn new() -> Result<Self, ApiError> {
        Self::with_base_url(DEFAULT_BASE_URL)
    }

    /// Client against an explicit endpoint, mainly for tests and staging.
    pub fn with_base_url(base_url: impl Into<String>) -> Result<Self, ApiError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()
            .map_err(|err| ApiError::Transport(err.to_string()))?;
        let mut base_url = base_url.into();
        while base_url.ends_with('/') {
            base_url.pop();
        }
        Ok(Self { http, base_url })
    }

    /// Fetches the survey questions.
    pub async fn fetch_questions(&self) -> Result<QuestionList, ApiError> {
        let url = format!("{}/api/questions", self.base_url);
        let (status, body) = self.get(&url, &[]).await?;

        if !status.is_success() {
            let err = status_error(status, &body);
            log::error!("fetching questions failed: {err}");
            return Err(err);
        }
        parse_questions(&body).inspect_err(|err| log::error!("{err}"))
    }

    /// Submits a completed survey as multipart form data.
    pub async fn submit_response(
        &self,
        submission: &SurveySubmission,
    ) -> Result<QuestionResponse, ApiError> {
        let url = format!("{}/api/questions/responses", self.base_url);
        let mut form = multipart::Form::new()
            .text("full_name", submission.full_name.clone())
            .text("email_address", submission.email_address.clone())
            .text("description", submission.description.clone())
            .text("gender", submission.gender.clone())
            .text("programming_stack", submission.programming_stack.clone());
        for certificate in &submission.certificates {
            let part = multipart::Part::bytes(certificate.bytes.clone())
                .file_name(certificate.file_name.clone());
            form = form.part("certificates", part);
        }

        let response = self
            .http
            .put(&url)
            .multipart(form)
            .send()
            .await
            .map_err(|err| {
                log::error!("submitting survey response failed: {err}");
                ApiError::Transport(err.to_string())
            })?;

        let status = response.status();
        let body = read_body(response).await?;

        if !status.is_success() {
            let err = status_error(status, &body);
            log::error!("survey submission rejected: {err}");
            return Err(err);
        }
        serde_json::from_str(&body).map_err(|err| {
            let err = ApiError::Shape(format!("invalid submission reply: {err}"));
            log::error!("{err}");
            err
        })
    }

    /// Fetches submitted responses, paginated and optionally filtered by
    /// responder email.
    pub async fn fetch_responses(
        &self,
        page: u32,
        page_size: u32,
        email_filter: Option<&str>,
    ) -> Result<QuestionResponseList, ApiError> {
        let url = format!("{}/api/questions/responses", self.base_url);
        let mut query = vec![
            ("page", page.to_string()),
            ("page_size", page_size.to_string()),
        ];
        if let Some(email) = email_filter {
            query.push(("email_address", email.to_string()));
        }
        let (status, body) = self.get(&url, &query).await?;

        if !status.is_success() {
            let err = status_error(status, &body);
            log::error!("fetching responses failed: {err}");
            return Err(err);
        }
        parse_responses(&body).inspect_err(|err| log::error!("{err}"))
    }

    /// URL for downloading a stored certificate. No request is made; the
    /// caller hands this to whatever performs the download.
    pub fn certificate_download_url(&self, id: u64) -> String {
        format!("{}/api/questions/responses/certificates/{}", self.base_url, id)
    }

    async fn get(
        &self,
        url: &str,
        query: &[(&str, String)],
    ) -> Result<(reqwest::StatusCode, String), ApiError> {
        let response = self
            .http
            .get(url)
            .query(query)
            .send()
            .await
            .map_err(|err| {
                log::error!("request to {url} failed: {err}");
                ApiError::Transport(err.to_string())
            })?;
        let status = response.status();
        let body = read_body(response).await?;
        Ok((status, body))
    }
}

async fn read_body(response: reqwest::Response) -> Result<String, ApiError> {
    response.text().await.map_err(|err| {
        log::error!("reading response body failed: {err}");
        ApiError::Transport(err.to_string())
    })
}

fn parse_questions(body: &str) -> Result<QuestionList, ApiError> {
    serde_json::from_str(body)
        .map_err(|err| ApiError::Shape(format!("invalid question list: {err}")))
}

fn parse_responses(body: &str) -> Result<QuestionResponseList, ApiError> {
    serde_json::from_str(body)
        .map_err(|err| ApiError::Shape(format!("invalid response list: {err}")))
}

#[derive(Deserialize)]
struct ErrorBody {
    detail: Option<String>,
}

/// Builds the error for a non-success reply. The service reports failures
/// as JSON with a `detail` field; fall back to the raw body, then to the
/// bare status text.
fn status_error(status: reqwest::StatusCode, body: &str) -> ApiError {
    let message = serde_json::from_str::<ErrorBody>(body)
        .ok()
        .and_then(|parsed| parsed.detail)
        .or_else(|| {
            let trimmed = body.trim();
            (!trimmed.is_empty()).then(|| trimmed.to_string())
        })
        .unwrap_or_else(|| {
            status
                .canonical_reason()
                .unwrap_or("unknown error")
                .to_string()
        });
    ApiError::Status {
        status: status.as_u16(),
        message,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use reqwest::StatusCode;

    /// Serves a single request on a loopback port, then shuts down.
    fn serve_once(status: u16, body: &'static str) -> String {
        let server = tiny_http::Server::http("127.0.0.1:0").expect("failed to bind test server");
        let port = server.server_addr().to_ip().unwrap().port();
        std::thread::spawn(move || {
            if let Ok(mut request) = server.recv() {
                // Drain the request body so the client finishes its upload
                // before we reply.
                let mut sink = Vec::new();
                let _ = std::io::Read::read_to_end(request.as_reader(), &mut sink);
                let response = tiny_http::Response::from_string(body)
                    .with_status_code(status)
                    .with_header(
                        tiny_http::Header::from_bytes(
                            &b"Content-Type"[..],
                            &b"application/json"[..],
                        )
                        .unwrap(),
                    );
                let _ = request.respond(response);
            }
        });
        format!("http://127.0.0.1:{port}")
    }

    #[test]
    fn certificate_download_url_embeds_the_id() {
        let api = SurveyApi::with_base_url("https://example.test").unwrap();
        assert_eq!(
            api.certificate_download_url(42),
            "https://example.test/api/questions/responses/certificates/42"
        );
    }

    #[test]
    fn trailing_slashes_are_stripped_from_the_base_url() {
        let api = SurveyApi::with_base_url("https://example.test/").unwrap();
        assert_eq!(
            api.certificate_download_url(1),
            "https://example.test/api/questions/responses/certificates/1"
        );
    }

    #[test]
    fn status_error_prefers_the_detail_field() {
        let err = status_error(StatusCode::BAD_REQUEST, r#"{"detail":"email taken"}"#);
        match err {
            ApiError::Status { status, message } => {
                assert_eq!(status, 400);
                assert_eq!(message, "email taken");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn status_error_falls_back_to_the_raw_body() {
        let err = status_error(StatusCode::BAD_GATEWAY, "upstream exploded");
        match err {
            ApiError::Status { status, message } => {
                assert_eq!(status, 502);
                assert_eq!(message, "upstream exploded");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn status_error_falls_back_to_the_status_text() {
        let err = status_error(StatusCode::INTERNAL_SERVER_ERROR, "");
        assert_eq!(
            err.to_string(),
            "request failed with status 500: Internal Server Error"
        );
    }

    #[test]
    fn status_error_ignores_a_structured_detail_it_cannot_read() {
        // FastAPI validation errors carry a list under `detail`; the raw
        // body is still more useful than dropping the message.
        let body = r#"{"detail":[{"loc":["email_address"],"msg":"invalid"}]}"#;
        let err = status_error(StatusCode::UNPROCESSABLE_ENTITY, body);
        match err {
            ApiError::Status { message, .. } => assert_eq!(message, body),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn question_list_requires_the_question_key() {
        assert!(parse_questions("{}").is_err());
        assert!(parse_questions(r#"{"question":[]}"#).is_ok());
    }

    #[test]
    fn response_list_requires_the_question_response_key() {
        assert!(parse_responses("{}").is_err());
        let parsed = parse_responses(r#"{"question_response":[],"total_count":7}"#).unwrap();
        assert_eq!(parsed.total_count, 7);
        assert_eq!(parsed.current_page, 0);
    }

    #[test]
    fn required_flag_reads_both_encodings() {
        let question: Question =
            serde_json::from_str(r#"{"name":"email","type":"short-text","required":"yes","text":"Email"}"#)
                .unwrap();
        assert!(question.is_required());

        let question: Question =
            serde_json::from_str(r#"{"name":"bio","type":"long-text","required":false,"text":"Bio"}"#)
                .unwrap();
        assert!(!question.is_required());
    }

    #[tokio::test]
    async fn fetch_questions_surfaces_the_http_status() {
        let base = serve_once(500, "boom");
        let api = SurveyApi::with_base_url(base).unwrap();

        let err = api.fetch_questions().await.unwrap_err();

        assert!(matches!(err, ApiError::Status { status: 500, .. }));
        assert!(err.to_string().contains("500"), "message was: {err}");
    }

    #[tokio::test]
    async fn fetch_questions_parses_the_payload() {
        let base = serve_once(
            200,
            r#"{"question":[{"name":"full_name","type":"short-text","required":"yes","text":"What is your name?"}]}"#,
        );
        let api = SurveyApi::with_base_url(base).unwrap();

        let list = api.fetch_questions().await.unwrap();

        assert_eq!(list.question.len(), 1);
        assert_eq!(list.question[0].name, "full_name");
        assert!(list.question[0].is_required());
    }

    #[tokio::test]
    async fn fetch_responses_rejects_a_body_without_the_list() {
        let base = serve_once(200, "{}");
        let api = SurveyApi::with_base_url(base).unwrap();

        let err = api.fetch_responses(DEFAULT_PAGE, DEFAULT_PAGE_SIZE, None).await.unwrap_err();

        assert!(matches!(err, ApiError::Shape(_)), "got: {err:?}");
    }

    #[tokio::test]
    async fn fetch_responses_parses_a_page() {
        let base = serve_once(
            200,
            r#"{"question_response":[{"id":3,"full_name":"Jane Doe","email_address":"jane@example.test","certificates":[{"id":9,"name":"cert.pdf"}]}],"current_page":1,"last_page":2,"page_size":10,"total_count":11}"#,
        );
        let api = SurveyApi::with_base_url(base).unwrap();

        let page = api
            .fetch_responses(DEFAULT_PAGE, DEFAULT_PAGE_SIZE, Some("jane@example.test"))
            .await
            .unwrap();

        assert_eq!(page.question_response.len(), 1);
        assert_eq!(page.question_response[0].certificates[0].id, 9);
        assert_eq!(page.last_page, 2);
    }

    #[tokio::test]
    async fn submit_error_uses_the_detail_message() {
        let base = serve_once(400, r#"{"detail":"certificate too large"}"#);
        let api = SurveyApi::with_base_url(base).unwrap();

        let submission = SurveySubmission {
            full_name: "Jane Doe".into(),
            email_address: "jane@example.test".into(),
            certificates: vec![CertificateUpload {
                file_name: "cert.pdf".into(),
                bytes: vec![1, 2, 3],
            }],
            ..Default::default()
        };
        let err = api.submit_response(&submission).await.unwrap_err();

        match err {
            ApiError::Status { status, message } => {
                assert_eq!(status, 400);
                assert_eq!(message, "certificate too large");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }
}
