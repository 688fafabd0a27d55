use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use futures::StreamExt;
use reqwest::Url;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use time::OffsetDateTime;

use super::credentials::CredentialSource;
use super::eventstream::{EventStreamDecoder, Frame};
use super::provider::{ChatTurn, LlmError, LlmProvider, LlmResult};
use super::sigv4::{SignableRequest, SigningScope, encode_segment};
use crate::http::client::HttpClient;

pub const DEFAULT_BEDROCK_MODEL: &str = "anthropic.claude-v2";
pub const DEFAULT_AWS_REGION: &str = "us-east-1";
pub const DEFAULT_AWS_PROFILE: &str = "default";

const ANTHROPIC_VERSION: &str = "bedrock-2023-05-31";
const MAX_TOKENS: u32 = 210;
const TEMPERATURE: f64 = 0.3;
const TOP_P: f64 = 0.8;
const SIGNING_SERVICE: &str = "bedrock";
const JSON_CONTENT_TYPE: &str = "application/json";
const MAX_ERROR_BODY_CHARS: usize = 400;

#[derive(Debug, Clone)]
pub struct BedrockProvider {
    http: HttpClient,
    credentials: CredentialSource,
    scope: SigningScope,
    model: String,
    endpoint: String,
}

impl BedrockProvider {
    pub fn new(
        http: HttpClient,
        credentials: CredentialSource,
        region: String,
        model: String,
        endpoint: Option<String>,
    ) -> Self {
        let endpoint = endpoint
            .filter(|value| !value.trim().is_empty())
            .unwrap_or_else(|| Self::regional_endpoint(&region));

        Self {
            http,
            credentials,
            scope: SigningScope::new(region, SIGNING_SERVICE),
            model,
            endpoint: endpoint.trim_end_matches('/').to_string(),
        }
    }

    pub fn regional_endpoint(region: &str) -> String {
        format!("https://bedrock-runtime.{region}.amazonaws.com")
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    fn invoke_url(&self) -> String {
        format!(
            "{}/model/{}/invoke-with-response-stream",
            self.endpoint,
            encode_segment(&self.model)
        )
    }

    fn build_request(conversation: &[ChatTurn]) -> InvokeRequest<'_> {
        InvokeRequest {
            messages: conversation,
            max_tokens: MAX_TOKENS,
            anthropic_version: ANTHROPIC_VERSION,
            temperature: TEMPERATURE,
            top_p: TOP_P,
        }
    }

    fn signed_headers(&self, url: &Url, payload: &[u8]) -> LlmResult<HeaderMap> {
        let credentials = self.credentials.resolve()?;
        let signed = self.scope.sign(
            &SignableRequest {
                method: "POST",
                url,
                headers: &[
                    ("accept", JSON_CONTENT_TYPE),
                    ("content-type", JSON_CONTENT_TYPE),
                ],
                payload,
            },
            &credentials,
            OffsetDateTime::now_utc(),
        );

        let mut headers = HeaderMap::new();
        for (name, value) in signed {
            let name = HeaderName::from_bytes(name.as_bytes())
                .map_err(|err| LlmError::Request(format!("invalid header name {name}: {err}")))?;
            let value = HeaderValue::from_str(&value)
                .map_err(|err| LlmError::Request(format!("invalid value for {name}: {err}")))?;
            headers.insert(name, value);
        }
        Ok(headers)
    }

    fn apply_frame(&self, frame: &Frame, accumulator: &mut TextAccumulator) -> LlmResult<()> {
        match classify_frame(frame) {
            StreamEvent::Chunk(payload) => {
                if let Err(err) = accumulator.push_chunk(payload)
                    && let Some(trace) = self.http.trace()
                {
                    trace.log_stream_skipped(&err.to_string());
                }
                Ok(())
            }
            StreamEvent::Exception { kind, message } => {
                Err(LlmError::ModelException { kind, message })
            }
            StreamEvent::Ignored => Ok(()),
        }
    }
}

impl LlmProvider for BedrockProvider {
    async fn generate(&self, conversation: &[ChatTurn]) -> LlmResult<String> {
        let payload = serde_json::to_vec(&Self::build_request(conversation))
            .map_err(|err| LlmError::Request(err.to_string()))?;
        let url_text = self.invoke_url();
        let url = Url::parse(&url_text)
            .map_err(|err| LlmError::Request(format!("invalid endpoint {url_text}: {err}")))?;
        let headers = self.signed_headers(&url, &payload)?;

        let response = self
            .http
            .post(url.as_str(), headers, payload)
            .await
            .map_err(|err| LlmError::Transport(err.to_string()))?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "<failed to read body>".to_string());
            let body = body.chars().take(MAX_ERROR_BODY_CHARS).collect::<String>();
            return Err(LlmError::HttpStatus { status, body });
        }

        let mut decoder = EventStreamDecoder::new();
        let mut accumulator = TextAccumulator::default();
        let mut body = response.bytes_stream();
        while let Some(bytes) = body.next().await {
            let bytes = bytes.map_err(|err| LlmError::Transport(err.to_string()))?;
            decoder.push(&bytes);
            while let Some(frame) = decoder
                .next_frame()
                .map_err(|err| LlmError::Stream(err.to_string()))?
            {
                self.apply_frame(&frame, &mut accumulator)?;
            }
        }
        decoder
            .finish()
            .map_err(|err| LlmError::Stream(err.to_string()))?;

        let text = accumulator.into_text();
        if let Some(trace) = self.http.trace() {
            trace.log_stream_text(&text);
        }
        Ok(text)
    }
}

#[derive(Debug, Serialize)]
struct InvokeRequest<'a> {
    messages: &'a [ChatTurn],
    max_tokens: u32,
    anthropic_version: &'static str,
    temperature: f64,
    top_p: f64,
}

#[derive(Debug, Deserialize)]
struct ChunkEnvelope {
    bytes: String,
}

#[derive(Debug, Default, Deserialize)]
struct ExceptionBody {
    #[serde(default)]
    message: String,
}

#[derive(Debug, PartialEq, Eq)]
enum StreamEvent<'a> {
    Chunk(&'a [u8]),
    Exception { kind: String, message: String },
    Ignored,
}

fn classify_frame(frame: &Frame) -> StreamEvent<'_> {
    match frame.header(":message-type") {
        Some("event") if frame.header(":event-type") == Some("chunk") => {
            StreamEvent::Chunk(&frame.payload)
        }
        Some("exception") => {
            let body = serde_json::from_slice::<ExceptionBody>(&frame.payload).unwrap_or_default();
            StreamEvent::Exception {
                kind: frame
                    .header(":exception-type")
                    .unwrap_or("exception")
                    .to_string(),
                message: body.message,
            }
        }
        Some("error") => StreamEvent::Exception {
            kind: frame.header(":error-code").unwrap_or("error").to_string(),
            message: frame.header(":error-message").unwrap_or_default().to_string(),
        },
        _ => StreamEvent::Ignored,
    }
}

#[derive(Debug, Error)]
pub enum ChunkError {
    #[error("chunk envelope is not valid JSON: {0}")]
    Envelope(serde_json::Error),
    #[error("chunk bytes are not valid base64: {0}")]
    Base64(#[from] base64::DecodeError),
    #[error("chunk record is not valid JSON: {0}")]
    Record(serde_json::Error),
}

#[derive(Debug, Default)]
pub struct TextAccumulator {
    text: String,
}

impl TextAccumulator {
    pub fn push_chunk(&mut self, payload: &[u8]) -> Result<(), ChunkError> {
        let envelope =
            serde_json::from_slice::<ChunkEnvelope>(payload).map_err(ChunkError::Envelope)?;
        let record = STANDARD.decode(envelope.bytes.as_bytes())?;
        if let Some(fragment) = text_delta(&record)? {
            self.text.push_str(&fragment);
        }
        Ok(())
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn into_text(self) -> String {
        self.text
    }
}

#[derive(Debug, Default)]
pub struct AssembledText {
    pub text: String,
    pub skipped: Vec<ChunkError>,
}

pub fn assemble_text<I, B>(chunks: I) -> AssembledText
where
    I: IntoIterator<Item = B>,
    B: AsRef<[u8]>,
{
    let mut accumulator = TextAccumulator::default();
    let mut skipped = Vec::new();
    for chunk in chunks {
        if let Err(err) = accumulator.push_chunk(chunk.as_ref()) {
            skipped.push(err);
        }
    }
    AssembledText {
        text: accumulator.into_text(),
        skipped,
    }
}

fn text_delta(record: &[u8]) -> Result<Option<String>, ChunkError> {
    let record = serde_json::from_slice::<serde_json::Value>(record).map_err(ChunkError::Record)?;
    if record["type"] != "content_block_delta" || record["delta"]["type"] != "text_delta" {
        return Ok(None);
    }
    Ok(record["delta"]["text"].as_str().map(ToOwned::to_owned))
}

#[cfg(test)]
mod tests {
    use super::{
        BedrockProvider, ChunkError, StreamEvent, TextAccumulator, assemble_text, classify_frame,
    };
    use crate::http::client::HttpClient;
    use crate::llm::credentials::CredentialSource;
    use crate::llm::eventstream::{EventStreamDecoder, encode_frame};
    use crate::llm::provider::{ChatTurn, LlmError, LlmProvider};
    use crate::trace::SessionTrace;
    use base64::Engine;
    use base64::engine::general_purpose::STANDARD;
    use reqwest::Client;
    use serde_json::json;
    use std::fs;
    use std::path::Path;
    use tempfile::{TempDir, tempdir};
    use wiremock::matchers::{body_partial_json, header, header_exists, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn delta_chunk(text: &str) -> Vec<u8> {
        let record = json!({
            "type": "content_block_delta",
            "index": 0,
            "delta": {"type": "text_delta", "text": text}
        });
        chunk_payload(&record.to_string())
    }

    fn chunk_payload(record: &str) -> Vec<u8> {
        json!({"bytes": STANDARD.encode(record)}).to_string().into_bytes()
    }

    fn chunk_frame(payload: &[u8]) -> Vec<u8> {
        encode_frame(
            &[
                (":message-type", "event"),
                (":event-type", "chunk"),
                (":content-type", "application/json"),
            ],
            payload,
        )
    }

    fn credentials_in(dir: &Path) -> CredentialSource {
        let file = dir.join("credentials");
        fs::write(
            &file,
            "[escola]\naws_access_key_id = AKIDTEST\naws_secret_access_key = secret\n",
        )
        .expect("write credentials");
        CredentialSource::profile("escola").with_credentials_file(file)
    }

    fn provider(server: &MockServer, dir: &TempDir, model: &str) -> BedrockProvider {
        BedrockProvider::new(
            HttpClient::new(Client::new()),
            credentials_in(dir.path()),
            "us-east-1".to_string(),
            model.to_string(),
            Some(server.uri()),
        )
    }

    #[test]
    fn assemble_text_keeps_only_text_deltas_in_order() {
        let chunks = vec![
            chunk_payload(r#"{"type":"message_start","message":{"role":"assistant"}}"#),
            delta_chunk("Olá"),
            chunk_payload(r#"{"type":"content_block_delta","delta":{"type":"input_json_delta","partial_json":"{}"}}"#),
            delta_chunk(", tudo bem?"),
            chunk_payload(r#"{"type":"message_stop"}"#),
        ];

        let assembled = assemble_text(chunks);
        assert_eq!(assembled.text, "Olá, tudo bem?");
        assert!(assembled.skipped.is_empty());
    }

    #[test]
    fn assemble_text_skips_malformed_chunks_and_continues() {
        let chunks = vec![
            delta_chunk("um "),
            b"not json".to_vec(),
            br#"{"bytes":"***"}"#.to_vec(),
            chunk_payload("{broken"),
            delta_chunk("dois"),
        ];

        let assembled = assemble_text(chunks);
        assert_eq!(assembled.text, "um dois");
        assert_eq!(assembled.skipped.len(), 3);
        assert!(matches!(assembled.skipped[0], ChunkError::Envelope(_)));
        assert!(matches!(assembled.skipped[1], ChunkError::Base64(_)));
        assert!(matches!(assembled.skipped[2], ChunkError::Record(_)));
    }

    #[test]
    fn assemble_text_of_nothing_is_empty() {
        let assembled = assemble_text(Vec::<Vec<u8>>::new());
        assert_eq!(assembled.text, "");
    }

    #[test]
    fn accumulator_exposes_partial_text() {
        let mut accumulator = TextAccumulator::default();
        accumulator.push_chunk(&delta_chunk("a")).expect("chunk");
        accumulator.push_chunk(&delta_chunk("b")).expect("chunk");
        assert_eq!(accumulator.text(), "ab");
    }

    #[test]
    fn classify_frame_reads_exception_type_and_message() {
        let bytes = encode_frame(
            &[
                (":message-type", "exception"),
                (":exception-type", "throttlingException"),
            ],
            br#"{"message":"Too many requests"}"#,
        );
        let mut decoder = EventStreamDecoder::new();
        decoder.push(&bytes);
        let frame = decoder.next_frame().expect("decode").expect("frame");

        assert_eq!(
            classify_frame(&frame),
            StreamEvent::Exception {
                kind: "throttlingException".to_string(),
                message: "Too many requests".to_string(),
            }
        );
    }

    #[test]
    fn invoke_url_encodes_model_id_once() {
        let dir = tempdir().expect("tempdir");
        let provider = BedrockProvider::new(
            HttpClient::new(Client::new()),
            credentials_in(dir.path()),
            "sa-east-1".to_string(),
            "anthropic.claude-v2:1".to_string(),
            None,
        );
        assert_eq!(
            provider.invoke_url(),
            "https://bedrock-runtime.sa-east-1.amazonaws.com/model/anthropic.claude-v2%3A1/invoke-with-response-stream"
        );
    }

    #[tokio::test]
    async fn generate_streams_and_assembles_answer() {
        let server = MockServer::start().await;
        let mut body = chunk_frame(&delta_chunk("Os cursos "));
        body.extend(chunk_frame(&delta_chunk("são gratuitos.")));

        Mock::given(method("POST"))
            .and(path("/model/anthropic.claude-v2%3A1/invoke-with-response-stream"))
            .and(header("content-type", "application/json"))
            .and(header("accept", "application/json"))
            .and(header_exists("authorization"))
            .and(header_exists("x-amz-date"))
            .and(body_partial_json(json!({
                "messages": [{"role": "user", "content": "Os cursos são pagos?"}],
                "max_tokens": 210,
                "anthropic_version": "bedrock-2023-05-31",
                "temperature": 0.3,
                "top_p": 0.8
            })))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_raw(body, "application/vnd.amazon.eventstream"),
            )
            .expect(1)
            .mount(&server)
            .await;

        let dir = tempdir().expect("tempdir");
        let provider = provider(&server, &dir, "anthropic.claude-v2:1");
        let text = provider
            .generate(&[ChatTurn::user("Os cursos são pagos?")])
            .await
            .expect("stream answer");

        assert_eq!(text, "Os cursos são gratuitos.");
    }

    #[tokio::test]
    async fn generate_skips_bad_chunk_and_traces_it() {
        let server = MockServer::start().await;
        let mut body = chunk_frame(&delta_chunk("antes "));
        body.extend(chunk_frame(b"garbage"));
        body.extend(chunk_frame(&delta_chunk("depois")));
        Mock::given(method("POST"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_raw(body, "application/vnd.amazon.eventstream"),
            )
            .mount(&server)
            .await;

        let dir = tempdir().expect("tempdir");
        let trace = SessionTrace::create_in_temp_dir("bedrock", dir.path()).expect("trace");
        let provider = BedrockProvider::new(
            HttpClient::new(Client::new()).with_trace(trace.clone()),
            credentials_in(dir.path()),
            "us-east-1".to_string(),
            "test-model".to_string(),
            Some(server.uri()),
        );

        let text = provider
            .generate(&[ChatTurn::user("oi")])
            .await
            .expect("stream answer");
        assert_eq!(text, "antes depois");

        let content = fs::read_to_string(trace.file_path()).expect("read trace");
        assert!(content.contains("skipped chunk: chunk envelope is not valid JSON"));
        assert!(content.contains("[llm.stream  ] antes depois"));
    }

    #[tokio::test]
    async fn generate_surfaces_exception_frames() {
        let server = MockServer::start().await;
        let mut body = chunk_frame(&delta_chunk("parcial"));
        body.extend(encode_frame(
            &[
                (":message-type", "exception"),
                (":exception-type", "modelStreamErrorException"),
            ],
            br#"{"message":"stream interrupted"}"#,
        ));
        Mock::given(method("POST"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_raw(body, "application/vnd.amazon.eventstream"),
            )
            .mount(&server)
            .await;

        let dir = tempdir().expect("tempdir");
        let err = provider(&server, &dir, "test-model")
            .generate(&[ChatTurn::user("oi")])
            .await
            .expect_err("exception frame should fail the call");

        assert_eq!(
            err,
            LlmError::ModelException {
                kind: "modelStreamErrorException".to_string(),
                message: "stream interrupted".to_string(),
            }
        );
    }

    #[tokio::test]
    async fn generate_maps_http_error_status() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(
                ResponseTemplate::new(403).set_body_string(r#"{"message":"not authorized"}"#),
            )
            .mount(&server)
            .await;

        let dir = tempdir().expect("tempdir");
        let err = provider(&server, &dir, "test-model")
            .generate(&[ChatTurn::user("oi")])
            .await
            .expect_err("expected auth error");

        match err {
            LlmError::HttpStatus { status, body } => {
                assert_eq!(status, 403);
                assert!(body.contains("not authorized"));
            }
            other => panic!("expected HttpStatus, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn generate_reports_truncated_stream() {
        let server = MockServer::start().await;
        let frame = chunk_frame(&delta_chunk("cortado"));
        let body = frame[..frame.len() - 3].to_vec();
        Mock::given(method("POST"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_raw(body, "application/vnd.amazon.eventstream"),
            )
            .mount(&server)
            .await;

        let dir = tempdir().expect("tempdir");
        let err = provider(&server, &dir, "test-model")
            .generate(&[ChatTurn::user("oi")])
            .await
            .expect_err("truncated body should fail");

        assert!(matches!(err, LlmError::Stream(_)));
    }
}
