use super::redact::truncate_for_log;
use crate::trace::SessionTrace;
use reqwest::header::HeaderMap;
use reqwest::{Client, Response};
use std::fmt;

const MAX_TRACE_BODY_CHARS: usize = 4_000;

#[derive(Clone)]
pub struct HttpClient {
    inner: Client,
    trace: Option<SessionTrace>,
}

impl fmt::Debug for HttpClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HttpClient")
            .field("trace", &self.trace.as_ref().map(SessionTrace::file_path))
            .finish()
    }
}

impl HttpClient {
    pub fn new(inner: Client) -> Self {
        Self { inner, trace: None }
    }

    pub fn with_trace(mut self, trace: SessionTrace) -> Self {
        self.trace = Some(trace);
        self
    }

    /// Sends a POST and hands back the response with its body unread, so
    /// the caller can consume it as a stream.
    pub async fn post(
        &self,
        url: &str,
        headers: HeaderMap,
        body: Vec<u8>,
    ) -> Result<Response, reqwest::Error> {
        let body_text = truncate_for_log(&String::from_utf8_lossy(&body), MAX_TRACE_BODY_CHARS);
        let request = self.inner.post(url).headers(headers).body(body).build()?;
        if let Some(trace) = &self.trace {
            trace.log_http_request(
                request.method().as_str(),
                request.url().as_str(),
                request.headers(),
                &body_text,
            );
        }

        let response = match self.inner.execute(request).await {
            Ok(response) => response,
            Err(err) => {
                if let Some(trace) = &self.trace {
                    trace.log_http_error(&err.to_string());
                }
                return Err(err);
            }
        };

        if let Some(trace) = &self.trace {
            trace.log_http_response(response.status().as_u16(), response.headers());
        }

        Ok(response)
    }

    pub fn trace(&self) -> Option<&SessionTrace> {
        self.trace.as_ref()
    }
}
