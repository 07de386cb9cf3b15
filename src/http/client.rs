use super::debug::{DebugDump, HttpDebugConfig};
use crate::trace::{SessionTrace, TraceEvent};
use reqwest::header::{CONTENT_TYPE, HeaderMap, HeaderValue};
use reqwest::{Client, Response};
use std::fmt;
use std::io::{self, Write};
#[cfg(test)]
use std::sync::{Arc, Mutex};

/// Most bytes kept from a non-success body. Callers only ever surface a short
/// prefix of it, so a huge error page is never buffered whole.
pub const ERROR_BODY_LIMIT: usize = 8 * 1024;

/// Which leg of the proxy chain an exchange belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Exchange {
    /// Client to backend proxy. `attempt` is 1-based.
    Backend { attempt: u32, max_attempts: u32 },
    /// Backend proxy to the Gemini API.
    Gemini,
}

impl fmt::Display for Exchange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Backend {
                attempt,
                max_attempts,
            } => write!(f, "backend {attempt}/{max_attempts}"),
            Self::Gemini => f.write_str("gemini"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponseData {
    pub status: u16,
    pub body: String,
    /// Set when a non-success body went past [`ERROR_BODY_LIMIT`].
    pub truncated: bool,
}

impl HttpResponseData {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// reqwest client shared by the orchestrator and the Gemini provider. Every
/// exchange can be dumped to stderr (`--verbose`) and to the session trace.
#[derive(Clone)]
pub struct HttpClient {
    inner: Client,
    debug: HttpDebugConfig,
    sink: LogSink,
    trace: Option<SessionTrace>,
}

#[derive(Clone)]
enum LogSink {
    Stderr,
    #[cfg(test)]
    Buffer(Arc<Mutex<Vec<String>>>),
}

impl fmt::Debug for HttpClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HttpClient")
            .field("debug", &self.debug)
            .field("trace", &self.trace.is_some())
            .finish()
    }
}

impl HttpClient {
    pub fn new(inner: Client, debug: HttpDebugConfig) -> Self {
        Self {
            inner,
            debug,
            sink: LogSink::Stderr,
            trace: None,
        }
    }

    pub fn with_trace(mut self, trace: SessionTrace) -> Self {
        self.trace = Some(trace);
        self
    }

    pub fn trace(&self) -> Option<&SessionTrace> {
        self.trace.as_ref()
    }

    /// Posts an already serialized JSON document. Retrying callers pass the
    /// same string each time so every attempt carries identical bytes.
    pub async fn post_json(
        &self,
        exchange: Exchange,
        url: &str,
        query: &[(&str, &str)],
        body_json: &str,
    ) -> Result<HttpResponseData, reqwest::Error> {
        let request = self
            .inner
            .post(url)
            .query(query)
            .header(CONTENT_TYPE, HeaderValue::from_static("application/json"))
            .body(body_json.to_owned())
            .build()?;

        self.emit_request(exchange, &request, body_json);
        match self.exchange(request).await {
            Ok((headers, response)) => {
                self.emit_response(exchange, &headers, &response);
                Ok(response)
            }
            Err(err) => {
                self.emit_failure(exchange, &err.to_string());
                Err(err)
            }
        }
    }

    async fn exchange(
        &self,
        request: reqwest::Request,
    ) -> Result<(HeaderMap, HttpResponseData), reqwest::Error> {
        let response = self.inner.execute(request).await?;
        let status = response.status();
        let headers = response.headers().clone();
        let (body, truncated) = if status.is_success() {
            (response.text().await?, false)
        } else {
            read_capped(response, ERROR_BODY_LIMIT).await?
        };

        Ok((
            headers,
            HttpResponseData {
                status: status.as_u16(),
                body,
                truncated,
            },
        ))
    }

    fn emit_request(&self, exchange: Exchange, request: &reqwest::Request, body_json: &str) {
        if self.debug.enabled {
            let dump = DebugDump::new(self.debug, exchange).request(
                request.method(),
                request.url(),
                request.headers(),
                body_json,
            );
            self.write_lines(dump.into_lines());
        }
        if let Some(trace) = &self.trace {
            trace.record(TraceEvent::HttpRequest {
                exchange,
                method: request.method().as_str(),
                url: request.url().as_str(),
                headers: request.headers(),
                body: body_json,
            });
        }
    }

    fn emit_response(
        &self,
        exchange: Exchange,
        headers: &HeaderMap,
        response: &HttpResponseData,
    ) {
        if self.debug.enabled {
            let dump = DebugDump::new(self.debug, exchange).response(
                response.status,
                headers,
                &response.body,
                response.truncated,
            );
            self.write_lines(dump.into_lines());
        }
        if let Some(trace) = &self.trace {
            trace.record(TraceEvent::HttpResponse {
                exchange,
                status: response.status,
                headers,
                body: &response.body,
                truncated: response.truncated,
            });
        }
    }

    fn emit_failure(&self, exchange: Exchange, message: &str) {
        if self.debug.enabled {
            let dump = DebugDump::new(self.debug, exchange).failure(message);
            self.write_lines(dump.into_lines());
        }
        if let Some(trace) = &self.trace {
            trace.record(TraceEvent::HttpError { exchange, message });
        }
    }

    fn write_lines(&self, lines: Vec<String>) {
        match &self.sink {
            LogSink::Stderr => {
                let mut stderr = io::stderr().lock();
                for line in lines {
                    let _ = writeln!(stderr, "{line}");
                }
            }
            #[cfg(test)]
            LogSink::Buffer(buffer) => {
                if let Ok(mut buffer) = buffer.lock() {
                    buffer.extend(lines);
                }
            }
        }
    }

    #[cfg(test)]
    pub fn with_buffer_sink(
        inner: Client,
        debug: HttpDebugConfig,
    ) -> (Self, Arc<Mutex<Vec<String>>>) {
        let buffer = Arc::new(Mutex::new(Vec::new()));
        let client = Self {
            inner,
            debug,
            sink: LogSink::Buffer(Arc::clone(&buffer)),
            trace: None,
        };
        (client, buffer)
    }
}

/// Reads at most `limit` bytes of the body and reports whether more was left.
async fn read_capped(
    mut response: Response,
    limit: usize,
) -> Result<(String, bool), reqwest::Error> {
    let mut bytes = Vec::new();
    while let Some(chunk) = response.chunk().await? {
        let room = limit.saturating_sub(bytes.len());
        if chunk.len() > room {
            bytes.extend_from_slice(&chunk[..room]);
            return Ok((String::from_utf8_lossy(&bytes).into_owned(), true));
        }
        bytes.extend_from_slice(&chunk);
    }
    Ok((String::from_utf8_lossy(&bytes).into_owned(), false))
}
