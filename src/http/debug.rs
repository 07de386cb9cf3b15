use reqwest::header::{HeaderMap, HeaderValue};
use reqwest::{Method, Url};
use serde_json::Value;

use super::client::Exchange;

const REDACTION: &str = "***REDACTED***";
const SENSITIVE_KEYS: [&str; 11] = [
    "key",
    "api_key",
    "apikey",
    "gemini_api_key",
    "token",
    "access_token",
    "authorization",
    "secret",
    "password",
    "x-api-key",
    "x-goog-api-key",
];
const DEFAULT_MAX_BODY_CHARS: usize = 4_000;

/// Controls the `--verbose` request/response dumps written to stderr.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HttpDebugConfig {
    pub enabled: bool,
    pub redact_secrets: bool,
    pub max_body_chars: usize,
}

impl HttpDebugConfig {
    pub fn from_verbose(verbose: bool) -> Self {
        Self {
            enabled: verbose,
            redact_secrets: true,
            max_body_chars: DEFAULT_MAX_BODY_CHARS,
        }
    }

    pub fn disabled() -> Self {
        Self::from_verbose(false)
    }
}

/// Lines describing one exchange, each tagged with the leg it belongs to,
/// e.g. `[http-debug backend 2/5] > POST http://localhost:3000/api`.
///
/// `>` marks outbound lines, `<` inbound ones and `!` transport failures.
pub(crate) struct DebugDump {
    config: HttpDebugConfig,
    tag: String,
    lines: Vec<String>,
}

impl DebugDump {
    pub(crate) fn new(config: HttpDebugConfig, exchange: Exchange) -> Self {
        Self {
            config,
            tag: format!("[http-debug {exchange}]"),
            lines: Vec::new(),
        }
    }

    pub(crate) fn request(
        mut self,
        method: &Method,
        url: &Url,
        headers: &HeaderMap,
        body: &str,
    ) -> Self {
        let url = redact_url(url, self.config.redact_secrets);
        self.push('>', &format!("{method} {url}"));
        self.push_headers('>', headers);
        self.push_body('>', body);
        self
    }

    pub(crate) fn response(
        mut self,
        status: u16,
        headers: &HeaderMap,
        body: &str,
        truncated: bool,
    ) -> Self {
        self.push('<', &format!("HTTP {status}"));
        self.push_headers('<', headers);
        self.push_body('<', body);
        if truncated {
            self.push('<', "<body cut short by the read limit>");
        }
        self
    }

    pub(crate) fn failure(mut self, message: &str) -> Self {
        self.push('!', message);
        self
    }

    pub(crate) fn into_lines(self) -> Vec<String> {
        self.lines
    }

    fn push(&mut self, direction: char, text: &str) {
        let line = if text.is_empty() {
            format!("{} {direction}", self.tag)
        } else {
            format!("{} {direction} {text}", self.tag)
        };
        self.lines.push(line);
    }

    fn push_headers(&mut self, direction: char, headers: &HeaderMap) {
        for (name, value) in headers {
            let shown = redact_header_value(name.as_str(), value, self.config.redact_secrets);
            self.push(direction, &format!("{}: {shown}", name.as_str()));
        }
    }

    fn push_body(&mut self, direction: char, body: &str) {
        self.push(direction, "");
        let body = redact_text_body(body, self.config.redact_secrets);
        let body = truncate_for_log(&body, self.config.max_body_chars);
        if body.is_empty() {
            self.push(direction, "<empty body>");
            return;
        }
        for line in body.lines() {
            self.push(direction, line);
        }
    }
}

fn redact_url(url: &Url, enable_redaction: bool) -> String {
    if !enable_redaction || url.query().is_none() {
        return url.as_str().to_string();
    }

    let pairs: Vec<(String, String)> = url
        .query_pairs()
        .map(|(name, value)| {
            let shown = if is_sensitive_key(&name) {
                REDACTION.to_string()
            } else {
                value.into_owned()
            };
            (name.into_owned(), shown)
        })
        .collect();

    let mut redacted = url.clone();
    redacted.query_pairs_mut().clear().extend_pairs(pairs);
    redacted.to_string()
}

fn redact_header_value(name: &str, value: &HeaderValue, enable_redaction: bool) -> String {
    if enable_redaction && is_sensitive_key(name) {
        return REDACTION.to_string();
    }
    value.to_str().unwrap_or("<non-utf8>").to_string()
}

/// Masks sensitive keys anywhere in a JSON body. Non-JSON bodies, such as a
/// plain-text error page from the backend, pass through.
fn redact_text_body(raw: &str, enable_redaction: bool) -> String {
    if !enable_redaction {
        return raw.to_string();
    }

    let Ok(mut json) = serde_json::from_str::<Value>(raw) else {
        return raw.to_string();
    };
    mask_sensitive_keys(&mut json);
    serde_json::to_string(&json).unwrap_or_else(|_| raw.to_string())
}

fn truncate_for_log(input: &str, max_chars: usize) -> String {
    match input.char_indices().nth(max_chars) {
        None => input.to_string(),
        Some((cut, _)) => {
            let dropped = input[cut..].chars().count();
            format!("{}... <truncated {dropped} chars>", &input[..cut])
        }
    }
}

fn mask_sensitive_keys(value: &mut Value) {
    match value {
        Value::Object(map) => {
            for (key, item) in map.iter_mut() {
                if is_sensitive_key(key) {
                    *item = Value::String(REDACTION.to_string());
                } else {
                    mask_sensitive_keys(item);
                }
            }
        }
        Value::Array(items) => items.iter_mut().for_each(mask_sensitive_keys),
        _ => {}
    }
}

fn is_sensitive_key(key: &str) -> bool {
    SENSITIVE_KEYS
        .iter()
        .any(|sensitive| sensitive.eq_ignore_ascii_case(key))
}
