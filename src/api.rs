// API client module: a small blocking HTTP client for the Go-UPC lookup
// API, plus the sequential batch helper built on top of it.
//
// Every failure is mapped onto `LookupError` and handed back to the caller.
// Nothing here retries, sleeps between requests or prints to the terminal.

use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};
use reqwest::blocking::{Client, Response};
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION, CONTENT_TYPE};
use reqwest::StatusCode;
use serde::Serialize;
use serde_json::Value;
use std::time::Duration;
use thiserror::Error;
use tracing::debug;

/// Fixed base URL of the lookup API.
pub const BASE_URL: &str = "https://go-upc.com/api/v1";

/// Per-request timeout.
pub const REQUEST_TIMEOUT: Duration = Duration::from_millis(15_000);

/// Characters left unescaped in a barcode path segment. Matches the set a
/// browser's `encodeURIComponent` keeps.
const PATH_SEGMENT: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'!')
    .remove(b'~')
    .remove(b'*')
    .remove(b'\'')
    .remove(b'(')
    .remove(b')');

/// Why a single lookup failed. The `Display` text is what the user sees and
/// what a batch records for a failed item.
#[derive(Debug, Error)]
pub enum LookupError {
    #[error("Unauthorized: invalid or missing API key. Run: goupc config set --api-key <KEY>")]
    Unauthorized,

    #[error("Product not found for barcode: {barcode}")]
    NotFound { barcode: String },

    #[error("Rate limit exceeded. Please wait before making more requests.")]
    RateLimited,

    #[error("API error ({status}): {message}")]
    Api { status: u16, message: String },

    /// No HTTP response at all: DNS, connect, TLS or timeout failure.
    #[error("Network error: {0}")]
    Network(String),

    /// A successful status whose body is not JSON.
    #[error("Invalid response body: {0}")]
    InvalidBody(String),

    #[error("Failed to build HTTP client: {0}")]
    Client(String),
}

/// Anything that can resolve one barcode to a raw API response. The batch
/// helper is written against this so it can run over a fake in tests.
pub trait BarcodeLookup {
    fn lookup(&self, barcode: &str) -> Result<Value, LookupError>;
}

/// Blocking client bound to one API key and base URL.
pub struct LookupClient {
    client: Client,
    base_url: String,
}

impl LookupClient {
    /// Create a client for the production API.
    pub fn new(api_key: &str) -> Result<Self, LookupError> {
        Self::with_base_url(api_key, BASE_URL)
    }

    /// Create a client against another base URL (a mock server in tests).
    pub fn with_base_url(api_key: &str, base_url: &str) -> Result<Self, LookupError> {
        let client = Client::builder()
            .default_headers(default_headers(api_key)?)
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| LookupError::Client(e.to_string()))?;
        Ok(LookupClient {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    /// Full request URL for a barcode, with the barcode escaped as a single
    /// path segment.
    pub fn code_url(&self, barcode: &str) -> String {
        format!(
            "{}/code/{}",
            self.base_url,
            utf8_percent_encode(barcode, PATH_SEGMENT)
        )
    }
}

impl BarcodeLookup for LookupClient {
    /// Fetch one barcode and return the response body unchanged.
    fn lookup(&self, barcode: &str) -> Result<Value, LookupError> {
        let url = self.code_url(barcode);
        debug!(%url, "looking up barcode");

        let res = self
            .client
            .get(&url)
            .send()
            .map_err(|e| LookupError::Network(e.to_string()))?;

        let status = res.status();
        if !status.is_success() {
            let body = res.text().unwrap_or_default();
            let err = classify_failure(status, &body, barcode);
            debug!(%status, barcode, "lookup failed");
            return Err(err);
        }

        parse_body(res)
    }
}

fn default_headers(api_key: &str) -> Result<HeaderMap, LookupError> {
    let mut headers = HeaderMap::new();
    let mut bearer = HeaderValue::from_str(&format!("Bearer {api_key}"))
        .map_err(|e| LookupError::Client(format!("invalid API key: {e}")))?;
    bearer.set_sensitive(true);
    headers.insert(AUTHORIZATION, bearer);
    headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
    Ok(headers)
}

fn parse_body(res: Response) -> Result<Value, LookupError> {
    let text = res
        .text()
        .map_err(|e| LookupError::Network(e.to_string()))?;
    serde_json::from_str(&text).map_err(|e| LookupError::InvalidBody(e.to_string()))
}

/// Map a non-success HTTP status (and its body) onto a [`LookupError`].
pub fn classify_failure(status: StatusCode, body: &str, barcode: &str) -> LookupError {
    match status {
        StatusCode::UNAUTHORIZED => LookupError::Unauthorized,
        StatusCode::NOT_FOUND => LookupError::NotFound {
            barcode: barcode.to_string(),
        },
        StatusCode::TOO_MANY_REQUESTS => LookupError::RateLimited,
        other => LookupError::Api {
            status: other.as_u16(),
            message: body_message(body).unwrap_or_else(|| {
                format!("Request failed with status code {}", other.as_u16())
            }),
        },
    }
}

/// Best-effort error text from a response body: its `message` field, else
/// its `error` field.
fn body_message(body: &str) -> Option<String> {
    let value: Value = serde_json::from_str(body).ok()?;
    ["message", "error"].iter().find_map(|key| {
        value
            .get(*key)
            .and_then(Value::as_str)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
    })
}

/// Outcome of one barcode within a batch. Serializes as
/// `{"code": .., "data": ..}` or `{"code": .., "error": ..}`.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum BatchResult {
    Success { code: String, data: Value },
    Failure { code: String, error: String },
}

impl BatchResult {
    pub fn code(&self) -> &str {
        match self {
            BatchResult::Success { code, .. } | BatchResult::Failure { code, .. } => code,
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, BatchResult::Success { .. })
    }
}

/// Look up each code in order, one request at a time.
///
/// The result has one entry per input code, in input order. A failed lookup
/// is recorded by its message and the loop moves on to the next code.
pub fn lookup_batch<L>(client: &L, codes: &[String]) -> Vec<BatchResult>
where
    L: BarcodeLookup + ?Sized,
{
    codes
        .iter()
        .map(|code| match client.lookup(code) {
            Ok(data) => BatchResult::Success {
                code: code.clone(),
                data,
            },
            Err(err) => {
                debug!(%code, error = %err, "batch item failed");
                BatchResult::Failure {
                    code: code.clone(),
                    error: err.to_string(),
                }
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::cell::RefCell;

    struct FakeLookup {
        failing: &'static str,
        calls: RefCell<Vec<String>>,
    }

    impl BarcodeLookup for FakeLookup {
        fn lookup(&self, barcode: &str) -> Result<Value, LookupError> {
            self.calls.borrow_mut().push(barcode.to_string());
            if barcode == self.failing {
                Err(LookupError::NotFound {
                    barcode: barcode.to_string(),
                })
            } else {
                Ok(json!({ "barcode": barcode }))
            }
        }
    }

    fn codes(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| (*s).to_string()).collect()
    }

    #[test]
    fn batch_keeps_order_and_records_failure_in_place() {
        let fake = FakeLookup {
            failing: "222",
            calls: RefCell::new(Vec::new()),
        };

        let results = lookup_batch(&fake, &codes(&["111", "222", "333"]));

        assert_eq!(
            results,
            vec![
                BatchResult::Success {
                    code: "111".into(),
                    data: json!({ "barcode": "111" }),
                },
                BatchResult::Failure {
                    code: "222".into(),
                    error: "Product not found for barcode: 222".into(),
                },
                BatchResult::Success {
                    code: "333".into(),
                    data: json!({ "barcode": "333" }),
                },
            ]
        );
        assert_eq!(*fake.calls.borrow(), codes(&["111", "222", "333"]));
    }

    #[test]
    fn batch_does_not_retry_or_dedupe() {
        let fake = FakeLookup {
            failing: "x",
            calls: RefCell::new(Vec::new()),
        };

        let results = lookup_batch(&fake, &codes(&["x", "x"]));

        assert_eq!(results.len(), 2);
        assert!(results.iter().all(|r| !r.is_success()));
        assert_eq!(fake.calls.borrow().len(), 2);
    }

    #[test]
    fn empty_batch_is_empty() {
        let fake = FakeLookup {
            failing: "",
            calls: RefCell::new(Vec::new()),
        };
        assert!(lookup_batch(&fake, &[]).is_empty());
    }

    #[test]
    fn batch_results_serialize_as_code_plus_data_or_error() {
        let results = vec![
            BatchResult::Success {
                code: "1".into(),
                data: json!({ "name": "A" }),
            },
            BatchResult::Failure {
                code: "2".into(),
                error: "boom".into(),
            },
        ];

        let value = serde_json::to_value(&results).unwrap();

        assert_eq!(
            value,
            json!([
                { "code": "1", "data": { "name": "A" } },
                { "code": "2", "error": "boom" }
            ])
        );
    }

    #[test]
    fn unauthorized_message_explains_setup() {
        let err = classify_failure(StatusCode::UNAUTHORIZED, "", "123");
        assert!(matches!(err, LookupError::Unauthorized));
        assert!(err.to_string().contains("goupc config set --api-key"));
    }

    #[test]
    fn not_found_message_contains_barcode() {
        let err = classify_failure(StatusCode::NOT_FOUND, "{}", "0123456789012");
        assert_eq!(
            err.to_string(),
            "Product not found for barcode: 0123456789012"
        );
    }

    #[test]
    fn rate_limited_asks_to_wait() {
        let err = classify_failure(StatusCode::TOO_MANY_REQUESTS, "", "1");
        assert!(matches!(err, LookupError::RateLimited));
        assert!(err.to_string().contains("Please wait"));
    }

    #[test]
    fn other_status_prefers_message_then_error_field() {
        let err = classify_failure(
            StatusCode::BAD_REQUEST,
            r#"{"message": "bad code", "error": "ignored"}"#,
            "1",
        );
        assert_eq!(err.to_string(), "API error (400): bad code");

        let err = classify_failure(StatusCode::FORBIDDEN, r#"{"error": "plan expired"}"#, "1");
        assert_eq!(err.to_string(), "API error (403): plan expired");
    }

    #[test]
    fn other_status_without_usable_body_uses_generic_message() {
        let err = classify_failure(StatusCode::INTERNAL_SERVER_ERROR, "<html>oops</html>", "1");
        assert_eq!(
            err.to_string(),
            "API error (500): Request failed with status code 500"
        );
    }

    #[test]
    fn barcode_is_escaped_as_one_path_segment() {
        let client = LookupClient::with_base_url("k", "https://example.test/api/").unwrap();
        assert_eq!(
            client.code_url("012345678905"),
            "https://example.test/api/code/012345678905"
        );
        assert_eq!(
            client.code_url("a/b c?"),
            "https://example.test/api/code/a%2Fb%20c%3F"
        );
    }

    #[test]
    fn api_key_with_newline_is_rejected() {
        let err = LookupClient::new("bad\nkey").err().unwrap();
        assert!(matches!(err, LookupError::Client(_)));
    }
}
