//! HTTP transport for the points-of-interest provider
//!
//! Blocking on purpose: commands already run on blocking worker threads, and
//! a refresh sends its cell queries one after another.

use crate::poi::{PoiRequest, PoiTransport, TransportError};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Header carrying the provider API key.
const API_KEY_HEADER: &str = "x-goog-api-key";

/// Where and how to reach the provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct HttpConfig {
    pub url: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
    pub timeout_secs: u64,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            url: "https://playablelocations.googleapis.com/v3:samplePlayableLocations".into(),
            api_key: None,
            timeout_secs: 10,
        }
    }
}

/// Posts each [`PoiRequest`] as JSON and hands back the response body.
pub struct HttpTransport {
    agent: ureq::Agent,
    url: String,
    api_key: Option<String>,
}

impl HttpTransport {
    pub fn new(config: &HttpConfig) -> Self {
        let agent = ureq::AgentBuilder::new()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build();
        Self {
            agent,
            url: config.url.clone(),
            api_key: config.api_key.clone(),
        }
    }
}

impl PoiTransport for HttpTransport {
    fn send(&self, request: &PoiRequest) -> Result<String, TransportError> {
        let body = serde_json::to_string(request)
            .map_err(|err| TransportError::unreachable(format!("encoding request: {err}")))?;

        let mut call = self
            .agent
            .post(&self.url)
            .set("Content-Type", "application/json");
        if let Some(key) = &self.api_key {
            call = call.set(API_KEY_HEADER, key);
        }

        match call.send_string(&body) {
            Ok(response) => response
                .into_string()
                .map_err(|err| TransportError::unreachable(format!("reading body: {err}"))),
            Err(ureq::Error::Status(code, response)) => {
                let detail = response.into_string().unwrap_or_default();
                tracing::debug!(code, url = %self.url, "Provider refused request");
                Err(TransportError::status(code, detail))
            }
            Err(ureq::Error::Transport(err)) => Err(TransportError::unreachable(err.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::poi::ProviderConfig;
    use roam_core::CellId;
    use std::io::{BufRead, BufReader, Read, Write};
    use std::net::TcpListener;
    use std::thread::{self, JoinHandle};

    /// Answers one request with `status` and `body`, returning what it saw.
    fn serve_once(status: &'static str, body: &'static str) -> (String, JoinHandle<Vec<String>>) {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let url = format!("http://{}/v3:samplePlayableLocations", listener.local_addr().unwrap());
        let handle = thread::spawn(move || {
            let (stream, _) = listener.accept().unwrap();
            let mut reader = BufReader::new(stream.try_clone().unwrap());
            let mut lines = Vec::new();
            let mut length = 0;
            loop {
                let mut line = String::new();
                reader.read_line(&mut line).unwrap();
                let line = line.trim_end().to_string();
                if line.is_empty() {
                    break;
                }
                if let Some((name, value)) = line.split_once(':') {
                    if name.eq_ignore_ascii_case("content-length") {
                        length = value.trim().parse().unwrap();
                    }
                }
                lines.push(line);
            }
            let mut payload = vec![0; length];
            reader.read_exact(&mut payload).unwrap();
            lines.push(String::from_utf8(payload).unwrap());

            let mut stream = stream;
            write!(
                stream,
                "HTTP/1.1 {status}\r\n\
                 Content-Type: application/json\r\n\
                 Content-Length: {}\r\n\
                 Connection: close\r\n\r\n{body}",
                body.len()
            )
            .unwrap();
            lines
        });
        (url, handle)
    }

    fn request() -> PoiRequest {
        PoiRequest::for_cell(&CellId::from_token("5764607523034234880"), &ProviderConfig::default())
    }

    #[test]
    fn success_returns_body_and_sends_key() {
        let (url, server) = serve_once("200 OK", r#"{"ttl":"60s"}"#);
        let transport = HttpTransport::new(&HttpConfig {
            url,
            api_key: Some("secret".into()),
            timeout_secs: 5,
        });

        assert_eq!(transport.send(&request()).unwrap(), r#"{"ttl":"60s"}"#);

        let seen = server.join().unwrap();
        assert!(seen[0].starts_with("POST /v3:samplePlayableLocations"));
        assert!(seen
            .iter()
            .any(|line| line.to_ascii_lowercase() == "x-goog-api-key: secret"));
        let sent: PoiRequest = serde_json::from_str(seen.last().unwrap()).unwrap();
        assert_eq!(sent, request());
    }

    #[test]
    fn error_status_is_kept() {
        let (url, server) = serve_once("503 Service Unavailable", "busy");
        let transport = HttpTransport::new(&HttpConfig {
            url,
            ..HttpConfig::default()
        });

        let err = transport.send(&request()).unwrap_err();
        assert_eq!(err.status, Some(503));
        assert_eq!(err.message, "busy");
        server.join().unwrap();
    }

    #[test]
    fn closed_port_is_unreachable() {
        let port = TcpListener::bind("127.0.0.1:0")
            .unwrap()
            .local_addr()
            .unwrap()
            .port();
        let transport = HttpTransport::new(&HttpConfig {
            url: format!("http://127.0.0.1:{port}/"),
            api_key: None,
            timeout_secs: 2,
        });

        let err = transport.send(&request()).unwrap_err();
        assert_eq!(err.status, None);
    }
}
