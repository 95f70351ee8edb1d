// publish.rs

use serde_json::value::RawValue;

use crate::*;

// enough for the backend's stored-row acknowledgement and error messages
pub const RESPONSE_BODY_LIMIT: usize = 512;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct HttpResponse {
    pub status: u16,
    pub body: String,
}

impl HttpResponse {
    pub fn new(status: u16, body: &str) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }
}

/// One-shot HTTP requests. Implementations open a fresh connection per call
/// and close it afterwards. `Err` means no status line was received.
pub trait HttpTransport {
    fn post(
        &mut self,
        url: &str,
        headers: &[(&str, &str)],
        body: &[u8],
        timeouts: &HttpTimeouts,
    ) -> anyhow::Result<HttpResponse>;

    fn get(&mut self, url: &str, timeouts: &HttpTimeouts) -> anyhow::Result<HttpResponse>;
}

/// What happened to one reading.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum DeliveryOutcome {
    /// 2xx from the server.
    Delivered { status: u16, body: String },
    /// The server answered but refused the reading.
    Rejected { status: u16, body: String },
    /// Nothing usable came back from the server.
    TransportFailed { error: String },
}

impl DeliveryOutcome {
    pub fn from_status(resp: HttpResponse) -> Self {
        let HttpResponse { status, body } = resp;
        if (200..300).contains(&status) {
            DeliveryOutcome::Delivered { status, body }
        } else {
            DeliveryOutcome::Rejected { status, body }
        }
    }

    pub fn success(&self) -> bool {
        matches!(self, DeliveryOutcome::Delivered { .. })
    }

    pub fn status_code(&self) -> Option<u16> {
        match self {
            DeliveryOutcome::Delivered { status, .. } | DeliveryOutcome::Rejected { status, .. } => {
                Some(*status)
            }
            DeliveryOutcome::TransportFailed { .. } => None,
        }
    }

    pub fn error_description(&self) -> Option<String> {
        match self {
            DeliveryOutcome::Delivered { .. } => None,
            DeliveryOutcome::Rejected { status, body } if body.is_empty() => {
                Some(format!("server rejected reading with HTTP {status}"))
            }
            DeliveryOutcome::Rejected { status, body } => {
                Some(format!("server rejected reading with HTTP {status}: {body}"))
            }
            DeliveryOutcome::TransportFailed { error } => Some(error.clone()),
        }
    }
}

#[derive(Serialize)]
struct Payload {
    temperature: Box<RawValue>,
    humidity: Box<RawValue>,
}

// The receiving backend answers a stored reading with the new row.
#[derive(Debug, Deserialize)]
struct StoredAck {
    id: i64,
    #[serde(default)]
    timestamp: Option<String>,
}

fn fixed2(v: f32) -> anyhow::Result<Box<RawValue>> {
    Ok(RawValue::from_string(format!("{v:.2}"))?)
}

/// `{"temperature":T,"humidity":H}` with both values at two decimals.
pub fn payload(reading: &Reading) -> anyhow::Result<String> {
    let p = Payload {
        temperature: fixed2(reading.temperature())?,
        humidity: fixed2(reading.humidity())?,
    };
    Ok(serde_json::to_string(&p)?)
}

pub struct TelemetryPublisher<T> {
    transport: T,
    url: String,
    probe_url: String,
    timeouts: HttpTimeouts,
    probe_timeout: Duration,
}

impl<T: HttpTransport> TelemetryPublisher<T> {
    pub fn new(transport: T, config: &TelemetryConfig) -> Self {
        Self {
            transport,
            url: config.server_url.clone(),
            probe_url: config.probe_url.clone(),
            timeouts: config.http_timeouts,
            probe_timeout: config.probe_timeout,
        }
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// POST one reading. Never retries; the caller decides what a failure means.
    pub fn send(&mut self, reading: &Reading) -> DeliveryOutcome {
        let body = match payload(reading) {
            Ok(b) => b,
            Err(e) => {
                return DeliveryOutcome::TransportFailed {
                    error: format!("cannot encode payload: {e}"),
                }
            }
        };

        info!("HTTP POST {url}", url = self.url);
        info!("HTTP payload: {body}");
        let headers = [
            ("Content-Type", "application/json"),
            ("Connection", "close"),
        ];

        let outcome = match self
            .transport
            .post(&self.url, &headers, body.as_bytes(), &self.timeouts)
        {
            Ok(resp) => DeliveryOutcome::from_status(resp),
            Err(e) => DeliveryOutcome::TransportFailed {
                error: format!("{e:#}"),
            },
        };

        match &outcome {
            DeliveryOutcome::Delivered { status, body } => {
                info!("HTTP response code: {status}");
                match serde_json::from_str::<StoredAck>(body) {
                    Ok(StoredAck { id, timestamp }) => info!(
                        "Server stored reading #{id} at {ts}",
                        ts = timestamp.as_deref().unwrap_or("-")
                    ),
                    Err(_) if !body.is_empty() => info!("Server response: {body}"),
                    Err(_) => {}
                }
            }
            DeliveryOutcome::Rejected { status, body } => {
                error!("HTTP POST rejected, code {status}: {body}");
            }
            DeliveryOutcome::TransportFailed { error } => {
                error!("HTTP POST failed: {error}");
            }
        }
        outcome
    }

    /// One diagnostic GET. The result is only logged.
    pub fn probe(&mut self) -> Option<u16> {
        info!("Checking server availability at {url}", url = self.probe_url);
        let timeouts = HttpTimeouts::uniform(self.probe_timeout);
        match self.transport.get(&self.probe_url, &timeouts) {
            Ok(resp) => {
                info!("Server reachable, code {status}", status = resp.status);
                Some(resp.status)
            }
            Err(e) => {
                warn!("Server unreachable: {e:#}");
                None
            }
        }
    }
}

#[cfg(target_os = "espidf")]
pub use esp::EspHttpTransport;

#[cfg(target_os = "espidf")]
mod esp {
    use embedded_svc::{
        http::{client::Client as HttpClient, Method, Status},
        io::{Read, Write},
    };
    use esp_idf_svc::http::client::{Configuration as HttpConfiguration, EspHttpConnection};

    use super::*;

    /// esp-idf HTTP client, one connection per request.
    #[derive(Default)]
    pub struct EspHttpTransport;

    impl EspHttpTransport {
        fn client(url: &str, timeouts: &HttpTimeouts) -> anyhow::Result<HttpClient<EspHttpConnection>> {
            let conf = HttpConfiguration {
                timeout: Some(timeouts.overall()),
                crt_bundle_attach: if url.starts_with("https://") {
                    Some(esp_idf_sys::esp_crt_bundle_attach)
                } else {
                    None
                },
                ..Default::default()
            };
            Ok(HttpClient::wrap(EspHttpConnection::new(&conf)?))
        }
    }

    fn read_body<R: Read>(resp: &mut R) -> String {
        let mut body = Vec::with_capacity(RESPONSE_BODY_LIMIT);
        let mut chunk = [0u8; 128];
        while body.len() < RESPONSE_BODY_LIMIT {
            match resp.read(&mut chunk) {
                Ok(0) => break,
                Ok(n) => {
                    let take = n.min(RESPONSE_BODY_LIMIT - body.len());
                    body.extend_from_slice(&chunk[..take]);
                }
                Err(e) => {
                    warn!("HTTP body read error: {e:?}");
                    break;
                }
            }
        }
        String::from_utf8_lossy(&body).into_owned()
    }

    impl HttpTransport for EspHttpTransport {
        fn post(
            &mut self,
            url: &str,
            headers: &[(&str, &str)],
            body: &[u8],
            timeouts: &HttpTimeouts,
        ) -> anyhow::Result<HttpResponse> {
            let mut client = Self::client(url, timeouts)?;

            let content_length = body.len().to_string();
            let mut all_headers = headers.to_vec();
            all_headers.push(("Content-Length", content_length.as_str()));

            let mut req = client
                .request(Method::Post, url, &all_headers)
                .map_err(|e| anyhow!("{e:?}"))?;
            req.write_all(body).map_err(|e| anyhow!("{e:?}"))?;
            req.flush().map_err(|e| anyhow!("{e:?}"))?;

            let mut resp = req.submit().map_err(|e| anyhow!("{e:?}"))?;
            let status = resp.status();
            let body = read_body(&mut resp);
            Ok(HttpResponse { status, body })
        }

        fn get(&mut self, url: &str, timeouts: &HttpTimeouts) -> anyhow::Result<HttpResponse> {
            let mut client = Self::client(url, timeouts)?;
            let req = client
                .request(Method::Get, url, &[("Connection", "close")])
                .map_err(|e| anyhow!("{e:?}"))?;
            let mut resp = req.submit().map_err(|e| anyhow!("{e:?}"))?;
            let status = resp.status();
            let body = read_body(&mut resp);
            Ok(HttpResponse { status, body })
        }
    }
}


// EOF
