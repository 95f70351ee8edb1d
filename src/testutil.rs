// testutil.rs
//
// In-memory stand-ins for the bus, the Wi-Fi link and the HTTP transport.

use std::collections::VecDeque;

use embedded_hal::{
    delay::DelayNs,
    i2c::{self, ErrorKind, I2c, NoAcknowledgeSource, Operation},
};

use crate::*;

#[derive(Debug, Default)]
pub struct FakeI2c {
    pub responses: VecDeque<Result<Vec<u8>, ErrorKind>>,
    pub writes: Vec<(u8, Vec<u8>)>,
    pub reads: Vec<(u8, usize)>,
}

impl FakeI2c {
    pub fn with_responses<I>(responses: I) -> Self
    where
        I: IntoIterator<Item = Result<Vec<u8>, ErrorKind>>,
    {
        Self {
            responses: responses.into_iter().collect(),
            ..Default::default()
        }
    }
}

impl i2c::ErrorType for FakeI2c {
    type Error = ErrorKind;
}

impl I2c for FakeI2c {
    fn transaction(
        &mut self,
        address: u8,
        operations: &mut [Operation<'_>],
    ) -> Result<(), Self::Error> {
        for op in operations {
            match op {
                Operation::Write(bytes) => self.writes.push((address, bytes.to_vec())),
                Operation::Read(buf) => {
                    self.reads.push((address, buf.len()));
                    // a short answer looks like a NACK to the master
                    match self.responses.pop_front() {
                        Some(Ok(data)) if data.len() == buf.len() => buf.copy_from_slice(&data),
                        Some(Err(e)) => return Err(e),
                        _ => return Err(ErrorKind::NoAcknowledge(NoAcknowledgeSource::Data)),
                    }
                }
            }
        }
        Ok(())
    }
}

#[derive(Debug, Default)]
pub struct FakeDelay {
    pub delays_ns: Vec<u64>,
}

impl FakeDelay {
    pub fn delays_ms(&self) -> Vec<u64> {
        self.delays_ns.iter().map(|ns| ns / 1_000_000).collect()
    }
}

impl DelayNs for FakeDelay {
    fn delay_ns(&mut self, ns: u32) {
        self.delays_ns.push(u64::from(ns));
    }

    fn delay_us(&mut self, us: u32) {
        self.delays_ns.push(u64::from(us) * 1_000);
    }

    fn delay_ms(&mut self, ms: u32) {
        self.delays_ns.push(u64::from(ms) * 1_000_000);
    }
}

#[derive(Debug)]
pub struct FakeLink {
    pub up: VecDeque<bool>,
    pub fallback: bool,
    pub begin_calls: u32,
    pub is_up_calls: u32,
    pub info_calls: u32,
    pub last_credentials: Option<(String, String)>,
}

impl FakeLink {
    pub fn always(up: bool) -> Self {
        Self::scripted([], up)
    }

    pub fn scripted<I: IntoIterator<Item = bool>>(up: I, fallback: bool) -> Self {
        Self {
            up: up.into_iter().collect(),
            fallback,
            begin_calls: 0,
            is_up_calls: 0,
            info_calls: 0,
            last_credentials: None,
        }
    }

    pub fn calls(&self) -> u32 {
        self.begin_calls + self.is_up_calls + self.info_calls
    }
}

impl WifiLink for FakeLink {
    fn begin(&mut self, ssid: &str, pass: &str) -> anyhow::Result<()> {
        self.begin_calls += 1;
        self.last_credentials = Some((ssid.into(), pass.into()));
        Ok(())
    }

    fn is_up(&mut self) -> bool {
        self.is_up_calls += 1;
        self.up.pop_front().unwrap_or(self.fallback)
    }

    fn link_info(&mut self) -> anyhow::Result<LinkInfo> {
        self.info_calls += 1;
        Ok(LinkInfo {
            ip: std::net::Ipv4Addr::new(192, 168, 1, 50),
            rssi: -61,
        })
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RecordedRequest {
    pub method: &'static str,
    pub url: String,
    pub headers: Vec<(String, String)>,
    pub body: String,
    pub timeouts: HttpTimeouts,
}

#[derive(Debug, Default)]
pub struct FakeTransport {
    pub responses: VecDeque<anyhow::Result<HttpResponse>>,
    pub requests: Vec<RecordedRequest>,
}

impl FakeTransport {
    pub fn with_responses<I>(responses: I) -> Self
    where
        I: IntoIterator<Item = anyhow::Result<HttpResponse>>,
    {
        Self {
            responses: responses.into_iter().collect(),
            requests: Vec::new(),
        }
    }

    fn next(&mut self) -> anyhow::Result<HttpResponse> {
        self.responses
            .pop_front()
            .unwrap_or_else(|| Ok(HttpResponse::new(201, "")))
    }
}

impl HttpTransport for FakeTransport {
    fn post(
        &mut self,
        url: &str,
        headers: &[(&str, &str)],
        body: &[u8],
        timeouts: &HttpTimeouts,
    ) -> anyhow::Result<HttpResponse> {
        self.requests.push(RecordedRequest {
            method: "POST",
            url: url.into(),
            headers: headers
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
            body: String::from_utf8_lossy(body).into_owned(),
            timeouts: *timeouts,
        });
        self.next()
    }

    fn get(&mut self, url: &str, timeouts: &HttpTimeouts) -> anyhow::Result<HttpResponse> {
        self.requests.push(RecordedRequest {
            method: "GET",
            url: url.into(),
            headers: Vec::new(),
            body: String::new(),
            timeouts: *timeouts,
        });
        self.next()
    }
}

/// Hands out pre-baked sensor results; `None` means a failed acquisition.
#[derive(Debug, Default)]
pub struct ScriptedSource {
    pub script: VecDeque<Option<(f32, f32)>>,
    pub reads: u32,
}

impl ScriptedSource {
    pub fn new<I: IntoIterator<Item = Option<(f32, f32)>>>(script: I) -> Self {
        Self {
            script: script.into_iter().collect(),
            reads: 0,
        }
    }
}

impl ReadingSource for ScriptedSource {
    type Error = String;

    fn read(&mut self) -> Result<Reading, Self::Error> {
        self.reads += 1;
        self.script
            .pop_front()
            .flatten()
            .and_then(|(t, h)| Reading::new(t, h))
            .ok_or_else(|| "no data".to_string())
    }
}

// EOF
