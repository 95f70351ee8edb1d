// config.rs

use std::fmt;

use crate::*;

const DEFAULT_SENSOR_ADDR: u8 = 0x40;
const DEFAULT_POLL_DELAY: u64 = 30;
const DEFAULT_RECONNECT_DELAY: u64 = 2;
const DEFAULT_WIFI_POLL_INTERVAL: u64 = 1;
const DEFAULT_WIFI_ATTEMPTS: u32 = 30;
const DEFAULT_HTTP_TIMEOUT: u64 = 10;
const DEFAULT_PROBE_TIMEOUT: u64 = 5;

const DEFAULT_SERVER_URL: &str = "http://192.168.1.10:3000/data";

/// Per-request HTTP deadlines.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct HttpTimeouts {
    pub connect: Duration,
    pub response: Duration,
}

impl HttpTimeouts {
    pub fn uniform(t: Duration) -> Self {
        Self {
            connect: t,
            response: t,
        }
    }

    /// The stricter single deadline for transports that only take one.
    pub fn overall(&self) -> Duration {
        self.connect.max(self.response)
    }
}

/// Everything the agent needs, fixed at build time.
///
/// `build.rs` forwards `WIFI_SSID`, `WIFI_PASS`, `SERVER_URL` and the optional
/// `PROBE_URL` from the build environment; anything unset falls back to a
/// placeholder. Tests build their own instances with struct update syntax.
#[derive(Clone)]
pub struct TelemetryConfig {
    pub wifi_ssid: String,
    pub wifi_pass: String,
    pub wifi_poll_interval: Duration,
    pub wifi_max_attempts: u32,

    pub server_url: String,
    pub probe_url: String,
    pub http_timeouts: HttpTimeouts,
    pub probe_timeout: Duration,

    pub sensor_addr: u8,
    pub verify_crc: bool,

    pub poll_delay: Duration,
    pub reconnect_delay: Duration,
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        let server_url: String = option_env!("SERVER_URL")
            .unwrap_or(DEFAULT_SERVER_URL)
            .into();
        let probe_url = option_env!("PROBE_URL")
            .map(String::from)
            .unwrap_or_else(|| server_url.clone());

        Self {
            wifi_ssid: option_env!("WIFI_SSID").unwrap_or("internet").into(),
            wifi_pass: option_env!("WIFI_PASS").unwrap_or("password").into(),
            wifi_poll_interval: Duration::from_secs(DEFAULT_WIFI_POLL_INTERVAL),
            wifi_max_attempts: DEFAULT_WIFI_ATTEMPTS,

            server_url,
            probe_url,
            http_timeouts: HttpTimeouts::uniform(Duration::from_secs(DEFAULT_HTTP_TIMEOUT)),
            probe_timeout: Duration::from_secs(DEFAULT_PROBE_TIMEOUT),

            sensor_addr: DEFAULT_SENSOR_ADDR,
            verify_crc: false,

            poll_delay: Duration::from_secs(DEFAULT_POLL_DELAY),
            reconnect_delay: Duration::from_secs(DEFAULT_RECONNECT_DELAY),
        }
    }
}

impl fmt::Debug for TelemetryConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TelemetryConfig")
            .field("wifi_ssid", &self.wifi_ssid)
            .field("wifi_pass", &"********")
            .field("wifi_poll_interval", &self.wifi_poll_interval)
            .field("wifi_max_attempts", &self.wifi_max_attempts)
            .field("server_url", &self.server_url)
            .field("probe_url", &self.probe_url)
            .field("http_timeouts", &self.http_timeouts)
            .field("probe_timeout", &self.probe_timeout)
            .field("sensor_addr", &format_args!("{:#04x}", self.sensor_addr))
            .field("verify_crc", &self.verify_crc)
            .field("poll_delay", &self.poll_delay)
            .field("reconnect_delay", &self.reconnect_delay)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_firmware_cadence() {
        let c = TelemetryConfig::default();
        assert_eq!(c.sensor_addr, 0x40);
        assert_eq!(c.poll_delay, Duration::from_secs(30));
        assert_eq!(c.reconnect_delay, Duration::from_secs(2));
        assert_eq!(c.wifi_poll_interval, Duration::from_secs(1));
        assert_eq!(c.wifi_max_attempts, 30);
        assert_eq!(c.http_timeouts.connect, Duration::from_secs(10));
        assert_eq!(c.http_timeouts.response, Duration::from_secs(10));
        assert_eq!(c.probe_timeout, Duration::from_secs(5));
        assert!(!c.verify_crc);
    }

    #[test]
    fn debug_output_hides_passphrase() {
        let c = TelemetryConfig {
            wifi_pass: "hunter2".into(),
            ..Default::default()
        };
        let dbg = format!("{c:?}");
        assert!(!dbg.contains("hunter2"));
        assert!(dbg.contains("0x40"));
    }

    #[test]
    fn overall_timeout_is_the_longer_one() {
        let t = HttpTimeouts {
            connect: Duration::from_secs(3),
            response: Duration::from_secs(10),
        };
        assert_eq!(t.overall(), Duration::from_secs(10));
    }
}

// EOF
