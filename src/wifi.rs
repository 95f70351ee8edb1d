// wifi.rs

use std::net::Ipv4Addr;

use crate::*;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ConnectionState {
    Disconnected,
    Connecting,
    Connected,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct LinkInfo {
    pub ip: Ipv4Addr,
    /// dBm
    pub rssi: i8,
}

/// The station side of a Wi-Fi stack.
pub trait WifiLink {
    /// Configure credentials and kick off association. Does not wait.
    fn begin(&mut self, ssid: &str, pass: &str) -> anyhow::Result<()>;

    /// Associated and holding an address.
    fn is_up(&mut self) -> bool;

    fn link_info(&mut self) -> anyhow::Result<LinkInfo>;
}

/// Owns the link and its connection state. Link loss is only noticed when
/// somebody calls [`WifiManager::refresh`]; there is no background watcher.
pub struct WifiManager<L> {
    link: L,
    state: ConnectionState,
    ssid: String,
    pass: String,
    poll_interval: Duration,
    max_attempts: u32,
}

impl<L: WifiLink> WifiManager<L> {
    pub fn new(link: L, config: &TelemetryConfig) -> Self {
        Self {
            link,
            state: ConnectionState::Disconnected,
            ssid: config.wifi_ssid.clone(),
            pass: config.wifi_pass.clone(),
            poll_interval: config.wifi_poll_interval,
            max_attempts: config.wifi_max_attempts,
        }
    }

    pub fn state(&self) -> ConnectionState {
        self.state
    }

    pub fn is_connected(&self) -> bool {
        self.state == ConnectionState::Connected
    }

    pub fn link(&self) -> &L {
        &self.link
    }

    /// Poll the link once and drop to `Disconnected` if it went away.
    pub fn refresh(&mut self) -> ConnectionState {
        if self.state == ConnectionState::Connected && !self.link.is_up() {
            warn!("WiFi link lost.");
            self.state = ConnectionState::Disconnected;
        }
        self.state
    }

    /// Returns `true` when the link is up. Gives up after `max_attempts`
    /// polls spaced `poll_interval` apart and leaves the state `Disconnected`.
    pub async fn ensure_connected(&mut self) -> bool {
        if self.state == ConnectionState::Connected {
            return true;
        }

        self.state = ConnectionState::Connecting;
        info!("WiFi connecting to {ssid:?}...", ssid = self.ssid);
        if let Err(e) = self.link.begin(&self.ssid, &self.pass) {
            error!("WiFi association could not start: {e:?}");
            self.state = ConnectionState::Disconnected;
            return false;
        }

        for attempt in 1..=self.max_attempts {
            sleep(self.poll_interval).await;
            if self.link.is_up() {
                self.state = ConnectionState::Connected;
                self.report_link();
                return true;
            }
            debug!("WiFi waiting for association ({attempt}/{max})", max = self.max_attempts);
        }

        error!(
            "WiFi connection failed after {n} attempts.",
            n = self.max_attempts
        );
        self.state = ConnectionState::Disconnected;
        false
    }

    fn report_link(&mut self) {
        match self.link.link_info() {
            Ok(LinkInfo { ip, rssi }) => info!("WiFi connected. IP: {ip}, RSSI: {rssi} dBm"),
            Err(e) => warn!("WiFi connected, but link info unavailable: {e:?}"),
        }
    }
}

#[cfg(target_os = "espidf")]
pub use esp::EspWifiLink;

#[cfg(target_os = "espidf")]
mod esp {
    use embedded_svc::wifi::{ClientConfiguration, Configuration};
    use esp_idf_svc::{
        eventloop::EspSystemEventLoop, hal::modem::Modem, nvs::EspDefaultNvsPartition,
        wifi::EspWifi,
    };
    use esp_idf_sys::esp;

    use super::*;

    pub struct EspWifiLink<'a> {
        wifi: EspWifi<'a>,
    }

    impl<'a> EspWifiLink<'a> {
        pub fn new(
            modem: Modem,
            sysloop: EspSystemEventLoop,
            nvs: EspDefaultNvsPartition,
        ) -> anyhow::Result<Self> {
            info!("Initializing Wi-Fi...");
            let wifi = EspWifi::new(modem, sysloop, Some(nvs))?;

            let mac = wifi.sta_netif().get_mac()?;
            info!(
                "WiFi station MAC {:02X}:{:02X}:{:02X}:{:02X}:{:02X}:{:02X}",
                mac[0], mac[1], mac[2], mac[3], mac[4], mac[5],
            );
            Ok(Self { wifi })
        }
    }

    impl WifiLink for EspWifiLink<'_> {
        fn begin(&mut self, ssid: &str, pass: &str) -> anyhow::Result<()> {
            self.wifi
                .set_configuration(&Configuration::Client(ClientConfiguration {
                    ssid: ssid
                        .try_into()
                        .map_err(|_| anyhow!("SSID too long: {ssid:?}"))?,
                    password: pass
                        .try_into()
                        .map_err(|_| anyhow!("WiFi passphrase too long"))?,
                    ..Default::default()
                }))?;

            if !self.wifi.is_started()? {
                info!("WiFi driver starting...");
                self.wifi.start()?;
            }

            // a previous attempt may still be pending in the driver
            if let Err(e) = self.wifi.connect() {
                warn!("WiFi connect request: {e:?}");
            }
            Ok(())
        }

        fn is_up(&mut self) -> bool {
            self.wifi.is_up().unwrap_or(false)
        }

        fn link_info(&mut self) -> anyhow::Result<LinkInfo> {
            let ip = self.wifi.sta_netif().get_ip_info()?.ip;

            let mut ap = esp_idf_sys::wifi_ap_record_t::default();
            esp!(unsafe { esp_idf_sys::esp_wifi_sta_get_ap_info(&mut ap) })?;

            Ok(LinkInfo { ip, rssi: ap.rssi })
        }
    }
}


// EOF
