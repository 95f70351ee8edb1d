// agent.rs

use std::fmt;

use crate::*;

/// How a single pass through the loop ended.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum CycleOutcome {
    /// No link at the top of the cycle; the sensor was not touched.
    Offline,
    /// The sensor did not produce a reading.
    AcquisitionFailed,
    /// Link dropped between reading and sending; the reading is gone.
    LinkLost,
    Sent(DeliveryOutcome),
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct LoopStats {
    pub cycles: u64,
    pub delivered: u64,
    pub rejected: u64,
    pub transport_failures: u64,
    pub acquisition_failures: u64,
    pub connectivity_failures: u64,
}

impl LoopStats {
    fn record(&mut self, outcome: &CycleOutcome) {
        self.cycles += 1;
        match outcome {
            CycleOutcome::Offline | CycleOutcome::LinkLost => self.connectivity_failures += 1,
            CycleOutcome::AcquisitionFailed => self.acquisition_failures += 1,
            CycleOutcome::Sent(DeliveryOutcome::Delivered { .. }) => self.delivered += 1,
            CycleOutcome::Sent(DeliveryOutcome::Rejected { .. }) => self.rejected += 1,
            CycleOutcome::Sent(DeliveryOutcome::TransportFailed { .. }) => {
                self.transport_failures += 1
            }
        }
    }
}

impl fmt::Display for LoopStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "cycles {} delivered {} rejected {} transport_err {} sensor_err {} offline {}",
            self.cycles,
            self.delivered,
            self.rejected,
            self.transport_failures,
            self.acquisition_failures,
            self.connectivity_failures,
        )
    }
}

/// The whole device: check link, read sensor, publish, sleep. Forever.
pub struct TelemetryLoop<S, L, T> {
    sensor: S,
    wifi: WifiManager<L>,
    publisher: TelemetryPublisher<T>,
    poll_delay: Duration,
    reconnect_delay: Duration,
    stats: LoopStats,
}

impl<S, L, T> TelemetryLoop<S, L, T>
where
    S: ReadingSource,
    L: WifiLink,
    T: HttpTransport,
{
    pub fn new(
        sensor: S,
        wifi: WifiManager<L>,
        publisher: TelemetryPublisher<T>,
        config: &TelemetryConfig,
    ) -> Self {
        Self {
            sensor,
            wifi,
            publisher,
            poll_delay: config.poll_delay,
            reconnect_delay: config.reconnect_delay,
            stats: LoopStats::default(),
        }
    }

    pub fn stats(&self) -> &LoopStats {
        &self.stats
    }

    pub fn sensor(&self) -> &S {
        &self.sensor
    }

    pub fn wifi(&self) -> &WifiManager<L> {
        &self.wifi
    }

    pub fn publisher(&self) -> &TelemetryPublisher<T> {
        &self.publisher
    }

    /// Initial connect plus one reachability probe. Neither gates the loop.
    pub async fn start(&mut self) {
        info!("esp32telemetry v{FW_VERSION} starting up.");
        if self.wifi.ensure_connected().await {
            self.publisher.probe();
        } else {
            warn!("No WiFi at startup, skipping server check.");
        }
        info!("System ready.");
    }

    pub async fn run_cycle(&mut self) -> CycleOutcome {
        let outcome = self.cycle().await;
        self.stats.record(&outcome);
        info!("Stats: {stats}", stats = self.stats);
        outcome
    }

    async fn cycle(&mut self) -> CycleOutcome {
        if self.wifi.refresh() != ConnectionState::Connected {
            warn!("WiFi not connected, reconnecting...");
            self.wifi.ensure_connected().await;
            return CycleOutcome::Offline;
        }

        let reading = match self.sensor.read() {
            Ok(r) => r,
            Err(e) => {
                error!("Sensor read failed: {e}");
                return CycleOutcome::AcquisitionFailed;
            }
        };
        info!(
            "Reading: {reading} at {ts}",
            ts = reading.taken_at().format("%H:%M:%S")
        );

        if self.wifi.refresh() != ConnectionState::Connected {
            warn!("WiFi dropped before send, reconnecting...");
            self.wifi.ensure_connected().await;
            return CycleOutcome::LinkLost;
        }

        CycleOutcome::Sent(self.publisher.send(&reading))
    }

    /// Time to wait after a cycle that ended this way.
    pub fn pause_after(&self, outcome: &CycleOutcome) -> Duration {
        match outcome {
            CycleOutcome::Offline => self.reconnect_delay,
            _ => self.poll_delay,
        }
    }

    pub async fn run(mut self) -> ! {
        self.start().await;
        loop {
            let outcome = self.run_cycle().await;
            sleep(self.pause_after(&outcome)).await;
        }
    }
}


// EOF
