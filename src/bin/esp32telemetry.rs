// bin/esp32telemetry.rs

#![warn(clippy::large_futures)]

#[cfg(target_os = "espidf")]
esp_idf_sys::esp_app_desc!();

#[cfg(target_os = "espidf")]
fn main() -> anyhow::Result<()> {
    use esp32telemetry::*;
    use esp_idf_hal::{
        delay::FreeRtos,
        gpio::IOPin,
        i2c::{I2cConfig, I2cDriver},
        prelude::*,
    };
    use esp_idf_svc::{eventloop::EspSystemEventLoop, nvs};

    esp_idf_sys::link_patches();
    esp_idf_svc::log::EspLogger::initialize_default();

    info!("Hello.");
    info!("Starting up.");

    let config = TelemetryConfig::default();
    info!("My config:\n{config:#?}");

    let sysloop = EspSystemEventLoop::take()?;
    let nvs_default_partition = nvs::EspDefaultNvsPartition::take()?;

    let peripherals = Peripherals::take()?;
    let pins = peripherals.pins;

    #[cfg(feature = "esp32c3")]
    let (sda, scl) = (pins.gpio5.downgrade(), pins.gpio6.downgrade());

    #[cfg(feature = "esp32s")]
    let (sda, scl) = (pins.gpio21.downgrade(), pins.gpio22.downgrade());

    info!("Initializing sensor bus...");
    let i2c = I2cDriver::new(
        peripherals.i2c0,
        sda,
        scl,
        &I2cConfig::new().baudrate(100.kHz().into()),
    )?;
    let sensor = Sht21::new(i2c, FreeRtos, &config);

    let link = EspWifiLink::new(peripherals.modem, sysloop, nvs_default_partition)?;
    let agent = TelemetryLoop::new(
        sensor,
        WifiManager::new(link, &config),
        TelemetryPublisher::new(EspHttpTransport, &config),
        &config,
    );

    info!("Entering main loop...");
    tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()?
        .block_on(Box::pin(agent.run()))
}

#[cfg(not(target_os = "espidf"))]
fn main() {
    eprintln!("esp32telemetry runs on ESP-IDF targets only.");
}

// EOF
