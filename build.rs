// build.rs

use std::env;

fn main() -> anyhow::Result<()> {
    // Necessary because of this issue: https://github.com/rust-lang/cargo/issues/9641
    // see also https://github.com/rust-lang/cargo/issues/9554
    if env::var("CARGO_CFG_TARGET_OS").as_deref() == Ok("espidf") {
        embuild::build::CfgArgs::output_propagated("ESP_IDF")?;
        embuild::build::LinkArgs::output_propagated("ESP_IDF")?;
    }

    for var in ["WIFI_SSID", "WIFI_PASS", "SERVER_URL", "PROBE_URL"] {
        println!("cargo:rerun-if-env-changed={var}");
    }

    let wifi_ssid = env::var("WIFI_SSID").unwrap_or_else(|_| "internet".into());
    let wifi_pass = env::var("WIFI_PASS").unwrap_or_else(|_| "password".into());
    let server_url =
        env::var("SERVER_URL").unwrap_or_else(|_| "http://192.168.1.10:3000/data".into());

    println!("cargo:rustc-env=WIFI_SSID={wifi_ssid}");
    println!("cargo:rustc-env=WIFI_PASS={wifi_pass}");
    println!("cargo:rustc-env=SERVER_URL={server_url}");

    // the probe falls back to SERVER_URL at runtime when this is unset
    if let Ok(probe_url) = env::var("PROBE_URL") {
        println!("cargo:rustc-env=PROBE_URL={probe_url}");
    }

    Ok(())
}

// EOF
