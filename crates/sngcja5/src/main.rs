//! SN-GCJA5 Monitor - prints buffered measurements until interrupted

use anyhow::Context;
use sngcja5::config::MonitorConfig;
use sngcja5::{init_logging, Sngcja5};
use tracing::{info, warn};

#[cfg(target_os = "linux")]
fn open_sensor(config: &MonitorConfig) -> anyhow::Result<Sngcja5> {
    Sngcja5::open(config.bus, config.sampler.clone())
        .with_context(|| format!("opening SN-GCJA5 on I2C bus {}", config.bus))
}

#[cfg(not(target_os = "linux"))]
fn open_sensor(_config: &MonitorConfig) -> anyhow::Result<Sngcja5> {
    anyhow::bail!("I2C access is only supported on Linux")
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_logging()?;

    let config_path = std::env::args().nth(1);
    let config = MonitorConfig::load(config_path.as_deref()).context("loading configuration")?;

    info!("=== SN-GCJA5 Monitor v{} ===", env!("CARGO_PKG_VERSION"));
    let sensor = open_sensor(&config)?;

    let mut ticker = tokio::time::interval(config.poll_interval());
    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                match sensor.get_measurement() {
                    Some(measurement) => println!("{}", serde_json::to_string(&measurement)?),
                    None => println!("no data yet"),
                }

                if !sensor.is_sampling() && sensor.buffered() == 0 {
                    warn!("Sampler stopped, exiting");
                    break;
                }
            }
            _ = &mut ctrl_c => {
                info!("Interrupted");
                break;
            }
        }
    }

    // Joining may wait for an in-flight bus read
    tokio::task::spawn_blocking(move || sensor.shutdown()).await?;
    Ok(())
}
