/*
 *  main.rs
 *
 *  InkStat - e-paper room status panel
 *  (c) 2020-26 Stuart Hunter
 *
 *  This program is free software: you can redistribute it and/or modify
 *  it under the terms of the GNU General Public License as published by
 *  the Free Software Foundation, either version 3 of the License, or
 *  (at your option) any later version.
 *
 *  This program is distributed in the hope that it will be useful,
 *  but WITHOUT ANY WARRANTY; without even the implied warranty of
 *  MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
 *  GNU General Public License for more details.
 *
 *  See <http://www.gnu.org/licenses/> to get a copy of the GNU General
 *  Public License.
 *
 */

use anyhow::{Context, Result};
use chrono::Local;
use clap::Parser;
use env_logger::Env;
use log::{debug, error, info, warn};

#[cfg(unix)]
use tokio::signal::unix::{signal, Signal, SignalKind};

use inkstat::config::{self, Cli, Config, DeviceKind};
use inkstat::display::drivers::{mock::MockDevice, preview::PreviewDevice};
use inkstat::display::{
    BoxedDevice, CardRenderer, FailureKind, LayoutConfig, TickAction, TickReport, UpdateController,
};
use inkstat::sensors::{JsonFileSensors, SensorSource, StaticSensors};

include!(concat!(env!("OUT_DIR"), "/build_info.rs"));

fn build_sensors(cfg: &Config) -> Box<dyn SensorSource> {
    let rooms = cfg.rooms();
    match cfg.sensors_file() {
        Some(path) => {
            info!("Room readings from {}", path.display());
            Box::new(JsonFileSensors::new(path, rooms))
        }
        None => {
            info!("Room readings from config ({} rooms)", rooms.len());
            Box::new(StaticSensors::new(rooms))
        }
    }
}

fn build_device(cfg: &Config, layout: &LayoutConfig) -> Result<BoxedDevice> {
    let caps = cfg.device_capabilities(layout);
    let device: BoxedDevice = match cfg.device() {
        DeviceKind::Mock => {
            info!("Using mock display {}x{}", caps.width, caps.height);
            Box::new(MockDevice::with_capabilities(caps))
        }
        DeviceKind::Preview => {
            let dir = cfg
                .preview_dir()
                .context("preview device selected without a preview_dir")?;
            Box::new(PreviewDevice::new(dir, caps))
        }
    };
    Ok(device)
}

fn log_report(report: &TickReport) {
    match report.action {
        TickAction::Unchanged => debug!("No change"),
        TickAction::Partial => info!(
            "Partial update: {} region(s) written {:?}",
            report.partial_writes, report.dirty
        ),
        TickAction::Full(reason) => info!("Full refresh ({})", reason),
        TickAction::RenderFailed => warn!("Nothing rendered for {:?}", report.render_failures),
        TickAction::Failed => {}
    }
    if let Some(failure) = report.failure.as_ref() {
        let target = failure
            .region
            .map(|r| r.to_string())
            .unwrap_or_else(|| "panel".to_string());
        match failure.kind {
            FailureKind::Transient => warn!("Write to {} failed: {}", target, failure.error),
            FailureKind::Persistent => error!("Write to {} failing repeatedly: {}", target, failure.error),
        }
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let cfg = config::load(&cli).context("loading configuration")?;

    if cli.dump_config {
        println!("{}", serde_yaml::to_string(&cfg)?);
        return Ok(());
    }

    let level = if cli.debug {
        "debug".to_string()
    } else {
        cfg.log_level.clone().unwrap_or_else(|| "info".to_string())
    };
    env_logger::Builder::from_env(Env::default().default_filter_or(level))
        .format_timestamp_secs()
        .init();

    info!("{} keeps the rooms in view", env!("CARGO_PKG_NAME"));
    info!("v.{} built {}", env!("CARGO_PKG_VERSION"), BUILD_DATE);

    // before the panel is touched: signals during start-up wait for the loop
    let mut signals = ShutdownSignals::install().context("installing signal handlers")?;

    let mut sensors = build_sensors(&cfg);
    let layout = cfg.layout(sensors.room_count());
    let controller_config = cfg.controller();
    let poll_interval = controller_config.poll_interval;
    let device = build_device(&cfg, &layout)?;

    let mut controller = UpdateController::new(device, Box::new(CardRenderer::new()), &layout, controller_config)
        .context("starting the display")?;

    let clock_format = cfg.clock_format().to_string();
    loop {
        let report = controller.poll(&Local::now(), &clock_format, sensors.as_mut());
        log_report(&report);
        if cli.once {
            break;
        }

        tokio::select! {
            _ = tokio::time::sleep(poll_interval) => {}
            _ = signals.recv() => break,
        }
    }

    controller.shutdown();
    info!("Shutdown complete");
    Ok(())
}

/// SIGINT, SIGTERM and SIGHUP streams. Signals that arrive mid-tick are
/// queued until the loop next waits.
#[cfg(unix)]
struct ShutdownSignals {
    sigint: Signal,
    sigterm: Signal,
    sighup: Signal,
}

#[cfg(unix)]
impl ShutdownSignals {
    fn install() -> Result<Self> {
        Ok(Self {
            sigint: signal(SignalKind::interrupt())?,
            sigterm: signal(SignalKind::terminate())?,
            sighup: signal(SignalKind::hangup())?,
        })
    }

    async fn recv(&mut self) {
        tokio::select! {
            _ = self.sigint.recv() => {
                info!("SIGINT received. Initiating graceful shutdown.");
            }
            _ = self.sigterm.recv() => {
                info!("SIGTERM received. Initiating graceful shutdown.");
            }
            _ = self.sighup.recv() => {
                info!("SIGHUP received. Initiating graceful shutdown.");
            }
        }
    }
}

#[cfg(not(unix))]
struct ShutdownSignals {
    ctrl_c: tokio::signal::windows::CtrlC,
}

#[cfg(not(unix))]
impl ShutdownSignals {
    fn install() -> Result<Self> {
        Ok(Self { ctrl_c: tokio::signal::windows::ctrl_c()? })
    }

    async fn recv(&mut self) {
        self.ctrl_c.recv().await;
        info!("Ctrl-C received. Initiating graceful shutdown.");
    }
}
