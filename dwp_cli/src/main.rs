mod cli;
mod logging;
mod source;
mod store;

use clap::Parser;
use cli::{Cli, Commands};
use dwp_config::{Config, Device};
use dwp_core::mocks::NoopReader;
use dwp_core::{Poller, run_event_loop, spawn_device_workers};
use dwp_modbus::{SimulatedPress, TcpReader};
use dwp_traits::RegisterReader;
use eyre::{Result, WrapErr};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

fn main() -> Result<()> {
    color_eyre::install()?;
    let args = Cli::parse();

    let text = std::fs::read_to_string(&args.config)
        .wrap_err_with(|| format!("failed to read config {}", args.config.display()))?;
    let cfg = dwp_config::load_toml(&text).wrap_err("failed to parse config")?;
    cfg.validate()?;

    match args.cmd {
        Commands::Check => run_check(&cfg),
        Commands::Run {
            out,
            simulate,
            workers,
        } => {
            logging::init(&cfg.logging, args.json, args.log_level.as_deref());
            run_daemon(&args.config, cfg, &out, simulate, workers)
        }
    }
}

fn run_check(cfg: &Config) -> Result<()> {
    println!("config ok: {} device(s)", cfg.devices.len());
    for device in &cfg.devices {
        println!("  {} @ {}", device.name, device.address);
        for line in &device.lines {
            println!(
                "    line {}: {} machine(s)",
                line.line_id(),
                line.machines.len()
            );
        }
    }
    Ok(())
}

fn make_reader(simulate: bool) -> Box<dyn RegisterReader + Send> {
    if simulate {
        Box::new(SimulatedPress::new())
    } else {
        Box::new(TcpReader::new())
    }
}

fn run_daemon(
    config_path: &Path,
    cfg: Config,
    out: &PathBuf,
    simulate: bool,
    workers: bool,
) -> Result<()> {
    let shutdown = Arc::new(AtomicBool::new(false));
    let flag = shutdown.clone();
    ctrlc::set_handler(move || {
        flag.store(true, Ordering::Relaxed);
    })
    .wrap_err("failed to install signal handler")?;

    let store = store::JsonlStore::open(out);
    let devices_source = source::FileDevices::new(config_path);
    tracing::info!(
        config = %config_path.display(),
        out = %out.display(),
        simulate,
        workers,
        "dwp starting"
    );

    if workers {
        let devices = cfg.devices.clone();
        let timeout = Duration::from_secs(cfg.polling.read_timeout_secs);
        let interval = Duration::from_secs(cfg.polling.tick_interval_secs);
        let unit_id = cfg.polling.unit_id;
        let (worker_handles, rx) = spawn_device_workers(
            &devices,
            unit_id,
            timeout,
            interval,
            |_device: &Device| make_reader(simulate),
        );
        let mut poller = Poller::new(
            NoopReader,
            store,
            devices_source,
            None,
            cfg.polling,
            cfg.detector,
            cfg.quality,
            cfg.maintenance,
            None,
        )?;
        run_event_loop(&mut poller, &rx, &shutdown)?;
        drop(worker_handles);
    } else {
        let mut poller = Poller::new(
            make_reader(simulate),
            store,
            devices_source,
            None,
            cfg.polling,
            cfg.detector,
            cfg.quality,
            cfg.maintenance,
            None,
        )?;
        poller.run(&shutdown)?;
    }
    Ok(())
}
