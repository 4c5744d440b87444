//! Pressgate gateway simulator
//!
//! Runs the full gateway lifecycle on a host with a synthetic pressure
//! line. Published messages are logged unless `--mqtt` points at a broker.
//!
//! ```text
//! RUST_LOG=debug pressgate-sim --device-id gw-0042 --duration-secs 120
//! ```

use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;

use clap::Parser;
use pressgate_connectors::AsyncConnector;
use pressgate_core::Notification;
use pressgate_runtime::sim::{LogConnector, SimulatedNetwork, SimulatedSensor};
use pressgate_runtime::{
    run_gateway, Exit, HealthTransport, NotificationBus, RuntimeConfig, RuntimeError, Supervisor,
    TokioClock,
};

#[derive(Parser, Debug)]
#[command(name = "pressgate-sim", version, about = "Run a simulated Pressgate gateway")]
struct Args {
    /// JSON configuration file; defaults are used for anything missing
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Override the device identifier
    #[arg(long)]
    device_id: Option<String>,

    /// Publish to an MQTT broker instead of logging
    #[cfg(feature = "mqtt")]
    #[arg(long, value_name = "HOST:PORT")]
    mqtt: Option<String>,

    /// Post health checks to this HTTP endpoint
    #[cfg(feature = "http")]
    #[arg(long, value_name = "URL")]
    health_url: Option<String>,

    /// API key sent with HTTP health checks
    #[cfg(feature = "http")]
    #[arg(long, default_value = "")]
    api_key: String,

    /// Stop after this many seconds; 0 runs until interrupted
    #[arg(long, default_value_t = 0)]
    duration_secs: u64,

    /// Inject a sensor bus fault burst every N samples; 0 disables
    #[arg(long, default_value_t = 0)]
    fault_every: u64,

    /// Post FATAL_ERROR this many seconds into each run
    #[arg(long)]
    fatal_after_secs: Option<u64>,

    /// Stop after this many restarts
    #[arg(long, default_value_t = 3)]
    max_restarts: u32,

    /// Noise seed of the synthetic sensor
    #[arg(long, default_value_t = 42)]
    seed: u32,
}

#[tokio::main]
async fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let args = Args::parse();

    match run(args).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            log::error!("{}", e);
            ExitCode::FAILURE
        }
    }
}

async fn run(args: Args) -> Result<(), RuntimeError> {
    let mut config = match &args.config {
        Some(path) => RuntimeConfig::load(path)?,
        None => RuntimeConfig::default(),
    };
    if let Some(id) = &args.device_id {
        config.payload.device_id = id.clone();
    }
    config.validate()?;

    let lifecycle = async {
        let mut restarts = 0;
        loop {
            match run_once(&args, &config).await? {
                Exit::Restart if restarts >= args.max_restarts => {
                    log::warn!("restart limit of {} reached", args.max_restarts);
                    return Ok::<(), RuntimeError>(());
                }
                Exit::Restart => {
                    restarts += 1;
                    log::warn!("restarting gateway ({} of {})", restarts, args.max_restarts);
                }
            }
        }
    };

    if args.duration_secs == 0 {
        return lifecycle.await;
    }
    match tokio::time::timeout(Duration::from_secs(args.duration_secs), lifecycle).await {
        Ok(result) => result,
        Err(_) => {
            log::info!("simulation finished after {} s", args.duration_secs);
            Ok(())
        }
    }
}

async fn run_once(args: &Args, config: &RuntimeConfig) -> Result<Exit, RuntimeError> {
    let bus = NotificationBus::new();
    let supervisor = Supervisor::new(config.supervisor, bus.clone())?;
    let health = health_transport(args, config)?;

    #[cfg(feature = "mqtt")]
    if let Some(addr) = &args.mqtt {
        let mqtt = mqtt_config(addr, config)?;
        let (connector, driver) = pressgate_connectors::MqttConnector::new(&mqtt)?;
        let network = SimulatedNetwork { report_transport: false, ..SimulatedNetwork::default() };

        return tokio::select! {
            exit = session(args, config, &supervisor, connector, network, health) => exit,
            () = driver.run(bus.clone()) => Ok(Exit::Restart),
        };
    }

    let network = SimulatedNetwork::default();
    session(args, config, &supervisor, LogConnector::new(), network, health).await
}

async fn session<T: AsyncConnector>(
    args: &Args,
    config: &RuntimeConfig,
    supervisor: &Supervisor,
    transport: T,
    network: SimulatedNetwork,
    health: HealthTransport,
) -> Result<Exit, RuntimeError> {
    let sensor = SimulatedSensor::new(args.seed).with_fault_every(args.fault_every);
    let gateway = run_gateway(config, supervisor, TokioClock::start(), sensor, transport, health);

    let fatal = async {
        if let Some(secs) = args.fatal_after_secs {
            tokio::time::sleep(Duration::from_secs(secs)).await;
            log::warn!("injecting FATAL_ERROR");
            supervisor.bus().post(Notification::FATAL_ERROR);
        }
        std::future::pending::<()>().await
    };

    tokio::select! {
        exit = gateway => exit,
        () = network.run(supervisor) => Ok(Exit::Restart),
        () = fatal => Ok(Exit::Restart),
    }
}

#[cfg(feature = "mqtt")]
fn mqtt_config(
    addr: &str,
    config: &RuntimeConfig,
) -> Result<pressgate_connectors::MqttConfig, RuntimeError> {
    use pressgate_connectors::{ConnectorError, MqttConfig};

    let (host, port) = match addr.rsplit_once(':') {
        Some((host, port)) => {
            let port = port
                .parse()
                .map_err(|_| ConnectorError::ConfigError(format!("bad port in {}", addr)))?;
            (host, port)
        }
        None => (addr, 1883),
    };
    Ok(MqttConfig::new(host, port).client_id(config.payload.device_id.clone()))
}

#[cfg(feature = "http")]
fn health_transport(args: &Args, config: &RuntimeConfig) -> Result<HealthTransport, RuntimeError> {
    use pressgate_connectors::{ConnectorError, HttpConfig, HttpSender};

    let Some(url) = &args.health_url else {
        return Ok(None);
    };
    let http = HttpConfig::new(url.clone()).api_key(args.api_key.clone());
    let sender =
        HttpSender::new(http, config.payload.device_id.clone()).map_err(ConnectorError::from)?;
    Ok(Some(Box::new(sender)))
}

#[cfg(not(feature = "http"))]
fn health_transport(
    _args: &Args,
    _config: &RuntimeConfig,
) -> Result<HealthTransport, RuntimeError> {
    Ok(None)
}
