use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use clap::{Args, Parser, Subcommand};

use position_relay::client::simulator::{self, Drone};
use position_relay::client::{ClientConfig, RelayPublisher, RelaySubscriber};
use position_relay::config::{Config, LogConfig};
use position_relay::error::Result;
use position_relay::relay::Relay;
use position_relay::router::{Topic, TopicFilter};
use position_relay::server::RelayServer;

#[derive(Parser)]
#[command(name = "position-relay", version, about = "Topic-based position telemetry relay")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the relay
    Serve(ServeArgs),
    /// Publish a simulated drone's position
    Simulate(SimulateArgs),
    /// Print every record matching a filter
    Tail(TailArgs),
}

#[derive(Args, Clone, Debug)]
struct ServeArgs {
    /// Path to a TOML config file
    #[arg(long, env = "RELAY_CONFIG")]
    config: Option<PathBuf>,

    /// Listen address, overrides the config file
    #[arg(long, env = "RELAY_BIND")]
    bind: Option<SocketAddr>,

    /// Per-subscriber queue capacity, overrides the config file
    #[arg(long, env = "RELAY_QUEUE_CAPACITY")]
    queue_capacity: Option<usize>,

    /// Drain wait in milliseconds, overrides the config file
    #[arg(long, env = "RELAY_DRAIN_TIMEOUT_MS")]
    drain_timeout_ms: Option<u64>,
}

#[derive(Args, Clone, Debug)]
struct SimulateArgs {
    /// Relay address
    #[arg(long, default_value = "127.0.0.1:1883", env = "RELAY_ADDR")]
    relay: String,

    /// Drone identifier
    #[arg(long, env = "UUID")]
    uuid: String,

    /// Drone display name
    #[arg(long, env = "NAME")]
    name: String,

    /// Topic to publish on
    #[arg(long, default_value = simulator::DEFAULT_TOPIC)]
    topic: String,

    /// Seconds between positions
    #[arg(long, default_value_t = simulator::DEFAULT_INTERVAL.as_secs())]
    interval_secs: u64,
}

#[derive(Args, Clone, Debug)]
struct TailArgs {
    /// Relay address
    #[arg(long, default_value = "127.0.0.1:1883", env = "RELAY_ADDR")]
    relay: String,

    /// Topic filter, `#` as the last segment matches everything below
    #[arg(default_value = "drone/#")]
    filter: String,

    /// Seconds between keepalive pings
    #[arg(long, default_value_t = 60)]
    keepalive_secs: u64,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    let result = match cli.command {
        Commands::Serve(args) => serve(args).await,
        Commands::Simulate(args) => simulate(args).await,
        Commands::Tail(args) => tail(args).await,
    };
    if let Err(e) = result {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}

async fn serve(args: ServeArgs) -> Result<()> {
    let mut config = Config::load_or_default(args.config.as_deref())?;
    if let Some(bind) = args.bind {
        config.server.bind = bind;
    }
    if let Some(capacity) = args.queue_capacity {
        config.registry.queue_capacity = capacity;
    }
    if let Some(ms) = args.drain_timeout_ms {
        config.registry.drain_timeout_ms = ms;
    }
    config.validate()?;
    config.log.init()?;

    let relay = Arc::new(Relay::with_config(config.relay_config()));
    let server = RelayServer::new(config.server_config(), relay);
    server.run_until(shutdown_signal()).await
}

async fn simulate(args: SimulateArgs) -> Result<()> {
    LogConfig::default().init()?;

    let topic = Topic::new(args.topic)?;
    let mut publisher = RelayPublisher::connect(ClientConfig::new(args.relay)).await?;
    let drone = Drone::at_default_position(args.uuid, args.name);

    tracing::info!(
        publisher = %drone.publisher_id(),
        name = %drone.name(),
        topic = %topic,
        "Drone simulator started"
    );

    let interval = Duration::from_secs(args.interval_secs.max(1));
    drone
        .run(&mut publisher, &topic, interval, shutdown_signal())
        .await
}

async fn tail(args: TailArgs) -> Result<()> {
    LogConfig::default().init()?;

    let filter = TopicFilter::new(args.filter)?;
    let mut subscriber = RelaySubscriber::connect(ClientConfig::new(args.relay)).await?;
    subscriber.subscribe(&filter).await?;

    let mut keepalive = tokio::time::interval(Duration::from_secs(args.keepalive_secs.max(1)));
    keepalive.tick().await;

    let shutdown = shutdown_signal();
    tokio::pin!(shutdown);

    loop {
        tokio::select! {
            _ = &mut shutdown => return Ok(()),
            _ = keepalive.tick() => subscriber.keepalive().await?,
            message = subscriber.next_raw() => match message {
                Some(Ok((topic, payload))) => {
                    println!("{} {}", topic, String::from_utf8_lossy(&payload));
                }
                Some(Err(e)) => return Err(e),
                None => {
                    tracing::info!("Relay closed the connection");
                    return Ok(());
                }
            },
        }
    }
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
}
