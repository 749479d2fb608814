use clap::Parser;
use log::info;
use server::collaborators::PhaseDurations;
use server::config::GameConfig;
use server::network::Server;
use std::time::Duration;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Server IP address to bind to
    #[arg(short = 'H', long, default_value = "127.0.0.1")]
    host: String,

    /// Server port to listen on
    #[arg(short, long, default_value = "8080")]
    port: u16,

    /// Tick rate (updates per second)
    #[arg(short, long, default_value_t = shared::TICK_RATE)]
    tick_rate: u32,

    /// Maximum number of connected clients
    #[arg(short, long, default_value = "16")]
    max_clients: usize,

    /// Length of the build phase in seconds
    #[arg(long, default_value = "60")]
    build_secs: f32,

    /// Length of the combat phase in seconds
    #[arg(long, default_value = "180")]
    combat_secs: f32,

    /// Length of the round-end phase in seconds
    #[arg(long, default_value = "10")]
    round_end_secs: f32,

    /// Drop rejected requests without telling the requester
    #[arg(long)]
    quiet_rejections: bool,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();

    if std::env::var("RUST_LOG").is_err() {
        eprintln!("Set RUST_LOG=info for detailed logging");
    }

    let args = Args::parse();

    let config = GameConfig {
        phases: PhaseDurations {
            build: args.build_secs,
            combat: args.combat_secs,
            round_end: args.round_end_secs,
        },
        quiet_rejections: args.quiet_rejections,
        ..GameConfig::default()
    };

    let address = format!("{}:{}", args.host, args.port);
    let tick_duration = Duration::from_secs_f64(1.0 / f64::from(args.tick_rate.max(1)));

    info!("Starting server on {}", address);
    info!(
        "Tick rate {}Hz, up to {} clients, phases {:.0}s/{:.0}s/{:.0}s",
        args.tick_rate, args.max_clients, args.build_secs, args.combat_secs, args.round_end_secs
    );
    if args.quiet_rejections {
        info!("Rejected requests will not be reported to clients");
    }

    let mut server = Server::new(&address, tick_duration, args.max_clients, config).await?;
    server.run().await?;

    Ok(())
}
