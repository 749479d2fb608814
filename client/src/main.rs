use clap::Parser;
use client::network::Client;
use log::info;
use shared::{Role, Team};
use std::time::Duration;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Server address to connect to
    #[arg(short = 's', long, default_value = "127.0.0.1:8080")]
    server: String,

    /// Role to play: builder, guardian, ranger or saboteur
    #[arg(short = 'r', long, default_value = "saboteur")]
    role: Role,

    /// Team to join: a or b
    #[arg(short = 't', long, default_value = "a")]
    team: Team,

    /// Local tick rate (updates per second)
    #[arg(long, default_value_t = shared::TICK_RATE)]
    tick_rate: u32,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();

    if std::env::var("RUST_LOG").is_err() {
        eprintln!("Set RUST_LOG=info for detailed logging");
    }

    let args = Args::parse();

    info!("Starting client...");
    info!("Connecting to: {}", args.server);
    info!("Commands: ability, sabotage, cancel, move <x> <y>, status, quit");

    let tick_duration = Duration::from_secs_f64(1.0 / f64::from(args.tick_rate.max(1)));
    let mut client = Client::new(&args.server, args.role, args.team, tick_duration).await?;

    client.run().await?;

    Ok(())
}
