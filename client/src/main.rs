mod bot;
mod game;
mod sync;
mod transport;

use clap::Parser;
use game::{OfflineGame, OnlineSession};
use log::info;
use rand::RngCore;
use shared::entity::{Player, WorldBounds};
use shared::protocol::{PlayerId, Vector2D};
use shared::{DEFAULT_WORLD_HEIGHT, DEFAULT_WORLD_WIDTH};
use std::time::Duration;
use sync::SyncManager;
use transport::Transport;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Server address to connect to; omit to play offline against bots
    #[arg(short = 's', long)]
    server: Option<String>,

    /// Display name
    #[arg(short = 'u', long, default_value = "anonymous")]
    username: String,

    /// Cosmetic skin identifier
    #[arg(long, default_value = "default")]
    skin: String,

    /// Private room id; empty joins the public room
    #[arg(short = 'g', long, default_value = "")]
    game_id: String,

    /// Number of bots in offline mode
    #[arg(short = 'b', long, default_value = "10")]
    bots: usize,

    /// Food pellets maintained in offline mode
    #[arg(long, default_value = "50")]
    food: usize,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();

    if std::env::var("RUST_LOG").is_err() {
        eprintln!("Set RUST_LOG=info for detailed logging");
    }

    let args = Args::parse();
    let bounds = WorldBounds::new(DEFAULT_WORLD_WIDTH, DEFAULT_WORLD_HEIGHT);

    match args.server {
        Some(ref server) => run_online(&args, bounds, server).await,
        None => run_offline(&args, bounds).await,
    }
}

async fn run_online(
    args: &Args,
    bounds: WorldBounds,
    server: &str,
) -> Result<(), Box<dyn std::error::Error>> {
    info!("Connecting to {} as {}", server, args.username);

    let mut identity = [0u8; 16];
    rand::thread_rng().fill_bytes(&mut identity);

    let sync = SyncManager::new(
        bounds,
        PlayerId(identity),
        args.username.clone(),
        args.skin.clone(),
        0xffffff,
        args.game_id.clone(),
    );
    let transport = Transport::new(server);

    let mut session = OnlineSession::new(transport, sync, true);
    session.run().await?;

    info!("Session over ({:?})", session.state());
    Ok(())
}

async fn run_offline(args: &Args, bounds: WorldBounds) -> Result<(), Box<dyn std::error::Error>> {
    info!(
        "Offline game: {} bots, {} food pellets",
        args.bots, args.food
    );

    let player = Player::new(
        Vector2D::new(bounds.width / 2.0, bounds.height / 2.0),
        30.0,
        0xffffff,
        args.username.clone(),
        args.skin.clone(),
    );
    let mut game = OfflineGame::new(bounds, player, args.bots, args.food);

    let mut tick = tokio::time::interval(Duration::from_millis(16));
    while game.player_alive() && !game.bots.is_empty() {
        tick.tick().await;
        game.tick();
    }

    if game.player_alive() {
        info!("You win: last circle standing, radius {}", game.player.body.radius);
    } else {
        info!("Eaten. Better luck next time");
    }
    Ok(())
}
