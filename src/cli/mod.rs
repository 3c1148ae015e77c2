use clap::{Parser, Subcommand};
use std::path::PathBuf;

use crate::config;
use crate::domain::{id::MixtapeId, resolve};
use crate::public_endpoint;
use crate::storage::db::millis_to_local_time;
use crate::storage::operations::Store;

#[derive(Parser)]
#[command(name = "tapedeck")]
#[command(version = "0.1")]
#[command(about = "Self-hosted cassette mixtapes for your favorite people")]
pub struct Cli {
    /// Path to the config TOML file
    #[arg(short, long, default_value = "config.toml")]
    pub config: PathBuf,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run the http server hosting the mixtape pages and API
    Serve,
    /// Install (or restore) the default mixtape
    Seed,
    /// List stored mixtapes
    List,
    /// Print one mixtape with its resolved tracks
    Show {
        /// Mixtape id, as it appears in the share link
        #[arg(short, long)]
        id: String,
    },
    /// Check which links would resolve to playable tracks
    Resolve {
        /// Raw links, exactly as a sender would paste them
        urls: Vec<String>,
    },
}

/// Entrypoint for CLI
pub fn run() {
    env_logger::init();

    let cli = Cli::parse();

    let cfg = config::Config::load(cli.config.to_str().unwrap()).unwrap();
    let fallback_id = MixtapeId::parse(&cfg.mixtapes.fallback_id)
        .expect("invalid mixtapes.fallback_id in config");

    match &cli.command {
        Commands::Serve {} => {
            println!("Starting HTTP server...");

            let mut store = Store::new(&cfg.database, fallback_id)
                .expect("Failed to initialize the mixtape store");
            if store.ensure_default().unwrap() {
                println!("Installed the default mixtape ({})", store.fallback_id());
            }

            let http_server = crate::http::server::HttpServer::new(
                store,
                cfg.http,
                cfg.assets.dir,
                cfg.public_endpoint,
            );

            println!(
                "HTTP server running at http://{}:{}",
                http_server.config.bind_addr, http_server.config.port
            );
            http_server.run();
        }

        Commands::Seed {} => {
            let mut store = Store::new(&cfg.database, fallback_id)
                .expect("Failed to initialize the mixtape store");

            let mixtape = store.seed_default().unwrap();
            println!(
                "Seeded default mixtape {} with {} tracks",
                mixtape.id,
                mixtape.tracks.len()
            );
        }

        Commands::List {} => {
            let mut store = Store::new(&cfg.database, fallback_id)
                .expect("Failed to initialize the mixtape store");

            let entries = store.list().unwrap();
            if entries.is_empty() {
                println!("No mixtapes stored yet");
            }

            for entry in entries {
                println!(
                    "{}  for {} ({} tracks), created {}",
                    entry.id,
                    entry.recipient_name,
                    entry.track_count,
                    millis_to_local_time(entry.created_at).unwrap()
                );
            }
        }

        Commands::Show { id } => {
            let mut store = Store::new(&cfg.database, fallback_id)
                .expect("Failed to initialize the mixtape store");

            let id = MixtapeId::parse(id).expect("invalid mixtape id");
            match store.get(&id).unwrap() {
                None => println!("Mixtape {} not found", id),
                Some(mixtape) => {
                    println!("Mixtape: {}", mixtape.id);
                    println!("For: {}", mixtape.recipient_name);
                    println!(
                        "Created: {}",
                        millis_to_local_time(mixtape.created_at).unwrap()
                    );
                    println!(
                        "Share: {}",
                        public_endpoint::playback_url(&cfg.public_endpoint, &mixtape.id)
                    );
                    println!("Tracks:");
                    for (i, track) in mixtape.tracks.iter().enumerate() {
                        match resolve::resolve_track(track) {
                            Some(resolved) => {
                                println!("  {}. {} -> {}", i + 1, track.url, resolved.video_id)
                            }
                            None => println!("  {}. {} (not playable)", i + 1, track.url),
                        }
                    }
                }
            }
        }

        Commands::Resolve { urls } => {
            for url in urls {
                match resolve::extract_video_id(url) {
                    Some(video_id) => println!("OK    {video_id}  {url}"),
                    None => println!("SKIP  {url}"),
                }
            }
        }
    }
}
