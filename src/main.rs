use std::path::{Path, PathBuf};
use std::thread;

use collection_tree::collection_manager::CollectionTreeManager;
use collection_tree::collection_search::MemoryCollection;
use collection_tree::config::{sanitize_config, Config};
use collection_tree::protocol::{CollectionMessage, Message};
use collection_tree::track::{Track, TrackRef};
use log::{info, warn};
use tokio::sync::broadcast;

fn load_config() -> Result<Config, Box<dyn std::error::Error>> {
    let config_dir = dirs::config_dir().ok_or("no user config directory available")?;
    let config_file = config_dir.join("collection_tree.toml");

    if !config_file.exists() {
        let default_config = Config::default();

        info!(
            "Config file not found. Creating default config. path={}",
            config_file.display()
        );
        std::fs::create_dir_all(&config_dir)?;
        std::fs::write(&config_file, toml::to_string(&default_config)?)?;
    }

    let config_content = std::fs::read_to_string(&config_file)?;
    let config = match toml::from_str::<Config>(&config_content) {
        Ok(config) => config,
        Err(err) => {
            warn!(
                "Failed to parse {}: {}. Using defaults",
                config_file.display(),
                err
            );
            Config::default()
        }
    };
    Ok(sanitize_config(config))
}

fn load_tracks(path: &Path) -> Result<Vec<TrackRef>, Box<dyn std::error::Error>> {
    let content = std::fs::read_to_string(path)?;
    let tracks: Vec<Track> = serde_json::from_str(&content)?;
    Ok(tracks.into_iter().map(Track::into_ref).collect())
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let mut clog = colog::default_builder();
    clog.filter(None, log::LevelFilter::Debug);
    clog.init();

    std::panic::set_hook(Box::new(|panic_info| {
        let current_thread = std::thread::current();
        let thread_name = current_thread.name().unwrap_or("unnamed");
        log::error!("panic in thread '{}': {}", thread_name, panic_info);
    }));

    let mut args = std::env::args().skip(1);
    let tracks_file = PathBuf::from(
        args.next()
            .ok_or("usage: collection-tree <tracks.json> [keyword]")?,
    );
    let keyword = args.next().unwrap_or_default();

    let config = load_config()?;
    let active_view = config.collection.active_view;
    let tracks = load_tracks(&tracks_file)?;
    info!(
        "Loaded {} track(s) from {}",
        tracks.len(),
        tracks_file.display()
    );

    // Bus for communication between components
    let (bus_sender, _) = broadcast::channel(1024);
    let mut observer = bus_sender.subscribe();

    let mut collection_manager = CollectionTreeManager::new(
        bus_sender.subscribe(),
        bus_sender.clone(),
        Box::new(MemoryCollection::new(tracks)),
        config,
    );
    let tree_handle = collection_manager.handle();
    thread::spawn(move || {
        collection_manager.run();
    });

    bus_sender.send(Message::Collection(CollectionMessage::Load {
        keyword,
        order_index: active_view,
    }))?;

    loop {
        match observer.blocking_recv() {
            Ok(Message::Collection(CollectionMessage::TreePublished {
                generation,
                expand_hints,
                ..
            })) => {
                info!(
                    "Tree generation {} ready, {} row(s) to expand",
                    generation,
                    expand_hints.len()
                );
                break;
            }
            Ok(_) => {}
            Err(broadcast::error::RecvError::Lagged(skipped)) => {
                warn!("Observer lagged on bus, skipped {} message(s)", skipped);
            }
            Err(broadcast::error::RecvError::Closed) => {
                return Err("collection tree manager stopped before publishing".into());
            }
        }
    }

    for line in tree_handle.published().outline() {
        println!("{}", line);
    }
    Ok(())
}
