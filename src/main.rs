use assetmap::config::MAPS_DIR_ENV;
use assetmap::logging::init_logging;
use assetmap::{Config, MapError, MapSession};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::error;

#[derive(Parser)]
#[command(name = "assetmap")]
#[command(about = "Inspect container location maps")]
struct Cli {
    /// JSON file with `maps_root`, `minimal` and `game`
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Directory holding `<name>.bin` location maps
    #[arg(long, global = true, env = MAPS_DIR_ENV)]
    maps_dir: Option<PathBuf>,

    /// Log at debug level
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// List the location maps found under the maps directory
    Maps,
    /// Print a map's base folder and entries
    Show { map: String },
    /// Resolve container identifiers to the files holding them
    Locate {
        map: String,
        #[arg(required = true)]
        identifiers: Vec<String>,
    },
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let result = Config::resolve(cli.config.as_deref()).and_then(|mut config| {
        if let Some(dir) = cli.maps_dir {
            config.maps_root = dir;
        }
        let mut session = MapSession::new(config);
        run(&mut session, cli.command)
    });

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{}", e);
            ExitCode::FAILURE
        }
    }
}

fn run(session: &mut MapSession, command: Command) -> Result<(), MapError> {
    match command {
        Command::Maps => {
            for name in session.list_maps()? {
                println!("{name}");
            }
        }
        Command::Show { map } => {
            load(session, &map)?;
            let location_map = session.location_map();
            println!("Base folder: {}", location_map.base_folder().display());
            println!("Entries: {}", location_map.len());
            for entry in location_map.iter() {
                println!("{} -> {} @ {}", entry.identifier, entry.path, entry.offset);
                for dependency in &entry.dependencies {
                    println!("    depends on {dependency}");
                }
            }
        }
        Command::Locate { map, identifiers } => {
            load(session, &map)?;
            let mut missing = 0;
            for identifier in &identifiers {
                if session.try_add(identifier).is_none() {
                    println!("{identifier}: not found");
                    missing += 1;
                }
            }

            let mut paths: Vec<PathBuf> = identifiers
                .iter()
                .filter_map(|id| session.entry(id))
                .map(|entry| session.base_folder().join(&entry.path))
                .collect();
            paths.sort();
            paths.dedup();
            for path in paths {
                let offsets = session.try_get(&path).unwrap_or_default();
                println!("{} {:?}", path.display(), offsets);
            }

            if missing > 0 {
                return Err(MapError::UnresolvedIdentifiers(missing));
            }
        }
    }
    Ok(())
}

fn load(session: &mut MapSession, map: &str) -> Result<(), MapError> {
    if session.load_location_map(map) {
        Ok(())
    } else {
        Err(MapError::MapUnavailable(map.to_string()))
    }
}
