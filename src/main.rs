mod cli;
mod preview;
mod sim;
mod watch;

use clap::Parser;
use std::error::Error;
use std::sync::Arc;
use std::time::Duration;
use strata_world::{GenSettings, TerrainGenerator};

use cli::{Cli, Command};
use watch::{ConfigReloader, ReloadOutcome};

fn main() -> Result<(), Box<dyn Error>> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let cli = Cli::parse();
    let config = cli::load_or_default(&cli.config)?;
    let generator = Arc::new(TerrainGenerator::from_config(&config));

    match cli.command {
        Command::Preview(args) => {
            if !args.watch {
                return preview::run_once(&generator, &args);
            }
            let mut reloader = ConfigReloader::new(&cli.config, config)?;
            let events = reloader.notifier().subscribe();
            if let Err(e) = preview::run_once(&generator, &args) {
                log::error!("preview failed: {}", e);
            }
            loop {
                if reloader.wait(Duration::from_secs(1)) != Some(ReloadOutcome::Applied) {
                    continue;
                }
                if events.try_iter().count() == 0 {
                    continue;
                }
                generator.update_settings(GenSettings::from_config(reloader.config()));
                if let Err(e) = preview::run_once(&generator, &args) {
                    log::error!("preview failed: {}", e);
                }
            }
        }
        Command::Stream(args) => {
            let reloader = if args.watch {
                Some(ConfigReloader::new(&cli.config, config.clone())?)
            } else {
                None
            };
            sim::run(config, generator, &args, reloader)
        }
    }
}
