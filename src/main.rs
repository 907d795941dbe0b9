use tokio_compat::runtime;

use std::path::PathBuf;

use clap::{App, Arg, ArgMatches};
use tracing::{error, info};

mod config;
mod error;
mod key_resolver;
mod listing;
mod logging;
mod manifest;
mod sync;

use error::Error;

fn args() -> ArgMatches<'static> {
    App::new("r2-gallery-sync")
        .about("Generates gallery.json manifests from images stored in an R2 bucket")
        .arg(
            Arg::with_name("directory")
                .short("C")
                .long("directory")
                .value_name("DIR")
                .help("Sets the current directory")
                .takes_value(true),
        )
        .arg(
            Arg::with_name("env_file")
                .long("env-file")
                .value_name("FILE")
                .help("Sets the env file holding the R2 credentials")
                .default_value(".env")
                .takes_value(true),
        )
        .arg(
            Arg::with_name("galleries_dir")
                .long("galleries-dir")
                .value_name("DIR")
                .help("Sets the directory holding one directory per gallery")
                .default_value("content/galleries")
                .takes_value(true),
        )
        .arg(
            Arg::with_name("log_level")
                .short("l")
                .long("log-level")
                .value_name("LEVEL")
                .help("Sets the log level")
                .possible_values(logging::LOG_LEVELS)
                .default_value("info")
                .takes_value(true),
        )
        .get_matches()
}

fn main() {
    let matches = args();

    match matches
        .value_of("log_level")
        .map(logging::parse_level)
        .unwrap_or(Ok(tracing::Level::INFO))
    {
        Ok(level) => logging::init(level),
        Err(e) => {
            eprintln!("{}", e);
            std::process::exit(1);
        }
    }

    if let Err(e) = run(&matches) {
        error!(error = %e, "gallery sync failed");
        std::process::exit(1);
    }
}

fn run(matches: &ArgMatches) -> Result<(), Error> {
    if let Some(cwd) = matches.value_of_os("directory") {
        std::env::set_current_dir(cwd)?;
    }

    let env_file = PathBuf::from(matches.value_of_os("env_file").ok_or("no env file")?);
    let config = config::Config::load(&env_file)?;
    info!(account_id = %config.account_id, bucket = %config.bucket, "loaded configuration");

    let request = sync::GallerySync {
        bucket: config.bucket.clone(),
        galleries_dir: matches
            .value_of_os("galleries_dir")
            .ok_or("no galleries directory")?
            .into(),
    };

    let mut rt = runtime::Builder::default().core_threads(1).build()?;
    let s3_client = listing::client(&config)?;
    let executor = sync::SyncExecutor::new(s3_client);
    let stats = rt.block_on_std(executor.execute(request))?;

    info!(
        keys_listed = stats.keys_listed,
        keys_ignored = stats.keys_ignored,
        galleries_found = stats.galleries_found,
        manifests_written = stats.manifests_written,
        directories_skipped = stats.directories_skipped,
        "sync complete"
    );
    Ok(())
}
