use anyhow::{Result, bail};
use clap::Parser;
use log::{debug, info};
use sheetscribe::{import_song_file, load_config, validate_config};
use std::fs;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(
    name = "sheetscribe",
    about = "Convert a MIDI file and song config into LLM-readable sheet notation."
)]
struct Args {
    /// Path to the target MIDI file.
    midi: PathBuf,

    /// Path to the human-authored song config (JSON).
    #[arg(short, long)]
    config: PathBuf,

    /// Write the song entry JSON here instead of stdout.
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Validate the config and exit without ingesting.
    #[arg(long, default_value_t = false)]
    check: bool,
}

fn main() -> Result<()> {
    env_logger::init();
    let args = Args::parse();

    info!("Loading song config: '{}'...", args.config.display());
    let config = load_config(&args.config)?;

    let errors = validate_config(&config);
    if !errors.is_empty() {
        for err in &errors {
            eprintln!("config error: {err}");
        }
        bail!(
            "Config '{}' failed validation with {} error(s)..!",
            config.id,
            errors.len()
        );
    }

    if args.check {
        info!("Config '{}' is valid..!", config.id);
        return Ok(());
    }

    info!("Importing MIDI file: '{}'...", args.midi.display());
    let entry = import_song_file(&args.midi, &config)?;
    debug!(
        "Ingested '{}' with {} measures..!",
        entry.id,
        entry.measures.len()
    );

    let json = serde_json::to_string_pretty(&entry)?;
    match &args.output {
        Some(path) => {
            fs::write(path, &json)?;
            info!("Wrote song entry to '{}'..!", path.display());
        }
        None => println!("{json}"),
    }

    Ok(())
}
