pub mod args;
pub mod commands;

use args::Command;
use layercut_core::config::EditorConfig;
use std::path::PathBuf;

const CONFIG_ENV: &str = "LAYERCUT_CONFIG";
const DEFAULT_CONFIG_FILE: &str = "layercut.toml";

fn check_dependencies() -> bool {
    let deps = [
        ("ffmpeg", "segment export and snapshots", "sudo apt install ffmpeg"),
        ("ffprobe", "reading frame rate and length", "sudo apt install ffmpeg"),
    ];

    let mut missing = Vec::new();
    for (bin, purpose, install) in &deps {
        if std::process::Command::new(bin)
            .arg("-version")
            .stdout(std::process::Stdio::null())
            .stderr(std::process::Stdio::null())
            .status()
            .is_err()
        {
            missing.push((*bin, *purpose, *install));
        }
    }

    if !missing.is_empty() {
        eprintln!("\n=== layercut: missing required dependencies ===\n");
        for (bin, purpose, install) in &missing {
            eprintln!("  ✗ {bin} -- {purpose}");
            eprintln!("    Install: {install}\n");
        }
        return false;
    }
    true
}

/// Path of the settings file.
pub fn config_path() -> PathBuf {
    std::env::var_os(CONFIG_ENV)
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_FILE))
}

/// Entry point; returns the process exit code.
pub fn run() -> i32 {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let command = match args::parse(std::env::args().skip(1)) {
        Ok(Command::Help) => {
            println!("{}", args::USAGE);
            return 0;
        }
        Ok(command) => command,
        Err(e) => {
            eprintln!("error: {e:#}\n\n{}", args::USAGE);
            return 2;
        }
    };

    // `list` only reads the project file.
    if !matches!(command, Command::List { .. }) && !check_dependencies() {
        return 1;
    }

    let config = match EditorConfig::load_or_default(config_path()) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("error: failed to read {}: {e}", config_path().display());
            return 1;
        }
    };

    match commands::dispatch(command, &config) {
        Ok(()) => 0,
        Err(e) => {
            eprintln!("error: {e:#}");
            1
        }
    }
}
