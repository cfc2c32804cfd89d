use std::path::PathBuf;

use clap::Parser;

#[derive(Debug, Parser)]
#[command(name = "instagram-relay-discord", version, about)]
pub struct Cli {
    /// Path to the YAML settings file.
    #[arg(short, long, env = "CONFIG_PATH", default_value = "settings.yaml")]
    pub config: PathBuf,

    /// Path to the JSON state file holding channels and the tracking flag.
    #[arg(short, long, env = "STATE_PATH")]
    pub state: Option<PathBuf>,
}
