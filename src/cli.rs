use clap::Parser;
use std::path::PathBuf;

use crate::application::dto::SelectionStrategy;
use crate::config::CliOverrides;

pub const DEFAULT_OUTPUT_DIR: &str = "autoheal-out";

/// Find and verify safe upgrades for vulnerable Python requirements
#[derive(Parser, Debug)]
#[command(name = "autoheal")]
#[command(version)]
#[command(
    about = "Find and verify safe upgrades for vulnerable Python requirements",
    long_about = None
)]
pub struct Args {
    /// Path to the requirements manifest (e.g. requirements.txt)
    pub manifest: PathBuf,

    /// Config file (defaults to autoheal.config.yml next to the manifest)
    #[arg(short, long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Directory for report artifacts and the recommended manifest
    #[arg(short, long, value_name = "DIR", default_value = DEFAULT_OUTPUT_DIR)]
    pub output_dir: PathBuf,

    /// Fix selection strategy: nearest or delegated
    #[arg(short, long)]
    pub strategy: Option<SelectionStrategy>,

    /// Verification command; {manifest} is replaced with the candidate manifest
    /// path. Must be the last option: --verify-cmd pip install --dry-run -r {manifest}
    #[arg(long, value_name = "ARG", num_args = 1.., allow_hyphen_values = true)]
    pub verify_cmd: Option<Vec<String>>,

    /// Stop after the candidate matrix (no selection or patching)
    #[arg(long)]
    pub scan_only: bool,

    /// Metadata cache directory (defaults to $AUTOHEAL_CACHE or ~/.autoheal_cache)
    #[arg(long, value_name = "DIR")]
    pub cache_dir: Option<PathBuf>,

    /// Do not fall back to PyPI requires_dist when deps.dev has no data
    #[arg(long)]
    pub no_fallback: bool,

    /// Disable colored summary output
    #[arg(long)]
    pub no_color: bool,

    /// Increase log verbosity (-v info, -vv debug)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,
}

impl Args {
    pub fn parse_args() -> Self {
        Self::parse()
    }

    /// Flags that take precedence over the config file
    pub fn overrides(&self) -> CliOverrides {
        CliOverrides {
            cache_dir: self.cache_dir.clone(),
            verify_command: self.verify_cmd.clone(),
            strategy: self.strategy,
            no_fallback: self.no_fallback,
        }
    }

    /// Directory searched for `autoheal.config.yml` when `--config` is absent
    pub fn manifest_dir(&self) -> PathBuf {
        match self.manifest.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => PathBuf::from("."),
        }
    }

    /// Log filter directive implied by `-v`
    pub fn log_level(&self) -> &'static str {
        match self.verbose {
            0 => "warn",
            1 => "info",
            _ => "debug",
        }
    }
}
