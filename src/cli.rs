use clap::{Args, Parser, Subcommand, ValueEnum};
use std::path::{Path, PathBuf};
use strata_world::{ConfigError, StrataConfig, load_config_from_path};

#[derive(Parser, Debug)]
#[command(name = "strata", version, about = "Procedural terrain generation and chunk streaming")]
pub struct Cli {
    /// Terrain config (TOML). Missing files fall back to built-in defaults.
    #[arg(long, short, global = true, default_value = "assets/terrain.toml")]
    pub config: PathBuf,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Generate a single chunk synchronously and write it out
    Preview(PreviewArgs),
    /// Headless streaming run with a viewer moving across the terrain
    Stream(StreamArgs),
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum DrawMode {
    /// Normalized noise as grayscale PPM
    Noise,
    /// Region colours as PPM
    Color,
    /// Falloff field as grayscale PPM
    Falloff,
    /// Terrain mesh as Wavefront OBJ
    Mesh,
}

#[derive(Args, Debug, Clone)]
pub struct PreviewArgs {
    #[arg(long, value_enum, default_value_t = DrawMode::Color)]
    pub mode: DrawMode,

    /// Output file; defaults to `preview.ppm`, or `preview.obj` in mesh mode
    #[arg(long, short)]
    pub out: Option<PathBuf>,

    /// Chunk center x, in samples
    #[arg(long, default_value_t = 0.0, allow_negative_numbers = true)]
    pub x: f32,

    /// Chunk center z, in samples
    #[arg(long, default_value_t = 0.0, allow_negative_numbers = true)]
    pub z: f32,

    /// Mesh detail level for `--mode mesh`
    #[arg(long, default_value_t = 0)]
    pub lod: u32,

    /// Normalize the noise preview per chunk instead of globally
    #[arg(long)]
    pub local: bool,

    /// Re-run the preview whenever the config file changes
    #[arg(long)]
    pub watch: bool,
}

impl PreviewArgs {
    pub fn out_path(&self) -> PathBuf {
        match &self.out {
            Some(p) => p.clone(),
            None if self.mode == DrawMode::Mesh => PathBuf::from("preview.obj"),
            None => PathBuf::from("preview.ppm"),
        }
    }
}

#[derive(Args, Debug, Clone)]
pub struct StreamArgs {
    #[arg(long, default_value_t = 600)]
    pub ticks: u32,

    /// Viewer speed along +x, in world units per tick
    #[arg(long, default_value_t = 4.0, allow_negative_numbers = true)]
    pub speed: f32,

    #[arg(long, default_value_t = 16)]
    pub tick_ms: u64,

    /// Log streaming stats every this many ticks
    #[arg(long, default_value_t = 60)]
    pub report_every: u32,

    /// Overrides `streaming.workers`
    #[arg(long)]
    pub workers: Option<usize>,

    /// Rebuild the stream whenever the config file changes
    #[arg(long)]
    pub watch: bool,
}

/// Loads `path`, or the defaults when it does not exist.
pub fn load_or_default(path: &Path) -> Result<StrataConfig, ConfigError> {
    if !path.exists() {
        log::warn!("config {} not found; using defaults", path.display());
        return Ok(StrataConfig::default());
    }
    let cfg = load_config_from_path(path)?;
    log::info!("config loaded from {}", path.display());
    Ok(cfg)
}
