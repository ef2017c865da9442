//! Terrain configuration, height sampling, and chunk-level map payloads.
#![forbid(unsafe_code)]

pub mod chunk_coord;
pub mod config;
pub mod curve;
pub mod generator;
pub mod height_map;
pub mod notifier;
pub mod texture;

pub use chunk_coord::ChunkCoord;
pub use config::{
    ConfigError, LodInfo, StrataConfig, StreamingConfig, TerrainConfig, load_config_from_path,
    parse_config,
};
pub use curve::{CurveInterpolation, HeightCurve, Keyframe};
pub use generator::{GenSettings, TerrainGenerator, generate_height_map};
pub use height_map::{HeightMap, MAP_BORDER, MapData};
pub use notifier::{ConfigEvent, ConfigNotifier};
pub use texture::{ColorMap, PreviewImage, TerrainType, color_map_from_height_map};
