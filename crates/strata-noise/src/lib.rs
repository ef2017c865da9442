//! Layered height noise and radial falloff fields.
#![forbid(unsafe_code)]

pub mod falloff;
pub mod noise;

pub use falloff::FalloffMap;
pub use noise::{
    NoiseConfig, NoiseField, NoiseGrid, NormalizeMode, OctaveOffsets, generate_noise_map,
};
