use std::error::Error;
use std::fs;
use strata_geom::Vec2;
use strata_mesh::generate_terrain_mesh;
use strata_noise::NormalizeMode;
use strata_world::{MAP_BORDER, PreviewImage, TerrainGenerator};

use crate::cli::{DrawMode, PreviewArgs};

/// Encoded preview bytes for one chunk: PPM for the image modes, OBJ text for meshes.
pub fn render(generator: &TerrainGenerator, args: &PreviewArgs) -> Result<Vec<u8>, Box<dyn Error>> {
    let settings = generator.snapshot();
    let size = settings.map_chunk_size() + MAP_BORDER;
    let center = Vec2::new(args.x, args.z);
    let bytes = match args.mode {
        DrawMode::Noise => {
            let field = settings.noise_field();
            let raw = field.raw_grid(size, size, center);
            let mode = if args.local {
                NormalizeMode::Local
            } else {
                settings.noise.normalize_mode
            };
            let grid = field.normalize_grid(&raw, mode);
            PreviewImage::from_values(grid.width, grid.height, &grid.values).to_ppm()
        }
        DrawMode::Falloff => {
            let falloff = generator.falloff_map(size);
            PreviewImage::from_values(size, size, falloff.values()).to_ppm()
        }
        DrawMode::Color => {
            let map = generator.generate_map_data_with(&settings, center);
            PreviewImage::from_color_map(&map.color_map).to_ppm()
        }
        DrawMode::Mesh => {
            let map = generator.generate_map_data_with(&settings, center);
            let terrain = &settings.terrain;
            let mesh = generate_terrain_mesh(
                &map.height_map,
                terrain.height_multiplier,
                &terrain.height_curve,
                args.lod,
                terrain.flat_shading,
            )?;
            log::info!(
                "mesh lod {}: {} vertices, {} triangles",
                args.lod,
                mesh.vertex_count(),
                mesh.triangle_count()
            );
            mesh.to_render_buffers().to_obj().into_bytes()
        }
    };
    Ok(bytes)
}

/// Renders and writes the preview to `args.out_path()`.
pub fn run_once(generator: &TerrainGenerator, args: &PreviewArgs) -> Result<(), Box<dyn Error>> {
    let bytes = render(generator, args)?;
    let out = args.out_path();
    fs::write(&out, &bytes)?;
    log::info!("{:?} preview written to {} ({} bytes)", args.mode, out.display(), bytes.len());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use strata_world::{StrataConfig, TerrainConfig};

    fn generator() -> TerrainGenerator {
        let cfg = StrataConfig {
            terrain: TerrainConfig {
                chunk_size: Some(15),
                ..TerrainConfig::default()
            },
            ..StrataConfig::default()
        };
        TerrainGenerator::from_config(&cfg)
    }

    fn args(mode: DrawMode) -> PreviewArgs {
        PreviewArgs {
            mode,
            out: None,
            x: 0.0,
            z: 0.0,
            lod: 0,
            local: false,
            watch: false,
        }
    }

    #[test]
    fn image_modes_cover_the_bordered_map() {
        let g = generator();
        let header = b"P6\n17 17\n255\n";
        for mode in [DrawMode::Noise, DrawMode::Falloff] {
            let bytes = render(&g, &args(mode)).unwrap();
            assert!(bytes.starts_with(header));
            assert_eq!(bytes.len(), header.len() + 17 * 17 * 3);
        }
    }

    #[test]
    fn color_mode_covers_the_interior() {
        let bytes = render(&generator(), &args(DrawMode::Color)).unwrap();
        let header = b"P6\n15 15\n255\n";
        assert!(bytes.starts_with(header));
        assert_eq!(bytes.len(), header.len() + 15 * 15 * 3);
    }

    #[test]
    fn mesh_mode_emits_obj() {
        let bytes = render(&generator(), &args(DrawMode::Mesh)).unwrap();
        let text = String::from_utf8(bytes).unwrap();
        assert_eq!(text.lines().filter(|l| l.starts_with("v ")).count(), 15 * 15);
        assert_eq!(text.lines().filter(|l| l.starts_with("f ")).count(), 2 * 14 * 14);
    }

    #[test]
    fn degenerate_lod_is_an_error() {
        let mut a = args(DrawMode::Mesh);
        a.lod = 12;
        assert!(render(&generator(), &a).is_err());
    }
}
