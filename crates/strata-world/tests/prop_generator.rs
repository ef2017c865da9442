use proptest::prelude::*;
use strata_geom::Vec2;
use strata_noise::{FalloffMap, NoiseConfig, NoiseField};
use strata_world::{GenSettings, TerrainConfig, TerrainGenerator, generate_height_map};

const S: usize = 15;

fn field(seed: i32) -> NoiseField {
    NoiseField::new(&NoiseConfig {
        seed,
        ..NoiseConfig::default()
    })
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    #[test]
    fn height_map_is_deterministic(seed in any::<i32>(), x in -500.0f32..500.0, y in -500.0f32..500.0) {
        let center = Vec2::new(x.round(), y.round());
        let a = generate_height_map(&field(seed), S, center, None);
        let b = generate_height_map(&field(seed), S, center, None);
        prop_assert_eq!(a, b);
    }

    // Falloff only ever lowers heights and never leaves [0, 1]
    #[test]
    fn falloff_lowers_and_stays_in_range(seed in any::<i32>(), cx in -20i32..20) {
        let f = field(seed);
        let center = Vec2::new((cx * (S as i32 - 1)) as f32, 0.0);
        let falloff = FalloffMap::generate(S + 2);
        let plain = generate_height_map(&f, S, center, None);
        let shaped = generate_height_map(&f, S, center, Some(&falloff));
        for (p, s) in plain.values().iter().zip(shaped.values()) {
            prop_assert!((0.0..=1.0).contains(s));
            prop_assert!(s <= p);
        }
    }

    // Neighbouring chunks one chunk-step apart share their edge column
    #[test]
    fn adjacent_maps_share_edges(seed in any::<i32>(), cx in -30i32..30, cz in -30i32..30) {
        let f = field(seed);
        let step = (S - 1) as f32;
        let a = generate_height_map(&f, S, Vec2::new(cx as f32 * step, cz as f32 * step), None);
        let b = generate_height_map(&f, S, Vec2::new((cx + 1) as f32 * step, cz as f32 * step), None);
        for y in 0..S + 2 {
            prop_assert_eq!(a.get(S, y).to_bits(), b.get(1, y).to_bits());
        }
    }
}

#[test]
fn default_chunk_map_is_241_square_in_unit_range() {
    let g = TerrainGenerator::default();
    assert_eq!(g.map_chunk_size(), 239);
    let data = g.generate_map_data(Vec2::ZERO);
    assert_eq!(data.height_map.width(), 241);
    assert_eq!(data.height_map.height(), 241);
    assert!(data.height_map.values().iter().all(|v| (0.0..=1.0).contains(v)));
}

#[test]
fn flat_shading_shrinks_chunks() {
    let terrain = TerrainConfig {
        flat_shading: true,
        ..TerrainConfig::default()
    };
    let g = TerrainGenerator::new(GenSettings::new(&terrain, &NoiseConfig::default()));
    assert_eq!(g.map_chunk_size(), 95);
    assert_eq!(g.generate_map_data(Vec2::ZERO).height_map.width(), 97);
}

#[test]
fn generator_matches_free_function() {
    let terrain = TerrainConfig {
        chunk_size: Some(S),
        ..TerrainConfig::default()
    };
    let settings = GenSettings::new(&terrain, &NoiseConfig::default());
    let direct = generate_height_map(settings.noise_field(), S, Vec2::new(42.0, -14.0), None);
    let g = TerrainGenerator::new(settings);
    assert_eq!(g.generate_map_data(Vec2::new(42.0, -14.0)).height_map, direct);
}
