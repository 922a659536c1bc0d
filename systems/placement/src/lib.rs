#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Pure placement function that picks where a new entity appears.

use glam::Vec2;
use rand::Rng;
use skull_event_core::{PlacementConfig, SpawnArea, SpawnYMode};

/// Picks a world position above `area` for a new entity.
///
/// The x coordinate is drawn uniformly across the area's horizontal extent.
/// Bounds are expected to be finite; see [`SpawnArea::validate`].
/// The y coordinate follows [`PlacementConfig::y_mode`]. Only `rng` is
/// advanced; the same generator state always yields the same position.
pub fn place<R>(area: &SpawnArea, config: &PlacementConfig, rng: &mut R) -> Vec2
where
    R: Rng + ?Sized,
{
    let bounds = area.normalized();
    let x = if bounds.min_x < bounds.max_x {
        // Interpolated in f64 so areas wider than f32::MAX stay finite.
        let t: f64 = rng.gen_range(0.0..=1.0);
        let (min_x, max_x) = (f64::from(bounds.min_x), f64::from(bounds.max_x));
        (min_x + t * (max_x - min_x)) as f32
    } else {
        bounds.min_x
    };

    let y = match config.y_mode {
        SpawnYMode::FixedWorldY => config.fixed_world_y,
        SpawnYMode::GroundTopPlusOffset => bounds.max_y + config.y_offset_above_ground_top,
    };

    let x = if config.clamp_to_area_x {
        area.clamp_x(x)
    } else {
        x
    };

    Vec2::new(x, y)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand_chacha::{rand_core::SeedableRng, ChaCha8Rng};

    fn config(y_mode: SpawnYMode) -> PlacementConfig {
        PlacementConfig {
            y_mode,
            fixed_world_y: -2.5,
            y_offset_above_ground_top: 0.35,
            clamp_to_area_x: true,
        }
    }

    #[test]
    fn fixed_mode_ignores_area_height() {
        let area = SpawnArea::new(0.0, 4.0, 1.0, 9.0);
        let mut rng = ChaCha8Rng::seed_from_u64(3);

        let position = place(&area, &config(SpawnYMode::FixedWorldY), &mut rng);

        assert_eq!(position.y, -2.5);
    }

    #[test]
    fn zero_width_area_pins_x() {
        let area = SpawnArea::new(3.0, 3.0, 0.0, 1.0);
        let mut rng = ChaCha8Rng::seed_from_u64(11);

        let position = place(&area, &config(SpawnYMode::GroundTopPlusOffset), &mut rng);

        assert_eq!(position.x, 3.0);
    }
}
