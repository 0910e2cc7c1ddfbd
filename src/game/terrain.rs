//! Track height field generation

use super::state::TerrainPoint;

/// Constants that fully determine a track
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TerrainParams {
    /// Total world width covered by the samples
    pub width: f64,
    /// Number of segments; the track has `segments + 1` samples
    pub segments: usize,
    /// Finish line position as a fraction of `width`
    pub finish_fraction: f64,
}

impl Default for TerrainParams {
    fn default() -> Self {
        Self {
            width: 5000.0,
            segments: 100,
            finish_fraction: 0.8,
        }
    }
}

impl TerrainParams {
    pub fn finish_line(&self) -> f64 {
        self.width * self.finish_fraction
    }

    pub fn segment_width(&self) -> f64 {
        self.width / self.segments as f64
    }
}

// Hill shape
const LONG_WAVE_FREQ: f64 = 0.001;
const LONG_WAVE_AMP: f64 = 50.0;
const SHORT_WAVE_FREQ: f64 = 0.005;
const SHORT_WAVE_AMP: f64 = 30.0;
/// Hills flatten to this share of their amplitude at the far end
const HILL_DECAY: f64 = 0.5;

// Ramps
const START_RAMP_HEIGHT: f64 = 50.0;
const START_RAMP_SLOPE: f64 = 0.05;
const END_RAMP_SLOPE: f64 = 0.1;

/// Generate the track. Pure: equal params always give equal samples.
///
/// Height at `x` is two sine hills whose amplitude shrinks toward the far end,
/// plus a start ramp that falls to zero over the first stretch, plus an end
/// ramp that only rises past the finish line.
pub fn generate(params: &TerrainParams) -> Vec<TerrainPoint> {
    let segment_width = params.segment_width();
    let finish_line = params.finish_line();

    (0..=params.segments)
        .map(|i| {
            let x = i as f64 * segment_width;

            let hill_factor = 1.0 - (x / params.width) * HILL_DECAY;
            let hills = (x * LONG_WAVE_FREQ).sin() * LONG_WAVE_AMP * hill_factor
                + (x * SHORT_WAVE_FREQ).sin() * SHORT_WAVE_AMP * hill_factor;

            let start_ramp = (START_RAMP_HEIGHT - x * START_RAMP_SLOPE).max(0.0);
            let end_ramp = ((x - finish_line) * END_RAMP_SLOPE).max(0.0);

            TerrainPoint {
                x,
                height: hills + start_ramp + end_ramp,
            }
        })
        .collect()
}

/// Height at `x`, linearly interpolated between the neighbouring samples.
/// Clamps to the first/last sample outside the track; `None` for an empty track.
pub fn height_at(terrain: &[TerrainPoint], x: f64) -> Option<f64> {
    let first = terrain.first()?;
    let last = terrain.last()?;
    if x <= first.x {
        return Some(first.height);
    }
    if x >= last.x {
        return Some(last.height);
    }

    // First sample strictly right of x; x > first.x so idx >= 1
    let idx = terrain.partition_point(|p| p.x <= x);
    let (left, right) = (terrain[idx - 1], terrain[idx]);
    let t = (x - left.x) / (right.x - left.x);
    Some(left.height + (right.height - left.height) * t)
}
