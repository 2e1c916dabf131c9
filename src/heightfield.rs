use noise::{Fbm, MultiFractal, NoiseFn, Perlin};

use crate::config::WaterConfig;

/// A cube of noise values in `[0, 1]` that displaces the water grid.
///
/// Two axes span the horizontal plane and repeat every `period` world units; the third is a
/// stack of layers swept through over time by a [`LayerOscillator`].
#[derive(Clone, Debug)]
pub struct HeightField {
    pub resolution: usize,
    pub layers: usize,
    pub period: f32,
    values: Vec<f32>,
}

impl HeightField {
    /// Samples fractal Perlin noise on the lattice described by `config` and normalizes the
    /// result to `[0, 1]`.
    pub fn from_noise(config: &WaterConfig) -> Self {
        let noise: Fbm<Perlin> = Fbm::new(config.noise_seed).set_frequency(config.noise_frequency);
        let res = config.height_field_resolution as f64;
        let layers = config.height_field_layers as f64;

        let mut field = Self::from_fn(
            config.height_field_resolution,
            config.height_field_layers,
            config.height_field_period,
            |x, z, layer| noise.get([x as f64 / res, z as f64 / res, layer as f64 / layers]) as f32,
        );
        field.normalize();
        log::debug!(
            "generated {}x{}x{} height field",
            field.resolution,
            field.resolution,
            field.layers
        );
        field
    }

    /// Builds a field from `f(x, z, layer)`. Values are stored as returned; callers that need
    /// the `[0, 1]` range should return it or call [`HeightField::normalize`].
    pub fn from_fn<F: FnMut(usize, usize, usize) -> f32>(
        resolution: usize,
        layers: usize,
        period: f32,
        mut f: F,
    ) -> Self {
        let mut values = Vec::with_capacity(resolution * resolution * layers);
        for layer in 0..layers {
            for z in 0..resolution {
                for x in 0..resolution {
                    values.push(f(x, z, layer));
                }
            }
        }
        Self {
            resolution,
            layers,
            period,
            values,
        }
    }

    /// Rescales all values linearly onto `[0, 1]`. A constant field becomes 0.5 everywhere.
    pub fn normalize(&mut self) {
        let (min, max) = self
            .values
            .iter()
            .fold((f32::MAX, f32::MIN), |(lo, hi), &v| (lo.min(v), hi.max(v)));
        let range = max - min;
        for v in &mut self.values {
            *v = if range > f32::EPSILON { (*v - min) / range } else { 0.5 };
        }
    }

    /// Lattice value at integer coordinates, if they are in range.
    pub fn get(&self, x: usize, z: usize, layer: usize) -> Option<f32> {
        if x < self.resolution && z < self.resolution && layer < self.layers {
            Some(self.values[(layer * self.resolution + z) * self.resolution + x])
        } else {
            None
        }
    }

    /// Value under the world position `(x, z)` at the normalized depth `layer_t`.
    ///
    /// Horizontal coordinates wrap every `period` units, so any finite position is valid.
    pub fn sample(&self, x: f32, z: f32, layer_t: f32) -> f32 {
        let ix = self.wrap(x);
        let iz = self.wrap(z);
        let top = self.layers.saturating_sub(1);
        let layer = ((layer_t.clamp(0.0, 1.0) * top as f32).round() as usize).min(top);
        self.get(ix, iz, layer).unwrap_or(0.0)
    }

    fn wrap(&self, coordinate: f32) -> usize {
        let u = (coordinate / self.period).rem_euclid(1.0);
        ((u * self.resolution as f32) as usize).min(self.resolution.saturating_sub(1))
    }
}

/// Which way a [`LayerOscillator`] is currently moving.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Phase {
    Ascending,
    Descending,
}

/// Ping-pong value in `[0, 1]` advanced once per frame to animate the height field.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct LayerOscillator {
    pub value: f32,
    pub step: f32,
    pub phase: Phase,
    /// Reaching this turns the oscillator around to [`Phase::Descending`].
    pub upper: f32,
    /// Reaching this turns the oscillator around to [`Phase::Ascending`].
    pub lower: f32,
}

impl LayerOscillator {
    pub fn new(step: f32, lower: f32, upper: f32) -> Self {
        Self {
            value: 0.0,
            step,
            phase: Phase::Ascending,
            upper,
            lower,
        }
    }

    pub fn from_config(config: &WaterConfig) -> Self {
        Self::new(
            config.layer_step,
            config.layer_lower_threshold,
            config.layer_upper_threshold,
        )
    }

    /// Moves one step in the current direction, turning around at the thresholds.
    pub fn advance(&mut self) -> f32 {
        match self.phase {
            Phase::Ascending => {
                self.value = (self.value + self.step).min(1.0);
                if self.value >= self.upper {
                    self.phase = Phase::Descending;
                }
            }
            Phase::Descending => {
                self.value = (self.value - self.step).max(0.0);
                if self.value <= self.lower {
                    self.phase = Phase::Ascending;
                }
            }
        }
        self.value
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ramp() -> HeightField {
        HeightField::from_fn(4, 3, 8.0, |x, z, layer| (x + 10 * z + 100 * layer) as f32)
    }

    #[test]
    fn test_lattice_layout() {
        let field = ramp();
        assert_eq!(field.get(1, 2, 0), Some(21.0));
        assert_eq!(field.get(3, 3, 2), Some(233.0));
        assert_eq!(field.get(4, 0, 0), None);
        assert_eq!(field.get(0, 0, 3), None);
    }

    #[test]
    fn test_sample_wraps_world_coordinates() {
        let field = ramp();
        // period 8, resolution 4: each lattice cell covers 2 world units
        assert_eq!(field.sample(2.5, 4.1, 0.0), 21.0);
        assert_eq!(field.sample(2.5 + 8.0, 4.1 - 16.0, 0.0), 21.0);
        assert_eq!(field.sample(-1.0, -1.0, 0.0), 33.0);
    }

    #[test]
    fn test_sample_picks_nearest_layer() {
        let field = ramp();
        assert_eq!(field.sample(0.0, 0.0, 0.0), 0.0);
        assert_eq!(field.sample(0.0, 0.0, 0.4), 100.0);
        assert_eq!(field.sample(0.0, 0.0, 1.0), 200.0);
        assert_eq!(field.sample(0.0, 0.0, 7.0), 200.0);
    }

    #[test]
    fn test_normalize_spans_unit_range() {
        let mut field = ramp();
        field.normalize();
        assert_eq!(field.get(0, 0, 0), Some(0.0));
        assert_eq!(field.get(3, 3, 2), Some(1.0));
    }

    #[test]
    fn test_noise_field_is_normalized() {
        let config = WaterConfig {
            height_field_resolution: 8,
            height_field_layers: 4,
            ..Default::default()
        };
        let field = HeightField::from_noise(&config);
        let mut seen_low = false;
        let mut seen_high = false;
        for layer in 0..4 {
            for z in 0..8 {
                for x in 0..8 {
                    let v = field.get(x, z, layer).unwrap();
                    assert!((0.0..=1.0).contains(&v), "value out of range: {}", v);
                    seen_low |= v < 1e-6;
                    seen_high |= v > 1.0 - 1e-6;
                }
            }
        }
        assert!(seen_low && seen_high);
    }

    #[test]
    fn test_oscillator_ping_pongs() {
        let mut osc = LayerOscillator::new(0.25, 0.01, 0.99);
        let values: Vec<f32> = (0..10).map(|_| osc.advance()).collect();
        assert_eq!(
            values,
            vec![0.25, 0.5, 0.75, 1.0, 0.75, 0.5, 0.25, 0.0, 0.25, 0.5]
        );
    }

    #[test]
    fn test_oscillator_turns_at_thresholds() {
        let mut osc = LayerOscillator::new(0.1, 0.01, 0.99);
        let mut turns = 0;
        let mut phase = osc.phase;
        for _ in 0..200 {
            let v = osc.advance();
            assert!((0.0..=1.0).contains(&v));
            if osc.phase != phase {
                turns += 1;
                phase = osc.phase;
            }
        }
        assert!(turns >= 18, "oscillator turned only {} times", turns);
    }
}
