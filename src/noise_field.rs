//! Coherent-noise synthesis.
//!
//! Generation stages describe their noise as a small expression tree of
//! [`NoiseModule`] values built once per stage, then sampled over a window
//! into a [`Raster<f32>`]. The tree is immutable after construction and
//! evaluated by a single recursive function, so a stage's noise is fully
//! determined by the module parameters and seeds it was built with.
//!
//! `noise::Perlin` is the only gradient primitive; fractal accumulation
//! (standard, ridged, billow) is done here octave by octave.

use noise::{NoiseFn, Perlin};

use crate::raster::{Dimensions, Raster};

const DEFAULT_OCTAVES: u32 = 6;
const DEFAULT_LACUNARITY: f64 = 2.0;
const DEFAULT_PERSISTENCE: f64 = 0.5;

/// How octaves of gradient noise are folded together.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FractalStyle {
    /// Plain fractional Brownian motion.
    Standard,
    /// Inverted absolute value per octave: sharp ridge lines, used for
    /// mountain ranges.
    Ridged,
    /// Absolute value per octave: soft rounded lobes, used for rolling
    /// lowlands.
    Billow,
}

/// An immutable noise expression.
///
/// Combinators own their operands, so a whole stage graph is a single value.
pub enum NoiseModule {
    Fractal {
        noise: Perlin,
        style: FractalStyle,
        frequency: f64,
        octaves: u32,
        lacunarity: f64,
        persistence: f64,
    },
    /// `source * scale + bias`.
    ScaleBias {
        source: Box<NoiseModule>,
        scale: f64,
        bias: f64,
    },
    /// Pick `b` where the control value falls inside [lower, upper],
    /// `a` outside, with a smooth blend of width `falloff` at both edges.
    Select {
        a: Box<NoiseModule>,
        b: Box<NoiseModule>,
        control: Box<NoiseModule>,
        lower: f64,
        upper: f64,
        falloff: f64,
    },
    /// Distort the sample point of `source` with two independent Perlin
    /// fields before evaluation.
    Turbulence {
        source: Box<NoiseModule>,
        distort_x: Perlin,
        distort_y: Perlin,
        frequency: f64,
        power: f64,
    },
    Multiply {
        a: Box<NoiseModule>,
        b: Box<NoiseModule>,
    },
}

impl NoiseModule {
    pub fn perlin(seed: u32, frequency: f64, octaves: u32) -> Self {
        NoiseModule::Fractal {
            noise: Perlin::new(seed),
            style: FractalStyle::Standard,
            frequency,
            octaves,
            lacunarity: DEFAULT_LACUNARITY,
            persistence: DEFAULT_PERSISTENCE,
        }
    }

    pub fn ridged(seed: u32, frequency: f64) -> Self {
        NoiseModule::Fractal {
            noise: Perlin::new(seed),
            style: FractalStyle::Ridged,
            frequency,
            octaves: DEFAULT_OCTAVES,
            lacunarity: DEFAULT_LACUNARITY,
            persistence: DEFAULT_PERSISTENCE,
        }
    }

    pub fn billow(seed: u32, frequency: f64) -> Self {
        NoiseModule::Fractal {
            noise: Perlin::new(seed),
            style: FractalStyle::Billow,
            frequency,
            octaves: DEFAULT_OCTAVES,
            lacunarity: DEFAULT_LACUNARITY,
            persistence: DEFAULT_PERSISTENCE,
        }
    }

    pub fn scale_bias(source: NoiseModule, scale: f64, bias: f64) -> Self {
        NoiseModule::ScaleBias {
            source: Box::new(source),
            scale,
            bias,
        }
    }

    pub fn select(
        a: NoiseModule,
        b: NoiseModule,
        control: NoiseModule,
        lower: f64,
        upper: f64,
        falloff: f64,
    ) -> Self {
        NoiseModule::Select {
            a: Box::new(a),
            b: Box::new(b),
            control: Box::new(control),
            lower,
            upper,
            falloff,
        }
    }

    pub fn turbulence(source: NoiseModule, seed: u32, frequency: f64, power: f64) -> Self {
        NoiseModule::Turbulence {
            source: Box::new(source),
            distort_x: Perlin::new(seed),
            distort_y: Perlin::new(seed.wrapping_add(1)),
            frequency,
            power,
        }
    }

    pub fn multiply(a: NoiseModule, b: NoiseModule) -> Self {
        NoiseModule::Multiply {
            a: Box::new(a),
            b: Box::new(b),
        }
    }

    /// Evaluate the expression at a sample-space point. Output is roughly
    /// [-1, 1]; stages normalize sampled rasters rather than relying on
    /// exact bounds.
    pub fn evaluate(&self, x: f64, y: f64) -> f64 {
        match self {
            NoiseModule::Fractal {
                noise,
                style,
                frequency,
                octaves,
                lacunarity,
                persistence,
            } => fractal(noise, *style, x * frequency, y * frequency, *octaves, *lacunarity, *persistence),
            NoiseModule::ScaleBias { source, scale, bias } => {
                source.evaluate(x, y) * scale + bias
            }
            NoiseModule::Select {
                a,
                b,
                control,
                lower,
                upper,
                falloff,
            } => {
                let c = control.evaluate(x, y);
                if *falloff > 0.0 {
                    if c < lower - falloff {
                        a.evaluate(x, y)
                    } else if c < lower + falloff {
                        let t = s_curve((c - (lower - falloff)) / (2.0 * falloff));
                        lerp(a.evaluate(x, y), b.evaluate(x, y), t)
                    } else if c < upper - falloff {
                        b.evaluate(x, y)
                    } else if c < upper + falloff {
                        let t = s_curve((c - (upper - falloff)) / (2.0 * falloff));
                        lerp(b.evaluate(x, y), a.evaluate(x, y), t)
                    } else {
                        a.evaluate(x, y)
                    }
                } else if c >= *lower && c <= *upper {
                    b.evaluate(x, y)
                } else {
                    a.evaluate(x, y)
                }
            }
            NoiseModule::Turbulence {
                source,
                distort_x,
                distort_y,
                frequency,
                power,
            } => {
                let dx = distort_x.get([x * frequency, y * frequency]) * power;
                let dy = distort_y.get([x * frequency, y * frequency]) * power;
                source.evaluate(x + dx, y + dy)
            }
            NoiseModule::Multiply { a, b } => a.evaluate(x, y) * b.evaluate(x, y),
        }
    }
}

/// Octave accumulation for all three fractal styles, normalized by total
/// amplitude so octave count does not change the output range.
fn fractal(
    noise: &Perlin,
    style: FractalStyle,
    x: f64,
    y: f64,
    octaves: u32,
    lacunarity: f64,
    persistence: f64,
) -> f64 {
    let mut total = 0.0;
    let mut amplitude = 1.0;
    let mut frequency = 1.0;
    let mut max_value = 0.0;

    for _ in 0..octaves {
        let n = noise.get([x * frequency, y * frequency]);
        let octave_value = match style {
            FractalStyle::Standard => n,
            // 1-|n| peaks where the gradient noise crosses zero, which is
            // what draws connected ridge lines. Rescaled back to [-1, 1].
            FractalStyle::Ridged => (1.0 - n.abs()) * 2.0 - 1.0,
            FractalStyle::Billow => n.abs() * 2.0 - 1.0,
        };
        total += amplitude * octave_value;
        max_value += amplitude;
        amplitude *= persistence;
        frequency *= lacunarity;
    }

    total / max_value
}

fn lerp(a: f64, b: f64, t: f64) -> f64 {
    a + (b - a) * t
}

fn s_curve(t: f64) -> f64 {
    let t = t.clamp(0.0, 1.0);
    t * t * (3.0 - 2.0 * t)
}

/// Rectangle in noise sample space that a raster is mapped onto.
#[derive(Clone, Copy, Debug)]
pub struct SampleWindow {
    pub x0: f64,
    pub x1: f64,
    pub y0: f64,
    pub y1: f64,
}

impl SampleWindow {
    pub fn new(x0: f64, x1: f64, y0: f64, y1: f64) -> Self {
        Self { x0, x1, y0, y1 }
    }

    /// The window every stage uses by default: a few noise periods across
    /// the map regardless of raster resolution.
    pub fn standard() -> Self {
        Self::new(0.0, 4.0, 0.0, 4.0)
    }
}

/// Evaluate a module once per cell, mapping cell indices linearly onto the
/// sample window. Same module + window + dimensions always produces the
/// same raster.
pub fn sample_plane(module: &NoiseModule, window: SampleWindow, dims: Dimensions) -> Raster<f32> {
    let mut raster = Raster::new_with(dims, 0.0f32);
    let x_step = (window.x1 - window.x0) / dims.width as f64;
    let y_step = (window.y1 - window.y0) / dims.height as f64;

    for (x, y, v) in raster.iter_mut() {
        let sx = window.x0 + x as f64 * x_step;
        let sy = window.y0 + y as f64 * y_step;
        *v = module.evaluate(sx, sy) as f32;
    }
    raster
}

/// Sample and rescale to [0, 1] in one step.
pub fn sample_plane_normalized(
    module: &NoiseModule,
    window: SampleWindow,
    dims: Dimensions,
) -> Raster<f32> {
    let mut raster = sample_plane(module, window, dims);
    raster.normalize();
    raster
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn test_sampling_is_deterministic() {
        let dims = Dimensions::new(16, 16);
        let a = sample_plane(&NoiseModule::perlin(99, 1.0, 4), SampleWindow::standard(), dims);
        let b = sample_plane(&NoiseModule::perlin(99, 1.0, 4), SampleWindow::standard(), dims);
        assert_eq!(a.data(), b.data());
    }

    #[test]
    fn test_different_seeds_differ() {
        let dims = Dimensions::new(16, 16);
        let a = sample_plane(&NoiseModule::perlin(1, 1.0, 4), SampleWindow::standard(), dims);
        let b = sample_plane(&NoiseModule::perlin(2, 1.0, 4), SampleWindow::standard(), dims);
        assert_ne!(a.data(), b.data());
    }

    #[test]
    fn test_normalized_sample_spans_unit_interval() {
        let dims = Dimensions::new(32, 32);
        let raster = sample_plane_normalized(
            &NoiseModule::perlin(7, 2.0, 4),
            SampleWindow::standard(),
            dims,
        );
        assert_abs_diff_eq!(raster.min_value(), 0.0, epsilon = 1e-6);
        assert_abs_diff_eq!(raster.max_value(), 1.0, epsilon = 1e-6);
    }

    #[test]
    fn test_scale_bias_shifts_output() {
        let module = NoiseModule::scale_bias(NoiseModule::perlin(3, 1.0, 1), 0.0, 0.25);
        assert_eq!(module.evaluate(0.3, 0.7), 0.25);
    }

    #[test]
    fn test_select_picks_inside_and_outside() {
        // Control is constant 0.25 via scale_bias; inside [0, 1] picks b.
        let control = NoiseModule::scale_bias(NoiseModule::perlin(5, 1.0, 1), 0.0, 0.25);
        let a = NoiseModule::scale_bias(NoiseModule::perlin(6, 1.0, 1), 0.0, -1.0);
        let b = NoiseModule::scale_bias(NoiseModule::perlin(7, 1.0, 1), 0.0, 1.0);
        let select = NoiseModule::select(a, b, control, 0.0, 1.0, 0.0);
        assert_eq!(select.evaluate(0.1, 0.9), 1.0);

        let control = NoiseModule::scale_bias(NoiseModule::perlin(5, 1.0, 1), 0.0, 2.0);
        let a = NoiseModule::scale_bias(NoiseModule::perlin(6, 1.0, 1), 0.0, -1.0);
        let b = NoiseModule::scale_bias(NoiseModule::perlin(7, 1.0, 1), 0.0, 1.0);
        let select = NoiseModule::select(a, b, control, 0.0, 1.0, 0.0);
        assert_eq!(select.evaluate(0.1, 0.9), -1.0);
    }

    #[test]
    fn test_multiply_combines_operands() {
        let a = NoiseModule::scale_bias(NoiseModule::perlin(1, 1.0, 1), 0.0, 0.5);
        let b = NoiseModule::scale_bias(NoiseModule::perlin(2, 1.0, 1), 0.0, 0.5);
        let product = NoiseModule::multiply(a, b);
        assert_eq!(product.evaluate(0.0, 0.0), 0.25);
    }
}
