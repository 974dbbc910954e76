//! Control parameters: declared ranges, validated values, and the
//! exponential ramp used to move smoothed parameters without stepping.

/// How a parameter change reaches the audio.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Application {
    /// Takes effect at the start of the next block.
    Immediate,
    /// Approaches the target exponentially with this time constant (seconds).
    Smoothed { time_constant: f32 },
}

/// Static description of a parameter.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ParamSpec {
    pub name: &'static str,
    pub min: f32,
    pub max: f32,
    pub default: f32,
    pub application: Application,
    pub(crate) range_label: &'static str,
}

impl ParamSpec {
    /// Finite and inside `[min, max]`.
    #[inline]
    pub fn accepts(&self, value: f32) -> bool {
        value.is_finite() && value >= self.min && value <= self.max
    }
}

/// Time constant shared by the filter parameters.
pub const FILTER_TIME_CONSTANT: f32 = 0.01;

/// Effect mix, forwarded to the render engine.
pub const WET: ParamSpec = ParamSpec {
    name: "wet",
    min: 0.0,
    max: 1.0,
    default: 0.55,
    application: Application::Immediate,
    range_label: "0..=1",
};

/// Stereo width, forwarded to the render engine.
pub const WIDTH: ParamSpec = ParamSpec {
    name: "width",
    min: 0.0,
    max: 1.0,
    default: 0.9,
    application: Application::Immediate,
    range_label: "0..=1",
};

/// Low-pass cutoff in Hz.
pub const CUTOFF: ParamSpec = ParamSpec {
    name: "cutoff",
    min: 20.0,
    max: 20_000.0,
    default: 20_000.0,
    application: Application::Smoothed {
        time_constant: FILTER_TIME_CONSTANT,
    },
    range_label: "20..=20000",
};

/// Low-pass resonance (Q).
pub const RESONANCE: ParamSpec = ParamSpec {
    name: "resonance",
    min: 0.0001,
    max: 24.0,
    default: core::f32::consts::FRAC_1_SQRT_2,
    application: Application::Smoothed {
        time_constant: FILTER_TIME_CONSTANT,
    },
    range_label: "0.0001..=24",
};

/// Output gain.
pub const VOLUME: ParamSpec = ParamSpec {
    name: "volume",
    min: 0.0,
    max: 1.0,
    default: 1.0,
    application: Application::Immediate,
    range_label: "0..=1",
};

/// A validated parameter value. Always finite and in range.
#[derive(Clone, Copy, Debug)]
pub struct Parameter {
    spec: &'static ParamSpec,
    value: f32,
}

impl Parameter {
    /// Starts at `initial` if acceptable, otherwise at the declared default.
    pub fn new(spec: &'static ParamSpec, initial: f32) -> Self {
        let value = if spec.accepts(initial) {
            initial
        } else {
            spec.default
        };
        Self { spec, value }
    }

    /// Store `value` if the spec accepts it. Returns whether it was stored.
    pub fn set(&mut self, value: f32) -> bool {
        if !self.spec.accepts(value) {
            return false;
        }
        self.value = value;
        true
    }

    #[inline]
    pub fn get(&self) -> f32 {
        self.value
    }

    #[inline]
    pub fn spec(&self) -> &'static ParamSpec {
        self.spec
    }
}

/// One-pole exponential approach toward a target, advanced per sample.
///
/// After `time_constant` seconds the remaining distance has shrunk to 1/e.
/// Once within `SNAP` of the target the value lands on it exactly.
#[derive(Clone, Copy, Debug)]
pub struct Ramp {
    current: f32,
    target: f32,
    coeff: f32,
}

impl Ramp {
    const SNAP: f32 = 1e-4;

    pub fn new(value: f32) -> Self {
        Self {
            current: value,
            target: value,
            coeff: 0.0,
        }
    }

    /// Set the per-sample coefficient from a time constant.
    pub fn with_time_constant(mut self, time_constant: f32, sample_rate: u32) -> Self {
        self.set_time_constant(time_constant, sample_rate);
        self
    }

    pub fn set_time_constant(&mut self, time_constant: f32, sample_rate: u32) {
        let samples = time_constant * sample_rate as f32;
        self.coeff = if samples > 0.0 {
            (-1.0 / samples).exp()
        } else {
            0.0
        };
    }

    #[inline]
    pub fn set_target(&mut self, target: f32) {
        self.target = target;
    }

    /// Jump to `value` with no ramp.
    #[inline]
    pub fn reset(&mut self, value: f32) {
        self.current = value;
        self.target = value;
    }

    #[inline]
    pub fn is_settled(&self) -> bool {
        self.current == self.target
    }

    #[inline]
    pub fn current(&self) -> f32 {
        self.current
    }

    #[inline]
    pub fn target(&self) -> f32 {
        self.target
    }

    /// Advance one sample and return the new value.
    #[inline]
    pub fn tick(&mut self) -> f32 {
        if self.current != self.target {
            self.current = self.target + self.coeff * (self.current - self.target);
            if (self.current - self.target).abs() <= Self::SNAP * self.target.abs().max(1.0) {
                self.current = self.target;
            }
        }
        self.current
    }
}
