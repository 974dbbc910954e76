//! User-facing parameter control for a running session.

use rtrb::Producer;
use tracing::{debug, trace};

use crate::config::InitialParams;
use crate::graph::NodeHandle;
use crate::nodes::{FilterMessage, GainMessage};
use crate::param::{Parameter, CUTOFF, RESONANCE, VOLUME, WET, WIDTH};
use crate::protocol::EngineParams;
use crate::spectrum::SpectrumAnalyser;

#[derive(Clone, Copy, Debug, Default)]
struct Pending {
    engine: bool,
    cutoff: bool,
    resonance: bool,
    volume: bool,
}

impl Pending {
    fn any(&self) -> bool {
        self.engine || self.cutoff || self.resonance || self.volume
    }
}

/// Validates parameter changes and routes them to the engine or to the
/// chain node that owns them.
///
/// `wet` and `width` go to the render engine and apply to the next rendered
/// block. `cutoff` and `resonance` glide on the filter. `volume` is applied
/// by the gain node at the start of the next quantum.
///
/// Out-of-range or non-finite values are refused and leave the previous
/// value in place. An accepted value whose queue is momentarily full is sent
/// again by the next setter call or by [`flush`](Self::flush).
pub struct GraphController {
    wet: Parameter,
    width: Parameter,
    cutoff: Parameter,
    resonance: Parameter,
    volume: Parameter,
    filter: Option<NodeHandle<FilterMessage>>,
    gain: NodeHandle<GainMessage>,
    engine: Producer<EngineParams>,
    analyser: SpectrumAnalyser,
    pending: Pending,
}

impl GraphController {
    /// The filter and gain nodes must already have been built with `initial`;
    /// only the engine parameters are sent from here.
    pub fn new(
        initial: InitialParams,
        filter: Option<NodeHandle<FilterMessage>>,
        gain: NodeHandle<GainMessage>,
        engine: Producer<EngineParams>,
        analyser: SpectrumAnalyser,
    ) -> Self {
        let mut controller = Self {
            wet: Parameter::new(&WET, initial.wet),
            width: Parameter::new(&WIDTH, initial.width),
            cutoff: Parameter::new(&CUTOFF, initial.cutoff),
            resonance: Parameter::new(&RESONANCE, initial.resonance),
            volume: Parameter::new(&VOLUME, initial.volume),
            filter,
            gain,
            engine,
            analyser,
            pending: Pending {
                engine: true,
                ..Pending::default()
            },
        };
        controller.flush();
        controller
    }

    pub fn set_wet(&mut self, wet: f32) -> bool {
        if !accept(&mut self.wet, wet) {
            return false;
        }
        self.pending.engine = true;
        self.flush();
        true
    }

    pub fn set_width(&mut self, width: f32) -> bool {
        if !accept(&mut self.width, width) {
            return false;
        }
        self.pending.engine = true;
        self.flush();
        true
    }

    /// Without a filter in the chain the value is stored but has no audible
    /// effect.
    pub fn set_cutoff(&mut self, hz: f32) -> bool {
        if !accept(&mut self.cutoff, hz) {
            return false;
        }
        self.pending.cutoff = true;
        self.flush();
        true
    }

    pub fn set_resonance(&mut self, q: f32) -> bool {
        if !accept(&mut self.resonance, q) {
            return false;
        }
        self.pending.resonance = true;
        self.flush();
        true
    }

    pub fn set_volume(&mut self, volume: f32) -> bool {
        if !accept(&mut self.volume, volume) {
            return false;
        }
        self.pending.volume = true;
        self.flush();
        true
    }

    #[inline]
    pub fn wet(&self) -> f32 {
        self.wet.get()
    }

    #[inline]
    pub fn width(&self) -> f32 {
        self.width.get()
    }

    #[inline]
    pub fn cutoff(&self) -> f32 {
        self.cutoff.get()
    }

    #[inline]
    pub fn resonance(&self) -> f32 {
        self.resonance.get()
    }

    #[inline]
    pub fn volume(&self) -> f32 {
        self.volume.get()
    }

    #[inline]
    pub fn has_filter(&self) -> bool {
        self.filter.is_some()
    }

    /// Accepted values still waiting for queue space.
    #[inline]
    pub fn has_pending(&self) -> bool {
        self.pending.any()
    }

    pub fn spectrum(&mut self) -> &mut SpectrumAnalyser {
        &mut self.analyser
    }

    /// Retry every accepted value that has not reached its queue yet.
    /// Returns `true` once nothing is left pending.
    pub fn flush(&mut self) -> bool {
        if self.pending.engine {
            let params = EngineParams {
                wet: self.wet.get(),
                width: self.width.get(),
            };
            self.pending.engine = self.engine.push(params).is_err();
        }

        match self.filter.as_mut() {
            Some(filter) => {
                if self.pending.cutoff {
                    self.pending.cutoff = filter
                        .send(FilterMessage::SetCutoff(self.cutoff.get()))
                        .is_err();
                }
                if self.pending.resonance {
                    self.pending.resonance = filter
                        .send(FilterMessage::SetResonance(self.resonance.get()))
                        .is_err();
                }
            }
            None => {
                self.pending.cutoff = false;
                self.pending.resonance = false;
            }
        }

        if self.pending.volume {
            self.pending.volume = self
                .gain
                .send(GainMessage::SetGain(self.volume.get()))
                .is_err();
        }

        if self.pending.any() {
            trace!(pending = ?self.pending, "control queues full, will retry");
        }
        !self.pending.any()
    }
}

fn accept(param: &mut Parameter, value: f32) -> bool {
    let accepted = param.set(value);
    if !accepted {
        let spec = param.spec();
        debug!(
            param = spec.name,
            value,
            range = spec.range_label,
            "parameter value rejected"
        );
    }
    accepted
}
