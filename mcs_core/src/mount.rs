//! The per-mount tracking loop: demand slots, optional trajectory shaping
//! and the buffer-swap sequencer behind one handle.

use mcs_traits::{Axis, AxisReadback, TimeSource};

use crate::config::LoopCfg;
use crate::diagnostics::Diagnostics;
use crate::ingest::{DemandSample, DemandSlots, Ingested};
use crate::sequencer::{AxisPhase, BufferSwapSequencer, CycleInput, CycleOutput};
use crate::shaper::TrajectoryShaper;
use crate::state::AxisPair;

pub struct MountLoop {
    pub(crate) cfg: LoopCfg,
    pub(crate) slots: DemandSlots,
    pub(crate) shaper: Option<TrajectoryShaper>,
    pub(crate) sequencer: BufferSwapSequencer,
    pub(crate) diagnostics: Diagnostics,
    pub(crate) time: Box<dyn TimeSource + Send>,
}

impl core::fmt::Debug for MountLoop {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("MountLoop")
            .field("demands", &self.slots.count())
            .field("recent", &self.slots.recent())
            .field("shaping", &self.shaper.is_some())
            .field("azimuth", &self.sequencer.phase(Axis::Azimuth))
            .field("elevation", &self.sequencer.phase(Axis::Elevation))
            .finish()
    }
}

impl MountLoop {
    /// Start building a `MountLoop`.
    pub fn builder() -> crate::builder::MountLoopBuilder<crate::builder::Missing> {
        crate::builder::MountLoopBuilder::default()
    }

    pub fn cfg(&self) -> &LoopCfg {
        &self.cfg
    }

    pub fn slots(&self) -> &DemandSlots {
        &self.slots
    }

    pub fn sequencer(&self) -> &BufferSwapSequencer {
        &self.sequencer
    }

    #[inline]
    pub fn phase(&self, axis: Axis) -> AxisPhase {
        self.sequencer.phase(axis)
    }

    /// Store one demand, shaping it first when the limiter is enabled.
    pub fn ingest(
        &mut self,
        sample: DemandSample,
        follow: bool,
        feedback: &AxisPair<AxisReadback>,
    ) -> Ingested {
        let ingested = self.slots.ingest(sample);
        if let Some(shaper) = &self.shaper {
            let current = feedback.map(|r| r.position);
            shaper.shape(
                self.slots.slots_mut(),
                ingested.written,
                follow,
                current,
                self.sequencer.fit_states_mut(),
                &self.diagnostics,
            );
        }
        ingested
    }

    /// Run one scan cycle against the current slots.
    ///
    /// Before the first demand arrives the slots are all zero, which the
    /// sequencer reports as `NotConnected`.
    pub fn cycle(&mut self, follow: bool, feedback: &AxisPair<AxisReadback>) -> CycleOutput {
        let recent = self.slots.recent().unwrap_or(0);
        let input = CycleInput {
            slots: self.slots.slots(),
            recent: recent as i64,
            follow,
            feedback: *feedback,
        };
        self.sequencer.cycle(&input, self.time.as_ref())
    }
}
