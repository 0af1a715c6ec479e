//! The effect-chain seam (spec §4.G step 4). An effect processes a working
//! buffer in place and reports the latency it introduces so the bus (and
//! in turn the manager) can fold it into plugin delay compensation.

use daw_core::AudioBuffer;

pub trait Effect: Send {
    /// Process `N` frames in place. `block_start_time` is the transport
    /// position in samples at the start of this block.
    fn process(&mut self, buffer: &mut AudioBuffer, block_start_time: u64);

    /// Latency introduced by this effect, in samples. Queried once per
    /// routing change so the manager can resize PDC delay lines elsewhere
    /// in the graph.
    fn latency_samples(&self) -> usize {
        0
    }

    /// Notified when the slot's bypass state changes, so effects that
    /// hold internal state (e.g. a delay line or an envelope) can reset
    /// or freeze it rather than being silently skipped mid-tail.
    fn bypass(&mut self, _bypassed: bool) {}

    fn name(&self) -> &str {
        "effect"
    }
}

/// A single slot in a bus's effect chain: the effect plus whether it is
/// currently bypassed (spec §4.G "non-bypassed effect").
pub struct EffectSlot {
    pub effect: Box<dyn Effect>,
    pub bypassed: bool,
}

impl EffectSlot {
    pub fn new(effect: Box<dyn Effect>) -> Self {
        Self { effect, bypassed: false }
    }
}

#[derive(Default)]
pub struct EffectChain {
    slots: Vec<EffectSlot>,
}

impl EffectChain {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, effect: Box<dyn Effect>) {
        self.slots.push(EffectSlot::new(effect));
    }

    pub fn remove(&mut self, index: usize) -> Option<EffectSlot> {
        if index < self.slots.len() {
            Some(self.slots.remove(index))
        } else {
            None
        }
    }

    pub fn set_bypassed(&mut self, index: usize, bypassed: bool) {
        if let Some(slot) = self.slots.get_mut(index) {
            slot.bypassed = bypassed;
            slot.effect.bypass(bypassed);
        }
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Sum of every non-bypassed effect's reported latency (spec §4.G:
    /// "effects...report their own latency, which the manager sums into
    /// the bus's PDC before mixdown").
    pub fn total_latency_samples(&self) -> usize {
        self.slots.iter().filter(|s| !s.bypassed).map(|s| s.effect.latency_samples()).sum()
    }

    pub fn process(&mut self, buffer: &mut AudioBuffer, block_start_time: u64) {
        for slot in &mut self.slots {
            if !slot.bypassed {
                slot.effect.process(buffer, block_start_time);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct GainHalver;
    impl Effect for GainHalver {
        fn process(&mut self, buffer: &mut AudioBuffer, _block_start_time: u64) {
            for ch in 0..buffer.channel_count() {
                for s in buffer.channel_mut(ch) {
                    *s *= 0.5;
                }
            }
        }
        fn latency_samples(&self) -> usize {
            7
        }
    }

    struct BypassCounter {
        bypass_calls: std::sync::Arc<std::sync::atomic::AtomicUsize>,
    }
    impl Effect for BypassCounter {
        fn process(&mut self, _buffer: &mut AudioBuffer, _block_start_time: u64) {}
        fn bypass(&mut self, _bypassed: bool) {
            self.bypass_calls.fetch_add(1, std::sync::atomic::Ordering::Relaxed);
        }
    }

    #[test]
    fn bypassed_effects_are_skipped() {
        let mut chain = EffectChain::new();
        chain.push(Box::new(GainHalver));
        chain.set_bypassed(0, true);

        let mut buf = AudioBuffer::new(1, 4);
        buf.channel_mut(0).copy_from_slice(&[1.0, 1.0, 1.0, 1.0]);
        chain.process(&mut buf, 0);
        assert_eq!(buf.channel(0), &[1.0, 1.0, 1.0, 1.0]);
        assert_eq!(chain.total_latency_samples(), 0);
    }

    #[test]
    fn active_effect_applies_and_reports_latency() {
        let mut chain = EffectChain::new();
        chain.push(Box::new(GainHalver));

        let mut buf = AudioBuffer::new(1, 2);
        buf.channel_mut(0).copy_from_slice(&[2.0, 2.0]);
        chain.process(&mut buf, 0);
        assert_eq!(buf.channel(0), &[1.0, 1.0]);
        assert_eq!(chain.total_latency_samples(), 7);
    }

    #[test]
    fn set_bypassed_notifies_the_effect() {
        let counter = std::sync::Arc::new(std::sync::atomic::AtomicUsize::new(0));
        let mut chain = EffectChain::new();
        chain.push(Box::new(BypassCounter { bypass_calls: counter.clone() }));

        chain.set_bypassed(0, true);
        chain.set_bypassed(0, false);
        assert_eq!(counter.load(std::sync::atomic::Ordering::Relaxed), 2);
    }
}
