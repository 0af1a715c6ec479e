//! Lock-free meter snapshot publishing (spec §4.C, §5: "Reads are
//! lock-free via an atomic-swapped snapshot pair"). The audio thread
//! publishes an immutable [`MeterSnapshot`] at the end of every block;
//! any number of reader threads load the current one without blocking the
//! writer.

use arc_swap::ArcSwap;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Immutable point-in-time readout of everything metered on one bus or
/// stream. Cheap to clone (small, `Copy`-able fields only), and
/// serializable so a host UI can ship it over IPC to an out-of-process
/// meter bridge.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MeterSnapshot {
    pub peak: f32,
    pub peak_hold: f32,
    pub clipped: bool,
    pub rms: f64,
    pub correlation: f64,
    pub momentary_lufs: f64,
    pub short_term_lufs: f64,
    pub integrated_lufs: f64,
    pub loudness_range: f64,
    pub true_peak_dbfs: f64,
}

impl Default for MeterSnapshot {
    fn default() -> Self {
        Self {
            peak: 0.0,
            peak_hold: 0.0,
            clipped: false,
            rms: 0.0,
            correlation: 0.0,
            momentary_lufs: -70.0,
            short_term_lufs: -70.0,
            integrated_lufs: -70.0,
            loudness_range: 0.0,
            true_peak_dbfs: -70.0,
        }
    }
}

/// One audio-thread writer, many-reader handle over the current snapshot.
#[derive(Clone)]
pub struct SnapshotPublisher {
    current: Arc<ArcSwap<MeterSnapshot>>,
}

impl Default for SnapshotPublisher {
    fn default() -> Self {
        Self::new()
    }
}

impl SnapshotPublisher {
    pub fn new() -> Self {
        Self { current: Arc::new(ArcSwap::from_pointee(MeterSnapshot::default())) }
    }

    /// Audio thread: publish a new snapshot. Never blocks, never
    /// allocates beyond the one `Arc` for the new value.
    pub fn publish(&self, snapshot: MeterSnapshot) {
        self.current.store(Arc::new(snapshot));
    }

    /// Any thread: read the most recently published snapshot.
    pub fn read(&self) -> MeterSnapshot {
        **self.current.load()
    }

    pub fn reader(&self) -> SnapshotReader {
        SnapshotReader { current: self.current.clone() }
    }
}

/// A read-only handle cloned out to UI/meter-display consumers.
#[derive(Clone)]
pub struct SnapshotReader {
    current: Arc<ArcSwap<MeterSnapshot>>,
}

impl SnapshotReader {
    pub fn read(&self) -> MeterSnapshot {
        **self.current.load()
    }
}
