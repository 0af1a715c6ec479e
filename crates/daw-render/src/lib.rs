//! daw-render: offline render engine. Master mix and stem rendering
//! through the live bus graph, loudness-normalized and true-peak
//! limited post-processing, and EBU R128/BS.1770-4 analysis of the
//! finished file (spec §4.I), built on a dedicated worker-thread queue
//! rather than a work-stealing pool so cancellation can be cooperative
//! within a single job.
//!
//! ```text
//! RenderQueue::submit(config) -> RenderJobHandle
//!        |
//!        v
//! worker thread: pipeline::process_render_job
//!        |
//!        +-- render_region   (pull BusManager::process_block in chunks)
//!        +-- post_process    (resample -> normalize -> limit)
//!        +-- write_output    (daw-fileio WAV/AIFF writer)
//!        +-- analyze_render  (RenderAnalysis)
//! ```

mod analyze;
mod error;
mod job;
mod limiter;
mod pipeline;
mod queue;
mod resample;
mod stems;

pub use analyze::analyze_render;
pub use error::{RenderError, RenderResult};
pub use job::{
    next_job_id, RenderAnalysis, RenderJobConfig, RenderJobHandle, RenderJobId, RenderJobStatus, RenderMetadata, RenderOutcome,
    RenderProgress,
};
pub use limiter::{exceeds_true_peak_ceiling, BrickWallLimiter};
pub use pipeline::{default_format_for_extension, process_render_job};
pub use queue::RenderQueue;
pub use resample::resample_channels;
pub use stems::{render_stems, render_timestamp_now, StemsJobConfig};
