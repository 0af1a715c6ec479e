//! daw-fileio: bit-exact WAV/AIFF writers and filename templating
//! (spec §4.I).

mod aiff;
mod format;
mod template;
mod wav;
mod writer;

pub use aiff::AiffWriter;
pub use format::AudioFormat;
pub use template::{default_variables, process_template, sanitize_filename};
pub use wav::WavWriter;
pub use writer::AudioFileWriter;
