mod info;
mod preview;
mod synth;

pub use info::cmd_info;
pub use preview::cmd_preview;
pub use synth::cmd_synth;
