// Engine layer - classifies transcript records, manufactures operations,
// and correlates them into ordered bundles for the CLI/statusline.

mod classify;
mod correlate;
mod factory;
mod subagent;

pub use classify::{MessageKind, classify};
pub use correlate::{reconstruct_session, reconstruct_transcript};
pub use factory::summarize_tool;
