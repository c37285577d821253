mod cache;
mod cancel;
mod config;
mod path;
mod tail;
mod transcript;

pub use cache::MtimeCache;
pub use cancel::CancelToken;
pub use config::TokenConfig;
pub use path::expand_tilde;
pub use tail::{last_line, last_lines};
pub use transcript::{Record, last_matching, parse_all, stream};
