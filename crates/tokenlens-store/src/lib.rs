mod kv;
mod reader;

pub use kv::{KvRead, RedisStore};
pub use reader::{HookOperation, HookRequest, HookResponse, session_operations};
