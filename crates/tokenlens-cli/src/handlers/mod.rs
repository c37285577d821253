pub mod context;
pub mod sessions;
pub mod show;
