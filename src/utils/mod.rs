pub mod fs_atomic;
pub mod merge;
pub mod redact;
pub mod suggest;
pub mod user_paths;
