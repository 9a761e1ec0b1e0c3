//! Filesystem-backed client profile storage.

mod kv;

pub use kv::JsonFileKvStore;
