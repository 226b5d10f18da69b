// Platform helpers shared by the settings store
//
// File writes go through `common::atomic_write_private` so the settings file
// (which holds the app password) is never partially written or world-readable.

pub mod common;
