//! Learning plan assistant core and its JSON-lines sidecar.
//!
//! [`catalog`] holds the read-only barrier/adjustment data, [`resolve`] picks
//! the adjustments for a barrier, and [`render`] turns a selected adjustment
//! into a progress-note comment or a plan sentence. [`roster`] is the optional
//! local class list. Everything else wires those to stdin/stdout.

pub mod backup;
pub mod catalog;
pub mod config;
pub mod db;
pub mod error;
pub mod ipc;
pub mod logging;
pub mod render;
pub mod resolve;
pub mod roster;
