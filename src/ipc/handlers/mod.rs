pub mod adjustments;
pub mod backup;
pub mod catalog;
pub mod comments;
pub mod core;
pub mod plans;
pub mod roster;
pub mod setup;
