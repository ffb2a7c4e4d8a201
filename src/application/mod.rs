pub mod bootstrap;
pub mod commands;
pub mod reconcile;
pub mod recorder;
pub mod timer;
