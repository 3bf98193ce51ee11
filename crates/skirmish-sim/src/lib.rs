//! Turn-resolution engine for SKIRMISH.
//!
//! Owns the hecs ECS world, sequences the Command → Simulation → TurnEnd
//! cycle, executes queued fire in spin-up volleys, drives simultaneous
//! movement and resolves heat and cooldowns between turns. Headless and
//! single-threaded; the host calls `TurnEngine::tick` from its update loop.

pub mod bus;
pub mod engine;
pub mod error;
pub mod ids;
pub mod phase;
pub mod systems;
pub mod timer;
pub mod world_setup;

pub use engine::TurnEngine;
pub use skirmish_core as core;

#[cfg(test)]
mod tests;
