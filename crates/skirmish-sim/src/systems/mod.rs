//! Systems that operate on the simulation world.
//!
//! Free functions take `&mut World` (or `&World` for read-only work). The
//! few systems that span several steps (movement join, volley run, turn-end
//! totals) keep that state in a small owned struct held by the engine.

pub mod arc_prediction;
pub mod fire_queue;
pub mod movement;
pub mod resources;
pub mod snapshot;
pub mod turn_end;
