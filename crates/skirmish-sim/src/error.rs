//! Errors returned by engine operations.

use skirmish_core::enums::TurnPhase;
use skirmish_core::events::{AbilityRejection, FireRejection};
use skirmish_core::types::EntityId;

/// Errors that can occur when driving the engine.
///
/// None of these are fatal; the engine state is unchanged when one is
/// returned.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum TurnError {
    /// The operation is only valid in another phase.
    #[error("operation requires the {expected:?} phase, engine is in {actual:?}")]
    WrongPhase {
        expected: TurnPhase,
        actual: TurnPhase,
    },

    /// A turn end is already being resolved.
    #[error("turn end already in progress")]
    TurnEndInProgress,

    /// The referenced entity does not exist.
    #[error("unknown entity {0:?}")]
    UnknownEntity(EntityId),

    /// The fire queue refused the intent.
    #[error("fire rejected: {0}")]
    Fire(#[from] FireRejection),

    /// The ability could not be activated.
    #[error("ability rejected: {0}")]
    Ability(#[from] AbilityRejection),
}
