//! Simulation constants and default tuning parameters.

/// Fixed step rate (Hz) used by `TurnEngine::tick`.
pub const TICK_RATE: u32 = 30;

/// Seconds per fixed step.
pub const DT: f64 = 1.0 / TICK_RATE as f64;

// --- Turn timing ---

/// Default wall-clock length of the Simulation phase (seconds).
pub const SIMULATION_DURATION_SECS: f64 = 3.0;

/// Default share of the Simulation phase spent in movement.
pub const MOVEMENT_FRACTION: f64 = 0.5;

/// Default share of the Simulation phase spent firing.
pub const WEAPON_FIRING_FRACTION: f64 = 0.3;

/// Default share of the Simulation phase spent on projectile travel.
pub const PROJECTILE_TRAVEL_FRACTION: f64 = 0.2;

/// Allowed slack when checking that stage fractions sum to one.
pub const STAGE_FRACTION_TOLERANCE: f64 = 1e-3;

// --- Heat ---

/// Max heat the reference tier thresholds are expressed against.
pub const REFERENCE_MAX_HEAT: f64 = 150.0;

/// Activation ceiling as a multiple of max heat.
pub const ACTIVATION_CEILING_FACTOR: f64 = 2.0;

/// Heat removed from every ship at turn end before radiators.
pub const BASE_DISSIPATION: f64 = 10.0;

/// Extra dissipation per operational radiator (half when damaged).
pub const RADIATOR_BONUS: f64 = 5.0;

/// Smallest heat change worth a notification.
pub const HEAT_NOTIFY_EPSILON: f64 = 0.01;

// --- Fire control ---

/// Pause after a spin-up group's delay before the next group starts (seconds).
pub const VOLLEY_SETTLE_MARGIN_SECS: f64 = 0.1;

/// Resolution of the spin-up grouping key (seconds).
pub const SPIN_UP_QUANTUM_SECS: f64 = 0.001;

/// Trajectory samples for arc prediction.
pub const PREDICTION_SAMPLES: u32 = 10;

/// Trajectory samples for firing-window enumeration.
pub const WINDOW_SAMPLES: u32 = 20;
