//! Typed event bus.
//!
//! Every event is recorded in an outbox (drained into each snapshot) and
//! pushed to registered subscribers at the moment it is emitted.
//! Subscribers that register mid-turn only see events from that point on;
//! missed events are not replayed.

use std::fmt;
use std::sync::{Arc, Mutex};

use tracing::warn;

use skirmish_core::enums::SimulationStage;
use skirmish_core::events::TurnEvent;

/// Listener for engine events. Every method defaults to a no-op, so
/// implementors override only what they care about.
///
/// The phase hooks mirror the broadcast order: `on_turn_start` →
/// `on_command_phase_start` → `on_simulation_phase_start` →
/// `on_simulation_progress`* → `on_simulation_phase_end` → `on_turn_end`.
pub trait TurnEventSubscriber {
    fn on_turn_start(&mut self, _turn: u32) {}
    fn on_command_phase_start(&mut self) {}
    fn on_simulation_phase_start(&mut self, _duration_secs: f64) {}
    fn on_simulation_progress(&mut self, _fraction: f64) {}
    fn on_stage_changed(&mut self, _stage: SimulationStage) {}
    fn on_simulation_phase_end(&mut self) {}
    fn on_turn_end(&mut self, _completed_turn: u32) {}

    /// Called for every event, including fire, movement and resource
    /// notifications, before the phase hook for that event.
    fn on_event(&mut self, _event: &TurnEvent) {}
}

/// Shared handle to a subscriber.
pub type SharedSubscriber = Arc<Mutex<dyn TurnEventSubscriber + Send>>;

#[derive(Default)]
pub struct EventBus {
    subscribers: Vec<SharedSubscriber>,
    outbox: Vec<TurnEvent>,
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a subscriber. Registering the same handle twice is a no-op;
    /// returns whether it was newly added.
    pub fn subscribe(&mut self, subscriber: SharedSubscriber) -> bool {
        if self.position_of(&subscriber).is_some() {
            return false;
        }
        self.subscribers.push(subscriber);
        true
    }

    /// Remove a subscriber; returns whether it was registered.
    pub fn unsubscribe(&mut self, subscriber: &SharedSubscriber) -> bool {
        match self.position_of(subscriber) {
            Some(index) => {
                self.subscribers.remove(index);
                true
            }
            None => false,
        }
    }

    pub fn subscriber_count(&self) -> usize {
        self.subscribers.len()
    }

    /// Deliver an event to every subscriber and record it in the outbox.
    pub fn emit(&mut self, event: TurnEvent) {
        for subscriber in &self.subscribers {
            match subscriber.lock() {
                Ok(mut guard) => dispatch(&mut *guard, &event),
                Err(_) => warn!(?event, "subscriber lock poisoned, event skipped"),
            }
        }
        self.outbox.push(event);
    }

    /// Events emitted since the last drain.
    pub fn pending(&self) -> &[TurnEvent] {
        &self.outbox
    }

    pub fn drain(&mut self) -> Vec<TurnEvent> {
        std::mem::take(&mut self.outbox)
    }

    fn position_of(&self, subscriber: &SharedSubscriber) -> Option<usize> {
        self.subscribers
            .iter()
            .position(|s| std::ptr::addr_eq(Arc::as_ptr(s), Arc::as_ptr(subscriber)))
    }
}

fn dispatch(subscriber: &mut (dyn TurnEventSubscriber + Send), event: &TurnEvent) {
    subscriber.on_event(event);
    match event {
        TurnEvent::TurnStart { turn } => subscriber.on_turn_start(*turn),
        TurnEvent::CommandPhaseStart => subscriber.on_command_phase_start(),
        TurnEvent::SimulationPhaseStart { duration_secs } => {
            subscriber.on_simulation_phase_start(*duration_secs)
        }
        TurnEvent::SimulationProgress { fraction } => subscriber.on_simulation_progress(*fraction),
        TurnEvent::StageChanged { stage } => subscriber.on_stage_changed(*stage),
        TurnEvent::SimulationPhaseEnd => subscriber.on_simulation_phase_end(),
        TurnEvent::TurnEnd { turn } => subscriber.on_turn_end(*turn),
        _ => {}
    }
}

impl fmt::Debug for EventBus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventBus")
            .field("subscribers", &self.subscribers.len())
            .field("outbox", &self.outbox)
            .finish()
    }
}
