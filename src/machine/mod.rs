// Pure state machines for bids and offers. Transitions never touch the
// store; they return the updated entity plus side-effect instructions for
// the negotiation service to execute.

pub mod bid;
pub mod offer;

use crate::domain::ShowSource;

/// Side effects a transition asks the orchestrator to carry out.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Effect {
    /// Thaw every sibling frozen by this bid's hold.
    ReleaseFrozenSiblings,
    /// Decline all other active bids on the same request.
    DeclineSiblings { reason: String },
    /// Materialize the confirmed show.
    CreateShow { source: ShowSource },
    /// Close the parent show request.
    CloseRequest,
    /// Retire the synthetic wrapper request around a withdrawn offer/bid.
    RetireSyntheticRequest,
}

/// Result of a legal transition: the entity in its new state and the
/// effects to apply.
#[derive(Debug, Clone)]
pub struct Transition<T> {
    pub entity: T,
    pub effects: Vec<Effect>,
}

impl<T> Transition<T> {
    pub fn new(entity: T) -> Self {
        Self {
            entity,
            effects: Vec::new(),
        }
    }

    pub fn with_effect(mut self, effect: Effect) -> Self {
        self.effects.push(effect);
        self
    }
}
