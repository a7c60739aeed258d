//! Foundation types shared across the domain: identifiers, errors and the
//! state machine trait.

mod auth;
mod errors;
mod ids;
mod state_machine;

pub use auth::AuthError;
pub use errors::ValidationError;
pub use ids::{SessionId, UserId};
pub use state_machine::StateMachine;
