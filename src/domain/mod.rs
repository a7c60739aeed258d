//! Domain layer - pure types with no I/O.
//!
//! - `foundation` - identifiers, validation and auth errors, `StateMachine`
//! - `query` - patient questions, their lifecycle and results

pub mod foundation;
pub mod query;
