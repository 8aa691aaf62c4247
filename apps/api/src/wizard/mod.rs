// Wizard core: step graph, declarative validation, progress, the pure
// state machine, and per-session dispatch.

pub mod handlers;
pub mod progress;
pub mod schema;
pub mod session;
pub mod steps;
pub mod store;
pub mod validation;
