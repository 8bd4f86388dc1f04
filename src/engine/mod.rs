//! Execution engine for driftwood
//!
//! The engine orchestrates:
//! 1. Session - wiring the registry, remote client and state store together
//! 2. Planning - refreshing tracked objects, then diffing the configuration
//! 3. Rendering - showing per-object plans
//! 4. Executing - confirming and applying with progress

pub mod differ;
pub mod executor;
pub mod planner;
pub mod session;

pub use session::Session;
