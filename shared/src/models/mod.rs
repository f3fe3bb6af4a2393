//! Domain models for the Port Stock Management Platform

mod dispatch;
mod mouvement;
mod reconciliation;
mod rotation;

pub use dispatch::*;
pub use mouvement::*;
pub use reconciliation::*;
pub use rotation::*;
