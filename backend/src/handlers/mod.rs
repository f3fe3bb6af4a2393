//! HTTP handlers for the Port Stock Management Platform

mod dispatches;
mod health;
mod livraisons;
mod mouvements;
mod rapports;
mod rotations;
mod stock;

pub use dispatches::*;
pub use health::*;
pub use livraisons::*;
pub use mouvements::*;
pub use rapports::*;
pub use rotations::*;
pub use stock::*;
