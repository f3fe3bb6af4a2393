//! Business logic services for the Port Stock Management Platform

pub mod allocation;
pub mod dispatch;
pub mod livraison;
pub mod mouvement;
pub mod reconciliation;
pub mod referentiel;
pub mod rotation;
pub mod stock;

pub use allocation::AllocationService;
pub use dispatch::DispatchService;
pub use livraison::LivraisonService;
pub use mouvement::MouvementService;
pub use reconciliation::ReconciliationService;
pub use referentiel::ReferentielService;
pub use rotation::RotationService;
pub use stock::StockService;
