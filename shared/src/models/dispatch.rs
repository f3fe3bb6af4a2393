//! Dispatch models and aggregate-state rules

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Lifecycle status of a dispatch
///
/// A dispatch starts `en_attente`, becomes `en_cours` when a first rotation
/// departs, and `termine` once every live rotation reached a terminal state
/// with the full quantity allocated. `annule` is only reachable before any
/// rotation exists.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DispatchStatut {
    EnAttente,
    EnCours,
    Termine,
    Annule,
}

impl DispatchStatut {
    pub fn as_str(&self) -> &'static str {
        match self {
            DispatchStatut::EnAttente => "en_attente",
            DispatchStatut::EnCours => "en_cours",
            DispatchStatut::Termine => "termine",
            DispatchStatut::Annule => "annule",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "en_attente" => Some(DispatchStatut::EnAttente),
            "en_cours" => Some(DispatchStatut::EnCours),
            "termine" => Some(DispatchStatut::Termine),
            "annule" => Some(DispatchStatut::Annule),
            _ => None,
        }
    }

    pub fn est_terminal(&self) -> bool {
        matches!(self, DispatchStatut::Termine | DispatchStatut::Annule)
    }
}

/// Progression of a dispatch against its allocated rotations
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProgressionDispatch {
    pub quantite_totale: Decimal,
    pub quantite_allouee: Decimal,
    pub reste_a_allouer: Decimal,
    pub progression: Decimal,
    pub nombre_rotations: i64,
}

impl ProgressionDispatch {
    pub fn calculer(quantite_totale: Decimal, quantite_allouee: Decimal, nombre_rotations: i64) -> Self {
        Self {
            quantite_totale,
            quantite_allouee,
            reste_a_allouer: quantite_totale - quantite_allouee,
            progression: progression_pourcentage(quantite_totale, quantite_allouee),
            nombre_rotations,
        }
    }
}

/// Percentage of the dispatch quantity already covered by rotations
pub fn progression_pourcentage(quantite_totale: Decimal, quantite_allouee: Decimal) -> Decimal {
    if quantite_totale <= Decimal::ZERO {
        return Decimal::ZERO;
    }
    quantite_allouee / quantite_totale * Decimal::from(100)
}
