//! Rotation lifecycle rules and truck-allocation planning
//!
//! A rotation is one truck leg of a dispatch. The planning heuristic here is
//! pure so the backend and the browser preview compute the same plan.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

/// Lifecycle status of a rotation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RotationStatut {
    Planifie,
    EnTransit,
    Livre,
    Manquant,
    Annule,
}

impl RotationStatut {
    pub fn as_str(&self) -> &'static str {
        match self {
            RotationStatut::Planifie => "planifie",
            RotationStatut::EnTransit => "en_transit",
            RotationStatut::Livre => "livre",
            RotationStatut::Manquant => "manquant",
            RotationStatut::Annule => "annule",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "planifie" => Some(RotationStatut::Planifie),
            "en_transit" => Some(RotationStatut::EnTransit),
            "livre" => Some(RotationStatut::Livre),
            "manquant" => Some(RotationStatut::Manquant),
            "annule" => Some(RotationStatut::Annule),
            _ => None,
        }
    }

    /// Terminal states: the truck movement is over, quantities are frozen
    pub fn est_terminal(&self) -> bool {
        matches!(
            self,
            RotationStatut::Livre | RotationStatut::Manquant | RotationStatut::Annule
        )
    }

    /// Valid transitions. Cancellation is only possible before departure:
    /// once a truck left the yard the only outcomes are livre or manquant.
    pub fn transition_valide(&self, vers: RotationStatut) -> bool {
        matches!(
            (self, vers),
            (RotationStatut::Planifie, RotationStatut::EnTransit)
                | (RotationStatut::EnTransit, RotationStatut::Livre)
                | (RotationStatut::EnTransit, RotationStatut::Manquant)
                | (RotationStatut::Planifie, RotationStatut::Annule)
        )
    }
}

/// Signed variance between planned and delivered quantity
///
/// Positive = shortfall on arrival, negative = excess.
pub fn calculer_ecart(quantite_prevue: Decimal, quantite_livree: Decimal) -> Decimal {
    quantite_prevue - quantite_livree
}

/// A truck available for allocation (one active driver = one truck)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CamionDisponible {
    pub chauffeur_id: Uuid,
    pub chauffeur_nom: String,
    pub numero_camion: Option<String>,
    pub capacite_camion: Decimal,
}

/// One proposed rotation of an allocation plan (not persisted)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RotationPlanifiee {
    pub numero_rotation: u32,
    pub chauffeur_id: Uuid,
    pub chauffeur_nom: String,
    pub numero_camion: Option<String>,
    pub capacite_camion: Decimal,
    pub quantite_prevue: Decimal,
}

/// Why an allocation plan could not be produced
#[derive(Debug, Clone, PartialEq, Error)]
pub enum PlanificationErreur {
    #[error("la quantité à planifier doit être positive")]
    QuantiteInvalide,

    #[error("aucun camion disponible")]
    AucunCamion,

    #[error("capacité totale insuffisante: {capacite_totale} disponible pour {demande} demandé")]
    CapaciteInsuffisante {
        capacite_totale: Decimal,
        demande: Decimal,
    },
}

/// Compute an allocation plan covering `quantite` with the given trucks.
///
/// First-fit-decreasing: trucks sorted by capacity descending, each loaded
/// with `min(capacité, restant)`, each used at most once per pass. Rotation
/// numbers are sequential starting at `premier_numero`. Fails when the
/// combined capacity of one pass cannot cover the quantity; the caller may
/// run another pass with the same trucks for the remainder.
pub fn planifier_rotations(
    quantite: Decimal,
    camions: &[CamionDisponible],
    premier_numero: u32,
) -> Result<Vec<RotationPlanifiee>, PlanificationErreur> {
    if quantite <= Decimal::ZERO {
        return Err(PlanificationErreur::QuantiteInvalide);
    }

    let mut utilisables: Vec<&CamionDisponible> = camions
        .iter()
        .filter(|c| c.capacite_camion > Decimal::ZERO)
        .collect();

    if utilisables.is_empty() {
        return Err(PlanificationErreur::AucunCamion);
    }

    let capacite_totale: Decimal = utilisables.iter().map(|c| c.capacite_camion).sum();
    if capacite_totale < quantite {
        return Err(PlanificationErreur::CapaciteInsuffisante {
            capacite_totale,
            demande: quantite,
        });
    }

    utilisables.sort_by(|a, b| b.capacite_camion.cmp(&a.capacite_camion));

    let mut plan = Vec::new();
    let mut restant = quantite;
    for camion in utilisables {
        if restant <= Decimal::ZERO {
            break;
        }
        let charge = restant.min(camion.capacite_camion);
        plan.push(RotationPlanifiee {
            numero_rotation: premier_numero + plan.len() as u32,
            chauffeur_id: camion.chauffeur_id,
            chauffeur_nom: camion.chauffeur_nom.clone(),
            numero_camion: camion.numero_camion.clone(),
            capacite_camion: camion.capacite_camion,
            quantite_prevue: charge,
        });
        restant -= charge;
    }

    Ok(plan)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    fn dec(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    fn camion(capacite: &str) -> CamionDisponible {
        CamionDisponible {
            chauffeur_id: Uuid::new_v4(),
            chauffeur_nom: "Chauffeur".to_string(),
            numero_camion: None,
            capacite_camion: dec(capacite),
        }
    }

    #[test]
    fn test_transitions_valides() {
        use RotationStatut::*;
        assert!(Planifie.transition_valide(EnTransit));
        assert!(EnTransit.transition_valide(Livre));
        assert!(EnTransit.transition_valide(Manquant));
        assert!(Planifie.transition_valide(Annule));
    }

    #[test]
    fn test_transitions_invalides() {
        use RotationStatut::*;
        // A truck cannot be un-departed, and terminal states are frozen
        assert!(!EnTransit.transition_valide(Annule));
        assert!(!EnTransit.transition_valide(Planifie));
        assert!(!Livre.transition_valide(Livre));
        assert!(!Livre.transition_valide(EnTransit));
        assert!(!Manquant.transition_valide(Livre));
        assert!(!Annule.transition_valide(EnTransit));
        assert!(!Planifie.transition_valide(Livre));
    }

    #[test]
    fn test_ecart_signe() {
        assert_eq!(calculer_ecart(dec("30"), dec("28")), dec("2"));
        assert_eq!(calculer_ecart(dec("30"), dec("30")), Decimal::ZERO);
        assert_eq!(calculer_ecart(dec("30"), dec("31")), dec("-1"));
    }

    #[test]
    fn test_plan_325_tonnes_camions_30() {
        // 325 t over eleven 30 t trucks: ten full loads plus one of 25
        let camions: Vec<_> = (0..11).map(|_| camion("30")).collect();
        let plan = planifier_rotations(dec("325"), &camions, 1).unwrap();

        assert_eq!(plan.len(), 11);
        assert_eq!(plan.iter().filter(|r| r.quantite_prevue == dec("30")).count(), 10);
        assert_eq!(plan.last().unwrap().quantite_prevue, dec("25"));
        let total: Decimal = plan.iter().map(|r| r.quantite_prevue).sum();
        assert_eq!(total, dec("325"));
    }

    #[test]
    fn test_plan_plus_gros_camions_en_premier() {
        let camions = vec![camion("20"), camion("40"), camion("30")];
        let plan = planifier_rotations(dec("60"), &camions, 1).unwrap();

        assert_eq!(plan.len(), 2);
        assert_eq!(plan[0].quantite_prevue, dec("40"));
        assert_eq!(plan[1].quantite_prevue, dec("20"));
        assert_eq!(plan[0].numero_rotation, 1);
        assert_eq!(plan[1].numero_rotation, 2);
    }

    #[test]
    fn test_plan_capacite_insuffisante() {
        let camions = vec![camion("30"), camion("30")];
        let err = planifier_rotations(dec("100"), &camions, 1).unwrap_err();
        assert_eq!(
            err,
            PlanificationErreur::CapaciteInsuffisante {
                capacite_totale: dec("60"),
                demande: dec("100"),
            }
        );
    }

    #[test]
    fn test_plan_sans_camion() {
        assert_eq!(
            planifier_rotations(dec("10"), &[], 1),
            Err(PlanificationErreur::AucunCamion)
        );
        // Trucks without a usable capacity are ignored
        assert_eq!(
            planifier_rotations(dec("10"), &[camion("0")], 1),
            Err(PlanificationErreur::AucunCamion)
        );
    }

    #[test]
    fn test_plan_numerotation_decalee() {
        let camions = vec![camion("30"), camion("30")];
        let plan = planifier_rotations(dec("45"), &camions, 4).unwrap();
        assert_eq!(plan[0].numero_rotation, 4);
        assert_eq!(plan[1].numero_rotation, 5);
    }
}
