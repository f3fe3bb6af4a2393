//! Dispatch planning tests
//!
//! Tests for the dispatch aggregate including:
//! - Σ(quantite_prevue of live rotations) ≤ quantite_totale at all times
//! - Cancellation rules (pending only, nothing allocated)
//! - termine requires every live rotation terminal and the quota filled
//! - End-to-end scenario: reserve, allocate, receive, close

use proptest::prelude::*;
use rust_decimal::Decimal;
use std::str::FromStr;

use shared::models::{
    progression_pourcentage, DispatchStatut, ProgressionDispatch, RotationStatut,
};
use shared::validation::{validate_numero_dispatch, validate_numero_rotation};

// Helper to create Decimal from string
fn dec(s: &str) -> Decimal {
    Decimal::from_str(s).unwrap()
}

// ============================================================================
// Dispatch Simulation
// ============================================================================

/// In-memory mirror of the dispatch aggregate: quota enforcement on
/// allocation, status re-evaluation after each terminal rotation.
#[derive(Debug)]
struct DispatchSimule {
    statut: DispatchStatut,
    quantite_totale: Decimal,
    rotations: Vec<(RotationStatut, Decimal)>,
}

#[derive(Debug, PartialEq)]
enum ErreurDispatch {
    QuotaDepasse { quota_restant: Decimal },
    TransitionInvalide,
}

impl DispatchSimule {
    fn nouveau(quantite_totale: Decimal) -> Self {
        Self {
            statut: DispatchStatut::EnAttente,
            quantite_totale,
            rotations: Vec::new(),
        }
    }

    fn quantite_allouee(&self) -> Decimal {
        self.rotations
            .iter()
            .filter(|(statut, _)| *statut != RotationStatut::Annule)
            .map(|(_, quantite)| *quantite)
            .sum()
    }

    fn ajouter_rotation(&mut self, quantite: Decimal) -> Result<usize, ErreurDispatch> {
        let quota_restant = self.quantite_totale - self.quantite_allouee();
        if quantite > quota_restant {
            return Err(ErreurDispatch::QuotaDepasse { quota_restant });
        }
        self.rotations.push((RotationStatut::Planifie, quantite));
        Ok(self.rotations.len() - 1)
    }

    fn demarrer_rotation(&mut self, index: usize) {
        self.rotations[index].0 = RotationStatut::EnTransit;
        if self.statut == DispatchStatut::EnAttente {
            self.statut = DispatchStatut::EnCours;
        }
    }

    fn terminer_rotation(&mut self, index: usize, statut: RotationStatut) {
        self.rotations[index].0 = statut;
        self.reevaluer();
    }

    fn annuler(&mut self) -> Result<(), ErreurDispatch> {
        let vivantes = self
            .rotations
            .iter()
            .filter(|(s, _)| *s != RotationStatut::Annule)
            .count();
        if self.statut != DispatchStatut::EnAttente || vivantes > 0 {
            return Err(ErreurDispatch::TransitionInvalide);
        }
        self.statut = DispatchStatut::Annule;
        Ok(())
    }

    fn reevaluer(&mut self) {
        let vivantes: Vec<_> = self
            .rotations
            .iter()
            .filter(|(s, _)| *s != RotationStatut::Annule)
            .collect();

        let toutes_terminales = !vivantes.is_empty()
            && vivantes.iter().all(|(s, _)| s.est_terminal());

        if toutes_terminales && self.quantite_allouee() >= self.quantite_totale {
            self.statut = DispatchStatut::Termine;
        }
    }
}

// ============================================================================
// Unit Tests
// ============================================================================

#[cfg(test)]
mod unit_tests {
    use super::*;

    #[test]
    fn test_quota_respecte() {
        let mut dispatch = DispatchSimule::nouveau(dec("100"));

        dispatch.ajouter_rotation(dec("40")).unwrap();
        dispatch.ajouter_rotation(dec("40")).unwrap();

        let err = dispatch.ajouter_rotation(dec("30")).unwrap_err();
        assert_eq!(
            err,
            ErreurDispatch::QuotaDepasse {
                quota_restant: dec("20")
            }
        );
    }

    #[test]
    fn test_rotation_annulee_libere_le_quota() {
        let mut dispatch = DispatchSimule::nouveau(dec("100"));

        let index = dispatch.ajouter_rotation(dec("60")).unwrap();
        assert!(dispatch.ajouter_rotation(dec("60")).is_err());

        dispatch.rotations[index].0 = RotationStatut::Annule;
        dispatch.ajouter_rotation(dec("60")).unwrap();
        assert_eq!(dispatch.quantite_allouee(), dec("60"));
    }

    #[test]
    fn test_annulation_dispatch_en_attente_seulement() {
        let mut vide = DispatchSimule::nouveau(dec("100"));
        assert!(vide.annuler().is_ok());
        assert_eq!(vide.statut, DispatchStatut::Annule);

        // A dispatch with a live rotation cannot be cancelled
        let mut avec_rotation = DispatchSimule::nouveau(dec("100"));
        avec_rotation.ajouter_rotation(dec("40")).unwrap();
        assert_eq!(avec_rotation.annuler(), Err(ErreurDispatch::TransitionInvalide));
    }

    #[test]
    fn test_annulation_dispatch_en_cours_rejetee() {
        let mut dispatch = DispatchSimule::nouveau(dec("100"));
        let index = dispatch.ajouter_rotation(dec("40")).unwrap();
        dispatch.demarrer_rotation(index);

        assert_eq!(dispatch.statut, DispatchStatut::EnCours);
        assert_eq!(dispatch.annuler(), Err(ErreurDispatch::TransitionInvalide));
    }

    #[test]
    fn test_termine_exige_quota_complet() {
        // All rotations terminal but only 60/100 allocated: not termine
        let mut dispatch = DispatchSimule::nouveau(dec("100"));
        let index = dispatch.ajouter_rotation(dec("60")).unwrap();
        dispatch.demarrer_rotation(index);
        dispatch.terminer_rotation(index, RotationStatut::Livre);

        assert_eq!(dispatch.statut, DispatchStatut::EnCours);
    }

    #[test]
    fn test_termine_avec_rotation_manquante() {
        // A lost rotation still counts as terminal for closing the dispatch
        let mut dispatch = DispatchSimule::nouveau(dec("60"));
        let a = dispatch.ajouter_rotation(dec("30")).unwrap();
        let b = dispatch.ajouter_rotation(dec("30")).unwrap();
        dispatch.demarrer_rotation(a);
        dispatch.demarrer_rotation(b);

        dispatch.terminer_rotation(a, RotationStatut::Livre);
        assert_eq!(dispatch.statut, DispatchStatut::EnCours);

        dispatch.terminer_rotation(b, RotationStatut::Manquant);
        assert_eq!(dispatch.statut, DispatchStatut::Termine);
    }

    #[test]
    fn test_formats_numeros() {
        assert!(validate_numero_dispatch("DISP-20250611-7CA2").is_ok());
        assert!(validate_numero_rotation("DISP-20250611-7CA2-R001").is_ok());
        assert!(validate_numero_rotation("DISP-20250611-7CA2-R012").is_ok());
    }

    #[test]
    fn test_progression() {
        let progression = ProgressionDispatch::calculer(dec("100"), dec("75"), 3);
        assert_eq!(progression.reste_a_allouer, dec("25"));
        assert_eq!(progression.progression, dec("75"));
        assert_eq!(progression.nombre_rotations, 3);
    }

    /// End-to-end: dispatch 90 t, three rotations of 30, deliveries of
    /// 28/30/29, destination credited 87, écarts [2, 0, 1], dispatch termine.
    #[test]
    fn test_scenario_complet() {
        let mut stock_source = dec("200");
        let mut stock_destination = Decimal::ZERO;

        // Reservation at creation
        let mut dispatch = DispatchSimule::nouveau(dec("90"));
        stock_source -= dec("90");
        assert_eq!(stock_source, dec("110"));

        // Three rotations of 30
        let indices: Vec<usize> = (0..3)
            .map(|_| dispatch.ajouter_rotation(dec("30")).unwrap())
            .collect();
        assert_eq!(dispatch.quantite_allouee(), dec("90"));

        // Starting debits nothing further
        dispatch.demarrer_rotation(indices[0]);
        assert_eq!(stock_source, dec("110"));
        assert_eq!(dispatch.statut, DispatchStatut::EnCours);

        for index in indices.iter().skip(1) {
            dispatch.demarrer_rotation(*index);
        }

        // Receipts credit exactly what arrived
        let livraisons = [dec("28"), dec("30"), dec("29")];
        let mut ecarts = Vec::new();
        for (index, livree) in indices.iter().zip(livraisons) {
            stock_destination += livree;
            ecarts.push(dispatch.rotations[*index].1 - livree);
            dispatch.terminer_rotation(*index, RotationStatut::Livre);
        }

        assert_eq!(stock_destination, dec("87"));
        assert_eq!(ecarts, vec![dec("2"), Decimal::ZERO, dec("1")]);
        assert_eq!(dispatch.statut, DispatchStatut::Termine);
    }
}

// ============================================================================
// Property-Based Tests
// ============================================================================

#[cfg(test)]
mod property_tests {
    use super::*;

    /// Strategy for positive quantities (0.1 to 1000.0)
    fn quantite_strategy() -> impl Strategy<Value = Decimal> {
        (1i64..=10000i64).prop_map(|n| Decimal::new(n, 1))
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(100))]

        /// The quota invariant holds after any sequence of allocation attempts
        #[test]
        fn prop_quota_invariant(
            quantite_totale in quantite_strategy(),
            tentatives in prop::collection::vec(quantite_strategy(), 1..20)
        ) {
            let mut dispatch = DispatchSimule::nouveau(quantite_totale);

            for quantite in tentatives {
                let _ = dispatch.ajouter_rotation(quantite);
                prop_assert!(dispatch.quantite_allouee() <= dispatch.quantite_totale);
            }
        }

        /// A rejected allocation reports the exact remaining quota
        #[test]
        fn prop_quota_restant_exact(
            quantite_totale in quantite_strategy(),
            allocation in quantite_strategy(),
            surplus in quantite_strategy()
        ) {
            let allocation = allocation.min(quantite_totale);
            let mut dispatch = DispatchSimule::nouveau(quantite_totale);
            dispatch.ajouter_rotation(allocation).unwrap();

            let restant = quantite_totale - allocation;
            match dispatch.ajouter_rotation(restant + surplus) {
                Err(ErreurDispatch::QuotaDepasse { quota_restant }) => {
                    prop_assert_eq!(quota_restant, restant);
                }
                autre => prop_assert!(false, "expected QuotaDepasse, got {:?}", autre),
            }
        }

        /// Progression is 0..=100 while the quota invariant holds
        #[test]
        fn prop_progression_bornee(
            quantite_totale in quantite_strategy(),
            allouee in quantite_strategy()
        ) {
            let allouee = allouee.min(quantite_totale);
            let progression = progression_pourcentage(quantite_totale, allouee);

            prop_assert!(progression >= Decimal::ZERO);
            prop_assert!(progression <= dec("100"));
        }
    }
}
