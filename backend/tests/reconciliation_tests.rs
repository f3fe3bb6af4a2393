//! Reconciliation engine tests
//!
//! Tests for the écart classification and delivery matching including:
//! - conforme / manquant / excedent with the 0.01 tolerance
//! - non_recu and non_prevu classification through day-level matching
//! - First match wins, strictly one-to-one
//! - Aggregate statistics and the entry/exit ratio

use chrono::NaiveDate;
use proptest::prelude::*;
use rust_decimal::Decimal;
use std::str::FromStr;
use uuid::Uuid;

use shared::models::{
    apparier_par_jour, classer_ecart, rapport_entree_sortie, taux_conformite, CleAppariement,
    StatutEcart,
};

// Helper to create Decimal from string
fn dec(s: &str) -> Decimal {
    Decimal::from_str(s).unwrap()
}

fn jour(j: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(2025, 3, j).unwrap()
}

fn cle(produit: Uuid, magasin: Uuid, j: u32) -> CleAppariement {
    CleAppariement {
        produit_id: produit,
        magasin_id: magasin,
        date: jour(j),
    }
}

// ============================================================================
// Unit Tests
// ============================================================================

#[cfg(test)]
mod unit_tests {
    use super::*;

    /// Dispatch 100 t, entry of 100 t the same day: conforme, écart 0
    #[test]
    fn test_classement_conforme() {
        let ecart = dec("100") - dec("100");
        assert_eq!(ecart, Decimal::ZERO);
        assert_eq!(classer_ecart(ecart), StatutEcart::Conforme);
    }

    /// Declared 100 t, recorded 90 t: écart 10, manquant
    #[test]
    fn test_classement_manquant() {
        let ecart = dec("100") - dec("90");
        assert_eq!(ecart, dec("10"));
        assert_eq!(classer_ecart(ecart), StatutEcart::Manquant);
    }

    /// More arrived than declared: excedent
    #[test]
    fn test_classement_excedent() {
        assert_eq!(classer_ecart(dec("100") - dec("105")), StatutEcart::Excedent);
    }

    /// Weighbridge noise below 0.01 is conforme; 0.01 itself is not
    #[test]
    fn test_tolerance() {
        assert_eq!(classer_ecart(dec("0.005")), StatutEcart::Conforme);
        assert_eq!(classer_ecart(dec("-0.005")), StatutEcart::Conforme);
        assert_eq!(classer_ecart(dec("0.01")), StatutEcart::Manquant);
        assert_eq!(classer_ecart(dec("-0.01")), StatutEcart::Excedent);
    }

    /// An entry of 50 t with no declared delivery is non_prevu
    #[test]
    fn test_entree_non_prevue() {
        let produit = Uuid::new_v4();
        let magasin = Uuid::new_v4();

        let lignes = apparier_par_jour(&[], &[cle(produit, magasin, 12)]);

        assert_eq!(lignes.len(), 1);
        assert_eq!(lignes[0].livraison, None);
        assert_eq!(lignes[0].entree, Some(0));
    }

    /// A delivery with no entry that day is non_recu
    #[test]
    fn test_livraison_non_recue() {
        let produit = Uuid::new_v4();
        let magasin = Uuid::new_v4();

        let lignes = apparier_par_jour(&[cle(produit, magasin, 12)], &[]);

        assert_eq!(lignes.len(), 1);
        assert_eq!(lignes[0].livraison, Some(0));
        assert_eq!(lignes[0].entree, None);
    }

    /// Matching requires the same product, warehouse and calendar day
    #[test]
    fn test_appariement_exige_les_trois_cles() {
        let produit = Uuid::new_v4();
        let autre_produit = Uuid::new_v4();
        let magasin = Uuid::new_v4();
        let autre_magasin = Uuid::new_v4();

        let livraisons = vec![cle(produit, magasin, 12)];

        for entree in [
            cle(autre_produit, magasin, 12),
            cle(produit, autre_magasin, 12),
            cle(produit, magasin, 13),
        ] {
            let lignes = apparier_par_jour(&livraisons, &[entree]);
            assert_eq!(lignes[0].entree, None, "should not match {:?}", entree);
        }
    }

    /// Two same-day deliveries, one entry: first match wins, one-to-one
    #[test]
    fn test_premier_appariement_gagne() {
        let produit = Uuid::new_v4();
        let magasin = Uuid::new_v4();

        let livraisons = vec![cle(produit, magasin, 12), cle(produit, magasin, 12)];
        let entrees = vec![cle(produit, magasin, 12)];

        let lignes = apparier_par_jour(&livraisons, &entrees);
        assert_eq!(lignes[0].entree, Some(0));
        assert_eq!(lignes[1].entree, None);
        // And the consumed entry never reappears as non_prevu
        assert_eq!(lignes.len(), 2);
    }

    #[test]
    fn test_rapport_entree_sortie() {
        assert_eq!(rapport_entree_sortie(dec("150"), dec("100")), Some(dec("1.5")));
        // Undefined when nothing left the warehouse
        assert_eq!(rapport_entree_sortie(dec("150"), Decimal::ZERO), None);
    }

    #[test]
    fn test_taux_conformite() {
        assert_eq!(taux_conformite(3, 4), dec("75"));
        assert_eq!(taux_conformite(4, 4), dec("100"));
        assert_eq!(taux_conformite(0, 5), Decimal::ZERO);
        assert_eq!(taux_conformite(0, 0), Decimal::ZERO);
    }

    /// Statistics over a mixed comparison set
    #[test]
    fn test_statistiques_melangees() {
        let ecarts = [
            (dec("100"), dec("100")), // conforme
            (dec("100"), dec("90")),  // manquant
            (dec("50"), dec("55")),   // excedent
            (dec("80"), dec("80")),   // conforme
        ];

        let classements: Vec<StatutEcart> =
            ecarts.iter().map(|(d, r)| classer_ecart(d - r)).collect();

        let conformes = classements.iter().filter(|s| **s == StatutEcart::Conforme).count();
        let total_ecart_absolu: Decimal = ecarts.iter().map(|(d, r)| (d - r).abs()).sum();

        assert_eq!(conformes, 2);
        assert_eq!(total_ecart_absolu, dec("15"));
        assert_eq!(taux_conformite(conformes, classements.len()), dec("50"));
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

    /// Strategy for matching keys drawn from a small pool so collisions occur
    fn cles_strategy(max: usize) -> impl Strategy<Value = Vec<(u8, u8, u8)>> {
        prop::collection::vec((0u8..3, 0u8..3, 1u8..4), 0..max)
    }

    fn materialiser(pool_produits: &[Uuid], pool_magasins: &[Uuid], brut: &[(u8, u8, u8)]) -> Vec<CleAppariement> {
        brut.iter()
            .map(|(p, m, j)| CleAppariement {
                produit_id: pool_produits[*p as usize],
                magasin_id: pool_magasins[*m as usize],
                date: jour(u32::from(*j)),
            })
            .collect()
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(100))]

        /// Classification is total and consistent with the écart sign
        #[test]
        fn prop_classement_total(
            declaree in quantite_strategy(),
            recue in quantite_strategy()
        ) {
            let ecart = declaree - recue;
            match classer_ecart(ecart) {
                StatutEcart::Conforme => prop_assert!(ecart.abs() < dec("0.01")),
                StatutEcart::Manquant => prop_assert!(ecart >= dec("0.01")),
                StatutEcart::Excedent => prop_assert!(ecart <= dec("-0.01")),
                autre => prop_assert!(false, "unexpected classification {:?}", autre),
            }
        }

        /// Every delivery and every entry appears exactly once in the pairing
        #[test]
        fn prop_appariement_conserve_tout(
            brut_livraisons in cles_strategy(12),
            brut_entrees in cles_strategy(12)
        ) {
            let produits: Vec<Uuid> = (0..3).map(|_| Uuid::new_v4()).collect();
            let magasins: Vec<Uuid> = (0..3).map(|_| Uuid::new_v4()).collect();
            let livraisons = materialiser(&produits, &magasins, &brut_livraisons);
            let entrees = materialiser(&produits, &magasins, &brut_entrees);

            let lignes = apparier_par_jour(&livraisons, &entrees);

            let mut vues_livraisons: Vec<usize> = lignes.iter().filter_map(|l| l.livraison).collect();
            vues_livraisons.sort();
            prop_assert_eq!(vues_livraisons, (0..livraisons.len()).collect::<Vec<_>>());

            let mut vues_entrees: Vec<usize> = lignes.iter().filter_map(|l| l.entree).collect();
            vues_entrees.sort();
            prop_assert_eq!(vues_entrees, (0..entrees.len()).collect::<Vec<_>>());
        }

        /// Matched pairs always agree on produit, magasin and day
        #[test]
        fn prop_appariement_coherent(
            brut_livraisons in cles_strategy(12),
            brut_entrees in cles_strategy(12)
        ) {
            let produits: Vec<Uuid> = (0..3).map(|_| Uuid::new_v4()).collect();
            let magasins: Vec<Uuid> = (0..3).map(|_| Uuid::new_v4()).collect();
            let livraisons = materialiser(&produits, &magasins, &brut_livraisons);
            let entrees = materialiser(&produits, &magasins, &brut_entrees);

            for ligne in apparier_par_jour(&livraisons, &entrees) {
                if let (Some(i), Some(j)) = (ligne.livraison, ligne.entree) {
                    prop_assert_eq!(livraisons[i].produit_id, entrees[j].produit_id);
                    prop_assert_eq!(livraisons[i].magasin_id, entrees[j].magasin_id);
                    prop_assert_eq!(livraisons[i].date, entrees[j].date);
                }
            }
        }

        /// The conformity rate is always between 0 and 100
        #[test]
        fn prop_taux_conformite_borne(
            conformes in 0usize..50,
            supplement in 0usize..50
        ) {
            let total = conformes + supplement;
            let taux = taux_conformite(conformes, total);
            prop_assert!(taux >= Decimal::ZERO);
            prop_assert!(taux <= dec("100"));
        }
    }
}
