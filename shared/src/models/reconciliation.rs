//! Écart classification and delivery matching shared by the reconciliation
//! engine and the UI

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Quantities closer than this are considered equal (weighbridge noise)
pub fn tolerance_ecart() -> Decimal {
    Decimal::new(1, 2) // 0.01
}

/// Outcome of comparing two independently recorded quantities
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StatutEcart {
    /// Quantities agree within tolerance
    Conforme,
    /// Less arrived than declared (écart > 0)
    Manquant,
    /// More arrived than declared (écart < 0)
    Excedent,
    /// Declared delivery with no matching warehouse entry
    NonRecu,
    /// Warehouse entry with no matching declared delivery
    NonPrevu,
}

impl StatutEcart {
    pub fn as_str(&self) -> &'static str {
        match self {
            StatutEcart::Conforme => "conforme",
            StatutEcart::Manquant => "manquant",
            StatutEcart::Excedent => "excedent",
            StatutEcart::NonRecu => "non_recu",
            StatutEcart::NonPrevu => "non_prevu",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "conforme" => Some(StatutEcart::Conforme),
            "manquant" => Some(StatutEcart::Manquant),
            "excedent" => Some(StatutEcart::Excedent),
            "non_recu" => Some(StatutEcart::NonRecu),
            "non_prevu" => Some(StatutEcart::NonPrevu),
            _ => None,
        }
    }
}

/// Classify a signed écart between two matched quantities
pub fn classer_ecart(ecart: Decimal) -> StatutEcart {
    if ecart.abs() < tolerance_ecart() {
        StatutEcart::Conforme
    } else if ecart > Decimal::ZERO {
        StatutEcart::Manquant
    } else {
        StatutEcart::Excedent
    }
}

/// Entry/exit ratio for a warehouse over a period; undefined when nothing
/// left the warehouse.
pub fn rapport_entree_sortie(entree: Decimal, sortie: Decimal) -> Option<Decimal> {
    if sortie == Decimal::ZERO {
        None
    } else {
        Some(entree / sortie)
    }
}

/// Écart as a percentage of the declared quantity
pub fn ecart_pourcentage(ecart: Decimal, reference: Decimal) -> Decimal {
    if reference == Decimal::ZERO {
        return Decimal::ZERO;
    }
    ecart / reference * Decimal::from(100)
}

/// Conformity rate in percent
pub fn taux_conformite(conformes: usize, total: usize) -> Decimal {
    if total == 0 {
        return Decimal::ZERO;
    }
    Decimal::from(conformes as u64) / Decimal::from(total as u64) * Decimal::from(100)
}

/// Matching key of a declared delivery or a warehouse entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CleAppariement {
    pub produit_id: Uuid,
    pub magasin_id: Uuid,
    pub date: NaiveDate,
}

/// One line of the delivery/entry pairing, by index into the input slices
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Appariement {
    pub livraison: Option<usize>,
    pub entree: Option<usize>,
}

/// Pair declared deliveries with warehouse entries.
///
/// A delivery matches the first not-yet-consumed entry with the same
/// (produit, magasin, calendar day) — strictly one-to-one, no fuzzy scoring.
/// The result holds one line per delivery (entry absent when nothing
/// arrived), followed by one line per entry no delivery claimed.
pub fn apparier_par_jour(livraisons: &[CleAppariement], entrees: &[CleAppariement]) -> Vec<Appariement> {
    let mut consommees = vec![false; entrees.len()];
    let mut lignes = Vec::with_capacity(livraisons.len());

    for (i, livraison) in livraisons.iter().enumerate() {
        let correspondante = entrees.iter().enumerate().position(|(j, entree)| {
            !consommees[j]
                && entree.produit_id == livraison.produit_id
                && entree.magasin_id == livraison.magasin_id
                && entree.date == livraison.date
        });
        if let Some(j) = correspondante {
            consommees[j] = true;
        }
        lignes.push(Appariement {
            livraison: Some(i),
            entree: correspondante,
        });
    }

    for (j, consommee) in consommees.iter().enumerate() {
        if !consommee {
            lignes.push(Appariement {
                livraison: None,
                entree: Some(j),
            });
        }
    }

    lignes
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    fn dec(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    #[test]
    fn test_classement_conforme() {
        assert_eq!(classer_ecart(Decimal::ZERO), StatutEcart::Conforme);
        assert_eq!(classer_ecart(dec("0.009")), StatutEcart::Conforme);
        assert_eq!(classer_ecart(dec("-0.009")), StatutEcart::Conforme);
    }

    #[test]
    fn test_classement_bord_de_tolerance() {
        // 0.01 exactly is already a real écart
        assert_eq!(classer_ecart(dec("0.01")), StatutEcart::Manquant);
        assert_eq!(classer_ecart(dec("-0.01")), StatutEcart::Excedent);
    }

    #[test]
    fn test_classement_manquant_excedent() {
        assert_eq!(classer_ecart(dec("10")), StatutEcart::Manquant);
        assert_eq!(classer_ecart(dec("-5")), StatutEcart::Excedent);
    }

    #[test]
    fn test_rapport_entree_sortie() {
        assert_eq!(rapport_entree_sortie(dec("100"), dec("50")), Some(dec("2")));
        assert_eq!(rapport_entree_sortie(dec("100"), Decimal::ZERO), None);
    }

    #[test]
    fn test_taux_conformite() {
        assert_eq!(taux_conformite(3, 4), dec("75"));
        assert_eq!(taux_conformite(0, 0), Decimal::ZERO);
    }

    #[test]
    fn test_ecart_pourcentage() {
        assert_eq!(ecart_pourcentage(dec("10"), dec("100")), dec("10"));
        assert_eq!(ecart_pourcentage(dec("10"), Decimal::ZERO), Decimal::ZERO);
    }

    fn cle(produit: Uuid, magasin: Uuid, jour: u32) -> CleAppariement {
        CleAppariement {
            produit_id: produit,
            magasin_id: magasin,
            date: NaiveDate::from_ymd_opt(2025, 1, jour).unwrap(),
        }
    }

    #[test]
    fn test_appariement_simple() {
        let produit = Uuid::new_v4();
        let magasin = Uuid::new_v4();
        let livraisons = vec![cle(produit, magasin, 10)];
        let entrees = vec![cle(produit, magasin, 10)];

        let lignes = apparier_par_jour(&livraisons, &entrees);
        assert_eq!(lignes.len(), 1);
        assert_eq!(lignes[0].livraison, Some(0));
        assert_eq!(lignes[0].entree, Some(0));
    }

    #[test]
    fn test_appariement_premier_gagne() {
        // Two same-day deliveries, one entry: the first delivery takes it
        let produit = Uuid::new_v4();
        let magasin = Uuid::new_v4();
        let livraisons = vec![cle(produit, magasin, 10), cle(produit, magasin, 10)];
        let entrees = vec![cle(produit, magasin, 10)];

        let lignes = apparier_par_jour(&livraisons, &entrees);
        assert_eq!(lignes.len(), 2);
        assert_eq!(lignes[0].entree, Some(0));
        assert_eq!(lignes[1].entree, None);
    }

    #[test]
    fn test_appariement_jour_different() {
        let produit = Uuid::new_v4();
        let magasin = Uuid::new_v4();
        let livraisons = vec![cle(produit, magasin, 10)];
        let entrees = vec![cle(produit, magasin, 11)];

        let lignes = apparier_par_jour(&livraisons, &entrees);
        assert_eq!(lignes.len(), 2);
        // Delivery unmatched, entry unmatched
        assert_eq!(lignes[0], Appariement { livraison: Some(0), entree: None });
        assert_eq!(lignes[1], Appariement { livraison: None, entree: Some(0) });
    }

    #[test]
    fn test_appariement_entree_orpheline() {
        let produit = Uuid::new_v4();
        let magasin = Uuid::new_v4();
        let lignes = apparier_par_jour(&[], &[cle(produit, magasin, 10)]);
        assert_eq!(lignes.len(), 1);
        assert_eq!(lignes[0].livraison, None);
        assert_eq!(lignes[0].entree, Some(0));
    }
}
