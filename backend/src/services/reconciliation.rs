//! Écart reconciliation engine
//!
//! Cross-checks the three independently recorded quantities: what managers
//! dispatched, what transporters declared delivered, and what warehouse
//! operators recorded as entered. Results are derived on demand, never
//! persisted.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use shared::models::{
    apparier_par_jour, classer_ecart, ecart_pourcentage, rapport_entree_sortie, taux_conformite,
    CleAppariement, StatutEcart,
};
use sqlx::{FromRow, PgPool};
use uuid::Uuid;

use crate::error::AppResult;

/// Reconciliation service
#[derive(Clone)]
pub struct ReconciliationService {
    db: PgPool,
}

/// Filters shared by both reconciliation reports
#[derive(Debug, Default, Deserialize)]
pub struct ReconciliationFilters {
    pub date_debut: Option<NaiveDate>,
    pub date_fin: Option<NaiveDate>,
    pub magasin_id: Option<Uuid>,
    pub produit_id: Option<Uuid>,
    /// Classification filter for the comparison report (conforme, manquant,
    /// excedent, non_recu, non_prevu)
    pub statut: Option<String>,
    /// Numeric filter for the dispatch/entry report (positif, negatif, nul)
    pub type_ecart: Option<String>,
}

/// One line of the delivery/entry comparison
#[derive(Debug, Clone, Serialize)]
pub struct ComparaisonLivraison {
    pub livraison_id: Option<Uuid>,
    pub numero_livraison: Option<String>,
    pub mouvement_id: Option<Uuid>,
    pub reference_mouvement: Option<String>,
    pub produit_id: Uuid,
    pub produit_nom: String,
    pub magasin_id: Uuid,
    pub magasin_nom: String,
    pub date: NaiveDate,
    pub transporteur: Option<String>,
    pub numero_camion: Option<String>,
    pub chauffeur_nom: Option<String>,
    pub quantite_livree: Decimal,
    pub quantite_recue: Decimal,
    pub ecart: Decimal,
    pub ecart_pourcentage: Decimal,
    pub statut: StatutEcart,
}

/// Aggregate statistics of the delivery/entry comparison
#[derive(Debug, Clone, Serialize)]
pub struct StatistiquesComparaison {
    pub total: usize,
    pub conformes: usize,
    pub manquants: usize,
    pub excedents: usize,
    pub non_recus: usize,
    pub non_prevus: usize,
    pub total_ecart_absolu: Decimal,
    pub taux_conformite: Decimal,
}

/// Delivery/entry comparison report
#[derive(Debug, Clone, Serialize)]
pub struct ComparaisonResultat {
    pub comparaisons: Vec<ComparaisonLivraison>,
    pub statistiques: StatistiquesComparaison,
}

/// One line of the dispatch/entry/exit report
#[derive(Debug, Clone, Serialize)]
pub struct LigneRapportEcarts {
    pub date_mouvement: NaiveDate,
    pub magasin_id: Uuid,
    pub magasin_nom: String,
    pub produit_id: Uuid,
    pub produit_nom: String,
    pub produit_reference: String,
    pub quantite_dispatchee: Decimal,
    pub quantite_entree: Decimal,
    pub quantite_sortie: Decimal,
    pub ecart_dispatch_entree: Decimal,
    pub ecart_pourcentage: Decimal,
    /// None when nothing left the warehouse that day
    pub rapport_entree_sortie: Option<Decimal>,
    pub statut: StatutEcart,
}

/// Aggregate statistics of the dispatch/entry/exit report
#[derive(Debug, Clone, Serialize)]
pub struct StatistiquesRapport {
    pub total_lignes: usize,
    pub total_dispatche: Decimal,
    pub total_entree: Decimal,
    pub total_sortie: Decimal,
    pub total_ecart: Decimal,
    pub conformes: usize,
    pub manquants: usize,
    pub excedents: usize,
    pub rapport_global_entree_sortie: Option<Decimal>,
    pub taux_conformite: Decimal,
}

/// Dispatch/entry/exit report
#[derive(Debug, Clone, Serialize)]
pub struct RapportEcarts {
    pub ecarts: Vec<LigneRapportEcarts>,
    pub statistiques: StatistiquesRapport,
}

/// Delivery row feeding the comparison
#[derive(Debug, FromRow)]
struct LivraisonRow {
    id: Uuid,
    numero: String,
    produit_id: Uuid,
    produit_nom: String,
    magasin_id: Uuid,
    magasin_nom: String,
    quantite: Decimal,
    date_livraison: NaiveDate,
    transporteur: Option<String>,
    numero_camion: Option<String>,
    chauffeur_nom: Option<String>,
}

/// Entry row feeding the comparison
#[derive(Debug, FromRow)]
struct EntreeRow {
    id: Uuid,
    reference: String,
    produit_id: Uuid,
    produit_nom: String,
    magasin_id: Uuid,
    magasin_nom: String,
    quantite: Decimal,
    date_entree: NaiveDate,
}

/// Aggregated row of the dispatch/entry/exit query
#[derive(Debug, FromRow)]
struct RapportRow {
    date_mouvement: NaiveDate,
    magasin_id: Uuid,
    magasin_nom: String,
    produit_id: Uuid,
    produit_nom: String,
    produit_reference: String,
    quantite_dispatchee: Decimal,
    quantite_entree: Decimal,
    quantite_sortie: Decimal,
}

impl ReconciliationService {
    /// Create a new ReconciliationService instance
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    /// Compare declared deliveries against warehouse entry records.
    ///
    /// A delivery matches the first entry of the same (produit, magasin,
    /// calendar day); matched pairs are classified by their écart, deliveries
    /// nothing arrived for become `non_recu`, entries nobody declared become
    /// `non_prevu`.
    pub async fn comparaison_livraisons(
        &self,
        magasin_scope: Option<Uuid>,
        filters: &ReconciliationFilters,
    ) -> AppResult<ComparaisonResultat> {
        let livraisons = sqlx::query_as::<_, LivraisonRow>(
            r#"
            SELECT l.id, l.numero, l.produit_id, p.nom AS produit_nom,
                   l.magasin_id, m.nom AS magasin_nom, l.quantite, l.date_livraison,
                   l.transporteur, l.numero_camion, l.chauffeur_nom
            FROM livraisons l
            JOIN produits p ON p.id = l.produit_id
            JOIN magasins m ON m.id = l.magasin_id
            WHERE ($1::date IS NULL OR l.date_livraison >= $1)
              AND ($2::date IS NULL OR l.date_livraison <= $2)
              AND ($3::uuid IS NULL OR l.magasin_id = $3)
              AND ($4::uuid IS NULL OR l.produit_id = $4)
              AND ($5::uuid IS NULL OR l.magasin_id = $5)
            ORDER BY l.date_livraison, l.created_at
            "#,
        )
        .bind(filters.date_debut)
        .bind(filters.date_fin)
        .bind(filters.magasin_id)
        .bind(filters.produit_id)
        .bind(magasin_scope)
        .fetch_all(&self.db)
        .await?;

        let entrees = sqlx::query_as::<_, EntreeRow>(
            r#"
            SELECT mv.id, mv.reference, mv.produit_id, p.nom AS produit_nom,
                   mv.magasin_id, m.nom AS magasin_nom, mv.quantite,
                   mv.date_mouvement::date AS date_entree
            FROM mouvements mv
            JOIN produits p ON p.id = mv.produit_id
            JOIN magasins m ON m.id = mv.magasin_id
            WHERE mv.type = 'entree'
              AND ($1::date IS NULL OR mv.date_mouvement::date >= $1)
              AND ($2::date IS NULL OR mv.date_mouvement::date <= $2)
              AND ($3::uuid IS NULL OR mv.magasin_id = $3)
              AND ($4::uuid IS NULL OR mv.produit_id = $4)
              AND ($5::uuid IS NULL OR mv.magasin_id = $5)
            ORDER BY mv.date_mouvement, mv.id
            "#,
        )
        .bind(filters.date_debut)
        .bind(filters.date_fin)
        .bind(filters.magasin_id)
        .bind(filters.produit_id)
        .bind(magasin_scope)
        .fetch_all(&self.db)
        .await?;

        let cles_livraisons: Vec<CleAppariement> = livraisons
            .iter()
            .map(|l| CleAppariement {
                produit_id: l.produit_id,
                magasin_id: l.magasin_id,
                date: l.date_livraison,
            })
            .collect();
        let cles_entrees: Vec<CleAppariement> = entrees
            .iter()
            .map(|e| CleAppariement {
                produit_id: e.produit_id,
                magasin_id: e.magasin_id,
                date: e.date_entree,
            })
            .collect();

        let mut comparaisons: Vec<ComparaisonLivraison> =
            apparier_par_jour(&cles_livraisons, &cles_entrees)
                .into_iter()
                .map(|ligne| construire_comparaison(&livraisons, &entrees, ligne))
                .collect();

        if let Some(statut) = filters.statut.as_deref().and_then(StatutEcart::from_str) {
            comparaisons.retain(|c| c.statut == statut);
        }

        let statistiques = calculer_statistiques_comparaison(&comparaisons);

        Ok(ComparaisonResultat {
            comparaisons,
            statistiques,
        })
    }

    /// Dispatch vs entry vs exit, per (magasin, produit, day).
    ///
    /// Dispatched quantities are grouped by destination warehouse and
    /// creation day; the entry/exit columns come from the movement ledger.
    pub async fn rapport_ecarts(&self, filters: &ReconciliationFilters) -> AppResult<RapportEcarts> {
        let rows = sqlx::query_as::<_, RapportRow>(
            r#"
            SELECT date_mouvement, magasin_id, magasin_nom,
                   produit_id, produit_nom, produit_reference,
                   SUM(quantite_dispatchee) AS quantite_dispatchee,
                   SUM(quantite_entree) AS quantite_entree,
                   SUM(quantite_sortie) AS quantite_sortie
            FROM (
                SELECT d.created_at::date AS date_mouvement,
                       d.magasin_destination_id AS magasin_id, m.nom AS magasin_nom,
                       d.produit_id, p.nom AS produit_nom, p.reference AS produit_reference,
                       d.quantite_totale AS quantite_dispatchee,
                       0::numeric AS quantite_entree,
                       0::numeric AS quantite_sortie
                FROM dispatches d
                JOIN magasins m ON m.id = d.magasin_destination_id
                JOIN produits p ON p.id = d.produit_id
                WHERE d.statut IN ('en_attente', 'en_cours', 'termine')

                UNION ALL

                SELECT mv.date_mouvement::date, mv.magasin_id, m.nom,
                       mv.produit_id, p.nom, p.reference,
                       0::numeric, mv.quantite, 0::numeric
                FROM mouvements mv
                JOIN magasins m ON m.id = mv.magasin_id
                JOIN produits p ON p.id = mv.produit_id
                WHERE mv.type = 'entree'

                UNION ALL

                SELECT mv.date_mouvement::date, mv.magasin_id, m.nom,
                       mv.produit_id, p.nom, p.reference,
                       0::numeric, 0::numeric, mv.quantite
                FROM mouvements mv
                JOIN magasins m ON m.id = mv.magasin_id
                JOIN produits p ON p.id = mv.produit_id
                WHERE mv.type = 'sortie'
            ) combined
            WHERE ($1::date IS NULL OR date_mouvement >= $1)
              AND ($2::date IS NULL OR date_mouvement <= $2)
              AND ($3::uuid IS NULL OR magasin_id = $3)
              AND ($4::uuid IS NULL OR produit_id = $4)
            GROUP BY date_mouvement, magasin_id, magasin_nom,
                     produit_id, produit_nom, produit_reference
            ORDER BY date_mouvement DESC, magasin_nom, produit_nom
            "#,
        )
        .bind(filters.date_debut)
        .bind(filters.date_fin)
        .bind(filters.magasin_id)
        .bind(filters.produit_id)
        .fetch_all(&self.db)
        .await?;

        let mut ecarts: Vec<LigneRapportEcarts> = rows
            .into_iter()
            .map(|row| {
                let ecart = row.quantite_dispatchee - row.quantite_entree;
                LigneRapportEcarts {
                    date_mouvement: row.date_mouvement,
                    magasin_id: row.magasin_id,
                    magasin_nom: row.magasin_nom,
                    produit_id: row.produit_id,
                    produit_nom: row.produit_nom,
                    produit_reference: row.produit_reference,
                    ecart_dispatch_entree: ecart,
                    ecart_pourcentage: ecart_pourcentage(ecart, row.quantite_dispatchee),
                    rapport_entree_sortie: rapport_entree_sortie(
                        row.quantite_entree,
                        row.quantite_sortie,
                    ),
                    statut: classer_ecart(ecart),
                    quantite_dispatchee: row.quantite_dispatchee,
                    quantite_entree: row.quantite_entree,
                    quantite_sortie: row.quantite_sortie,
                }
            })
            .collect();

        match filters.type_ecart.as_deref() {
            Some("positif") => ecarts.retain(|e| e.ecart_dispatch_entree > Decimal::ZERO),
            Some("negatif") => ecarts.retain(|e| e.ecart_dispatch_entree < Decimal::ZERO),
            Some("nul") => ecarts.retain(|e| e.ecart_dispatch_entree == Decimal::ZERO),
            _ => {}
        }

        let statistiques = calculer_statistiques_rapport(&ecarts);

        Ok(RapportEcarts { ecarts, statistiques })
    }
}

/// Build one comparison line out of a pairing result
fn construire_comparaison(
    livraisons: &[LivraisonRow],
    entrees: &[EntreeRow],
    ligne: shared::models::Appariement,
) -> ComparaisonLivraison {
    let livraison = ligne.livraison.map(|i| &livraisons[i]);
    let entree = ligne.entree.map(|j| &entrees[j]);

    let quantite_livree = livraison.map(|l| l.quantite).unwrap_or(Decimal::ZERO);
    let quantite_recue = entree.map(|e| e.quantite).unwrap_or(Decimal::ZERO);
    let ecart = quantite_livree - quantite_recue;

    let statut = match (livraison, entree) {
        (Some(_), Some(_)) => classer_ecart(ecart),
        (Some(_), None) => StatutEcart::NonRecu,
        _ => StatutEcart::NonPrevu,
    };

    // Display fields come from whichever side exists; ids match when both do
    let (produit_id, produit_nom, magasin_id, magasin_nom, date) = match (livraison, entree) {
        (Some(l), _) => (
            l.produit_id,
            l.produit_nom.clone(),
            l.magasin_id,
            l.magasin_nom.clone(),
            l.date_livraison,
        ),
        (None, Some(e)) => (
            e.produit_id,
            e.produit_nom.clone(),
            e.magasin_id,
            e.magasin_nom.clone(),
            e.date_entree,
        ),
        (None, None) => unreachable!("pairing always carries at least one side"),
    };

    ComparaisonLivraison {
        livraison_id: livraison.map(|l| l.id),
        numero_livraison: livraison.map(|l| l.numero.clone()),
        mouvement_id: entree.map(|e| e.id),
        reference_mouvement: entree.map(|e| e.reference.clone()),
        produit_id,
        produit_nom,
        magasin_id,
        magasin_nom,
        date,
        transporteur: livraison.and_then(|l| l.transporteur.clone()),
        numero_camion: livraison.and_then(|l| l.numero_camion.clone()),
        chauffeur_nom: livraison.and_then(|l| l.chauffeur_nom.clone()),
        quantite_livree,
        quantite_recue,
        ecart,
        ecart_pourcentage: ecart_pourcentage(ecart, quantite_livree),
        statut,
    }
}

fn calculer_statistiques_comparaison(
    comparaisons: &[ComparaisonLivraison],
) -> StatistiquesComparaison {
    let compter = |statut: StatutEcart| comparaisons.iter().filter(|c| c.statut == statut).count();

    let conformes = compter(StatutEcart::Conforme);
    StatistiquesComparaison {
        total: comparaisons.len(),
        conformes,
        manquants: compter(StatutEcart::Manquant),
        excedents: compter(StatutEcart::Excedent),
        non_recus: compter(StatutEcart::NonRecu),
        non_prevus: compter(StatutEcart::NonPrevu),
        total_ecart_absolu: comparaisons.iter().map(|c| c.ecart.abs()).sum(),
        taux_conformite: taux_conformite(conformes, comparaisons.len()),
    }
}

fn calculer_statistiques_rapport(ecarts: &[LigneRapportEcarts]) -> StatistiquesRapport {
    let compter = |statut: StatutEcart| ecarts.iter().filter(|e| e.statut == statut).count();

    let total_entree: Decimal = ecarts.iter().map(|e| e.quantite_entree).sum();
    let total_sortie: Decimal = ecarts.iter().map(|e| e.quantite_sortie).sum();
    let conformes = compter(StatutEcart::Conforme);

    StatistiquesRapport {
        total_lignes: ecarts.len(),
        total_dispatche: ecarts.iter().map(|e| e.quantite_dispatchee).sum(),
        total_entree,
        total_sortie,
        total_ecart: ecarts.iter().map(|e| e.ecart_dispatch_entree.abs()).sum(),
        conformes,
        manquants: compter(StatutEcart::Manquant),
        excedents: compter(StatutEcart::Excedent),
        rapport_global_entree_sortie: rapport_entree_sortie(total_entree, total_sortie),
        taux_conformite: taux_conformite(conformes, ecarts.len()),
    }
}
