//! Rotation lifecycle service
//!
//! Drives a rotation from planifie to a terminal state. Transitions are
//! irreversible because they mirror physical events: a departed truck cannot
//! be un-departed, a received load cannot be un-received. The receipt is the
//! only operation with ledger side effects, and it runs in one transaction.

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use shared::models::{calculer_ecart, RotationStatut};
use sqlx::{FromRow, PgPool};
use uuid::Uuid;

use crate::error::{AppError, AppResult};
use crate::services::dispatch::DispatchService;
use crate::services::stock::StockService;

/// Rotation service for lifecycle transitions and listings
#[derive(Clone)]
pub struct RotationService {
    db: PgPool,
}

/// Rotation with referential display fields
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct RotationDetail {
    pub id: Uuid,
    pub numero_rotation: String,
    pub dispatch_id: Uuid,
    pub numero_dispatch: String,
    pub chauffeur_id: Uuid,
    pub chauffeur_nom: String,
    pub numero_camion: Option<String>,
    pub capacite_camion: Decimal,
    pub produit_nom: String,
    pub produit_reference: String,
    pub magasin_source_nom: String,
    pub magasin_destination_nom: String,
    pub quantite_prevue: Decimal,
    pub quantite_livree: Option<Decimal>,
    pub ecart: Option<Decimal>,
    pub statut: String,
    pub heure_depart: Option<DateTime<Utc>>,
    pub heure_arrivee: Option<DateTime<Utc>>,
    pub reception_par: Option<Uuid>,
    pub observations: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Input for receiving a rotation at the destination warehouse
#[derive(Debug, Deserialize)]
pub struct ReceptionInput {
    pub quantite_livree: Decimal,
    pub observations: Option<String>,
}

/// Input for marking a rotation entirely lost or rejected
#[derive(Debug, Default, Deserialize)]
pub struct PerteInput {
    pub observations: Option<String>,
}

/// Receipt outcome returned to the operator
#[derive(Debug, Clone, Serialize)]
pub struct ReceptionRotation {
    #[serde(flatten)]
    pub rotation: RotationDetail,
    pub dispatch_termine: bool,
}

/// Listing filters
#[derive(Debug, Default, Deserialize)]
pub struct RotationFilters {
    pub date: Option<NaiveDate>,
    pub statut: Option<String>,
    pub magasin_id: Option<Uuid>,
    pub dispatch_id: Option<Uuid>,
    pub chauffeur_id: Option<Uuid>,
    pub date_debut: Option<NaiveDate>,
    pub date_fin: Option<NaiveDate>,
}

/// Per-driver écart statistics
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct StatistiqueChauffeur {
    pub chauffeur_id: Uuid,
    pub chauffeur_nom: String,
    pub nombre_ecarts: i64,
    pub total_ecart: Decimal,
    pub ecart_moyen: Decimal,
}

/// Écart report: faulty rotations plus per-driver statistics
#[derive(Debug, Clone, Serialize)]
pub struct EcartsRotations {
    pub rotations: Vec<RotationDetail>,
    pub statistiques: Vec<StatistiqueChauffeur>,
}

const ROTATION_SELECT: &str = r#"
    SELECT r.id, r.numero_rotation, r.dispatch_id, d.numero_dispatch,
           r.chauffeur_id, c.nom AS chauffeur_nom, c.numero_camion, c.capacite_camion,
           p.nom AS produit_nom, p.reference AS produit_reference,
           ms.nom AS magasin_source_nom, md.nom AS magasin_destination_nom,
           r.quantite_prevue, r.quantite_livree, r.ecart, r.statut,
           r.heure_depart, r.heure_arrivee, r.reception_par, r.observations, r.created_at
    FROM rotations r
    JOIN dispatches d ON d.id = r.dispatch_id
    JOIN chauffeurs c ON c.id = r.chauffeur_id
    JOIN produits p ON p.id = d.produit_id
    JOIN magasins ms ON ms.id = d.magasin_source_id
    JOIN magasins md ON md.id = d.magasin_destination_id
"#;

impl RotationService {
    /// Create a new RotationService instance
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    /// Start a rotation: the truck leaves the source warehouse.
    ///
    /// No stock movement here: the quantity was already reserved when the
    /// dispatch was created.
    pub async fn demarrer(&self, rotation_id: Uuid) -> AppResult<RotationDetail> {
        let mut tx = self.db.begin().await?;

        let row: Option<(String, Uuid)> =
            sqlx::query_as("SELECT statut, dispatch_id FROM rotations WHERE id = $1 FOR UPDATE")
                .bind(rotation_id)
                .fetch_optional(&mut *tx)
                .await?;

        let (statut, dispatch_id) = row.ok_or_else(|| AppError::NotFound("Rotation".to_string()))?;
        verifier_transition(&statut, RotationStatut::EnTransit)?;

        sqlx::query("UPDATE rotations SET statut = 'en_transit', heure_depart = NOW() WHERE id = $1")
            .bind(rotation_id)
            .execute(&mut *tx)
            .await?;

        DispatchService::passer_en_cours_tx(&mut tx, dispatch_id).await?;

        tx.commit().await?;

        self.get_rotation(rotation_id).await
    }

    /// Receive a rotation at the destination warehouse.
    ///
    /// A received truck is always `livre`, whatever the shortfall; the écart
    /// is recorded for reconciliation. Writes the sortie/entrée movement
    /// pair, credits the destination stock line with exactly the delivered
    /// quantity, and closes the dispatch when this was the last leg — all in
    /// one transaction.
    pub async fn receptionner(
        &self,
        rotation_id: Uuid,
        operateur_id: Uuid,
        input: ReceptionInput,
    ) -> AppResult<ReceptionRotation> {
        if input.quantite_livree < Decimal::ZERO {
            return Err(AppError::Validation {
                field: "quantite_livree".to_string(),
                message: "Delivered quantity cannot be negative".to_string(),
                message_fr: "La quantité livrée ne peut pas être négative".to_string(),
            });
        }

        let mut tx = self.db.begin().await?;

        let row: Option<(String, Decimal, String, Uuid, Uuid, Uuid, Uuid, String)> = sqlx::query_as(
            r#"
            SELECT r.statut, r.quantite_prevue, r.numero_rotation,
                   d.id, d.produit_id, d.magasin_source_id, d.magasin_destination_id,
                   d.numero_dispatch
            FROM rotations r
            JOIN dispatches d ON d.id = r.dispatch_id
            WHERE r.id = $1
            FOR UPDATE OF r
            "#,
        )
        .bind(rotation_id)
        .fetch_optional(&mut *tx)
        .await?;

        let (
            statut,
            quantite_prevue,
            numero_rotation,
            dispatch_id,
            produit_id,
            magasin_source_id,
            magasin_destination_id,
            numero_dispatch,
        ) = row.ok_or_else(|| AppError::NotFound("Rotation".to_string()))?;

        verifier_transition(&statut, RotationStatut::Livre)?;

        let ecart = calculer_ecart(quantite_prevue, input.quantite_livree);

        sqlx::query(
            r#"
            UPDATE rotations
            SET quantite_livree = $2, ecart = $3, statut = 'livre',
                heure_arrivee = NOW(), reception_par = $4, observations = $5
            WHERE id = $1
            "#,
        )
        .bind(rotation_id)
        .bind(input.quantite_livree)
        .bind(ecart)
        .bind(operateur_id)
        .bind(&input.observations)
        .execute(&mut *tx)
        .await?;

        if input.quantite_livree > Decimal::ZERO {
            let description = format!(
                "Rotation {} - Dispatch {}",
                numero_rotation, numero_dispatch
            );

            // Exit at the source, entry at the destination, same reference so
            // the reconciliation can follow the rotation end-to-end
            for (type_mouvement, magasin_id) in [
                ("sortie", magasin_source_id),
                ("entree", magasin_destination_id),
            ] {
                sqlx::query(
                    r#"
                    INSERT INTO mouvements (type, produit_id, magasin_id, quantite,
                                            reference, description, created_by)
                    VALUES ($1, $2, $3, $4, $5, $6, $7)
                    "#,
                )
                .bind(type_mouvement)
                .bind(produit_id)
                .bind(magasin_id)
                .bind(input.quantite_livree)
                .bind(&numero_rotation)
                .bind(&description)
                .bind(operateur_id)
                .execute(&mut *tx)
                .await?;
            }

            StockService::crediter_tx(&mut tx, produit_id, magasin_destination_id, input.quantite_livree)
                .await?;
        }

        let dispatch_termine = DispatchService::cloturer_si_termine_tx(&mut tx, dispatch_id).await?;

        tx.commit().await?;

        tracing::info!(%numero_rotation, %ecart, "rotation réceptionnée");

        Ok(ReceptionRotation {
            rotation: self.get_rotation(rotation_id).await?,
            dispatch_termine,
        })
    }

    /// Mark an in-transit rotation entirely lost or rejected.
    ///
    /// Nothing arrived: no movement records, no stock credit.
    pub async fn marquer_manquante(
        &self,
        rotation_id: Uuid,
        operateur_id: Uuid,
        input: PerteInput,
    ) -> AppResult<ReceptionRotation> {
        let mut tx = self.db.begin().await?;

        let row: Option<(String, Decimal, Uuid)> = sqlx::query_as(
            "SELECT statut, quantite_prevue, dispatch_id FROM rotations WHERE id = $1 FOR UPDATE",
        )
        .bind(rotation_id)
        .fetch_optional(&mut *tx)
        .await?;

        let (statut, quantite_prevue, dispatch_id) =
            row.ok_or_else(|| AppError::NotFound("Rotation".to_string()))?;

        verifier_transition(&statut, RotationStatut::Manquant)?;

        sqlx::query(
            r#"
            UPDATE rotations
            SET quantite_livree = 0, ecart = $2, statut = 'manquant',
                heure_arrivee = NOW(), reception_par = $3, observations = $4
            WHERE id = $1
            "#,
        )
        .bind(rotation_id)
        .bind(quantite_prevue)
        .bind(operateur_id)
        .bind(&input.observations)
        .execute(&mut *tx)
        .await?;

        let dispatch_termine = DispatchService::cloturer_si_termine_tx(&mut tx, dispatch_id).await?;

        tx.commit().await?;

        Ok(ReceptionRotation {
            rotation: self.get_rotation(rotation_id).await?,
            dispatch_termine,
        })
    }

    /// Cancel a rotation that has not departed yet; its quantity returns to
    /// the dispatch's unallocated pool. Stock is untouched.
    pub async fn annuler(&self, rotation_id: Uuid) -> AppResult<RotationDetail> {
        let mut tx = self.db.begin().await?;

        let statut: Option<String> =
            sqlx::query_scalar("SELECT statut FROM rotations WHERE id = $1 FOR UPDATE")
                .bind(rotation_id)
                .fetch_optional(&mut *tx)
                .await?;

        let statut = statut.ok_or_else(|| AppError::NotFound("Rotation".to_string()))?;
        verifier_transition(&statut, RotationStatut::Annule)?;

        sqlx::query("UPDATE rotations SET statut = 'annule' WHERE id = $1")
            .bind(rotation_id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;

        self.get_rotation(rotation_id).await
    }

    /// Get a rotation by ID (display fields included)
    pub async fn get_rotation(&self, rotation_id: Uuid) -> AppResult<RotationDetail> {
        let query = format!("{ROTATION_SELECT} WHERE r.id = $1");

        sqlx::query_as::<_, RotationDetail>(&query)
            .bind(rotation_id)
            .fetch_optional(&self.db)
            .await?
            .ok_or_else(|| AppError::NotFound("Rotation".to_string()))
    }

    /// List rotations with filters; operators are scoped to the rotations
    /// destined to their warehouse.
    pub async fn lister(
        &self,
        magasin_scope: Option<Uuid>,
        filters: &RotationFilters,
    ) -> AppResult<Vec<RotationDetail>> {
        let query = format!(
            r#"{ROTATION_SELECT}
            WHERE ($1::date IS NULL OR r.created_at::date = $1)
              AND ($2::text IS NULL OR r.statut = $2)
              AND ($3::uuid IS NULL OR d.magasin_destination_id = $3)
              AND ($4::uuid IS NULL OR r.dispatch_id = $4)
              AND ($5::uuid IS NULL OR r.chauffeur_id = $5)
              AND ($6::date IS NULL OR r.created_at::date >= $6)
              AND ($7::date IS NULL OR r.created_at::date <= $7)
              AND ($8::uuid IS NULL OR d.magasin_destination_id = $8)
            ORDER BY r.created_at DESC
            "#
        );

        let rotations = sqlx::query_as::<_, RotationDetail>(&query)
            .bind(filters.date)
            .bind(&filters.statut)
            .bind(filters.magasin_id)
            .bind(filters.dispatch_id)
            .bind(filters.chauffeur_id)
            .bind(filters.date_debut)
            .bind(filters.date_fin)
            .bind(magasin_scope)
            .fetch_all(&self.db)
            .await?;

        Ok(rotations)
    }

    /// Rotations on the road or about to leave, for the receiving board
    pub async fn en_transit(
        &self,
        magasin_scope: Option<Uuid>,
        magasin_id: Option<Uuid>,
    ) -> AppResult<Vec<RotationDetail>> {
        let query = format!(
            r#"{ROTATION_SELECT}
            WHERE r.statut IN ('planifie', 'en_transit')
              AND ($1::uuid IS NULL OR d.magasin_destination_id = $1)
              AND ($2::uuid IS NULL OR d.magasin_destination_id = $2)
            ORDER BY r.heure_depart DESC NULLS LAST, r.created_at DESC
            "#
        );

        let rotations = sqlx::query_as::<_, RotationDetail>(&query)
            .bind(magasin_id)
            .bind(magasin_scope)
            .fetch_all(&self.db)
            .await?;

        Ok(rotations)
    }

    /// Rotations of one dispatch, in allocation order
    pub async fn par_dispatch(&self, dispatch_id: Uuid) -> AppResult<Vec<RotationDetail>> {
        let query = format!("{ROTATION_SELECT} WHERE r.dispatch_id = $1 ORDER BY r.numero_rotation");

        let rotations = sqlx::query_as::<_, RotationDetail>(&query)
            .bind(dispatch_id)
            .fetch_all(&self.db)
            .await?;

        Ok(rotations)
    }

    /// Rotations with a positive écart over a period, plus per-driver
    /// statistics. Systematic shortfalls by the same driver show up here.
    pub async fn rapport_ecarts(
        &self,
        filters: &RotationFilters,
    ) -> AppResult<EcartsRotations> {
        let query = format!(
            r#"{ROTATION_SELECT}
            WHERE r.ecart > 0
              AND ($1::uuid IS NULL OR r.chauffeur_id = $1)
              AND ($2::date IS NULL OR r.heure_arrivee::date >= $2)
              AND ($3::date IS NULL OR r.heure_arrivee::date <= $3)
            ORDER BY r.ecart DESC
            "#
        );

        let rotations = sqlx::query_as::<_, RotationDetail>(&query)
            .bind(filters.chauffeur_id)
            .bind(filters.date_debut)
            .bind(filters.date_fin)
            .fetch_all(&self.db)
            .await?;

        let statistiques = sqlx::query_as::<_, StatistiqueChauffeur>(
            r#"
            SELECT r.chauffeur_id, c.nom AS chauffeur_nom,
                   COUNT(*) AS nombre_ecarts,
                   SUM(r.ecart) AS total_ecart,
                   AVG(r.ecart) AS ecart_moyen
            FROM rotations r
            JOIN chauffeurs c ON c.id = r.chauffeur_id
            WHERE r.ecart > 0
              AND ($1::uuid IS NULL OR r.chauffeur_id = $1)
              AND ($2::date IS NULL OR r.heure_arrivee::date >= $2)
              AND ($3::date IS NULL OR r.heure_arrivee::date <= $3)
            GROUP BY r.chauffeur_id, c.nom
            ORDER BY total_ecart DESC
            "#,
        )
        .bind(filters.chauffeur_id)
        .bind(filters.date_debut)
        .bind(filters.date_fin)
        .fetch_all(&self.db)
        .await?;

        Ok(EcartsRotations {
            rotations,
            statistiques,
        })
    }
}

/// Check a status transition, with a message naming both states
fn verifier_transition(statut_actuel: &str, vers: RotationStatut) -> AppResult<()> {
    let actuel = RotationStatut::from_str(statut_actuel)
        .ok_or_else(|| AppError::Internal(format!("Unknown rotation status: {}", statut_actuel)))?;

    if !actuel.transition_valide(vers) {
        return Err(AppError::InvalidStateTransition(format!(
            "Rotation cannot go from '{}' to '{}'",
            actuel.as_str(),
            vers.as_str()
        )));
    }
    Ok(())
}
