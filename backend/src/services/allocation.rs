//! Rotation allocation service
//!
//! Splits a dispatch quantity into truck-bounded rotations. The heuristic
//! itself is the pure `planifier_rotations` in the shared crate; this
//! service resolves the candidate trucks, applies the dispatch quota and
//! persists accepted plans atomically.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use shared::models::{planifier_rotations, DispatchStatut, PlanificationErreur, RotationPlanifiee};
use sqlx::{PgPool, Postgres, Transaction};
use uuid::Uuid;

use crate::error::{AppError, AppResult};
use crate::services::referentiel::ReferentielService;
use crate::services::rotation::{RotationDetail, RotationService};

/// Allocation service proposing and persisting rotation plans
#[derive(Clone)]
pub struct AllocationService {
    db: PgPool,
}

/// Input for computing a rotation plan
#[derive(Debug, Default, Deserialize)]
pub struct CalculRotationsInput {
    /// Restrict the plan to these drivers; all active drivers otherwise
    pub chauffeurs_disponibles: Option<Vec<Uuid>>,
}

/// Proposed plan covering the unallocated remainder of a dispatch
#[derive(Debug, Clone, Serialize)]
pub struct PlanRotations {
    pub dispatch_id: Uuid,
    pub quantite_totale: Decimal,
    pub quantite_a_planifier: Decimal,
    pub nombre_rotations: usize,
    pub rotations: Vec<RotationPlanifiee>,
}

/// Input for adding a single rotation
#[derive(Debug, Deserialize)]
pub struct AjoutRotationInput {
    pub chauffeur_id: Uuid,
    pub quantite_prevue: Decimal,
    pub observations: Option<String>,
}

/// Input for persisting a batch of rotations atomically
#[derive(Debug, Deserialize)]
pub struct CreationMultipleInput {
    pub rotations: Vec<AjoutRotationInput>,
}

/// Dispatch fields the allocator needs, read under lock
struct DispatchVerrouille {
    numero_dispatch: String,
    quantite_totale: Decimal,
    quota_restant: Decimal,
    rotations_existantes: i64,
}

impl AllocationService {
    /// Create a new AllocationService instance
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    /// Compute a rotation plan for the unallocated remainder of a dispatch.
    ///
    /// The proposal is never persisted; the caller reviews it and submits it
    /// through the batch endpoint. When one pass over the trucks cannot
    /// cover the remainder the call fails with the total capacity, so the
    /// caller can add trucks or plan a later pass with the same ones.
    pub async fn calculer(
        &self,
        dispatch_id: Uuid,
        input: &CalculRotationsInput,
    ) -> AppResult<PlanRotations> {
        let mut tx = self.db.begin().await?;
        let dispatch = Self::verrouiller_dispatch(&mut tx, dispatch_id).await?;
        tx.commit().await?;

        if dispatch.quota_restant <= Decimal::ZERO {
            return Err(AppError::ValidationError(
                "Dispatch is already fully allocated".to_string(),
            ));
        }

        // An empty driver list means no restriction: every active driver
        // becomes a candidate
        let chauffeurs = input
            .chauffeurs_disponibles
            .as_deref()
            .filter(|ids| !ids.is_empty());
        let camions = ReferentielService::new(self.db.clone())
            .camions_disponibles(chauffeurs)
            .await?;

        let premier_numero = u32::try_from(dispatch.rotations_existantes).unwrap_or(0) + 1;
        let rotations = planifier_rotations(dispatch.quota_restant, &camions, premier_numero)
            .map_err(|e| convertir_erreur_plan(e))?;

        Ok(PlanRotations {
            dispatch_id,
            quantite_totale: dispatch.quantite_totale,
            quantite_a_planifier: dispatch.quota_restant,
            nombre_rotations: rotations.len(),
            rotations,
        })
    }

    /// Add a single rotation to a dispatch
    pub async fn ajouter(
        &self,
        dispatch_id: Uuid,
        input: &AjoutRotationInput,
    ) -> AppResult<RotationDetail> {
        let mut tx = self.db.begin().await?;
        let dispatch = Self::verrouiller_dispatch(&mut tx, dispatch_id).await?;

        let rotation_id = Self::inserer_rotation_tx(
            &mut tx,
            dispatch_id,
            &dispatch.numero_dispatch,
            dispatch.rotations_existantes + 1,
            dispatch.quota_restant,
            input,
        )
        .await?;

        tx.commit().await?;

        RotationService::new(self.db.clone()).get_rotation(rotation_id).await
    }

    /// Persist a batch of rotations atomically: any invalid rotation aborts
    /// the whole batch, never leaving a partial allocation behind.
    pub async fn creer_multiples(
        &self,
        dispatch_id: Uuid,
        input: &CreationMultipleInput,
    ) -> AppResult<Vec<RotationDetail>> {
        if input.rotations.is_empty() {
            return Err(AppError::Validation {
                field: "rotations".to_string(),
                message: "At least one rotation is required".to_string(),
                message_fr: "Au moins une rotation est requise".to_string(),
            });
        }

        let mut tx = self.db.begin().await?;
        let dispatch = Self::verrouiller_dispatch(&mut tx, dispatch_id).await?;

        let mut quota_restant = dispatch.quota_restant;
        let mut ids = Vec::with_capacity(input.rotations.len());

        for (index, rotation) in input.rotations.iter().enumerate() {
            let id = Self::inserer_rotation_tx(
                &mut tx,
                dispatch_id,
                &dispatch.numero_dispatch,
                dispatch.rotations_existantes + 1 + index as i64,
                quota_restant,
                rotation,
            )
            .await?;
            quota_restant -= rotation.quantite_prevue;
            ids.push(id);
        }

        tx.commit().await?;

        tracing::info!(
            %dispatch_id,
            nombre = ids.len(),
            "rotations créées en lot"
        );

        let rotation_service = RotationService::new(self.db.clone());
        let mut details = Vec::with_capacity(ids.len());
        for id in ids {
            details.push(rotation_service.get_rotation(id).await?);
        }
        Ok(details)
    }

    /// Lock the dispatch row and compute its unallocated remainder.
    ///
    /// The lock serialises every allocation against this dispatch, which is
    /// what keeps Σ(quantite_prevue) ≤ quantite_totale under concurrency.
    async fn verrouiller_dispatch(
        tx: &mut Transaction<'_, Postgres>,
        dispatch_id: Uuid,
    ) -> AppResult<DispatchVerrouille> {
        let row: Option<(String, String, Decimal)> = sqlx::query_as(
            "SELECT numero_dispatch, statut, quantite_totale FROM dispatches WHERE id = $1 FOR UPDATE",
        )
        .bind(dispatch_id)
        .fetch_optional(&mut **tx)
        .await?;

        let (numero_dispatch, statut, quantite_totale) =
            row.ok_or_else(|| AppError::NotFound("Dispatch".to_string()))?;

        match DispatchStatut::from_str(&statut) {
            Some(s) if !s.est_terminal() => {}
            _ => {
                return Err(AppError::InvalidStateTransition(format!(
                    "Cannot allocate rotations on a dispatch with status '{}'",
                    statut
                )))
            }
        }

        let (rotations_existantes, allouee): (i64, Decimal) = sqlx::query_as(
            r#"
            SELECT COUNT(*),
                   COALESCE(SUM(quantite_prevue) FILTER (WHERE statut <> 'annule'), 0)
            FROM rotations WHERE dispatch_id = $1
            "#,
        )
        .bind(dispatch_id)
        .fetch_one(&mut **tx)
        .await?;

        Ok(DispatchVerrouille {
            numero_dispatch,
            quantite_totale,
            quota_restant: quantite_totale - allouee,
            rotations_existantes,
        })
    }

    /// Validate one rotation against its truck and the remaining quota, then
    /// insert it as planifie.
    async fn inserer_rotation_tx(
        tx: &mut Transaction<'_, Postgres>,
        dispatch_id: Uuid,
        numero_dispatch: &str,
        sequence: i64,
        quota_restant: Decimal,
        input: &AjoutRotationInput,
    ) -> AppResult<Uuid> {
        if input.quantite_prevue <= Decimal::ZERO {
            return Err(AppError::Validation {
                field: "quantite_prevue".to_string(),
                message: "Planned quantity must be positive".to_string(),
                message_fr: "La quantité prévue doit être positive".to_string(),
            });
        }

        let chauffeur: Option<(Decimal, String)> = sqlx::query_as(
            "SELECT capacite_camion, statut FROM chauffeurs WHERE id = $1",
        )
        .bind(input.chauffeur_id)
        .fetch_optional(&mut **tx)
        .await?;

        let (capacite_camion, statut_chauffeur) =
            chauffeur.ok_or_else(|| AppError::NotFound("Chauffeur".to_string()))?;

        if statut_chauffeur != "actif" {
            return Err(AppError::ValidationError(
                "Driver is not active".to_string(),
            ));
        }

        if input.quantite_prevue > capacite_camion {
            return Err(AppError::CapacityExceeded {
                capacite_totale: capacite_camion,
                demande: input.quantite_prevue,
            });
        }

        if input.quantite_prevue > quota_restant {
            return Err(AppError::QuotaExceeded {
                quota_restant,
                demande: input.quantite_prevue,
            });
        }

        let numero_rotation = format!("{}-R{:03}", numero_dispatch, sequence);

        let rotation_id: Uuid = sqlx::query_scalar(
            r#"
            INSERT INTO rotations (numero_rotation, dispatch_id, chauffeur_id,
                                   quantite_prevue, statut, observations)
            VALUES ($1, $2, $3, $4, 'planifie', $5)
            RETURNING id
            "#,
        )
        .bind(&numero_rotation)
        .bind(dispatch_id)
        .bind(input.chauffeur_id)
        .bind(input.quantite_prevue)
        .bind(&input.observations)
        .fetch_one(&mut **tx)
        .await?;

        Ok(rotation_id)
    }
}

fn convertir_erreur_plan(erreur: PlanificationErreur) -> AppError {
    match erreur {
        PlanificationErreur::QuantiteInvalide => {
            AppError::ValidationError("Quantity to allocate must be positive".to_string())
        }
        PlanificationErreur::AucunCamion => {
            AppError::ValidationError("No truck available".to_string())
        }
        PlanificationErreur::CapaciteInsuffisante {
            capacite_totale,
            demande,
        } => AppError::CapacityExceeded {
            capacite_totale,
            demande,
        },
    }
}
