//! Dispatch planning service
//!
//! A dispatch is a manager's instruction to move a quantity of product from
//! a source warehouse toward a client's destination warehouse. Creating one
//! reserves the quantity on the source stock line; the physical movement is
//! carried out by rotations.

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use shared::models::{DispatchStatut, ProgressionDispatch};
use sqlx::{FromRow, PgPool, Postgres, Transaction};
use uuid::Uuid;

use crate::error::{AppError, AppResult};
use crate::services::referentiel::ReferentielService;
use crate::services::rotation::RotationDetail;
use crate::services::stock::StockService;

/// Dispatch service for creating, listing and cancelling dispatches
#[derive(Clone)]
pub struct DispatchService {
    db: PgPool,
}

/// Dispatch with referential display fields
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct DispatchDetail {
    pub id: Uuid,
    pub numero_dispatch: String,
    pub manager_id: Uuid,
    pub client_id: Uuid,
    pub client_nom: String,
    pub produit_id: Uuid,
    pub produit_nom: String,
    pub produit_reference: String,
    pub magasin_source_id: Uuid,
    pub magasin_source_nom: String,
    pub magasin_destination_id: Uuid,
    pub magasin_destination_nom: String,
    pub quantite_totale: Decimal,
    pub statut: String,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub date_completion: Option<DateTime<Utc>>,
}

/// Dispatch with its rotations
#[derive(Debug, Clone, Serialize)]
pub struct DispatchAvecRotations {
    #[serde(flatten)]
    pub dispatch: DispatchDetail,
    pub rotations: Vec<RotationDetail>,
}

/// Progression of a pending dispatch against its allocated rotations
#[derive(Debug, Clone, Serialize)]
pub struct DispatchProgression {
    #[serde(flatten)]
    pub dispatch: DispatchDetail,
    #[serde(flatten)]
    pub progression: ProgressionDispatch,
}

/// Input for creating a dispatch
#[derive(Debug, Deserialize)]
pub struct CreateDispatchInput {
    pub client_id: Uuid,
    pub produit_id: Uuid,
    pub magasin_source_id: Uuid,
    pub magasin_destination_id: Uuid,
    pub quantite_totale: Decimal,
    pub notes: Option<String>,
}

/// Listing filters
#[derive(Debug, Default, Deserialize)]
pub struct DispatchFilters {
    pub statut: Option<String>,
    pub magasin_id: Option<Uuid>,
    pub date_debut: Option<NaiveDate>,
    pub date_fin: Option<NaiveDate>,
}

/// Role-based visibility, computed by the handler from the caller identity
#[derive(Debug, Clone, Copy, Default)]
pub struct DispatchScope {
    /// Managers only see their own dispatches
    pub manager_id: Option<Uuid>,
    /// Operators only see dispatches destined to their warehouse
    pub magasin_destination_id: Option<Uuid>,
}

const DISPATCH_SELECT: &str = r#"
    SELECT d.id, d.numero_dispatch, d.manager_id,
           d.client_id, c.nom AS client_nom,
           d.produit_id, p.nom AS produit_nom, p.reference AS produit_reference,
           d.magasin_source_id, ms.nom AS magasin_source_nom,
           d.magasin_destination_id, md.nom AS magasin_destination_nom,
           d.quantite_totale, d.statut, d.notes, d.created_at, d.date_completion
    FROM dispatches d
    JOIN clients c ON c.id = d.client_id
    JOIN produits p ON p.id = d.produit_id
    JOIN magasins ms ON ms.id = d.magasin_source_id
    JOIN magasins md ON md.id = d.magasin_destination_id
"#;

impl DispatchService {
    /// Create a new DispatchService instance
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    /// Create a dispatch, reserving its quantity on the source stock line.
    ///
    /// Validation happens before any side effect; the reservation and the
    /// insert share one transaction so a failed insert cannot leak stock.
    pub async fn creer_dispatch(
        &self,
        manager_id: Uuid,
        input: CreateDispatchInput,
    ) -> AppResult<DispatchDetail> {
        if input.quantite_totale <= Decimal::ZERO {
            return Err(AppError::Validation {
                field: "quantite_totale".to_string(),
                message: "Total quantity must be positive".to_string(),
                message_fr: "La quantité totale doit être positive".to_string(),
            });
        }

        if input.magasin_source_id == input.magasin_destination_id {
            return Err(AppError::Validation {
                field: "magasin_destination_id".to_string(),
                message: "Source and destination warehouses must differ".to_string(),
                message_fr: "Les magasins source et destination doivent être différents".to_string(),
            });
        }

        let referentiel = ReferentielService::new(self.db.clone());
        if !referentiel.client_existe(input.client_id).await? {
            return Err(AppError::NotFound("Client".to_string()));
        }
        referentiel.get_produit(input.produit_id).await?;
        referentiel.get_magasin(input.magasin_source_id).await?;
        referentiel.get_magasin(input.magasin_destination_id).await?;

        let numero_dispatch = generer_numero_dispatch();

        let mut tx = self.db.begin().await?;

        StockService::reserver_tx(
            &mut tx,
            input.produit_id,
            input.magasin_source_id,
            input.quantite_totale,
        )
        .await?;

        let dispatch_id: Uuid = sqlx::query_scalar(
            r#"
            INSERT INTO dispatches (
                numero_dispatch, manager_id, client_id, produit_id,
                magasin_source_id, magasin_destination_id, quantite_totale, statut, notes
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, 'en_attente', $8)
            RETURNING id
            "#,
        )
        .bind(&numero_dispatch)
        .bind(manager_id)
        .bind(input.client_id)
        .bind(input.produit_id)
        .bind(input.magasin_source_id)
        .bind(input.magasin_destination_id)
        .bind(input.quantite_totale)
        .bind(&input.notes)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;

        tracing::info!(%numero_dispatch, quantite = %input.quantite_totale, "dispatch créé");

        self.get_dispatch_detail(dispatch_id).await
    }

    /// Cancel a dispatch and release its reservation.
    ///
    /// Only possible while nothing moved: statut en_attente and no live
    /// rotation. The dispatch row is locked so a concurrent rotation
    /// creation cannot slip in between the check and the update.
    pub async fn annuler_dispatch(&self, dispatch_id: Uuid) -> AppResult<DispatchDetail> {
        let mut tx = self.db.begin().await?;

        let dispatch: Option<(String, Uuid, Uuid, Decimal)> = sqlx::query_as(
            r#"
            SELECT statut, produit_id, magasin_source_id, quantite_totale
            FROM dispatches WHERE id = $1 FOR UPDATE
            "#,
        )
        .bind(dispatch_id)
        .fetch_optional(&mut *tx)
        .await?;

        let (statut, produit_id, magasin_source_id, quantite_totale) =
            dispatch.ok_or_else(|| AppError::NotFound("Dispatch".to_string()))?;

        if statut != DispatchStatut::EnAttente.as_str() {
            return Err(AppError::InvalidStateTransition(format!(
                "Only a pending dispatch can be cancelled, current status: {}",
                statut
            )));
        }

        let rotations_vivantes: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM rotations WHERE dispatch_id = $1 AND statut <> 'annule'",
        )
        .bind(dispatch_id)
        .fetch_one(&mut *tx)
        .await?;

        if rotations_vivantes > 0 {
            return Err(AppError::InvalidStateTransition(
                "Cannot cancel a dispatch that already has rotations".to_string(),
            ));
        }

        StockService::liberer_tx(&mut tx, produit_id, magasin_source_id, quantite_totale).await?;

        sqlx::query("UPDATE dispatches SET statut = 'annule' WHERE id = $1")
            .bind(dispatch_id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;

        self.get_dispatch_detail(dispatch_id).await
    }

    /// List dispatches with filters and role-based scoping
    pub async fn lister_dispatches(
        &self,
        scope: DispatchScope,
        filters: &DispatchFilters,
    ) -> AppResult<Vec<DispatchDetail>> {
        let query = format!(
            r#"{DISPATCH_SELECT}
            WHERE ($1::text IS NULL OR d.statut = $1)
              AND ($2::uuid IS NULL OR d.magasin_source_id = $2 OR d.magasin_destination_id = $2)
              AND ($3::date IS NULL OR d.created_at::date >= $3)
              AND ($4::date IS NULL OR d.created_at::date <= $4)
              AND ($5::uuid IS NULL OR d.manager_id = $5)
              AND ($6::uuid IS NULL OR d.magasin_destination_id = $6)
            ORDER BY d.created_at DESC
            "#
        );

        let dispatches = sqlx::query_as::<_, DispatchDetail>(&query)
            .bind(&filters.statut)
            .bind(filters.magasin_id)
            .bind(filters.date_debut)
            .bind(filters.date_fin)
            .bind(scope.manager_id)
            .bind(scope.magasin_destination_id)
            .fetch_all(&self.db)
            .await?;

        Ok(dispatches)
    }

    /// Get a dispatch with its rotations
    pub async fn get_dispatch(&self, dispatch_id: Uuid) -> AppResult<DispatchAvecRotations> {
        let dispatch = self.get_dispatch_detail(dispatch_id).await?;
        let rotations = crate::services::rotation::RotationService::new(self.db.clone())
            .par_dispatch(dispatch_id)
            .await?;

        Ok(DispatchAvecRotations { dispatch, rotations })
    }

    /// Get a dispatch by ID (display fields included)
    pub async fn get_dispatch_detail(&self, dispatch_id: Uuid) -> AppResult<DispatchDetail> {
        let query = format!("{DISPATCH_SELECT} WHERE d.id = $1");

        sqlx::query_as::<_, DispatchDetail>(&query)
            .bind(dispatch_id)
            .fetch_optional(&self.db)
            .await?
            .ok_or_else(|| AppError::NotFound("Dispatch".to_string()))
    }

    /// Allocation progress of the dispatches still being fulfilled
    pub async fn progression_dispatches(
        &self,
        scope: DispatchScope,
    ) -> AppResult<Vec<DispatchProgression>> {
        let query = format!(
            r#"
            SELECT q.*, COALESCE(r.quantite_allouee, 0) AS quantite_allouee,
                   COALESCE(r.nombre_rotations, 0) AS nombre_rotations
            FROM ({DISPATCH_SELECT}
                  WHERE d.statut IN ('en_attente', 'en_cours')
                    AND ($1::uuid IS NULL OR d.manager_id = $1)
                    AND ($2::uuid IS NULL OR d.magasin_destination_id = $2)) q
            LEFT JOIN (
                SELECT dispatch_id,
                       SUM(quantite_prevue) FILTER (WHERE statut <> 'annule') AS quantite_allouee,
                       COUNT(*) FILTER (WHERE statut <> 'annule') AS nombre_rotations
                FROM rotations
                GROUP BY dispatch_id
            ) r ON r.dispatch_id = q.id
            ORDER BY q.created_at DESC
            "#
        );

        #[derive(FromRow)]
        struct ProgressionRow {
            #[sqlx(flatten)]
            dispatch: DispatchDetail,
            quantite_allouee: Decimal,
            nombre_rotations: i64,
        }

        let rows = sqlx::query_as::<_, ProgressionRow>(&query)
            .bind(scope.manager_id)
            .bind(scope.magasin_destination_id)
            .fetch_all(&self.db)
            .await?;

        Ok(rows
            .into_iter()
            .map(|r| DispatchProgression {
                progression: ProgressionDispatch::calculer(
                    r.dispatch.quantite_totale,
                    r.quantite_allouee,
                    r.nombre_rotations,
                ),
                dispatch: r.dispatch,
            })
            .collect())
    }

    /// Mark a dispatch en_cours when its first rotation departs
    pub(crate) async fn passer_en_cours_tx(
        tx: &mut Transaction<'_, Postgres>,
        dispatch_id: Uuid,
    ) -> AppResult<()> {
        sqlx::query("UPDATE dispatches SET statut = 'en_cours' WHERE id = $1 AND statut = 'en_attente'")
            .bind(dispatch_id)
            .execute(&mut **tx)
            .await?;
        Ok(())
    }

    /// Close the dispatch once every live rotation is terminal and the full
    /// quantity has been allocated. Returns whether it was closed.
    pub(crate) async fn cloturer_si_termine_tx(
        tx: &mut Transaction<'_, Postgres>,
        dispatch_id: Uuid,
    ) -> AppResult<bool> {
        let (statut, quantite_totale): (String, Decimal) =
            sqlx::query_as("SELECT statut, quantite_totale FROM dispatches WHERE id = $1 FOR UPDATE")
                .bind(dispatch_id)
                .fetch_one(&mut **tx)
                .await?;

        match DispatchStatut::from_str(&statut) {
            Some(s) if !s.est_terminal() => {}
            _ => return Ok(false),
        }

        let (en_cours, vivantes, allouee): (i64, i64, Decimal) = sqlx::query_as(
            r#"
            SELECT COUNT(*) FILTER (WHERE statut IN ('planifie', 'en_transit')),
                   COUNT(*) FILTER (WHERE statut <> 'annule'),
                   COALESCE(SUM(quantite_prevue) FILTER (WHERE statut <> 'annule'), 0)
            FROM rotations WHERE dispatch_id = $1
            "#,
        )
        .bind(dispatch_id)
        .fetch_one(&mut **tx)
        .await?;

        if en_cours > 0 || vivantes == 0 || allouee < quantite_totale {
            return Ok(false);
        }

        sqlx::query(
            "UPDATE dispatches SET statut = 'termine', date_completion = NOW() WHERE id = $1",
        )
        .bind(dispatch_id)
        .execute(&mut **tx)
        .await?;

        tracing::info!(%dispatch_id, "dispatch terminé");

        Ok(true)
    }
}

/// Generate a unique dispatch number: DISP-YYYYMMDD-XXXX
fn generer_numero_dispatch() -> String {
    let date = Utc::now().format("%Y%m%d");
    let suffixe = Uuid::new_v4().simple().to_string()[..4].to_uppercase();
    format!("DISP-{}-{}", date, suffixe)
}
