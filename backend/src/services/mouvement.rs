//! Warehouse movement service
//!
//! Operator-entered tonnage ledger: vessel unloadings and direct client
//! pickups come in here, while rotation receipts write their movement pair
//! through the rotation service. Both feed the reconciliation engine.

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use shared::models::TypeMouvement;
use sqlx::{FromRow, PgPool};
use uuid::Uuid;

use crate::error::{AppError, AppResult};
use crate::services::referentiel::ReferentielService;
use crate::services::stock::StockService;

/// Movement service for warehouse entry/exit records
#[derive(Clone)]
pub struct MouvementService {
    db: PgPool,
}

/// Movement with referential display fields
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct MouvementDetail {
    pub id: Uuid,
    pub type_mouvement: String,
    pub produit_id: Uuid,
    pub produit_nom: String,
    pub produit_reference: String,
    pub magasin_id: Uuid,
    pub magasin_nom: String,
    pub quantite: Decimal,
    pub reference: String,
    pub description: Option<String>,
    pub date_mouvement: DateTime<Utc>,
    pub created_by: Uuid,
}

/// Input for recording a movement
#[derive(Debug, Deserialize)]
pub struct CreateMouvementInput {
    pub type_mouvement: TypeMouvement,
    pub produit_id: Uuid,
    pub magasin_id: Uuid,
    pub quantite: Decimal,
    pub description: Option<String>,
    /// Recording time; defaults to now
    pub date_mouvement: Option<DateTime<Utc>>,
}

/// Listing filters
#[derive(Debug, Default, Deserialize)]
pub struct MouvementFilters {
    pub magasin_id: Option<Uuid>,
    pub type_mouvement: Option<String>,
    pub produit_id: Option<Uuid>,
    pub date_debut: Option<NaiveDate>,
    pub date_fin: Option<NaiveDate>,
    pub limit: Option<i64>,
}

const MOUVEMENT_SELECT: &str = r#"
    SELECT m.id, m.type AS type_mouvement,
           m.produit_id, p.nom AS produit_nom, p.reference AS produit_reference,
           m.magasin_id, g.nom AS magasin_nom,
           m.quantite, m.reference, m.description, m.date_mouvement, m.created_by
    FROM mouvements m
    JOIN produits p ON p.id = m.produit_id
    JOIN magasins g ON g.id = m.magasin_id
"#;

impl MouvementService {
    /// Create a new MouvementService instance
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    /// Record an operator movement and apply it to the stock line.
    ///
    /// An entry credits the warehouse; an exit debits it and is rejected
    /// when the available quantity cannot cover it.
    pub async fn enregistrer(
        &self,
        user_id: Uuid,
        input: CreateMouvementInput,
    ) -> AppResult<MouvementDetail> {
        if input.quantite <= Decimal::ZERO {
            return Err(AppError::Validation {
                field: "quantite".to_string(),
                message: "Quantity must be positive".to_string(),
                message_fr: "La quantité doit être positive".to_string(),
            });
        }

        let referentiel = ReferentielService::new(self.db.clone());
        referentiel.get_produit(input.produit_id).await?;
        referentiel.get_magasin(input.magasin_id).await?;

        let reference = generer_reference(input.type_mouvement);
        let date_mouvement = input.date_mouvement.unwrap_or_else(Utc::now);

        let mut tx = self.db.begin().await?;

        match input.type_mouvement {
            TypeMouvement::Entree => {
                StockService::crediter_tx(&mut tx, input.produit_id, input.magasin_id, input.quantite)
                    .await?;
            }
            TypeMouvement::Sortie => {
                StockService::debiter_tx(&mut tx, input.produit_id, input.magasin_id, input.quantite)
                    .await?;
            }
        }

        let mouvement_id: Uuid = sqlx::query_scalar(
            r#"
            INSERT INTO mouvements (type, produit_id, magasin_id, quantite,
                                    reference, description, date_mouvement, created_by)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            RETURNING id
            "#,
        )
        .bind(input.type_mouvement.as_str())
        .bind(input.produit_id)
        .bind(input.magasin_id)
        .bind(input.quantite)
        .bind(&reference)
        .bind(&input.description)
        .bind(date_mouvement)
        .bind(user_id)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;

        self.get_mouvement(mouvement_id).await
    }

    /// Get a movement by ID
    pub async fn get_mouvement(&self, mouvement_id: Uuid) -> AppResult<MouvementDetail> {
        let query = format!("{MOUVEMENT_SELECT} WHERE m.id = $1");

        sqlx::query_as::<_, MouvementDetail>(&query)
            .bind(mouvement_id)
            .fetch_optional(&self.db)
            .await?
            .ok_or_else(|| AppError::NotFound("Mouvement".to_string()))
    }

    /// List movements with filters; operators are scoped to their warehouse
    pub async fn lister(
        &self,
        magasin_scope: Option<Uuid>,
        filters: &MouvementFilters,
    ) -> AppResult<Vec<MouvementDetail>> {
        let query = format!(
            r#"{MOUVEMENT_SELECT}
            WHERE ($1::uuid IS NULL OR m.magasin_id = $1)
              AND ($2::text IS NULL OR m.type = $2)
              AND ($3::uuid IS NULL OR m.produit_id = $3)
              AND ($4::date IS NULL OR m.date_mouvement::date >= $4)
              AND ($5::date IS NULL OR m.date_mouvement::date <= $5)
              AND ($6::uuid IS NULL OR m.magasin_id = $6)
            ORDER BY m.date_mouvement DESC
            LIMIT $7
            "#
        );

        let mouvements = sqlx::query_as::<_, MouvementDetail>(&query)
            .bind(filters.magasin_id)
            .bind(&filters.type_mouvement)
            .bind(filters.produit_id)
            .bind(filters.date_debut)
            .bind(filters.date_fin)
            .bind(magasin_scope)
            .bind(filters.limit.unwrap_or(50))
            .fetch_all(&self.db)
            .await?;

        Ok(mouvements)
    }
}

/// Generate a unique movement reference: MVT-E-XXXXXXXX / MVT-S-XXXXXXXX
fn generer_reference(type_mouvement: TypeMouvement) -> String {
    let marqueur = match type_mouvement {
        TypeMouvement::Entree => "E",
        TypeMouvement::Sortie => "S",
    };
    let suffixe = Uuid::new_v4().simple().to_string()[..8].to_uppercase();
    format!("MVT-{}-{}", marqueur, suffixe)
}
