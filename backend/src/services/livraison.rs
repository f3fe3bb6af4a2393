//! Declared-delivery service
//!
//! The transporter declares what each truck dropped at a warehouse. These
//! declarations never touch stock: they are one of the three independently
//! recorded quantities the reconciliation engine cross-checks against the
//! warehouse entry ledger.

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgPool};
use uuid::Uuid;

use crate::error::{AppError, AppResult};
use crate::services::referentiel::ReferentielService;

/// Delivery declaration service
#[derive(Clone)]
pub struct LivraisonService {
    db: PgPool,
}

/// Declared delivery with referential display fields
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct LivraisonDetail {
    pub id: Uuid,
    pub numero: String,
    pub produit_id: Uuid,
    pub produit_nom: String,
    pub produit_reference: String,
    pub magasin_id: Uuid,
    pub magasin_nom: String,
    pub quantite: Decimal,
    pub date_livraison: NaiveDate,
    pub transporteur: Option<String>,
    pub numero_camion: Option<String>,
    pub chauffeur_nom: Option<String>,
    pub notes: Option<String>,
    pub created_by: Uuid,
    pub created_at: DateTime<Utc>,
}

/// Input for declaring a delivery
#[derive(Debug, Deserialize)]
pub struct DeclareLivraisonInput {
    pub produit_id: Uuid,
    pub magasin_id: Uuid,
    pub quantite: Decimal,
    /// Delivery day; defaults to today
    pub date_livraison: Option<NaiveDate>,
    pub transporteur: Option<String>,
    pub numero_camion: Option<String>,
    pub chauffeur_nom: Option<String>,
    pub notes: Option<String>,
}

/// Listing filters
#[derive(Debug, Default, Deserialize)]
pub struct LivraisonFilters {
    pub magasin_id: Option<Uuid>,
    pub produit_id: Option<Uuid>,
    pub date_debut: Option<NaiveDate>,
    pub date_fin: Option<NaiveDate>,
}

const LIVRAISON_SELECT: &str = r#"
    SELECT l.id, l.numero,
           l.produit_id, p.nom AS produit_nom, p.reference AS produit_reference,
           l.magasin_id, m.nom AS magasin_nom,
           l.quantite, l.date_livraison, l.transporteur, l.numero_camion,
           l.chauffeur_nom, l.notes, l.created_by, l.created_at
    FROM livraisons l
    JOIN produits p ON p.id = l.produit_id
    JOIN magasins m ON m.id = l.magasin_id
"#;

impl LivraisonService {
    /// Create a new LivraisonService instance
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    /// Declare a delivery
    pub async fn declarer(
        &self,
        user_id: Uuid,
        input: DeclareLivraisonInput,
    ) -> AppResult<LivraisonDetail> {
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

        let numero = generer_numero_livraison();
        let date_livraison = input
            .date_livraison
            .unwrap_or_else(|| Utc::now().date_naive());

        let livraison_id: Uuid = sqlx::query_scalar(
            r#"
            INSERT INTO livraisons (numero, produit_id, magasin_id, quantite, date_livraison,
                                    transporteur, numero_camion, chauffeur_nom, notes, created_by)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            RETURNING id
            "#,
        )
        .bind(&numero)
        .bind(input.produit_id)
        .bind(input.magasin_id)
        .bind(input.quantite)
        .bind(date_livraison)
        .bind(&input.transporteur)
        .bind(&input.numero_camion)
        .bind(&input.chauffeur_nom)
        .bind(&input.notes)
        .bind(user_id)
        .fetch_one(&self.db)
        .await?;

        self.get_livraison(livraison_id).await
    }

    /// Get a delivery by ID
    pub async fn get_livraison(&self, livraison_id: Uuid) -> AppResult<LivraisonDetail> {
        let query = format!("{LIVRAISON_SELECT} WHERE l.id = $1");

        sqlx::query_as::<_, LivraisonDetail>(&query)
            .bind(livraison_id)
            .fetch_optional(&self.db)
            .await?
            .ok_or_else(|| AppError::NotFound("Livraison".to_string()))
    }

    /// List deliveries with filters
    pub async fn lister(
        &self,
        magasin_scope: Option<Uuid>,
        filters: &LivraisonFilters,
    ) -> AppResult<Vec<LivraisonDetail>> {
        let query = format!(
            r#"{LIVRAISON_SELECT}
            WHERE ($1::uuid IS NULL OR l.magasin_id = $1)
              AND ($2::uuid IS NULL OR l.produit_id = $2)
              AND ($3::date IS NULL OR l.date_livraison >= $3)
              AND ($4::date IS NULL OR l.date_livraison <= $4)
              AND ($5::uuid IS NULL OR l.magasin_id = $5)
            ORDER BY l.date_livraison DESC, l.created_at DESC
            "#
        );

        let livraisons = sqlx::query_as::<_, LivraisonDetail>(&query)
            .bind(filters.magasin_id)
            .bind(filters.produit_id)
            .bind(filters.date_debut)
            .bind(filters.date_fin)
            .bind(magasin_scope)
            .fetch_all(&self.db)
            .await?;

        Ok(livraisons)
    }
}

/// Generate a unique delivery number: LIV-YYYYMMDD-XXXX
fn generer_numero_livraison() -> String {
    let date = Utc::now().format("%Y%m%d");
    let suffixe = Uuid::new_v4().simple().to_string()[..4].to_uppercase();
    format!("LIV-{}-{}", date, suffixe)
}
