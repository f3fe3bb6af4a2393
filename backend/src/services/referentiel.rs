//! Read-only lookups of reference data
//!
//! Products, warehouses, clients and drivers are administered by a separate
//! service against the same database; this engine only reads them for
//! validation and display joins.

use rust_decimal::Decimal;
use serde::Serialize;
use shared::models::CamionDisponible;
use sqlx::{FromRow, PgPool};
use uuid::Uuid;

use crate::error::{AppError, AppResult};

/// Referential lookup service
#[derive(Clone)]
pub struct ReferentielService {
    db: PgPool,
}

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct ProduitRef {
    pub id: Uuid,
    pub reference: String,
    pub nom: String,
    pub unite: String,
}

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct MagasinRef {
    pub id: Uuid,
    pub nom: String,
    pub ville: String,
}

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct ChauffeurRef {
    pub id: Uuid,
    pub nom: String,
    pub numero_camion: Option<String>,
    pub capacite_camion: Decimal,
    pub statut: String,
}

impl ReferentielService {
    /// Create a new ReferentielService instance
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    pub async fn get_produit(&self, produit_id: Uuid) -> AppResult<ProduitRef> {
        sqlx::query_as::<_, ProduitRef>(
            "SELECT id, reference, nom, unite FROM produits WHERE id = $1",
        )
        .bind(produit_id)
        .fetch_optional(&self.db)
        .await?
        .ok_or_else(|| AppError::NotFound("Produit".to_string()))
    }

    pub async fn get_magasin(&self, magasin_id: Uuid) -> AppResult<MagasinRef> {
        sqlx::query_as::<_, MagasinRef>("SELECT id, nom, ville FROM magasins WHERE id = $1")
            .bind(magasin_id)
            .fetch_optional(&self.db)
            .await?
            .ok_or_else(|| AppError::NotFound("Magasin".to_string()))
    }

    pub async fn client_existe(&self, client_id: Uuid) -> AppResult<bool> {
        let existe: bool =
            sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM clients WHERE id = $1)")
                .bind(client_id)
                .fetch_one(&self.db)
                .await?;
        Ok(existe)
    }

    pub async fn get_chauffeur(&self, chauffeur_id: Uuid) -> AppResult<ChauffeurRef> {
        sqlx::query_as::<_, ChauffeurRef>(
            "SELECT id, nom, numero_camion, capacite_camion, statut FROM chauffeurs WHERE id = $1",
        )
        .bind(chauffeur_id)
        .fetch_optional(&self.db)
        .await?
        .ok_or_else(|| AppError::NotFound("Chauffeur".to_string()))
    }

    /// Active drivers with their truck capacity, for the rotation allocator.
    /// When `ids` is given, restricts to those drivers; otherwise every
    /// active driver is a candidate.
    pub async fn camions_disponibles(&self, ids: Option<&[Uuid]>) -> AppResult<Vec<CamionDisponible>> {
        let rows = sqlx::query_as::<_, ChauffeurRef>(
            r#"
            SELECT id, nom, numero_camion, capacite_camion, statut
            FROM chauffeurs
            WHERE statut = 'actif'
              AND ($1::uuid[] IS NULL OR id = ANY($1))
            ORDER BY capacite_camion DESC, nom
            "#,
        )
        .bind(ids.map(|ids| ids.to_vec()))
        .fetch_all(&self.db)
        .await?;

        Ok(rows
            .into_iter()
            .map(|c| CamionDisponible {
                chauffeur_id: c.id,
                chauffeur_nom: c.nom,
                numero_camion: c.numero_camion,
                capacite_camion: c.capacite_camion,
            })
            .collect())
    }
}
