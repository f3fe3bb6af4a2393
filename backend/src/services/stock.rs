//! Stock ledger service
//!
//! Single owner of the `stock` table. Every mutation runs inside a
//! transaction holding a row-level lock on the (produit, magasin) line, so a
//! quantity can never be observed or left negative, whatever the callers do
//! concurrently. All mutating operations take the caller's transaction: a
//! reservation commits or rolls back with the dispatch it belongs to, a
//! credit with the rotation receipt.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;
use sqlx::{FromRow, PgPool, Postgres, Transaction};
use uuid::Uuid;

use crate::error::{AppError, AppResult};

/// Stock ledger service for per-(produit, magasin) quantity accounting
#[derive(Clone)]
pub struct StockService {
    db: PgPool,
}

/// One stock line
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct StockLigne {
    pub produit_id: Uuid,
    pub magasin_id: Uuid,
    pub quantite: Decimal,
    pub updated_at: DateTime<Utc>,
}

/// Stock line with product details, for warehouse listings
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct StockMagasin {
    pub produit_id: Uuid,
    pub produit_reference: String,
    pub produit_nom: String,
    pub unite: String,
    pub quantite: Decimal,
    pub seuil_alerte: Decimal,
    pub sous_seuil: bool,
}

/// Available quantity returned by the check endpoint
#[derive(Debug, Clone, Serialize)]
pub struct StockDisponible {
    pub produit_id: Uuid,
    pub magasin_id: Uuid,
    pub disponible: Decimal,
}

impl StockService {
    /// Create a new StockService instance
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    /// Available quantity for a (produit, magasin) pair; zero when the line
    /// does not exist yet.
    pub async fn quantite_disponible(&self, produit_id: Uuid, magasin_id: Uuid) -> AppResult<Decimal> {
        let quantite: Option<Decimal> = sqlx::query_scalar(
            "SELECT quantite FROM stock WHERE produit_id = $1 AND magasin_id = $2",
        )
        .bind(produit_id)
        .bind(magasin_id)
        .fetch_optional(&self.db)
        .await?;

        Ok(quantite.unwrap_or(Decimal::ZERO))
    }

    /// Check endpoint payload for a (produit, magasin) pair
    pub async fn stock_disponible(&self, produit_id: Uuid, magasin_id: Uuid) -> AppResult<StockDisponible> {
        Ok(StockDisponible {
            produit_id,
            magasin_id,
            disponible: self.quantite_disponible(produit_id, magasin_id).await?,
        })
    }

    /// Stock lines of one warehouse, with the product alert threshold
    pub async fn lister_stock(&self, magasin_id: Uuid) -> AppResult<Vec<StockMagasin>> {
        let lignes = sqlx::query_as::<_, StockMagasin>(
            r#"
            SELECT s.produit_id, p.reference AS produit_reference, p.nom AS produit_nom,
                   p.unite, s.quantite, p.seuil_alerte,
                   (s.quantite <= p.seuil_alerte) AS sous_seuil
            FROM stock s
            JOIN produits p ON p.id = s.produit_id
            WHERE s.magasin_id = $1
            ORDER BY p.nom
            "#,
        )
        .bind(magasin_id)
        .fetch_all(&self.db)
        .await?;

        Ok(lignes)
    }

    /// Reserve stock for a dispatch: the quantity committed to leave the
    /// source is no longer available to anyone else.
    pub async fn reserver_tx(
        tx: &mut Transaction<'_, Postgres>,
        produit_id: Uuid,
        magasin_id: Uuid,
        quantite: Decimal,
    ) -> AppResult<StockLigne> {
        Self::debiter_tx(tx, produit_id, magasin_id, quantite).await
    }

    /// Release a reservation back to the source (dispatch cancellation)
    pub async fn liberer_tx(
        tx: &mut Transaction<'_, Postgres>,
        produit_id: Uuid,
        magasin_id: Uuid,
        quantite: Decimal,
    ) -> AppResult<StockLigne> {
        Self::crediter_tx(tx, produit_id, magasin_id, quantite).await
    }

    /// Atomic check-and-decrement of a stock line. Dispatch reservations and
    /// operator exits are the same ledger operation: lock the line, verify
    /// availability, decrement.
    pub async fn debiter_tx(
        tx: &mut Transaction<'_, Postgres>,
        produit_id: Uuid,
        magasin_id: Uuid,
        quantite: Decimal,
    ) -> AppResult<StockLigne> {
        let disponible: Option<Decimal> = sqlx::query_scalar(
            "SELECT quantite FROM stock WHERE produit_id = $1 AND magasin_id = $2 FOR UPDATE",
        )
        .bind(produit_id)
        .bind(magasin_id)
        .fetch_optional(&mut **tx)
        .await?;

        let disponible = disponible.unwrap_or(Decimal::ZERO);
        if disponible < quantite {
            return Err(AppError::InsufficientStock {
                disponible,
                demande: quantite,
            });
        }

        let ligne = sqlx::query_as::<_, StockLigne>(
            r#"
            UPDATE stock
            SET quantite = quantite - $3, updated_at = NOW()
            WHERE produit_id = $1 AND magasin_id = $2
            RETURNING produit_id, magasin_id, quantite, updated_at
            "#,
        )
        .bind(produit_id)
        .bind(magasin_id)
        .bind(quantite)
        .fetch_one(&mut **tx)
        .await?;

        Ok(ligne)
    }

    /// Increase a stock line (rotation receipt, operator entry, released
    /// reservation), creating it when the warehouse never held that product.
    pub async fn crediter_tx(
        tx: &mut Transaction<'_, Postgres>,
        produit_id: Uuid,
        magasin_id: Uuid,
        quantite: Decimal,
    ) -> AppResult<StockLigne> {
        let ligne = sqlx::query_as::<_, StockLigne>(
            r#"
            INSERT INTO stock (produit_id, magasin_id, quantite)
            VALUES ($1, $2, $3)
            ON CONFLICT (produit_id, magasin_id)
            DO UPDATE SET quantite = stock.quantite + EXCLUDED.quantite, updated_at = NOW()
            RETURNING produit_id, magasin_id, quantite, updated_at
            "#,
        )
        .bind(produit_id)
        .bind(magasin_id)
        .bind(quantite)
        .fetch_one(&mut **tx)
        .await?;

        Ok(ligne)
    }
}
