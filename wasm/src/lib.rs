//! WebAssembly module for the Port Stock Management Platform
//!
//! Provides client-side computation for:
//! - Rotation-plan previews before submitting an allocation
//! - Écart classification
//! - Dispatch progression
//! - Offline data validation
//!
//! Plans previewed here are only a convenience; the server recomputes and
//! enforces every rule when the plan is submitted.

use rust_decimal::Decimal;
use wasm_bindgen::prelude::*;

// Re-export shared types for use in JavaScript
pub use shared::models::*;
pub use shared::types::*;
pub use shared::validation::*;

/// Initialize the WASM module
#[wasm_bindgen(start)]
pub fn init() {
    // Set up panic hook for better error messages in browser console
    #[cfg(feature = "console_error_panic_hook")]
    console_error_panic_hook::set_once();
}

/// Compute a rotation plan from a quantity and a JSON list of trucks
#[wasm_bindgen]
pub fn calculer_plan_rotations(quantite: f64, camions_json: &str) -> Result<String, JsValue> {
    let camions: Vec<CamionDisponible> = serde_json::from_str(camions_json)
        .map_err(|e| JsValue::from_str(&format!("Invalid trucks JSON: {}", e)))?;

    let quantite = Decimal::try_from(quantite)
        .map_err(|e| JsValue::from_str(&format!("Invalid quantity: {}", e)))?;

    let plan = planifier_rotations(quantite, &camions, 1)
        .map_err(|e| JsValue::from_str(&e.to_string()))?;

    serde_json::to_string(&plan).map_err(|e| JsValue::from_str(&e.to_string()))
}

/// Classify the écart between a declared and a received quantity
#[wasm_bindgen]
pub fn classifier_ecart(quantite_declaree: f64, quantite_recue: f64) -> String {
    let declaree = Decimal::try_from(quantite_declaree).unwrap_or(Decimal::ZERO);
    let recue = Decimal::try_from(quantite_recue).unwrap_or(Decimal::ZERO);

    classer_ecart(declaree - recue).as_str().to_string()
}

/// Progression percentage of a dispatch
#[wasm_bindgen]
pub fn calculer_progression(quantite_totale: f64, quantite_allouee: f64) -> f64 {
    if quantite_totale <= 0.0 {
        return 0.0;
    }
    quantite_allouee / quantite_totale * 100.0
}

/// Signed écart of a rotation (positive = shortfall)
#[wasm_bindgen]
pub fn calculer_ecart_rotation(quantite_prevue: f64, quantite_livree: f64) -> f64 {
    quantite_prevue - quantite_livree
}

/// Validate a tonnage quantity before submitting a form
#[wasm_bindgen]
pub fn valider_quantite(quantite: f64) -> bool {
    Decimal::try_from(quantite)
        .map(|q| validate_quantite(q).is_ok())
        .unwrap_or(false)
}

/// Validate a French licence plate
#[wasm_bindgen]
pub fn valider_plaque(plaque: &str) -> bool {
    validate_plaque_immatriculation(plaque).is_ok()
}

/// Check a rotation status transition before enabling an action button
#[wasm_bindgen]
pub fn transition_rotation_valide(de: &str, vers: &str) -> bool {
    match (RotationStatut::from_str(de), RotationStatut::from_str(vers)) {
        (Some(de), Some(vers)) => de.transition_valide(vers),
        _ => false,
    }
}
