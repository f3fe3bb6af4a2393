//! Validation utilities for the Port Stock Management Platform
//!
//! Includes the document-number formats and French road-transport rules the
//! port operators work under.

use rust_decimal::Decimal;

// ============================================================================
// Quantity Validations
// ============================================================================

/// Validate a tonnage quantity is strictly positive
pub fn validate_quantite(quantite: Decimal) -> Result<(), &'static str> {
    if quantite <= Decimal::ZERO {
        return Err("Quantity must be positive");
    }
    Ok(())
}

/// Maximum legal payload for a truck rotation (tonnes)
pub const CAPACITE_CAMION_MAX: i64 = 60;

/// Validate a truck capacity is positive and within road-legal bounds
pub fn validate_capacite_camion(capacite: Decimal) -> Result<(), &'static str> {
    if capacite <= Decimal::ZERO {
        return Err("Truck capacity must be positive");
    }
    if capacite > Decimal::from(CAPACITE_CAMION_MAX) {
        return Err("Truck capacity exceeds road-legal maximum");
    }
    Ok(())
}

// ============================================================================
// Document Number Formats
// ============================================================================

/// Validate dispatch number format: DISP-YYYYMMDD-XXXX
pub fn validate_numero_dispatch(numero: &str) -> Result<(), &'static str> {
    let parts: Vec<&str> = numero.split('-').collect();

    if parts.len() != 3 || parts[0] != "DISP" {
        return Err("Dispatch number must be in format DISP-YYYYMMDD-XXXX");
    }
    if parts[1].len() != 8 || !parts[1].chars().all(|c| c.is_ascii_digit()) {
        return Err("Invalid date segment in dispatch number");
    }
    if parts[2].len() != 4
        || !parts[2]
            .chars()
            .all(|c| c.is_ascii_uppercase() || c.is_ascii_digit())
    {
        return Err("Invalid suffix in dispatch number");
    }
    Ok(())
}

/// Validate rotation number format: <numero_dispatch>-RNNN
pub fn validate_numero_rotation(numero: &str) -> Result<(), &'static str> {
    let Some((dispatch, suffixe)) = numero.rsplit_once('-') else {
        return Err("Rotation number must be in format DISP-YYYYMMDD-XXXX-RNNN");
    };

    validate_numero_dispatch(dispatch)?;

    if !suffixe.starts_with('R') {
        return Err("Rotation suffix must start with 'R'");
    }
    let sequence = &suffixe[1..];
    if sequence.len() != 3 || !sequence.chars().all(|c| c.is_ascii_digit()) {
        return Err("Rotation sequence must be three digits");
    }
    Ok(())
}

/// Validate delivery number format: LIV-YYYYMMDD-XXXX
pub fn validate_numero_livraison(numero: &str) -> Result<(), &'static str> {
    let parts: Vec<&str> = numero.split('-').collect();

    if parts.len() != 3 || parts[0] != "LIV" {
        return Err("Delivery number must be in format LIV-YYYYMMDD-XXXX");
    }
    if parts[1].len() != 8 || !parts[1].chars().all(|c| c.is_ascii_digit()) {
        return Err("Invalid date segment in delivery number");
    }
    if parts[2].len() != 4
        || !parts[2]
            .chars()
            .all(|c| c.is_ascii_uppercase() || c.is_ascii_digit())
    {
        return Err("Invalid suffix in delivery number");
    }
    Ok(())
}

/// Validate product reference format (e.g. RIZ-001): 2-8 uppercase letters,
/// a dash, then a numeric sequence.
pub fn validate_reference_produit(reference: &str) -> Result<(), &'static str> {
    let Some((code, sequence)) = reference.split_once('-') else {
        return Err("Product reference must be in format CODE-NNN");
    };

    if code.len() < 2 || code.len() > 8 || !code.chars().all(|c| c.is_ascii_uppercase()) {
        return Err("Product code must be 2-8 uppercase letters");
    }
    if sequence.is_empty() || sequence.len() > 6 || !sequence.chars().all(|c| c.is_ascii_digit()) {
        return Err("Product sequence must be numeric");
    }
    Ok(())
}

// ============================================================================
// France-Specific Validations
// ============================================================================

/// Validate a French licence plate (SIV format AA-123-AA, I/O/U excluded)
pub fn validate_plaque_immatriculation(plaque: &str) -> Result<(), &'static str> {
    let parts: Vec<&str> = plaque.split('-').collect();

    if parts.len() != 3 {
        return Err("Licence plate must be in format AA-123-AA");
    }

    let lettres_valides =
        |s: &str| s.len() == 2 && s.chars().all(|c| c.is_ascii_uppercase() && !"IOU".contains(c));

    if !lettres_valides(parts[0]) || !lettres_valides(parts[2]) {
        return Err("Licence plate letters must exclude I, O and U");
    }
    if parts[1].len() != 3 || !parts[1].chars().all(|c| c.is_ascii_digit()) {
        return Err("Licence plate middle segment must be three digits");
    }
    Ok(())
}

/// Validate a French phone number
/// Accepts: 0612345678, 06 12 34 56 78, +33612345678
pub fn validate_telephone(telephone: &str) -> Result<(), &'static str> {
    let digits: String = telephone.chars().filter(|c| c.is_ascii_digit()).collect();

    // National format: 10 digits starting with 0
    if digits.len() == 10 && digits.starts_with('0') {
        return Ok(());
    }
    // International format with country code 33
    if digits.len() == 11 && digits.starts_with("33") {
        return Ok(());
    }

    Err("Invalid French phone number format")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    fn dec(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    // ========================================================================
    // Quantity Validation Tests
    // ========================================================================

    #[test]
    fn test_validate_quantite() {
        assert!(validate_quantite(dec("0.5")).is_ok());
        assert!(validate_quantite(dec("1000")).is_ok());
        assert!(validate_quantite(Decimal::ZERO).is_err());
        assert!(validate_quantite(dec("-10")).is_err());
    }

    #[test]
    fn test_validate_capacite_camion() {
        assert!(validate_capacite_camion(dec("30")).is_ok());
        assert!(validate_capacite_camion(dec("60")).is_ok());
        assert!(validate_capacite_camion(Decimal::ZERO).is_err());
        assert!(validate_capacite_camion(dec("61")).is_err());
    }

    // ========================================================================
    // Document Number Tests
    // ========================================================================

    #[test]
    fn test_validate_numero_dispatch_valid() {
        assert!(validate_numero_dispatch("DISP-20250115-A3F9").is_ok());
        assert!(validate_numero_dispatch("DISP-20241231-0001").is_ok());
    }

    #[test]
    fn test_validate_numero_dispatch_invalid() {
        assert!(validate_numero_dispatch("DISP-2025-A3F9").is_err());
        assert!(validate_numero_dispatch("EXP-20250115-A3F9").is_err());
        assert!(validate_numero_dispatch("DISP-20250115-a3f9").is_err());
        assert!(validate_numero_dispatch("DISP20250115A3F9").is_err());
    }

    #[test]
    fn test_validate_numero_rotation_valid() {
        assert!(validate_numero_rotation("DISP-20250115-A3F9-R001").is_ok());
        assert!(validate_numero_rotation("DISP-20250115-A3F9-R042").is_ok());
    }

    #[test]
    fn test_validate_numero_rotation_invalid() {
        assert!(validate_numero_rotation("DISP-20250115-A3F9-001").is_err());
        assert!(validate_numero_rotation("DISP-20250115-A3F9-R1").is_err());
        assert!(validate_numero_rotation("DISP-20250115-R001").is_err());
    }

    #[test]
    fn test_validate_numero_livraison() {
        assert!(validate_numero_livraison("LIV-20250115-B2C4").is_ok());
        assert!(validate_numero_livraison("DISP-20250115-B2C4").is_err());
    }

    #[test]
    fn test_validate_reference_produit() {
        assert!(validate_reference_produit("RIZ-001").is_ok());
        assert!(validate_reference_produit("BLE-12").is_ok());
        assert!(validate_reference_produit("ENGRAIS-2024").is_ok());
        assert!(validate_reference_produit("riz-001").is_err());
        assert!(validate_reference_produit("RIZ001").is_err());
        assert!(validate_reference_produit("R-001").is_err());
        assert!(validate_reference_produit("RIZ-ABC").is_err());
    }

    // ========================================================================
    // France-Specific Validation Tests
    // ========================================================================

    #[test]
    fn test_validate_plaque_valid() {
        assert!(validate_plaque_immatriculation("AB-123-CD").is_ok());
        assert!(validate_plaque_immatriculation("ZZ-999-ZZ").is_ok());
    }

    #[test]
    fn test_validate_plaque_invalid() {
        assert!(validate_plaque_immatriculation("AI-123-CD").is_err()); // I excluded
        assert!(validate_plaque_immatriculation("AB-12-CD").is_err());
        assert!(validate_plaque_immatriculation("AB123CD").is_err());
        assert!(validate_plaque_immatriculation("ab-123-cd").is_err());
    }

    #[test]
    fn test_validate_telephone_valid() {
        assert!(validate_telephone("0612345678").is_ok());
        assert!(validate_telephone("06 12 34 56 78").is_ok());
        assert!(validate_telephone("+33612345678").is_ok());
    }

    #[test]
    fn test_validate_telephone_invalid() {
        assert!(validate_telephone("12345").is_err());
        assert!(validate_telephone("612345678").is_err());
        assert!(validate_telephone("abcdefghij").is_err());
    }
}
