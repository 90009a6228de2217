//! Utilidades de validación
//!
//! Funciones helper para validación de datos de entrada (usadas por los
//! DTOs con `#[validate(custom = ...)]`) y normalización de patentes.
//! El dígito verificador del RUT vive en `utils::rut`.

use lazy_static::lazy_static;
use regex::Regex;
use validator::ValidationError;

lazy_static! {
    // Patentes chilenas: BBBB12 (actual) o AB1234 (antigua)
    static ref PLATE_REGEX: Regex =
        Regex::new(r"^[A-Z]{2}[A-Z0-9]{2}[0-9]{2}$").expect("regex de patente válida");
}

/// Normaliza una patente: sin espacios laterales y en mayúsculas
pub fn normalize_plate(plate: &str) -> String {
    plate.trim().to_uppercase()
}

/// Validar que un string no esté vacío
pub fn validate_not_empty(value: &str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        let mut error = ValidationError::new("not_empty");
        error.add_param("value".into(), &value.to_string());
        return Err(error);
    }
    Ok(())
}

/// Validar formato de patente (tras normalizar)
pub fn validate_plate(value: &str) -> Result<(), ValidationError> {
    let plate = normalize_plate(value);
    if !PLATE_REGEX.is_match(&plate) {
        let mut error = ValidationError::new("plate");
        error.add_param("value".into(), &value.to_string());
        error.add_param("format".into(), &"BBBB12 o AB1234".to_string());
        return Err(error);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_plate() {
        assert_eq!(normalize_plate(" ij1234 "), "IJ1234");
        assert_eq!(normalize_plate("ABCD12"), "ABCD12");
    }

    #[test]
    fn test_validate_plate() {
        assert!(validate_plate("abcd12").is_ok());
        assert!(validate_plate("IJ1234").is_ok());
        assert!(validate_plate("A1").is_err());
        assert!(validate_plate("ABCDEF").is_err());
    }

    #[test]
    fn test_validate_not_empty() {
        assert!(validate_not_empty("12345678-9").is_ok());
        assert!(validate_not_empty("  ").is_err());
    }
}
