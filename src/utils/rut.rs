//! Utilidades de RUT chileno
//!
//! Normalización al formato canónico `CUERPO-DV`, cálculo del dígito
//! verificador (módulo 11) y validación.

use lazy_static::lazy_static;
use regex::Regex;

lazy_static! {
    static ref RUT_REGEX: Regex = Regex::new(r"^[0-9]{7,}-[0-9K]$").expect("regex de RUT válida");
}

/// Normaliza un RUT: quita puntos, espacios y guiones, pasa a mayúsculas,
/// conserva solo dígitos y `K`, y reinserta el guion antes del DV.
pub fn normalize_rut(input: &str) -> String {
    let cleaned: String = input
        .trim()
        .to_uppercase()
        .chars()
        .filter(|c| c.is_ascii_digit() || *c == 'K')
        .collect();

    if cleaned.len() < 2 {
        return cleaned;
    }

    let (body, dv) = cleaned.split_at(cleaned.len() - 1);
    format!("{}-{}", body, dv)
}

/// Calcula el dígito verificador para el cuerpo numérico de un RUT
pub fn compute_check_digit(body: &str) -> char {
    let mut factor = 2;
    let mut sum: u32 = 0;

    for digit in body.chars().rev().filter_map(|c| c.to_digit(10)) {
        sum += digit * factor;
        factor = if factor == 7 { 2 } else { factor + 1 };
    }

    match 11 - (sum % 11) {
        11 => '0',
        10 => 'K',
        n => char::from_digit(n, 10).unwrap_or('0'),
    }
}

/// Valida un RUT: cuerpo de al menos 7 dígitos y DV coincidente
pub fn is_rut_valid(input: &str) -> bool {
    let normalized = normalize_rut(input);
    if !RUT_REGEX.is_match(&normalized) {
        return false;
    }

    let Some((body, dv)) = normalized.split_once('-') else {
        return false;
    };
    if body.len() < 7 {
        return false;
    }

    dv.eq_ignore_ascii_case(&compute_check_digit(body).to_string())
}

/// Formatea un RUT para mostrarlo como `XXXXXXXX - Y`
pub fn format_rut_for_display(rut: &str) -> String {
    let normalized = normalize_rut(rut);
    match normalized.split_once('-') {
        Some((body, dv)) => format!("{} - {}", body, dv),
        None => normalized,
    }
}

/// Limpia la entrada del usuario dejando dígitos y, al final, una `K` si la hubo
pub fn sanitize_rut_input(raw: &str) -> String {
    if raw.trim().is_empty() {
        return String::new();
    }

    let upper = raw.to_uppercase();
    let mut digits: String = upper.chars().filter(|c| c.is_ascii_digit()).collect();
    if upper.contains('K') {
        digits.push('K');
    }
    digits
}

/// RUT normalizado sin guion (útil como clave compacta)
pub fn rut_digits(input: &str) -> String {
    normalize_rut(input).replace('-', "")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_rut() {
        assert_eq!(normalize_rut("12.345.678-5"), "12345678-5");
        assert_eq!(normalize_rut(" 20.123.456-k "), "20123456-K");
        assert_eq!(normalize_rut("123456785"), "12345678-5");
        assert_eq!(normalize_rut("1"), "1");
        assert_eq!(normalize_rut(""), "");
    }

    #[test]
    fn test_compute_check_digit() {
        assert_eq!(compute_check_digit("12345678"), '5');
        assert_eq!(compute_check_digit("20123456"), '5');
        assert_eq!(compute_check_digit("1000005"), 'K');
        assert_eq!(compute_check_digit("1000030"), '0');
    }

    #[test]
    fn test_is_rut_valid() {
        assert!(is_rut_valid("12.345.678-5"));
        assert!(is_rut_valid("1.000.005-k"));
        assert!(is_rut_valid("1000030-0"));
        assert!(!is_rut_valid("12.345.678-9"));
        assert!(!is_rut_valid("123.456-0"));
        assert!(!is_rut_valid(""));
    }

    #[test]
    fn test_display_helpers() {
        assert_eq!(format_rut_for_display("12.345.678-5"), "12345678 - 5");
        assert_eq!(sanitize_rut_input("12.345.678-k"), "12345678K");
        assert_eq!(sanitize_rut_input("   "), "");
        assert_eq!(rut_digits("12.345.678-5"), "123456785");
    }
}
