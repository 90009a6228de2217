//! Utilidades del sistema
//!
//! Este módulo contiene utilidades para manejo de errores, validación,
//! RUT chileno y JWT.

pub mod errors;
pub mod jwt;
pub mod rut;
pub mod validation;

pub use errors::{AppError, AppResult};
