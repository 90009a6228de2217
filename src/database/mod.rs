//! Módulo de base de datos
//!
//! Esquema SQLite y datos iniciales compartidos por los backends locales.

pub mod schema;
pub mod seed;
