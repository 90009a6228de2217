//! Configuración de variables de entorno
//!
//! Este módulo maneja la configuración del entorno y variables de configuración.

use std::env;
use std::str::FromStr;

use crate::utils::errors::{AppError, AppResult};

/// Backend de datos seleccionado con `GESTICAR_BACKEND`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Backend {
    Fake,
    Sqlite,
    Remote,
}

impl FromStr for Backend {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "fake" | "memory" => Ok(Backend::Fake),
            "sqlite" => Ok(Backend::Sqlite),
            "remote" => Ok(Backend::Remote),
            other => Err(AppError::BadRequest(format!("GESTICAR_BACKEND desconocido: {}", other))),
        }
    }
}

/// Configuración del entorno
#[derive(Debug, Clone)]
pub struct EnvironmentConfig {
    pub environment: String,
    pub backend: Backend,
    pub port: u16,
    pub host: String,
    pub jwt_secret: String,
    pub jwt_expiration: u64,
    pub cors_origins: Vec<String>,
    pub database_url: String,
    pub api_base_url: String,
    pub external_api_base_url: Option<String>,
    pub cache_ttl_seconds: u64,
}

impl Default for EnvironmentConfig {
    fn default() -> Self {
        Self {
            environment: "development".to_string(),
            backend: Backend::Fake,
            port: 8080,
            host: "0.0.0.0".to_string(),
            jwt_secret: "gesticar-dev-secret".to_string(),
            jwt_expiration: 86400,
            cors_origins: vec!["*".to_string()],
            database_url: "sqlite://gesticar.db".to_string(),
            api_base_url: "http://localhost:8080/api/".to_string(),
            external_api_base_url: None,
            cache_ttl_seconds: 30,
        }
    }
}

impl EnvironmentConfig {
    /// Lee la configuración del entorno; lo que falte toma el valor por defecto
    pub fn from_env() -> AppResult<Self> {
        let defaults = Self::default();
        Ok(Self {
            environment: env::var("ENVIRONMENT").unwrap_or(defaults.environment),
            backend: match env::var("GESTICAR_BACKEND") {
                Ok(value) => value.parse()?,
                Err(_) => defaults.backend,
            },
            port: parse_var("PORT", defaults.port)?,
            host: env::var("HOST").unwrap_or(defaults.host),
            jwt_secret: env::var("JWT_SECRET").unwrap_or(defaults.jwt_secret),
            jwt_expiration: parse_var("JWT_EXPIRATION", defaults.jwt_expiration)?,
            cors_origins: env::var("CORS_ORIGINS")
                .map(|origins| origins.split(',').map(|s| s.trim().to_string()).collect())
                .unwrap_or(defaults.cors_origins),
            database_url: env::var("DATABASE_URL").unwrap_or(defaults.database_url),
            api_base_url: env::var("API_BASE_URL").unwrap_or(defaults.api_base_url),
            external_api_base_url: env::var("EXTERNAL_API_BASE_URL").ok(),
            cache_ttl_seconds: parse_var("CACHE_TTL_SECONDS", defaults.cache_ttl_seconds)?,
        })
    }

    /// Verificar si estamos en modo desarrollo
    pub fn is_development(&self) -> bool {
        self.environment == "development"
    }

    /// Verificar si estamos en modo producción
    pub fn is_production(&self) -> bool {
        self.environment == "production"
    }

    /// Obtener la URL del servidor
    pub fn server_url(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

fn parse_var<T: FromStr>(name: &str, default: T) -> AppResult<T> {
    match env::var(name) {
        Ok(value) => value
            .trim()
            .parse()
            .map_err(|_| AppError::BadRequest(format!("{} debe ser un número válido", name))),
        Err(_) => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_backend_parsing() {
        assert_eq!("SQLite".parse::<Backend>().unwrap(), Backend::Sqlite);
        assert_eq!("remote".parse::<Backend>().unwrap(), Backend::Remote);
        assert!("postgres".parse::<Backend>().is_err());
    }

    #[test]
    fn test_defaults() {
        let config = EnvironmentConfig::default();
        assert!(config.is_development());
        assert_eq!(config.server_url(), "0.0.0.0:8080");
        assert_eq!(config.backend, Backend::Fake);
    }
}
