//! Modelo de Usuario
//!
//! Usuarios del taller: administradores y mecánicos. El e-mail es único
//! sin distinguir mayúsculas; la contraseña se guarda solo como hash bcrypt.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use crate::utils::errors::{AppError, AppResult};

/// Rol del usuario
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Role {
    Admin,
    #[serde(alias = "MECANICO")]
    Mechanic,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Admin => "ADMIN",
            Role::Mechanic => "MECHANIC",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_uppercase().as_str() {
            "ADMIN" => Ok(Role::Admin),
            "MECHANIC" | "MECANICO" => Ok(Role::Mechanic),
            other => Err(AppError::BadRequest(format!("Rol desconocido: {}", other))),
        }
    }
}

/// Usuario del sistema
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct User {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    #[serde(skip_serializing, default)]
    pub password_hash: String,
    pub role: Role,
}

impl User {
    /// Crea un usuario con la contraseña ya hasheada con el costo indicado
    pub fn with_password(name: &str, email: &str, password: &str, role: Role, cost: u32) -> AppResult<Self> {
        Ok(Self {
            id: Uuid::new_v4(),
            name: name.to_string(),
            email: email.trim().to_string(),
            password_hash: bcrypt::hash(password, cost)?,
            role,
        })
    }

    /// Verifica una contraseña en texto plano contra el hash almacenado
    pub fn verify_password(&self, password: &str) -> bool {
        if self.password_hash.is_empty() {
            return false;
        }
        bcrypt::verify(password, &self.password_hash).unwrap_or(false)
    }

    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_password_is_hashed_and_verified() {
        let user = User::with_password("Admin", "admin@gesticar.cl", "admin", Role::Admin, 4).unwrap();
        assert_ne!(user.password_hash, "admin");
        assert!(user.verify_password("admin"));
        assert!(!user.verify_password("otra"));
    }

    #[test]
    fn test_role_parsing_accepts_spanish_names() {
        assert_eq!("mecanico".parse::<Role>().unwrap(), Role::Mechanic);
        assert_eq!("ADMIN".parse::<Role>().unwrap(), Role::Admin);
        assert!("jefe".parse::<Role>().is_err());
    }

    #[test]
    fn test_password_hash_is_not_serialized() {
        let user = User::with_password("Ana", "ana@gesticar.cl", "clave", Role::Mechanic, 4).unwrap();
        let json = serde_json::to_value(&user).unwrap();
        assert!(json.get("password_hash").is_none());
        assert_eq!(json["role"], "MECHANIC");
    }
}
