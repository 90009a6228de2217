use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use crate::models::{Role, User};

// Login request
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct LoginRequest {
    #[validate(email)]
    pub email: String,
    #[validate(length(min = 1))]
    pub password: String,
}

// Login response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoginResponse {
    pub token: String,
    pub usuario: UserDto,
}

// Usuario tal como viaja por la API (sin hash)
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct UserDto {
    pub id: Uuid,
    pub nombre: String,
    pub email: String,
    pub rol: Role,
}

impl From<User> for UserDto {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            nombre: user.name,
            email: user.email,
            rol: user.role,
        }
    }
}

impl From<UserDto> for User {
    fn from(dto: UserDto) -> Self {
        Self {
            id: dto.id,
            name: dto.nombre,
            email: dto.email,
            password_hash: String::new(),
            role: dto.rol,
        }
    }
}

// Request para registrar un usuario
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct NewUserRequest {
    #[validate(length(min = 1, max = 120))]
    pub nombre: String,
    #[validate(email)]
    pub email: String,
    #[validate(length(min = 4))]
    pub password: String,
    pub rol: Role,
}

// Query `usuarios?email=`
#[derive(Debug, Deserialize)]
pub struct UserQuery {
    pub email: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_user_dto_hides_hash() {
        let user = User::with_password("Ana", "ana@gesticar.cl", "mecanico", Role::Mechanic, 4).unwrap();
        let json = serde_json::to_value(UserDto::from(user)).unwrap();
        assert_eq!(json["rol"], "MECHANIC");
        assert!(json.get("passwordHash").is_none());
    }

    #[test]
    fn test_login_request_validation() {
        let bad = LoginRequest {
            email: "no-es-correo".to_string(),
            password: "x".to_string(),
        };
        assert!(bad.validate().is_err());
    }
}
