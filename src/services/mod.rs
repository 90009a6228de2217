//! Services module
//!
//! Lógica que no pertenece a un backend concreto: el login con emisión
//! de JWT y el filtro de OTs visibles según el rol.

pub mod auth_service;
pub mod visibility;

pub use auth_service::AuthService;
pub use visibility::visible_orders;
