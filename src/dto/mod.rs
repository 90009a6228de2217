//! DTOs de la API
//!
//! Formato de intercambio con nombres de campo en español, igual para el
//! servidor y para el backend remoto que lo consume.

pub mod auth_dto;
pub mod catalog_dto;
pub mod work_order_dto;

pub use auth_dto::*;
pub use catalog_dto::*;
pub use work_order_dto::*;
