//! Controladores
//!
//! Puente entre las intenciones de la interfaz y el repositorio.

pub mod work_order_controller;

pub use work_order_controller::{UiState, WorkOrderController};
