//! Modelos del sistema
//!
//! Este módulo contiene el modelo de dominio del taller: clientes,
//! vehículos, órdenes de trabajo y todo lo que la OT posee.

pub mod audit;
pub mod budget;
pub mod client;
pub mod evidence;
pub mod symptom;
pub mod task;
pub mod user;
pub mod vehicle;
pub mod work_order;

pub use audit::AuditEntry;
pub use budget::{Budget, BudgetItem, ItemKind};
pub use client::Client;
pub use evidence::{Evidence, EvidenceStage};
pub use symptom::Symptom;
pub use task::{Task, TaskStatus};
pub use user::{Role, User};
pub use vehicle::Vehicle;
pub use work_order::{NewWorkOrder, SearchFilters, WorkOrder, WorkOrderDetail, WorkOrderState};
