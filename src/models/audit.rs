//! Bitácora de auditoría
//!
//! Registro solo de inserción: las entradas nunca se modifican ni borran,
//! ni siquiera al eliminar la OT a la que apuntan.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{budget::ItemKind, evidence::EvidenceStage, work_order::WorkOrderState};

/// Actor por defecto cuando no hay sesión (semillas, procesos internos)
pub const SYSTEM_ACTOR: &str = "admin@gesticar.cl";

pub const CREATE_ORDER: &str = "CREAR_OT";
pub const DELETE_ORDER: &str = "ELIMINAR_OT";
pub const BUDGET_APPROVED_ON_CREATE: &str = "PRESUPUESTO_APROBADO";
pub const APPROVE_BUDGET: &str = "APPROVE_BUDGET";
pub const REVOKE_APPROVAL: &str = "REVOKE_APPROVAL";
pub const UPDATE_NOTES: &str = "UPDATE_NOTES";
pub const UPDATE_MECHANICS: &str = "UPDATE_MECHANICS";
pub const UPDATE_VEHICLE: &str = "UPDATE_VEHICLE";
pub const UPDATE_BUDGET: &str = "UPDATE_BUDGET";
pub const UPDATE_TASKS: &str = "UPDATE_TASKS";

pub fn change_state(target: WorkOrderState) -> String {
    format!("CHANGE_STATE:{}", target.as_str())
}

pub fn add_item(kind: ItemKind, description: &str) -> String {
    format!("ADD_ITEM:{}/{}", kind.as_str(), description)
}

pub fn add_evidence(stage: EvidenceStage) -> String {
    format!("ADD_EVIDENCE:{}", stage.as_str())
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AuditEntry {
    pub id: Uuid,
    pub order_id: Uuid,
    pub user_email: String,
    pub action: String,
    pub timestamp: DateTime<Utc>,
}

impl AuditEntry {
    pub fn new(order_id: Uuid, user_email: &str, action: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            order_id,
            user_email: user_email.to_string(),
            action: action.into(),
            timestamp: Utc::now(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_action_codes() {
        assert_eq!(change_state(WorkOrderState::InExecution), "CHANGE_STATE:IN_EXECUTION");
        assert_eq!(add_item(ItemKind::Part, "Bujías"), "ADD_ITEM:REP/Bujías");
        assert_eq!(add_evidence(EvidenceStage::Closeout), "ADD_EVIDENCE:CLOSEOUT");
    }
}
