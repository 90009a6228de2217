//! Modelo de Orden de Trabajo (OT)
//!
//! Contiene el ciclo de vida de la OT y la única regla de transición que
//! comparten todos los backends.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use super::{
    budget::{Budget, BudgetItem},
    client::Client,
    evidence::Evidence,
    symptom::Symptom,
    task::Task,
    user::User,
    vehicle::Vehicle,
};
use crate::utils::errors::AppError;

/// Número visible a partir del cual se asignan las OTs
pub const ORDER_NUMBER_SEED: i64 = 1000;

/// Estado de la OT
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum WorkOrderState {
    #[serde(alias = "BORRADOR")]
    Draft,
    #[serde(alias = "DIAGNOSTICO")]
    Diagnosis,
    #[serde(alias = "PRESUPUESTO")]
    Quote,
    #[serde(alias = "PEND_APROB")]
    PendingApproval,
    #[serde(alias = "EN_EJECUCION")]
    InExecution,
    #[serde(alias = "FINALIZADA")]
    Finished,
    #[serde(alias = "CANCELADA")]
    Cancelled,
}

impl WorkOrderState {
    pub const ALL: [WorkOrderState; 7] = [
        WorkOrderState::Draft,
        WorkOrderState::Diagnosis,
        WorkOrderState::Quote,
        WorkOrderState::PendingApproval,
        WorkOrderState::InExecution,
        WorkOrderState::Finished,
        WorkOrderState::Cancelled,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            WorkOrderState::Draft => "DRAFT",
            WorkOrderState::Diagnosis => "DIAGNOSIS",
            WorkOrderState::Quote => "QUOTE",
            WorkOrderState::PendingApproval => "PENDING_APPROVAL",
            WorkOrderState::InExecution => "IN_EXECUTION",
            WorkOrderState::Finished => "FINISHED",
            WorkOrderState::Cancelled => "CANCELLED",
        }
    }

    fn spanish_name(&self) -> &'static str {
        match self {
            WorkOrderState::Draft => "BORRADOR",
            WorkOrderState::Diagnosis => "DIAGNOSTICO",
            WorkOrderState::Quote => "PRESUPUESTO",
            WorkOrderState::PendingApproval => "PEND_APROB",
            WorkOrderState::InExecution => "EN_EJECUCION",
            WorkOrderState::Finished => "FINALIZADA",
            WorkOrderState::Cancelled => "CANCELADA",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, WorkOrderState::Finished | WorkOrderState::Cancelled)
    }

    /// Regla de transición de la OT.
    ///
    /// Solo hay dos guardas: `IN_EXECUTION` exige presupuesto aprobado y
    /// `FINISHED` exige venir de `IN_EXECUTION`. Cualquier otro destino,
    /// incluida la cancelación, se acepta sin condiciones.
    pub fn can_transition(current: WorkOrderState, target: WorkOrderState, budget_approved: bool) -> bool {
        match target {
            WorkOrderState::InExecution => budget_approved,
            WorkOrderState::Finished => current == WorkOrderState::InExecution,
            _ => true,
        }
    }

    /// Estados en los que ya no se permite cambiar el vehículo de la OT
    pub fn locks_vehicle(&self) -> bool {
        matches!(
            self,
            WorkOrderState::InExecution | WorkOrderState::Finished | WorkOrderState::Cancelled
        )
    }
}

impl fmt::Display for WorkOrderState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for WorkOrderState {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let upper = s.trim().to_uppercase();
        WorkOrderState::ALL
            .into_iter()
            .find(|state| state.as_str() == upper || state.spanish_name() == upper)
            .ok_or_else(|| AppError::BadRequest(format!("Estado de OT desconocido: {}", s)))
    }
}

/// Orden de trabajo
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct WorkOrder {
    pub id: Uuid,
    pub number: i64,
    pub plate: String,
    pub state: WorkOrderState,
    pub mechanic_ids: Vec<Uuid>,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl WorkOrder {
    pub fn new(number: i64, plate: &str) -> Self {
        Self {
            id: Uuid::new_v4(),
            number,
            plate: plate.to_string(),
            state: WorkOrderState::Draft,
            mechanic_ids: Vec::new(),
            notes: None,
            created_at: Utc::now(),
        }
    }

    pub fn is_assigned_to(&self, user_id: Uuid) -> bool {
        self.mechanic_ids.contains(&user_id)
    }
}

/// Datos de entrada para crear una OT
#[derive(Debug, Clone)]
pub struct NewWorkOrder {
    pub client: Client,
    pub vehicle: Vehicle,
    pub mechanic_ids: Vec<Uuid>,
    pub budget_items: Vec<BudgetItem>,
    pub budget_approved: bool,
    pub symptoms: Vec<Symptom>,
    pub tasks: Vec<Task>,
}

impl NewWorkOrder {
    /// OT sin mecánicos, presupuesto, síntomas ni tareas
    pub fn new(client: Client, vehicle: Vehicle) -> Self {
        Self {
            client,
            vehicle,
            mechanic_ids: Vec::new(),
            budget_items: Vec::new(),
            budget_approved: false,
            symptoms: Vec::new(),
            tasks: Vec::new(),
        }
    }

    pub fn distinct_mechanics(&self) -> Vec<Uuid> {
        distinct_ids(&self.mechanic_ids)
    }
}

/// Ids sin duplicados, conservando el orden de llegada
pub fn distinct_ids(ids: &[Uuid]) -> Vec<Uuid> {
    let mut unique: Vec<Uuid> = Vec::with_capacity(ids.len());
    for id in ids {
        if !unique.contains(id) {
            unique.push(*id);
        }
    }
    unique
}

/// Filtros combinables de búsqueda; los campos vacíos no filtran
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SearchFilters {
    pub number: Option<i64>,
    pub plate: Option<String>,
    pub rut: Option<String>,
    pub state: Option<WorkOrderState>,
}

impl SearchFilters {
    pub fn is_empty(&self) -> bool {
        self.number.is_none() && self.plate.is_none() && self.rut.is_none() && self.state.is_none()
    }
}

/// Vista completa de una OT
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct WorkOrderDetail {
    pub order: WorkOrder,
    pub client: Option<Client>,
    pub vehicle: Option<Vehicle>,
    pub mechanics: Vec<User>,
    pub budget: Budget,
    pub tasks: Vec<Task>,
    pub symptoms: Vec<Symptom>,
    pub evidence: Vec<Evidence>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_in_execution_requires_approved_budget() {
        assert!(!WorkOrderState::can_transition(WorkOrderState::Draft, WorkOrderState::InExecution, false));
        assert!(WorkOrderState::can_transition(WorkOrderState::Draft, WorkOrderState::InExecution, true));
    }

    #[test]
    fn test_finished_requires_in_execution() {
        for current in WorkOrderState::ALL {
            let allowed = WorkOrderState::can_transition(current, WorkOrderState::Finished, true);
            assert_eq!(allowed, current == WorkOrderState::InExecution, "desde {}", current);
        }
    }

    #[test]
    fn test_cancellation_always_allowed() {
        for current in WorkOrderState::ALL {
            assert!(WorkOrderState::can_transition(current, WorkOrderState::Cancelled, false));
        }
    }

    #[test]
    fn test_state_parsing_accepts_both_vocabularies() {
        assert_eq!("EN_EJECUCION".parse::<WorkOrderState>().unwrap(), WorkOrderState::InExecution);
        assert_eq!("in_execution".parse::<WorkOrderState>().unwrap(), WorkOrderState::InExecution);
        assert_eq!("borrador".parse::<WorkOrderState>().unwrap(), WorkOrderState::Draft);
        assert!("ARCHIVADA".parse::<WorkOrderState>().is_err());
    }

    #[test]
    fn test_state_serde() {
        assert_eq!(serde_json::to_value(WorkOrderState::PendingApproval).unwrap(), "PENDING_APPROVAL");
        let parsed: WorkOrderState = serde_json::from_value(serde_json::json!("FINALIZADA")).unwrap();
        assert_eq!(parsed, WorkOrderState::Finished);
    }

    #[test]
    fn test_distinct_mechanics() {
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();
        let mut new_order = NewWorkOrder::new(
            Client::new("12345678-5", "Juan"),
            Vehicle::new("ABCD12", "12345678-5", "Toyota", "Yaris", 2018),
        );
        new_order.mechanic_ids = vec![a, b, a];
        assert_eq!(new_order.distinct_mechanics(), vec![a, b]);
    }
}
