//! Modelo de Evidencia fotográfica
//!
//! Las fotos se clasifican por etapa: ingreso (estado inicial del
//! vehículo), ejecución (avances) y cierre (verificación final).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use uuid::Uuid;

use crate::utils::errors::AppError;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EvidenceStage {
    #[serde(alias = "INGRESO")]
    Intake,
    #[serde(alias = "EJECUCION")]
    Execution,
    #[serde(alias = "CIERRE")]
    Closeout,
}

impl EvidenceStage {
    pub fn as_str(&self) -> &'static str {
        match self {
            EvidenceStage::Intake => "INTAKE",
            EvidenceStage::Execution => "EXECUTION",
            EvidenceStage::Closeout => "CLOSEOUT",
        }
    }
}

impl FromStr for EvidenceStage {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_uppercase().as_str() {
            "INTAKE" | "INGRESO" => Ok(EvidenceStage::Intake),
            "EXECUTION" | "EJECUCION" => Ok(EvidenceStage::Execution),
            "CLOSEOUT" | "CIERRE" => Ok(EvidenceStage::Closeout),
            other => Err(AppError::BadRequest(format!("Etapa desconocida: {}", other))),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Evidence {
    pub id: Uuid,
    pub order_id: Uuid,
    pub stage: EvidenceStage,
    pub local_uri: String,
    pub timestamp: DateTime<Utc>,
}

impl Evidence {
    pub fn new(order_id: Uuid, stage: EvidenceStage, local_uri: &str) -> Self {
        Self {
            id: Uuid::new_v4(),
            order_id,
            stage,
            local_uri: local_uri.to_string(),
            timestamp: Utc::now(),
        }
    }
}
