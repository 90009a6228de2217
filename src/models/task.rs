//! Modelo de Tarea de una OT

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use uuid::Uuid;

use crate::utils::errors::AppError;

/// Estado de la tarea
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TaskStatus {
    #[serde(alias = "CREADA")]
    Created,
    #[serde(alias = "INICIADA")]
    Started,
    #[serde(alias = "CANCELADA")]
    Cancelled,
    #[serde(alias = "TERMINADA")]
    Finished,
    #[serde(alias = "TERMINADA_INCOMPLETA")]
    FinishedIncomplete,
}

impl TaskStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TaskStatus::Created => "CREATED",
            TaskStatus::Started => "STARTED",
            TaskStatus::Cancelled => "CANCELLED",
            TaskStatus::Finished => "FINISHED",
            TaskStatus::FinishedIncomplete => "FINISHED_INCOMPLETE",
        }
    }
}

impl FromStr for TaskStatus {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_uppercase().as_str() {
            "CREATED" | "CREADA" => Ok(TaskStatus::Created),
            "STARTED" | "INICIADA" => Ok(TaskStatus::Started),
            "CANCELLED" | "CANCELADA" => Ok(TaskStatus::Cancelled),
            "FINISHED" | "TERMINADA" => Ok(TaskStatus::Finished),
            "FINISHED_INCOMPLETE" | "TERMINADA_INCOMPLETA" => Ok(TaskStatus::FinishedIncomplete),
            other => Err(AppError::BadRequest(format!("Estado de tarea desconocido: {}", other))),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Task {
    pub id: Uuid,
    pub title: String,
    pub detail: Option<String>,
    pub created_at: DateTime<Utc>,
    pub started_at: Option<DateTime<Utc>>,
    pub finished_at: Option<DateTime<Utc>>,
    pub status: TaskStatus,
}

impl Task {
    pub fn new(title: &str) -> Self {
        Self {
            id: Uuid::new_v4(),
            title: title.to_string(),
            detail: None,
            created_at: Utc::now(),
            started_at: None,
            finished_at: None,
            status: TaskStatus::Created,
        }
    }
}
