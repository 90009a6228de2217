//! Modelo de Síntoma reportado al ingresar el vehículo

use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Symptom {
    pub id: Uuid,
    pub description: String,
    /// Etapa libre en la que se registró (p. ej. "recepcion")
    pub stage: Option<String>,
    pub photos: Vec<String>,
}

impl Symptom {
    pub fn new(description: &str) -> Self {
        Self {
            id: Uuid::new_v4(),
            description: description.to_string(),
            stage: None,
            photos: Vec::new(),
        }
    }
}
