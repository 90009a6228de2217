//! Modelo de Vehicle
//!
//! La patente (en mayúsculas) es la clave única global. Un vehículo puede
//! cambiar de dueño o quedar sin dueño (`client_rut = None`).

use serde::{Deserialize, Serialize};

use crate::utils::{rut::normalize_rut, validation::normalize_plate};

/// Vehículo registrado en el taller
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Vehicle {
    pub plate: String,
    pub client_rut: Option<String>,
    pub make: String,
    pub model: String,
    pub year: i32,
    pub color: Option<String>,
    pub mileage: Option<i64>,
    pub fuel: Option<String>,
}

impl Vehicle {
    pub fn new(plate: &str, client_rut: &str, make: &str, model: &str, year: i32) -> Self {
        Self {
            plate: plate.to_string(),
            client_rut: Some(client_rut.to_string()),
            make: make.to_string(),
            model: model.to_string(),
            year,
            color: None,
            mileage: None,
            fuel: None,
        }
    }

    /// Patente en mayúsculas y RUT del dueño normalizado
    pub fn normalized(mut self) -> Self {
        self.plate = normalize_plate(&self.plate);
        self.client_rut = self
            .client_rut
            .as_deref()
            .map(normalize_rut)
            .filter(|rut| !rut.is_empty());
        self
    }

    /// Vincula el vehículo a otro dueño
    pub fn owned_by(mut self, rut: &str) -> Self {
        self.client_rut = Some(normalize_rut(rut));
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalized_uppercases_plate_and_rut() {
        let vehicle = Vehicle::new("ij1234", "12.345.678-k", "Ford", "Focus", 2019).normalized();
        assert_eq!(vehicle.plate, "IJ1234");
        assert_eq!(vehicle.client_rut.as_deref(), Some("12345678-K"));
    }

    #[test]
    fn test_blank_owner_means_detached() {
        let mut vehicle = Vehicle::new("ABCD12", "", "Toyota", "Yaris", 2018);
        vehicle = vehicle.normalized();
        assert!(vehicle.client_rut.is_none());
    }
}
