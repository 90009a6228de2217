//! Modelo de Cliente
//!
//! El RUT normalizado es la clave única del cliente.

use serde::{Deserialize, Serialize};

use crate::utils::rut::normalize_rut;

/// Cliente del taller
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Client {
    pub rut: String,
    pub name: String,
    pub email: Option<String>,
    pub commune: Option<String>,
    pub address: Option<String>,
    pub phone: Option<String>,
}

impl Client {
    pub fn new(rut: &str, name: &str) -> Self {
        Self {
            rut: rut.to_string(),
            name: name.to_string(),
            email: None,
            commune: None,
            address: None,
            phone: None,
        }
    }

    /// Copia del cliente con el RUT en forma canónica
    pub fn normalized(mut self) -> Self {
        self.rut = normalize_rut(&self.rut);
        self
    }
}
