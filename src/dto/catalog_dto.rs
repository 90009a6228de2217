use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::{
    models::{Client, Vehicle},
    utils::{
        rut::normalize_rut,
        validation::{normalize_plate, validate_not_empty, validate_plate},
    },
};

// Cliente. El dígito verificador no se exige aquí: las OTs aceptan el RUT
// tal como llega y solo lo normalizan.
#[derive(Debug, Clone, Serialize, Deserialize, Validate, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ClientDto {
    #[validate(custom = "validate_not_empty")]
    pub rut: String,
    #[validate(length(min = 1, max = 120))]
    pub nombre: String,
    #[serde(default)]
    #[validate(email)]
    pub correo: Option<String>,
    #[serde(default)]
    pub comuna: Option<String>,
    #[serde(default)]
    pub direccion: Option<String>,
    #[serde(default)]
    pub telefono: Option<String>,
}

impl From<Client> for ClientDto {
    fn from(client: Client) -> Self {
        Self {
            rut: client.rut,
            nombre: client.name,
            correo: client.email,
            comuna: client.commune,
            direccion: client.address,
            telefono: client.phone,
        }
    }
}

impl From<ClientDto> for Client {
    fn from(dto: ClientDto) -> Self {
        Self {
            rut: dto.rut,
            name: dto.nombre,
            email: dto.correo,
            commune: dto.comuna,
            address: dto.direccion,
            phone: dto.telefono,
        }
    }
}

// Vehículo
#[derive(Debug, Clone, Serialize, Deserialize, Validate, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct VehicleDto {
    #[validate(custom = "validate_plate")]
    pub patente: String,
    #[serde(default)]
    pub cliente_rut: Option<String>,
    #[validate(length(min = 1))]
    pub marca: String,
    #[validate(length(min = 1))]
    pub modelo: String,
    #[validate(range(min = 1900, max = 2100))]
    pub anio: i32,
    #[serde(default)]
    pub color: Option<String>,
    #[serde(default)]
    #[validate(range(min = 0))]
    pub kilometraje: Option<i64>,
    #[serde(default)]
    pub combustible: Option<String>,
}

impl From<Vehicle> for VehicleDto {
    fn from(vehicle: Vehicle) -> Self {
        Self {
            patente: vehicle.plate,
            cliente_rut: vehicle.client_rut,
            marca: vehicle.make,
            modelo: vehicle.model,
            anio: vehicle.year,
            color: vehicle.color,
            kilometraje: vehicle.mileage,
            combustible: vehicle.fuel,
        }
    }
}

impl From<VehicleDto> for Vehicle {
    fn from(dto: VehicleDto) -> Self {
        Self {
            plate: dto.patente,
            client_rut: dto.cliente_rut,
            make: dto.marca,
            model: dto.modelo,
            year: dto.anio,
            color: dto.color,
            mileage: dto.kilometraje,
            fuel: dto.combustible,
        }
    }
}

// Request para cambiar el dueño de un vehículo
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReassignVehicleRequest {
    pub cliente_rut: String,
}

// Vehículo según el registro externo de patentes
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ExternalVehicleDto {
    #[serde(default)]
    pub marca: Option<String>,
    #[serde(default)]
    pub modelo: Option<String>,
    #[serde(default)]
    pub anio: Option<i32>,
    #[serde(default)]
    pub color: Option<String>,
    #[serde(default)]
    pub kilometraje: Option<i64>,
    #[serde(default)]
    pub combustible: Option<String>,
    #[serde(default)]
    pub cliente_rut: Option<String>,
}

impl ExternalVehicleDto {
    /// Vehículo para precargar el formulario. Sin dueño o sin año no sirve.
    pub fn to_vehicle(&self, plate: &str) -> Option<Vehicle> {
        let rut = normalize_rut(self.cliente_rut.as_deref()?);
        let year = self.anio?;
        Some(Vehicle {
            plate: normalize_plate(plate),
            client_rut: Some(rut),
            make: self.marca.clone().unwrap_or_default(),
            model: self.modelo.clone().unwrap_or_default(),
            year,
            color: self.color.clone(),
            mileage: self.kilometraje,
            fuel: self.combustible.clone(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_vehicle_dto_wire_names() {
        let dto = VehicleDto::from(Vehicle::new("ABCD12", "12345678-5", "Toyota", "Yaris", 2018));
        let json = serde_json::to_value(&dto).unwrap();
        assert_eq!(json["clienteRut"], "12345678-5");
        assert_eq!(json["anio"], 2018);
        assert!(dto.validate().is_ok());
    }

    #[test]
    fn test_client_dto_only_requires_rut() {
        let dto = ClientDto::from(Client::new("12.345.678-9", "Juan"));
        assert!(dto.validate().is_ok());

        let blank = ClientDto {
            rut: "   ".to_string(),
            ..dto
        };
        assert!(blank.validate().is_err());
    }

    #[test]
    fn test_external_vehicle_needs_owner_and_year() {
        let mut external = ExternalVehicleDto {
            marca: Some("Toyota".to_string()),
            anio: Some(2018),
            cliente_rut: Some("12.345.678-5".to_string()),
            ..Default::default()
        };
        let vehicle = external.to_vehicle("abcd12").unwrap();
        assert_eq!(vehicle.plate, "ABCD12");
        assert_eq!(vehicle.client_rut.as_deref(), Some("12345678-5"));
        assert_eq!(vehicle.model, "");

        external.anio = None;
        assert!(external.to_vehicle("ABCD12").is_none());
    }
}
