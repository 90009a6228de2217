//! Clientes HTTP
//!
//! Este módulo contiene los clientes HTTP del backend remoto.

pub mod external_vehicle_client;
pub mod gesticar_api_client;

pub use external_vehicle_client::ExternalVehicleClient;
pub use gesticar_api_client::GesticarApiClient;
