//! Cliente del registro externo de patentes

use reqwest::{Client, StatusCode};
use std::time::Duration;
use tracing::debug;

use crate::{
    dto::ExternalVehicleDto,
    models::Vehicle,
    utils::{errors::AppResult, validation::normalize_plate},
};

pub struct ExternalVehicleClient {
    client: Client,
    base_url: String,
}

impl ExternalVehicleClient {
    pub fn new(base_url: &str) -> AppResult<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(15))
            .build()?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    /// Busca la patente en el registro. `None` si no la conoce o si la
    /// respuesta no trae dueño y año.
    pub async fn lookup(&self, plate: &str) -> AppResult<Option<Vehicle>> {
        let plate = normalize_plate(plate);
        let url = format!("{}/vehicles/{}", self.base_url, urlencoding::encode(&plate));

        let response = self.client.get(&url).send().await?;
        if response.status() == StatusCode::NOT_FOUND {
            debug!("🔎 Patente {} desconocida en el registro", plate);
            return Ok(None);
        }
        let dto: ExternalVehicleDto = response.error_for_status()?.json().await?;
        Ok(dto.to_vehicle(&plate))
    }
}
