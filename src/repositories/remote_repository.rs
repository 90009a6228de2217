//! Repositorio remoto
//!
//! Cada operación es un request contra la API de Gesticar. La lista de OTs
//! y los detalles pasan por un cache con expiración que se vacía entero
//! tras cualquier mutación hecha por esta instancia, en `refresh()` y en
//! `logout()`.
//!
//! El actor de la auditoría lo decide el servidor a partir del token, así
//! que el parámetro `actor` no viaja.

use http::Method;
use tracing::{debug, info};
use uuid::Uuid;

use super::WorkOrderRepository;
use crate::{
    cache::{CacheConfig, TtlCache},
    clients::{ExternalVehicleClient, GesticarApiClient},
    config::environment::EnvironmentConfig,
    dto::{
        AuditLogDto, BudgetDto, BudgetItemDto, ChangeStateRequest, ClientDto, EvidenceDto,
        EvidenceRequest, LoginRequest, LoginResponse, MechanicsRequest, NewUserRequest,
        NewWorkOrderRequest, NextNumberResponse, NotesRequest, OkResponse, OrderVehicleRequest,
        ReassignVehicleRequest, SearchQuery, TaskDto, UserDto, VehicleDto, WorkOrderDetailDto,
        WorkOrderDto,
    },
    models::{
        budget::DEFAULT_TAX_PERCENT,
        AuditEntry, Budget, BudgetItem, Client, Evidence, EvidenceStage, NewWorkOrder, Role,
        SearchFilters, Task, User, Vehicle, WorkOrder, WorkOrderDetail, WorkOrderState,
    },
    utils::{
        errors::{AppError, AppResult},
        rut::normalize_rut,
        validation::normalize_plate,
    },
};

const ORDERS_KEY: &str = "ots";

fn seg(value: &str) -> String {
    GesticarApiClient::segment(value)
}

fn orders_from(dtos: Vec<WorkOrderDto>) -> Vec<WorkOrder> {
    dtos.into_iter().map(WorkOrder::from).collect()
}

fn not_found_as_none<T>(result: AppResult<T>) -> AppResult<Option<T>> {
    match result {
        Ok(value) => Ok(Some(value)),
        Err(AppError::NotFound(_)) => Ok(None),
        Err(e) => Err(e),
    }
}

/// Backend remoto
pub struct RemoteRepository {
    api: GesticarApiClient,
    external: Option<ExternalVehicleClient>,
    orders_cache: TtlCache<Vec<WorkOrder>>,
    detail_cache: TtlCache<WorkOrderDetail>,
}

impl RemoteRepository {
    pub fn new(api: GesticarApiClient, external: Option<ExternalVehicleClient>, cache: CacheConfig) -> Self {
        Self {
            api,
            external,
            orders_cache: TtlCache::new(cache.clone()),
            detail_cache: TtlCache::new(cache),
        }
    }

    pub fn from_config(config: &EnvironmentConfig) -> AppResult<Self> {
        let api = GesticarApiClient::new(&config.api_base_url)?;
        let external = config
            .external_api_base_url
            .as_deref()
            .map(ExternalVehicleClient::new)
            .transpose()?;
        info!("🌐 Backend remoto apuntando a {}", config.api_base_url);
        Ok(Self::new(api, external, CacheConfig::from(config)))
    }

    /// Datos del registro externo para precargar un vehículo
    pub async fn lookup_external_vehicle(&self, plate: &str) -> AppResult<Option<Vehicle>> {
        match &self.external {
            Some(client) => client.lookup(plate).await,
            None => {
                debug!("Registro externo no configurado");
                Ok(None)
            }
        }
    }

    async fn invalidate(&self) {
        self.orders_cache.clear().await;
        self.detail_cache.clear().await;
    }

    async fn ok_after(&self, result: AppResult<OkResponse>) -> AppResult<bool> {
        self.invalidate().await;
        Ok(result?.ok)
    }

    async fn query_orders(&self, query: &SearchQuery) -> AppResult<Vec<WorkOrder>> {
        let dtos: Vec<WorkOrderDto> = self.api.get_with_query("ots", query).await?;
        Ok(orders_from(dtos))
    }
}

#[async_trait::async_trait]
impl WorkOrderRepository for RemoteRepository {
    async fn list_orders(&self) -> AppResult<Vec<WorkOrder>> {
        if let Some(orders) = self.orders_cache.get(ORDERS_KEY).await {
            return Ok(orders);
        }
        let orders = orders_from(self.api.get("ots").await?);
        self.orders_cache.set(ORDERS_KEY, orders.clone()).await;
        Ok(orders)
    }

    async fn find_user_by_email(&self, email: &str) -> AppResult<Option<User>> {
        let query = [("email", email.trim())];
        let user: Option<UserDto> = not_found_as_none(self.api.get_with_query("usuarios", &query).await)?;
        Ok(user.map(User::from))
    }

    async fn authenticate(&self, email: &str, password: &str) -> AppResult<Option<User>> {
        let request = LoginRequest {
            email: email.trim().to_string(),
            password: password.to_string(),
        };
        let response: LoginResponse = match self.api.send_json(Method::POST, "auth/login", &request).await {
            Ok(response) => response,
            Err(AppError::Unauthorized(_)) | Err(AppError::NotFound(_)) => return Ok(None),
            Err(e) => return Err(e),
        };
        self.invalidate().await;
        self.api.set_token(Some(response.token)).await;
        info!("🔐 Sesión remota iniciada para {}", response.usuario.email);
        Ok(Some(response.usuario.into()))
    }

    async fn create_user(&self, name: &str, email: &str, password: &str, role: Role) -> AppResult<User> {
        let request = NewUserRequest {
            nombre: name.to_string(),
            email: email.trim().to_string(),
            password: password.to_string(),
            rol: role,
        };
        let user: UserDto = self.api.send_json(Method::POST, "usuarios", &request).await?;
        Ok(user.into())
    }

    async fn find_by_number(&self, number: i64) -> AppResult<Option<WorkOrder>> {
        let query = SearchQuery {
            numero: Some(number),
            ..Default::default()
        };
        Ok(self.query_orders(&query).await?.into_iter().next())
    }

    async fn find_by_plate(&self, plate: &str) -> AppResult<Vec<WorkOrder>> {
        let query = SearchQuery {
            patente: Some(normalize_plate(plate)),
            ..Default::default()
        };
        self.query_orders(&query).await
    }

    async fn find_by_rut(&self, rut: &str) -> AppResult<Vec<WorkOrder>> {
        let query = SearchQuery {
            rut: Some(normalize_rut(rut)),
            ..Default::default()
        };
        self.query_orders(&query).await
    }

    async fn find_by_state(&self, state: WorkOrderState) -> AppResult<Vec<WorkOrder>> {
        let query = SearchQuery {
            estado: Some(state.as_str().to_string()),
            ..Default::default()
        };
        self.query_orders(&query).await
    }

    async fn approve_budget(&self, order_id: Uuid, _actor: &str) -> AppResult<()> {
        let path = format!("ots/{}/presupuesto/aprobar", order_id);
        let result = self.api.send_empty(Method::POST, &path).await;
        self.invalidate().await;
        result
    }

    async fn change_state(&self, order_id: Uuid, target: WorkOrderState, _actor: &str) -> AppResult<bool> {
        let path = format!("ots/{}/estado", order_id);
        let result = self
            .api
            .send_json(Method::PATCH, &path, &ChangeStateRequest { estado: target })
            .await;
        self.ok_after(result).await
    }

    async fn list_mechanics(&self) -> AppResult<Vec<User>> {
        let users: Vec<UserDto> = self.api.get("usuarios/mecanicos").await?;
        Ok(users.into_iter().map(User::from).collect())
    }

    async fn next_number(&self) -> AppResult<i64> {
        let response: NextNumberResponse = self.api.get("ots/siguiente-numero").await?;
        Ok(response.numero)
    }

    async fn create_order(&self, new_order: NewWorkOrder, _actor: &str) -> AppResult<WorkOrder> {
        Budget::ensure_amounts(&new_order.budget_items, DEFAULT_TAX_PERCENT)?;
        let request = NewWorkOrderRequest::from(new_order);
        let result: AppResult<WorkOrderDto> = self.api.send_json(Method::POST, "ots", &request).await;
        self.invalidate().await;
        Ok(result?.into())
    }

    async fn delete_order(&self, order_id: Uuid, _actor: &str) -> AppResult<bool> {
        let result = self.api.send_for(Method::DELETE, &format!("ots/{}", order_id)).await;
        self.ok_after(result).await
    }

    async fn order_detail(&self, order_id: Uuid) -> AppResult<Option<WorkOrderDetail>> {
        let key = order_id.to_string();
        if let Some(detail) = self.detail_cache.get(&key).await {
            return Ok(Some(detail));
        }
        let dto: Option<WorkOrderDetailDto> = self.api.get_optional(&format!("ots/{}", order_id)).await?;
        let detail = dto.map(WorkOrderDetail::from);
        if let Some(detail) = &detail {
            self.detail_cache.set(&key, detail.clone()).await;
        }
        Ok(detail)
    }

    async fn find_client(&self, rut: &str) -> AppResult<Option<Client>> {
        let path = format!("clientes/{}", seg(&normalize_rut(rut)));
        let client: Option<ClientDto> = self.api.get_optional(&path).await?;
        Ok(client.map(Client::from))
    }

    async fn save_client(&self, client: Client) -> AppResult<Client> {
        let client = client.normalized();
        let path = format!("clientes/{}", seg(&client.rut));
        let saved: ClientDto = self.api.send_json(Method::PUT, &path, &ClientDto::from(client)).await?;
        self.invalidate().await;
        Ok(saved.into())
    }

    async fn vehicles_by_client(&self, rut: &str) -> AppResult<Vec<Vehicle>> {
        let path = format!("clientes/{}/vehiculos", seg(&normalize_rut(rut)));
        let vehicles: Vec<VehicleDto> = self.api.get(&path).await?;
        Ok(vehicles.into_iter().map(Vehicle::from).collect())
    }

    async fn find_vehicle(&self, plate: &str) -> AppResult<Option<Vehicle>> {
        let path = format!("vehiculos/{}", seg(&normalize_plate(plate)));
        let vehicle: Option<VehicleDto> = self.api.get_optional(&path).await?;
        Ok(vehicle.map(Vehicle::from))
    }

    async fn save_vehicle(&self, vehicle: Vehicle) -> AppResult<Vehicle> {
        let vehicle = vehicle.normalized();
        let path = format!("vehiculos/{}", seg(&vehicle.plate));
        let saved: VehicleDto = self.api.send_json(Method::PUT, &path, &VehicleDto::from(vehicle)).await?;
        self.invalidate().await;
        Ok(saved.into())
    }

    async fn detach_vehicle(&self, plate: &str) -> AppResult<bool> {
        let path = format!("vehiculos/{}/cliente", seg(&normalize_plate(plate)));
        let result = self.api.send_for(Method::DELETE, &path).await;
        self.ok_after(result).await
    }

    async fn reassign_vehicle(&self, plate: &str, rut: &str) -> AppResult<Option<Vehicle>> {
        let path = format!("vehiculos/{}/cliente", seg(&normalize_plate(plate)));
        let request = ReassignVehicleRequest {
            cliente_rut: normalize_rut(rut),
        };
        let result = self.api.send_json::<VehicleDto, _>(Method::PUT, &path, &request).await;
        self.invalidate().await;
        Ok(not_found_as_none(result)?.map(Vehicle::from))
    }

    async fn update_notes(&self, order_id: Uuid, notes: Option<String>, _actor: &str) -> AppResult<bool> {
        let path = format!("ots/{}/notas", order_id);
        let result = self.api.send_json(Method::PUT, &path, &NotesRequest { notas: notes }).await;
        self.ok_after(result).await
    }

    async fn update_mechanics(&self, order_id: Uuid, mechanic_ids: Vec<Uuid>, _actor: &str) -> AppResult<bool> {
        let path = format!("ots/{}/mecanicos", order_id);
        let request = MechanicsRequest { mecanicos: mechanic_ids };
        let result = self.api.send_json(Method::PUT, &path, &request).await;
        self.ok_after(result).await
    }

    async fn update_order_vehicle(&self, order_id: Uuid, plate: &str, _actor: &str) -> AppResult<bool> {
        let path = format!("ots/{}/vehiculo", order_id);
        let request = OrderVehicleRequest {
            patente: normalize_plate(plate),
        };
        let result = self.api.send_json(Method::PUT, &path, &request).await;
        self.ok_after(result).await
    }

    async fn budget(&self, order_id: Uuid) -> AppResult<Option<Budget>> {
        let dto: Option<BudgetDto> = self.api.get_optional(&format!("ots/{}/presupuesto", order_id)).await?;
        Ok(dto.map(|dto| dto.into_budget(order_id)))
    }

    async fn add_budget_item(&self, order_id: Uuid, item: BudgetItem, _actor: &str) -> AppResult<bool> {
        let path = format!("ots/{}/presupuesto/items", order_id);
        let result = self.api.send_json(Method::POST, &path, &BudgetItemDto::from(item)).await;
        self.ok_after(result).await
    }

    async fn save_budget(
        &self,
        order_id: Uuid,
        items: Vec<BudgetItem>,
        approved: bool,
        tax_percent: i64,
        _actor: &str,
    ) -> AppResult<bool> {
        Budget::ensure_amounts(&items, tax_percent)?;
        let budget = Budget {
            order_id,
            items,
            approved,
            tax_percent,
        };
        let path = format!("ots/{}/presupuesto", order_id);
        let result = self.api.send_json(Method::PUT, &path, &BudgetDto::from(budget)).await;
        self.ok_after(result).await
    }

    async fn tasks(&self, order_id: Uuid) -> AppResult<Vec<Task>> {
        let tasks: Vec<TaskDto> = self.api.get(&format!("ots/{}/tareas", order_id)).await?;
        Ok(tasks.into_iter().map(Task::from).collect())
    }

    async fn save_tasks(&self, order_id: Uuid, tasks: Vec<Task>, _actor: &str) -> AppResult<bool> {
        let path = format!("ots/{}/tareas", order_id);
        let body: Vec<TaskDto> = tasks.into_iter().map(TaskDto::from).collect();
        let result = self.api.send_json(Method::PUT, &path, &body).await;
        self.ok_after(result).await
    }

    async fn add_evidence(
        &self,
        order_id: Uuid,
        stage: EvidenceStage,
        local_uri: &str,
        _actor: &str,
    ) -> AppResult<Option<Evidence>> {
        let path = format!("ots/{}/evidencias", order_id);
        let request = EvidenceRequest {
            etapa: stage,
            uri_local: local_uri.to_string(),
        };
        let result = self.api.send_json::<EvidenceDto, _>(Method::POST, &path, &request).await;
        self.invalidate().await;
        Ok(not_found_as_none(result)?.map(Evidence::from))
    }

    async fn audit_log(&self, order_id: Uuid) -> AppResult<Vec<AuditEntry>> {
        let entries: Vec<AuditLogDto> = self.api.get(&format!("ots/{}/auditoria", order_id)).await?;
        Ok(entries.into_iter().map(AuditEntry::from).collect())
    }

    async fn search(&self, filters: &SearchFilters) -> AppResult<Vec<WorkOrder>> {
        if filters.is_empty() {
            return self.list_orders().await;
        }
        self.query_orders(&SearchQuery::from(filters)).await
    }

    async fn refresh(&self) -> AppResult<()> {
        self.invalidate().await;
        Ok(())
    }

    async fn logout(&self) -> AppResult<()> {
        self.invalidate().await;
        if self.api.has_token().await {
            self.api.set_token(None).await;
            info!("👋 Sesión remota cerrada");
        }
        Ok(())
    }
}
