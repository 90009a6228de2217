//! Repositorios
//!
//! `WorkOrderRepository` es la única capacidad de datos de la aplicación.
//! Hay tres implementaciones intercambiables: en memoria, SQLite local y
//! remota sobre HTTP. La elección se hace al componer la aplicación.
//!
//! Las búsquedas sin resultado devuelven `None` o una lista vacía y las
//! transiciones rechazadas devuelven `false`; los errores quedan para
//! fallas de almacenamiento o de red.

pub mod fake_repository;
pub mod remote_repository;
pub mod sqlite_repository;

use std::sync::Arc;
use uuid::Uuid;

use crate::{
    config::environment::{Backend, EnvironmentConfig},
    models::{
        AuditEntry, Budget, BudgetItem, Client, Evidence, EvidenceStage, NewWorkOrder, Role,
        SearchFilters, Task, User, Vehicle, WorkOrder, WorkOrderDetail, WorkOrderState,
    },
    utils::{errors::AppResult, rut::normalize_rut, validation::normalize_plate},
};

pub use fake_repository::FakeRepository;
pub use remote_repository::RemoteRepository;
pub use sqlite_repository::SqliteRepository;

#[async_trait::async_trait]
pub trait WorkOrderRepository: Send + Sync {
    /// Todas las OTs ordenadas por número
    async fn list_orders(&self) -> AppResult<Vec<WorkOrder>>;

    async fn find_user_by_email(&self, email: &str) -> AppResult<Option<User>>;

    /// Usuario cuyo hash coincide con la contraseña, o `None`
    async fn authenticate(&self, email: &str, password: &str) -> AppResult<Option<User>>;

    async fn create_user(&self, name: &str, email: &str, password: &str, role: Role) -> AppResult<User>;

    async fn find_by_number(&self, number: i64) -> AppResult<Option<WorkOrder>>;

    async fn find_by_plate(&self, plate: &str) -> AppResult<Vec<WorkOrder>>;

    /// OTs de los vehículos cuyo dueño tiene este RUT
    async fn find_by_rut(&self, rut: &str) -> AppResult<Vec<WorkOrder>>;

    async fn find_by_state(&self, state: WorkOrderState) -> AppResult<Vec<WorkOrder>>;

    /// Marca el presupuesto como aprobado. Idempotente; sin efecto si la OT no existe.
    async fn approve_budget(&self, order_id: Uuid, actor: &str) -> AppResult<()>;

    async fn change_state(&self, order_id: Uuid, target: WorkOrderState, actor: &str) -> AppResult<bool>;

    async fn list_mechanics(&self) -> AppResult<Vec<User>>;

    /// Próximo número visible, sin consumirlo
    async fn next_number(&self) -> AppResult<i64>;

    async fn create_order(&self, new_order: NewWorkOrder, actor: &str) -> AppResult<WorkOrder>;

    /// Solo borra OTs en borrador. El número no se reutiliza.
    async fn delete_order(&self, order_id: Uuid, actor: &str) -> AppResult<bool>;

    async fn order_detail(&self, order_id: Uuid) -> AppResult<Option<WorkOrderDetail>>;

    async fn find_client(&self, rut: &str) -> AppResult<Option<Client>>;

    async fn save_client(&self, client: Client) -> AppResult<Client>;

    async fn vehicles_by_client(&self, rut: &str) -> AppResult<Vec<Vehicle>>;

    async fn find_vehicle(&self, plate: &str) -> AppResult<Option<Vehicle>>;

    async fn save_vehicle(&self, vehicle: Vehicle) -> AppResult<Vehicle>;

    /// Deja el vehículo sin dueño
    async fn detach_vehicle(&self, plate: &str) -> AppResult<bool>;

    async fn reassign_vehicle(&self, plate: &str, rut: &str) -> AppResult<Option<Vehicle>>;

    async fn update_notes(&self, order_id: Uuid, notes: Option<String>, actor: &str) -> AppResult<bool>;

    async fn update_mechanics(&self, order_id: Uuid, mechanic_ids: Vec<Uuid>, actor: &str) -> AppResult<bool>;

    async fn update_order_vehicle(&self, order_id: Uuid, plate: &str, actor: &str) -> AppResult<bool>;

    async fn budget(&self, order_id: Uuid) -> AppResult<Option<Budget>>;

    /// Agrega un ítem. Si el presupuesto estaba aprobado, la aprobación se revoca.
    async fn add_budget_item(&self, order_id: Uuid, item: BudgetItem, actor: &str) -> AppResult<bool>;

    async fn save_budget(
        &self,
        order_id: Uuid,
        items: Vec<BudgetItem>,
        approved: bool,
        tax_percent: i64,
        actor: &str,
    ) -> AppResult<bool>;

    async fn tasks(&self, order_id: Uuid) -> AppResult<Vec<Task>>;

    async fn save_tasks(&self, order_id: Uuid, tasks: Vec<Task>, actor: &str) -> AppResult<bool>;

    async fn add_evidence(
        &self,
        order_id: Uuid,
        stage: EvidenceStage,
        local_uri: &str,
        actor: &str,
    ) -> AppResult<Option<Evidence>>;

    /// Bitácora en orden de inserción
    async fn audit_log(&self, order_id: Uuid) -> AppResult<Vec<AuditEntry>>;

    /// Búsqueda combinada. Sin filtros devuelve todas las OTs.
    async fn search(&self, filters: &SearchFilters) -> AppResult<Vec<WorkOrder>> {
        let mut orders = match (&filters.number, &filters.plate, &filters.rut) {
            (Some(number), _, _) => self.find_by_number(*number).await?.into_iter().collect(),
            (None, Some(plate), _) => self.find_by_plate(plate).await?,
            (None, None, Some(rut)) => self.find_by_rut(rut).await?,
            (None, None, None) => match filters.state {
                Some(state) => self.find_by_state(state).await?,
                None => self.list_orders().await?,
            },
        };

        if let Some(plate) = &filters.plate {
            let plate = normalize_plate(plate);
            orders.retain(|order| order.plate == plate);
        }
        if let Some(rut) = &filters.rut {
            let plates: Vec<String> = self
                .vehicles_by_client(&normalize_rut(rut))
                .await?
                .into_iter()
                .map(|vehicle| vehicle.plate)
                .collect();
            orders.retain(|order| plates.contains(&order.plate));
        }
        if let Some(state) = filters.state {
            orders.retain(|order| order.state == state);
        }
        Ok(orders)
    }

    /// Invalida lo que el backend tenga en memoria
    async fn refresh(&self) -> AppResult<()> {
        Ok(())
    }

    /// Cierra la sesión del backend
    async fn logout(&self) -> AppResult<()> {
        Ok(())
    }
}

/// Construye el backend indicado en la configuración
pub async fn build(config: &EnvironmentConfig) -> AppResult<Arc<dyn WorkOrderRepository>> {
    let repository: Arc<dyn WorkOrderRepository> = match config.backend {
        Backend::Fake => Arc::new(FakeRepository::seeded()?),
        Backend::Sqlite => {
            let pool = crate::config::database::DatabaseConfig::from(config).create_pool().await?;
            Arc::new(SqliteRepository::initialize(pool).await?)
        }
        Backend::Remote => Arc::new(RemoteRepository::from_config(config)?),
    };
    Ok(repository)
}
