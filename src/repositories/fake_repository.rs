//! Repositorio en memoria
//!
//! Todo el estado vive detrás de un único `RwLock`, así cada operación
//! (incluida la creación completa de una OT) ocurre en un solo bloqueo.
//! La secuencia de números pertenece a la instancia.

use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicI64, Ordering};
use tokio::sync::RwLock;
use tracing::{debug, info, warn};
use uuid::Uuid;

use super::WorkOrderRepository;
use crate::{
    database::seed,
    models::{
        audit::{self, AuditEntry},
        budget::DEFAULT_TAX_PERCENT,
        work_order::{distinct_ids, ORDER_NUMBER_SEED},
        Budget, BudgetItem, Client, Evidence, EvidenceStage, NewWorkOrder, Role, Symptom, Task,
        User, Vehicle, WorkOrder, WorkOrderDetail, WorkOrderState,
    },
    utils::{
        errors::{conflict_error, not_found_error, AppResult},
        rut::normalize_rut,
        validation::normalize_plate,
    },
};

#[derive(Default)]
struct Store {
    users: Vec<User>,
    clients: BTreeMap<String, Client>,
    vehicles: BTreeMap<String, Vehicle>,
    /// Ordenadas por número
    orders: Vec<WorkOrder>,
    budgets: HashMap<Uuid, Budget>,
    tasks: HashMap<Uuid, Vec<Task>>,
    symptoms: HashMap<Uuid, Vec<Symptom>>,
    evidence: HashMap<Uuid, Vec<Evidence>>,
    audit: Vec<AuditEntry>,
}

impl Store {
    fn log(&mut self, order_id: Uuid, actor: &str, action: impl Into<String>) {
        self.audit.push(AuditEntry::new(order_id, actor, action));
    }

    fn order(&self, order_id: Uuid) -> Option<&WorkOrder> {
        self.orders.iter().find(|order| order.id == order_id)
    }

    fn order_mut(&mut self, order_id: Uuid) -> Option<&mut WorkOrder> {
        self.orders.iter_mut().find(|order| order.id == order_id)
    }

    fn budget_mut(&mut self, order_id: Uuid) -> &mut Budget {
        self.budgets.entry(order_id).or_insert_with(|| Budget::new(order_id))
    }

    fn upsert_client(&mut self, client: Client) -> Client {
        let client = client.normalized();
        self.clients.insert(client.rut.clone(), client.clone());
        client
    }

    fn upsert_vehicle(&mut self, vehicle: Vehicle) -> AppResult<Vehicle> {
        let vehicle = vehicle.normalized();
        if let Some(rut) = &vehicle.client_rut {
            if !self.clients.contains_key(rut) {
                return Err(not_found_error("Cliente", rut));
            }
        }
        self.vehicles.insert(vehicle.plate.clone(), vehicle.clone());
        Ok(vehicle)
    }

    /// Inserta la OT con todo lo que posee. El número ya viene asignado.
    fn insert_order(&mut self, number: i64, new_order: NewWorkOrder, actor: &str) -> AppResult<WorkOrder> {
        let client = self.upsert_client(new_order.client.clone());
        let vehicle = self.upsert_vehicle(new_order.vehicle.clone().owned_by(&client.rut))?;

        let mut order = WorkOrder::new(number, &vehicle.plate);
        order.mechanic_ids = new_order.distinct_mechanics();

        let mut budget = Budget::new(order.id);
        budget.items = new_order.budget_items;
        budget.approved = new_order.budget_approved;

        self.budgets.insert(order.id, budget);
        self.tasks.insert(order.id, new_order.tasks);
        self.symptoms.insert(order.id, new_order.symptoms);
        self.orders.push(order.clone());

        self.log(order.id, actor, audit::CREATE_ORDER);
        if new_order.budget_approved {
            self.log(order.id, actor, audit::BUDGET_APPROVED_ON_CREATE);
        }
        Ok(order)
    }

    fn orders_for_plates(&self, plates: &[String]) -> Vec<WorkOrder> {
        self.orders
            .iter()
            .filter(|order| plates.contains(&order.plate))
            .cloned()
            .collect()
    }
}

/// Backend en memoria
pub struct FakeRepository {
    store: RwLock<Store>,
    sequence: AtomicI64,
}

impl Default for FakeRepository {
    fn default() -> Self {
        Self::new()
    }
}

impl FakeRepository {
    /// Repositorio vacío; la primera OT recibe el número 1001
    pub fn new() -> Self {
        Self {
            store: RwLock::new(Store::default()),
            sequence: AtomicI64::new(ORDER_NUMBER_SEED),
        }
    }

    /// Repositorio con los datos iniciales del taller
    pub fn seeded() -> AppResult<Self> {
        let mut repository = Self::new();
        let store = repository.store.get_mut();

        store.users = seed::users()?;
        for (client, vehicle) in seed::clients() {
            store.upsert_client(client);
            store.upsert_vehicle(vehicle)?;
        }

        let mechanic = store
            .users
            .iter()
            .find(|user| user.role == Role::Mechanic)
            .cloned();
        if let Some(mechanic) = mechanic {
            let number = repository.sequence.fetch_add(1, Ordering::SeqCst) + 1;
            let order = store.insert_order(number, seed::first_order(&mechanic), audit::SYSTEM_ACTOR)?;
            if let Some(seeded) = store.order_mut(order.id) {
                seeded.notes = Some(seed::NOTES.to_string());
            }
        }

        info!("🧪 Repositorio en memoria sembrado ({} OTs)", store.orders.len());
        Ok(repository)
    }

    fn allocate_number(&self) -> i64 {
        self.sequence.fetch_add(1, Ordering::SeqCst) + 1
    }
}

#[async_trait::async_trait]
impl WorkOrderRepository for FakeRepository {
    async fn list_orders(&self) -> AppResult<Vec<WorkOrder>> {
        Ok(self.store.read().await.orders.clone())
    }

    async fn find_user_by_email(&self, email: &str) -> AppResult<Option<User>> {
        let email = email.trim().to_lowercase();
        let store = self.store.read().await;
        Ok(store.users.iter().find(|user| user.email.to_lowercase() == email).cloned())
    }

    async fn authenticate(&self, email: &str, password: &str) -> AppResult<Option<User>> {
        let user = self.find_user_by_email(email).await?;
        Ok(user.filter(|user| user.verify_password(password)))
    }

    async fn create_user(&self, name: &str, email: &str, password: &str, role: Role) -> AppResult<User> {
        let user = User::with_password(name, email.trim(), password, role, bcrypt::DEFAULT_COST)?;
        let mut store = self.store.write().await;
        let lowered = user.email.to_lowercase();
        if store.users.iter().any(|existing| existing.email.to_lowercase() == lowered) {
            return Err(conflict_error("Usuario", "email", &user.email));
        }
        store.users.push(user.clone());
        info!("👤 Usuario creado: {} ({})", user.email, user.role);
        Ok(user)
    }

    async fn find_by_number(&self, number: i64) -> AppResult<Option<WorkOrder>> {
        let store = self.store.read().await;
        Ok(store.orders.iter().find(|order| order.number == number).cloned())
    }

    async fn find_by_plate(&self, plate: &str) -> AppResult<Vec<WorkOrder>> {
        let plate = normalize_plate(plate);
        Ok(self.store.read().await.orders_for_plates(&[plate]))
    }

    async fn find_by_rut(&self, rut: &str) -> AppResult<Vec<WorkOrder>> {
        let rut = normalize_rut(rut);
        let store = self.store.read().await;
        let plates: Vec<String> = store
            .vehicles
            .values()
            .filter(|vehicle| vehicle.client_rut.as_deref() == Some(rut.as_str()))
            .map(|vehicle| vehicle.plate.clone())
            .collect();
        Ok(store.orders_for_plates(&plates))
    }

    async fn find_by_state(&self, state: WorkOrderState) -> AppResult<Vec<WorkOrder>> {
        let store = self.store.read().await;
        Ok(store.orders.iter().filter(|order| order.state == state).cloned().collect())
    }

    async fn approve_budget(&self, order_id: Uuid, actor: &str) -> AppResult<()> {
        let mut store = self.store.write().await;
        if store.order(order_id).is_none() {
            debug!("⚠️ Aprobación ignorada, OT inexistente: {}", order_id);
            return Ok(());
        }
        store.budget_mut(order_id).approved = true;
        store.log(order_id, actor, audit::APPROVE_BUDGET);
        Ok(())
    }

    async fn change_state(&self, order_id: Uuid, target: WorkOrderState, actor: &str) -> AppResult<bool> {
        let mut store = self.store.write().await;
        let approved = store.budgets.get(&order_id).map(|b| b.approved).unwrap_or(false);
        let Some(order) = store.order_mut(order_id) else {
            return Ok(false);
        };
        if !WorkOrderState::can_transition(order.state, target, approved) {
            warn!("🚫 Transición rechazada OT #{}: {} -> {}", order.number, order.state, target);
            return Ok(false);
        }
        order.state = target;
        store.log(order_id, actor, audit::change_state(target));
        Ok(true)
    }

    async fn list_mechanics(&self) -> AppResult<Vec<User>> {
        let store = self.store.read().await;
        Ok(store.users.iter().filter(|user| user.role == Role::Mechanic).cloned().collect())
    }

    async fn next_number(&self) -> AppResult<i64> {
        Ok(self.sequence.load(Ordering::SeqCst) + 1)
    }

    async fn create_order(&self, new_order: NewWorkOrder, actor: &str) -> AppResult<WorkOrder> {
        Budget::ensure_amounts(&new_order.budget_items, DEFAULT_TAX_PERCENT)?;
        let mut store = self.store.write().await;
        let number = self.allocate_number();
        let order = store.insert_order(number, new_order, actor)?;
        info!("📝 OT #{} creada para {}", order.number, order.plate);
        Ok(order)
    }

    async fn delete_order(&self, order_id: Uuid, actor: &str) -> AppResult<bool> {
        let mut store = self.store.write().await;
        match store.order(order_id) {
            Some(order) if order.state == WorkOrderState::Draft => {}
            _ => return Ok(false),
        }
        store.orders.retain(|order| order.id != order_id);
        store.budgets.remove(&order_id);
        store.tasks.remove(&order_id);
        store.symptoms.remove(&order_id);
        store.evidence.remove(&order_id);
        store.log(order_id, actor, audit::DELETE_ORDER);
        info!("🗑️ OT {} eliminada por {}", order_id, actor);
        Ok(true)
    }

    async fn order_detail(&self, order_id: Uuid) -> AppResult<Option<WorkOrderDetail>> {
        let store = self.store.read().await;
        let Some(order) = store.order(order_id).cloned() else {
            return Ok(None);
        };
        let vehicle = store.vehicles.get(&order.plate).cloned();
        let client = vehicle
            .as_ref()
            .and_then(|vehicle| vehicle.client_rut.as_ref())
            .and_then(|rut| store.clients.get(rut))
            .cloned();
        let mechanics = order
            .mechanic_ids
            .iter()
            .filter_map(|id| store.users.iter().find(|user| user.id == *id).cloned())
            .collect();

        Ok(Some(WorkOrderDetail {
            budget: store.budgets.get(&order_id).cloned().unwrap_or_else(|| Budget::new(order_id)),
            tasks: store.tasks.get(&order_id).cloned().unwrap_or_default(),
            symptoms: store.symptoms.get(&order_id).cloned().unwrap_or_default(),
            evidence: store.evidence.get(&order_id).cloned().unwrap_or_default(),
            order,
            client,
            vehicle,
            mechanics,
        }))
    }

    async fn find_client(&self, rut: &str) -> AppResult<Option<Client>> {
        let rut = normalize_rut(rut);
        Ok(self.store.read().await.clients.get(&rut).cloned())
    }

    async fn save_client(&self, client: Client) -> AppResult<Client> {
        Ok(self.store.write().await.upsert_client(client))
    }

    async fn vehicles_by_client(&self, rut: &str) -> AppResult<Vec<Vehicle>> {
        let rut = normalize_rut(rut);
        let store = self.store.read().await;
        Ok(store
            .vehicles
            .values()
            .filter(|vehicle| vehicle.client_rut.as_deref() == Some(rut.as_str()))
            .cloned()
            .collect())
    }

    async fn find_vehicle(&self, plate: &str) -> AppResult<Option<Vehicle>> {
        let plate = normalize_plate(plate);
        Ok(self.store.read().await.vehicles.get(&plate).cloned())
    }

    async fn save_vehicle(&self, vehicle: Vehicle) -> AppResult<Vehicle> {
        self.store.write().await.upsert_vehicle(vehicle)
    }

    async fn detach_vehicle(&self, plate: &str) -> AppResult<bool> {
        let plate = normalize_plate(plate);
        let mut store = self.store.write().await;
        match store.vehicles.get_mut(&plate) {
            Some(vehicle) => {
                vehicle.client_rut = None;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn reassign_vehicle(&self, plate: &str, rut: &str) -> AppResult<Option<Vehicle>> {
        let plate = normalize_plate(plate);
        let rut = normalize_rut(rut);
        let mut store = self.store.write().await;
        if !store.clients.contains_key(&rut) {
            return Ok(None);
        }
        Ok(store.vehicles.get_mut(&plate).map(|vehicle| {
            vehicle.client_rut = Some(rut);
            vehicle.clone()
        }))
    }

    async fn update_notes(&self, order_id: Uuid, notes: Option<String>, actor: &str) -> AppResult<bool> {
        let mut store = self.store.write().await;
        let Some(order) = store.order_mut(order_id) else {
            return Ok(false);
        };
        order.notes = notes;
        store.log(order_id, actor, audit::UPDATE_NOTES);
        Ok(true)
    }

    async fn update_mechanics(&self, order_id: Uuid, mechanic_ids: Vec<Uuid>, actor: &str) -> AppResult<bool> {
        let mut store = self.store.write().await;
        let Some(order) = store.order_mut(order_id) else {
            return Ok(false);
        };
        order.mechanic_ids = distinct_ids(&mechanic_ids);
        store.log(order_id, actor, audit::UPDATE_MECHANICS);
        Ok(true)
    }

    async fn update_order_vehicle(&self, order_id: Uuid, plate: &str, actor: &str) -> AppResult<bool> {
        let plate = normalize_plate(plate);
        let mut store = self.store.write().await;
        if !store.vehicles.contains_key(&plate) {
            return Ok(false);
        }
        let Some(order) = store.order_mut(order_id) else {
            return Ok(false);
        };
        if order.state.locks_vehicle() {
            return Ok(false);
        }
        order.plate = plate;
        store.log(order_id, actor, audit::UPDATE_VEHICLE);
        Ok(true)
    }

    async fn budget(&self, order_id: Uuid) -> AppResult<Option<Budget>> {
        let store = self.store.read().await;
        if store.order(order_id).is_none() {
            return Ok(None);
        }
        Ok(Some(store.budgets.get(&order_id).cloned().unwrap_or_else(|| Budget::new(order_id))))
    }

    async fn add_budget_item(&self, order_id: Uuid, item: BudgetItem, actor: &str) -> AppResult<bool> {
        let mut store = self.store.write().await;
        if store.order(order_id).is_none() {
            return Ok(false);
        }
        let current = store.budgets.get(&order_id).cloned().unwrap_or_else(|| Budget::new(order_id));
        let mut items = current.items;
        items.push(item.clone());
        Budget::ensure_amounts(&items, current.tax_percent)?;

        let action = audit::add_item(item.kind, &item.description);
        let budget = store.budget_mut(order_id);
        let was_approved = budget.approved;
        budget.approved = false;
        budget.items.push(item);

        store.log(order_id, actor, action);
        if was_approved {
            store.log(order_id, actor, audit::REVOKE_APPROVAL);
        }
        Ok(true)
    }

    async fn save_budget(
        &self,
        order_id: Uuid,
        items: Vec<BudgetItem>,
        approved: bool,
        tax_percent: i64,
        actor: &str,
    ) -> AppResult<bool> {
        let mut store = self.store.write().await;
        if store.order(order_id).is_none() {
            return Ok(false);
        }
        Budget::ensure_amounts(&items, tax_percent)?;
        let budget = store.budget_mut(order_id);
        budget.items = items;
        budget.approved = approved;
        budget.tax_percent = tax_percent;
        store.log(order_id, actor, audit::UPDATE_BUDGET);
        Ok(true)
    }

    async fn tasks(&self, order_id: Uuid) -> AppResult<Vec<Task>> {
        Ok(self.store.read().await.tasks.get(&order_id).cloned().unwrap_or_default())
    }

    async fn save_tasks(&self, order_id: Uuid, tasks: Vec<Task>, actor: &str) -> AppResult<bool> {
        let mut store = self.store.write().await;
        if store.order(order_id).is_none() {
            return Ok(false);
        }
        store.tasks.insert(order_id, tasks);
        store.log(order_id, actor, audit::UPDATE_TASKS);
        Ok(true)
    }

    async fn add_evidence(
        &self,
        order_id: Uuid,
        stage: EvidenceStage,
        local_uri: &str,
        actor: &str,
    ) -> AppResult<Option<Evidence>> {
        let mut store = self.store.write().await;
        if store.order(order_id).is_none() {
            return Ok(None);
        }
        let evidence = Evidence::new(order_id, stage, local_uri);
        store.evidence.entry(order_id).or_default().push(evidence.clone());
        store.log(order_id, actor, audit::add_evidence(stage));
        Ok(Some(evidence))
    }

    async fn audit_log(&self, order_id: Uuid) -> AppResult<Vec<AuditEntry>> {
        let store = self.store.read().await;
        Ok(store.audit.iter().filter(|entry| entry.order_id == order_id).cloned().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ItemKind;
    use crate::utils::errors::AppError;

    const ACTOR: &str = "admin@gesticar.cl";

    fn new_order(rut: &str, plate: &str) -> NewWorkOrder {
        NewWorkOrder::new(
            Client::new(rut, "Cliente de prueba"),
            Vehicle::new(plate, rut, "Kia", "Rio", 2017),
        )
    }

    #[tokio::test]
    async fn test_seeded_store() {
        let repository = FakeRepository::seeded().unwrap();
        let orders = repository.list_orders().await.unwrap();
        assert_eq!(orders.len(), 1);
        assert_eq!(orders[0].number, 1001);
        assert_eq!(orders[0].plate, "ABCD12");
        assert_eq!(repository.list_mechanics().await.unwrap().len(), 2);

        let detail = repository.order_detail(orders[0].id).await.unwrap().unwrap();
        assert_eq!(detail.budget.subtotal(), 47000);
        assert_eq!(detail.client.unwrap().name, "Juan Pérez");
        assert_eq!(detail.mechanics[0].email, "mecanico@gesticar.cl");
    }

    #[tokio::test]
    async fn test_create_order_normalizes_and_numbers() {
        let repository = FakeRepository::new();
        let expected = repository.next_number().await.unwrap();
        let order = repository
            .create_order(new_order("12.345.678-5", "ijkl56"), ACTOR)
            .await
            .unwrap();

        assert_eq!(order.number, expected);
        assert_eq!(order.number, repository.next_number().await.unwrap() - 1);
        assert_eq!(order.plate, "IJKL56");
        assert_eq!(order.state, WorkOrderState::Draft);
        assert!(repository.find_client("12345678-5").await.unwrap().is_some());
        assert_eq!(repository.find_by_rut("123456785").await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_create_with_approved_budget_logs_in_order() {
        let repository = FakeRepository::new();
        let mut input = new_order("20123456-5", "EFGH34");
        input.budget_approved = true;
        let order = repository.create_order(input, ACTOR).await.unwrap();

        let actions: Vec<String> = repository
            .audit_log(order.id)
            .await
            .unwrap()
            .into_iter()
            .map(|entry| entry.action)
            .collect();
        assert_eq!(actions, vec!["CREAR_OT", "PRESUPUESTO_APROBADO"]);
        assert!(repository.change_state(order.id, WorkOrderState::InExecution, ACTOR).await.unwrap());
    }

    #[tokio::test]
    async fn test_state_guards() {
        let repository = FakeRepository::new();
        let order = repository.create_order(new_order("20123456-5", "EFGH34"), ACTOR).await.unwrap();

        assert!(!repository.change_state(order.id, WorkOrderState::InExecution, ACTOR).await.unwrap());
        assert!(!repository.change_state(order.id, WorkOrderState::Finished, ACTOR).await.unwrap());
        assert!(!repository.change_state(Uuid::new_v4(), WorkOrderState::Quote, ACTOR).await.unwrap());

        repository.approve_budget(order.id, ACTOR).await.unwrap();
        repository.approve_budget(order.id, ACTOR).await.unwrap();
        assert!(repository.change_state(order.id, WorkOrderState::InExecution, ACTOR).await.unwrap());
        assert!(repository.change_state(order.id, WorkOrderState::Finished, ACTOR).await.unwrap());

        let last = repository.audit_log(order.id).await.unwrap().pop().unwrap();
        assert_eq!(last.action, "CHANGE_STATE:FINISHED");
    }

    #[tokio::test]
    async fn test_delete_only_drafts_and_keeps_numbering() {
        let repository = FakeRepository::new();
        let first = repository.create_order(new_order("20123456-5", "EFGH34"), ACTOR).await.unwrap();
        assert!(repository.delete_order(first.id, ACTOR).await.unwrap());
        assert!(repository.order_detail(first.id).await.unwrap().is_none());
        let actions: Vec<String> = repository
            .audit_log(first.id)
            .await
            .unwrap()
            .into_iter()
            .map(|entry| entry.action)
            .collect();
        assert_eq!(actions, vec!["CREAR_OT", "ELIMINAR_OT"]);

        let second = repository.create_order(new_order("20123456-5", "EFGH34"), ACTOR).await.unwrap();
        assert_eq!(second.number, first.number + 1);

        repository.change_state(second.id, WorkOrderState::Diagnosis, ACTOR).await.unwrap();
        assert!(!repository.delete_order(second.id, ACTOR).await.unwrap());
    }

    #[tokio::test]
    async fn test_add_item_revokes_approval() {
        let repository = FakeRepository::new();
        let order = repository.create_order(new_order("20123456-5", "EFGH34"), ACTOR).await.unwrap();
        repository.approve_budget(order.id, ACTOR).await.unwrap();

        let item = BudgetItem::new(ItemKind::Part, "Pastillas", 2, 12000);
        assert!(repository.add_budget_item(order.id, item, ACTOR).await.unwrap());

        let budget = repository.budget(order.id).await.unwrap().unwrap();
        assert!(!budget.approved);
        assert_eq!(budget.subtotal_parts(), 24000);
        let actions: Vec<String> = repository
            .audit_log(order.id)
            .await
            .unwrap()
            .into_iter()
            .map(|entry| entry.action)
            .collect();
        assert!(actions.ends_with(&["ADD_ITEM:REP/Pastillas".to_string(), "REVOKE_APPROVAL".to_string()]));
    }

    #[tokio::test]
    async fn test_overflowing_amounts_are_rejected() {
        let repository = FakeRepository::new();
        let order = repository.create_order(new_order("20123456-5", "EFGH34"), ACTOR).await.unwrap();
        let huge = BudgetItem::new(ItemKind::Part, "Motor", 1_000_000_000_000, 1_000_000_000);

        let result = repository.add_budget_item(order.id, huge.clone(), ACTOR).await;
        assert!(matches!(result, Err(AppError::Validation(_))));
        let result = repository.save_budget(order.id, vec![huge.clone()], false, 19, ACTOR).await;
        assert!(matches!(result, Err(AppError::Validation(_))));

        let budget = repository.budget(order.id).await.unwrap().unwrap();
        assert!(budget.items.is_empty());
        assert_eq!(repository.audit_log(order.id).await.unwrap().len(), 1);

        let next = repository.next_number().await.unwrap();
        let mut input = new_order("20123456-5", "EFGH34");
        input.budget_items.push(huge);
        assert!(repository.create_order(input, ACTOR).await.is_err());
        assert_eq!(repository.next_number().await.unwrap(), next);
    }

    #[tokio::test]
    async fn test_create_order_with_unchecked_rut() {
        let repository = FakeRepository::new();
        let order = repository
            .create_order(new_order("12.345.678-9", "ij1234"), ACTOR)
            .await
            .unwrap();

        assert_eq!(order.plate, "IJ1234");
        let vehicle = repository.find_vehicle("IJ1234").await.unwrap().unwrap();
        assert_eq!(vehicle.client_rut.as_deref(), Some("12345678-9"));
        let found = repository.find_by_plate("IJ1234").await.unwrap();
        assert_eq!(found.iter().map(|o| o.id).collect::<Vec<_>>(), vec![order.id]);
    }

    #[tokio::test]
    async fn test_plate_search_ignores_case() {
        let repository = FakeRepository::new();
        repository.create_order(new_order("12.345.678-9", "ij1234"), ACTOR).await.unwrap();
        repository.create_order(new_order("12.345.678-9", "IJ1234"), ACTOR).await.unwrap();

        let lower = repository.find_by_plate("ij1234").await.unwrap();
        let upper = repository.find_by_plate("IJ1234").await.unwrap();
        assert_eq!(lower.len(), 2);
        assert_eq!(lower, upper);
    }

    #[tokio::test]
    async fn test_update_order_vehicle_rules() {
        let repository = FakeRepository::seeded().unwrap();
        let order = repository.find_by_number(1001).await.unwrap().unwrap();

        assert!(!repository.update_order_vehicle(order.id, "ZZZZ99", ACTOR).await.unwrap());
        assert!(repository.update_order_vehicle(order.id, "efgh34", ACTOR).await.unwrap());
        assert_eq!(repository.find_by_plate("EFGH34").await.unwrap().len(), 1);

        repository.change_state(order.id, WorkOrderState::Cancelled, ACTOR).await.unwrap();
        assert!(!repository.update_order_vehicle(order.id, "ABCD12", ACTOR).await.unwrap());
    }

    #[tokio::test]
    async fn test_detach_and_reassign_vehicle() {
        let repository = FakeRepository::seeded().unwrap();
        assert!(repository.detach_vehicle("abcd12").await.unwrap());
        assert!(repository.vehicles_by_client("12345678-5").await.unwrap().is_empty());

        let moved = repository.reassign_vehicle("ABCD12", "20.123.456-5").await.unwrap().unwrap();
        assert_eq!(moved.client_rut.as_deref(), Some("20123456-5"));
        assert_eq!(repository.vehicles_by_client("20123456-5").await.unwrap().len(), 2);
        assert!(repository.reassign_vehicle("NOPE11", "20123456-5").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_authentication_and_users() {
        let repository = FakeRepository::seeded().unwrap();
        assert!(repository.authenticate("ADMIN@gesticar.cl", "admin").await.unwrap().is_some());
        assert!(repository.authenticate("admin@gesticar.cl", "otra").await.unwrap().is_none());

        let duplicated = repository
            .create_user("Otro", "Ana@Gesticar.cl", "clave", Role::Mechanic)
            .await;
        assert!(duplicated.is_err());
    }
}
