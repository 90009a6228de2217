//! Controlador de estado de vista
//!
//! Mantiene el `UiState` observable que la interfaz renderiza. Cada
//! intención del usuario pasa por aquí, llega al repositorio y vuelve como
//! estado nuevo. Los errores nunca se propagan: terminan en `message`.

use log::{error, info, warn};
use std::sync::Arc;
use tokio::sync::watch;
use uuid::Uuid;

use crate::{
    models::{audit, NewWorkOrder, SearchFilters, User, WorkOrder, WorkOrderDetail, WorkOrderState},
    repositories::WorkOrderRepository,
    services::{auth_service::INVALID_CREDENTIALS, visible_orders},
    utils::errors::AppError,
};

pub const LOGIN_REQUIRED: &str = "Debes iniciar sesión para buscar órdenes.";
pub const NO_RESULTS: &str = "Sin resultados";
pub const BUDGET_APPROVED: &str = "Presupuesto aprobado";
pub const STATE_UPDATED: &str = "Estado actualizado";
pub const INVALID_TRANSITION: &str = "Transición inválida";

/// Estado observable por la interfaz
#[derive(Debug, Clone, Default)]
pub struct UiState {
    pub user: Option<User>,
    pub orders: Vec<WorkOrder>,
    pub selection: Option<WorkOrderDetail>,
    pub search_results: Vec<WorkOrder>,
    pub message: Option<String>,
}

pub struct WorkOrderController {
    repository: Arc<dyn WorkOrderRepository>,
    state: watch::Sender<UiState>,
}

impl WorkOrderController {
    pub fn new(repository: Arc<dyn WorkOrderRepository>) -> Self {
        let (state, _) = watch::channel(UiState::default());
        Self { repository, state }
    }

    pub fn subscribe(&self) -> watch::Receiver<UiState> {
        self.state.subscribe()
    }

    /// Copia del estado actual
    pub fn snapshot(&self) -> UiState {
        self.state.borrow().clone()
    }

    fn current_user(&self) -> Option<User> {
        self.state.borrow().user.clone()
    }

    fn actor(&self) -> String {
        self.current_user()
            .map(|user| user.email)
            .unwrap_or_else(|| audit::SYSTEM_ACTOR.to_string())
    }

    fn set_message(&self, message: impl Into<String>) {
        let message = message.into();
        self.state.send_modify(|state| state.message = Some(message));
    }

    fn report(&self, e: AppError) {
        error!("❌ {}", e);
        self.set_message(e.to_string());
    }

    pub async fn login(&self, email: &str, password: &str) {
        match self.repository.authenticate(email, password).await {
            Ok(Some(user)) => {
                info!("🔐 Sesión iniciada: {}", user.email);
                self.state.send_modify(|state| {
                    state.user = Some(user);
                    state.message = None;
                });
                self.refresh_orders().await;
            }
            Ok(None) => {
                warn!("🔒 Credenciales inválidas para {}", email);
                self.state.send_modify(|state| {
                    state.user = None;
                    state.message = Some(INVALID_CREDENTIALS.to_string());
                });
            }
            Err(e) => self.report(e),
        }
    }

    pub async fn logout(&self) {
        if let Err(e) = self.repository.logout().await {
            warn!("⚠️ Error cerrando sesión: {}", e);
        }
        self.state.send_replace(UiState::default());
    }

    /// Recarga la lista de OTs visibles para el usuario
    pub async fn refresh_orders(&self) {
        let Some(user) = self.current_user() else {
            return;
        };
        if let Err(e) = self.repository.refresh().await {
            warn!("⚠️ Error refrescando el repositorio: {}", e);
        }
        self.reload_orders(&user).await;
    }

    async fn reload_orders(&self, user: &User) {
        match self.repository.list_orders().await {
            Ok(orders) => {
                let orders = visible_orders(orders, user);
                self.state.send_modify(|state| state.orders = orders);
            }
            Err(e) => self.report(e),
        }
    }

    pub async fn search_by_number(&self, number: i64) {
        self.search(SearchFilters {
            number: Some(number),
            ..Default::default()
        })
        .await
    }

    pub async fn search_by_plate(&self, plate: &str) {
        self.search(SearchFilters {
            plate: Some(plate.to_string()),
            ..Default::default()
        })
        .await
    }

    pub async fn search_by_rut(&self, rut: &str) {
        self.search(SearchFilters {
            rut: Some(rut.to_string()),
            ..Default::default()
        })
        .await
    }

    pub async fn search_by_state(&self, state: WorkOrderState) {
        self.search(SearchFilters {
            state: Some(state),
            ..Default::default()
        })
        .await
    }

    pub async fn search(&self, filters: SearchFilters) {
        let Some(user) = self.current_user() else {
            self.state.send_modify(|state| {
                state.search_results.clear();
                state.message = Some(LOGIN_REQUIRED.to_string());
            });
            return;
        };

        match self.repository.search(&filters).await {
            Ok(found) => {
                let found = visible_orders(found, &user);
                let message = found.is_empty().then(|| NO_RESULTS.to_string());
                self.state.send_modify(|state| {
                    state.search_results = found;
                    state.message = message;
                });
            }
            Err(e) => self.report(e),
        }
    }

    /// Carga el detalle de una OT en `selection`
    pub async fn select_order(&self, order_id: Uuid) {
        match self.repository.order_detail(order_id).await {
            Ok(detail) => {
                let message = detail.is_none().then(|| NO_RESULTS.to_string());
                self.state.send_modify(|state| {
                    state.selection = detail;
                    state.message = message;
                });
            }
            Err(e) => self.report(e),
        }
    }

    pub async fn approve_budget(&self, order_id: Uuid) {
        match self.repository.order_detail(order_id).await {
            Ok(Some(_)) => {}
            Ok(None) => return self.set_message(NO_RESULTS),
            Err(e) => return self.report(e),
        }
        match self.repository.approve_budget(order_id, &self.actor()).await {
            Ok(()) => {
                self.set_message(BUDGET_APPROVED);
                self.resync(order_id).await;
            }
            Err(e) => self.report(e),
        }
    }

    pub async fn change_state(&self, order_id: Uuid, target: WorkOrderState) {
        match self.repository.change_state(order_id, target, &self.actor()).await {
            Ok(true) => {
                info!("🔄 OT {} pasa a {}", order_id, target);
                self.set_message(STATE_UPDATED);
                self.resync(order_id).await;
            }
            Ok(false) => self.set_message(INVALID_TRANSITION),
            Err(e) => self.report(e),
        }
    }

    pub async fn create_order(&self, new_order: NewWorkOrder) -> Option<WorkOrder> {
        match self.repository.create_order(new_order, &self.actor()).await {
            Ok(order) => {
                info!("🆕 OT #{} creada", order.number);
                self.set_message(format!("OT #{} creada", order.number));
                self.resync(order.id).await;
                Some(order)
            }
            Err(e) => {
                self.report(e);
                None
            }
        }
    }

    /// Relee la OT tocada y recarga la lista después de una mutación
    async fn resync(&self, order_id: Uuid) {
        let fresh = match self.repository.order_detail(order_id).await {
            Ok(detail) => detail,
            Err(e) => return self.report(e),
        };

        self.state.send_modify(|state| {
            match &fresh {
                Some(detail) => {
                    for order in state.search_results.iter_mut().filter(|order| order.id == order_id) {
                        *order = detail.order.clone();
                    }
                }
                None => state.search_results.retain(|order| order.id != order_id),
            }
            if state.selection.as_ref().is_some_and(|selected| selected.order.id == order_id) {
                state.selection = fresh.clone();
            }
        });

        if let Some(user) = self.current_user() {
            self.reload_orders(&user).await;
        }
    }
}
