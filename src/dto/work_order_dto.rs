use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use super::{
    auth_dto::UserDto,
    catalog_dto::{ClientDto, VehicleDto},
};
use crate::{
    models::{
        AuditEntry, Budget, BudgetItem, Evidence, EvidenceStage, ItemKind, NewWorkOrder,
        SearchFilters, Symptom, Task, TaskStatus, WorkOrder, WorkOrderDetail, WorkOrderState,
    },
    utils::errors::AppResult,
};

// OT resumida
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct WorkOrderDto {
    pub id: Uuid,
    pub numero: i64,
    pub vehiculo_patente: String,
    pub estado: WorkOrderState,
    #[serde(default)]
    pub mecanicos_asignados: Vec<Uuid>,
    #[serde(default)]
    pub notas: Option<String>,
    pub fecha_creacion: DateTime<Utc>,
}

impl From<WorkOrder> for WorkOrderDto {
    fn from(order: WorkOrder) -> Self {
        Self {
            id: order.id,
            numero: order.number,
            vehiculo_patente: order.plate,
            estado: order.state,
            mecanicos_asignados: order.mechanic_ids,
            notas: order.notes,
            fecha_creacion: order.created_at,
        }
    }
}

impl From<WorkOrderDto> for WorkOrder {
    fn from(dto: WorkOrderDto) -> Self {
        Self {
            id: dto.id,
            number: dto.numero,
            plate: dto.vehiculo_patente,
            state: dto.estado,
            mechanic_ids: dto.mecanicos_asignados,
            notes: dto.notas,
            created_at: dto.fecha_creacion,
        }
    }
}

// Ítem de presupuesto
#[derive(Debug, Clone, Serialize, Deserialize, Validate, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct BudgetItemDto {
    #[serde(default = "Uuid::new_v4")]
    pub id: Uuid,
    pub tipo: ItemKind,
    #[validate(length(min = 1, max = 200))]
    pub descripcion: String,
    #[validate(range(min = 1, max = 100000))]
    pub cantidad: i64,
    #[validate(range(min = 0, max = 1000000000))]
    pub precio_unit: i64,
}

impl From<BudgetItem> for BudgetItemDto {
    fn from(item: BudgetItem) -> Self {
        Self {
            id: item.id,
            tipo: item.kind,
            descripcion: item.description,
            cantidad: item.quantity,
            precio_unit: item.unit_price,
        }
    }
}

impl From<BudgetItemDto> for BudgetItem {
    fn from(dto: BudgetItemDto) -> Self {
        Self {
            id: dto.id,
            kind: dto.tipo,
            description: dto.descripcion,
            quantity: dto.cantidad,
            unit_price: dto.precio_unit,
        }
    }
}

fn default_tax_percent() -> i64 {
    crate::models::budget::DEFAULT_TAX_PERCENT
}

// Presupuesto. Los montos derivados solo se informan, nunca se leen.
#[derive(Debug, Clone, Serialize, Deserialize, Validate, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct BudgetDto {
    #[serde(default)]
    pub ot_id: Option<Uuid>,
    #[serde(default)]
    #[validate]
    pub items: Vec<BudgetItemDto>,
    #[serde(default)]
    pub aprobado: bool,
    #[serde(default = "default_tax_percent")]
    #[validate(range(min = 0, max = 100))]
    pub iva_porc: i64,
    #[serde(default)]
    pub subtotal_repuestos: i64,
    #[serde(default)]
    pub subtotal_mano_obra: i64,
    #[serde(default)]
    pub subtotal: i64,
    #[serde(default)]
    pub iva: i64,
    #[serde(default)]
    pub total: i64,
}

impl From<Budget> for BudgetDto {
    fn from(budget: Budget) -> Self {
        Self {
            ot_id: Some(budget.order_id),
            subtotal_repuestos: budget.subtotal_parts(),
            subtotal_mano_obra: budget.subtotal_labor(),
            subtotal: budget.subtotal(),
            iva: budget.tax(),
            total: budget.total(),
            aprobado: budget.approved,
            iva_porc: budget.tax_percent,
            items: budget.items.into_iter().map(BudgetItemDto::from).collect(),
        }
    }
}

impl BudgetDto {
    pub fn into_budget(self, order_id: Uuid) -> Budget {
        Budget {
            order_id: self.ot_id.unwrap_or(order_id),
            items: self.items.into_iter().map(BudgetItem::from).collect(),
            approved: self.aprobado,
            tax_percent: self.iva_porc,
        }
    }
}

fn default_task_status() -> TaskStatus {
    TaskStatus::Created
}

// Tarea
#[derive(Debug, Clone, Serialize, Deserialize, Validate, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct TaskDto {
    #[serde(default = "Uuid::new_v4")]
    pub id: Uuid,
    #[validate(length(min = 1, max = 200))]
    pub titulo: String,
    #[serde(default)]
    pub detalle: Option<String>,
    #[serde(default = "Utc::now")]
    pub creada_en: DateTime<Utc>,
    #[serde(default)]
    pub fecha_inicio: Option<DateTime<Utc>>,
    #[serde(default)]
    pub fecha_termino: Option<DateTime<Utc>>,
    #[serde(default = "default_task_status")]
    pub estado: TaskStatus,
}

impl From<Task> for TaskDto {
    fn from(task: Task) -> Self {
        Self {
            id: task.id,
            titulo: task.title,
            detalle: task.detail,
            creada_en: task.created_at,
            fecha_inicio: task.started_at,
            fecha_termino: task.finished_at,
            estado: task.status,
        }
    }
}

impl From<TaskDto> for Task {
    fn from(dto: TaskDto) -> Self {
        Self {
            id: dto.id,
            title: dto.titulo,
            detail: dto.detalle,
            created_at: dto.creada_en,
            started_at: dto.fecha_inicio,
            finished_at: dto.fecha_termino,
            status: dto.estado,
        }
    }
}

// Síntoma
#[derive(Debug, Clone, Serialize, Deserialize, Validate, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SymptomDto {
    #[serde(default = "Uuid::new_v4")]
    pub id: Uuid,
    #[validate(length(min = 1))]
    pub descripcion: String,
    #[serde(default)]
    pub etapa: Option<String>,
    #[serde(default)]
    pub fotos: Vec<String>,
}

impl From<Symptom> for SymptomDto {
    fn from(symptom: Symptom) -> Self {
        Self {
            id: symptom.id,
            descripcion: symptom.description,
            etapa: symptom.stage,
            fotos: symptom.photos,
        }
    }
}

impl From<SymptomDto> for Symptom {
    fn from(dto: SymptomDto) -> Self {
        Self {
            id: dto.id,
            description: dto.descripcion,
            stage: dto.etapa,
            photos: dto.fotos,
        }
    }
}

// Evidencia
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct EvidenceDto {
    pub id: Uuid,
    pub ot_id: Uuid,
    pub etapa: EvidenceStage,
    pub uri_local: String,
    pub registrado_en: DateTime<Utc>,
}

impl From<Evidence> for EvidenceDto {
    fn from(evidence: Evidence) -> Self {
        Self {
            id: evidence.id,
            ot_id: evidence.order_id,
            etapa: evidence.stage,
            uri_local: evidence.local_uri,
            registrado_en: evidence.timestamp,
        }
    }
}

impl From<EvidenceDto> for Evidence {
    fn from(dto: EvidenceDto) -> Self {
        Self {
            id: dto.id,
            order_id: dto.ot_id,
            stage: dto.etapa,
            local_uri: dto.uri_local,
            timestamp: dto.registrado_en,
        }
    }
}

// Entrada de auditoría
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct AuditLogDto {
    pub id: Uuid,
    pub ot_id: Uuid,
    pub usuario_email: String,
    pub accion: String,
    pub registrado_en: DateTime<Utc>,
}

impl From<AuditEntry> for AuditLogDto {
    fn from(entry: AuditEntry) -> Self {
        Self {
            id: entry.id,
            ot_id: entry.order_id,
            usuario_email: entry.user_email,
            accion: entry.action,
            registrado_en: entry.timestamp,
        }
    }
}

impl From<AuditLogDto> for AuditEntry {
    fn from(dto: AuditLogDto) -> Self {
        Self {
            id: dto.id,
            order_id: dto.ot_id,
            user_email: dto.usuario_email,
            action: dto.accion,
            timestamp: dto.registrado_en,
        }
    }
}

// Request para crear una OT
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct NewWorkOrderRequest {
    #[validate]
    pub cliente: ClientDto,
    #[validate]
    pub vehiculo: VehicleDto,
    #[serde(default)]
    pub mecanicos: Vec<Uuid>,
    #[serde(default)]
    #[validate]
    pub items: Vec<BudgetItemDto>,
    #[serde(default)]
    pub presupuesto_aprobado: bool,
    #[serde(default)]
    #[validate]
    pub sintomas: Vec<SymptomDto>,
    #[serde(default)]
    #[validate]
    pub tareas: Vec<TaskDto>,
}

impl From<NewWorkOrder> for NewWorkOrderRequest {
    fn from(order: NewWorkOrder) -> Self {
        Self {
            cliente: order.client.into(),
            vehiculo: order.vehicle.into(),
            mecanicos: order.mechanic_ids,
            items: order.budget_items.into_iter().map(BudgetItemDto::from).collect(),
            presupuesto_aprobado: order.budget_approved,
            sintomas: order.symptoms.into_iter().map(SymptomDto::from).collect(),
            tareas: order.tasks.into_iter().map(TaskDto::from).collect(),
        }
    }
}

impl From<NewWorkOrderRequest> for NewWorkOrder {
    fn from(request: NewWorkOrderRequest) -> Self {
        Self {
            client: request.cliente.into(),
            vehicle: request.vehiculo.into(),
            mechanic_ids: request.mecanicos,
            budget_items: request.items.into_iter().map(BudgetItem::from).collect(),
            budget_approved: request.presupuesto_aprobado,
            symptoms: request.sintomas.into_iter().map(Symptom::from).collect(),
            tasks: request.tareas.into_iter().map(Task::from).collect(),
        }
    }
}

// Detalle completo de una OT
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkOrderDetailDto {
    pub ot: WorkOrderDto,
    pub cliente: Option<ClientDto>,
    pub vehiculo: Option<VehicleDto>,
    pub mecanicos: Vec<UserDto>,
    pub presupuesto: BudgetDto,
    pub tareas: Vec<TaskDto>,
    pub sintomas: Vec<SymptomDto>,
    pub evidencias: Vec<EvidenceDto>,
}

impl From<WorkOrderDetail> for WorkOrderDetailDto {
    fn from(detail: WorkOrderDetail) -> Self {
        Self {
            ot: detail.order.into(),
            cliente: detail.client.map(ClientDto::from),
            vehiculo: detail.vehicle.map(VehicleDto::from),
            mecanicos: detail.mechanics.into_iter().map(UserDto::from).collect(),
            presupuesto: detail.budget.into(),
            tareas: detail.tasks.into_iter().map(TaskDto::from).collect(),
            sintomas: detail.symptoms.into_iter().map(SymptomDto::from).collect(),
            evidencias: detail.evidence.into_iter().map(EvidenceDto::from).collect(),
        }
    }
}

impl From<WorkOrderDetailDto> for WorkOrderDetail {
    fn from(dto: WorkOrderDetailDto) -> Self {
        let order: WorkOrder = dto.ot.into();
        Self {
            budget: dto.presupuesto.into_budget(order.id),
            client: dto.cliente.map(Into::into),
            vehicle: dto.vehiculo.map(Into::into),
            mechanics: dto.mecanicos.into_iter().map(Into::into).collect(),
            tasks: dto.tareas.into_iter().map(Into::into).collect(),
            symptoms: dto.sintomas.into_iter().map(Into::into).collect(),
            evidence: dto.evidencias.into_iter().map(Into::into).collect(),
            order,
        }
    }
}

// PATCH ots/{id}/estado
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChangeStateRequest {
    pub estado: WorkOrderState,
}

// PUT ots/{id}/notas
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotesRequest {
    #[serde(default)]
    pub notas: Option<String>,
}

// PUT ots/{id}/mecanicos
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MechanicsRequest {
    pub mecanicos: Vec<Uuid>,
}

// PUT ots/{id}/vehiculo
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderVehicleRequest {
    pub patente: String,
}

// POST ots/{id}/evidencias
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct EvidenceRequest {
    pub etapa: EvidenceStage,
    #[validate(length(min = 1))]
    pub uri_local: String,
}

// Respuesta de las operaciones que pueden ser rechazadas
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct OkResponse {
    pub ok: bool,
}

// GET ots/siguiente-numero
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct NextNumberResponse {
    pub numero: i64,
}

// Query de GET ots
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SearchQuery {
    pub numero: Option<i64>,
    pub patente: Option<String>,
    pub rut: Option<String>,
    pub estado: Option<String>,
}

impl SearchQuery {
    pub fn into_filters(self) -> AppResult<SearchFilters> {
        Ok(SearchFilters {
            number: self.numero,
            plate: self.patente.filter(|plate| !plate.trim().is_empty()),
            rut: self.rut.filter(|rut| !rut.trim().is_empty()),
            state: self.estado.map(|state| state.parse()).transpose()?,
        })
    }
}

impl From<&SearchFilters> for SearchQuery {
    fn from(filters: &SearchFilters) -> Self {
        Self {
            numero: filters.number,
            patente: filters.plate.clone(),
            rut: filters.rut.clone(),
            estado: filters.state.map(|state| state.as_str().to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Client, Vehicle};

    #[test]
    fn test_work_order_wire_names() {
        let json = serde_json::to_value(WorkOrderDto::from(WorkOrder::new(1001, "ABCD12"))).unwrap();
        assert_eq!(json["numero"], 1001);
        assert_eq!(json["vehiculoPatente"], "ABCD12");
        assert_eq!(json["estado"], "DRAFT");
        assert!(json.get("mecanicosAsignados").is_some());
    }

    #[test]
    fn test_budget_dto_reports_totals() {
        let mut budget = Budget::new(Uuid::new_v4());
        budget.items.push(BudgetItem::new(ItemKind::Labor, "Diagnóstico", 1, 15000));
        budget.items.push(BudgetItem::new(ItemKind::Part, "Bujías", 4, 8000));
        let dto = BudgetDto::from(budget);
        assert_eq!(dto.subtotal_mano_obra, 15000);
        assert_eq!(dto.subtotal_repuestos, 32000);
        assert_eq!(dto.total, 55930);
    }

    #[test]
    fn test_new_order_request_validation() {
        let mut request = NewWorkOrderRequest::from(NewWorkOrder::new(
            Client::new("12345678-5", "Juan"),
            Vehicle::new("ABCD12", "12345678-5", "Toyota", "Yaris", 2018),
        ));
        assert!(request.validate().is_ok());

        request.vehiculo.patente = "A1".to_string();
        assert!(request.validate().is_err());
    }

    #[test]
    fn test_minimal_item_json() {
        let item: BudgetItemDto = serde_json::from_value(serde_json::json!({
            "tipo": "MO",
            "descripcion": "Alineación",
            "cantidad": 1,
            "precioUnit": 20000
        }))
        .unwrap();
        assert_eq!(item.tipo, ItemKind::Labor);
    }

    #[test]
    fn test_item_amount_bounds() {
        let mut item = BudgetItemDto::from(BudgetItem::new(ItemKind::Part, "Motor", 100_000, 1_000_000_000));
        assert!(item.validate().is_ok());

        item.cantidad = 1_000_000_000_000;
        assert!(item.validate().is_err());

        item.cantidad = 1;
        item.precio_unit = 1_000_000_001;
        assert!(item.validate().is_err());
    }

    #[test]
    fn test_search_query_accepts_spanish_state() {
        let query = SearchQuery {
            estado: Some("EN_EJECUCION".to_string()),
            ..Default::default()
        };
        let filters = query.into_filters().unwrap();
        assert_eq!(filters.state, Some(WorkOrderState::InExecution));
    }
}
