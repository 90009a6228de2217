//! Repositorio SQLite
//!
//! Cada mutación lógica corre en una transacción. Los números visibles
//! salen de `ot_secuencia`, que solo avanza, así que borrar una OT nunca
//! libera su número.

use chrono::{DateTime, TimeZone, Utc};
use sqlx::{SqliteConnection, SqlitePool};
use tracing::{debug, info, warn};
use uuid::Uuid;

use super::WorkOrderRepository;
use crate::{
    database::{schema, seed},
    models::{
        audit::{self, AuditEntry},
        budget::DEFAULT_TAX_PERCENT,
        work_order::{distinct_ids, ORDER_NUMBER_SEED},
        Budget, BudgetItem, Client, Evidence, EvidenceStage, NewWorkOrder, Role, Symptom, Task,
        User, Vehicle, WorkOrder, WorkOrderDetail, WorkOrderState,
    },
    utils::{
        errors::{conflict_error, not_found_error, AppError, AppResult},
        rut::normalize_rut,
        validation::normalize_plate,
    },
};

#[derive(Debug, sqlx::FromRow)]
struct UserRow {
    id: String,
    nombre: String,
    email: String,
    password_hash: String,
    rol: String,
}

impl TryFrom<UserRow> for User {
    type Error = AppError;

    fn try_from(row: UserRow) -> AppResult<Self> {
        Ok(User {
            id: parse_uuid(&row.id)?,
            name: row.nombre,
            email: row.email,
            password_hash: row.password_hash,
            role: row.rol.parse()?,
        })
    }
}

#[derive(Debug, sqlx::FromRow)]
struct ClientRow {
    rut: String,
    nombre: String,
    correo: Option<String>,
    comuna: Option<String>,
    direccion: Option<String>,
    telefono: Option<String>,
}

impl From<ClientRow> for Client {
    fn from(row: ClientRow) -> Self {
        Client {
            rut: row.rut,
            name: row.nombre,
            email: row.correo,
            commune: row.comuna,
            address: row.direccion,
            phone: row.telefono,
        }
    }
}

#[derive(Debug, sqlx::FromRow)]
struct VehicleRow {
    patente: String,
    cliente_rut: Option<String>,
    marca: String,
    modelo: String,
    anio: i32,
    color: Option<String>,
    kilometraje: Option<i64>,
    combustible: Option<String>,
}

impl From<VehicleRow> for Vehicle {
    fn from(row: VehicleRow) -> Self {
        Vehicle {
            plate: row.patente,
            client_rut: row.cliente_rut,
            make: row.marca,
            model: row.modelo,
            year: row.anio,
            color: row.color,
            mileage: row.kilometraje,
            fuel: row.combustible,
        }
    }
}

#[derive(Debug, sqlx::FromRow)]
struct OrderRow {
    id: String,
    numero: i64,
    vehiculo_patente: String,
    estado: String,
    notas: Option<String>,
    creada_en: i64,
}

#[derive(Debug, sqlx::FromRow)]
struct ItemRow {
    id: String,
    tipo: String,
    descripcion: String,
    cantidad: i64,
    precio_unit: i64,
}

impl TryFrom<ItemRow> for BudgetItem {
    type Error = AppError;

    fn try_from(row: ItemRow) -> AppResult<Self> {
        Ok(BudgetItem {
            id: parse_uuid(&row.id)?,
            kind: row.tipo.parse()?,
            description: row.descripcion,
            quantity: row.cantidad,
            unit_price: row.precio_unit,
        })
    }
}

#[derive(Debug, sqlx::FromRow)]
struct TaskRow {
    id: String,
    titulo: String,
    detalle: Option<String>,
    creada_en: i64,
    fecha_inicio: Option<i64>,
    fecha_termino: Option<i64>,
    estado: String,
}

impl TryFrom<TaskRow> for Task {
    type Error = AppError;

    fn try_from(row: TaskRow) -> AppResult<Self> {
        Ok(Task {
            id: parse_uuid(&row.id)?,
            title: row.titulo,
            detail: row.detalle,
            created_at: from_millis(row.creada_en),
            started_at: row.fecha_inicio.map(from_millis),
            finished_at: row.fecha_termino.map(from_millis),
            status: row.estado.parse()?,
        })
    }
}

#[derive(Debug, sqlx::FromRow)]
struct SymptomRow {
    id: String,
    descripcion: String,
    etapa: Option<String>,
}

#[derive(Debug, sqlx::FromRow)]
struct EvidenceRow {
    id: String,
    ot_id: String,
    etapa: String,
    uri_local: String,
    registrada_en: i64,
}

impl TryFrom<EvidenceRow> for Evidence {
    type Error = AppError;

    fn try_from(row: EvidenceRow) -> AppResult<Self> {
        Ok(Evidence {
            id: parse_uuid(&row.id)?,
            order_id: parse_uuid(&row.ot_id)?,
            stage: row.etapa.parse()?,
            local_uri: row.uri_local,
            timestamp: from_millis(row.registrada_en),
        })
    }
}

#[derive(Debug, sqlx::FromRow)]
struct AuditRow {
    id: String,
    ot_id: String,
    usuario_email: String,
    accion: String,
    registrado_en: i64,
}

impl TryFrom<AuditRow> for AuditEntry {
    type Error = AppError;

    fn try_from(row: AuditRow) -> AppResult<Self> {
        Ok(AuditEntry {
            id: parse_uuid(&row.id)?,
            order_id: parse_uuid(&row.ot_id)?,
            user_email: row.usuario_email,
            action: row.accion,
            timestamp: from_millis(row.registrado_en),
        })
    }
}

fn parse_uuid(value: &str) -> AppResult<Uuid> {
    Uuid::parse_str(value).map_err(|e| AppError::Internal(format!("UUID corrupto en la base: {}", e)))
}

fn from_millis(millis: i64) -> DateTime<Utc> {
    Utc.timestamp_millis_opt(millis).single().unwrap_or_default()
}

const ORDER_COLUMNS: &str = "id, numero, vehiculo_patente, estado, notas, creada_en";
const VEHICLE_COLUMNS: &str =
    "patente, cliente_rut, marca, modelo, anio, color, kilometraje, combustible";

async fn upsert_client(conn: &mut SqliteConnection, client: &Client) -> AppResult<()> {
    sqlx::query(
        r#"
        INSERT INTO clientes (rut, nombre, correo, comuna, direccion, telefono)
        VALUES (?, ?, ?, ?, ?, ?)
        ON CONFLICT(rut) DO UPDATE SET
            nombre = excluded.nombre,
            correo = excluded.correo,
            comuna = excluded.comuna,
            direccion = excluded.direccion,
            telefono = excluded.telefono
        "#,
    )
    .bind(&client.rut)
    .bind(&client.name)
    .bind(&client.email)
    .bind(&client.commune)
    .bind(&client.address)
    .bind(&client.phone)
    .execute(&mut *conn)
    .await?;
    Ok(())
}

async fn upsert_vehicle(conn: &mut SqliteConnection, vehicle: &Vehicle) -> AppResult<()> {
    if let Some(rut) = &vehicle.client_rut {
        let exists: (bool,) = sqlx::query_as("SELECT EXISTS(SELECT 1 FROM clientes WHERE rut = ?)")
            .bind(rut)
            .fetch_one(&mut *conn)
            .await?;
        if !exists.0 {
            return Err(not_found_error("Cliente", rut));
        }
    }

    sqlx::query(
        r#"
        INSERT INTO vehiculos (patente, cliente_rut, marca, modelo, anio, color, kilometraje, combustible)
        VALUES (?, ?, ?, ?, ?, ?, ?, ?)
        ON CONFLICT(patente) DO UPDATE SET
            cliente_rut = excluded.cliente_rut,
            marca = excluded.marca,
            modelo = excluded.modelo,
            anio = excluded.anio,
            color = excluded.color,
            kilometraje = excluded.kilometraje,
            combustible = excluded.combustible
        "#,
    )
    .bind(&vehicle.plate)
    .bind(&vehicle.client_rut)
    .bind(&vehicle.make)
    .bind(&vehicle.model)
    .bind(vehicle.year)
    .bind(&vehicle.color)
    .bind(vehicle.mileage)
    .bind(&vehicle.fuel)
    .execute(&mut *conn)
    .await?;
    Ok(())
}

async fn allocate_number(conn: &mut SqliteConnection) -> AppResult<i64> {
    sqlx::query("UPDATE ot_secuencia SET ultimo = ultimo + 1 WHERE id = 1")
        .execute(&mut *conn)
        .await?;
    let (number,): (i64,) = sqlx::query_as("SELECT ultimo FROM ot_secuencia WHERE id = 1")
        .fetch_one(&mut *conn)
        .await?;
    Ok(number)
}

async fn replace_mechanics(conn: &mut SqliteConnection, order_id: Uuid, ids: &[Uuid]) -> AppResult<()> {
    sqlx::query("DELETE FROM ot_mecanicos WHERE ot_id = ?")
        .bind(order_id.to_string())
        .execute(&mut *conn)
        .await?;
    for (position, id) in ids.iter().enumerate() {
        sqlx::query("INSERT INTO ot_mecanicos (ot_id, mecanico_id, posicion) VALUES (?, ?, ?)")
            .bind(order_id.to_string())
            .bind(id.to_string())
            .bind(position as i64)
            .execute(&mut *conn)
            .await?;
    }
    Ok(())
}

async fn replace_items(conn: &mut SqliteConnection, order_id: Uuid, items: &[BudgetItem]) -> AppResult<()> {
    sqlx::query("DELETE FROM presupuesto_items WHERE ot_id = ?")
        .bind(order_id.to_string())
        .execute(&mut *conn)
        .await?;
    for (position, item) in items.iter().enumerate() {
        insert_item(conn, order_id, item, position as i64).await?;
    }
    Ok(())
}

async fn insert_item(conn: &mut SqliteConnection, order_id: Uuid, item: &BudgetItem, position: i64) -> AppResult<()> {
    sqlx::query(
        r#"
        INSERT INTO presupuesto_items (id, ot_id, posicion, tipo, descripcion, cantidad, precio_unit)
        VALUES (?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(item.id.to_string())
    .bind(order_id.to_string())
    .bind(position)
    .bind(item.kind.as_str())
    .bind(&item.description)
    .bind(item.quantity)
    .bind(item.unit_price)
    .execute(&mut *conn)
    .await?;
    Ok(())
}

async fn replace_tasks(conn: &mut SqliteConnection, order_id: Uuid, tasks: &[Task]) -> AppResult<()> {
    sqlx::query("DELETE FROM ot_tareas WHERE ot_id = ?")
        .bind(order_id.to_string())
        .execute(&mut *conn)
        .await?;
    for (position, task) in tasks.iter().enumerate() {
        sqlx::query(
            r#"
            INSERT INTO ot_tareas (id, ot_id, posicion, titulo, detalle, creada_en, fecha_inicio, fecha_termino, estado)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(task.id.to_string())
        .bind(order_id.to_string())
        .bind(position as i64)
        .bind(&task.title)
        .bind(&task.detail)
        .bind(task.created_at.timestamp_millis())
        .bind(task.started_at.map(|at| at.timestamp_millis()))
        .bind(task.finished_at.map(|at| at.timestamp_millis()))
        .bind(task.status.as_str())
        .execute(&mut *conn)
        .await?;
    }
    Ok(())
}

async fn insert_symptoms(conn: &mut SqliteConnection, order_id: Uuid, symptoms: &[Symptom]) -> AppResult<()> {
    for (position, symptom) in symptoms.iter().enumerate() {
        sqlx::query("INSERT INTO ot_sintomas (id, ot_id, posicion, descripcion, etapa) VALUES (?, ?, ?, ?, ?)")
            .bind(symptom.id.to_string())
            .bind(order_id.to_string())
            .bind(position as i64)
            .bind(&symptom.description)
            .bind(&symptom.stage)
            .execute(&mut *conn)
            .await?;
        for (photo_position, uri) in symptom.photos.iter().enumerate() {
            sqlx::query("INSERT INTO ot_sintoma_fotos (sintoma_id, posicion, uri) VALUES (?, ?, ?)")
                .bind(symptom.id.to_string())
                .bind(photo_position as i64)
                .bind(uri)
                .execute(&mut *conn)
                .await?;
        }
    }
    Ok(())
}

async fn append_audit(conn: &mut SqliteConnection, order_id: Uuid, actor: &str, action: &str) -> AppResult<()> {
    let entry = AuditEntry::new(order_id, actor, action);
    sqlx::query("INSERT INTO audit_logs (id, ot_id, usuario_email, accion, registrado_en) VALUES (?, ?, ?, ?, ?)")
        .bind(entry.id.to_string())
        .bind(order_id.to_string())
        .bind(&entry.user_email)
        .bind(&entry.action)
        .bind(entry.timestamp.timestamp_millis())
        .execute(&mut *conn)
        .await?;
    Ok(())
}

async fn load_budget(conn: &mut SqliteConnection, order_id: Uuid) -> AppResult<Budget> {
    let header: Option<(bool, i64)> = sqlx::query_as("SELECT aprobado, iva FROM presupuestos WHERE ot_id = ?")
        .bind(order_id.to_string())
        .fetch_optional(&mut *conn)
        .await?;
    let items = sqlx::query_as::<_, ItemRow>(
        "SELECT id, tipo, descripcion, cantidad, precio_unit FROM presupuesto_items WHERE ot_id = ? ORDER BY posicion",
    )
    .bind(order_id.to_string())
    .fetch_all(&mut *conn)
    .await?;

    let mut budget = Budget::new(order_id);
    if let Some((approved, tax_percent)) = header {
        budget.approved = approved;
        budget.tax_percent = tax_percent;
    }
    budget.items = items.into_iter().map(BudgetItem::try_from).collect::<AppResult<_>>()?;
    Ok(budget)
}

/// Estado actual de la OT y si su presupuesto está aprobado
async fn order_state(conn: &mut SqliteConnection, order_id: Uuid) -> AppResult<Option<(WorkOrderState, bool)>> {
    let row: Option<(String, Option<bool>)> = sqlx::query_as(
        r#"
        SELECT o.estado, p.aprobado
        FROM ots o LEFT JOIN presupuestos p ON p.ot_id = o.id
        WHERE o.id = ?
        "#,
    )
    .bind(order_id.to_string())
    .fetch_optional(&mut *conn)
    .await?;

    match row {
        Some((state, approved)) => Ok(Some((state.parse()?, approved.unwrap_or(false)))),
        None => Ok(None),
    }
}

/// Backend SQLite
pub struct SqliteRepository {
    pool: SqlitePool,
}

impl SqliteRepository {
    /// Crea el esquema si falta, sin sembrar datos
    pub async fn open(pool: SqlitePool) -> AppResult<Self> {
        schema::initialize(&pool).await?;
        sqlx::query("INSERT OR IGNORE INTO ot_secuencia (id, ultimo) VALUES (1, ?)")
            .bind(ORDER_NUMBER_SEED)
            .execute(&pool)
            .await?;
        Ok(Self { pool })
    }

    /// Crea el esquema y siembra los datos iniciales si la base está vacía
    pub async fn initialize(pool: SqlitePool) -> AppResult<Self> {
        let repository = Self::open(pool).await?;
        let (users,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM usuarios")
            .fetch_one(&repository.pool)
            .await?;
        if users == 0 {
            repository.seed().await?;
        }
        Ok(repository)
    }

    async fn seed(&self) -> AppResult<()> {
        let users = seed::users()?;
        let mut tx = self.pool.begin().await?;
        for user in &users {
            insert_user(&mut tx, user).await?;
        }
        for (client, vehicle) in seed::clients() {
            let client = client.normalized();
            upsert_client(&mut tx, &client).await?;
            upsert_vehicle(&mut tx, &vehicle.normalized()).await?;
        }
        tx.commit().await?;

        if let Some(mechanic) = users.iter().find(|user| user.role == Role::Mechanic) {
            self.insert_order(seed::first_order(mechanic), Some(seed::NOTES), audit::SYSTEM_ACTOR)
                .await?;
        }
        info!("🌱 Base SQLite sembrada con {} usuarios", users.len());
        Ok(())
    }

    async fn insert_order(&self, new_order: NewWorkOrder, notes: Option<&str>, actor: &str) -> AppResult<WorkOrder> {
        Budget::ensure_amounts(&new_order.budget_items, DEFAULT_TAX_PERCENT)?;
        let client = new_order.client.clone().normalized();
        let vehicle = new_order.vehicle.clone().owned_by(&client.rut).normalized();

        let mut tx = self.pool.begin().await?;
        upsert_client(&mut tx, &client).await?;
        upsert_vehicle(&mut tx, &vehicle).await?;

        let number = allocate_number(&mut tx).await?;
        let mut order = WorkOrder::new(number, &vehicle.plate);
        order.mechanic_ids = new_order.distinct_mechanics();
        order.notes = notes.map(str::to_string);

        sqlx::query(
            "INSERT INTO ots (id, numero, vehiculo_patente, estado, notas, creada_en) VALUES (?, ?, ?, ?, ?, ?)",
        )
        .bind(order.id.to_string())
        .bind(order.number)
        .bind(&order.plate)
        .bind(order.state.as_str())
        .bind(&order.notes)
        .bind(order.created_at.timestamp_millis())
        .execute(&mut *tx)
        .await?;

        sqlx::query("INSERT INTO presupuestos (ot_id, aprobado, iva) VALUES (?, ?, ?)")
            .bind(order.id.to_string())
            .bind(new_order.budget_approved)
            .bind(DEFAULT_TAX_PERCENT)
            .execute(&mut *tx)
            .await?;

        replace_mechanics(&mut tx, order.id, &order.mechanic_ids).await?;
        replace_items(&mut tx, order.id, &new_order.budget_items).await?;
        replace_tasks(&mut tx, order.id, &new_order.tasks).await?;
        insert_symptoms(&mut tx, order.id, &new_order.symptoms).await?;

        append_audit(&mut tx, order.id, actor, audit::CREATE_ORDER).await?;
        if new_order.budget_approved {
            append_audit(&mut tx, order.id, actor, audit::BUDGET_APPROVED_ON_CREATE).await?;
        }
        tx.commit().await?;

        info!("📝 OT #{} creada para {}", order.number, order.plate);
        Ok(order)
    }

    async fn hydrate(&self, rows: Vec<OrderRow>) -> AppResult<Vec<WorkOrder>> {
        let mut orders = Vec::with_capacity(rows.len());
        for row in rows {
            let mechanics: Vec<(String,)> =
                sqlx::query_as("SELECT mecanico_id FROM ot_mecanicos WHERE ot_id = ? ORDER BY posicion")
                    .bind(&row.id)
                    .fetch_all(&self.pool)
                    .await?;
            orders.push(WorkOrder {
                id: parse_uuid(&row.id)?,
                number: row.numero,
                plate: row.vehiculo_patente,
                state: row.estado.parse()?,
                mechanic_ids: mechanics
                    .iter()
                    .map(|(id,)| parse_uuid(id))
                    .collect::<AppResult<Vec<_>>>()?,
                notes: row.notas,
                created_at: from_millis(row.creada_en),
            });
        }
        Ok(orders)
    }

    async fn fetch_order(&self, order_id: Uuid) -> AppResult<Option<WorkOrder>> {
        let row = sqlx::query_as::<_, OrderRow>(&format!("SELECT {} FROM ots WHERE id = ?", ORDER_COLUMNS))
            .bind(order_id.to_string())
            .fetch_optional(&self.pool)
            .await?;
        Ok(self.hydrate(row.into_iter().collect()).await?.pop())
    }

    async fn fetch_budget(&self, order_id: Uuid) -> AppResult<Budget> {
        let mut conn = self.pool.acquire().await?;
        load_budget(&mut conn, order_id).await
    }

    async fn fetch_symptoms(&self, order_id: Uuid) -> AppResult<Vec<Symptom>> {
        let rows = sqlx::query_as::<_, SymptomRow>(
            "SELECT id, descripcion, etapa FROM ot_sintomas WHERE ot_id = ? ORDER BY posicion",
        )
        .bind(order_id.to_string())
        .fetch_all(&self.pool)
        .await?;

        let mut symptoms = Vec::with_capacity(rows.len());
        for row in rows {
            let photos: Vec<(String,)> =
                sqlx::query_as("SELECT uri FROM ot_sintoma_fotos WHERE sintoma_id = ? ORDER BY posicion")
                    .bind(&row.id)
                    .fetch_all(&self.pool)
                    .await?;
            symptoms.push(Symptom {
                id: parse_uuid(&row.id)?,
                description: row.descripcion,
                stage: row.etapa,
                photos: photos.into_iter().map(|(uri,)| uri).collect(),
            });
        }
        Ok(symptoms)
    }

    async fn fetch_evidence(&self, order_id: Uuid) -> AppResult<Vec<Evidence>> {
        let rows = sqlx::query_as::<_, EvidenceRow>(
            "SELECT id, ot_id, etapa, uri_local, registrada_en FROM evidencias WHERE ot_id = ? ORDER BY registrada_en, rowid",
        )
        .bind(order_id.to_string())
        .fetch_all(&self.pool)
        .await?;
        rows.into_iter().map(Evidence::try_from).collect()
    }

    async fn find_user_by_id(&self, id: Uuid) -> AppResult<Option<User>> {
        let row = sqlx::query_as::<_, UserRow>("SELECT id, nombre, email, password_hash, rol FROM usuarios WHERE id = ?")
            .bind(id.to_string())
            .fetch_optional(&self.pool)
            .await?;
        row.map(User::try_from).transpose()
    }

    /// Ejecuta `apply` dentro de una transacción si la OT existe, y registra `action`
    async fn mutate_order<F>(&self, order_id: Uuid, actor: &str, action: &str, apply: F) -> AppResult<bool>
    where
        F: for<'c> FnOnce(
                &'c mut SqliteConnection,
            ) -> futures::future::BoxFuture<'c, AppResult<()>>
            + Send,
    {
        let mut tx = self.pool.begin().await?;
        if order_state(&mut tx, order_id).await?.is_none() {
            return Ok(false);
        }
        apply(&mut *tx).await?;
        append_audit(&mut tx, order_id, actor, action).await?;
        tx.commit().await?;
        Ok(true)
    }
}

async fn insert_user(conn: &mut SqliteConnection, user: &User) -> AppResult<()> {
    sqlx::query("INSERT INTO usuarios (id, nombre, email, password_hash, rol) VALUES (?, ?, ?, ?, ?)")
        .bind(user.id.to_string())
        .bind(&user.name)
        .bind(&user.email)
        .bind(&user.password_hash)
        .bind(user.role.as_str())
        .execute(&mut *conn)
        .await?;
    Ok(())
}

#[async_trait::async_trait]
impl WorkOrderRepository for SqliteRepository {
    async fn list_orders(&self) -> AppResult<Vec<WorkOrder>> {
        let rows = sqlx::query_as::<_, OrderRow>(&format!("SELECT {} FROM ots ORDER BY numero", ORDER_COLUMNS))
            .fetch_all(&self.pool)
            .await?;
        self.hydrate(rows).await
    }

    async fn find_user_by_email(&self, email: &str) -> AppResult<Option<User>> {
        let row = sqlx::query_as::<_, UserRow>(
            "SELECT id, nombre, email, password_hash, rol FROM usuarios WHERE email = ? COLLATE NOCASE",
        )
        .bind(email.trim())
        .fetch_optional(&self.pool)
        .await?;
        row.map(User::try_from).transpose()
    }

    async fn authenticate(&self, email: &str, password: &str) -> AppResult<Option<User>> {
        let user = self.find_user_by_email(email).await?;
        Ok(user.filter(|user| user.verify_password(password)))
    }

    async fn create_user(&self, name: &str, email: &str, password: &str, role: Role) -> AppResult<User> {
        if self.find_user_by_email(email).await?.is_some() {
            return Err(conflict_error("Usuario", "email", email.trim()));
        }
        let user = User::with_password(name, email.trim(), password, role, bcrypt::DEFAULT_COST)?;
        let mut conn = self.pool.acquire().await?;
        insert_user(&mut conn, &user).await?;
        info!("👤 Usuario creado: {} ({})", user.email, user.role);
        Ok(user)
    }

    async fn find_by_number(&self, number: i64) -> AppResult<Option<WorkOrder>> {
        let row = sqlx::query_as::<_, OrderRow>(&format!("SELECT {} FROM ots WHERE numero = ?", ORDER_COLUMNS))
            .bind(number)
            .fetch_optional(&self.pool)
            .await?;
        Ok(self.hydrate(row.into_iter().collect()).await?.pop())
    }

    async fn find_by_plate(&self, plate: &str) -> AppResult<Vec<WorkOrder>> {
        let rows = sqlx::query_as::<_, OrderRow>(&format!(
            "SELECT {} FROM ots WHERE vehiculo_patente = ? ORDER BY numero",
            ORDER_COLUMNS
        ))
        .bind(normalize_plate(plate))
        .fetch_all(&self.pool)
        .await?;
        self.hydrate(rows).await
    }

    async fn find_by_rut(&self, rut: &str) -> AppResult<Vec<WorkOrder>> {
        let rows = sqlx::query_as::<_, OrderRow>(
            r#"
            SELECT o.id, o.numero, o.vehiculo_patente, o.estado, o.notas, o.creada_en
            FROM ots o JOIN vehiculos v ON v.patente = o.vehiculo_patente
            WHERE v.cliente_rut = ?
            ORDER BY o.numero
            "#,
        )
        .bind(normalize_rut(rut))
        .fetch_all(&self.pool)
        .await?;
        self.hydrate(rows).await
    }

    async fn find_by_state(&self, state: WorkOrderState) -> AppResult<Vec<WorkOrder>> {
        let rows = sqlx::query_as::<_, OrderRow>(&format!(
            "SELECT {} FROM ots WHERE estado = ? ORDER BY numero",
            ORDER_COLUMNS
        ))
        .bind(state.as_str())
        .fetch_all(&self.pool)
        .await?;
        self.hydrate(rows).await
    }

    async fn approve_budget(&self, order_id: Uuid, actor: &str) -> AppResult<()> {
        let id = order_id.to_string();
        let applied = self
            .mutate_order(order_id, actor, audit::APPROVE_BUDGET, move |conn| {
                Box::pin(async move {
                    sqlx::query("UPDATE presupuestos SET aprobado = 1 WHERE ot_id = ?")
                        .bind(id)
                        .execute(&mut *conn)
                        .await?;
                    Ok(())
                })
            })
            .await?;
        if !applied {
            debug!("⚠️ Aprobación ignorada, OT inexistente: {}", order_id);
        }
        Ok(())
    }

    async fn change_state(&self, order_id: Uuid, target: WorkOrderState, actor: &str) -> AppResult<bool> {
        let mut tx = self.pool.begin().await?;
        let Some((current, approved)) = order_state(&mut tx, order_id).await? else {
            return Ok(false);
        };
        if !WorkOrderState::can_transition(current, target, approved) {
            warn!("🚫 Transición rechazada OT {}: {} -> {}", order_id, current, target);
            return Ok(false);
        }
        sqlx::query("UPDATE ots SET estado = ? WHERE id = ?")
            .bind(target.as_str())
            .bind(order_id.to_string())
            .execute(&mut *tx)
            .await?;
        append_audit(&mut tx, order_id, actor, &audit::change_state(target)).await?;
        tx.commit().await?;
        Ok(true)
    }

    async fn list_mechanics(&self) -> AppResult<Vec<User>> {
        let rows = sqlx::query_as::<_, UserRow>(
            "SELECT id, nombre, email, password_hash, rol FROM usuarios WHERE rol = ? ORDER BY nombre",
        )
        .bind(Role::Mechanic.as_str())
        .fetch_all(&self.pool)
        .await?;
        rows.into_iter().map(User::try_from).collect()
    }

    async fn next_number(&self) -> AppResult<i64> {
        let (last,): (i64,) = sqlx::query_as("SELECT ultimo FROM ot_secuencia WHERE id = 1")
            .fetch_one(&self.pool)
            .await?;
        Ok(last + 1)
    }

    async fn create_order(&self, new_order: NewWorkOrder, actor: &str) -> AppResult<WorkOrder> {
        self.insert_order(new_order, None, actor).await
    }

    async fn delete_order(&self, order_id: Uuid, actor: &str) -> AppResult<bool> {
        let mut tx = self.pool.begin().await?;
        match order_state(&mut tx, order_id).await? {
            Some((WorkOrderState::Draft, _)) => {}
            _ => return Ok(false),
        }
        sqlx::query("DELETE FROM ots WHERE id = ?")
            .bind(order_id.to_string())
            .execute(&mut *tx)
            .await?;
        append_audit(&mut tx, order_id, actor, audit::DELETE_ORDER).await?;
        tx.commit().await?;
        info!("🗑️ OT {} eliminada por {}", order_id, actor);
        Ok(true)
    }

    async fn order_detail(&self, order_id: Uuid) -> AppResult<Option<WorkOrderDetail>> {
        let Some(order) = self.fetch_order(order_id).await? else {
            return Ok(None);
        };
        let vehicle = self.find_vehicle(&order.plate).await?;
        let client = match vehicle.as_ref().and_then(|vehicle| vehicle.client_rut.as_deref()) {
            Some(rut) => self.find_client(rut).await?,
            None => None,
        };
        let mut mechanics = Vec::with_capacity(order.mechanic_ids.len());
        for id in &order.mechanic_ids {
            if let Some(user) = self.find_user_by_id(*id).await? {
                mechanics.push(user);
            }
        }

        Ok(Some(WorkOrderDetail {
            budget: self.fetch_budget(order_id).await?,
            tasks: self.tasks(order_id).await?,
            symptoms: self.fetch_symptoms(order_id).await?,
            evidence: self.fetch_evidence(order_id).await?,
            order,
            client,
            vehicle,
            mechanics,
        }))
    }

    async fn find_client(&self, rut: &str) -> AppResult<Option<Client>> {
        let row = sqlx::query_as::<_, ClientRow>(
            "SELECT rut, nombre, correo, comuna, direccion, telefono FROM clientes WHERE rut = ?",
        )
        .bind(normalize_rut(rut))
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(Client::from))
    }

    async fn save_client(&self, client: Client) -> AppResult<Client> {
        let client = client.normalized();
        let mut conn = self.pool.acquire().await?;
        upsert_client(&mut conn, &client).await?;
        Ok(client)
    }

    async fn vehicles_by_client(&self, rut: &str) -> AppResult<Vec<Vehicle>> {
        let rows = sqlx::query_as::<_, VehicleRow>(&format!(
            "SELECT {} FROM vehiculos WHERE cliente_rut = ? ORDER BY patente",
            VEHICLE_COLUMNS
        ))
        .bind(normalize_rut(rut))
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().map(Vehicle::from).collect())
    }

    async fn find_vehicle(&self, plate: &str) -> AppResult<Option<Vehicle>> {
        let row = sqlx::query_as::<_, VehicleRow>(&format!(
            "SELECT {} FROM vehiculos WHERE patente = ?",
            VEHICLE_COLUMNS
        ))
        .bind(normalize_plate(plate))
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(Vehicle::from))
    }

    async fn save_vehicle(&self, vehicle: Vehicle) -> AppResult<Vehicle> {
        let vehicle = vehicle.normalized();
        let mut conn = self.pool.acquire().await?;
        upsert_vehicle(&mut conn, &vehicle).await?;
        Ok(vehicle)
    }

    async fn detach_vehicle(&self, plate: &str) -> AppResult<bool> {
        let result = sqlx::query("UPDATE vehiculos SET cliente_rut = NULL WHERE patente = ?")
            .bind(normalize_plate(plate))
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn reassign_vehicle(&self, plate: &str, rut: &str) -> AppResult<Option<Vehicle>> {
        let rut = normalize_rut(rut);
        if self.find_client(&rut).await?.is_none() {
            return Ok(None);
        }
        let result = sqlx::query("UPDATE vehiculos SET cliente_rut = ? WHERE patente = ?")
            .bind(&rut)
            .bind(normalize_plate(plate))
            .execute(&self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Ok(None);
        }
        self.find_vehicle(plate).await
    }

    async fn update_notes(&self, order_id: Uuid, notes: Option<String>, actor: &str) -> AppResult<bool> {
        let id = order_id.to_string();
        self.mutate_order(order_id, actor, audit::UPDATE_NOTES, move |conn| {
            Box::pin(async move {
                sqlx::query("UPDATE ots SET notas = ? WHERE id = ?")
                    .bind(notes)
                    .bind(id)
                    .execute(&mut *conn)
                    .await?;
                Ok(())
            })
        })
        .await
    }

    async fn update_mechanics(&self, order_id: Uuid, mechanic_ids: Vec<Uuid>, actor: &str) -> AppResult<bool> {
        let ids = distinct_ids(&mechanic_ids);
        self.mutate_order(order_id, actor, audit::UPDATE_MECHANICS, move |conn| {
            Box::pin(async move { replace_mechanics(conn, order_id, &ids).await })
        })
        .await
    }

    async fn update_order_vehicle(&self, order_id: Uuid, plate: &str, actor: &str) -> AppResult<bool> {
        let plate = normalize_plate(plate);
        let mut tx = self.pool.begin().await?;
        let Some((state, _)) = order_state(&mut tx, order_id).await? else {
            return Ok(false);
        };
        if state.locks_vehicle() {
            return Ok(false);
        }
        let (known,): (bool,) = sqlx::query_as("SELECT EXISTS(SELECT 1 FROM vehiculos WHERE patente = ?)")
            .bind(&plate)
            .fetch_one(&mut *tx)
            .await?;
        if !known {
            return Ok(false);
        }
        sqlx::query("UPDATE ots SET vehiculo_patente = ? WHERE id = ?")
            .bind(&plate)
            .bind(order_id.to_string())
            .execute(&mut *tx)
            .await?;
        append_audit(&mut tx, order_id, actor, audit::UPDATE_VEHICLE).await?;
        tx.commit().await?;
        Ok(true)
    }

    async fn budget(&self, order_id: Uuid) -> AppResult<Option<Budget>> {
        if self.fetch_order(order_id).await?.is_none() {
            return Ok(None);
        }
        Ok(Some(self.fetch_budget(order_id).await?))
    }

    async fn add_budget_item(&self, order_id: Uuid, item: BudgetItem, actor: &str) -> AppResult<bool> {
        let mut tx = self.pool.begin().await?;
        let Some((_, was_approved)) = order_state(&mut tx, order_id).await? else {
            return Ok(false);
        };
        let mut current = load_budget(&mut tx, order_id).await?;
        current.items.push(item.clone());
        Budget::ensure_amounts(&current.items, current.tax_percent)?;

        let (next_position,): (i64,) =
            sqlx::query_as("SELECT COALESCE(MAX(posicion) + 1, 0) FROM presupuesto_items WHERE ot_id = ?")
                .bind(order_id.to_string())
                .fetch_one(&mut *tx)
                .await?;
        insert_item(&mut tx, order_id, &item, next_position).await?;
        append_audit(&mut tx, order_id, actor, &audit::add_item(item.kind, &item.description)).await?;
        if was_approved {
            sqlx::query("UPDATE presupuestos SET aprobado = 0 WHERE ot_id = ?")
                .bind(order_id.to_string())
                .execute(&mut *tx)
                .await?;
            append_audit(&mut tx, order_id, actor, audit::REVOKE_APPROVAL).await?;
        }
        tx.commit().await?;
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
        self.mutate_order(order_id, actor, audit::UPDATE_BUDGET, move |conn| {
            Box::pin(async move {
                Budget::ensure_amounts(&items, tax_percent)?;
                sqlx::query(
                    r#"
                    INSERT INTO presupuestos (ot_id, aprobado, iva) VALUES (?, ?, ?)
                    ON CONFLICT(ot_id) DO UPDATE SET aprobado = excluded.aprobado, iva = excluded.iva
                    "#,
                )
                .bind(order_id.to_string())
                .bind(approved)
                .bind(tax_percent)
                .execute(&mut *conn)
                .await?;
                replace_items(conn, order_id, &items).await
            })
        })
        .await
    }

    async fn tasks(&self, order_id: Uuid) -> AppResult<Vec<Task>> {
        let rows = sqlx::query_as::<_, TaskRow>(
            r#"
            SELECT id, titulo, detalle, creada_en, fecha_inicio, fecha_termino, estado
            FROM ot_tareas WHERE ot_id = ? ORDER BY posicion
            "#,
        )
        .bind(order_id.to_string())
        .fetch_all(&self.pool)
        .await?;
        rows.into_iter().map(Task::try_from).collect()
    }

    async fn save_tasks(&self, order_id: Uuid, tasks: Vec<Task>, actor: &str) -> AppResult<bool> {
        self.mutate_order(order_id, actor, audit::UPDATE_TASKS, move |conn| {
            Box::pin(async move { replace_tasks(conn, order_id, &tasks).await })
        })
        .await
    }

    async fn add_evidence(
        &self,
        order_id: Uuid,
        stage: EvidenceStage,
        local_uri: &str,
        actor: &str,
    ) -> AppResult<Option<Evidence>> {
        let evidence = Evidence::new(order_id, stage, local_uri);
        let row = evidence.clone();
        let applied = self
            .mutate_order(order_id, actor, &audit::add_evidence(stage), move |conn| {
                Box::pin(async move {
                    sqlx::query(
                        "INSERT INTO evidencias (id, ot_id, etapa, uri_local, registrada_en) VALUES (?, ?, ?, ?, ?)",
                    )
                    .bind(row.id.to_string())
                    .bind(row.order_id.to_string())
                    .bind(row.stage.as_str())
                    .bind(row.local_uri)
                    .bind(row.timestamp.timestamp_millis())
                    .execute(&mut *conn)
                    .await?;
                    Ok(())
                })
            })
            .await?;
        Ok(applied.then_some(evidence))
    }

    async fn audit_log(&self, order_id: Uuid) -> AppResult<Vec<AuditEntry>> {
        let rows = sqlx::query_as::<_, AuditRow>(
            "SELECT id, ot_id, usuario_email, accion, registrado_en FROM audit_logs WHERE ot_id = ? ORDER BY seq",
        )
        .bind(order_id.to_string())
        .fetch_all(&self.pool)
        .await?;
        rows.into_iter().map(AuditEntry::try_from).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::database::DatabaseConfig;
    use crate::models::ItemKind;

    const ACTOR: &str = "admin@gesticar.cl";

    async fn seeded() -> SqliteRepository {
        let pool = DatabaseConfig::create_test_pool().await.unwrap();
        SqliteRepository::initialize(pool).await.unwrap()
    }

    fn new_order(rut: &str, plate: &str) -> NewWorkOrder {
        NewWorkOrder::new(
            Client::new(rut, "Cliente de prueba"),
            Vehicle::new(plate, rut, "Kia", "Rio", 2017),
        )
    }

    #[tokio::test]
    async fn test_seed_is_loaded_once() {
        let repository = seeded().await;
        let orders = repository.list_orders().await.unwrap();
        assert_eq!(orders.len(), 1);
        assert_eq!(orders[0].number, 1001);
        assert_eq!(orders[0].notes.as_deref(), Some("Ruidos en tren delantero"));

        let again = SqliteRepository::initialize(repository.pool.clone()).await.unwrap();
        assert_eq!(again.list_orders().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_detail_roundtrip() {
        let repository = seeded().await;
        let order = repository.find_by_number(1001).await.unwrap().unwrap();
        let detail = repository.order_detail(order.id).await.unwrap().unwrap();

        assert_eq!(detail.vehicle.unwrap().make, "Toyota");
        assert_eq!(detail.client.unwrap().rut, "12345678-5");
        assert_eq!(detail.mechanics.len(), 1);
        assert_eq!(detail.budget.items.len(), 2);
        assert_eq!(detail.budget.total(), 55930);
        assert_eq!(detail.symptoms[0].description, "Ruidos en tren delantero");
    }

    #[tokio::test]
    async fn test_numbers_are_never_reused() {
        let repository = seeded().await;
        let draft = repository.create_order(new_order("20123456-5", "EFGH34"), ACTOR).await.unwrap();
        assert_eq!(draft.number, 1002);
        assert_eq!(repository.next_number().await.unwrap(), 1003);

        assert!(repository.delete_order(draft.id, ACTOR).await.unwrap());
        assert!(repository.order_detail(draft.id).await.unwrap().is_none());
        let actions: Vec<String> = repository
            .audit_log(draft.id)
            .await
            .unwrap()
            .into_iter()
            .map(|entry| entry.action)
            .collect();
        assert_eq!(actions, vec!["CREAR_OT", "ELIMINAR_OT"]);
        assert_eq!(repository.next_number().await.unwrap(), 1003);
    }

    #[tokio::test]
    async fn test_state_machine_and_audit() {
        let repository = seeded().await;
        let order = repository.find_by_number(1001).await.unwrap().unwrap();

        assert!(!repository.change_state(order.id, WorkOrderState::InExecution, ACTOR).await.unwrap());
        repository.approve_budget(order.id, ACTOR).await.unwrap();
        assert!(repository.change_state(order.id, WorkOrderState::InExecution, ACTOR).await.unwrap());
        assert!(!repository.delete_order(order.id, ACTOR).await.unwrap());
        assert!(repository.change_state(order.id, WorkOrderState::Finished, ACTOR).await.unwrap());

        let actions: Vec<String> = repository
            .audit_log(order.id)
            .await
            .unwrap()
            .into_iter()
            .map(|entry| entry.action)
            .collect();
        assert_eq!(
            actions,
            vec!["CREAR_OT", "APPROVE_BUDGET", "CHANGE_STATE:IN_EXECUTION", "CHANGE_STATE:FINISHED"]
        );
    }

    #[tokio::test]
    async fn test_budget_edits() {
        let repository = seeded().await;
        let order = repository.find_by_number(1001).await.unwrap().unwrap();
        repository.approve_budget(order.id, ACTOR).await.unwrap();

        let item = BudgetItem::new(ItemKind::Labor, "Alineación", 1, 20000);
        assert!(repository.add_budget_item(order.id, item, ACTOR).await.unwrap());
        let budget = repository.budget(order.id).await.unwrap().unwrap();
        assert!(!budget.approved);
        assert_eq!(budget.items.last().unwrap().description, "Alineación");

        let items = vec![BudgetItem::new(ItemKind::Part, "Filtro", 1, 9900)];
        assert!(repository.save_budget(order.id, items, true, 19, ACTOR).await.unwrap());
        let budget = repository.budget(order.id).await.unwrap().unwrap();
        assert!(budget.approved);
        assert_eq!(budget.subtotal(), 9900);
        assert_eq!(budget.tax(), 1881);
    }

    #[tokio::test]
    async fn test_overflowing_amounts_roll_back() {
        let repository = seeded().await;
        let order = repository.find_by_number(1001).await.unwrap().unwrap();
        let huge = BudgetItem::new(ItemKind::Part, "Motor", 1_000_000_000_000, 1_000_000_000);

        let result = repository.add_budget_item(order.id, huge.clone(), ACTOR).await;
        assert!(matches!(result, Err(AppError::Validation(_))));
        let result = repository.save_budget(order.id, vec![huge.clone()], false, 19, ACTOR).await;
        assert!(matches!(result, Err(AppError::Validation(_))));

        let budget = repository.budget(order.id).await.unwrap().unwrap();
        assert_eq!(budget.items.len(), 2);
        assert_eq!(budget.total(), 55930);
        assert_eq!(repository.audit_log(order.id).await.unwrap().len(), 1);

        let mut input = new_order("20123456-5", "EFGH34");
        input.budget_items.push(huge);
        assert!(repository.create_order(input, ACTOR).await.is_err());
        assert_eq!(repository.next_number().await.unwrap(), 1002);
    }

    #[tokio::test]
    async fn test_create_order_with_unchecked_rut() {
        let repository = seeded().await;
        let order = repository
            .create_order(new_order("12.345.678-9", "ij1234"), ACTOR)
            .await
            .unwrap();

        assert_eq!(order.plate, "IJ1234");
        assert_eq!(order.number, 1002);
        let client = repository.find_client("12345678-9").await.unwrap().unwrap();
        assert_eq!(client.rut, "12345678-9");
        let found = repository.find_by_plate("IJ1234").await.unwrap();
        assert_eq!(found.iter().map(|o| o.id).collect::<Vec<_>>(), vec![order.id]);
    }

    #[tokio::test]
    async fn test_plate_search_ignores_case() {
        let repository = seeded().await;
        repository.create_order(new_order("12.345.678-9", "ij1234"), ACTOR).await.unwrap();
        repository.create_order(new_order("12.345.678-9", "IJ1234"), ACTOR).await.unwrap();

        let lower = repository.find_by_plate("ij1234").await.unwrap();
        let upper = repository.find_by_plate("IJ1234").await.unwrap();
        assert_eq!(lower.len(), 2);
        assert_eq!(lower, upper);
        assert_eq!(repository.find_by_plate("abcd12").await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_tasks_mechanics_and_evidence() {
        let repository = seeded().await;
        let order = repository.find_by_number(1001).await.unwrap().unwrap();
        let ana = repository.find_user_by_email("ana@gesticar.cl").await.unwrap().unwrap();

        assert!(repository
            .update_mechanics(order.id, vec![ana.id, ana.id], ACTOR)
            .await
            .unwrap());
        let order = repository.find_by_number(1001).await.unwrap().unwrap();
        assert_eq!(order.mechanic_ids, vec![ana.id]);

        assert!(repository
            .save_tasks(order.id, vec![Task::new("Revisar rótulas")], ACTOR)
            .await
            .unwrap());
        assert_eq!(repository.tasks(order.id).await.unwrap()[0].title, "Revisar rótulas");

        let evidence = repository
            .add_evidence(order.id, EvidenceStage::Intake, "file:///fotos/1.jpg", ACTOR)
            .await
            .unwrap();
        assert!(evidence.is_some());
        assert!(repository
            .add_evidence(Uuid::new_v4(), EvidenceStage::Intake, "x", ACTOR)
            .await
            .unwrap()
            .is_none());
    }

    #[tokio::test]
    async fn test_vehicle_ownership() {
        let repository = seeded().await;
        assert!(repository.detach_vehicle("ABCD12").await.unwrap());
        assert!(repository.find_by_rut("12345678-5").await.unwrap().is_empty());

        let moved = repository.reassign_vehicle("abcd12", "20123456-5").await.unwrap();
        assert_eq!(moved.unwrap().client_rut.as_deref(), Some("20123456-5"));
        assert_eq!(repository.find_by_rut("20.123.456-5").await.unwrap().len(), 1);

        let orphan = Vehicle::new("ZZZZ99", "11111111-1", "Fiat", "Uno", 1999);
        assert!(repository.save_vehicle(orphan).await.is_err());
    }
}
