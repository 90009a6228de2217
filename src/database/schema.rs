//! Esquema SQLite
//!
//! Una tabla por entidad. Lo que pertenece a la OT se borra en cascada;
//! la bitácora no tiene FK y sobrevive al borrado.

use sqlx::SqlitePool;
use tracing::debug;

use crate::utils::errors::AppResult;

const STATEMENTS: &[&str] = &[
    "CREATE TABLE IF NOT EXISTS usuarios (
        id TEXT PRIMARY KEY,
        nombre TEXT NOT NULL,
        email TEXT NOT NULL UNIQUE COLLATE NOCASE,
        password_hash TEXT NOT NULL,
        rol TEXT NOT NULL
    )",
    "CREATE TABLE IF NOT EXISTS clientes (
        rut TEXT PRIMARY KEY,
        nombre TEXT NOT NULL,
        correo TEXT,
        comuna TEXT,
        direccion TEXT,
        telefono TEXT
    )",
    "CREATE TABLE IF NOT EXISTS vehiculos (
        patente TEXT PRIMARY KEY,
        cliente_rut TEXT REFERENCES clientes(rut),
        marca TEXT NOT NULL,
        modelo TEXT NOT NULL,
        anio INTEGER NOT NULL,
        color TEXT,
        kilometraje INTEGER,
        combustible TEXT
    )",
    "CREATE INDEX IF NOT EXISTS idx_vehiculos_cliente ON vehiculos(cliente_rut)",
    "CREATE TABLE IF NOT EXISTS ot_secuencia (
        id INTEGER PRIMARY KEY CHECK (id = 1),
        ultimo INTEGER NOT NULL
    )",
    "CREATE TABLE IF NOT EXISTS ots (
        id TEXT PRIMARY KEY,
        numero INTEGER NOT NULL UNIQUE,
        vehiculo_patente TEXT NOT NULL REFERENCES vehiculos(patente),
        estado TEXT NOT NULL,
        notas TEXT,
        creada_en INTEGER NOT NULL
    )",
    "CREATE INDEX IF NOT EXISTS idx_ots_patente ON ots(vehiculo_patente)",
    "CREATE TABLE IF NOT EXISTS ot_mecanicos (
        ot_id TEXT NOT NULL REFERENCES ots(id) ON DELETE CASCADE,
        mecanico_id TEXT NOT NULL,
        posicion INTEGER NOT NULL,
        PRIMARY KEY (ot_id, mecanico_id)
    )",
    "CREATE TABLE IF NOT EXISTS presupuestos (
        ot_id TEXT PRIMARY KEY REFERENCES ots(id) ON DELETE CASCADE,
        aprobado INTEGER NOT NULL DEFAULT 0,
        iva INTEGER NOT NULL DEFAULT 19
    )",
    "CREATE TABLE IF NOT EXISTS presupuesto_items (
        id TEXT PRIMARY KEY,
        ot_id TEXT NOT NULL REFERENCES presupuestos(ot_id) ON DELETE CASCADE,
        posicion INTEGER NOT NULL,
        tipo TEXT NOT NULL,
        descripcion TEXT NOT NULL,
        cantidad INTEGER NOT NULL,
        precio_unit INTEGER NOT NULL
    )",
    "CREATE TABLE IF NOT EXISTS ot_tareas (
        id TEXT PRIMARY KEY,
        ot_id TEXT NOT NULL REFERENCES ots(id) ON DELETE CASCADE,
        posicion INTEGER NOT NULL,
        titulo TEXT NOT NULL,
        detalle TEXT,
        creada_en INTEGER NOT NULL,
        fecha_inicio INTEGER,
        fecha_termino INTEGER,
        estado TEXT NOT NULL
    )",
    "CREATE TABLE IF NOT EXISTS ot_sintomas (
        id TEXT PRIMARY KEY,
        ot_id TEXT NOT NULL REFERENCES ots(id) ON DELETE CASCADE,
        posicion INTEGER NOT NULL,
        descripcion TEXT NOT NULL,
        etapa TEXT
    )",
    "CREATE TABLE IF NOT EXISTS ot_sintoma_fotos (
        sintoma_id TEXT NOT NULL REFERENCES ot_sintomas(id) ON DELETE CASCADE,
        posicion INTEGER NOT NULL,
        uri TEXT NOT NULL
    )",
    "CREATE TABLE IF NOT EXISTS evidencias (
        id TEXT PRIMARY KEY,
        ot_id TEXT NOT NULL REFERENCES ots(id) ON DELETE CASCADE,
        etapa TEXT NOT NULL,
        uri_local TEXT NOT NULL,
        registrada_en INTEGER NOT NULL
    )",
    "CREATE TABLE IF NOT EXISTS audit_logs (
        seq INTEGER PRIMARY KEY AUTOINCREMENT,
        id TEXT NOT NULL UNIQUE,
        ot_id TEXT NOT NULL,
        usuario_email TEXT NOT NULL,
        accion TEXT NOT NULL,
        registrado_en INTEGER NOT NULL
    )",
    "CREATE INDEX IF NOT EXISTS idx_audit_ot ON audit_logs(ot_id)",
];

/// Crea las tablas que falten
pub async fn initialize(pool: &SqlitePool) -> AppResult<()> {
    for statement in STATEMENTS {
        sqlx::query(statement).execute(pool).await?;
    }
    debug!("🗄️ Esquema SQLite listo ({} sentencias)", STATEMENTS.len());
    Ok(())
}
