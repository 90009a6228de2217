//! Datos iniciales del taller
//!
//! Los backends local y en memoria arrancan con el mismo juego de datos:
//! tres usuarios, dos clientes con un vehículo cada uno y una OT en
//! borrador con presupuesto pendiente.

use crate::{
    models::{BudgetItem, Client, ItemKind, NewWorkOrder, Role, Symptom, User, Vehicle},
    utils::errors::AppResult,
};

/// Costo bcrypt de las contraseñas sembradas
pub const SEED_HASH_COST: u32 = 4;

pub const ADMIN_EMAIL: &str = "admin@gesticar.cl";
pub const MECHANIC_EMAIL: &str = "mecanico@gesticar.cl";
pub const SECOND_MECHANIC_EMAIL: &str = "ana@gesticar.cl";

pub fn users() -> AppResult<Vec<User>> {
    Ok(vec![
        User::with_password("Admin", ADMIN_EMAIL, "admin", Role::Admin, SEED_HASH_COST)?,
        User::with_password("Mecánico Juan", MECHANIC_EMAIL, "mecanico", Role::Mechanic, SEED_HASH_COST)?,
        User::with_password("Mecánica Ana", SECOND_MECHANIC_EMAIL, "mecanico", Role::Mechanic, SEED_HASH_COST)?,
    ])
}

/// Clientes con su vehículo
pub fn clients() -> Vec<(Client, Vehicle)> {
    let mut juan = Client::new("12345678-5", "Juan Pérez");
    juan.email = Some("juan@example.com".to_string());
    juan.commune = Some("Santiago".to_string());

    let mut yaris = Vehicle::new("ABCD12", &juan.rut, "Toyota", "Yaris", 2018);
    yaris.color = Some("Rojo".to_string());
    yaris.mileage = Some(75000);
    yaris.fuel = Some("Gasolina".to_string());

    let mut maria = Client::new("20123456-5", "María González");
    maria.email = Some("maria@example.com".to_string());
    maria.commune = Some("Valparaíso".to_string());

    let mut accent = Vehicle::new("EFGH34", &maria.rut, "Hyundai", "Accent", 2020);
    accent.color = Some("Azul".to_string());
    accent.mileage = Some(40000);
    accent.fuel = Some("Gasolina".to_string());

    vec![(juan, yaris), (maria, accent)]
}

/// OT inicial asignada al primer mecánico
pub fn first_order(mechanic: &User) -> NewWorkOrder {
    let (client, vehicle) = clients().remove(0);
    let mut order = NewWorkOrder::new(client, vehicle);
    order.mechanic_ids = vec![mechanic.id];
    order.budget_items = vec![
        BudgetItem::new(ItemKind::Labor, "Diagnóstico", 1, 15000),
        BudgetItem::new(ItemKind::Part, "Bujías", 4, 8000),
    ];
    order.symptoms = vec![Symptom::new(NOTES)];
    order
}

/// Notas de la OT inicial
pub const NOTES: &str = "Ruidos en tren delantero";
