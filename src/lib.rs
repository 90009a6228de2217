//! Gesticar
//!
//! Gestión de órdenes de trabajo (OT) para un taller automotriz: clientes,
//! vehículos, presupuestos, tareas, evidencias y auditoría, sobre un
//! repositorio con tres backends intercambiables.

pub mod cache;
pub mod clients;
pub mod config;
pub mod controllers;
pub mod database;
pub mod dto;
pub mod middleware;
pub mod models;
pub mod repositories;
pub mod routes;
pub mod services;
pub mod state;
pub mod utils;
