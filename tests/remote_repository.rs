use axum::{extract::Path, http::StatusCode, routing::get, Json, Router};
use serde_json::{json, Value};
use std::sync::Arc;

use gesticar::{
    cache::CacheConfig,
    clients::{ExternalVehicleClient, GesticarApiClient},
    config::environment::EnvironmentConfig,
    database::seed,
    models::{BudgetItem, Client, ItemKind, NewWorkOrder, Vehicle, WorkOrderState},
    repositories::{FakeRepository, RemoteRepository, WorkOrderRepository},
    routes::create_app,
    state::AppState,
    utils::errors::AppError,
};

/// Levanta un servidor sobre un repositorio en memoria y devuelve ambos extremos
async fn spawn_server() -> (Arc<FakeRepository>, RemoteRepository) {
    let local = Arc::new(FakeRepository::seeded().unwrap());
    let app = create_app(AppState::new(local.clone(), EnvironmentConfig::default()));

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    let api = GesticarApiClient::new(&format!("http://{}/api/", addr)).unwrap();
    (local, RemoteRepository::new(api, None, CacheConfig::default()))
}

/// Registro de patentes falso: conoce ABCD12, EFGH34 viene incompleta y
/// ZZZZ99 hace fallar al servidor
async fn registry_vehicle(Path(plate): Path<String>) -> Result<Json<Value>, StatusCode> {
    match plate.as_str() {
        "ABCD12" => Ok(Json(json!({
            "marca": "Toyota",
            "modelo": "Yaris",
            "anio": 2018,
            "color": "Rojo",
            "kilometraje": 85000,
            "clienteRut": "12.345.678-5"
        }))),
        "EFGH34" => Ok(Json(json!({ "marca": "Kia" }))),
        "ZZZZ99" => Err(StatusCode::INTERNAL_SERVER_ERROR),
        _ => Err(StatusCode::NOT_FOUND),
    }
}

async fn spawn_registry() -> ExternalVehicleClient {
    let app = Router::new().route("/vehicles/:plate", get(registry_vehicle));
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    ExternalVehicleClient::new(&format!("http://{}/", addr)).unwrap()
}

fn new_order() -> NewWorkOrder {
    let mut order = NewWorkOrder::new(
        Client::new("11.111.111-1", "Pedro Soto"),
        Vehicle::new("ijkl56", "11111111-1", "Kia", "Rio", 2015),
    );
    order.budget_items.push(BudgetItem::new(ItemKind::Part, "Pastillas", 2, 12000));
    order
}

#[tokio::test]
async fn test_remote_login() {
    let (_, remote) = spawn_server().await;

    assert!(remote.authenticate(seed::ADMIN_EMAIL, "mala").await.unwrap().is_none());
    assert!(matches!(remote.list_orders().await, Err(AppError::Unauthorized(_))));

    let user = remote.authenticate(seed::ADMIN_EMAIL, "admin").await.unwrap().unwrap();
    assert!(user.is_admin());
    assert_eq!(remote.list_orders().await.unwrap().len(), 1);

    remote.logout().await.unwrap();
    assert!(matches!(remote.list_orders().await, Err(AppError::Unauthorized(_))));
}

#[tokio::test]
async fn test_cache_until_refresh() {
    let (local, remote) = spawn_server().await;
    remote.authenticate(seed::ADMIN_EMAIL, "admin").await.unwrap();
    assert_eq!(remote.list_orders().await.unwrap().len(), 1);

    // Cambio hecho por otro cliente: el cache no lo ve todavía
    local.create_order(new_order(), seed::ADMIN_EMAIL).await.unwrap();
    assert_eq!(remote.list_orders().await.unwrap().len(), 1);

    remote.refresh().await.unwrap();
    assert_eq!(remote.list_orders().await.unwrap().len(), 2);
}

#[tokio::test]
async fn test_remote_mutations_invalidate_cache() {
    let (_, remote) = spawn_server().await;
    remote.authenticate(seed::ADMIN_EMAIL, "admin").await.unwrap();
    assert_eq!(remote.next_number().await.unwrap(), 1002);
    assert_eq!(remote.list_orders().await.unwrap().len(), 1);

    let order = remote.create_order(new_order(), seed::ADMIN_EMAIL).await.unwrap();
    assert_eq!(order.number, 1002);
    assert_eq!(order.plate, "IJKL56");
    assert_eq!(remote.list_orders().await.unwrap().len(), 2);
    assert_eq!(remote.next_number().await.unwrap(), 1003);

    let detail = remote.order_detail(order.id).await.unwrap().unwrap();
    assert_eq!(detail.budget.total(), 28560);
    assert_eq!(detail.client.unwrap().rut, "11111111-1");
}

#[tokio::test]
async fn test_remote_state_machine() {
    let (_, remote) = spawn_server().await;
    remote.authenticate(seed::MECHANIC_EMAIL, "mecanico").await.unwrap();
    let order = remote.find_by_number(1001).await.unwrap().unwrap();

    assert!(!remote.change_state(order.id, WorkOrderState::InExecution, "").await.unwrap());
    remote.approve_budget(order.id, "").await.unwrap();
    assert!(remote.change_state(order.id, WorkOrderState::InExecution, "").await.unwrap());
    assert!(remote.change_state(order.id, WorkOrderState::Finished, "").await.unwrap());

    let detail = remote.order_detail(order.id).await.unwrap().unwrap();
    assert_eq!(detail.order.state, WorkOrderState::Finished);

    let log = remote.audit_log(order.id).await.unwrap();
    let last = log.last().unwrap();
    assert_eq!(last.action, "CHANGE_STATE:FINISHED");
    assert_eq!(last.user_email, seed::MECHANIC_EMAIL);

    assert!(!remote.delete_order(order.id, "").await.unwrap());
}

#[tokio::test]
async fn test_remote_absent_entities() {
    let (_, remote) = spawn_server().await;
    remote.authenticate(seed::ADMIN_EMAIL, "admin").await.unwrap();

    assert!(remote.find_client("11111111-1").await.unwrap().is_none());
    assert!(remote.find_vehicle("ZZZZ99").await.unwrap().is_none());
    assert!(remote.find_by_number(4242).await.unwrap().is_none());
    assert!(remote.order_detail(uuid::Uuid::new_v4()).await.unwrap().is_none());
    assert!(remote.reassign_vehicle("ABCD12", "11111111-1").await.unwrap().is_none());

    let orphan = Vehicle::new("ZZZZ99", "11111111-1", "Kia", "Rio", 2015);
    assert!(matches!(remote.save_vehicle(orphan).await, Err(AppError::NotFound(_))));

    let juan = remote.find_by_rut("12.345.678-5").await.unwrap();
    assert_eq!(juan.len(), 1);
    assert_eq!(remote.find_user_by_email("ADMIN@gesticar.cl").await.unwrap().unwrap().email, seed::ADMIN_EMAIL);
}

#[tokio::test]
async fn test_create_order_with_unchecked_rut() {
    let (_, remote) = spawn_server().await;
    remote.authenticate(seed::ADMIN_EMAIL, "admin").await.unwrap();

    let order = remote
        .create_order(
            NewWorkOrder::new(
                Client::new("12.345.678-9", "Cliente sin validar"),
                Vehicle::new("ij1234", "12.345.678-9", "Kia", "Rio", 2015),
            ),
            seed::ADMIN_EMAIL,
        )
        .await
        .unwrap();
    assert_eq!(order.plate, "IJ1234");

    let detail = remote.order_detail(order.id).await.unwrap().unwrap();
    assert_eq!(detail.client.unwrap().rut, "12345678-9");
    let found = remote.find_by_plate("IJ1234").await.unwrap();
    assert_eq!(found.iter().map(|o| o.id).collect::<Vec<_>>(), vec![order.id]);
}

#[tokio::test]
async fn test_plate_search_ignores_case() {
    let (_, remote) = spawn_server().await;
    remote.authenticate(seed::ADMIN_EMAIL, "admin").await.unwrap();

    let lower = remote.find_by_plate("abcd12").await.unwrap();
    let upper = remote.find_by_plate("ABCD12").await.unwrap();
    assert_eq!(lower.len(), 1);
    assert_eq!(lower, upper);
}

#[tokio::test]
async fn test_overflowing_item_is_rejected() {
    let (_, remote) = spawn_server().await;
    remote.authenticate(seed::ADMIN_EMAIL, "admin").await.unwrap();
    let order = remote.find_by_number(1001).await.unwrap().unwrap();

    let huge = BudgetItem::new(ItemKind::Part, "Motor", 1_000_000_000_000, 1_000_000_000);
    assert!(matches!(
        remote.add_budget_item(order.id, huge.clone(), "").await,
        Err(AppError::BadRequest(_))
    ));
    assert!(matches!(
        remote.save_budget(order.id, vec![huge], false, 19, "").await,
        Err(AppError::Validation(_))
    ));

    let budget = remote.budget(order.id).await.unwrap().unwrap();
    assert_eq!(budget.total(), 55930);
}

#[tokio::test]
async fn test_external_registry_lookup() {
    let api = GesticarApiClient::new("http://127.0.0.1:9").unwrap();
    let remote = RemoteRepository::new(api, Some(spawn_registry().await), CacheConfig::default());

    let vehicle = remote.lookup_external_vehicle("abcd12").await.unwrap().unwrap();
    assert_eq!(vehicle.plate, "ABCD12");
    assert_eq!(vehicle.client_rut.as_deref(), Some("12345678-5"));
    assert_eq!(vehicle.make, "Toyota");
    assert_eq!(vehicle.year, 2018);
    assert_eq!(vehicle.mileage, Some(85000));

    assert!(remote.lookup_external_vehicle("IJKL56").await.unwrap().is_none());
    assert!(remote.lookup_external_vehicle("efgh34").await.unwrap().is_none());
    assert!(matches!(
        remote.lookup_external_vehicle("ZZZZ99").await,
        Err(AppError::ExternalApi(_))
    ));
}
