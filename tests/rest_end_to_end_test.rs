use std::sync::Arc;

use filament_inventory::auth::{FileSessionStore, MemorySessionStore, Session, SessionStore};
use filament_inventory::prelude::*;
use serde_json::{json, Value};
use wiremock::matchers::{body_json, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn spool_json(id: &str, barcode: &str) -> Value {
    json!({
        "id": id,
        "barcode": barcode,
        "base_weight": 1000.0,
        "is_box": false,
        "thickness": 1.75,
        "spool_return": false,
        "color": {"id": "c-1", "name": "Red", "hex_code": "#FF0000"},
        "brand": {"id": "b-1", "name": "Acme"},
        "material": {"id": "m-1", "name": "PLA"},
        "created_at": "2024-05-01T10:00:00.123456",
        "updated_at": "2024-05-01T10:00:00.123456"
    })
}

fn unit_json(id: &str, spool: &Value) -> Value {
    json!({
        "id": id,
        "weight": 1000.0,
        "is_in_use": false,
        "custom_properties": null,
        "spool": spool,
        "status": {"id": "st-1", "name": "in_stock"},
        "created_at": "2024-05-01T10:00:01",
        "updated_at": "2024-05-01T10:00:01"
    })
}

fn client_for(server: &MockServer, session: Arc<dyn SessionStore>) -> InventoryClient {
    InventoryClient::with_session(ClientConfig::with_base_url(server.uri()), session)
        .expect("client builds")
}

#[tokio::test]
async fn intake_over_rest_counts_partial_failures() {
    let server = MockServer::start().await;
    let spool = spool_json("s-1", "PLA-RED-001");

    Mock::given(method("POST"))
        .and(path("/api/spools"))
        .and(header("authorization", "Bearer tok-123"))
        .respond_with(ResponseTemplate::new(201).set_body_json(&spool))
        .expect(1)
        .mount(&server)
        .await;
    let unit_body = json!({"spool_id": "s-1", "weight": 1000.0, "status_name": "in_stock"});
    Mock::given(method("POST"))
        .and(path("/api/inventory/"))
        .and(body_json(&unit_body))
        .respond_with(ResponseTemplate::new(201).set_body_json(unit_json("i-1", &spool)))
        .up_to_n_times(2)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/api/inventory/"))
        .respond_with(ResponseTemplate::new(500).set_body_string("boom"))
        .mount(&server)
        .await;

    let session = Arc::new(MemorySessionStore::with_token("tok-123"));
    let client = client_for(&server, session);

    let mut form = SpoolForm::with_barcode("PLA-RED-001");
    form.material_name = "PLA".into();
    form.brand_name = "Acme".into();
    form.color_name = "Red".into();
    form.quantity = 3;

    let outcome = client.create_workflow().submit(&mut form).await.unwrap();
    assert_eq!(outcome.kind(), OutcomeKind::Partial);
    assert_eq!(outcome.created_count(), 2);
    assert_eq!(outcome.failed_count(), 1);
    assert!(matches!(
        outcome.first_error(),
        Some(ServiceError::ServerError { status: 500, .. })
    ));
    assert_eq!(
        Notification::for_created(&outcome).message,
        "Spool created, but only 2 of 3 item(s) were added to inventory (1 failed)."
    );
}

#[tokio::test]
async fn barcode_lookup_is_cached_until_invalidated() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/spools"))
        .and(query_param("barcode", "PLA-RED-001"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([spool_json("s-1", "PLA-RED-001")])))
        .expect(2)
        .mount(&server)
        .await;

    let client = client_for(&server, Arc::new(MemorySessionStore::new()));
    let spools = &client.services().spools;

    assert_eq!(spools.search_by_barcode("PLA-RED-001").await.unwrap().len(), 1);
    assert_eq!(spools.search_by_barcode(" PLA-RED-001 ").await.unwrap().len(), 1);
    client.cache().invalidate(Collection::Spools);
    assert_eq!(spools.search_by_barcode("PLA-RED-001").await.unwrap().len(), 1);
}

#[tokio::test]
async fn expired_token_is_removed_from_the_session_file() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/inventory/in-use"))
        .respond_with(
            ResponseTemplate::new(401).set_body_json(json!({"detail": "Could not validate credentials"})),
        )
        .mount(&server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let store = FileSessionStore::open(dir.path().join("session.json")).unwrap();
    store.save(Session::new("stale-token")).unwrap();
    let store = Arc::new(store);
    let client = client_for(&server, store.clone());

    let err = client.services().inventory.in_use().await.unwrap_err();
    assert!(err.is_auth());
    assert_eq!(
        Notification::for_error(&err).message,
        "Your session has expired. Please log in again."
    );
    assert!(store.current().is_none());
    assert!(!dir.path().join("session.json").exists());
}
