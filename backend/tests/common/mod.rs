//! Fixture data shared by the integration tests

#![allow(dead_code)]

use almacen_backend::external::InMemoryStore;
use almacen_backend::Config;
use serde_json::{json, Value};

/// Default configuration with the given paging limits
pub fn config(page_size: usize, max_rows: usize) -> Config {
    let mut config = Config::default();
    config.store.page_size = page_size;
    config.store.max_rows = max_rows;
    config.views.debounce_ms = 0;
    config
}

pub fn line(id: i64, document: i64, item: &str, quantity: &str, date: &str) -> Value {
    json!({
        "id": id,
        "numero_solicitud": document,
        "codigo_articulo": item,
        "cantidad": quantity,
        "fecha": date,
    })
}

pub fn header(
    document: i64,
    date: &str,
    requester: Option<&str>,
    installation: Option<i64>,
) -> Value {
    json!({
        "numero_solicitud": document,
        "fecha": date,
        "identificacion": requester,
        "instalacion_id": installation,
        "observaciones": null,
    })
}

/// Issuances of ART-1 with a gap in March, plus ART-2 noise
pub fn warehouse() -> InMemoryStore {
    InMemoryStore::new()
        .with_table(
            "detalle_salidas",
            vec![
                line(1, 100, "ART-1", "10", "2025-01-05"),
                line(2, 101, "ART-1", "5", "2025-01-20"),
                line(3, 101, "ART-2", "7", "2025-01-20"),
                line(4, 102, "ART-1", "8", "2025-02-02"),
                line(5, 103, "ART-2", "1", "2025-02-02"),
                line(6, 104, "ART-1", "99", "2024-12-31"),
                line(7, 105, "ART-1", "4", "2025-04-10"),
            ],
        )
        .with_table(
            "salidas",
            vec![
                header(100, "2025-01-05", Some("1001"), Some(1)),
                header(101, "2025-01-20", Some("1002"), Some(2)),
                header(102, "2025-02-02", None, Some(1)),
                header(103, "2025-02-02", Some("1001"), None),
                header(104, "2024-12-31", Some("1001"), Some(1)),
                header(105, "2025-04-10", Some("1002"), Some(2)),
            ],
        )
        .with_table(
            "personal",
            vec![
                json!({"identificacion": 1001, "nombre": "Ana", "apellido": "Rojas"}),
                json!({"identificacion": "1002", "nombre": "Luis", "apellido": null}),
            ],
        )
        .with_table(
            "instalaciones",
            vec![
                json!({"id": 1, "nombre": "Planta Norte", "alias": "PN"}),
                json!({"id": 2, "nombre": "Bodega Sur", "alias": null}),
            ],
        )
        .with_table(
            "articulos",
            vec![
                json!({
                    "codigo": "ART-1",
                    "nombre": "Guantes de nitrilo",
                    "unidad": "caja",
                    "categoria_gasto_id": 7,
                    "costo_unitario": "2.50",
                }),
                json!({
                    "codigo": "ART-2",
                    "nombre": "Cinta aislante",
                    "unidad": "rollo",
                    "categoria_gasto_id": 8,
                    "costo_unitario": "1.20",
                }),
            ],
        )
        .with_table(
            "categorias_gasto",
            vec![
                json!({"id": 7, "nombre": "Seguridad"}),
                json!({"id": 8, "nombre": "Electricidad"}),
            ],
        )
}
