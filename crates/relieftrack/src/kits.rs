//! Kit workflows: catalog, registration, receipt confirmation, and listing.
//!
//! A registered kit row's id becomes a receipt URL printed on the kit label;
//! the recipient opens it and confirms whether the delivery was complete.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::info;

use relieftrack_store::StoreClient;

use crate::config::LinkConfig;
use crate::error::{Error, Result};
use crate::geo::LatLng;

/// Table holding delivered kits.
const KITS_TABLE: &str = "kits_entregados";

/// Status of a freshly registered kit.
const STATUS_REGISTERED: &str = "registrado";

/// Status when the recipient confirms a complete delivery.
const STATUS_COMPLETE: &str = "entrega completa";

/// Status when the recipient confirms a partial delivery.
const STATUS_PARTIAL: &str = "entrega parcial";

/// Notes text stored when a complete delivery carries none.
const DEFAULT_NOTES: &str = "Sin observaciones";

/// Category bucket for kits whose row carries none.
const UNCATEGORIZED: &str = "Sin categoría";

/// A fixed kit category and its expected contents.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KitCategory {
    /// Category display name.
    pub name: &'static str,
    /// Items the kit should contain, one per line.
    pub items: &'static [&'static str],
}

/// The fixed kit catalog.
#[must_use]
pub fn catalog() -> &'static [KitCategory] {
    &[
        KitCategory {
            name: "Kit de Alimentación",
            items: &[
                "1 kg arroz",
                "1 kg frijol o lenteja",
                "1 paquete pasta (500 g – 1 kg)",
                "1 L aceite",
                "1 kg azúcar",
                "1 kg sal",
                "6 latas proteína (atún/sardina)",
                "2 L leche UHT",
                "2 paquetes galletas",
                "1 frasco mermelada o café",
            ],
        },
        KitCategory {
            name: "Kit de Hidratación",
            items: &["12 botellas de 1.5 L (18 L en total)"],
        },
        KitCategory {
            name: "Kit de Higiene Personal",
            items: &[
                "4 barras jabón",
                "1 kg detergente",
                "2 cepillos + 2 pastas dentales",
                "1 shampoo (250 ml)",
                "1 paquete toallas sanitarias",
                "2 rastrillos",
                "4 rollos papel higiénico",
            ],
        },
        KitCategory {
            name: "Kit de Limpieza",
            items: &[
                "1 escoba",
                "1 trapeador",
                "1 cubeta",
                "2 L cloro",
                "2 kg detergente",
                "1 rollo bolsas de basura",
            ],
        },
        KitCategory {
            name: "Kit de Primeros Auxilios",
            items: &[
                "1 botiquín básico",
                "1 caja curitas",
                "1 paquete gasas",
                "1 botella antiséptico (250 ml)",
                "1 par guantes",
            ],
        },
        KitCategory {
            name: "Kit de Bebé",
            items: &[
                "1 paquete pañales",
                "1 paquete toallitas húmedas",
                "1 lata fórmula infantil",
                "1 biberón",
            ],
        },
        KitCategory {
            name: "Kit de Abrigo",
            items: &[
                "2 frazadas",
                "1 impermeable",
                "2 pares calcetas",
                "1 colchoneta",
            ],
        },
        KitCategory {
            name: "Kit Escolar",
            items: &["1 kit escolar prearmado (cuaderno, colores, lápiz, etc.)"],
        },
    ]
}

/// The catalog's default list text for a category, if it exists.
#[must_use]
pub fn default_list(category: &str) -> Option<String> {
    catalog()
        .iter()
        .find(|kit| kit.name == category)
        .map(|kit| kit.items.join(",\n"))
}

/// One delivered-kit row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KitRow {
    /// Row identifier (a UUID assigned by the store).
    pub id: String,
    /// When the kit was registered.
    #[serde(default)]
    pub created_at: Option<String>,
    /// Supply list printed on the kit.
    #[serde(default, rename = "lista_viveres")]
    pub list: Option<String>,
    /// Catalog category.
    #[serde(default, rename = "categoria")]
    pub category: Option<String>,
    /// Lifecycle status (`registrado`, `entrega completa`, `entrega parcial`).
    #[serde(default, rename = "estatus")]
    pub status: Option<String>,
    /// Whether the recipient confirmed receipt.
    #[serde(default, rename = "confirmacion_recepcion")]
    pub confirmed: Option<bool>,
    /// Recipient notes.
    #[serde(default, rename = "observaciones")]
    pub notes: Option<String>,
    /// Recipient message to the donors.
    #[serde(default, rename = "mensaje")]
    pub message: Option<String>,
    /// Free-text address the recipient entered.
    #[serde(default, rename = "ubicacion")]
    pub address: Option<String>,
    /// Confirmation latitude, if shared.
    #[serde(default)]
    pub lat: Option<f64>,
    /// Confirmation longitude, if shared.
    #[serde(default)]
    pub lng: Option<f64>,
}

/// A freshly registered kit and its receipt URL.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RegisteredKit {
    /// Identifier the store assigned.
    pub id: String,
    /// URL the recipient scans to confirm receipt.
    pub receipt_url: String,
}

/// Short display form of a row id: the last `-`-separated segment.
#[must_use]
pub fn short_id(id: &str) -> &str {
    id.rsplit('-').next().unwrap_or(id)
}

/// Build the receipt URL for a kit id.
#[must_use]
pub fn receipt_url(links: &LinkConfig, kit_id: &str) -> String {
    format!(
        "{}/#/{}?uuid={kit_id}",
        links.public_origin.trim_end_matches('/'),
        links.receipt_route
    )
}

/// Register a delivered kit and mint its receipt URL.
///
/// # Errors
///
/// Fails with a validation error when the list is blank, with a store error
/// on remote failure, or when the store's response carries no created row.
pub async fn register_kit(
    store: &StoreClient,
    links: &LinkConfig,
    category: &str,
    list: &str,
) -> Result<RegisteredKit> {
    let list = list.trim();
    if list.is_empty() {
        return Err(Error::validation("the supply list cannot be empty"));
    }

    let rows: Vec<KitRow> = store
        .insert(KITS_TABLE)
        .send_returning(&json!({
            "lista_viveres": list,
            "categoria": category,
            "estatus": STATUS_REGISTERED,
        }))
        .await?;

    let row = rows
        .into_iter()
        .next()
        .ok_or_else(|| Error::validation("the insert response carried no created row"))?;

    let url = receipt_url(links, &row.id);
    info!(id = %row.id, category, "kit registered");
    Ok(RegisteredKit {
        id: row.id,
        receipt_url: url,
    })
}

/// What a recipient reports when confirming receipt.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ReceiptForm {
    /// Whether everything on the list arrived.
    pub received_complete: bool,
    /// Notes; required when the delivery was incomplete.
    pub notes: Option<String>,
    /// Optional message to the donors.
    pub message: Option<String>,
    /// Optional free-text address.
    pub address: Option<String>,
    /// Optional confirmation position.
    pub coordinates: Option<LatLng>,
}

/// Record a recipient's receipt confirmation.
///
/// # Errors
///
/// Fails with a validation error when `kit_id` is blank or notes are missing
/// for a partial delivery, or with a store error on remote failure.
pub async fn confirm_receipt(store: &StoreClient, kit_id: &str, form: &ReceiptForm) -> Result<()> {
    let kit_id = kit_id.trim();
    if kit_id.is_empty() {
        return Err(Error::validation("missing kit id"));
    }

    let notes = form.notes.as_deref().map(str::trim).unwrap_or_default();
    if !form.received_complete && notes.is_empty() {
        return Err(Error::validation(
            "notes are required when the delivery was incomplete",
        ));
    }

    let status = if form.received_complete {
        STATUS_COMPLETE
    } else {
        STATUS_PARTIAL
    };
    let notes = if notes.is_empty() { DEFAULT_NOTES } else { notes };

    let payload = json!({
        "estatus": status,
        "confirmacion_recepcion": true,
        "observaciones": notes,
        "mensaje": form.message.as_deref().map(str::trim).filter(|m| !m.is_empty()),
        "ubicacion": form.address.as_deref().map(str::trim).filter(|a| !a.is_empty()),
        "lat": form.coordinates.map(|c| c.lat),
        "lng": form.coordinates.map(|c| c.lon),
    });

    store.update(KITS_TABLE).eq("id", kit_id).send(&payload).await?;
    info!(kit_id, status, "receipt confirmed");
    Ok(())
}

/// List delivered kits grouped by category.
///
/// Groups are ordered by category name ascending; rows within a group are
/// newest first.
///
/// # Errors
///
/// Fails on transport errors or a non-success response.
pub async fn list_kits(store: &StoreClient) -> Result<Vec<(String, Vec<KitRow>)>> {
    let rows: Vec<KitRow> = store.select(KITS_TABLE).columns("*").fetch().await?;
    Ok(group_by_category(rows))
}

fn group_by_category(rows: Vec<KitRow>) -> Vec<(String, Vec<KitRow>)> {
    let mut groups: BTreeMap<String, Vec<KitRow>> = BTreeMap::new();
    for row in rows {
        let category = row
            .category
            .as_deref()
            .map(str::trim)
            .filter(|c| !c.is_empty())
            .unwrap_or(UNCATEGORIZED)
            .to_string();
        groups.entry(category).or_default().push(row);
    }
    for rows in groups.values_mut() {
        rows.sort_by(|a, b| b.created_at.cmp(&a.created_at));
    }
    groups.into_iter().collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(id: &str, category: Option<&str>, created_at: Option<&str>) -> KitRow {
        KitRow {
            id: id.to_string(),
            created_at: created_at.map(String::from),
            list: None,
            category: category.map(String::from),
            status: None,
            confirmed: None,
            notes: None,
            message: None,
            address: None,
            lat: None,
            lng: None,
        }
    }

    #[test]
    fn test_catalog_has_eight_categories() {
        let catalog = catalog();
        assert_eq!(catalog.len(), 8);
        assert!(catalog.iter().all(|kit| !kit.items.is_empty()));
    }

    #[test]
    fn test_default_list_known_category() {
        let list = default_list("Kit de Hidratación").unwrap();
        assert_eq!(list, "12 botellas de 1.5 L (18 L en total)");

        let food = default_list("Kit de Alimentación").unwrap();
        assert!(food.starts_with("1 kg arroz,\n"));
        assert!(food.ends_with("1 frasco mermelada o café"));
    }

    #[test]
    fn test_default_list_unknown_category() {
        assert!(default_list("Kit Inexistente").is_none());
    }

    #[test]
    fn test_short_id() {
        assert_eq!(short_id("4bd88c5e-07a1-4c9e-8b11-2f559ab3f559"), "2f559ab3f559");
        assert_eq!(short_id("plain"), "plain");
    }

    #[test]
    fn test_receipt_url_shape() {
        let links = LinkConfig::default();
        assert_eq!(
            receipt_url(&links, "abc-123"),
            "http://localhost:5173/#/recepcionKit?uuid=abc-123"
        );
    }

    #[test]
    fn test_kit_row_deserialize() {
        let json = r#"{
            "id": "abc-123",
            "created_at": "2025-10-01T12:00:00+00:00",
            "lista_viveres": "1 kg arroz",
            "categoria": "Kit de Alimentación",
            "estatus": "registrado",
            "confirmacion_recepcion": null,
            "observaciones": null,
            "mensaje": null,
            "ubicacion": null,
            "lat": null,
            "lng": null
        }"#;
        let row: KitRow = serde_json::from_str(json).unwrap();
        assert_eq!(row.category.as_deref(), Some("Kit de Alimentación"));
        assert_eq!(row.status.as_deref(), Some("registrado"));
    }

    #[test]
    fn test_kit_row_deserialize_sparse() {
        let row: KitRow = serde_json::from_str(r#"{"id": "abc"}"#).unwrap();
        assert!(row.category.is_none());
        assert!(row.lat.is_none());
    }

    #[test]
    fn test_group_by_category_orders_names_ascending() {
        let grouped = group_by_category(vec![
            row("1", Some("Kit de Limpieza"), None),
            row("2", Some("Kit de Abrigo"), None),
            row("3", Some("Kit de Limpieza"), None),
        ]);
        assert_eq!(grouped.len(), 2);
        assert_eq!(grouped[0].0, "Kit de Abrigo");
        assert_eq!(grouped[1].0, "Kit de Limpieza");
        assert_eq!(grouped[1].1.len(), 2);
    }

    #[test]
    fn test_group_by_category_rows_newest_first() {
        let grouped = group_by_category(vec![
            row("old", Some("Kit de Abrigo"), Some("2025-09-01T00:00:00+00:00")),
            row("new", Some("Kit de Abrigo"), Some("2025-10-01T00:00:00+00:00")),
        ]);
        assert_eq!(grouped[0].1[0].id, "new");
        assert_eq!(grouped[0].1[1].id, "old");
    }

    #[test]
    fn test_group_by_category_bucket_for_missing() {
        let grouped = group_by_category(vec![row("1", None, None), row("2", Some("  "), None)]);
        assert_eq!(grouped.len(), 1);
        assert_eq!(grouped[0].0, UNCATEGORIZED);
        assert_eq!(grouped[0].1.len(), 2);
    }

    #[tokio::test]
    async fn test_register_kit_rejects_blank_list() {
        let store = StoreClient::new("https://store.example/rest/v1", "key").unwrap();
        let links = LinkConfig::default();
        let err = register_kit(&store, &links, "Kit de Abrigo", "  ")
            .await
            .unwrap_err();
        assert!(err.is_validation());
    }

    #[tokio::test]
    async fn test_confirm_receipt_rejects_blank_id() {
        let store = StoreClient::new("https://store.example/rest/v1", "key").unwrap();
        let err = confirm_receipt(&store, " ", &ReceiptForm::default())
            .await
            .unwrap_err();
        assert!(err.is_validation());
    }

    #[tokio::test]
    async fn test_confirm_receipt_requires_notes_when_partial() {
        let store = StoreClient::new("https://store.example/rest/v1", "key").unwrap();
        let form = ReceiptForm {
            received_complete: false,
            ..ReceiptForm::default()
        };
        let err = confirm_receipt(&store, "abc", &form).await.unwrap_err();
        assert!(err.is_validation());
        assert!(err.to_string().contains("notes"));
    }
}
