//! Collection-point intake: list registration, queue parsing, and overview.
//!
//! Registering a list is a two-step write: insert the list row, then flip the
//! code's status to `En acopio`. A status patch that fails after a successful
//! insert is reported as a warning, not rolled back; the list is already
//! saved and the caller can retry the status change later.

use std::sync::OnceLock;

use chrono::{DateTime, Utc};
use regex::Regex;
use serde::Serialize;
use serde_json::json;
use tracing::{info, warn};

use relieftrack_store::{Order, StoreClient};

use crate::codes::{CodeSummary, CODES_VIEW};
use crate::config::LinkConfig;
use crate::error::{Error, Result};

/// Table holding registered item lists.
const LISTS_TABLE: &str = "listas_acopio";

/// Table holding issued codes.
const CODES_TABLE: &str = "codigos_qr";

/// Status a code takes once a list is registered against it.
const STATUS_IN_COLLECTION: &str = "En acopio";

fn queue_line_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?i)^(.+?)\s+x\s+(\d+)\s*$").expect("queue pattern is valid"))
}

/// One parsed queue line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct QueueEntry {
    /// Item description.
    pub item: String,
    /// Counted quantity, when the line carried one.
    pub quantity: Option<u32>,
}

/// Parse queue text into entries, one per non-empty line.
///
/// Lines shaped `<item> x <count>` become counted entries; any other
/// non-empty line (including one whose count does not fit the quantity
/// type) keeps its full text and carries no quantity.
#[must_use]
pub fn parse_queue(text: &str) -> Vec<QueueEntry> {
    text.lines()
        .filter(|line| !line.trim().is_empty())
        .map(|line| {
            queue_line_regex()
                .captures(line)
                .and_then(|captures| {
                    let quantity = captures[2].parse().ok()?;
                    Some(QueueEntry {
                        item: captures[1].trim().to_string(),
                        quantity: Some(quantity),
                    })
                })
                .unwrap_or_else(|| QueueEntry {
                    item: line.trim().to_string(),
                    quantity: None,
                })
        })
        .collect()
}

/// Build the URL where field staff register a list for a code.
#[must_use]
pub fn registration_url(links: &LinkConfig, uuid: &str) -> String {
    format!(
        "{}/#/{}?uuid={uuid}",
        links.public_origin.trim_end_matches('/'),
        links.registration_route
    )
}

/// Outcome of a list registration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RegistrationOutcome {
    /// Code the list was registered against.
    pub uuid: String,
    /// Whether the code's status was flipped to `En acopio`.
    pub status_updated: bool,
    /// Warning when the list saved but the status patch failed.
    pub warning: Option<String>,
}

/// The timestamp shape the store's status patch carries.
#[must_use]
pub fn store_timestamp(at: DateTime<Utc>) -> String {
    at.format("%Y-%m-%d %H:%M:%S+00").to_string()
}

/// Register an item list against a code.
///
/// # Errors
///
/// Fails with a validation error when `uuid` or `list_text` is blank, or
/// with a store error when the list insert is rejected. A failed status
/// patch after a successful insert is a warning in the outcome, not an
/// error.
pub async fn register_list(
    store: &StoreClient,
    uuid: &str,
    list_text: &str,
) -> Result<RegistrationOutcome> {
    let uuid = uuid.trim();
    if uuid.is_empty() {
        return Err(Error::validation("missing uuid"));
    }
    let list = list_text.trim();
    if list.is_empty() {
        return Err(Error::validation("the list cannot be empty"));
    }

    let status = store
        .insert(LISTS_TABLE)
        .send_minimal(&json!({ "codigo_qr_id": uuid, "lista": list }))
        .await?;
    if status != 201 {
        return Err(Error::http(
            status,
            "the list insert was not acknowledged with 201",
        ));
    }

    let patch = json!({
        "estatus": STATUS_IN_COLLECTION,
        "updated_at": store_timestamp(Utc::now()),
    });
    match store.update(CODES_TABLE).eq("uuid", uuid).send(&patch).await {
        Ok(_) => {
            info!(uuid, "list registered, code marked in collection");
            Ok(RegistrationOutcome {
                uuid: uuid.to_string(),
                status_updated: true,
                warning: None,
            })
        }
        Err(error) => {
            warn!(uuid, %error, "list saved but status patch failed");
            Ok(RegistrationOutcome {
                uuid: uuid.to_string(),
                status_updated: false,
                warning: Some(format!("list saved, status not updated: {error}")),
            })
        }
    }
}

/// List every code with its attached list, newest first.
///
/// # Errors
///
/// Fails on transport errors or a non-success response.
pub async fn overview(store: &StoreClient) -> Result<Vec<CodeSummary>> {
    store
        .select(CODES_VIEW)
        .order("qr_created_at", Order::Descending)
        .fetch()
        .await
        .map_err(Error::from)
}

#[cfg(test)]
mod tests {
    use super::*;

    use chrono::TimeZone;

    #[test]
    fn test_parse_queue_counted_lines() {
        let entries = parse_queue("arroz 1kg x 48\natun lata x 198");
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].item, "arroz 1kg");
        assert_eq!(entries[0].quantity, Some(48));
        assert_eq!(entries[1].quantity, Some(198));
    }

    #[test]
    fn test_parse_queue_case_insensitive_separator() {
        let entries = parse_queue("frazada X 43");
        assert_eq!(entries[0].item, "frazada");
        assert_eq!(entries[0].quantity, Some(43));
    }

    #[test]
    fn test_parse_queue_uncounted_line() {
        let entries = parse_queue("ropa abrigo lote");
        assert_eq!(entries[0].item, "ropa abrigo lote");
        assert_eq!(entries[0].quantity, None);
    }

    #[test]
    fn test_parse_queue_zero_quantity() {
        let entries = parse_queue("biberon x 0");
        assert_eq!(entries[0].quantity, Some(0));
    }

    #[test]
    fn test_parse_queue_oversized_count_keeps_line_text() {
        // A count too large for the quantity type must not eat the suffix.
        let entries = parse_queue("agua x 99999999999");
        assert_eq!(entries[0].item, "agua x 99999999999");
        assert_eq!(entries[0].quantity, None);
    }

    #[test]
    fn test_parse_queue_skips_blank_lines() {
        let entries = parse_queue("aceite 1L x 40\n\n   \nsal 1kg x 0\n");
        assert_eq!(entries.len(), 2);
    }

    #[test]
    fn test_parse_queue_item_with_inner_x() {
        // The separator is ` x <digits>` at end of line, not any 'x'.
        let entries = parse_queue("caja x grande x 3");
        assert_eq!(entries[0].item, "caja x grande");
        assert_eq!(entries[0].quantity, Some(3));
    }

    #[test]
    fn test_parse_queue_trailing_whitespace() {
        let entries = parse_queue("curitas caja x 5   ");
        assert_eq!(entries[0].item, "curitas caja");
        assert_eq!(entries[0].quantity, Some(5));
    }

    #[test]
    fn test_parse_queue_empty_text() {
        assert!(parse_queue("").is_empty());
        assert!(parse_queue("\n\n").is_empty());
    }

    #[test]
    fn test_registration_url_shape() {
        let links = LinkConfig::default();
        assert_eq!(
            registration_url(&links, "abc-123"),
            "http://localhost:5173/#/registroLista?uuid=abc-123"
        );
    }

    #[test]
    fn test_store_timestamp_shape() {
        let at = Utc.with_ymd_and_hms(2025, 10, 1, 12, 30, 5).unwrap();
        assert_eq!(store_timestamp(at), "2025-10-01 12:30:05+00");
    }

    #[tokio::test]
    async fn test_register_list_rejects_blank_uuid() {
        let store = StoreClient::new("https://store.example/rest/v1", "key").unwrap();
        let err = register_list(&store, "  ", "arroz").await.unwrap_err();
        assert!(err.is_validation());
        assert!(err.to_string().contains("uuid"));
    }

    #[tokio::test]
    async fn test_register_list_rejects_blank_list() {
        let store = StoreClient::new("https://store.example/rest/v1", "key").unwrap();
        let err = register_list(&store, "4bd88c5e-07a1-4c9e-8b11-2f559ab3f559", "  \n ")
            .await
            .unwrap_err();
        assert!(err.is_validation());
        assert!(err.to_string().contains("empty"));
    }
}
