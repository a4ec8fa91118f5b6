//! Identifier code workflows: batch issuance, lookup, and scan-URL parsing.
//!
//! Codes are UUID v4 identifiers printed as QR labels. Issuing a code inserts
//! it as `Pendiente`; field staff later attach an item list, which flips it to
//! `En acopio` (see [`crate::intake`]). A scan URL carries the identifier as
//! a `uuid` query parameter after a `?` inside the routing hash fragment.

use std::sync::OnceLock;

use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::info;
use uuid::Uuid;

use relieftrack_store::StoreClient;

use crate::config::LinkConfig;
use crate::error::{Error, Result};

/// Table holding issued codes.
const CODES_TABLE: &str = "codigos_qr";

/// View joining codes with their attached lists.
pub(crate) const CODES_VIEW: &str = "vw_codigos_qr_con_listas";

/// Status of a freshly issued code.
const STATUS_ISSUED: &str = "Pendiente";

/// Largest batch a single issue request may produce.
const MAX_BATCH: usize = 500;

/// Alternate short query key some printed labels carry.
const ALT_PARAM_KEY: &str = "m";

fn uuid_v4_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(
            r"(?i)^[0-9a-f]{8}-[0-9a-f]{4}-4[0-9a-f]{3}-[89ab][0-9a-f]{3}-[0-9a-f]{12}$",
        )
        .expect("uuid v4 pattern is valid")
    })
}

/// Check whether `value` has the UUID v4 shape.
#[must_use]
pub fn is_uuid_v4(value: &str) -> bool {
    uuid_v4_regex().is_match(value)
}

/// One issued code.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct IssuedCode {
    /// The generated identifier.
    pub uuid: Uuid,
    /// Scannable URL embedding the identifier.
    pub url: String,
    /// Whether the store acknowledged the insert with HTTP 201.
    pub saved: bool,
}

/// Result of one batch issue request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CodeBatch {
    /// How many codes were requested after clamping.
    pub requested: usize,
    /// The issued codes, newest last.
    pub codes: Vec<IssuedCode>,
}

impl CodeBatch {
    /// How many codes the store acknowledged.
    #[must_use]
    pub fn saved_count(&self) -> usize {
        self.codes.iter().filter(|c| c.saved).count()
    }
}

/// One row of the codes-with-lists view.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CodeSummary {
    /// The code's identifier.
    pub uuid: String,
    /// Code status (`Pendiente`, `En acopio`).
    #[serde(rename = "qr_estatus")]
    pub status: Option<String>,
    /// When the code was issued.
    #[serde(rename = "qr_created_at")]
    pub created_at: Option<String>,
    /// When the code last changed.
    #[serde(rename = "qr_updated_at")]
    pub updated_at: Option<String>,
    /// Item list text registered against the code, if any.
    #[serde(rename = "lista_texto")]
    pub list_text: Option<String>,
    /// Status of the attached list, if any.
    #[serde(rename = "lista_estatus")]
    pub list_status: Option<String>,
}

/// Build the scan URL for a code identifier.
#[must_use]
pub fn scan_url(links: &LinkConfig, uuid: &Uuid) -> String {
    format!(
        "{}/#/{}?uuid={uuid}",
        links.public_origin.trim_end_matches('/'),
        links.lookup_route
    )
}

/// Issue a batch of `count` codes, clamped to `1..=500`.
///
/// Each code is generated, wrapped in a scan URL, and inserted sequentially
/// with a minimal-return insert; a code counts as saved only when the store
/// answers HTTP 201.
///
/// # Errors
///
/// Fails on the first transport error or non-success response; codes issued
/// before the failure are lost from the result (they may still exist in the
/// store).
pub async fn issue_batch(
    store: &StoreClient,
    links: &LinkConfig,
    count: usize,
) -> Result<CodeBatch> {
    let requested = count.clamp(1, MAX_BATCH);
    let mut codes = Vec::with_capacity(requested);

    for _ in 0..requested {
        let uuid = Uuid::new_v4();
        let url = scan_url(links, &uuid);
        let status = store
            .insert(CODES_TABLE)
            .send_minimal(&json!({ "uuid": uuid, "estatus": STATUS_ISSUED }))
            .await?;
        codes.push(IssuedCode {
            uuid,
            url,
            saved: status == 201,
        });
    }

    let batch = CodeBatch { requested, codes };
    info!(
        requested = batch.requested,
        saved = batch.saved_count(),
        "issued code batch"
    );
    Ok(batch)
}

/// Look up a code by raw identifier or full scan URL.
///
/// Returns `Ok(None)` when the identifier is well-formed but not registered.
///
/// # Errors
///
/// Fails with a validation error when no v4-shaped identifier can be
/// extracted from the input, or with a store error on remote failure.
pub async fn lookup(store: &StoreClient, input: &str) -> Result<Option<CodeSummary>> {
    let uuid = normalize_identifier(input)?;
    store
        .select(CODES_VIEW)
        .eq("uuid", &uuid)
        .fetch_first()
        .await
        .map_err(Error::from)
}

/// Reduce lookup input to a validated identifier.
///
/// Accepts a raw UUID or a URL carrying `uuid` (or the alternate `m`) as a
/// query parameter.
///
/// # Errors
///
/// Fails with a validation error when nothing v4-shaped can be extracted.
pub fn normalize_identifier(input: &str) -> Result<String> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return Err(Error::validation("identifier is empty"));
    }

    let candidate = if is_uuid_v4(trimmed) {
        trimmed.to_string()
    } else {
        query_param(trimmed, "uuid")
            .or_else(|| query_param(trimmed, ALT_PARAM_KEY))
            .ok_or_else(|| {
                Error::validation("input carries no uuid parameter and is not a UUID")
            })?
    };

    if !is_uuid_v4(&candidate) {
        return Err(Error::validation(format!(
            "'{candidate}' is not a v4 UUID"
        )));
    }
    Ok(candidate)
}

/// Extract the `uuid` parameter from scanned text.
///
/// # Errors
///
/// Fails with a user-readable validation error when the text carries no
/// `uuid` parameter.
pub fn extract_uuid(scanned: &str) -> Result<String> {
    query_param(scanned.trim(), "uuid")
        .ok_or_else(|| Error::validation("the scanned code carries no uuid parameter"))
}

/// Find a query parameter in a URL-shaped string.
///
/// Looks in the standard query string first (between `?` and `#`), then after
/// a `?` embedded in the hash fragment, matching how the share links are
/// built.
#[must_use]
pub fn query_param(url: &str, key: &str) -> Option<String> {
    let (head, fragment) = match url.split_once('#') {
        Some((head, fragment)) => (head, Some(fragment)),
        None => (url, None),
    };

    // Standard query string.
    if let Some((_, query)) = head.split_once('?') {
        if let Some(value) = param_from_query(query, key) {
            return Some(value);
        }
    }

    // Query embedded in the hash fragment, e.g. `/#/route?uuid=...`.
    if let Some((_, query)) = fragment.and_then(|f| f.split_once('?')) {
        return param_from_query(query, key);
    }

    None
}

fn param_from_query(query: &str, key: &str) -> Option<String> {
    query.split('&').find_map(|pair| {
        let (k, v) = pair.split_once('=')?;
        (k == key && !v.is_empty()).then(|| v.to_string())
    })
}
