//! Alert and pagination response headers.
//!
//! Alert headers tell clients what a write did (`greatbigApp.note.created`
//! plus the affected id). Pagination headers carry the total count and
//! `Link` relations for page navigation.

use axum::http::{header, HeaderMap, HeaderName, HeaderValue};
use greatbig::services::Page;

pub const APPLICATION_NAME: &str = "greatbigApp";

const ALERT_HEADER: HeaderName = HeaderName::from_static("x-greatbigapp-alert");
const ERROR_HEADER: HeaderName = HeaderName::from_static("x-greatbigapp-error");
const PARAMS_HEADER: HeaderName = HeaderName::from_static("x-greatbigapp-params");
const TOTAL_COUNT_HEADER: HeaderName = HeaderName::from_static("x-total-count");

fn insert(headers: &mut HeaderMap, name: HeaderName, value: &str) {
    match HeaderValue::from_str(value) {
        Ok(value) => {
            headers.insert(name, value);
        },
        Err(_) => tracing::warn!("Dropping invalid {} header value: {:?}", name, value),
    }
}

fn create_alert(message: &str, param: &str) -> HeaderMap {
    let mut headers = HeaderMap::new();
    insert(&mut headers, ALERT_HEADER, message);
    insert(&mut headers, PARAMS_HEADER, param);
    headers
}

pub fn entity_creation_alert(entity_name: &str, param: &str) -> HeaderMap {
    create_alert(
        &format!("{}.{}.created", APPLICATION_NAME, entity_name),
        param,
    )
}

pub fn entity_update_alert(entity_name: &str, param: &str) -> HeaderMap {
    create_alert(
        &format!("{}.{}.updated", APPLICATION_NAME, entity_name),
        param,
    )
}

pub fn entity_deletion_alert(entity_name: &str, param: &str) -> HeaderMap {
    create_alert(
        &format!("{}.{}.deleted", APPLICATION_NAME, entity_name),
        param,
    )
}

pub fn failure_alert(entity_name: &str, error_key: &str) -> HeaderMap {
    let mut headers = HeaderMap::new();
    insert(&mut headers, ERROR_HEADER, &format!("error.{}", error_key));
    insert(&mut headers, PARAMS_HEADER, entity_name);
    headers
}

/// `X-Total-Count` and `Link` headers for a page of a collection
pub fn pagination_headers<T>(page: &Page<T>, base_url: &str) -> HeaderMap {
    link_headers(page, base_url, None)
}

/// Like [`pagination_headers`], with the search query carried in every link
pub fn search_pagination_headers<T>(query: &str, page: &Page<T>, base_url: &str) -> HeaderMap {
    link_headers(page, base_url, Some(&percent_encode(query)))
}

fn link_headers<T>(page: &Page<T>, base_url: &str, query: Option<&str>) -> HeaderMap {
    let mut headers = HeaderMap::new();
    insert(
        &mut headers,
        TOTAL_COUNT_HEADER,
        &page.total_elements.to_string(),
    );

    let link = |number: u64, rel: &str| {
        format!(
            "<{}>; rel=\"{}\"",
            generate_uri(base_url, number, page.size, query),
            rel
        )
    };

    let mut links = Vec::with_capacity(4);
    if let Some(next) = page.number.checked_add(1).filter(|_| page.has_next()) {
        links.push(link(next, "next"));
    }
    if page.has_previous() {
        links.push(link(page.number - 1, "prev"));
    }
    let last_page = page.total_pages().saturating_sub(1);
    links.push(link(last_page, "last"));
    links.push(link(0, "first"));

    insert(&mut headers, header::LINK, &links.join(","));
    headers
}

fn generate_uri(base_url: &str, page: u64, size: u64, query: Option<&str>) -> String {
    let mut uri = format!("{}?page={}&size={}", base_url, page, size);
    if let Some(query) = query {
        uri.push_str("&query=");
        uri.push_str(query);
    }
    uri
}

/// Percent-encode everything outside the URI unreserved set
fn percent_encode(value: &str) -> String {
    let mut encoded = String::with_capacity(value.len());
    for byte in value.bytes() {
        match byte {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'_' | b'.' | b'~' => {
                encoded.push(byte as char)
            },
            _ => encoded.push_str(&format!("%{:02X}", byte)),
        }
    }
    encoded
}
