//! Query serialization
//!
//! Turns a [`QueryOptions`] snapshot into the flat, order-stable parameter
//! list the server expects. The filter map is the base parameter set so
//! caller-supplied filter keys pass through untouched; the reserved keys
//! (`page`, `rows`, `sord`, `sidx`) overwrite a colliding filter key rather
//! than duplicating it.

use crate::types::{QueryOptions, TriggerKind};

/// Flat `key=value` parameter sequence suitable for a URL query string.
pub type TransportParams = Vec<(String, String)>;

/// Serializes options into transport parameters.
///
/// A `Filter` trigger forces `page` to `"1"` regardless of the supplied
/// current page. `sord`/`sidx` are omitted entirely when unsorted rather
/// than serialized with empty values.
pub fn serialize(trigger: TriggerKind, options: &QueryOptions) -> TransportParams {
    let mut params: TransportParams = options
        .filter
        .iter()
        .map(|(key, value)| (key.clone(), value.clone()))
        .collect();

    let page = if trigger == TriggerKind::Filter {
        "1".to_string()
    } else {
        options.current_page.clone()
    };
    set_param(&mut params, "page", page);
    set_param(&mut params, "rows", options.page_size.clone());

    if let Some(sord) = options.sort_order.as_param() {
        set_param(&mut params, "sord", sord.to_string());
    }
    if !options.sorted_column.is_empty() {
        set_param(&mut params, "sidx", options.sorted_column.clone());
    }

    params
}

/// Percent-encodes parameters into a query string.
pub fn query_string(params: &TransportParams) -> String {
    url::form_urlencoded::Serializer::new(String::new())
        .extend_pairs(params.iter().map(|(k, v)| (k.as_str(), v.as_str())))
        .finish()
}

// Replace-in-place keeps the parameter order stable when a reserved key
// collides with a filter key.
fn set_param(params: &mut TransportParams, key: &str, value: String) {
    match params.iter_mut().find(|(k, _)| k == key) {
        Some(entry) => entry.1 = value,
        None => params.push((key.to_string(), value)),
    }
}
