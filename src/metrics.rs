use prometheus::{register_int_counter_vec, Encoder, IntCounterVec, TextEncoder};

lazy_static! {
    static ref PRINCIPAL_LOOKUPS: IntCounterVec = register_int_counter_vec!(
        "memberauth_principal_lookups_total",
        "Total number of principal lookups by outcome.",
        &["result"]
    )
    .unwrap();
    static ref HTTP_REQUESTS: IntCounterVec = register_int_counter_vec!(
        "memberauth_http_requests_total",
        "Total number of HTTP requests served by path and status code.",
        &["path", "status"]
    )
    .unwrap();
}

/// Counts a principal lookup. `result` is one of found, not_found or error.
pub fn inc_lookup(result: &str) {
    PRINCIPAL_LOOKUPS.with_label_values(&[result]).inc();
}

pub fn inc_http_request(path: &str, status: u16) {
    let status = status.to_string();
    HTTP_REQUESTS.with_label_values(&[path, status.as_str()]).inc();
}

pub fn gather() -> Vec<u8> {
    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();
    let mut buffer = vec![];
    if let Err(e) = encoder.encode(&metric_families, &mut buffer) {
        return format!("# could not encode metrics: {}\n", e).into_bytes();
    }
    buffer
}
