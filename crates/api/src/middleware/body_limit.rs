use axum::extract::DefaultBodyLimit;

/// Cap request bodies at `max_bytes`. Oversize bodies fail inside the `Json`
/// extractor, so they are answered like any other rejected body.
pub fn body_limit_layer(max_bytes: usize) -> DefaultBodyLimit {
    DefaultBodyLimit::max(max_bytes)
}
