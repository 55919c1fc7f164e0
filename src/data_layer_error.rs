use std::error::Error;

///
/// Result type for `DataLayer`s. Every SQLite-backed (or in-memory)
/// data layer in the crate returns this type.
///
pub type Result<T> = std::result::Result<T, DataLayerError>;

///
/// Generic error returned by a `DataLayer`. Boxed so `sqlx` errors and
/// any other storage backend's errors can flow through `?` unchanged.
///
pub type DataLayerError = Box<dyn Error + Send + Sync>;
