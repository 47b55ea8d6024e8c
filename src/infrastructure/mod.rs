// File-backed adapters behind the domain ports. All I/O lives here; the
// application layer never touches the filesystem.

pub mod csv_store;
pub mod model_store;
