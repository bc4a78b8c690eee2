// Request handling module entry point
// Dispatches requests to the static file handler and finalizes responses

pub mod router;
pub mod static_files;

pub use router::handle_request;
