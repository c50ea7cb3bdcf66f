//! Request handler module
//!
//! Method dispatch, path resolution and static file serving from the
//! document root. Headers added by interceptors are applied afterwards by
//! the connection layer, never here.

pub mod listing;
pub mod router;
pub mod static_files;

// Re-export main entry point
pub use router::handle_request;
