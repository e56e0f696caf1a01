pub mod protocol;
pub mod rest;
pub mod router;
pub mod state;

// Re-export the router builder so the binary and the tests assemble the same app.
pub use router::build_router;
pub use state::AppState;
