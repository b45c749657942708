pub mod app;
pub mod config;
pub mod error;
pub mod extract;
pub mod handlers;
pub mod router;
pub mod state;
pub mod voice;

pub use app::build_state;
pub use router::create_router;
pub use state::AppState;
