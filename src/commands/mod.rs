pub mod apply;
pub mod import;
pub mod plan;
pub mod refresh;
pub mod schema;
pub mod state;
pub mod validate;

/// Objects refreshed in parallel before planning
pub const REFRESH_JOBS: usize = 4;
