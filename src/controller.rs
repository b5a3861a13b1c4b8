// Controller module root
pub mod context;
pub mod control_surface;
pub mod controller_handler;

pub use context::AppContext;
pub use control_surface::{ControlSurface, SourceStatus, ToggleOutcome};
pub use controller_handler::Controller;
