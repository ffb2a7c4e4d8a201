pub mod application;
pub mod domain;
pub mod infrastructure;

pub use application::commands::AppState;
pub use application::reconcile::{ReconcileReport, ReconcileService};
pub use application::recorder::SessionRecorder;
pub use application::timer::TimerService;
pub use domain::models::{TaskRecord, normalize_task_name};
pub use infrastructure::error::InfraError;
