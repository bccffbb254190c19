mod error;
mod plans;
mod projector;
mod types;

pub use error::ProjectionError;
pub use plans::{REGISTRY, TUITION_PER_YEAR, derive_student_balance, lookup_plan};
pub use projector::{project, sample_chart_years};
pub use types::{LoanPlan, ProjectionInput, ProjectionResult, YearRecord};
