pub mod renderer;
pub mod shift_report;

pub use renderer::ReportRenderer;
pub use shift_report::{categorize, CategoryMatch, ShiftReport, CATEGORY_SEPARATOR};
