mod format;

pub use format::{AssessmentEvent, StructuredLogger};
