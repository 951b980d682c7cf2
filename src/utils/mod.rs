pub mod logging;

pub use logging::{trace_phase, truncate_text};
