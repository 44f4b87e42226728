//! Terminal output

pub mod progress;

pub use progress::{EventRenderer, format_event};
