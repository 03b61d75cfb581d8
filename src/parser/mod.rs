pub mod duration;

pub use duration::{DurationParseError, parse_duration};
