mod report_types;
mod types;

pub use report_types::*;
pub use types::*;
