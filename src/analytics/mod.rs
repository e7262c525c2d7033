pub mod sales_analyzer;
pub mod sales_filter;

pub use sales_analyzer::*;
pub use sales_filter::*;
