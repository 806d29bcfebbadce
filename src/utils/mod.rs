pub mod text;
pub mod token_estimator;

pub use text::{clean_code_snippet, collapse_whitespace, html_to_text, truncate_chars};
pub use token_estimator::TokenEstimator;
