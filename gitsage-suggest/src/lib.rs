#![deny(missing_docs)]
//! Parse code-review suggestions out of free-form model output.
//!
//! ```
//! use gitsage_suggest::{filter_by_severity, parse_suggestions};
//!
//! let text = "1. [HIGH] Check the error\n   `open` can fail.\n2. [LOW] Rename `x`";
//! let high = filter_by_severity(parse_suggestions(text), "high");
//! assert_eq!(high.len(), 1);
//! assert_eq!(high[0].description, "`open` can fail.");
//! ```

pub mod filter;
pub mod parser;
pub mod suggestion;

pub use filter::{ALL_SEVERITIES, filter_by_severity, limit};
pub use parser::{parse_fallback, parse_structured, parse_suggestions};
pub use suggestion::{Severity, Suggestion};
