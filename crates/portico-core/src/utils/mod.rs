//! Utility types and functions for the portico framework.
//!
//! - [`MultiValueDict`]: an insertion-ordered dictionary holding several values per key.
//! - [`text`]: string helpers used by route validation and URL generation.

mod multi_value_dict;
pub mod text;

pub use multi_value_dict::MultiValueDict;
