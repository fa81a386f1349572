//! Integration test suite.
//!
//! Tests are organized by area:
//! 1. Reader caching and resolution counts
//! 2. Contiguous views and copy fallback
//! 3. Schema evolution across chained sources
//! 4. Counted arrays
//! 5. Nested access: object members, pointers, collections
//! 6. JSON chain descriptions

mod caching_tests;
mod contiguity_tests;
mod counted_array_tests;
mod description_tests;
mod helpers;
mod nested_access_tests;
