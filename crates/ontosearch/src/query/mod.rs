//! User query language.
//!
//! Queries are `AND`-joined blocks. A block is free text, a bare resource
//! identifier, or `field:term`. Standard fields are matched by name; any
//! other field is matched against every widget-prefixed variant of its slug.

pub mod acl;
pub mod block;
pub mod compiler;

pub use acl::{AccessControl, UseAcl, access_clause};
pub use block::{QueryBlock, parse_block, parse_query, sanitize};
pub use compiler::{QueryCompiler, STANDARD_FIELDS, SortDirection, WIDGET_PREFIXES, slugify};
