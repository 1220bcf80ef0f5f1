//! Per-backend protocol extraction.
//!
//! One compiled backend goes in, one [`Protocol`](netproto_schema::Protocol)
//! comes out. The two backend dialects are two implementations of
//! [`ProtocolExtractor`]; everything downstream is dialect-agnostic.
//!
//! - [`resolver`]: runtime type references -> portable field types, plus the
//!   work-list walk over the reachable type graph
//! - [`mono`] / [`il2cpp`]: the two endpoint-table recovery dialects
//! - [`names`]: observed-literal field-name normalization
//! - [`cursor`]: bounded-lookahead instruction cursor for the pattern scans
//! - [`error`]: the fatal failure taxonomy
//!
//! Extraction either completes deterministically or fails fast on an unmet
//! structural assumption; local pattern mismatches are silent skips.

pub mod cursor;
pub mod dialect;
pub mod error;
pub mod il2cpp;
pub mod mono;
pub mod names;
pub mod resolver;

pub use cursor::InstrCursor;
pub use dialect::{Anchors, ProtocolExtractor};
pub use error::ExtractError;
pub use il2cpp::Il2CppExtractor;
pub use mono::MonoExtractor;
pub use names::{canonical_form, harvest_literals, NameMap};
pub use resolver::{resolve_protocol, TypeResolver};
