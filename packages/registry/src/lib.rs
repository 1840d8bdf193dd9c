//! # Invitation Type Registry
//!
//! Catalog mapping a type tag to its default content and, for types that only
//! exist on the free canvas, the mapping used to turn them back into linear
//! blocks.
//!
//! ```rust,ignore
//! let registry = Arc::new(TypeRegistry::builtin());
//!
//! match registry.lookup("countdown") {
//!     TypeLookup::Known(descriptor) => descriptor.default_content(),
//!     TypeLookup::Unknown(tag) => /* render a placeholder */,
//! }
//! ```

mod builtin;
mod descriptor;
mod registry;

pub use descriptor::{Availability, InverseMapping, MappedContent, TypeDescriptor};
pub use registry::{TypeLookup, TypeRegistry};
