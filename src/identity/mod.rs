//! Identity resolution: persisted organizer mappings and the heuristic
//! first-name merge index.

mod mapping;
pub mod merge_index;
mod resolver;
mod store;

pub use mapping::{OrganizerMapping, VariantKind};
pub use merge_index::{NameMergeCache, NameMergeIndex, normalize_first_name};
pub use resolver::{IdentityResolver, resolve_in};
pub use store::{InMemoryMappingStore, MappingStore};
