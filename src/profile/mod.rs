//! Profile documents and the store they live in.
//! The store is a keyed document store: get-by-key, partial-update set-by-key
//! (upsert), and a list query used by the admin roster view. Role changes go
//! through `ProfileMutator` only.

mod mutator;
mod record;
mod store;

pub use mutator::{MutationOutcome, ProfileMutator};
pub use record::{ProfilePatch, ProfileRecord, Role};
pub use store::{FileProfileStore, ProfileFilter, ProfileStore};
