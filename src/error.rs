//! Error taxonomy for ingestion, identity resolution and the mapping store.

use thiserror::Error;

/// A malformed input record. Always recovered locally by skipping the record.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RecordError {
	/// A field the record cannot exist without is absent or blank.
	#[error("{record} record is missing `{field}`")]
	MissingField {
		/// Kind of record (`member`, `team`, `meeting`).
		record: &'static str,
		/// Name of the missing field.
		field: &'static str,
	},

	/// The record is not an object of the expected shape.
	#[error("unreadable record: {0}")]
	Unreadable(String),
}

impl From<serde_json::Error> for RecordError {
	fn from(err: serde_json::Error) -> Self {
		Self::Unreadable(err.to_string())
	}
}

/// Failure reported by a [`MappingStore`](crate::identity::MappingStore).
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum StoreError {
	/// The backing service could not be reached.
	#[error("mapping store unavailable: {0}")]
	Unavailable(String),

	/// The backing service refused the write.
	#[error("mapping store rejected `{id}`: {reason}")]
	Rejected {
		/// Primary id of the record being written.
		id: String,
		/// Reason given by the store.
		reason: String,
	},
}

/// Errors surfaced by [`IdentityResolver`](crate::identity::IdentityResolver) operations.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum IdentityError {
	/// No mapping exists with the given primary id.
	#[error("no organizer mapping with primary id `{0}`")]
	NotFound(String),

	/// A mapping cannot be merged into itself.
	#[error("cannot merge organizer mapping `{0}` into itself")]
	SelfMerge(String),

	/// The store refused or failed the write; in-memory state is unchanged.
	#[error(transparent)]
	Store(#[from] StoreError),
}

/// Result alias for identity operations.
pub type Result<T> = std::result::Result<T, IdentityError>;
