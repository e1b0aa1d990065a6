use indexmap::IndexMap;

use super::mapping::OrganizerMapping;
use crate::error::StoreError;

/// Key-value persistence for organizer mappings.
///
/// Implementations are usually network-backed and may fail transiently;
/// callers propagate every error.
pub trait MappingStore {
	/// Every stored mapping.
	fn list(&self) -> Result<Vec<OrganizerMapping>, StoreError>;
	/// Inserts or replaces the mapping keyed by its primary id.
	fn upsert(&mut self, mapping: &OrganizerMapping) -> Result<(), StoreError>;
	/// Removes the mapping with this primary id. Removing a missing id is not an error.
	fn delete(&mut self, primary_id: &str) -> Result<(), StoreError>;
}

/// Process-local store, used by the demo page and tests.
#[derive(Debug, Default)]
pub struct InMemoryMappingStore {
	records: IndexMap<String, OrganizerMapping>,
	fail_writes: Option<String>,
	fail_deletes: Option<String>,
}

impl InMemoryMappingStore {
	/// Store seeded with `mappings`.
	pub fn with_mappings(mappings: impl IntoIterator<Item = OrganizerMapping>) -> Self {
		Self {
			records: mappings
				.into_iter()
				.map(|m| (m.primary_id.clone(), m))
				.collect(),
			fail_writes: None,
			fail_deletes: None,
		}
	}

	/// Makes every later write fail with [`StoreError::Unavailable`].
	pub fn fail_writes(&mut self, reason: impl Into<String>) {
		self.fail_writes = Some(reason.into());
	}

	/// Makes later deletes fail while upserts still succeed.
	pub fn fail_deletes(&mut self, reason: impl Into<String>) {
		self.fail_deletes = Some(reason.into());
	}

	/// Re-enables writes and deletes.
	pub fn heal(&mut self) {
		self.fail_writes = None;
		self.fail_deletes = None;
	}

	/// Stored record by primary id.
	pub fn get(&self, primary_id: &str) -> Option<&OrganizerMapping> {
		self.records.get(primary_id)
	}

	/// Number of stored records.
	pub fn len(&self) -> usize {
		self.records.len()
	}

	/// Whether the store holds no records.
	pub fn is_empty(&self) -> bool {
		self.records.is_empty()
	}

	fn check_writable(&self) -> Result<(), StoreError> {
		match &self.fail_writes {
			Some(reason) => Err(StoreError::Unavailable(reason.clone())),
			None => Ok(()),
		}
	}
}

impl MappingStore for InMemoryMappingStore {
	fn list(&self) -> Result<Vec<OrganizerMapping>, StoreError> {
		Ok(self.records.values().cloned().collect())
	}

	fn upsert(&mut self, mapping: &OrganizerMapping) -> Result<(), StoreError> {
		self.check_writable()?;
		if mapping.primary_id.trim().is_empty() {
			return Err(StoreError::Rejected {
				id: mapping.primary_id.clone(),
				reason: "empty primary id".into(),
			});
		}
		self.records
			.insert(mapping.primary_id.clone(), mapping.clone());
		Ok(())
	}

	fn delete(&mut self, primary_id: &str) -> Result<(), StoreError> {
		self.check_writable()?;
		if let Some(reason) = &self.fail_deletes {
			return Err(StoreError::Unavailable(reason.clone()));
		}
		self.records.shift_remove(primary_id);
		Ok(())
	}
}

impl<S: MappingStore + ?Sized> MappingStore for Box<S> {
	fn list(&self) -> Result<Vec<OrganizerMapping>, StoreError> {
		(**self).list()
	}

	fn upsert(&mut self, mapping: &OrganizerMapping) -> Result<(), StoreError> {
		(**self).upsert(mapping)
	}

	fn delete(&mut self, primary_id: &str) -> Result<(), StoreError> {
		(**self).delete(primary_id)
	}
}
