use chrono::Utc;
use log::{info, warn};

use super::mapping::{OrganizerMapping, VariantKind, same_token};
use super::store::MappingStore;
use crate::error::{IdentityError, Result};

/// Finds the mapping a raw token refers to.
///
/// Matching is case-insensitive and exact. Fields are checked in priority
/// order across the whole set (primary id, alternate ids, preferred name,
/// name variants), so a primary-id hit always wins regardless of where the
/// mapping sits in `mappings`. Within one field the first mapping wins.
pub fn resolve_in<'a>(
	mappings: &'a [OrganizerMapping],
	token: &str,
) -> Option<&'a OrganizerMapping> {
	let token = token.trim();
	if token.is_empty() {
		return None;
	}
	mappings
		.iter()
		.find(|m| same_token(&m.primary_id, token))
		.or_else(|| mappings.iter().find(|m| m.has_alternate_id(token)))
		.or_else(|| mappings.iter().find(|m| same_token(&m.preferred_name, token)))
		.or_else(|| mappings.iter().find(|m| m.has_name_variant(token)))
}

/// Resolves raw organizer tokens against persisted mappings and applies
/// create, merge and variant edits.
///
/// The in-memory list only changes after the store accepted the write.
pub struct IdentityResolver<S> {
	store: S,
	mappings: Vec<OrganizerMapping>,
}

impl<S: MappingStore> IdentityResolver<S> {
	/// Loads every mapping from `store`.
	pub fn load(store: S) -> Result<Self> {
		let mappings = store.list()?;
		info!("Loaded {} organizer mappings", mappings.len());
		Ok(Self { store, mappings })
	}

	/// Committed mappings.
	pub fn mappings(&self) -> &[OrganizerMapping] {
		&self.mappings
	}

	/// The backing store.
	pub fn store(&self) -> &S {
		&self.store
	}

	/// Mutable access to the backing store.
	pub fn store_mut(&mut self) -> &mut S {
		&mut self.store
	}

	/// Mapping `token` refers to, if any.
	pub fn resolve(&self, token: &str) -> Option<&OrganizerMapping> {
		resolve_in(&self.mappings, token)
	}

	fn position(&self, primary_id: &str) -> Option<usize> {
		self.mappings
			.iter()
			.position(|m| same_token(&m.primary_id, primary_id))
	}

	fn commit(&mut self, mapping: OrganizerMapping) -> usize {
		match self.position(&mapping.primary_id) {
			Some(idx) => {
				self.mappings[idx] = mapping;
				idx
			}
			None => {
				self.mappings.push(mapping);
				self.mappings.len() - 1
			}
		}
	}

	/// Resolves `token`, creating a mapping keyed by it on first sighting.
	pub fn resolve_or_create(
		&mut self,
		token: &str,
		name_hint: Option<&str>,
	) -> Result<&OrganizerMapping> {
		if let Some(idx) = self.resolve(token).and_then(|m| self.position(&m.primary_id)) {
			return Ok(&self.mappings[idx]);
		}
		let mapping = OrganizerMapping::new(token.trim(), name_hint.unwrap_or_default());
		self.store.upsert(&mapping)?;
		info!("Created organizer mapping {}", mapping.primary_id);
		let idx = self.commit(mapping);
		Ok(&self.mappings[idx])
	}

	/// Adds `token` as an id or name alias of `primary_id`.
	///
	/// A missing mapping is created first, named from `name_hint` or the id.
	/// Adding a variant that is already present is a no-op and writes nothing.
	pub fn add_variant(
		&mut self,
		primary_id: &str,
		token: &str,
		kind: VariantKind,
		name_hint: Option<&str>,
	) -> Result<&OrganizerMapping> {
		let existing = self.position(primary_id);
		let mut updated = match existing {
			Some(idx) => self.mappings[idx].clone(),
			None => OrganizerMapping::new(primary_id.trim(), name_hint.unwrap_or_default()),
		};
		let changed = updated.add_variant(token, kind);
		if let (Some(idx), false) = (existing, changed) {
			return Ok(&self.mappings[idx]);
		}
		if let Err(err) = self.store.upsert(&updated) {
			warn!("Failed to persist variant for {}: {}", primary_id, err);
			return Err(err.into());
		}
		let idx = self.commit(updated);
		Ok(&self.mappings[idx])
	}

	/// Folds `merge_id` into `primary_id` and deletes the merged record.
	///
	/// Not commutative: `primary_id` always survives. Fails with
	/// [`IdentityError::NotFound`] before touching anything if either is absent.
	///
	/// The survivor is written before the merged record is deleted. If the
	/// delete fails the error is returned with the survivor already carrying
	/// the merged aliases and both records still present, in memory and in the
	/// store alike. Primary ids resolve before alternate ids, so lookups of the
	/// merged id keep finding its own record, and retrying the merge completes it.
	pub fn merge(&mut self, primary_id: &str, merge_id: &str) -> Result<&OrganizerMapping> {
		let primary_idx = self
			.position(primary_id)
			.ok_or_else(|| IdentityError::NotFound(primary_id.to_string()))?;
		let merge_idx = self
			.position(merge_id)
			.ok_or_else(|| IdentityError::NotFound(merge_id.to_string()))?;
		if primary_idx == merge_idx {
			return Err(IdentityError::SelfMerge(primary_id.to_string()));
		}

		let merged = self.mappings[merge_idx].clone();
		let mut survivor = self.mappings[primary_idx].clone();
		survivor.absorb(&merged, Utc::now());

		self.store.upsert(&survivor)?;
		let survivor_id = survivor.primary_id.clone();
		self.commit(survivor);

		self.store.delete(&merged.primary_id)?;
		self.mappings.retain(|m| m.primary_id != merged.primary_id);
		info!("Merged organizer {} into {}", merged.primary_id, survivor_id);

		let idx = self
			.position(&survivor_id)
			.ok_or(IdentityError::NotFound(survivor_id))?;
		Ok(&self.mappings[idx])
	}
}
