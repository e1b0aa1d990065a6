use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A persisted record tying every known alias of one organizer to a primary id.
///
/// `alternate_ids` and `name_variants` never contain `primary_id`; the
/// mutators on this type keep that invariant.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrganizerMapping {
	/// Canonical id of the organizer.
	pub primary_id: String,
	/// Name shown in the UI.
	pub preferred_name: String,
	/// Other source ids that refer to this organizer.
	#[serde(default)]
	pub alternate_ids: BTreeSet<String>,
	/// Other spellings of the organizer's name.
	#[serde(default)]
	pub name_variants: BTreeSet<String>,
	/// Chapter the organizer belongs to.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub chapter: Option<String>,
	/// Contact email.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub email: Option<String>,
	/// Contact phone number.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub phone: Option<String>,
	/// Primary ids of the records folded into this one.
	#[serde(default)]
	pub merged_from_ids: BTreeSet<String>,
	/// When the last merge into this record happened.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub merged_at: Option<DateTime<Utc>>,
}

/// Which alias set a variant belongs to.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum VariantKind {
	/// A source-system id.
	Id,
	/// A spelling of the name.
	Name,
}

pub(crate) fn same_token(a: &str, b: &str) -> bool {
	a.trim().eq_ignore_ascii_case(b.trim())
}

fn contains_token(set: &BTreeSet<String>, token: &str) -> bool {
	set.iter().any(|v| same_token(v, token))
}

impl OrganizerMapping {
	/// New mapping with no aliases. An empty `preferred_name` falls back to the id.
	pub fn new(primary_id: impl Into<String>, preferred_name: impl Into<String>) -> Self {
		let primary_id = primary_id.into();
		let mut preferred_name = preferred_name.into();
		if preferred_name.trim().is_empty() {
			preferred_name = primary_id.clone();
		}
		Self {
			primary_id,
			preferred_name,
			..Self::default()
		}
	}

	/// Whether `token` is one of this mapping's alternate ids.
	pub fn has_alternate_id(&self, token: &str) -> bool {
		contains_token(&self.alternate_ids, token)
	}

	/// Whether `token` is one of this mapping's name variants.
	pub fn has_name_variant(&self, token: &str) -> bool {
		contains_token(&self.name_variants, token)
	}

	/// Adds an alias. Returns `false` when nothing changed.
	pub fn add_variant(&mut self, token: &str, kind: VariantKind) -> bool {
		let token = token.trim();
		if token.is_empty() || same_token(token, &self.primary_id) {
			return false;
		}
		let set = match kind {
			VariantKind::Id => &mut self.alternate_ids,
			VariantKind::Name => &mut self.name_variants,
		};
		if contains_token(set, token) {
			return false;
		}
		set.insert(token.to_string())
	}

	/// Folds `other` into `self`. `self` keeps its primary id and preferred name;
	/// `other`'s primary id becomes an alternate id and its preferred name a variant.
	pub fn absorb(&mut self, other: &OrganizerMapping, at: DateTime<Utc>) {
		self.add_variant(&other.primary_id, VariantKind::Id);
		for id in &other.alternate_ids {
			self.add_variant(id, VariantKind::Id);
		}
		if !same_token(&other.preferred_name, &self.preferred_name) {
			self.add_variant(&other.preferred_name, VariantKind::Name);
		}
		for name in &other.name_variants {
			self.add_variant(name, VariantKind::Name);
		}
		if self.chapter.is_none() {
			self.chapter.clone_from(&other.chapter);
		}
		if self.email.is_none() {
			self.email.clone_from(&other.email);
		}
		if self.phone.is_none() {
			self.phone.clone_from(&other.phone);
		}
		self.merged_from_ids.insert(other.primary_id.clone());
		self.merged_from_ids.extend(other.merged_from_ids.iter().cloned());
		self.merged_at = Some(at);
	}
}
