//! Heuristic first-name index that folds same-person records from different
//! sources onto one canonical raw id.
//!
//! Collisions between unrelated people who share a (normalized) first name
//! are merged too. That false-positive risk is accepted.

use std::collections::hash_map::DefaultHasher;
use std::collections::HashMap;
use std::hash::{Hash, Hasher};

use indexmap::IndexMap;
use log::debug;

use crate::graph::records::{Meeting, Team};

/// Nicknames folded onto one spelling before grouping.
const NAME_VARIANTS: &[(&str, &str)] = &[
	("abby", "abigail"),
	("alex", "alexander"),
	("andy", "andrew"),
	("ben", "benjamin"),
	("beth", "elizabeth"),
	("bill", "william"),
	("bob", "robert"),
	("chris", "christopher"),
	("dan", "daniel"),
	("danny", "daniel"),
	("dave", "david"),
	("drew", "andrew"),
	("jen", "jennifer"),
	("jenny", "jennifer"),
	("jim", "james"),
	("jimmy", "james"),
	("joe", "joseph"),
	("jon", "jonathan"),
	("kate", "katherine"),
	("katie", "katherine"),
	("kathy", "katherine"),
	("liz", "elizabeth"),
	("matt", "matthew"),
	("mike", "michael"),
	("nick", "nicholas"),
	("rob", "robert"),
	("sam", "samuel"),
	("stephen", "steven"),
	("steve", "steven"),
	("tom", "thomas"),
	("tony", "anthony"),
	("will", "william"),
];

/// Lower-cased first token of `name`, stripped of punctuation and mapped
/// through the nickname table. `None` when nothing usable remains.
pub fn normalize_first_name(name: &str) -> Option<String> {
	let first: String = name
		.split_whitespace()
		.next()?
		.chars()
		.filter(|c| c.is_alphanumeric())
		.flat_map(char::to_lowercase)
		.collect();
	if first.is_empty() {
		return None;
	}
	let canonical = NAME_VARIANTS
		.iter()
		.find(|(nick, _)| *nick == first)
		.map(|(_, full)| (*full).to_string());
	Some(canonical.unwrap_or(first))
}

/// `raw id -> canonical raw id` for records the heuristic judged to be the same person.
///
/// Ids that map to themselves are not stored.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct NameMergeIndex {
	aliases: HashMap<String, String>,
}

impl NameMergeIndex {
	/// Builds the index from rosters and meetings.
	///
	/// Roster members are grouped by normalized first name; the first id seen
	/// in each group is canonical. A meeting organizer whose normalized first
	/// name matches a roster group is mapped onto that group, even when the
	/// organizer never appears on a roster.
	pub fn build(teams: &[Team], meetings: &[Meeting]) -> Self {
		let mut groups: IndexMap<String, Vec<&str>> = IndexMap::new();
		for member in teams.iter().flat_map(|t| &t.members) {
			let Some(key) = normalize_first_name(&member.name) else {
				continue;
			};
			let ids = groups.entry(key).or_default();
			if !ids.contains(&member.id.as_str()) {
				ids.push(&member.id);
			}
		}

		let mut aliases = HashMap::new();
		for ids in groups.values() {
			let canonical = ids[0];
			for id in &ids[1..] {
				aliases.insert((*id).to_string(), canonical.to_string());
			}
		}

		for meeting in meetings {
			let organizer = &meeting.organizer;
			let Some(key) = normalize_first_name(&organizer.name) else {
				continue;
			};
			if let Some(ids) = groups.get(&key) {
				if ids[0] != organizer.id {
					aliases.insert(organizer.id.clone(), ids[0].to_string());
				}
			}
		}

		debug!(
			"Name merge index: {} name groups, {} aliases",
			groups.len(),
			aliases.len()
		);
		Self { aliases }
	}

	/// Canonical raw id for `raw_id`; the id itself when unmapped.
	pub fn canonical<'a>(&'a self, raw_id: &'a str) -> &'a str {
		self.aliases.get(raw_id).map_or(raw_id, String::as_str)
	}

	/// Number of non-identity entries.
	pub fn len(&self) -> usize {
		self.aliases.len()
	}

	/// Whether no merges were found.
	pub fn is_empty(&self) -> bool {
		self.aliases.is_empty()
	}
}

/// Memoizes [`NameMergeIndex::build`] for one `(teams, meetings)` input pair.
#[derive(Debug, Default)]
pub struct NameMergeCache {
	fingerprint: Option<u64>,
	index: NameMergeIndex,
}

impl NameMergeCache {
	/// Cached index, rebuilt when either input changed since the last call.
	pub fn get_or_build(&mut self, teams: &[Team], meetings: &[Meeting]) -> &NameMergeIndex {
		let mut hasher = DefaultHasher::new();
		teams.hash(&mut hasher);
		meetings.hash(&mut hasher);
		let fingerprint = hasher.finish();
		if self.fingerprint != Some(fingerprint) {
			self.index = NameMergeIndex::build(teams, meetings);
			self.fingerprint = Some(fingerprint);
		}
		&self.index
	}

	/// Drops the cached index.
	pub fn invalidate(&mut self) {
		self.fingerprint = None;
	}
}
