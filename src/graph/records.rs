//! Ingestion schema for roster and meeting records.
//!
//! Source data is loosely typed: ids arrive as strings or numbers, keys
//! arrive in camelCase or snake_case, and any field may be missing. Every
//! record passes through exactly one validation step here; the builder only
//! ever sees the strict types.

use log::debug;
use serde::{Deserialize, Deserializer};
use serde_json::Value;

use super::model::EngagementLevel;
use crate::error::RecordError;

fn loose_string<'de, D: Deserializer<'de>>(de: D) -> Result<Option<String>, D::Error> {
	Ok(match Option::<Value>::deserialize(de)? {
		Some(Value::String(s)) => Some(s),
		Some(Value::Number(n)) => Some(n.to_string()),
		Some(Value::Bool(b)) => Some(b.to_string()),
		_ => None,
	})
}

fn loose_list<'de, D: Deserializer<'de>>(de: D) -> Result<Vec<Value>, D::Error> {
	Ok(match Option::<Value>::deserialize(de)? {
		Some(Value::Array(items)) => items,
		_ => Vec::new(),
	})
}

fn non_blank(value: Option<String>) -> Option<String> {
	value
		.map(|v| v.trim().to_string())
		.filter(|v| !v.is_empty())
}

/// A record shape that accepts several spellings of the same key.
pub trait LooseRecord: for<'de> Deserialize<'de> {
	/// Accepted spellings per field, canonical name first.
	const KEYS: &'static [&'static [&'static str]];
}

/// Reads one record, keeping only the first non-null spelling of each field
/// in `T::KEYS` order.
pub fn read_record<T: LooseRecord>(item: &Value) -> Result<T, serde_json::Error> {
	let mut item = item.clone();
	if let Value::Object(map) = &mut item {
		for spellings in T::KEYS {
			let mut kept = false;
			for key in *spellings {
				let present = map.get(*key).map(|v| !v.is_null());
				match present {
					Some(true) if !kept => kept = true,
					Some(_) => {
						map.remove(*key);
					}
					None => {}
				}
			}
		}
	}
	T::deserialize(item)
}

/// Roster member as it arrives.
#[derive(Clone, Debug, Default, Deserialize)]
#[serde(default)]
pub struct RawMember {
	#[serde(
		alias = "vanId",
		alias = "van_id",
		alias = "memberId",
		deserialize_with = "loose_string"
	)]
	id: Option<String>,
	#[serde(alias = "fullName", alias = "full_name", deserialize_with = "loose_string")]
	name: Option<String>,
	#[serde(deserialize_with = "loose_string")]
	role: Option<String>,
	#[serde(alias = "section", alias = "group", deserialize_with = "loose_string")]
	chapter: Option<String>,
	#[serde(alias = "loe", alias = "levelOfEngagement", deserialize_with = "loose_string")]
	engagement: Option<String>,
}

/// Team roster as it arrives.
#[derive(Clone, Debug, Default, Deserialize)]
#[serde(default)]
pub struct RawTeam {
	#[serde(alias = "teamId", deserialize_with = "loose_string")]
	id: Option<String>,
	#[serde(alias = "teamName", deserialize_with = "loose_string")]
	name: Option<String>,
	#[serde(alias = "section", alias = "group", deserialize_with = "loose_string")]
	chapter: Option<String>,
	#[serde(alias = "teamMembers", deserialize_with = "loose_list")]
	members: Vec<Value>,
}

/// Meeting log entry as it arrives.
#[derive(Clone, Debug, Default, Deserialize)]
#[serde(default)]
pub struct RawMeeting {
	#[serde(alias = "meetingId", deserialize_with = "loose_string")]
	id: Option<String>,
	#[serde(alias = "organizerId", alias = "organizerVanId", deserialize_with = "loose_string")]
	organizer_id: Option<String>,
	#[serde(alias = "organizerName", alias = "organizer", deserialize_with = "loose_string")]
	organizer_name: Option<String>,
	#[serde(
		alias = "participantId",
		alias = "participantVanId",
		alias = "vanid",
		deserialize_with = "loose_string"
	)]
	participant_id: Option<String>,
	#[serde(alias = "participantName", alias = "participant", deserialize_with = "loose_string")]
	participant_name: Option<String>,
	#[serde(alias = "date", alias = "datestamp", deserialize_with = "loose_string")]
	timestamp: Option<String>,
	#[serde(
		alias = "type",
		alias = "meetingType",
		alias = "category",
		deserialize_with = "loose_string"
	)]
	meeting_type: Option<String>,
	#[serde(deserialize_with = "loose_string")]
	result: Option<String>,
	#[serde(alias = "section", alias = "group", deserialize_with = "loose_string")]
	chapter: Option<String>,
	#[serde(alias = "loe", alias = "participantLoe", deserialize_with = "loose_string")]
	participant_engagement: Option<String>,
}

impl LooseRecord for RawMember {
	const KEYS: &'static [&'static [&'static str]] = &[
		&["id", "vanId", "van_id", "memberId"],
		&["name", "fullName", "full_name"],
		&["chapter", "section", "group"],
		&["engagement", "loe", "levelOfEngagement"],
	];
}

impl LooseRecord for RawTeam {
	const KEYS: &'static [&'static [&'static str]] = &[
		&["id", "teamId"],
		&["name", "teamName"],
		&["chapter", "section", "group"],
		&["members", "teamMembers"],
	];
}

impl LooseRecord for RawMeeting {
	const KEYS: &'static [&'static [&'static str]] = &[
		&["id", "meetingId"],
		&["organizer_id", "organizerId", "organizerVanId"],
		&["organizer_name", "organizerName", "organizer"],
		&["participant_id", "participantId", "participantVanId", "vanid"],
		&["participant_name", "participantName", "participant"],
		&["timestamp", "date", "datestamp"],
		&["meeting_type", "type", "meetingType", "category"],
		&["chapter", "section", "group"],
		&["participant_engagement", "loe", "participantLoe"],
	];
}

/// Validated roster member.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Member {
	/// Raw source id. Falls back to the lower-cased name when the source has none.
	pub id: String,
	/// Display name.
	pub name: String,
	/// Roster role string.
	pub role: Option<String>,
	/// Chapter or group, inherited from the team when absent.
	pub chapter: Option<String>,
	/// Engagement bucket.
	pub engagement: EngagementLevel,
}

/// Validated team roster.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Team {
	/// Team id.
	pub id: String,
	/// Team name.
	pub name: String,
	/// Chapter or group.
	pub chapter: Option<String>,
	/// Valid members, in roster order.
	pub members: Vec<Member>,
}

/// One side of a meeting.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct PersonRef {
	/// Raw source id.
	pub id: String,
	/// Display name.
	pub name: String,
}

/// Validated meeting log entry.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Meeting {
	/// Meeting id.
	pub id: String,
	/// Who ran the conversation.
	pub organizer: PersonRef,
	/// Who they talked to.
	pub participant: PersonRef,
	/// When it happened.
	pub timestamp: Option<String>,
	/// Meeting type.
	pub category: Option<String>,
	/// Result tag.
	pub result: Option<String>,
	/// Chapter the meeting was logged under.
	pub chapter: Option<String>,
	/// Participant's engagement bucket.
	pub participant_engagement: EngagementLevel,
}

fn person(
	record: &'static str,
	field: &'static str,
	id: Option<String>,
	name: Option<String>,
) -> Result<PersonRef, RecordError> {
	match (non_blank(id), non_blank(name)) {
		(Some(id), Some(name)) => Ok(PersonRef { id, name }),
		(Some(id), None) => Ok(PersonRef {
			name: id.clone(),
			id,
		}),
		(None, Some(name)) => Ok(PersonRef {
			id: name.to_lowercase(),
			name,
		}),
		(None, None) => Err(RecordError::MissingField { record, field }),
	}
}

impl RawMember {
	/// Checks required fields.
	pub fn validate(self, team_chapter: Option<&str>) -> Result<Member, RecordError> {
		let PersonRef { id, name } = person("member", "id", self.id, self.name)?;
		Ok(Member {
			id,
			name,
			role: non_blank(self.role),
			chapter: non_blank(self.chapter).or_else(|| team_chapter.map(str::to_string)),
			engagement: self
				.engagement
				.as_deref()
				.map(EngagementLevel::parse)
				.unwrap_or_default(),
		})
	}
}

impl RawTeam {
	/// Checks required fields; malformed members are dropped individually.
	pub fn validate(self) -> Result<Team, RecordError> {
		let (id, name) = match (non_blank(self.id), non_blank(self.name)) {
			(Some(id), Some(name)) => (id, name),
			(Some(id), None) => (id.clone(), id),
			(None, Some(name)) => (name.clone(), name),
			(None, None) => {
				return Err(RecordError::MissingField {
					record: "team",
					field: "id",
				});
			}
		};
		let chapter = non_blank(self.chapter);
		let members = self
			.members
			.iter()
			.filter_map(|item| {
				let member = read_record::<RawMember>(item)
					.map_err(RecordError::from)
					.and_then(|m| m.validate(chapter.as_deref()));
				match member {
					Ok(member) => Some(member),
					Err(err) => {
						debug!("Skipping member of team {}: {}", id, err);
						None
					}
				}
			})
			.collect();
		Ok(Team {
			id,
			name,
			chapter,
			members,
		})
	}
}

impl RawMeeting {
	/// Checks required fields. `index` names meetings whose source has no id.
	pub fn validate(self, index: usize) -> Result<Meeting, RecordError> {
		let organizer = person("meeting", "organizer", self.organizer_id, self.organizer_name)?;
		let participant = person(
			"meeting",
			"participant",
			self.participant_id,
			self.participant_name,
		)?;
		Ok(Meeting {
			id: non_blank(self.id).unwrap_or_else(|| format!("meeting-{index}")),
			organizer,
			participant,
			timestamp: non_blank(self.timestamp),
			category: non_blank(self.meeting_type),
			result: non_blank(self.result),
			chapter: non_blank(self.chapter),
			participant_engagement: self
				.participant_engagement
				.as_deref()
				.map(EngagementLevel::parse)
				.unwrap_or_default(),
		})
	}
}

/// Validates rosters, skipping malformed ones.
pub fn ingest_teams(raw: impl IntoIterator<Item = RawTeam>) -> Vec<Team> {
	raw.into_iter()
		.filter_map(|t| match t.validate() {
			Ok(team) => Some(team),
			Err(err) => {
				debug!("Skipping team: {}", err);
				None
			}
		})
		.collect()
}

/// Validates meetings, skipping malformed ones.
pub fn ingest_meetings(raw: impl IntoIterator<Item = RawMeeting>) -> Vec<Meeting> {
	raw.into_iter()
		.enumerate()
		.filter_map(|(i, m)| match m.validate(i) {
			Ok(meeting) => Some(meeting),
			Err(err) => {
				debug!("Skipping meeting #{}: {}", i, err);
				None
			}
		})
		.collect()
}

/// Reads an array of records, skipping entries that are not objects of the right shape.
fn from_json_array<T: LooseRecord>(value: &Value) -> Vec<T> {
	let Some(items) = value.as_array() else {
		debug!("Expected a JSON array of records");
		return Vec::new();
	};
	items
		.iter()
		.filter_map(|item| match read_record::<T>(item) {
			Ok(record) => Some(record),
			Err(err) => {
				debug!("Skipping unreadable record: {}", err);
				None
			}
		})
		.collect()
}

/// Rosters from a JSON array.
pub fn teams_from_json(value: &Value) -> Vec<Team> {
	ingest_teams(from_json_array::<RawTeam>(value))
}

/// Meetings from a JSON array.
pub fn meetings_from_json(value: &Value) -> Vec<Meeting> {
	ingest_meetings(from_json_array::<RawMeeting>(value))
}
