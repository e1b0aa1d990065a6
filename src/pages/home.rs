use std::collections::{BTreeSet, HashMap};

use leptos::prelude::*;
use log::{debug, error, warn};
use serde_json::Value;

use crate::components::force_graph::ForceGraphCanvas;
use crate::graph::records::{Meeting, Team, meetings_from_json, teams_from_json};
use crate::graph::{BuildOptions, EngagementLevel, GraphBuilder, GraphData, GraphNode, GraphView};
use crate::identity::{IdentityResolver, InMemoryMappingStore, NameMergeCache, OrganizerMapping};

const FIXTURE: &str = include_str!("../../assets/demo_campaign.json");

type Layouts = HashMap<GraphView, HashMap<String, (f64, f64)>>;

/// Validated inputs plus the memoized name-merge index built from them.
struct Campaign {
	teams: Vec<Team>,
	meetings: Vec<Meeting>,
	merge_cache: NameMergeCache,
}

impl Campaign {
	fn from_fixture(fixture: &Value) -> (Self, Vec<OrganizerMapping>) {
		let mappings = match serde_json::from_value(fixture["mappings"].clone()) {
			Ok(mappings) => mappings,
			Err(err) => {
				warn!("Ignoring unreadable mappings: {}", err);
				Vec::new()
			}
		};
		let campaign = Self {
			teams: teams_from_json(&fixture["teams"]),
			meetings: meetings_from_json(&fixture["meetings"]),
			merge_cache: NameMergeCache::default(),
		};
		debug!(
			"Loaded {} teams, {} meetings, {} mappings",
			campaign.teams.len(),
			campaign.meetings.len(),
			mappings.len()
		);
		(campaign, mappings)
	}

	fn groups(&self) -> Vec<String> {
		let groups: BTreeSet<&str> =
			self.teams.iter().filter_map(|t| t.chapter.as_deref()).collect();
		groups.into_iter().map(str::to_string).collect()
	}

	fn build(&mut self, options: &BuildOptions, mappings: &[OrganizerMapping]) -> GraphData {
		let merge = self.merge_cache.get_or_build(&self.teams, &self.meetings);
		GraphBuilder::new(&self.teams, &self.meetings, merge)
			.with_mappings(mappings)
			.build(options)
	}

	fn meeting_rows(&self) -> Vec<(String, String)> {
		self.meetings
			.iter()
			.map(|m| {
				let kind = m.category.as_deref().unwrap_or("Meeting");
				let when = m.timestamp.as_deref().unwrap_or("undated");
				(
					m.id.clone(),
					format!("{when} · {kind}: {} → {}", m.organizer.name, m.participant.name),
				)
			})
			.collect()
	}
}

/// Default Home Page
#[component]
pub fn Home() -> impl IntoView {
	let fixture: Value = match serde_json::from_str(FIXTURE) {
		Ok(value) => value,
		Err(err) => {
			error!("Demo data unreadable: {}", err);
			return view! {
				<div class="error">
					<h1>"Uh oh! Something went wrong!"</h1>
					<p>{format!("Demo data unreadable: {err}")}</p>
				</div>
			}
			.into_any();
		}
	};
	let (campaign, mappings) = Campaign::from_fixture(&fixture);
	let groups = campaign.groups();
	let meeting_rows = campaign.meeting_rows();
	let campaign = StoredValue::new(campaign);

	let resolver = match IdentityResolver::load(InMemoryMappingStore::with_mappings(mappings)) {
		Ok(resolver) => Some(resolver),
		Err(err) => {
			error!("Mapping store unavailable: {}", err);
			None
		}
	};
	let mappings = RwSignal::new(
		resolver
			.as_ref()
			.map(|r| r.mappings().to_vec())
			.unwrap_or_default(),
	);
	let resolver = StoredValue::new(resolver);

	let active_view = RwSignal::new(GraphView::TeamMembers);
	let group = RwSignal::new(String::from("all"));
	let levels = RwSignal::new(EngagementLevel::ALL.into_iter().collect::<BTreeSet<_>>());
	let search = RwSignal::new(String::new());
	let selected = RwSignal::new(None::<String>);
	let hovered = RwSignal::new(None::<String>);
	let hovered_meeting = RwSignal::new(None::<String>);
	let merge_primary = RwSignal::new(String::new());
	let merge_other = RwSignal::new(String::new());
	let merge_status = RwSignal::new(None::<Result<String, String>>);
	let layouts = StoredValue::new(Layouts::new());

	let graph_data = Memo::new(move |_| {
		let view = active_view.get();
		let options = BuildOptions {
			view,
			group_filter: Some(group.get()),
			engagement_filter: (view == GraphView::ByEngagementLevel).then(|| levels.get()),
			..BuildOptions::default()
		};
		let mappings = mappings.get();
		let mut data = campaign
			.try_update_value(|c| c.build(&options, &mappings))
			.unwrap_or_default();
		layouts.with_value(|cached| {
			if let Some(layout) = cached.get(&view) {
				let restored = data.restore_layout(layout);
				debug!(
					"Restored {} of {} positions for {}",
					restored,
					data.nodes.len(),
					view.label()
				);
			}
		});
		data
	});

	let on_nodes_change = Callback::new(move |(view, nodes): (GraphView, Vec<GraphNode>)| {
		layouts.update_value(|cached| {
			cached.insert(view, GraphData::layout(&nodes));
		});
	});
	let on_node_click = Callback::new(move |id: Option<String>| selected.set(id));
	let on_node_hover = Callback::new(move |id: Option<String>| hovered.set(id));

	let node_name = move |id: Option<String>| {
		id.map(|id| {
			graph_data.with(|data| {
				data.nodes
					.iter()
					.find(|n| n.id == id)
					.map_or(id.clone(), |n| n.name.clone())
			})
		})
	};

	let do_merge = move |_| {
		let (primary, other) = (merge_primary.get_untracked(), merge_other.get_untracked());
		let outcome = resolver.try_update_value(|r| match r {
			Some(r) => r
				.merge(primary.trim(), other.trim())
				.map(|m| m.preferred_name.clone())
				.map_err(|e| e.to_string()),
			None => Err("mapping store unavailable".to_string()),
		});
		match outcome {
			Some(Ok(name)) => {
				mappings.set(resolver.with_value(|r| {
					r.as_ref().map(|r| r.mappings().to_vec()).unwrap_or_default()
				}));
				merge_status.set(Some(Ok(format!("Merged into {name}"))));
			}
			Some(Err(err)) => {
				warn!("Merge failed: {}", err);
				merge_status.set(Some(Err(err)));
			}
			None => {}
		}
	};

	view! {
		<div class="campaign-graph">
			<header class="graph-controls">
				<nav class="view-switch">
					{GraphView::ALL
						.into_iter()
						.map(|v| {
							view! {
								<button
									class:active=move || active_view.get() == v
									on:click=move |_| active_view.set(v)
								>
									{v.label()}
								</button>
							}
						})
						.collect_view()}
				</nav>
				<input
					type="search"
					placeholder="Search people, teams, groups"
					prop:value=move || search.get()
					on:input=move |ev| search.set(event_target_value(&ev))
				/>
				<select on:change=move |ev| group.set(event_target_value(&ev))>
					<option value="all">"All groups"</option>
					{groups
						.into_iter()
						.map(|g| {
							let label = g.clone();
							view! { <option value=g>{label}</option> }
						})
						.collect_view()}
				</select>
				<Show when=move || active_view.get() == GraphView::ByEngagementLevel>
					<fieldset class="levels">
						{EngagementLevel::ALL
							.into_iter()
							.map(|level| {
								view! {
									<label>
										<input
											type="checkbox"
											prop:checked=move || levels.with(|l| l.contains(&level))
											on:change=move |_| {
												levels
													.update(|l| {
														if !l.remove(&level) {
															l.insert(level);
														}
													})
											}
										/>
										{level.label()}
									</label>
								}
							})
							.collect_view()}
					</fieldset>
				</Show>
			</header>

			<div class="graph-container">
				<ForceGraphCanvas
					data=graph_data
					search_text=Signal::derive(move || Some(search.get()))
					selected_node_id=Signal::derive(move || selected.get())
					hovered_meeting_id=Signal::derive(move || hovered_meeting.get())
					on_node_click=on_node_click
					on_node_hover=on_node_hover
					on_nodes_change=on_nodes_change
				/>
			</div>

			<aside class="graph-details">
				<p class="status">
					{move || {
						graph_data
							.with(|d| {
								format!(
									"{}: {} people, {} links",
									d.view.label(),
									d.nodes.len(),
									d.links.len()
								)
							})
					}}
				</p>
				<p>
					"Selected: "
					{move || node_name(selected.get()).unwrap_or_else(|| "nobody".into())}
				</p>
				<p>"Hovering: " {move || node_name(hovered.get()).unwrap_or_default()}</p>

				<h2>"Meetings"</h2>
				<ul class="meetings">
					{meeting_rows
						.into_iter()
						.map(|(id, text)| {
							let enter = id.clone();
							view! {
								<li
									class:hovered=move || {
										hovered_meeting.with(|m| m.as_deref() == Some(id.as_str()))
									}
									on:mouseenter=move |_| hovered_meeting.set(Some(enter.clone()))
									on:mouseleave=move |_| hovered_meeting.set(None)
								>
									{text}
								</li>
							}
						})
						.collect_view()}
				</ul>

				<h2>"Merge organizers"</h2>
				<div class="merge-form">
					<input
						placeholder="Keep (primary id)"
						prop:value=move || merge_primary.get()
						on:input=move |ev| merge_primary.set(event_target_value(&ev))
					/>
					<input
						placeholder="Fold in (primary id)"
						prop:value=move || merge_other.get()
						on:input=move |ev| merge_other.set(event_target_value(&ev))
					/>
					<button on:click=do_merge>"Merge"</button>
					{move || {
						merge_status
							.get()
							.map(|status| match status {
								Ok(msg) => view! { <p class="ok">{msg}</p> }.into_any(),
								Err(msg) => view! { <p class="error">{msg}</p> }.into_any(),
							})
					}}
				</div>
			</aside>
		</div>
	}
	.into_any()
}
