use std::cell::{Cell, RefCell};
use std::rc::Rc;

use leptos::prelude::*;
use log::{debug, error};
use send_wrapper::SendWrapper;
use wasm_bindgen::prelude::*;
use web_sys::{CanvasRenderingContext2d, HtmlCanvasElement, MouseEvent, ResizeObserver, WheelEvent};

use super::interaction::{PointerOutcome, ResizeOutcome};
use super::render;
use super::state::ForceGraphState;
use super::types::{RenderConfig, SimulationConfig};
use crate::graph::{GraphData, GraphNode, GraphView};

type SharedState = Rc<RefCell<Option<ForceGraphState>>>;
type SharedContext = Rc<RefCell<Option<CanvasRenderingContext2d>>>;

fn paint(state: &ForceGraphState, ctx: &SharedContext) {
	if let Some(ctx) = ctx.borrow_mut().as_mut() {
		render::render(state, ctx);
	}
}

fn local_position(canvas: &HtmlCanvasElement, ev: &MouseEvent) -> (f64, f64) {
	let rect = canvas.get_bounding_client_rect();
	(ev.client_x() as f64 - rect.left(), ev.client_y() as f64 - rect.top())
}

fn notify(
	outcome: PointerOutcome,
	on_node_click: Option<Callback<Option<String>>>,
	on_node_hover: Option<Callback<Option<String>>>,
) {
	if let (Some(hover), Some(cb)) = (outcome.hover, on_node_hover) {
		cb.run(hover);
	}
	if let (Some(click), Some(cb)) = (outcome.click, on_node_click) {
		cb.run(click);
	}
}

/// Stops the current run and hands any uncommitted positions to the host.
fn flush(state: &SharedState, on_nodes_change: Option<Callback<(GraphView, Vec<GraphNode>)>>) {
	let flushed = state
		.borrow_mut()
		.as_mut()
		.and_then(|s| s.stop().map(|nodes| (s.view, nodes)));
	if let (Some(commit), Some(cb)) = (flushed, on_nodes_change) {
		cb.run(commit);
	}
}

/// Canvas view of a relationship graph.
///
/// Rebuilding `data` stops the running layout and flushes its positions
/// through `on_nodes_change`, tagged with the view they belong to, before the
/// new run starts. Highlight inputs
/// (`search_text`, `selected_node_id`, `hovered_meeting_id`) only repaint.
#[component]
pub fn ForceGraphCanvas(
	#[prop(into)] data: Signal<GraphData>,
	#[prop(into, optional)] search_text: MaybeProp<String>,
	#[prop(into, optional)] selected_node_id: MaybeProp<String>,
	#[prop(into, optional)] hovered_meeting_id: MaybeProp<String>,
	#[prop(optional)] on_node_click: Option<Callback<Option<String>>>,
	#[prop(optional)] on_node_hover: Option<Callback<Option<String>>>,
	#[prop(optional)] on_nodes_change: Option<Callback<(GraphView, Vec<GraphNode>)>>,
	#[prop(optional)] sim_config: Option<SimulationConfig>,
	#[prop(optional)] render_config: Option<RenderConfig>,
) -> impl IntoView {
	let canvas_ref = NodeRef::<leptos::html::Canvas>::new();
	let state: SharedState = Rc::new(RefCell::new(None));
	let ctx: SharedContext = Rc::new(RefCell::new(None));
	let animate: Rc<RefCell<Option<Closure<dyn FnMut()>>>> = Rc::new(RefCell::new(None));
	let resize_cb: Rc<RefCell<Option<Closure<dyn FnMut()>>>> = Rc::new(RefCell::new(None));
	let observer: Rc<RefCell<Option<ResizeObserver>>> = Rc::new(RefCell::new(None));
	let frame_id = Rc::new(Cell::new(None::<i32>));
	let alive = Rc::new(Cell::new(true));
	let sim_config = sim_config.unwrap_or_default();
	let render_config = render_config.unwrap_or_default();

	// Rebuild whenever the data changes.
	let state_data = state.clone();
	Effect::new(move |_| {
		let data = data.get();
		flush(&state_data, on_nodes_change);
		let mut next = ForceGraphState::new(&data, sim_config.clone(), render_config.clone());
		next.set_search(&search_text.get_untracked().unwrap_or_default());
		next.set_selected(selected_node_id.get_untracked());
		next.set_hovered_meeting(hovered_meeting_id.get_untracked());
		let mut slot = state_data.borrow_mut();
		if let Some(previous) = slot.as_ref() {
			next.inherit_camera(previous);
		}
		*slot = Some(next);
	});

	let state_search = state.clone();
	Effect::new(move |_| {
		let text = search_text.get().unwrap_or_default();
		if let Some(s) = state_search.borrow_mut().as_mut() {
			s.set_search(&text);
		}
	});

	let state_selected = state.clone();
	Effect::new(move |_| {
		let selected = selected_node_id.get();
		if let Some(s) = state_selected.borrow_mut().as_mut() {
			s.set_selected(selected);
		}
	});

	let state_meeting = state.clone();
	Effect::new(move |_| {
		let meeting = hovered_meeting_id.get();
		if let Some(s) = state_meeting.borrow_mut().as_mut() {
			s.set_hovered_meeting(meeting);
		}
	});

	let (state_init, ctx_init, animate_init, resize_init, observer_init, frame_init, alive_init) = (
		state.clone(),
		ctx.clone(),
		animate.clone(),
		resize_cb.clone(),
		observer.clone(),
		frame_id.clone(),
		alive.clone(),
	);
	Effect::new(move |_| {
		let Some(canvas) = canvas_ref.get() else {
			return;
		};
		let Some(window) = web_sys::window() else {
			return;
		};
		let Some(context) = canvas
			.get_context("2d")
			.ok()
			.flatten()
			.and_then(|c| c.dyn_into::<CanvasRenderingContext2d>().ok())
		else {
			error!("2D canvas context unavailable");
			return;
		};
		*ctx_init.borrow_mut() = Some(context);

		let (state_resize, ctx_resize, canvas_resize) =
			(state_init.clone(), ctx_init.clone(), canvas.clone());
		*resize_init.borrow_mut() = Some(Closure::new(move || {
			let Some(parent) = canvas_resize.parent_element() else {
				return;
			};
			let (w, h) = (parent.client_width() as f64, parent.client_height() as f64);
			let dpr = web_sys::window().map_or(1.0, |win| win.device_pixel_ratio());
			if let Some(s) = state_resize.borrow_mut().as_mut() {
				match s.resize(w, h, dpr) {
					ResizeOutcome::Reinitialize | ResizeOutcome::Resized => {
						let (bw, bh) = s.viewport.backing_size();
						canvas_resize.set_width(bw);
						canvas_resize.set_height(bh);
						paint(s, &ctx_resize);
					}
					ResizeOutcome::Hidden | ResizeOutcome::Unchanged => {}
				}
			}
		}));
		if let (Some(cb), Some(parent)) = (resize_init.borrow().as_ref(), canvas.parent_element()) {
			match ResizeObserver::new(cb.as_ref().unchecked_ref()) {
				Ok(obs) => {
					obs.observe(&parent);
					*observer_init.borrow_mut() = Some(obs);
				}
				Err(err) => error!("ResizeObserver unavailable: {err:?}"),
			}
		}

		let (state_anim, ctx_anim, animate_inner, frame_inner, alive_inner) = (
			state_init.clone(),
			ctx_init.clone(),
			animate_init.clone(),
			frame_init.clone(),
			alive_init.clone(),
		);
		*animate_init.borrow_mut() = Some(Closure::new(move || {
			if !alive_inner.get() {
				return;
			}
			let committed = match state_anim.borrow_mut().as_mut() {
				Some(s) => {
					let frame = s.frame();
					if frame.repaint {
						paint(s, &ctx_anim);
					}
					frame.committed.map(|nodes| (s.view, nodes))
				}
				None => None,
			};
			if let (Some(commit), Some(cb)) = (committed, on_nodes_change) {
				debug!("Layout converged; committing {} nodes", commit.1.len());
				cb.run(commit);
			}
			if let (Some(cb), Some(win)) = (animate_inner.borrow().as_ref(), web_sys::window()) {
				frame_inner.set(win.request_animation_frame(cb.as_ref().unchecked_ref()).ok());
			}
		}));
		if let Some(cb) = animate_init.borrow().as_ref() {
			frame_init.set(window.request_animation_frame(cb.as_ref().unchecked_ref()).ok());
		}
	});

	let cleanup = SendWrapper::new({
		let (state, animate, resize_cb, observer, frame_id, alive) = (
			state.clone(),
			animate.clone(),
			resize_cb.clone(),
			observer.clone(),
			frame_id.clone(),
			alive.clone(),
		);
		move || {
			alive.set(false);
			if let (Some(id), Some(win)) = (frame_id.take(), web_sys::window()) {
				let _ = win.cancel_animation_frame(id);
			}
			if let Some(obs) = observer.borrow_mut().take() {
				obs.disconnect();
			}
			flush(&state, on_nodes_change);
			animate.borrow_mut().take();
			resize_cb.borrow_mut().take();
		}
	});
	on_cleanup(move || cleanup.take()());

	let (state_md, ctx_md) = (state.clone(), ctx.clone());
	let on_mousedown = move |ev: MouseEvent| {
		let Some(canvas) = canvas_ref.get_untracked() else {
			return;
		};
		let (x, y) = local_position(&canvas, &ev);
		if let Some(s) = state_md.borrow_mut().as_mut() {
			let outcome = s.pointer_down(x, y);
			if outcome.repaint {
				paint(s, &ctx_md);
			}
		}
	};

	let (state_mm, ctx_mm) = (state.clone(), ctx.clone());
	let on_mousemove = move |ev: MouseEvent| {
		let Some(canvas) = canvas_ref.get_untracked() else {
			return;
		};
		let (x, y) = local_position(&canvas, &ev);
		let outcome = match state_mm.borrow_mut().as_mut() {
			Some(s) => {
				let outcome = s.pointer_move(x, y);
				if outcome.repaint {
					paint(s, &ctx_mm);
				}
				outcome
			}
			None => return,
		};
		notify(outcome, on_node_click, on_node_hover);
	};

	let (state_mu, ctx_mu) = (state.clone(), ctx.clone());
	let on_mouseup = move |ev: MouseEvent| {
		let Some(canvas) = canvas_ref.get_untracked() else {
			return;
		};
		let (x, y) = local_position(&canvas, &ev);
		let outcome = match state_mu.borrow_mut().as_mut() {
			Some(s) => {
				let outcome = s.pointer_up(x, y);
				paint(s, &ctx_mu);
				outcome
			}
			None => return,
		};
		notify(outcome, on_node_click, on_node_hover);
	};

	let (state_ml, ctx_ml) = (state.clone(), ctx.clone());
	let on_mouseleave = move |_: MouseEvent| {
		let outcome = match state_ml.borrow_mut().as_mut() {
			Some(s) => {
				let outcome = s.pointer_leave();
				if outcome.repaint {
					paint(s, &ctx_ml);
				}
				outcome
			}
			None => return,
		};
		notify(outcome, on_node_click, on_node_hover);
	};

	let (state_wh, ctx_wh) = (state.clone(), ctx.clone());
	let on_wheel = move |ev: WheelEvent| {
		ev.prevent_default();
		let Some(canvas) = canvas_ref.get_untracked() else {
			return;
		};
		let (x, y) = local_position(&canvas, &ev);
		if let Some(s) = state_wh.borrow_mut().as_mut() {
			if s.wheel(x, y, ev.delta_y()).repaint {
				paint(s, &ctx_wh);
			}
		}
	};

	view! {
		<canvas
			node_ref=canvas_ref
			class="force-graph-canvas"
			on:mousedown=on_mousedown
			on:mousemove=on_mousemove
			on:mouseup=on_mouseup
			on:mouseleave=on_mouseleave
			on:wheel=on_wheel
			style="display: block; width: 100%; height: 100%; cursor: grab;"
		/>
	}
}
