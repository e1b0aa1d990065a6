//! Drawing backends. The renderer talks to a [`Surface`]; the browser uses the
//! 2D canvas context, tests and headless tools use [`RecordingSurface`].

use std::f64::consts::PI;

use wasm_bindgen::JsValue;
use web_sys::CanvasRenderingContext2d;

use super::interaction::ViewTransform;

/// Minimal 2D drawing API the renderer needs.
pub trait Surface {
	/// Clears to `background` and resets to a device-pixel-ratio-only transform.
	fn reset(&mut self, width: f64, height: f64, dpr: f64, background: &str);
	/// Draws subsequent shapes in graph space.
	fn set_camera(&mut self, transform: &ViewTransform, dpr: f64);
	/// Draws subsequent shapes in CSS pixel space.
	fn set_screen_space(&mut self, dpr: f64);
	/// Global opacity for subsequent shapes.
	fn set_alpha(&mut self, alpha: f64);
	/// Straight stroke.
	fn stroke_line(
		&mut self,
		from: (f64, f64),
		to: (f64, f64),
		color: &str,
		width: f64,
		dash: Option<(f64, f64)>,
	);
	/// Filled circle.
	fn fill_circle(&mut self, center: (f64, f64), radius: f64, color: &str);
	/// Circle outline.
	fn stroke_circle(&mut self, center: (f64, f64), radius: f64, color: &str, width: f64);
	/// Filled rectangle with rounded corners.
	fn fill_rounded_rect(&mut self, x: f64, y: f64, w: f64, h: f64, radius: f64, color: &str);
	/// Width of `text` in the current space.
	fn measure_text(&self, text: &str, font: &str) -> f64;
	/// Text anchored at its left baseline.
	fn fill_text(&mut self, text: &str, x: f64, y: f64, font: &str, color: &str);
}

impl Surface for CanvasRenderingContext2d {
	fn reset(&mut self, width: f64, height: f64, dpr: f64, background: &str) {
		let _ = self.set_transform(dpr, 0.0, 0.0, dpr, 0.0, 0.0);
		self.set_global_alpha(1.0);
		self.set_fill_style_str(background);
		self.fill_rect(0.0, 0.0, width, height);
	}

	fn set_camera(&mut self, transform: &ViewTransform, dpr: f64) {
		let k = transform.k * dpr;
		let _ = self.set_transform(k, 0.0, 0.0, k, transform.x * dpr, transform.y * dpr);
	}

	fn set_screen_space(&mut self, dpr: f64) {
		let _ = self.set_transform(dpr, 0.0, 0.0, dpr, 0.0, 0.0);
	}

	fn set_alpha(&mut self, alpha: f64) {
		self.set_global_alpha(alpha);
	}

	fn stroke_line(
		&mut self,
		from: (f64, f64),
		to: (f64, f64),
		color: &str,
		width: f64,
		dash: Option<(f64, f64)>,
	) {
		self.set_stroke_style_str(color);
		self.set_line_width(width);
		let pattern = match dash {
			Some((dash, gap)) => {
				js_sys::Array::of2(&JsValue::from_f64(dash), &JsValue::from_f64(gap))
			}
			None => js_sys::Array::new(),
		};
		let _ = self.set_line_dash(&pattern);
		self.begin_path();
		self.move_to(from.0, from.1);
		self.line_to(to.0, to.1);
		self.stroke();
	}

	fn fill_circle(&mut self, center: (f64, f64), radius: f64, color: &str) {
		self.begin_path();
		let _ = self.arc(center.0, center.1, radius, 0.0, 2.0 * PI);
		self.set_fill_style_str(color);
		self.fill();
	}

	fn stroke_circle(&mut self, center: (f64, f64), radius: f64, color: &str, width: f64) {
		let _ = self.set_line_dash(&js_sys::Array::new());
		self.begin_path();
		let _ = self.arc(center.0, center.1, radius, 0.0, 2.0 * PI);
		self.set_stroke_style_str(color);
		self.set_line_width(width);
		self.stroke();
	}

	fn fill_rounded_rect(&mut self, x: f64, y: f64, w: f64, h: f64, radius: f64, color: &str) {
		let r = radius.min(w / 2.0).min(h / 2.0);
		self.begin_path();
		self.move_to(x + r, y);
		let _ = self.arc_to(x + w, y, x + w, y + h, r);
		let _ = self.arc_to(x + w, y + h, x, y + h, r);
		let _ = self.arc_to(x, y + h, x, y, r);
		let _ = self.arc_to(x, y, x + w, y, r);
		self.close_path();
		self.set_fill_style_str(color);
		self.fill();
	}

	fn measure_text(&self, text: &str, font: &str) -> f64 {
		self.set_font(font);
		CanvasRenderingContext2d::measure_text(self, text)
			.map(|m| m.width())
			.unwrap_or(0.0)
	}

	fn fill_text(&mut self, text: &str, x: f64, y: f64, font: &str, color: &str) {
		self.set_font(font);
		self.set_fill_style_str(color);
		let _ = CanvasRenderingContext2d::fill_text(self, text, x, y);
	}
}

/// One recorded drawing call.
#[derive(Clone, Debug, PartialEq)]
pub enum DrawOp {
	/// `reset`
	Clear {
		/// Clear colour.
		background: String,
	},
	/// `set_camera`
	Camera,
	/// `set_screen_space`
	ScreenSpace,
	/// A stroked line.
	Line {
		/// Stroke colour.
		color: String,
		/// Stroke width.
		width: f64,
		/// Whether the stroke was dashed.
		dashed: bool,
		/// Global alpha at draw time.
		alpha: f64,
	},
	/// A filled circle.
	Circle {
		/// Centre.
		center: (f64, f64),
		/// Radius.
		radius: f64,
		/// Fill colour.
		color: String,
		/// Global alpha at draw time.
		alpha: f64,
	},
	/// A circle outline.
	Ring {
		/// Centre.
		center: (f64, f64),
		/// Radius.
		radius: f64,
		/// Stroke colour.
		color: String,
		/// Global alpha at draw time.
		alpha: f64,
	},
	/// A filled rounded rectangle.
	Rect {
		/// Fill colour.
		color: String,
		/// Global alpha at draw time.
		alpha: f64,
	},
	/// Drawn text.
	Text {
		/// The text.
		text: String,
		/// Fill colour.
		color: String,
		/// Global alpha at draw time.
		alpha: f64,
	},
}

/// Headless surface that records every call. Text is measured at
/// `0.6 * font size` per character.
#[derive(Clone, Debug, Default)]
pub struct RecordingSurface {
	/// Calls in order.
	pub ops: Vec<DrawOp>,
	alpha: f64,
}

impl RecordingSurface {
	/// Empty recording.
	pub fn new() -> Self {
		Self {
			ops: Vec::new(),
			alpha: 1.0,
		}
	}

	/// Texts drawn, in order.
	pub fn texts(&self) -> Vec<&str> {
		self.ops
			.iter()
			.filter_map(|op| match op {
				DrawOp::Text { text, .. } => Some(text.as_str()),
				_ => None,
			})
			.collect()
	}
}

fn font_px(font: &str) -> f64 {
	font.split("px")
		.next()
		.and_then(|n| n.trim().parse().ok())
		.unwrap_or(10.0)
}

impl Surface for RecordingSurface {
	fn reset(&mut self, _width: f64, _height: f64, _dpr: f64, background: &str) {
		self.alpha = 1.0;
		self.ops.push(DrawOp::Clear {
			background: background.to_string(),
		});
	}

	fn set_camera(&mut self, _transform: &ViewTransform, _dpr: f64) {
		self.ops.push(DrawOp::Camera);
	}

	fn set_screen_space(&mut self, _dpr: f64) {
		self.ops.push(DrawOp::ScreenSpace);
	}

	fn set_alpha(&mut self, alpha: f64) {
		self.alpha = alpha;
	}

	fn stroke_line(
		&mut self,
		_from: (f64, f64),
		_to: (f64, f64),
		color: &str,
		width: f64,
		dash: Option<(f64, f64)>,
	) {
		self.ops.push(DrawOp::Line {
			color: color.to_string(),
			width,
			dashed: dash.is_some(),
			alpha: self.alpha,
		});
	}

	fn fill_circle(&mut self, center: (f64, f64), radius: f64, color: &str) {
		self.ops.push(DrawOp::Circle {
			center,
			radius,
			color: color.to_string(),
			alpha: self.alpha,
		});
	}

	fn stroke_circle(&mut self, center: (f64, f64), radius: f64, color: &str, _width: f64) {
		self.ops.push(DrawOp::Ring {
			center,
			radius,
			color: color.to_string(),
			alpha: self.alpha,
		});
	}

	fn fill_rounded_rect(&mut self, _x: f64, _y: f64, _w: f64, _h: f64, _radius: f64, color: &str) {
		self.ops.push(DrawOp::Rect {
			color: color.to_string(),
			alpha: self.alpha,
		});
	}

	fn measure_text(&self, text: &str, font: &str) -> f64 {
		text.chars().count() as f64 * font_px(font) * 0.6
	}

	fn fill_text(&mut self, text: &str, _x: f64, _y: f64, _font: &str, color: &str) {
		self.ops.push(DrawOp::Text {
			text: text.to_string(),
			color: color.to_string(),
			alpha: self.alpha,
		});
	}
}
