//! Shape capture state machine.
//!
//! Pointer and keyboard input arrives as [`CaptureEvent`]s. When a shape
//! needs real-world lengths the machine parks in an awaiting state and hands
//! out a typed [`Request`]; the caller answers with a [`Response`] whenever
//! the user is done (a dialog, a terminal prompt or a test script). Only one
//! shape is ever in progress.

use tracing::debug;

use crate::area::{
    self, estimate_from_drawing, trapezoid_defaults, Measurement, PolygonMethod, QuadMethod,
};
use crate::geometry::{
    distance, near, radius_to_pixels, radius_to_unit, rescale, to_pixel, to_unit,
    CLOSE_TOLERANCE_PX, MIN_DRAG_PX,
};
use crate::{AreaError, CanvasSize, Mode, PixelPoint, Point, ShapeDescriptor};

#[derive(Clone, Debug, PartialEq)]
pub enum CaptureEvent {
    PointerDown(PixelPoint),
    PointerMove(PixelPoint),
    PointerUp(PixelPoint),
    Click(PixelPoint),
    DoubleClick(PixelPoint),
    KeyDown(Key),
    ModeChanged(Mode),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Key {
    Enter,
    Escape,
    Other,
}

impl Key {
    pub fn from_name(name: &str) -> Self {
        match name {
            "Enter" => Key::Enter,
            "Escape" | "Esc" => Key::Escape,
            _ => Key::Other,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Unit {
    Feet,
    SquareFeet,
}

#[derive(Clone, Debug, PartialEq)]
pub struct Field {
    pub name: &'static str,
    pub label: String,
    pub unit: Unit,
    pub default: Option<f64>,
}

impl Field {
    fn feet(name: &'static str, label: impl Into<String>) -> Self {
        Self {
            name,
            label: label.into(),
            unit: Unit::Feet,
            default: None,
        }
    }

    fn with_default(mut self, default: f64) -> Self {
        self.default = Some(default);
        self
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Purpose {
    Rectangle,
    Circle,
    Triangle,
    /// Length of the edge ending at pin `index + 1`; `closing` is the edge
    /// back to the first pin.
    PolygonEdge { index: usize, closing: bool },
    RectangleSides,
    Trapezoid,
    TotalArea,
}

#[derive(Clone, Debug, PartialEq)]
pub enum Request {
    Lengths {
        purpose: Purpose,
        title: String,
        fields: Vec<Field>,
    },
    QuadMethod {
        edges: [f64; 4],
    },
    Label {
        default: String,
        area_sq_ft: f64,
    },
}

#[derive(Clone, Debug, PartialEq)]
pub enum Response {
    Values(Vec<f64>),
    Method(QuadMethod),
    Label(String),
    Cancel,
}

/// A finished shape with validated measurements, ready to be named.
#[derive(Clone, Debug, PartialEq)]
pub struct Draft {
    pub shape: ShapeDescriptor,
    pub measurement: Measurement,
    pub area_sq_ft: f64,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DiscardReason {
    TooSmall,
    Cancelled,
    ModeChanged,
}

#[derive(Clone, Debug, PartialEq)]
pub enum Step {
    Continue,
    Prompt(Request),
    Reprompt { reason: String, request: Request },
    Complete(Draft),
    Discarded(DiscardReason),
    Rejected(AreaError),
}

/// Geometry of the in-progress shape in current canvas pixels.
#[derive(Clone, Debug, PartialEq)]
pub enum Preview {
    Rect {
        a: PixelPoint,
        b: PixelPoint,
    },
    Circle {
        center: PixelPoint,
        radius: f64,
    },
    Path {
        points: Vec<PixelPoint>,
        closed: bool,
        hover: Option<PixelPoint>,
        closable: bool,
    },
}

#[derive(Clone, Debug)]
enum Phase {
    Idle,
    Dragging {
        start: PixelPoint,
        current: PixelPoint,
    },
    Collecting {
        points: Vec<Point>,
        edges: Vec<f64>,
        hover: Option<PixelPoint>,
    },
    Awaiting(Pending),
}

#[derive(Clone, Debug)]
enum Pending {
    Rect { a: Point, b: Point },
    Circle { center: Point, radius: f64 },
    Triangle { points: [Point; 3] },
    Edge { points: Vec<Point>, edges: Vec<f64>, closing: bool },
    Method { points: Vec<Point>, edges: [f64; 4] },
    Sides { points: Vec<Point>, edges: [f64; 4] },
    Trapezoid { points: Vec<Point>, edges: [f64; 4] },
    Area { points: Vec<Point>, edges: Vec<f64>, suggested: Option<f64> },
}

impl Pending {
    fn request(&self) -> Request {
        match self {
            Pending::Rect { .. } => Request::Lengths {
                purpose: Purpose::Rectangle,
                title: "Rectangle dimensions".into(),
                fields: vec![Field::feet("width", "Width"), Field::feet("height", "Height")],
            },
            Pending::Circle { .. } => Request::Lengths {
                purpose: Purpose::Circle,
                title: "Circle dimensions".into(),
                fields: vec![Field::feet("radius", "Radius")],
            },
            Pending::Triangle { .. } => Request::Lengths {
                purpose: Purpose::Triangle,
                title: "Triangle dimensions".into(),
                fields: vec![Field::feet("base", "Base"), Field::feet("height", "Height")],
            },
            Pending::Edge { points, edges, closing } => {
                let index = edges.len();
                let (title, label) = if *closing {
                    (
                        "Closing side".to_string(),
                        format!("Side {} (back to pin 1)", index + 1),
                    )
                } else {
                    (
                        format!("Side {}", index + 1),
                        format!("Side {} (pin {} to pin {})", index + 1, index + 1, points.len()),
                    )
                };
                Request::Lengths {
                    purpose: Purpose::PolygonEdge {
                        index,
                        closing: *closing,
                    },
                    title,
                    fields: vec![Field::feet("length", label)],
                }
            }
            Pending::Method { edges, .. } => Request::QuadMethod { edges: *edges },
            Pending::Sides { edges, .. } => Request::Lengths {
                purpose: Purpose::RectangleSides,
                title: "Two adjacent sides".into(),
                fields: vec![
                    Field::feet("sideA", "First side").with_default(edges[0]),
                    Field::feet("sideB", "Adjacent side").with_default(edges[1]),
                ],
            },
            Pending::Trapezoid { edges, .. } => {
                let defaults = trapezoid_defaults(edges);
                Request::Lengths {
                    purpose: Purpose::Trapezoid,
                    title: "Trapezoid dimensions".into(),
                    fields: vec![
                        Field::feet("top", "Top base").with_default(defaults.top),
                        Field::feet("bottom", "Bottom base").with_default(defaults.bottom),
                        Field::feet("height", "Perpendicular height").with_default(defaults.height),
                    ],
                }
            }
            Pending::Area { suggested, .. } => Request::Lengths {
                purpose: Purpose::TotalArea,
                title: "Total area".into(),
                fields: vec![Field {
                    name: "area",
                    label: "Total area".into(),
                    unit: Unit::SquareFeet,
                    default: *suggested,
                }],
            },
        }
    }

    fn arity(&self) -> usize {
        match self.request() {
            Request::Lengths { fields, .. } => fields.len(),
            _ => 0,
        }
    }
}

#[derive(Clone, Debug)]
pub struct Capture {
    mode: Mode,
    phase: Phase,
    /// Set by a double-click that landed on the pin whose edge is being
    /// asked for; the ring closes once that edge is answered.
    close_after_edge: bool,
}

impl Default for Capture {
    fn default() -> Self {
        Self::new(Mode::default())
    }
}

impl Capture {
    pub fn new(mode: Mode) -> Self {
        Self {
            mode,
            phase: initial_phase(mode),
            close_after_edge: false,
        }
    }

    pub fn mode(&self) -> Mode {
        self.mode
    }

    pub fn is_awaiting(&self) -> bool {
        matches!(self.phase, Phase::Awaiting(_))
    }

    /// True while any pointer input or pins have been recorded.
    pub fn in_progress(&self) -> bool {
        match &self.phase {
            Phase::Idle => false,
            Phase::Dragging { .. } | Phase::Awaiting(_) => true,
            Phase::Collecting { points, .. } => !points.is_empty(),
        }
    }

    pub fn pending_request(&self) -> Option<Request> {
        match &self.phase {
            Phase::Awaiting(pending) => Some(pending.request()),
            _ => None,
        }
    }

    pub fn reset(&mut self) {
        self.phase = initial_phase(self.mode);
        self.close_after_edge = false;
    }

    pub fn handle(&mut self, event: CaptureEvent, size: CanvasSize) -> Step {
        match event {
            CaptureEvent::ModeChanged(mode) => {
                let discarded = self.in_progress();
                self.mode = mode;
                self.reset();
                if discarded {
                    Step::Discarded(DiscardReason::ModeChanged)
                } else {
                    Step::Continue
                }
            }
            CaptureEvent::KeyDown(Key::Escape) => {
                if self.in_progress() {
                    self.reset();
                    Step::Discarded(DiscardReason::Cancelled)
                } else {
                    Step::Continue
                }
            }
            CaptureEvent::DoubleClick(point) if self.ends_ring_at(point, size) => {
                self.close_after_edge = true;
                Step::Continue
            }
            _ if self.is_awaiting() => Step::Continue,
            event => match self.mode {
                Mode::Rect | Mode::Circle => self.handle_drag(event, size),
                Mode::Triangle => self.handle_triangle(event, size),
                Mode::Polygon => self.handle_polygon(event, size),
            },
        }
    }

    pub fn respond(&mut self, response: Response, size: CanvasSize) -> Step {
        let pending = match std::mem::replace(&mut self.phase, Phase::Idle) {
            Phase::Awaiting(pending) => pending,
            other => {
                self.phase = other;
                return Step::Continue;
            }
        };

        match (pending, response) {
            (Pending::Edge { mut points, edges, closing: false }, Response::Cancel) => {
                points.pop();
                self.close_after_edge = false;
                self.phase = Phase::Collecting {
                    points,
                    edges,
                    hover: None,
                };
                Step::Continue
            }
            (_, Response::Cancel) => {
                self.reset();
                Step::Discarded(DiscardReason::Cancelled)
            }
            (Pending::Method { points, edges }, Response::Method(method)) => {
                let next = match method {
                    QuadMethod::Rectangle => Pending::Sides { points, edges },
                    QuadMethod::Trapezoid => Pending::Trapezoid { points, edges },
                    QuadMethod::Irregular => {
                        let suggested = suggest_area(&points, &edges, size);
                        Pending::Area {
                            points,
                            edges: edges.to_vec(),
                            suggested,
                        }
                    }
                };
                self.await_pending(next)
            }
            (pending @ Pending::Method { .. }, _) => {
                self.reprompt(pending, "choose how to measure this four-sided shape")
            }
            (pending, Response::Values(values)) => {
                if let Err(reason) = validate_values(&values, pending.arity()) {
                    return self.reprompt(pending, &reason);
                }
                self.apply_values(pending, values, size)
            }
            (pending, _) => self.reprompt(pending, "enter the requested lengths"),
        }
    }

    /// Keeps an in-progress drag at the same visual spot after the canvas
    /// changes size.
    pub fn resize(&mut self, from: CanvasSize, to: CanvasSize) {
        match &mut self.phase {
            Phase::Dragging { start, current } => {
                *start = rescale(*start, from, to);
                *current = rescale(*current, from, to);
            }
            Phase::Collecting {
                hover: Some(hover), ..
            } => {
                *hover = rescale(*hover, from, to);
            }
            _ => {}
        }
    }

    pub fn preview(&self, size: CanvasSize) -> Option<Preview> {
        match &self.phase {
            Phase::Idle => None,
            Phase::Dragging { start, current } => Some(match self.mode {
                Mode::Circle => Preview::Circle {
                    center: *start,
                    radius: distance(*start, *current),
                },
                _ => Preview::Rect {
                    a: *start,
                    b: *current,
                },
            }),
            Phase::Collecting { points, hover, .. } => {
                if points.is_empty() {
                    return None;
                }
                let pixels: Vec<_> = points.iter().map(|p| to_pixel(*p, size)).collect();
                let closable = self.mode == Mode::Polygon
                    && pixels.len() >= 3
                    && hover.is_some_and(|hover| near(hover, pixels[0], CLOSE_TOLERANCE_PX));
                Some(Preview::Path {
                    points: pixels,
                    closed: false,
                    hover: *hover,
                    closable,
                })
            }
            Phase::Awaiting(pending) => Some(match pending {
                Pending::Rect { a, b } => Preview::Rect {
                    a: to_pixel(*a, size),
                    b: to_pixel(*b, size),
                },
                Pending::Circle { center, radius } => Preview::Circle {
                    center: to_pixel(*center, size),
                    radius: radius_to_pixels(*radius, size),
                },
                Pending::Triangle { points } => path_preview(points, true, size),
                Pending::Edge { points, closing, .. } => path_preview(points, *closing, size),
                Pending::Method { points, .. }
                | Pending::Sides { points, .. }
                | Pending::Trapezoid { points, .. }
                | Pending::Area { points, .. } => path_preview(points, true, size),
            }),
        }
    }

    fn handle_drag(&mut self, event: CaptureEvent, size: CanvasSize) -> Step {
        match event {
            CaptureEvent::PointerDown(point) if matches!(self.phase, Phase::Idle) => {
                self.phase = Phase::Dragging {
                    start: point,
                    current: point,
                };
                Step::Continue
            }
            CaptureEvent::PointerMove(point) => {
                if let Phase::Dragging { current, .. } = &mut self.phase {
                    *current = point;
                }
                Step::Continue
            }
            CaptureEvent::PointerUp(point) => {
                let Phase::Dragging { start, .. } = self.phase else {
                    return Step::Continue;
                };
                let length = distance(start, point);
                if length < MIN_DRAG_PX {
                    debug!(length, "drag below threshold discarded");
                    self.reset();
                    return Step::Discarded(DiscardReason::TooSmall);
                }
                let pending = if self.mode == Mode::Circle {
                    Pending::Circle {
                        center: to_unit(start, size),
                        radius: radius_to_unit(length, size),
                    }
                } else {
                    Pending::Rect {
                        a: to_unit(start, size),
                        b: to_unit(point, size),
                    }
                };
                self.await_pending(pending)
            }
            _ => Step::Continue,
        }
    }

    fn handle_triangle(&mut self, event: CaptureEvent, size: CanvasSize) -> Step {
        let Phase::Collecting { points, hover, .. } = &mut self.phase else {
            return Step::Continue;
        };
        match event {
            CaptureEvent::PointerMove(point) => {
                *hover = Some(point);
                Step::Continue
            }
            CaptureEvent::Click(point) => {
                points.push(to_unit(point, size));
                if let [a, b, c] = points.as_slice() {
                    let pending = Pending::Triangle { points: [*a, *b, *c] };
                    return self.await_pending(pending);
                }
                Step::Continue
            }
            _ => Step::Continue,
        }
    }

    fn handle_polygon(&mut self, event: CaptureEvent, size: CanvasSize) -> Step {
        let Phase::Collecting { points, hover, .. } = &mut self.phase else {
            return Step::Continue;
        };
        match event {
            CaptureEvent::PointerMove(point) => {
                *hover = Some(point);
                Step::Continue
            }
            CaptureEvent::Click(point) => {
                let (Some(first), Some(last)) = (points.first(), points.last()) else {
                    points.push(to_unit(point, size));
                    return Step::Continue;
                };
                if points.len() >= 3 && near(point, to_pixel(*first, size), CLOSE_TOLERANCE_PX) {
                    return self.begin_closing();
                }
                if near(point, to_pixel(*last, size), CLOSE_TOLERANCE_PX) {
                    return Step::Continue;
                }
                points.push(to_unit(point, size));
                self.begin_edge()
            }
            CaptureEvent::DoubleClick(_) | CaptureEvent::KeyDown(Key::Enter) => {
                if points.len() >= 3 {
                    self.begin_closing()
                } else {
                    Step::Continue
                }
            }
            _ => Step::Continue,
        }
    }

    /// True when a double-click lands on the pin just placed by its own
    /// first click, while that pin's edge prompt is open.
    fn ends_ring_at(&self, point: PixelPoint, size: CanvasSize) -> bool {
        match &self.phase {
            Phase::Awaiting(Pending::Edge {
                points,
                closing: false,
                ..
            }) => {
                points.len() >= 3
                    && points
                        .last()
                        .is_some_and(|last| near(point, to_pixel(*last, size), CLOSE_TOLERANCE_PX))
            }
            _ => false,
        }
    }

    fn begin_edge(&mut self) -> Step {
        self.take_collected(false)
    }

    fn begin_closing(&mut self) -> Step {
        self.take_collected(true)
    }

    fn take_collected(&mut self, closing: bool) -> Step {
        match std::mem::replace(&mut self.phase, Phase::Idle) {
            Phase::Collecting { points, edges, .. } => self.await_pending(Pending::Edge {
                points,
                edges,
                closing,
            }),
            other => {
                self.phase = other;
                Step::Continue
            }
        }
    }

    fn apply_values(&mut self, pending: Pending, values: Vec<f64>, size: CanvasSize) -> Step {
        match pending {
            Pending::Rect { a, b } => self.complete(
                ShapeDescriptor::Rect { a, b },
                Measurement::Rect {
                    width: values[0],
                    height: values[1],
                },
            ),
            Pending::Circle { center, radius } => self.complete(
                ShapeDescriptor::Circle { center, radius },
                Measurement::Circle { radius: values[0] },
            ),
            Pending::Triangle { points } => self.complete(
                ShapeDescriptor::Triangle { points },
                Measurement::Triangle {
                    base: values[0],
                    height: values[1],
                },
            ),
            Pending::Edge {
                points,
                mut edges,
                closing,
            } => {
                edges.push(values[0]);
                if closing {
                    self.finish_polygon(points, edges, size)
                } else if std::mem::take(&mut self.close_after_edge) && points.len() >= 3 {
                    self.phase = Phase::Collecting {
                        points,
                        edges,
                        hover: None,
                    };
                    self.begin_closing()
                } else {
                    self.phase = Phase::Collecting {
                        points,
                        edges,
                        hover: None,
                    };
                    Step::Continue
                }
            }
            Pending::Sides { points, edges } => self.complete(
                ShapeDescriptor::Polygon { points },
                Measurement::Polygon {
                    edges: edges.to_vec(),
                    method: PolygonMethod::Rectangle {
                        side_a: values[0],
                        side_b: values[1],
                    },
                },
            ),
            Pending::Trapezoid { points, edges } => self.complete(
                ShapeDescriptor::Polygon { points },
                Measurement::Polygon {
                    edges: edges.to_vec(),
                    method: PolygonMethod::Trapezoid {
                        top: values[0],
                        bottom: values[1],
                        height: values[2],
                    },
                },
            ),
            Pending::Area { points, edges, .. } => self.complete(
                ShapeDescriptor::Polygon { points },
                Measurement::Polygon {
                    edges,
                    method: PolygonMethod::Manual { area: values[0] },
                },
            ),
            pending @ Pending::Method { .. } => {
                self.reprompt(pending, "choose how to measure this four-sided shape")
            }
        }
    }

    fn finish_polygon(&mut self, points: Vec<Point>, edges: Vec<f64>, size: CanvasSize) -> Step {
        match edges.len() {
            3 => self.complete(
                ShapeDescriptor::Polygon { points },
                Measurement::Polygon {
                    edges,
                    method: PolygonMethod::Heron,
                },
            ),
            4 => {
                let edges = [edges[0], edges[1], edges[2], edges[3]];
                self.await_pending(Pending::Method { points, edges })
            }
            _ => {
                let suggested = suggest_area(&points, &edges, size);
                self.await_pending(Pending::Area {
                    points,
                    edges,
                    suggested,
                })
            }
        }
    }

    fn complete(&mut self, shape: ShapeDescriptor, measurement: Measurement) -> Step {
        self.reset();
        match area::area_sq_ft(&measurement) {
            Ok(area_sq_ft) => Step::Complete(Draft {
                shape,
                measurement,
                area_sq_ft,
            }),
            Err(error) => {
                debug!(%error, "measurement rejected, shape discarded");
                Step::Rejected(error)
            }
        }
    }

    fn await_pending(&mut self, pending: Pending) -> Step {
        let request = pending.request();
        self.phase = Phase::Awaiting(pending);
        Step::Prompt(request)
    }

    fn reprompt(&mut self, pending: Pending, reason: &str) -> Step {
        let request = pending.request();
        self.phase = Phase::Awaiting(pending);
        Step::Reprompt {
            reason: reason.to_string(),
            request,
        }
    }
}

fn initial_phase(mode: Mode) -> Phase {
    match mode {
        Mode::Rect | Mode::Circle => Phase::Idle,
        Mode::Triangle | Mode::Polygon => Phase::Collecting {
            points: Vec::new(),
            edges: Vec::new(),
            hover: None,
        },
    }
}

fn validate_values(values: &[f64], expected: usize) -> Result<(), String> {
    if values.len() != expected {
        return Err(format!("expected {expected} value(s), got {}", values.len()));
    }
    if values.iter().all(|value| value.is_finite() && *value > 0.0) {
        Ok(())
    } else {
        Err("every value must be a number greater than zero".into())
    }
}

fn suggest_area(points: &[Point], edges: &[f64], size: CanvasSize) -> Option<f64> {
    let pixels: Vec<_> = points.iter().map(|p| to_pixel(*p, size)).collect();
    estimate_from_drawing(&pixels, edges)
}

fn path_preview(points: &[Point], closed: bool, size: CanvasSize) -> Preview {
    Preview::Path {
        points: points.iter().map(|p| to_pixel(*p, size)).collect(),
        closed,
        hover: None,
        closable: false,
    }
}
