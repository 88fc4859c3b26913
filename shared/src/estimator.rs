//! The application state object: one canvas, one capture in progress, the
//! ledger of committed selections and the blueprint image behind them.

use tracing::{debug, info};

use crate::capture::{Capture, DiscardReason, Draft, Preview, Step};
use crate::ledger::{Ledger, Selection, Snapshot};
use crate::project_file::{Blueprint, ExportedState, ImportError, ProjectFile};
use crate::{CanvasSize, CaptureEvent, Key, Mode, Request, Response};

/// What the UI should do after feeding an event or a response.
#[derive(Clone, Debug, PartialEq)]
pub enum Effect {
    Redraw,
    Prompt(Request),
    Reprompt { reason: String, request: Request },
    Committed(Selection),
    Discarded(DiscardReason),
    Rejected(String),
}

#[derive(Clone, Debug, Default)]
pub struct Estimator {
    size: CanvasSize,
    capture: Capture,
    ledger: Ledger,
    blueprint: Option<Blueprint>,
    naming: Option<Draft>,
}

impl Estimator {
    pub fn new(size: CanvasSize) -> Self {
        Self {
            size,
            ..Self::default()
        }
    }

    pub fn size(&self) -> CanvasSize {
        self.size
    }

    pub fn mode(&self) -> Mode {
        self.capture.mode()
    }

    pub fn ledger(&self) -> &Ledger {
        &self.ledger
    }

    pub fn capture(&self) -> &Capture {
        &self.capture
    }

    pub fn blueprint(&self) -> Option<&Blueprint> {
        self.blueprint.as_ref()
    }

    pub fn set_blueprint(&mut self, blueprint: Blueprint) {
        self.blueprint = Some(blueprint);
    }

    pub fn clear_blueprint(&mut self) {
        self.blueprint = None;
    }

    pub fn is_awaiting(&self) -> bool {
        self.naming.is_some() || self.capture.is_awaiting()
    }

    /// The question currently waiting for an answer, if any.
    pub fn pending_request(&self) -> Option<Request> {
        match &self.naming {
            Some(draft) => Some(self.label_request(draft)),
            None => self.capture.pending_request(),
        }
    }

    pub fn preview(&self) -> Option<Preview> {
        self.capture.preview(self.size)
    }

    pub fn handle(&mut self, event: CaptureEvent) -> Effect {
        if self.naming.is_some() {
            match event {
                CaptureEvent::KeyDown(Key::Escape) => {
                    self.naming = None;
                    self.capture.reset();
                    return Effect::Discarded(DiscardReason::Cancelled);
                }
                CaptureEvent::ModeChanged(_) => {
                    self.naming = None;
                    self.capture.handle(event, self.size);
                    return Effect::Discarded(DiscardReason::ModeChanged);
                }
                _ => return Effect::Redraw,
            }
        }
        let step = self.capture.handle(event, self.size);
        self.advance(step)
    }

    pub fn respond(&mut self, response: Response) -> Effect {
        if let Some(draft) = self.naming.take() {
            return match response {
                Response::Label(label) => self.commit(draft, &label),
                Response::Cancel => Effect::Discarded(DiscardReason::Cancelled),
                _ => {
                    let request = self.label_request(&draft);
                    self.naming = Some(draft);
                    Effect::Reprompt {
                        reason: "enter a name for this area".into(),
                        request,
                    }
                }
            };
        }
        let step = self.capture.respond(response, self.size);
        self.advance(step)
    }

    pub fn set_mode(&mut self, mode: Mode) -> Effect {
        self.handle(CaptureEvent::ModeChanged(mode))
    }

    pub fn resize(&mut self, size: CanvasSize) {
        if size == self.size {
            return;
        }
        self.capture.resize(self.size, size);
        self.size = size;
    }

    pub fn undo(&mut self) -> Option<Selection> {
        self.ledger.undo()
    }

    pub fn remove(&mut self, id: &str) -> Option<Selection> {
        self.ledger.remove_by_id(id)
    }

    pub fn clear(&mut self) {
        self.ledger.clear();
    }

    pub fn total(&self) -> f64 {
        self.ledger.total()
    }

    pub fn snapshot(&self) -> Snapshot {
        self.ledger.snapshot()
    }

    pub fn export_state(&self) -> ExportedState {
        self.ledger
            .export_state(self.capture.mode(), self.blueprint.as_ref())
    }

    /// Loads a serialized project. On error nothing changes.
    pub fn import_state(&mut self, payload: &str) -> Result<(), ImportError> {
        let file = self.ledger.import_state(payload)?;
        self.adopt(file);
        Ok(())
    }

    pub fn import_file(&mut self, file: ProjectFile) {
        let file = self.ledger.import_file(file);
        self.adopt(file);
    }

    fn adopt(&mut self, file: ProjectFile) {
        self.naming = None;
        self.capture = Capture::new(file.mode);
        // An emptied blueprint marks an image that was too large to keep, so
        // the one on screen stays. No blueprint at all means no image.
        match file.blueprint {
            Some(Blueprint { data_url: None }) => {}
            blueprint => self.blueprint = blueprint,
        }
        info!(
            selections = self.ledger.len(),
            mode = file.mode.as_str(),
            "project loaded"
        );
    }

    fn advance(&mut self, step: Step) -> Effect {
        match step {
            Step::Continue => Effect::Redraw,
            Step::Prompt(request) => Effect::Prompt(request),
            Step::Reprompt { reason, request } => Effect::Reprompt { reason, request },
            Step::Complete(draft) => {
                let request = self.label_request(&draft);
                self.naming = Some(draft);
                Effect::Prompt(request)
            }
            Step::Discarded(reason) => {
                debug!(?reason, "shape discarded");
                Effect::Discarded(reason)
            }
            Step::Rejected(error) => Effect::Rejected(error.to_string()),
        }
    }

    fn commit(&mut self, draft: Draft, label: &str) -> Effect {
        match self
            .ledger
            .append(draft.shape, draft.measurement, Some(label))
        {
            Ok(selection) => Effect::Committed(selection.clone()),
            Err(error) => Effect::Rejected(error.to_string()),
        }
    }

    fn label_request(&self, draft: &Draft) -> Request {
        Request::Label {
            default: self.ledger.default_label(),
            area_sq_ft: draft.area_sq_ft,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::PixelPoint;

    fn canvas() -> CanvasSize {
        CanvasSize::new(1000.0, 500.0)
    }

    fn drag(estimator: &mut Estimator, from: (f64, f64), to: (f64, f64)) -> Effect {
        estimator.handle(CaptureEvent::PointerDown(PixelPoint::new(from.0, from.1)));
        estimator.handle(CaptureEvent::PointerMove(PixelPoint::new(to.0, to.1)));
        estimator.handle(CaptureEvent::PointerUp(PixelPoint::new(to.0, to.1)))
    }

    #[test]
    fn rectangle_is_named_then_committed() {
        let mut estimator = Estimator::new(canvas());
        assert!(matches!(
            drag(&mut estimator, (100.0, 100.0), (300.0, 250.0)),
            Effect::Prompt(Request::Lengths { .. })
        ));
        let effect = estimator.respond(Response::Values(vec![10.0, 12.0]));
        assert_eq!(
            effect,
            Effect::Prompt(Request::Label {
                default: "Area 1".into(),
                area_sq_ft: 120.0
            })
        );
        assert!(estimator.is_awaiting());
        let Effect::Committed(selection) = estimator.respond(Response::Label("Den".into())) else {
            panic!("expected a commit");
        };
        assert_eq!(selection.label, "Den");
        assert_eq!(estimator.total(), 120.0);
        assert!(!estimator.is_awaiting());
    }

    #[test]
    fn blank_label_uses_default() {
        let mut estimator = Estimator::new(canvas());
        drag(&mut estimator, (100.0, 100.0), (300.0, 250.0));
        estimator.respond(Response::Values(vec![4.0, 5.0]));
        let Effect::Committed(selection) = estimator.respond(Response::Label("   ".into())) else {
            panic!("expected a commit");
        };
        assert_eq!(selection.label, "Area 1");
    }

    #[test]
    fn cancelling_label_discards_shape() {
        let mut estimator = Estimator::new(canvas());
        drag(&mut estimator, (100.0, 100.0), (300.0, 250.0));
        estimator.respond(Response::Values(vec![4.0, 5.0]));
        assert_eq!(
            estimator.respond(Response::Cancel),
            Effect::Discarded(DiscardReason::Cancelled)
        );
        assert!(estimator.ledger().is_empty());
    }

    #[test]
    fn mode_change_while_naming_discards() {
        let mut estimator = Estimator::new(canvas());
        drag(&mut estimator, (100.0, 100.0), (300.0, 250.0));
        estimator.respond(Response::Values(vec![4.0, 5.0]));
        assert_eq!(
            estimator.set_mode(Mode::Polygon),
            Effect::Discarded(DiscardReason::ModeChanged)
        );
        assert_eq!(estimator.mode(), Mode::Polygon);
        assert!(estimator.pending_request().is_none());
    }

    #[test]
    fn import_restores_mode_and_ledger() {
        let mut estimator = Estimator::new(canvas());
        estimator.set_mode(Mode::Circle);
        drag(&mut estimator, (500.0, 250.0), (600.0, 250.0));
        estimator.respond(Response::Values(vec![6.0]));
        estimator.respond(Response::Label("Rug".into()));
        let saved = estimator.export_state().to_json();

        let mut restored = Estimator::new(CanvasSize::new(400.0, 300.0));
        restored.import_state(&saved).unwrap();
        assert_eq!(restored.mode(), Mode::Circle);
        assert_eq!(restored.snapshot(), estimator.snapshot());
    }

    #[test]
    fn json_round_trip_keeps_every_bit_of_the_area() {
        let mut estimator = Estimator::new(canvas());
        estimator.set_mode(Mode::Circle);
        drag(&mut estimator, (500.0, 250.0), (600.0, 250.0));
        estimator.respond(Response::Values(vec![6.0]));
        estimator.respond(Response::Label("Rug".into()));

        let mut restored = Estimator::default();
        restored
            .import_state(&estimator.export_state().to_json())
            .unwrap();
        assert_eq!(
            restored.total().to_bits(),
            estimator.total().to_bits()
        );
        assert_eq!(
            restored.ledger().selections()[0].area_sq_ft.to_bits(),
            (std::f64::consts::PI * 6.0 * 6.0).to_bits()
        );
    }

    #[test]
    fn project_without_image_clears_the_blueprint() {
        let old = Blueprint {
            data_url: Some("data:image/png;base64,T0xE".into()),
        };
        let mut estimator = Estimator::new(canvas());
        estimator.set_blueprint(old.clone());
        estimator
            .import_state(r#"{"version":1,"mode":"rect","selections":[],"blueprint":null}"#)
            .unwrap();
        assert_eq!(estimator.blueprint(), None);
        assert_eq!(estimator.export_state().file.blueprint, None);

        estimator.set_blueprint(old.clone());
        estimator
            .import_state(r#"{"version":1,"mode":"rect","selections":[],"blueprint":{}}"#)
            .unwrap();
        assert_eq!(estimator.blueprint(), Some(&old));

        let new = Blueprint {
            data_url: Some("data:image/png;base64,TkVX".into()),
        };
        let payload = serde_json::json!({
            "version": 1,
            "mode": "rect",
            "selections": [],
            "blueprint": new,
        });
        estimator.import_state(&payload.to_string()).unwrap();
        assert_eq!(estimator.blueprint(), Some(&new));
    }

    #[test]
    fn failed_import_changes_nothing() {
        let mut estimator = Estimator::new(canvas());
        drag(&mut estimator, (100.0, 100.0), (300.0, 250.0));
        estimator.respond(Response::Values(vec![4.0, 5.0]));
        estimator.respond(Response::Label("Hall".into()));
        assert!(estimator.import_state(r#"{"selections":{}}"#).is_err());
        assert_eq!(estimator.ledger().len(), 1);
    }
}
