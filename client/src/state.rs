use web_sys::{CanvasRenderingContext2d, HtmlCanvasElement, HtmlImageElement};

use blueprint_shared::projects::Owner;
use blueprint_shared::Estimator;

pub struct State {
    pub canvas: HtmlCanvasElement,
    pub ctx: CanvasRenderingContext2d,
    pub estimator: Estimator,
    /// Decoded blueprint, painted under the shapes.
    pub image: Option<HtmlImageElement>,
    pub user: Option<String>,
    /// Set while an upload is being read; further uploads are refused.
    pub loading_image: bool,
    pub chat_busy: bool,
    pub debug: bool,
}

impl State {
    pub fn new(
        canvas: HtmlCanvasElement,
        ctx: CanvasRenderingContext2d,
        user: Option<String>,
        debug: bool,
    ) -> Self {
        Self {
            canvas,
            ctx,
            estimator: Estimator::default(),
            image: None,
            user,
            loading_image: false,
            chat_busy: false,
            debug,
        }
    }

    pub fn owner(&self) -> Owner {
        Owner::from_user(self.user.clone())
    }
}
