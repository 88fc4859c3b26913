mod app;
mod blueprint;
mod chat;
mod dialog;
mod dom;
mod panels;
mod persistence;
mod render;
mod state;

pub use app::run;
