pub mod app;
pub mod composer;
pub mod history;

pub use app::App;
