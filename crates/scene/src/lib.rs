pub mod config;
pub mod lightbox;
pub mod map;
pub mod popup;
pub mod repository;
pub mod search;
pub mod selection;
pub mod session;

pub use config::*;
pub use repository::*;
pub use session::*;
