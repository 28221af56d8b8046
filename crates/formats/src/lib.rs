pub mod kml;
pub mod sites;

pub use kml::*;
pub use sites::*;
