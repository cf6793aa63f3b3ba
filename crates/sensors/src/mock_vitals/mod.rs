mod generator;
mod source;

pub use generator::VitalsGenerator;
pub use source::{MockVitalsConfig, MockVitalsSource};
