pub mod types;
pub mod mock_vitals;

// Re-export the main types that users need
pub use types::{SampleSource, SourceError};
pub use mock_vitals::{MockVitalsConfig, MockVitalsSource};
