pub mod controller;
pub mod debouncer;
pub mod pipeline;

pub use controller::{ScanController, ScanOutcome};
pub use debouncer::{ScanDebouncer, ScanDecision};
pub use pipeline::{Resolution, ResolutionSource, ScanPipeline};
