pub mod engine;

pub use engine::{ImpactAnalyzer, ImpactReport, ImpactStatus};
