pub mod settings;

pub use settings::{AnalysisParams, EngineSettings, ProviderSettings};
