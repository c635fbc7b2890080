// Service layer: the multi-timeframe analyzer
pub mod analysis_service;

pub use analysis_service::AnalysisService;
