pub mod discovery;
pub mod peers;
pub mod pipeline;

pub use discovery::sector_peers;
pub use peers::{validate_indicators, PeerAnalyzer};
pub use pipeline::{AnalysisRequest, CreditAnalysis};
