//! URL reputation engine: polling, normalization and scoring

pub mod normalizer;
pub mod reputation_engine;
pub mod resolver;
pub mod scorer;

pub use normalizer::{normalize, EngineVotes, ScanStats, Verdict};
pub use reputation_engine::{DomainVerdict, ReputationEngine, UrlVerdict};
pub use resolver::{PollPolicy, PollResolver, ScanStatus};
pub use scorer::{assess_risk, classify_safety, Grade, ReputationAssessment, ReputationStatus, Safety};
