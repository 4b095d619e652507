/// Vote temporel, hystérésis et comptage des passages.
///
/// Transforme la suite des vecteurs de scores (un par fenêtre) en
/// événements confirmés, puis en comptes par classe et lignes de télémétrie.

pub mod engine;
pub mod history;
pub mod pool;
pub mod reporter;
pub mod streak;
pub mod telemetry;

pub use engine::{EngineState, VoteOutcome, VotingConfig, VotingEngine};
pub use history::VoteHistory;
pub use pool::VotingPool;
pub use reporter::{EventReporter, ReportSummary};
pub use streak::StreakState;
pub use telemetry::Telemetry;
