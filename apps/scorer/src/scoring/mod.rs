// Hybrid profile scoring: fuzzy skills, TF-IDF text similarity, experience and
// education, combined by the composite scorer. All pure CPU work; workers run
// it inside tokio::task::spawn_blocking.

pub mod composite;
pub mod config;
pub mod education;
pub mod experience;
pub mod skills;
pub mod text_similarity;

pub use composite::{CompositeScorer, ProfileScorer};
pub use config::ScoringConfig;
