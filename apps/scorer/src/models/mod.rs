pub mod job;
pub mod profile;
pub mod requirement;
pub mod score;
