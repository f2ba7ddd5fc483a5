//! Speaking Coach Core Library
//!
//! Runs timed IELTS speaking-test sessions: examiner turns, candidate answers,
//! the per-part clock and the final band-score evaluation, with the hosted AI
//! services behind swappable collaborator traits.

pub mod collaborators;
pub mod session;
pub mod telemetry;
