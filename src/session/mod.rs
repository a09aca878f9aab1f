pub mod config;
pub mod outcome;
pub mod session;
pub mod turns;

pub use config::InterviewConfig;
pub use outcome::InterviewOutcome;
pub use session::{InterviewSession, SessionState};
pub use turns::{Speaker, Turn, TurnReconciler};
