pub mod catalog;
pub mod evaluation;
pub mod interviewer;
pub mod prompt_loader;
pub mod prompts;
pub mod session;
pub mod speech;
pub mod store;

pub use catalog::{ExperienceLevel, Role};
pub use evaluation::{Evaluation, Report, ResponseBreakdown};
pub use interviewer::{ChatProvider, ChatSettings, Interviewer, InterviewerClient, QuestionContext};
pub use session::InterviewSession;
pub use store::{InMemorySessionStore, SessionEntry, SessionHandle, SessionStore};
