// Pipeline - the stages of a content job

pub mod brief;
pub mod key_messages;
pub mod orchestrator;
pub mod reviewer;
pub mod text_agents;

pub use brief::{build_brief, key_messages_from_brief, parse_json_object, BriefInput};
pub use key_messages::{extract_key_messages, EXTRACTION_PLACEHOLDER};
pub use orchestrator::{Orchestrator, PipelineDeps, SHORTS_SKIPPED_WARNING};
pub use reviewer::{required_paths, ReviewOutcome, Reviewer};
pub use text_agents::{TextAgentInput, TextAgentOutput, TextAgentService};
