//! Progressive synthesis and playback of one speech session at a time.

pub mod coordinator;
pub mod messages;
mod playback;
pub mod registry;
pub mod state;
mod worker;

pub use coordinator::StreamCoordinator;
pub use messages::{AudioUnit, SessionEnd, SpeechEvent, SpeechRequest, event_channel};
pub use registry::ResourceRegistry;
pub use state::{PlaybackState, SpeechStatus};
pub use worker::SynthesisJob;
