mod candidate_buffer;
mod negotiator;
mod peer_session;
mod registry;
mod signaling_state;

pub use candidate_buffer::*;
pub use negotiator::*;
pub use peer_session::*;
pub use registry::*;
pub use signaling_state::*;
