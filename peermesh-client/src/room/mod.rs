mod coordinator;
mod render_surface;
mod room_command;
mod room_handle;
mod room_membership;
mod room_snapshot;

pub use coordinator::*;
pub use render_surface::*;
pub use room_command::*;
pub use room_handle::*;
pub use room_membership::*;
pub use room_snapshot::*;
