mod local_media;
mod local_track;
mod media_devices;
mod substitute;
mod track_controller;

pub use local_media::*;
pub use local_track::*;
pub use media_devices::*;
pub use substitute::*;
pub use track_controller::*;
