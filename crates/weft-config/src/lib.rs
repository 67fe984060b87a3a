pub mod locate;
pub mod recover;

pub use locate::{locate_launch, LaunchSpec};
pub use recover::{parse_config, recover_config};
