pub mod arm_command;
pub mod config;
pub mod gesture;
pub mod hand_pose;
pub mod landmark;
pub mod relay_message;
pub mod tracking_stats;

pub use arm_command::*;
pub use config::*;
pub use gesture::*;
pub use hand_pose::*;
pub use landmark::*;
pub use relay_message::*;
pub use tracking_stats::*;
