pub mod command_mapper;
pub mod gesture_classifier;
pub mod pose_extractor;
pub mod report;
pub mod tracing;

pub use command_mapper::*;
pub use gesture_classifier::*;
pub use pose_extractor::*;
pub use report::*;
pub use self::tracing::*;
