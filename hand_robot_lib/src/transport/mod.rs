pub mod client;
pub mod error;
pub mod scheduler;

pub use client::*;
pub use error::*;
pub use scheduler::*;
