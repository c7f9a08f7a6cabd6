pub mod attendance;
pub mod error;
pub mod recognition;
pub mod template;
