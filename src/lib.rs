pub mod auto;
pub mod config;
pub mod looper;
pub mod messages;
pub mod request;
pub mod runtime;
pub mod snapshot;
pub mod subsystems;
pub mod swerve;
pub mod teleop;
