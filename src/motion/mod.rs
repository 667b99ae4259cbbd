//! Motion planning: coordinate sequences to actuator-level commands.

pub mod command;
pub mod planner;

pub use command::MotionCommand;
pub use planner::plan;
