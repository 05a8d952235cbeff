pub mod oracle;
pub mod planner;
