pub mod attendance;
pub mod device;
pub mod employee;
pub mod holiday;
pub mod import;
pub mod report;
pub mod working_hours;
