pub mod attendance;
pub mod employee;
pub mod holiday;
pub mod role;
pub mod working_hours;
