pub mod attendance_event;
pub mod attendance_period;
pub mod attendance_setting;
pub mod employee;
pub mod face_template;
pub mod work_schedule;
