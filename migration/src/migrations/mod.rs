pub mod m202608250001_create_employees;
pub mod m202608250002_create_work_schedules;
pub mod m202608250003_create_attendance_periods;
pub mod m202608250004_create_attendance_events;
pub mod m202608250005_create_attendance_settings;
pub mod m202608250006_create_face_templates;
