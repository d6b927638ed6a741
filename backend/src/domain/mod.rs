//! Domain services: roster management and the attendance workflow.

pub mod attendance_service;
pub mod roster_service;

pub use attendance_service::AttendanceService;
pub use roster_service::{CreateStudentCommand, PhotoUpload, RosterService, UpdateStudentCommand};
