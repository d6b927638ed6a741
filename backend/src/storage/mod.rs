//! Storage layer: one repository per aggregate, all sharing the same
//! [`DbConnection`](crate::db::DbConnection) pool.

pub mod admin_repository;
pub mod attendance_repository;
pub mod student_repository;

pub use admin_repository::{AdminRecord, AdminRepository};
pub use attendance_repository::AttendanceRepository;
pub use student_repository::StudentRepository;
