use std::collections::HashMap;
use std::sync::Arc;

use chrono::NaiveDate;
use shared::{
    AttendanceRecord, AttendanceWithStudent, BulkItemOutcome, BulkMarkRecord, BulkMarkRequest,
    BulkMarkResponse, BulkSmsNotification, MarkAttendanceRequest, MarkAttendanceResponse, Student,
    StudentHistory, StudentWithAttendance,
};
use tracing::{info, warn};

use crate::error::ApiError;
use crate::notify::AbsenceNotifier;
use crate::storage::{AttendanceRepository, StudentRepository};

/// History depth for the per-student view: last 30 records.
const HISTORY_LIMIT: u32 = 30;

/// The daily attendance workflow: single and bulk upsert-and-notify, plus
/// the read views built on the same records.
#[derive(Clone)]
pub struct AttendanceService {
    students: StudentRepository,
    attendance: AttendanceRepository,
    notifier: Arc<dyn AbsenceNotifier>,
}

impl AttendanceService {
    pub fn new(
        students: StudentRepository,
        attendance: AttendanceRepository,
        notifier: Arc<dyn AbsenceNotifier>,
    ) -> Self {
        Self {
            students,
            attendance,
            notifier,
        }
    }

    /// Mark one student for one day.
    ///
    /// The upsert is atomic against the (student, date) uniqueness
    /// constraint; re-marking overwrites `present`. An absence triggers one
    /// notification attempt after the write, and the dispatch outcome is
    /// attached to the response without ever failing the mark.
    pub async fn mark_attendance(
        &self,
        request: MarkAttendanceRequest,
    ) -> Result<MarkAttendanceResponse, ApiError> {
        let student_id = request
            .student_id
            .filter(|v| !v.trim().is_empty())
            .ok_or_else(|| ApiError::invalid("Student ID, date, and present status are required"))?;
        let date = request
            .date
            .filter(|v| !v.trim().is_empty())
            .ok_or_else(|| ApiError::invalid("Student ID, date, and present status are required"))?;
        let present = request
            .present
            .ok_or_else(|| ApiError::invalid("Student ID, date, and present status are required"))?;
        validate_date(&date)?;

        let student = self
            .students
            .get(&student_id)
            .await?
            .ok_or_else(|| ApiError::not_found("Student not found"))?;

        info!("Marking {} as {} on {}", student.name, present_label(present), date);

        let attendance = self.attendance.upsert(&student.id, &date, present).await?;

        // The write above is durable; a notification failure is reported,
        // never propagated.
        let sms_notification = if !present {
            Some(
                self.notifier
                    .notify_absence(&student.name, &student.parent_phone)
                    .await,
            )
        } else {
            None
        };

        Ok(MarkAttendanceResponse {
            attendance,
            sms_notification,
        })
    }

    /// Mark a batch of students for one day.
    ///
    /// Records are independent: a failing record becomes a per-item error
    /// entry and the rest of the batch continues. Notifications go out in a
    /// second phase, once every upsert has been attempted, so nothing is
    /// dispatched before its write is durable.
    pub async fn mark_attendance_bulk(
        &self,
        request: BulkMarkRequest,
    ) -> Result<BulkMarkResponse, ApiError> {
        let date = request
            .date
            .filter(|v| !v.trim().is_empty())
            .ok_or_else(|| ApiError::invalid("Date and records array are required"))?;
        let records = request
            .records
            .filter(|r| !r.is_empty())
            .ok_or_else(|| ApiError::invalid("Date and records array are required"))?;
        validate_date(&date)?;

        info!("Bulk marking {} records for {}", records.len(), date);

        let mut outcomes = Vec::with_capacity(records.len());
        let mut absent_students: Vec<Student> = Vec::new();

        for record in &records {
            match self.upsert_bulk_record(record, &date).await {
                Ok((attendance, student)) => {
                    if !attendance.present {
                        absent_students.push(student);
                    }
                    outcomes.push(BulkItemOutcome {
                        student_id: record.student_id.clone(),
                        attendance: Some(attendance),
                        error: None,
                    });
                }
                Err(err) => {
                    warn!(
                        "Bulk mark failed for {:?}: {}",
                        record.student_id, err
                    );
                    outcomes.push(BulkItemOutcome {
                        student_id: record.student_id.clone(),
                        attendance: None,
                        error: Some(err.to_string()),
                    });
                }
            }
        }

        let mut sms_notifications = Vec::with_capacity(absent_students.len());
        for student in absent_students {
            let result = self
                .notifier
                .notify_absence(&student.name, &student.parent_phone)
                .await;
            sms_notifications.push(BulkSmsNotification {
                student_id: student.id,
                student_name: student.name,
                result,
            });
        }

        Ok(BulkMarkResponse {
            attendance: outcomes,
            sms_notifications,
        })
    }

    async fn upsert_bulk_record(
        &self,
        record: &BulkMarkRecord,
        date: &str,
    ) -> Result<(AttendanceRecord, Student), ApiError> {
        let student_id = record
            .student_id
            .as_deref()
            .filter(|v| !v.trim().is_empty())
            .ok_or_else(|| ApiError::invalid("Student ID and present status are required"))?;
        let present = record
            .present
            .ok_or_else(|| ApiError::invalid("Student ID and present status are required"))?;

        let student = self
            .students
            .get(student_id)
            .await?
            .ok_or_else(|| ApiError::not_found("Student not found"))?;

        let attendance = self.attendance.upsert(&student.id, date, present).await?;

        Ok((attendance, student))
    }

    /// Every student, each with their record for `date` or null.
    pub async fn attendance_by_date(&self, date: &str) -> Result<Vec<StudentWithAttendance>, ApiError> {
        validate_date(date)?;

        let students = self.students.list().await?;
        let mut records: HashMap<String, AttendanceRecord> = self
            .attendance
            .for_date(date)
            .await?
            .into_iter()
            .map(|record| (record.student_id.clone(), record))
            .collect();

        Ok(students
            .into_iter()
            .map(|student| {
                let attendance = records.remove(&student.id);
                StudentWithAttendance { student, attendance }
            })
            .collect())
    }

    /// One student with their last 30 records, newest first.
    pub async fn student_history(&self, student_id: &str) -> Result<StudentHistory, ApiError> {
        let student = self
            .students
            .get(student_id)
            .await?
            .ok_or_else(|| ApiError::not_found("Student not found"))?;

        let attendance = self.attendance.history(&student.id, HISTORY_LIMIT).await?;

        Ok(StudentHistory { student, attendance })
    }

    /// All records within [start, end] joined with students, newest first.
    /// Pure read; reversed bounds yield an empty list.
    pub async fn summary(
        &self,
        start_date: Option<String>,
        end_date: Option<String>,
    ) -> Result<Vec<AttendanceWithStudent>, ApiError> {
        let start = start_date
            .filter(|v| !v.trim().is_empty())
            .ok_or_else(|| ApiError::invalid("Start date and end date are required"))?;
        let end = end_date
            .filter(|v| !v.trim().is_empty())
            .ok_or_else(|| ApiError::invalid("Start date and end date are required"))?;
        validate_date(&start)?;
        validate_date(&end)?;

        Ok(self.attendance.range(&start, &end).await?)
    }
}

fn validate_date(date: &str) -> Result<(), ApiError> {
    NaiveDate::parse_from_str(date, "%Y-%m-%d")
        .map(|_| ())
        .map_err(|_| ApiError::invalid("Date must be in YYYY-MM-DD format"))
}

fn present_label(present: bool) -> &'static str {
    if present {
        "present"
    } else {
        "absent"
    }
}
