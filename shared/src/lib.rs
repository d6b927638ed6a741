use serde::{Deserialize, Serialize};

/// A student on the roster.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Student {
    pub id: String,
    pub name: String,
    /// Free-text home address
    pub address: String,
    /// Parent contact number, phone-shaped but not validated beyond non-empty
    pub parent_phone: String,
    /// Photo URL: `/uploads/<file>` for local storage or an absolute
    /// object-storage URL. Callers must not assume one form.
    pub photo_url: Option<String>,
    /// RFC 3339 timestamp
    pub created_at: String,
    /// RFC 3339 timestamp
    pub updated_at: String,
}

/// One present/absent record for a (student, date) pair.
///
/// At most one record exists per student per calendar date; re-marking the
/// same pair overwrites `present` instead of appending.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AttendanceRecord {
    pub id: String,
    pub student_id: String,
    /// Calendar day in ISO 8601 format (YYYY-MM-DD), no time component
    pub date: String,
    pub present: bool,
    pub created_at: String,
    pub updated_at: String,
}

/// Admin identity as returned to the client (never includes the credential hash).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AdminView {
    pub id: String,
    pub email: String,
    pub name: String,
}

/// Request body for POST /api/auth/login.
///
/// Fields are optional so that a missing field surfaces as a 400 with a
/// readable message rather than a deserialization rejection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginRequest {
    pub email: Option<String>,
    pub password: Option<String>,
}

/// Response for a successful login.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginResponse {
    pub token: String,
    pub admin: AdminView,
}

/// Request body for POST /api/attendance/mark.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MarkAttendanceRequest {
    pub student_id: Option<String>,
    pub date: Option<String>,
    pub present: Option<bool>,
}

/// Response for POST /api/attendance/mark.
///
/// `sms_notification` is only present when the student was marked absent;
/// its content reports the dispatch outcome and never affects the success
/// of the mark itself.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MarkAttendanceResponse {
    pub attendance: AttendanceRecord,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sms_notification: Option<SmsNotification>,
}

/// One (studentId, present) entry of a bulk mark request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BulkMarkRecord {
    pub student_id: Option<String>,
    pub present: Option<bool>,
}

/// Request body for POST /api/attendance/bulk.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BulkMarkRequest {
    pub date: Option<String>,
    pub records: Option<Vec<BulkMarkRecord>>,
}

/// Per-record outcome of a bulk mark. Exactly one of `attendance` and
/// `error` is set: a failed record never aborts the rest of the batch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BulkItemOutcome {
    pub student_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub attendance: Option<AttendanceRecord>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Response for POST /api/attendance/bulk.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BulkMarkResponse {
    pub attendance: Vec<BulkItemOutcome>,
    pub sms_notifications: Vec<BulkSmsNotification>,
}

/// Notification outcome for one absent student in a bulk mark.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BulkSmsNotification {
    pub student_id: String,
    pub student_name: String,
    #[serde(flatten)]
    pub result: SmsNotification,
}

/// Outcome of one absence-notification attempt.
///
/// The dispatcher never raises: provider failures land in `error`, so
/// attendance writes are never blocked by notification problems.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SmsNotification {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mock: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl SmsNotification {
    /// Outcome of a mock dispatch: no network call was made.
    pub fn mock() -> Self {
        Self {
            success: true,
            mock: Some(true),
            message_id: None,
            error: None,
        }
    }

    /// Outcome of a live dispatch accepted by the provider.
    pub fn sent(message_id: impl Into<String>) -> Self {
        Self {
            success: true,
            mock: None,
            message_id: Some(message_id.into()),
            error: None,
        }
    }

    /// Outcome of a failed dispatch attempt.
    pub fn failed(error: impl Into<String>) -> Self {
        Self {
            success: false,
            mock: None,
            message_id: None,
            error: Some(error.into()),
        }
    }
}

/// A student joined with their record (or lack of one) for a single date.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StudentWithAttendance {
    #[serde(flatten)]
    pub student: Student,
    pub attendance: Option<AttendanceRecord>,
}

/// A student joined with their recent attendance history, newest first.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StudentHistory {
    #[serde(flatten)]
    pub student: Student,
    pub attendance: Vec<AttendanceRecord>,
}

/// An attendance record joined with its student, as returned by the
/// summary endpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AttendanceWithStudent {
    #[serde(flatten)]
    pub record: AttendanceRecord,
    pub student: Student,
}

/// Query parameters for GET /api/attendance/summary.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SummaryQuery {
    pub start_date: Option<String>,
    pub end_date: Option<String>,
}

/// Response for DELETE /api/students/:id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeleteStudentResponse {
    pub message: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_student_wire_field_names() {
        let student = Student {
            id: "s1".to_string(),
            name: "Priya Patel".to_string(),
            address: "456 Park Avenue, Mumbai".to_string(),
            parent_phone: "+919876543211".to_string(),
            photo_url: None,
            created_at: "2024-03-01T08:00:00Z".to_string(),
            updated_at: "2024-03-01T08:00:00Z".to_string(),
        };

        let json = serde_json::to_value(&student).unwrap();
        assert_eq!(json["parentPhone"], "+919876543211");
        assert_eq!(json["photoUrl"], serde_json::Value::Null);
        assert!(json.get("parent_phone").is_none());
    }

    #[test]
    fn test_sms_notification_mock_shape() {
        let json = serde_json::to_value(SmsNotification::mock()).unwrap();
        assert_eq!(json["success"], true);
        assert_eq!(json["mock"], true);
        // Unused outcome fields are omitted from the wire entirely
        assert!(json.get("messageId").is_none());
        assert!(json.get("error").is_none());
    }

    #[test]
    fn test_sms_notification_sent_and_failed() {
        let sent = SmsNotification::sent("SM123");
        assert!(sent.success);
        assert_eq!(sent.message_id.as_deref(), Some("SM123"));
        assert!(sent.mock.is_none());

        let failed = SmsNotification::failed("provider rejected the number");
        assert!(!failed.success);
        assert_eq!(failed.error.as_deref(), Some("provider rejected the number"));
    }

    #[test]
    fn test_bulk_sms_notification_flattens_result() {
        let entry = BulkSmsNotification {
            student_id: "s1".to_string(),
            student_name: "Priya Patel".to_string(),
            result: SmsNotification::mock(),
        };

        let json = serde_json::to_value(&entry).unwrap();
        assert_eq!(json["studentId"], "s1");
        assert_eq!(json["studentName"], "Priya Patel");
        // Flattened: success/mock sit next to studentId, not nested
        assert_eq!(json["success"], true);
        assert_eq!(json["mock"], true);
    }

    #[test]
    fn test_student_with_attendance_flattens_student() {
        let student = Student {
            id: "s1".to_string(),
            name: "Rahul Sharma".to_string(),
            address: "123 Main Street, Delhi".to_string(),
            parent_phone: "+919876543210".to_string(),
            photo_url: None,
            created_at: "2024-03-01T08:00:00Z".to_string(),
            updated_at: "2024-03-01T08:00:00Z".to_string(),
        };

        let entry = StudentWithAttendance {
            student,
            attendance: None,
        };

        let json = serde_json::to_value(&entry).unwrap();
        assert_eq!(json["name"], "Rahul Sharma");
        assert_eq!(json["attendance"], serde_json::Value::Null);
    }

    #[test]
    fn test_mark_request_tolerates_missing_fields() {
        // Handlers turn missing fields into a 400, so deserialization
        // itself must accept any subset.
        let req: MarkAttendanceRequest = serde_json::from_str(r#"{"studentId":"s1"}"#).unwrap();
        assert_eq!(req.student_id.as_deref(), Some("s1"));
        assert!(req.date.is_none());
        assert!(req.present.is_none());
    }
}
