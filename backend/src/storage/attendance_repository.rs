use anyhow::Result;
use chrono::Utc;
use shared::{AttendanceRecord, AttendanceWithStudent, Student};
use sqlx::Row;

use crate::db::DbConnection;

/// Repository for attendance records, keyed by (student_id, date).
#[derive(Clone)]
pub struct AttendanceRepository {
    db: DbConnection,
}

impl AttendanceRepository {
    pub fn new(db: DbConnection) -> Self {
        Self { db }
    }

    /// Insert-or-overwrite the record for (student_id, date).
    ///
    /// A single statement against the UNIQUE(student_id, date) constraint:
    /// the store serializes concurrent marks on the same pair, the second
    /// write wins on `present`, and the record keeps its original id and
    /// created_at.
    pub async fn upsert(&self, student_id: &str, date: &str, present: bool) -> Result<AttendanceRecord> {
        let now = Utc::now().to_rfc3339();

        let row = sqlx::query(
            r#"
            INSERT INTO attendance (id, student_id, date, present, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?)
            ON CONFLICT(student_id, date)
            DO UPDATE SET present = excluded.present, updated_at = excluded.updated_at
            RETURNING id, student_id, date, present, created_at, updated_at
            "#,
        )
        .bind(uuid::Uuid::new_v4().to_string())
        .bind(student_id)
        .bind(date)
        .bind(present)
        .bind(&now)
        .bind(&now)
        .fetch_one(self.db.pool())
        .await?;

        Ok(to_record(row))
    }

    pub async fn for_student_and_date(&self, student_id: &str, date: &str) -> Result<Option<AttendanceRecord>> {
        let row = sqlx::query(
            "SELECT id, student_id, date, present, created_at, updated_at FROM attendance WHERE student_id = ? AND date = ?",
        )
        .bind(student_id)
        .bind(date)
        .fetch_optional(self.db.pool())
        .await?;

        Ok(row.map(to_record))
    }

    pub async fn for_date(&self, date: &str) -> Result<Vec<AttendanceRecord>> {
        let rows = sqlx::query(
            "SELECT id, student_id, date, present, created_at, updated_at FROM attendance WHERE date = ?",
        )
        .bind(date)
        .fetch_all(self.db.pool())
        .await?;

        Ok(rows.into_iter().map(to_record).collect())
    }

    /// Most recent records for one student, newest date first.
    pub async fn history(&self, student_id: &str, limit: u32) -> Result<Vec<AttendanceRecord>> {
        let rows = sqlx::query(
            "SELECT id, student_id, date, present, created_at, updated_at FROM attendance WHERE student_id = ? ORDER BY date DESC LIMIT ?",
        )
        .bind(student_id)
        .bind(limit)
        .fetch_all(self.db.pool())
        .await?;

        Ok(rows.into_iter().map(to_record).collect())
    }

    /// Records within [start, end] joined with their students, newest date
    /// first. Reversed bounds simply match nothing.
    pub async fn range(&self, start: &str, end: &str) -> Result<Vec<AttendanceWithStudent>> {
        let rows = sqlx::query(
            r#"
            SELECT a.id, a.student_id, a.date, a.present, a.created_at, a.updated_at,
                   s.id AS s_id, s.name AS s_name, s.address AS s_address,
                   s.parent_phone AS s_parent_phone, s.photo_url AS s_photo_url,
                   s.created_at AS s_created_at, s.updated_at AS s_updated_at
            FROM attendance a
            JOIN students s ON s.id = a.student_id
            WHERE a.date BETWEEN ? AND ?
            ORDER BY a.date DESC
            "#,
        )
        .bind(start)
        .bind(end)
        .fetch_all(self.db.pool())
        .await?;

        Ok(rows
            .into_iter()
            .map(|row| {
                let student = Student {
                    id: row.get("s_id"),
                    name: row.get("s_name"),
                    address: row.get("s_address"),
                    parent_phone: row.get("s_parent_phone"),
                    photo_url: row.get("s_photo_url"),
                    created_at: row.get("s_created_at"),
                    updated_at: row.get("s_updated_at"),
                };
                AttendanceWithStudent {
                    record: to_record(row),
                    student,
                }
            })
            .collect())
    }
}

fn to_record(row: sqlx::sqlite::SqliteRow) -> AttendanceRecord {
    AttendanceRecord {
        id: row.get("id"),
        student_id: row.get("student_id"),
        date: row.get("date"),
        present: row.get("present"),
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::student_repository::{make_student, StudentRepository};

    async fn setup_test() -> (AttendanceRepository, StudentRepository) {
        let db = DbConnection::init_test().await.expect("Failed to create test database");
        let students = StudentRepository::new(db.clone());
        students.insert(&make_student("s1", "Rahul Sharma")).await.unwrap();
        students.insert(&make_student("s2", "Priya Patel")).await.unwrap();
        (AttendanceRepository::new(db), students)
    }

    #[tokio::test]
    async fn test_upsert_creates_record() {
        let (repo, _) = setup_test().await;

        let record = repo.upsert("s1", "2024-03-01", true).await.unwrap();
        assert_eq!(record.student_id, "s1");
        assert_eq!(record.date, "2024-03-01");
        assert!(record.present);
    }

    #[tokio::test]
    async fn test_upsert_overwrites_instead_of_duplicating() {
        let (repo, _) = setup_test().await;

        let first = repo.upsert("s1", "2024-03-01", true).await.unwrap();
        let second = repo.upsert("s1", "2024-03-01", false).await.unwrap();

        // Same record: identity and creation time survive the overwrite
        assert_eq!(second.id, first.id);
        assert_eq!(second.created_at, first.created_at);
        assert!(!second.present);

        let records = repo.for_date("2024-03-01").await.unwrap();
        assert_eq!(records.len(), 1);
        assert!(!records[0].present);
    }

    #[tokio::test]
    async fn test_upsert_same_value_is_idempotent() {
        let (repo, _) = setup_test().await;

        let first = repo.upsert("s1", "2024-03-01", false).await.unwrap();
        let second = repo.upsert("s1", "2024-03-01", false).await.unwrap();

        assert_eq!(first.id, second.id);
        assert_eq!(repo.for_date("2024-03-01").await.unwrap().len(), 1);
        assert!(!second.present);
    }

    #[tokio::test]
    async fn test_distinct_dates_make_distinct_records() {
        let (repo, _) = setup_test().await;

        repo.upsert("s1", "2024-03-01", true).await.unwrap();
        repo.upsert("s1", "2024-03-02", false).await.unwrap();

        assert_eq!(repo.history("s1", 30).await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_history_ordered_and_limited() {
        let (repo, _) = setup_test().await;

        repo.upsert("s1", "2024-03-01", true).await.unwrap();
        repo.upsert("s1", "2024-03-03", false).await.unwrap();
        repo.upsert("s1", "2024-03-02", true).await.unwrap();

        let history = repo.history("s1", 30).await.unwrap();
        let dates: Vec<&str> = history.iter().map(|r| r.date.as_str()).collect();
        assert_eq!(dates, vec!["2024-03-03", "2024-03-02", "2024-03-01"]);

        let limited = repo.history("s1", 2).await.unwrap();
        assert_eq!(limited.len(), 2);
        assert_eq!(limited[0].date, "2024-03-03");
    }

    #[tokio::test]
    async fn test_range_joins_students_newest_first() {
        let (repo, _) = setup_test().await;

        repo.upsert("s1", "2024-03-01", true).await.unwrap();
        repo.upsert("s2", "2024-03-02", false).await.unwrap();
        repo.upsert("s1", "2024-03-05", false).await.unwrap();

        let rows = repo.range("2024-03-01", "2024-03-02").await.unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].record.date, "2024-03-02");
        assert_eq!(rows[0].student.name, "Priya Patel");
        assert_eq!(rows[1].record.date, "2024-03-01");
        assert_eq!(rows[1].student.name, "Rahul Sharma");
    }

    #[tokio::test]
    async fn test_range_with_reversed_bounds_is_empty() {
        let (repo, _) = setup_test().await;
        repo.upsert("s1", "2024-03-01", true).await.unwrap();

        let rows = repo.range("2024-03-02", "2024-03-01").await.unwrap();
        assert!(rows.is_empty());
    }

    #[tokio::test]
    async fn test_upsert_unknown_student_violates_foreign_key() {
        let (repo, _) = setup_test().await;
        assert!(repo.upsert("ghost", "2024-03-01", true).await.is_err());
    }
}
