use anyhow::{Context, Result};
use chrono::Utc;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::SqlitePool;
use std::str::FromStr;
use std::sync::Arc;
use tracing::info;

/// DbConnection manages the SQLite pool shared by every repository.
#[derive(Clone)]
pub struct DbConnection {
    pool: Arc<SqlitePool>,
}

impl DbConnection {
    /// Open (creating if missing) the database at `url` and set up the schema.
    ///
    /// Foreign keys are enabled on every connection: attendance rows must
    /// never outlive their student.
    pub async fn new(url: &str) -> Result<Self> {
        let options = SqliteConnectOptions::from_str(url)
            .with_context(|| format!("Invalid database URL: {url}"))?
            .create_if_missing(true)
            .foreign_keys(true);

        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect_with(options)
            .await?;

        Self::setup_schema(&pool).await?;

        Ok(Self { pool: Arc::new(pool) })
    }

    /// Initialize a test database with a unique name so tests never share state.
    #[cfg(test)]
    pub async fn init_test() -> Result<Self> {
        let test_id = uuid::Uuid::new_v4().to_string();
        let db_url = format!("file:memdb_{}?mode=memory&cache=shared", test_id);

        Self::new(&db_url).await
    }

    /// Set up the required database schema
    async fn setup_schema(pool: &SqlitePool) -> Result<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS admins (
                id TEXT PRIMARY KEY,
                email TEXT NOT NULL UNIQUE,
                password_hash TEXT NOT NULL,
                name TEXT NOT NULL,
                created_at TEXT NOT NULL
            );
            "#,
        )
        .execute(pool)
        .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS students (
                id TEXT PRIMARY KEY,
                name TEXT NOT NULL,
                address TEXT NOT NULL,
                parent_phone TEXT NOT NULL,
                photo_url TEXT,
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL
            );
            "#,
        )
        .execute(pool)
        .await?;

        // UNIQUE(student_id, date) is the serialization point for concurrent
        // marks on the same pair; ON DELETE CASCADE keeps records from
        // outliving their student.
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS attendance (
                id TEXT PRIMARY KEY,
                student_id TEXT NOT NULL REFERENCES students(id) ON DELETE CASCADE,
                date TEXT NOT NULL,
                present INTEGER NOT NULL,
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL,
                UNIQUE(student_id, date)
            );
            "#,
        )
        .execute(pool)
        .await?;

        sqlx::query("CREATE INDEX IF NOT EXISTS idx_attendance_date ON attendance(date);")
            .execute(pool)
            .await?;

        Ok(())
    }

    /// Get the underlying SQLite pool
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Seed the default admin account and sample roster.
    ///
    /// The admin is created only when that email is absent; sample students
    /// only when the roster is empty, so reseeding an existing database is
    /// a no-op.
    pub async fn seed(&self, admin_email: &str, admin_password: &str, admin_name: &str) -> Result<()> {
        let existing: Option<(String,)> = sqlx::query_as("SELECT id FROM admins WHERE email = ?")
            .bind(admin_email)
            .fetch_optional(&*self.pool)
            .await?;

        if existing.is_none() {
            let password_hash = crate::auth::hash_password(admin_password)?;
            sqlx::query(
                "INSERT INTO admins (id, email, password_hash, name, created_at) VALUES (?, ?, ?, ?, ?)",
            )
            .bind(uuid::Uuid::new_v4().to_string())
            .bind(admin_email)
            .bind(password_hash)
            .bind(admin_name)
            .bind(Utc::now().to_rfc3339())
            .execute(&*self.pool)
            .await?;

            info!("Created admin user: {}", admin_email);
        }

        let (student_count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM students")
            .fetch_one(&*self.pool)
            .await?;

        if student_count == 0 {
            let sample_students = [
                ("Rahul Sharma", "123 Main Street, Delhi", "+919876543210"),
                ("Priya Patel", "456 Park Avenue, Mumbai", "+919876543211"),
                ("Arjun Singh", "789 Garden Road, Bangalore", "+919876543212"),
            ];

            let now = Utc::now().to_rfc3339();
            for (name, address, parent_phone) in sample_students {
                sqlx::query(
                    "INSERT INTO students (id, name, address, parent_phone, photo_url, created_at, updated_at) VALUES (?, ?, ?, ?, NULL, ?, ?)",
                )
                .bind(uuid::Uuid::new_v4().to_string())
                .bind(name)
                .bind(address)
                .bind(parent_phone)
                .bind(&now)
                .bind(&now)
                .execute(&*self.pool)
                .await?;
            }

            info!("Created sample students");
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_schema_setup_is_idempotent() {
        let db = DbConnection::init_test().await.expect("Failed to create test database");
        // Running setup again against the same pool must not fail
        DbConnection::setup_schema(db.pool()).await.expect("Second setup failed");
    }

    #[tokio::test]
    async fn test_seed_creates_admin_and_students_once() {
        let db = DbConnection::init_test().await.expect("Failed to create test database");

        db.seed("admin@school.com", "admin123", "School Admin")
            .await
            .expect("First seed failed");
        db.seed("admin@school.com", "admin123", "School Admin")
            .await
            .expect("Second seed failed");

        let (admin_count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM admins")
            .fetch_one(db.pool())
            .await
            .unwrap();
        assert_eq!(admin_count, 1);

        let (student_count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM students")
            .fetch_one(db.pool())
            .await
            .unwrap();
        assert_eq!(student_count, 3);
    }

    #[tokio::test]
    async fn test_deleting_student_cascades_to_attendance() {
        let db = DbConnection::init_test().await.expect("Failed to create test database");

        sqlx::query(
            "INSERT INTO students (id, name, address, parent_phone, created_at, updated_at) VALUES ('s1', 'Test', 'Addr', '+100', 't', 't')",
        )
        .execute(db.pool())
        .await
        .unwrap();

        sqlx::query(
            "INSERT INTO attendance (id, student_id, date, present, created_at, updated_at) VALUES ('a1', 's1', '2024-03-01', 1, 't', 't')",
        )
        .execute(db.pool())
        .await
        .unwrap();

        sqlx::query("DELETE FROM students WHERE id = 's1'")
            .execute(db.pool())
            .await
            .unwrap();

        let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM attendance")
            .fetch_one(db.pool())
            .await
            .unwrap();
        assert_eq!(count, 0, "Attendance rows must not outlive their student");
    }
}
