use anyhow::Result;
use shared::Student;
use sqlx::Row;

use crate::db::DbConnection;

/// Repository for the student roster.
#[derive(Clone)]
pub struct StudentRepository {
    db: DbConnection,
}

impl StudentRepository {
    pub fn new(db: DbConnection) -> Self {
        Self { db }
    }

    /// List all students ordered by name.
    pub async fn list(&self) -> Result<Vec<Student>> {
        let rows = sqlx::query(
            "SELECT id, name, address, parent_phone, photo_url, created_at, updated_at FROM students ORDER BY name ASC",
        )
        .fetch_all(self.db.pool())
        .await?;

        Ok(rows.into_iter().map(to_student).collect())
    }

    pub async fn get(&self, id: &str) -> Result<Option<Student>> {
        let row = sqlx::query(
            "SELECT id, name, address, parent_phone, photo_url, created_at, updated_at FROM students WHERE id = ?",
        )
        .bind(id)
        .fetch_optional(self.db.pool())
        .await?;

        Ok(row.map(to_student))
    }

    pub async fn insert(&self, student: &Student) -> Result<()> {
        sqlx::query(
            "INSERT INTO students (id, name, address, parent_phone, photo_url, created_at, updated_at) VALUES (?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(&student.id)
        .bind(&student.name)
        .bind(&student.address)
        .bind(&student.parent_phone)
        .bind(&student.photo_url)
        .bind(&student.created_at)
        .bind(&student.updated_at)
        .execute(self.db.pool())
        .await?;

        Ok(())
    }

    pub async fn update(&self, student: &Student) -> Result<()> {
        sqlx::query(
            "UPDATE students SET name = ?, address = ?, parent_phone = ?, photo_url = ?, updated_at = ? WHERE id = ?",
        )
        .bind(&student.name)
        .bind(&student.address)
        .bind(&student.parent_phone)
        .bind(&student.photo_url)
        .bind(&student.updated_at)
        .bind(&student.id)
        .execute(self.db.pool())
        .await?;

        Ok(())
    }

    /// Delete a student. Returns false when no such student existed.
    /// Attendance rows for the student are removed by the cascade.
    pub async fn delete(&self, id: &str) -> Result<bool> {
        let result = sqlx::query("DELETE FROM students WHERE id = ?")
            .bind(id)
            .execute(self.db.pool())
            .await?;

        Ok(result.rows_affected() > 0)
    }
}

fn to_student(row: sqlx::sqlite::SqliteRow) -> Student {
    Student {
        id: row.get("id"),
        name: row.get("name"),
        address: row.get("address"),
        parent_phone: row.get("parent_phone"),
        photo_url: row.get("photo_url"),
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
    }
}

#[cfg(test)]
pub(crate) fn make_student(id: &str, name: &str) -> Student {
    Student {
        id: id.to_string(),
        name: name.to_string(),
        address: "123 Main Street, Delhi".to_string(),
        parent_phone: "+919876543210".to_string(),
        photo_url: None,
        created_at: "2024-03-01T08:00:00+00:00".to_string(),
        updated_at: "2024-03-01T08:00:00+00:00".to_string(),
    }
}
