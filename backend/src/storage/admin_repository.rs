use anyhow::Result;
use sqlx::Row;

use crate::db::DbConnection;

/// An admin row, credential hash included. Never serialized to clients;
/// the REST layer only ever exposes [`shared::AdminView`].
#[derive(Debug, Clone)]
pub struct AdminRecord {
    pub id: String,
    pub email: String,
    pub password_hash: String,
    pub name: String,
}

/// Repository for admin accounts.
#[derive(Clone)]
pub struct AdminRepository {
    db: DbConnection,
}

impl AdminRepository {
    pub fn new(db: DbConnection) -> Self {
        Self { db }
    }

    pub async fn find_by_email(&self, email: &str) -> Result<Option<AdminRecord>> {
        let row = sqlx::query(
            "SELECT id, email, password_hash, name FROM admins WHERE email = ?",
        )
        .bind(email)
        .fetch_optional(self.db.pool())
        .await?;

        Ok(row.map(to_record))
    }

    pub async fn find_by_id(&self, id: &str) -> Result<Option<AdminRecord>> {
        let row = sqlx::query(
            "SELECT id, email, password_hash, name FROM admins WHERE id = ?",
        )
        .bind(id)
        .fetch_optional(self.db.pool())
        .await?;

        Ok(row.map(to_record))
    }

    pub async fn insert(&self, admin: &AdminRecord) -> Result<()> {
        sqlx::query(
            "INSERT INTO admins (id, email, password_hash, name, created_at) VALUES (?, ?, ?, ?, ?)",
        )
        .bind(&admin.id)
        .bind(&admin.email)
        .bind(&admin.password_hash)
        .bind(&admin.name)
        .bind(chrono::Utc::now().to_rfc3339())
        .execute(self.db.pool())
        .await?;

        Ok(())
    }
}

fn to_record(row: sqlx::sqlite::SqliteRow) -> AdminRecord {
    AdminRecord {
        id: row.get("id"),
        email: row.get("email"),
        password_hash: row.get("password_hash"),
        name: row.get("name"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn setup_test() -> AdminRepository {
        let db = DbConnection::init_test().await.expect("Failed to create test database");
        AdminRepository::new(db)
    }

    fn test_admin() -> AdminRecord {
        AdminRecord {
            id: "admin-1".to_string(),
            email: "admin@school.com".to_string(),
            password_hash: "$argon2id$fake".to_string(),
            name: "School Admin".to_string(),
        }
    }

    #[tokio::test]
    async fn test_insert_and_find_by_email() {
        let repo = setup_test().await;
        repo.insert(&test_admin()).await.expect("Failed to insert admin");

        let found = repo
            .find_by_email("admin@school.com")
            .await
            .expect("Query failed")
            .expect("Admin not found");
        assert_eq!(found.id, "admin-1");
        assert_eq!(found.name, "School Admin");
    }

    #[tokio::test]
    async fn test_find_by_id() {
        let repo = setup_test().await;
        repo.insert(&test_admin()).await.unwrap();

        assert!(repo.find_by_id("admin-1").await.unwrap().is_some());
        assert!(repo.find_by_id("missing").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_email_is_unique() {
        let repo = setup_test().await;
        repo.insert(&test_admin()).await.unwrap();

        let mut duplicate = test_admin();
        duplicate.id = "admin-2".to_string();
        assert!(repo.insert(&duplicate).await.is_err());
    }
}
