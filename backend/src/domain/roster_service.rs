use std::sync::Arc;

use chrono::Utc;
use shared::Student;
use tracing::{info, warn};
use uuid::Uuid;

use crate::error::ApiError;
use crate::photos::PhotoStore;
use crate::storage::StudentRepository;

/// An uploaded photo, already size- and type-checked by the HTTP layer.
#[derive(Debug)]
pub struct PhotoUpload {
    /// Lowercased file extension (jpg, png, ...)
    pub extension: String,
    pub content_type: String,
    pub bytes: Vec<u8>,
}

#[derive(Debug, Default)]
pub struct CreateStudentCommand {
    pub name: Option<String>,
    pub address: Option<String>,
    pub parent_phone: Option<String>,
    pub photo: Option<PhotoUpload>,
}

/// Partial update: only provided fields change.
#[derive(Debug, Default)]
pub struct UpdateStudentCommand {
    pub name: Option<String>,
    pub address: Option<String>,
    pub parent_phone: Option<String>,
    pub photo: Option<PhotoUpload>,
}

/// Service for managing the student roster.
#[derive(Clone)]
pub struct RosterService {
    students: StudentRepository,
    photos: Arc<dyn PhotoStore>,
}

impl RosterService {
    pub fn new(students: StudentRepository, photos: Arc<dyn PhotoStore>) -> Self {
        Self { students, photos }
    }

    /// List all students, ordered by name.
    pub async fn list_students(&self) -> Result<Vec<Student>, ApiError> {
        Ok(self.students.list().await?)
    }

    pub async fn get_student(&self, id: &str) -> Result<Student, ApiError> {
        self.students
            .get(id)
            .await?
            .ok_or_else(|| ApiError::not_found("Student not found"))
    }

    pub async fn create_student(&self, command: CreateStudentCommand) -> Result<Student, ApiError> {
        let name = required_field(command.name)?;
        let address = required_field(command.address)?;
        let parent_phone = required_field(command.parent_phone)?;

        info!("Creating student: {}", name);

        let photo_url = match command.photo {
            Some(photo) => self.store_photo(photo).await,
            None => None,
        };

        let now = Utc::now().to_rfc3339();
        let student = Student {
            id: Uuid::new_v4().to_string(),
            name,
            address,
            parent_phone,
            photo_url,
            created_at: now.clone(),
            updated_at: now,
        };

        self.students.insert(&student).await?;

        info!("Created student {} ({})", student.name, student.id);

        Ok(student)
    }

    pub async fn update_student(&self, id: &str, command: UpdateStudentCommand) -> Result<Student, ApiError> {
        let mut student = self
            .students
            .get(id)
            .await?
            .ok_or_else(|| ApiError::not_found("Student not found"))?;

        info!("Updating student: {}", id);

        if let Some(name) = non_empty(command.name) {
            student.name = name;
        }
        if let Some(address) = non_empty(command.address) {
            student.address = address;
        }
        if let Some(parent_phone) = non_empty(command.parent_phone) {
            student.parent_phone = parent_phone;
        }

        if let Some(photo) = command.photo {
            if let Some(new_url) = self.store_photo(photo).await {
                // The old photo is replaced; removal is best-effort
                if let Some(old_url) = student.photo_url.replace(new_url) {
                    if let Err(e) = self.photos.delete_photo(&old_url).await {
                        warn!("📸 Failed to delete replaced photo {}: {:?}", old_url, e);
                    }
                }
            }
        }

        student.updated_at = Utc::now().to_rfc3339();
        self.students.update(&student).await?;

        Ok(student)
    }

    /// Delete a student. Their attendance records go with them (cascade),
    /// and a stored photo is removed best-effort.
    pub async fn delete_student(&self, id: &str) -> Result<(), ApiError> {
        let student = self
            .students
            .get(id)
            .await?
            .ok_or_else(|| ApiError::not_found("Student not found"))?;

        if let Some(photo_url) = &student.photo_url {
            if let Err(e) = self.photos.delete_photo(photo_url).await {
                warn!("📸 Failed to delete photo {}: {:?}", photo_url, e);
            }
        }

        self.students.delete(id).await?;

        info!("Deleted student {} ({})", student.name, student.id);

        Ok(())
    }

    /// Store an uploaded photo, returning its URL.
    ///
    /// A storage failure degrades to no photo rather than failing the
    /// surrounding create/update; the student record stays authoritative.
    async fn store_photo(&self, photo: PhotoUpload) -> Option<String> {
        let file_name = format!("student-{}.{}", Uuid::new_v4(), photo.extension);

        match self
            .photos
            .store_photo(&file_name, photo.bytes, &photo.content_type)
            .await
        {
            Ok(url) => {
                info!("📸 Photo stored: {}", url);
                Some(url)
            }
            Err(e) => {
                warn!("📸 Photo upload failed, continuing without photo: {:?}", e);
                None
            }
        }
    }
}

fn required_field(value: Option<String>) -> Result<String, ApiError> {
    non_empty(value).ok_or_else(|| ApiError::invalid("Name, address, and parent phone are required"))
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}
