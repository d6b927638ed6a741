use axum::{
    extract::{Multipart, Path, State},
    http::StatusCode,
    Json,
};
use shared::{DeleteStudentResponse, Student};
use tracing::info;

use crate::auth::AuthAdmin;
use crate::domain::{CreateStudentCommand, PhotoUpload, UpdateStudentCommand};
use crate::error::ApiError;
use crate::rest::AppState;

/// Photo uploads: 5 MiB max, images only.
const MAX_PHOTO_BYTES: usize = 5 * 1024 * 1024;
const ALLOWED_PHOTO_TYPES: [&str; 5] = ["jpeg", "jpg", "png", "gif", "webp"];

/// GET /api/students
pub async fn list_students(
    State(state): State<AppState>,
    _admin: AuthAdmin,
) -> Result<Json<Vec<Student>>, ApiError> {
    info!("GET /api/students");

    let students = state.roster_service.list_students().await?;
    Ok(Json(students))
}

/// GET /api/students/:id
pub async fn get_student(
    State(state): State<AppState>,
    _admin: AuthAdmin,
    Path(id): Path<String>,
) -> Result<Json<Student>, ApiError> {
    info!("GET /api/students/{}", id);

    let student = state.roster_service.get_student(&id).await?;
    Ok(Json(student))
}

/// POST /api/students (multipart: name, address, parentPhone, photo?)
pub async fn create_student(
    State(state): State<AppState>,
    _admin: AuthAdmin,
    mut multipart: Multipart,
) -> Result<(StatusCode, Json<Student>), ApiError> {
    info!("POST /api/students");

    let form = parse_student_form(&mut multipart).await?;
    let student = state
        .roster_service
        .create_student(CreateStudentCommand {
            name: form.name,
            address: form.address,
            parent_phone: form.parent_phone,
            photo: form.photo,
        })
        .await?;

    Ok((StatusCode::CREATED, Json(student)))
}

/// PUT /api/students/:id (multipart, partial fields)
pub async fn update_student(
    State(state): State<AppState>,
    _admin: AuthAdmin,
    Path(id): Path<String>,
    mut multipart: Multipart,
) -> Result<Json<Student>, ApiError> {
    info!("PUT /api/students/{}", id);

    let form = parse_student_form(&mut multipart).await?;
    let student = state
        .roster_service
        .update_student(
            &id,
            UpdateStudentCommand {
                name: form.name,
                address: form.address,
                parent_phone: form.parent_phone,
                photo: form.photo,
            },
        )
        .await?;

    Ok(Json(student))
}

/// DELETE /api/students/:id
pub async fn delete_student(
    State(state): State<AppState>,
    _admin: AuthAdmin,
    Path(id): Path<String>,
) -> Result<Json<DeleteStudentResponse>, ApiError> {
    info!("DELETE /api/students/{}", id);

    state.roster_service.delete_student(&id).await?;
    Ok(Json(DeleteStudentResponse {
        message: "Student deleted successfully".to_string(),
    }))
}

#[derive(Default)]
struct StudentForm {
    name: Option<String>,
    address: Option<String>,
    parent_phone: Option<String>,
    photo: Option<PhotoUpload>,
}

async fn parse_student_form(multipart: &mut Multipart) -> Result<StudentForm, ApiError> {
    let mut form = StudentForm::default();

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::invalid(format!("Invalid multipart body: {e}")))?
    {
        let field_name = field.name().unwrap_or_default().to_string();
        match field_name.as_str() {
            "name" => form.name = Some(field_text(field).await?),
            "address" => form.address = Some(field_text(field).await?),
            "parentPhone" => form.parent_phone = Some(field_text(field).await?),
            "photo" => {
                let file_name = field.file_name().unwrap_or_default().to_string();
                let content_type = field.content_type().unwrap_or_default().to_string();
                let bytes = field
                    .bytes()
                    .await
                    .map_err(|e| ApiError::invalid(format!("Invalid photo upload: {e}")))?;

                // A file input submitted empty is treated as no photo
                if bytes.is_empty() {
                    continue;
                }
                if bytes.len() > MAX_PHOTO_BYTES {
                    return Err(ApiError::invalid("Photo must be 5MB or smaller"));
                }
                let extension = photo_extension(&file_name, &content_type)
                    .ok_or_else(|| ApiError::invalid("Only image files are allowed"))?;

                form.photo = Some(PhotoUpload {
                    extension,
                    content_type,
                    bytes: bytes.to_vec(),
                });
            }
            _ => {}
        }
    }

    Ok(form)
}

async fn field_text(field: axum::extract::multipart::Field<'_>) -> Result<String, ApiError> {
    field
        .text()
        .await
        .map_err(|e| ApiError::invalid(format!("Invalid multipart field: {e}")))
}

/// Both the file extension and the MIME type must look like an allowed
/// image format. Returns the lowercased extension used for the stored name.
fn photo_extension(file_name: &str, content_type: &str) -> Option<String> {
    let extension = std::path::Path::new(file_name)
        .extension()?
        .to_str()?
        .to_ascii_lowercase();

    if !ALLOWED_PHOTO_TYPES.contains(&extension.as_str()) {
        return None;
    }
    if !ALLOWED_PHOTO_TYPES.iter().any(|t| content_type.contains(t)) {
        return None;
    }

    Some(extension)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_photo_extension_accepts_images() {
        assert_eq!(
            photo_extension("me.PNG", "image/png").as_deref(),
            Some("png")
        );
        assert_eq!(
            photo_extension("photo.jpeg", "image/jpeg").as_deref(),
            Some("jpeg")
        );
        assert_eq!(
            photo_extension("pic.webp", "image/webp").as_deref(),
            Some("webp")
        );
    }

    #[test]
    fn test_photo_extension_rejects_non_images() {
        // Wrong extension
        assert!(photo_extension("malware.exe", "image/png").is_none());
        // Wrong MIME type
        assert!(photo_extension("photo.png", "application/octet-stream").is_none());
        // No extension at all
        assert!(photo_extension("photo", "image/png").is_none());
    }
}
