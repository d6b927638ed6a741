use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use tracing::info;

use crate::config::PhotoConfig;

/// Student photo storage.
///
/// Returned URLs are either `/uploads/<file>` (local) or an absolute
/// object-storage URL; callers must not assume one form.
#[async_trait]
pub trait PhotoStore: Send + Sync {
    /// Store the photo bytes under `file_name`, returning the public URL.
    async fn store_photo(&self, file_name: &str, bytes: Vec<u8>, content_type: &str) -> Result<String>;

    /// Remove a previously stored photo by its public URL.
    async fn delete_photo(&self, photo_url: &str) -> Result<()>;
}

/// Pick the storage variant once at startup: Supabase when configured,
/// local uploads directory otherwise.
pub fn photo_store_from_config(config: &PhotoConfig) -> Arc<dyn PhotoStore> {
    match (config.supabase_url.clone(), config.supabase_service_key.clone()) {
        (Some(base_url), Some(service_key)) => {
            info!("📸 Photo storage: Supabase bucket '{}'", config.supabase_bucket);
            Arc::new(SupabasePhotoStore::new(
                base_url,
                service_key,
                config.supabase_bucket.clone(),
            ))
        }
        _ => {
            info!(
                "📸 Photo storage not configured, uploads will use local directory '{}'",
                config.uploads_dir
            );
            Arc::new(LocalPhotoStore::new(PathBuf::from(&config.uploads_dir)))
        }
    }
}

/// Local filesystem storage under an uploads directory, served as
/// `/uploads/<file>` by the static file route.
pub struct LocalPhotoStore {
    uploads_dir: PathBuf,
}

impl LocalPhotoStore {
    pub fn new(uploads_dir: PathBuf) -> Self {
        Self { uploads_dir }
    }
}

#[async_trait]
impl PhotoStore for LocalPhotoStore {
    async fn store_photo(&self, file_name: &str, bytes: Vec<u8>, _content_type: &str) -> Result<String> {
        tokio::fs::create_dir_all(&self.uploads_dir)
            .await
            .with_context(|| format!("Failed to create uploads dir {:?}", self.uploads_dir))?;

        let path = self.uploads_dir.join(file_name);
        tokio::fs::write(&path, &bytes)
            .await
            .with_context(|| format!("Failed to write photo {:?}", path))?;

        Ok(format!("/uploads/{file_name}"))
    }

    async fn delete_photo(&self, photo_url: &str) -> Result<()> {
        let file_name = photo_url
            .strip_prefix("/uploads/")
            .ok_or_else(|| anyhow!("Not a local photo URL: {photo_url}"))?;

        match tokio::fs::remove_file(self.uploads_dir.join(file_name)).await {
            Ok(()) => Ok(()),
            // Already gone is fine
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

/// Supabase Storage over its REST API.
pub struct SupabasePhotoStore {
    http: reqwest::Client,
    base_url: String,
    service_key: String,
    bucket: String,
}

impl SupabasePhotoStore {
    pub fn new(base_url: String, service_key: String, bucket: String) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            service_key,
            bucket,
        }
    }

    fn public_url(&self, object_path: &str) -> String {
        format!(
            "{}/storage/v1/object/public/{}/{}",
            self.base_url, self.bucket, object_path
        )
    }

    fn object_path_from_url<'a>(&self, photo_url: &'a str) -> Result<&'a str> {
        let marker = format!("/storage/v1/object/public/{}/", self.bucket);
        photo_url
            .split_once(marker.as_str())
            .map(|(_, path)| path)
            .ok_or_else(|| anyhow!("Could not parse photo URL: {photo_url}"))
    }
}

#[async_trait]
impl PhotoStore for SupabasePhotoStore {
    async fn store_photo(&self, file_name: &str, bytes: Vec<u8>, content_type: &str) -> Result<String> {
        let object_path = format!("students/{file_name}");
        let url = format!(
            "{}/storage/v1/object/{}/{}",
            self.base_url, self.bucket, object_path
        );

        let response = self
            .http
            .post(&url)
            .bearer_auth(&self.service_key)
            .header(reqwest::header::CONTENT_TYPE, content_type)
            .header("x-upsert", "true")
            .body(bytes)
            .send()
            .await
            .context("Photo upload request failed")?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(anyhow!("Photo upload rejected ({status}): {body}"));
        }

        Ok(self.public_url(&object_path))
    }

    async fn delete_photo(&self, photo_url: &str) -> Result<()> {
        let object_path = self.object_path_from_url(photo_url)?;
        let url = format!(
            "{}/storage/v1/object/{}/{}",
            self.base_url, self.bucket, object_path
        );

        let response = self
            .http
            .delete(&url)
            .bearer_auth(&self.service_key)
            .send()
            .await
            .context("Photo delete request failed")?;

        if !response.status().is_success() {
            return Err(anyhow!("Photo delete rejected ({})", response.status()));
        }

        Ok(())
    }
}
