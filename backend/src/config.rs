/// Server configuration, read once at startup from the environment.
#[derive(Clone, Debug)]
pub struct AppConfig {
    /// Port the HTTP server binds to
    pub port: u16,
    /// SQLite database URL
    pub database_url: String,
    /// Secret used to sign bearer tokens
    pub jwt_secret: String,
    /// Seed admin credentials, created on first start
    pub admin_email: String,
    pub admin_password: String,
    pub admin_name: String,
    pub sms: SmsConfig,
    pub photos: PhotoConfig,
}

/// Twilio credentials. Live dispatch requires all three; otherwise the
/// notifier runs in mock mode.
#[derive(Clone, Debug, Default)]
pub struct SmsConfig {
    pub account_sid: Option<String>,
    pub auth_token: Option<String>,
    pub from_number: Option<String>,
}

impl SmsConfig {
    pub fn is_configured(&self) -> bool {
        self.account_sid.is_some() && self.auth_token.is_some() && self.from_number.is_some()
    }
}

/// Photo storage selection: Supabase bucket when configured, local
/// uploads directory otherwise.
#[derive(Clone, Debug)]
pub struct PhotoConfig {
    pub supabase_url: Option<String>,
    pub supabase_service_key: Option<String>,
    pub supabase_bucket: String,
    pub uploads_dir: String,
}

impl PhotoConfig {
    pub fn is_remote(&self) -> bool {
        self.supabase_url.is_some() && self.supabase_service_key.is_some()
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            port: 3001,
            database_url: "sqlite:attendance.db".to_string(),
            jwt_secret: "dev-secret-change-me".to_string(),
            admin_email: "admin@school.com".to_string(),
            admin_password: "admin123".to_string(),
            admin_name: "School Admin".to_string(),
            sms: SmsConfig::default(),
            photos: PhotoConfig {
                supabase_url: None,
                supabase_service_key: None,
                supabase_bucket: "student-photos".to_string(),
                uploads_dir: "uploads".to_string(),
            },
        }
    }
}

impl AppConfig {
    pub fn from_env() -> Self {
        let default = Self::default();
        Self {
            port: std::env::var("PORT").ok().and_then(|v| v.parse().ok()).unwrap_or(default.port),
            database_url: std::env::var("DATABASE_URL").unwrap_or(default.database_url),
            jwt_secret: std::env::var("JWT_SECRET").unwrap_or(default.jwt_secret),
            admin_email: std::env::var("ADMIN_EMAIL").unwrap_or(default.admin_email),
            admin_password: std::env::var("ADMIN_PASSWORD").unwrap_or(default.admin_password),
            admin_name: std::env::var("ADMIN_NAME").unwrap_or(default.admin_name),
            sms: SmsConfig {
                account_sid: configured_var("TWILIO_ACCOUNT_SID"),
                auth_token: configured_var("TWILIO_AUTH_TOKEN"),
                from_number: configured_var("TWILIO_PHONE_NUMBER"),
            },
            photos: PhotoConfig {
                supabase_url: configured_var("SUPABASE_URL"),
                supabase_service_key: configured_var("SUPABASE_SERVICE_ROLE_KEY"),
                supabase_bucket: std::env::var("SUPABASE_BUCKET").unwrap_or(default.photos.supabase_bucket),
                uploads_dir: std::env::var("UPLOADS_DIR").unwrap_or(default.photos.uploads_dir),
            },
        }
    }
}

/// Reads an optional credential. Empty values and `your-...` template
/// placeholders left over from .env.example count as unset.
fn configured_var(key: &str) -> Option<String> {
    std::env::var(key)
        .ok()
        .filter(|v| !v.trim().is_empty() && !v.contains("your-"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sms_config_requires_all_credentials() {
        let mut sms = SmsConfig::default();
        assert!(!sms.is_configured());

        sms.account_sid = Some("AC123".to_string());
        sms.auth_token = Some("token".to_string());
        assert!(!sms.is_configured());

        sms.from_number = Some("+15550001111".to_string());
        assert!(sms.is_configured());
    }

    #[test]
    fn test_defaults() {
        let config = AppConfig::default();
        assert_eq!(config.port, 3001);
        assert_eq!(config.admin_email, "admin@school.com");
        assert!(!config.sms.is_configured());
        assert!(!config.photos.is_remote());
        assert_eq!(config.photos.supabase_bucket, "student-photos");
    }
}
