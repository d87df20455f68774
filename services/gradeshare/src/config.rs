use anyhow::{bail, Context, Result};
use grades::Semester;

pub const DEV_APP_URL: &str = "http://localhost:5000";
const DEV_SECRET: &str = "gradeshare-dev-secret";

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AppMode {
    Dev,
    Test,
    Prod,
}

impl AppMode {
    fn parse(s: &str) -> Result<Self> {
        match s.trim().to_ascii_uppercase().as_str() {
            "DEV" => Ok(Self::Dev),
            "TEST" => Ok(Self::Test),
            "PROD" => Ok(Self::Prod),
            other => bail!("APP_MODE must be DEV, TEST or PROD, got {other:?}"),
        }
    }

    /// Whether diagnostic routes (`/db`, `/add-auth`) are served.
    pub fn allows_test_routes(&self) -> bool {
        !matches!(self, Self::Prod)
    }
}

#[derive(Clone, Debug)]
pub struct AppConfig {
    pub mode: AppMode,
    pub app_url: Option<String>,
    pub database_url: Option<String>,
    pub secret: String,

    pub semester: Semester,
    pub ttl_secs: u64,
    pub bind_addr: String,
}

impl AppConfig {
    /// Cookies carry `Secure` when the public URL is served over https.
    pub fn secure_cookies(&self) -> bool {
        self.app_url.as_deref().is_some_and(|url| url.starts_with("https://"))
    }

    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(get: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mode = match get("APP_MODE") {
            Some(v) => AppMode::parse(&v)?,
            None => AppMode::Dev,
        };

        let app_url = if mode == AppMode::Dev {
            Some(DEV_APP_URL.to_string())
        } else {
            get("APP_URL")
        };

        let database_url = get("DATABASE_URL").filter(|v| !v.trim().is_empty());

        let secret = match (get("APP_SECRET"), mode) {
            (Some(s), _) if !s.is_empty() => s,
            (_, AppMode::Prod) => bail!("Missing required env var: APP_SECRET"),
            _ => DEV_SECRET.to_string(),
        };

        let semester = get("CONFIG_SEMESTER")
            .unwrap_or_else(|| "111-2".to_string())
            .parse::<Semester>()
            .context("CONFIG_SEMESTER")?;

        let ttl_secs = match get("CONFIG_TTL") {
            Some(v) => v.trim().parse().with_context(|| format!("CONFIG_TTL must be an integer, got {v:?}"))?,
            None => 1800,
        };

        let port: u16 = match get("PORT_DEV") {
            Some(v) => v.trim().parse().with_context(|| format!("PORT_DEV must be a port number, got {v:?}"))?,
            None => 4000,
        };
        let bind_addr = format!("0.0.0.0:{port}");

        if let Some(url) = &database_url {
            if !url.starts_with("postgres://") && !url.starts_with("postgresql://") {
                bail!("DATABASE_URL must start with postgres:// or postgresql://");
            }
        }

        Ok(Self {
            mode,
            app_url,
            database_url,
            secret,
            semester,
            ttl_secs,
            bind_addr,
        })
    }
}
