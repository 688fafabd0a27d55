use std::collections::HashMap;
use std::env;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

use super::provider::{LlmError, LlmResult};

#[derive(Clone, PartialEq, Eq)]
pub struct AwsCredentials {
    pub access_key_id: String,
    pub secret_access_key: String,
    pub session_token: Option<String>,
}

impl fmt::Debug for AwsCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AwsCredentials")
            .field("access_key_id", &self.access_key_id)
            .field("secret_access_key", &"***")
            .field("session_token", &self.session_token.as_ref().map(|_| "***"))
            .finish()
    }
}

/// Where credentials come from. Resolution happens on every call so that a
/// missing profile is reported by the request that needed it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CredentialSource {
    profile: String,
    credentials_file: Option<PathBuf>,
    config_file: Option<PathBuf>,
}

impl CredentialSource {
    pub fn profile(profile: impl Into<String>) -> Self {
        Self {
            profile: profile.into(),
            credentials_file: None,
            config_file: None,
        }
    }

    pub fn with_credentials_file(mut self, path: PathBuf) -> Self {
        self.credentials_file = Some(path);
        self
    }

    pub fn with_config_file(mut self, path: PathBuf) -> Self {
        self.config_file = Some(path);
        self
    }

    pub fn profile_name(&self) -> &str {
        &self.profile
    }

    /// Looks the profile up in the shared credentials file, then in the
    /// shared config file, and falls back to the `AWS_*` environment variables.
    pub fn resolve(&self) -> LlmResult<AwsCredentials> {
        let credentials_path = self.credentials_path();
        if let Some(credentials) = credentials_path
            .as_ref()
            .and_then(|path| read_section(path, &self.profile))
        {
            return Ok(credentials);
        }

        // The config file names non-default profiles `[profile <name>]`.
        let config_path = self.config_path();
        let config_section = if self.profile == "default" {
            self.profile.clone()
        } else {
            format!("profile {}", self.profile)
        };
        if let Some(credentials) = config_path
            .as_ref()
            .and_then(|path| read_section(path, &config_section))
        {
            return Ok(credentials);
        }

        if let Some(credentials) = env_credentials() {
            return Ok(credentials);
        }

        let describe = |path: Option<PathBuf>, fallback: &str| {
            path.map_or_else(|| fallback.to_string(), |p| p.display().to_string())
        };
        Err(LlmError::MissingCredentials(format!(
            "profile '{}' not found in {} or {} and AWS_ACCESS_KEY_ID is not set",
            self.profile,
            describe(credentials_path, "~/.aws/credentials"),
            describe(config_path, "~/.aws/config"),
        )))
    }

    fn credentials_path(&self) -> Option<PathBuf> {
        shared_file_path(
            self.credentials_file.as_ref(),
            "AWS_SHARED_CREDENTIALS_FILE",
            "credentials",
        )
    }

    fn config_path(&self) -> Option<PathBuf> {
        shared_file_path(self.config_file.as_ref(), "AWS_CONFIG_FILE", "config")
    }
}

fn shared_file_path(explicit: Option<&PathBuf>, env_key: &str, name: &str) -> Option<PathBuf> {
    if let Some(path) = explicit {
        return Some(path.clone());
    }
    if let Some(path) = env_non_empty(env_key) {
        return Some(PathBuf::from(path));
    }
    dirs::home_dir().map(|home| home.join(".aws").join(name))
}

fn read_section(path: &Path, section: &str) -> Option<AwsCredentials> {
    let text = fs::read_to_string(path).ok()?;
    section_credentials(&text, section)
}

fn section_credentials(text: &str, section: &str) -> Option<AwsCredentials> {
    let mut sections = parse_ini_sections(text);
    let mut section = sections.remove(section)?;

    let access_key_id = section.remove("aws_access_key_id")?;
    let secret_access_key = section.remove("aws_secret_access_key")?;
    Some(AwsCredentials {
        access_key_id,
        secret_access_key,
        session_token: section.remove("aws_session_token"),
    })
}

fn env_credentials() -> Option<AwsCredentials> {
    Some(AwsCredentials {
        access_key_id: env_non_empty("AWS_ACCESS_KEY_ID")?,
        secret_access_key: env_non_empty("AWS_SECRET_ACCESS_KEY")?,
        session_token: env_non_empty("AWS_SESSION_TOKEN"),
    })
}

fn parse_ini_sections(text: &str) -> HashMap<String, HashMap<String, String>> {
    let mut sections: HashMap<String, HashMap<String, String>> = HashMap::new();
    let mut current: Option<String> = None;

    for line in text.lines() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') || line.starts_with(';') {
            continue;
        }

        if let Some(name) = line.strip_prefix('[').and_then(|rest| rest.strip_suffix(']')) {
            let name = name.split_whitespace().collect::<Vec<_>>().join(" ");
            sections.entry(name.clone()).or_default();
            current = Some(name);
            continue;
        }

        let (Some(section), Some((key, value))) = (&current, line.split_once('=')) else {
            continue;
        };
        let value = value.trim();
        if value.is_empty() {
            continue;
        }
        sections
            .entry(section.clone())
            .or_default()
            .insert(key.trim().to_ascii_lowercase(), value.to_string());
    }

    sections
}

fn env_non_empty(key: &str) -> Option<String> {
    env::var(key).ok().and_then(|value| {
        let trimmed = value.trim();
        if trimmed.is_empty() {
            None
        } else {
            Some(trimmed.to_string())
        }
    })
}
