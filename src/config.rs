use std::path::{Path, PathBuf};

use tracing::debug;

use crate::aws::OutputLocation;
use crate::transport::DEFAULT_PLUGIN;

const DEFAULT_OUTPUT_BUCKET: &str = "ssm-command-output";
const DEFAULT_OUTPUT_PREFIX: &str = "output";
const FALLBACK_SSH_USER: &str = "ec2-user";

/// Default settings location: ~/.assm/config.
pub fn default_path() -> Option<PathBuf> {
    dirs::home_dir().map(|h| h.join(".assm/config"))
}

/// Values from the settings file. Every field is optional on disk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    pub profile: Option<String>,
    pub region: Option<String>,
    pub plugin: String,
    pub ssh_user: Option<String>,
    pub output_bucket: String,
    pub output_prefix: String,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            profile: None,
            region: None,
            plugin: DEFAULT_PLUGIN.to_string(),
            ssh_user: None,
            output_bucket: DEFAULT_OUTPUT_BUCKET.to_string(),
            output_prefix: DEFAULT_OUTPUT_PREFIX.to_string(),
        }
    }
}

impl Settings {
    /// Load from `path`. Missing or unreadable files give the defaults.
    pub fn load(path: &Path) -> Self {
        match std::fs::read_to_string(path) {
            Ok(content) => Self::parse(&content),
            Err(e) => {
                debug!(path = %path.display(), "no settings loaded: {}", e);
                Self::default()
            }
        }
    }

    /// Parse `key = value` lines. `#` starts a comment line; unknown keys are skipped.
    pub fn parse(content: &str) -> Self {
        let mut settings = Self::default();
        for line in content.lines() {
            let line = line.trim();
            if line.starts_with('#') || line.is_empty() {
                continue;
            }
            let Some((key, value)) = line.split_once('=') else {
                debug!(line, "ignoring settings line without '='");
                continue;
            };
            let value = value.trim();
            if value.is_empty() {
                continue;
            }
            match key.trim() {
                "profile" => settings.profile = Some(value.to_string()),
                "region" => settings.region = Some(value.to_string()),
                "plugin" => settings.plugin = value.to_string(),
                "ssh_user" => settings.ssh_user = Some(value.to_string()),
                "output_bucket" => settings.output_bucket = value.to_string(),
                "output_prefix" => settings.output_prefix = value.to_string(),
                other => debug!(key = other, "ignoring unknown settings key"),
            }
        }
        settings
    }

    pub fn output_location(&self) -> OutputLocation {
        OutputLocation {
            bucket: self.output_bucket.clone(),
            key_prefix: self.output_prefix.clone(),
        }
    }

    /// Profile to load credentials from: flag, then `AWS_PROFILE`, then the file.
    ///
    /// `None` leaves the choice to the SDK's default chain.
    pub fn resolve_profile(&self, flag: Option<&str>, env: Option<&str>) -> Option<String> {
        flag.or(env)
            .filter(|p| !p.is_empty())
            .map(str::to_string)
            .or_else(|| self.profile.clone())
    }

    /// Region override: flag, then the file. `None` defers to the SDK chain.
    pub fn resolve_region(&self, flag: Option<&str>) -> Option<String> {
        flag.map(str::to_string).or_else(|| self.region.clone())
    }

    /// SSH login: flag, then the file, then the local user, then `ec2-user`.
    pub fn resolve_ssh_user(&self, flag: Option<&str>, local_user: Option<&str>) -> String {
        flag.map(str::to_string)
            .or_else(|| self.ssh_user.clone())
            .or_else(|| local_user.filter(|u| !u.is_empty()).map(str::to_string))
            .unwrap_or_else(|| FALLBACK_SSH_USER.to_string())
    }
}

/// The profile name handed to the transport helper.
pub fn profile_label(profile: Option<&str>) -> &str {
    profile.unwrap_or("default")
}
