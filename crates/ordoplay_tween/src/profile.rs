// SPDX-License-Identifier: MIT OR Apache-2.0
//! Animation profiles.
//!
//! A profile is a document of named transition and repeat options plus the
//! event loop settings to run them with. This module handles:
//! - Loading and saving profiles (RON, or JSON for `.json` files)
//! - Format version checks
//! - Lookup of named entries
//!
//! Callbacks are never part of a profile; attach them after lookup.

use crate::repeater::RepeatOptions;
use crate::scheduler::EventLoopConfig;
use crate::transition::TransitionOptions;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;

/// Current profile format version
pub const PROFILE_FORMAT_VERSION: u32 = 1;

/// Profile errors
#[derive(Debug, Error)]
pub enum ProfileError {
    /// Reading or writing the profile file failed
    #[error("Profile I/O failed: {0}")]
    Io(#[from] std::io::Error),
    /// The RON document is malformed
    #[error("Invalid RON profile: {0}")]
    Ron(#[from] ron::error::SpannedError),
    /// The profile could not be written as RON
    #[error("Failed to write RON profile: {0}")]
    RonSer(#[from] ron::Error),
    /// The JSON document is malformed, or could not be written
    #[error("Invalid JSON profile: {0}")]
    Json(#[from] serde_json::Error),
    /// The profile was written by a newer format
    #[error("Profile version {found} is newer than supported version {supported}")]
    UnsupportedVersion {
        /// Version found in the document
        found: u32,
        /// Newest version this build reads
        supported: u32,
    },
    /// No transition entry with this name
    #[error("Unknown transition entry: {0}")]
    UnknownTransition(String),
    /// No repeat entry with this name
    #[error("Unknown repeat entry: {0}")]
    UnknownRepeat(String),
    /// The file extension names no known format
    #[error("Unsupported profile extension: {0}")]
    UnsupportedExtension(String),
}

/// Result type for profile operations
pub type Result<T> = std::result::Result<T, ProfileError>;

/// On-disk format of a profile
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProfileFormat {
    /// Rusty Object Notation
    Ron,
    /// JSON
    Json,
}

impl ProfileFormat {
    /// Pick the format from a file extension; files without one are RON
    pub fn from_path(path: &Path) -> Result<Self> {
        match path.extension().and_then(|ext| ext.to_str()) {
            None => Ok(ProfileFormat::Ron),
            Some(ext) if ext.eq_ignore_ascii_case("ron") => Ok(ProfileFormat::Ron),
            Some(ext) if ext.eq_ignore_ascii_case("json") => Ok(ProfileFormat::Json),
            Some(ext) => Err(ProfileError::UnsupportedExtension(ext.to_string())),
        }
    }
}

/// Named animation settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnimationProfile {
    /// Format version
    pub version: u32,
    /// Event loop settings
    #[serde(default)]
    pub event_loop: EventLoopConfig,
    /// Transition options by name
    #[serde(default)]
    pub transitions: IndexMap<String, TransitionOptions>,
    /// Repeat options by name
    #[serde(default)]
    pub repeats: IndexMap<String, RepeatOptions>,
}

impl Default for AnimationProfile {
    fn default() -> Self {
        Self::new()
    }
}

impl AnimationProfile {
    /// Create an empty profile
    pub fn new() -> Self {
        Self {
            version: PROFILE_FORMAT_VERSION,
            event_loop: EventLoopConfig::default(),
            transitions: IndexMap::new(),
            repeats: IndexMap::new(),
        }
    }

    /// Add or replace a transition entry
    pub fn with_transition(mut self, name: impl Into<String>, options: TransitionOptions) -> Self {
        self.transitions.insert(name.into(), options);
        self
    }

    /// Add or replace a repeat entry
    pub fn with_repeat(mut self, name: impl Into<String>, options: RepeatOptions) -> Self {
        self.repeats.insert(name.into(), options);
        self
    }

    /// Load a profile, picking the format from the file extension
    pub fn load(path: &Path) -> Result<Self> {
        let format = ProfileFormat::from_path(path)?;
        let content = std::fs::read_to_string(path)?;
        let profile = match format {
            ProfileFormat::Ron => Self::from_ron_str(&content)?,
            ProfileFormat::Json => Self::from_json_str(&content)?,
        };

        tracing::debug!(
            path = %path.display(),
            transitions = profile.transitions.len(),
            repeats = profile.repeats.len(),
            "Loaded animation profile"
        );
        Ok(profile)
    }

    /// Save the profile, picking the format from the file extension
    pub fn save(&self, path: &Path) -> Result<()> {
        let content = match ProfileFormat::from_path(path)? {
            ProfileFormat::Ron => self.to_ron_string()?,
            ProfileFormat::Json => serde_json::to_string_pretty(self)?,
        };
        std::fs::write(path, content)?;

        tracing::debug!(path = %path.display(), "Saved animation profile");
        Ok(())
    }

    /// Parse a RON document
    pub fn from_ron_str(content: &str) -> Result<Self> {
        let profile: AnimationProfile = ron::from_str(content)?;
        profile.check_version()
    }

    /// Parse a JSON document
    pub fn from_json_str(content: &str) -> Result<Self> {
        let profile: AnimationProfile = serde_json::from_str(content)?;
        profile.check_version()
    }

    /// Serialize as pretty RON
    pub fn to_ron_string(&self) -> Result<String> {
        let config = ron::ser::PrettyConfig::default()
            .struct_names(false)
            .enumerate_arrays(false);
        Ok(ron::ser::to_string_pretty(self, config)?)
    }

    /// Options of the named transition entry
    pub fn transition(&self, name: &str) -> Result<TransitionOptions> {
        self.transitions
            .get(name)
            .cloned()
            .ok_or_else(|| ProfileError::UnknownTransition(name.to_string()))
    }

    /// Options of the named repeat entry
    pub fn repeat(&self, name: &str) -> Result<RepeatOptions> {
        self.repeats
            .get(name)
            .cloned()
            .ok_or_else(|| ProfileError::UnknownRepeat(name.to_string()))
    }

    fn check_version(self) -> Result<Self> {
        if self.version > PROFILE_FORMAT_VERSION {
            return Err(ProfileError::UnsupportedVersion {
                found: self.version,
                supported: PROFILE_FORMAT_VERSION,
            });
        }
        Ok(self)
    }
}
