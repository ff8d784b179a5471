//! Language settings loaded from TOML.
//!
//! A default `language.toml` from the runtime directory is embedded in the
//! binary; hosts may load their own file with the same schema:
//!
//! ```toml
//! [language]
//! name = "Spark"
//! extension = ".spark"
//! contained = "csharp"
//!
//! [indent]
//! unit = "  "
//! size = 2
//!
//! [triggers]
//! chars = ["<", "@", "."]
//!
//! [[page-base-type]]
//! reference = "Spark.Web.Mvc"
//! base-type = "Spark.Web.Mvc.SparkView"
//! ```

use std::path::{Path, PathBuf};

use serde::Deserialize;
use thiserror::Error;

/// Embedded language.toml from the runtime directory.
const LANGUAGE_TOML: &str = include_str!("../../../runtime/language.toml");

/// Errors that can occur while loading settings.
#[derive(Debug, Error)]
pub enum SettingsError {
	#[error("failed to read {path}: {error}")]
	Io {
		path: PathBuf,
		error: std::io::Error,
	},
	#[error("failed to parse language settings: {0}")]
	Parse(#[from] toml::de::Error),
}

/// Complete settings for one template language.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct Settings {
	pub language: LanguageSection,
	#[serde(default)]
	pub indent: IndentPolicy,
	#[serde(default)]
	pub triggers: Triggers,
	/// Ordered reference-name to base-type rules.
	#[serde(default, rename = "page-base-type")]
	pub page_base_types: Vec<PageBaseType>,
}

impl Settings {
	/// Parses settings from a TOML string.
	pub fn parse(input: &str) -> Result<Self, SettingsError> {
		Ok(toml::from_str(input)?)
	}

	/// Loads settings from a file.
	pub fn load(path: impl AsRef<Path>) -> Result<Self, SettingsError> {
		let path = path.as_ref();
		let content = std::fs::read_to_string(path).map_err(|error| SettingsError::Io {
			path: path.to_path_buf(),
			error,
		})?;
		Self::parse(&content)
	}

	/// Parses the settings bundled with the crate.
	pub fn embedded() -> Result<Self, SettingsError> {
		Self::parse(LANGUAGE_TOML)
	}

	/// Resolves the default page base type from a project's references.
	///
	/// References are scanned in order; the first one whose name matches a
	/// rule (ASCII case-insensitively) decides the result.
	pub fn page_base_type_for<'a>(
		&'a self,
		references: impl IntoIterator<Item = impl AsRef<str>>,
	) -> Option<&'a str> {
		references.into_iter().find_map(|reference| {
			let reference = reference.as_ref();
			self.page_base_types
				.iter()
				.find(|rule| rule.reference.eq_ignore_ascii_case(reference))
				.map(|rule| rule.base_type.as_str())
		})
	}
}

/// Identity of the template language and of the language it embeds.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct LanguageSection {
	/// Display name shown by the host.
	pub name: String,
	/// File extension associated with the language, including the dot.
	pub extension: String,
	/// Name handed to the contained-language factory.
	#[serde(default = "default_contained")]
	pub contained: String,
}

fn default_contained() -> String {
	"csharp".to_string()
}

/// Static indentation policy reported for every line.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case", default)]
pub struct IndentPolicy {
	pub unit: String,
	pub parent_level: u32,
	pub size: u32,
	pub tabs: bool,
	pub tab_size: u32,
}

impl Default for IndentPolicy {
	fn default() -> Self {
		Self {
			unit: "  ".to_string(),
			parent_level: 0,
			size: 2,
			tabs: false,
			tab_size: 4,
		}
	}
}

/// Characters whose typing is forwarded to the generation service.
#[derive(Debug, Clone, PartialEq, Eq, Default, Deserialize)]
pub struct Triggers {
	#[serde(default)]
	pub chars: Vec<char>,
}

impl Triggers {
	pub fn contains(&self, ch: char) -> bool {
		self.chars.contains(&ch)
	}
}

/// Maps a project reference to the page base type it implies.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct PageBaseType {
	pub reference: String,
	pub base_type: String,
}
