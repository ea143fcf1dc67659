//! Declarative configuration tree driving a sync run.
//!
//! The configuration file is a single nested JSON object keyed the way the
//! remote platform names things (camelCase). It is loaded once per run and
//! is immutable for the run's duration.

use serde::{Deserialize, Deserializer};
use std::collections::HashMap;
use std::path::{Path, PathBuf};

use crate::error::{SyncError, SyncResult};
use crate::value::FieldValue;

/// Default ownership tag prefix for mirror mode.
pub const DEFAULT_MIRROR_TAG: &str = "XMSYNC_";

/// Mirror mode: whether and how a run owns destination-side records it did
/// not just create.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MirrorMode {
    /// No ownership filtering; removal is driven purely by the
    /// `processInput`/`processDeleteValue` columns.
    #[default]
    Off,
    /// Only records carrying this configuration's ownership tag are touched.
    Strict,
    /// Strict, plus one-time adoption of untagged records matching by
    /// natural key.
    Greedy,
}

impl MirrorMode {
    /// Check if any mirror filtering applies.
    #[must_use]
    pub fn is_enabled(&self) -> bool {
        !matches!(self, MirrorMode::Off)
    }

    /// Convert to string representation.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            MirrorMode::Off => "off",
            MirrorMode::Strict => "strict",
            MirrorMode::Greedy => "greedy",
        }
    }
}

impl std::fmt::Display for MirrorMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// The configuration file writes mirror mode as `false`, `true`, or "greedy".
impl<'de> Deserialize<'de> for MirrorMode {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Raw {
            Flag(bool),
            Name(String),
        }

        match Raw::deserialize(deserializer)? {
            Raw::Flag(false) => Ok(MirrorMode::Off),
            Raw::Flag(true) => Ok(MirrorMode::Strict),
            Raw::Name(s) => match s.as_str() {
                "greedy" => Ok(MirrorMode::Greedy),
                "strict" => Ok(MirrorMode::Strict),
                "off" => Ok(MirrorMode::Off),
                other => Err(serde::de::Error::custom(format!(
                    "Unknown mirror mode: {other}"
                ))),
            },
        }
    }
}

impl serde::Serialize for MirrorMode {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(self.as_str())
    }
}

/// Supported CSV field delimiters for input files.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CsvDelimiter {
    /// Comma (,) - default delimiter
    #[default]
    Comma,
    /// Semicolon (;)
    Semicolon,
    /// Tab character (\t)
    Tab,
    /// Pipe character (|)
    Pipe,
}

impl CsvDelimiter {
    /// Convert delimiter to byte for the csv crate.
    #[must_use]
    pub fn as_byte(&self) -> u8 {
        match self {
            CsvDelimiter::Comma => b',',
            CsvDelimiter::Semicolon => b';',
            CsvDelimiter::Tab => b'\t',
            CsvDelimiter::Pipe => b'|',
        }
    }

    /// Parse delimiter from configuration input.
    pub fn parse(s: &str) -> SyncResult<Self> {
        match s {
            "," | "comma" => Ok(CsvDelimiter::Comma),
            ";" | "semicolon" => Ok(CsvDelimiter::Semicolon),
            "\t" | "tab" | "\\t" => Ok(CsvDelimiter::Tab),
            "|" | "pipe" => Ok(CsvDelimiter::Pipe),
            _ => Err(SyncError::configuration(format!(
                "Invalid file delimiter '{s}'. Valid values: ',', ';', '\\t', '|'"
            ))),
        }
    }
}

impl<'de> Deserialize<'de> for CsvDelimiter {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        CsvDelimiter::parse(&s).map_err(serde::de::Error::custom)
    }
}

/// How one target attribute is resolved from Input/Default/Initial sources.
///
/// A field is "configured" - and therefore present in the emitted record and
/// field list, even when its resolved value is empty - when it declares an
/// input column or a default (including a default of exactly `false`).
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct FieldSpec {
    /// Input column to read the value from.
    pub input: Option<String>,
    /// Fallback when the input column is absent or falsy.
    #[serde(rename = "default")]
    pub default_value: Option<FieldValue>,
    /// One-time creation-only value, written to the record's `initial`
    /// sub-map and never merged with the main value.
    pub initial: Option<FieldValue>,
    /// Delimiter for list-valued fields (default `|`).
    pub delimiter: Option<String>,
}

impl FieldSpec {
    /// Create a spec reading from an input column.
    #[must_use]
    pub fn from_input(column: impl Into<String>) -> Self {
        Self {
            input: Some(column.into()),
            ..Self::default()
        }
    }

    /// Create a spec with only a default value.
    #[must_use]
    pub fn from_default(value: impl Into<FieldValue>) -> Self {
        Self {
            default_value: Some(value.into()),
            ..Self::default()
        }
    }

    /// Set the default value.
    #[must_use]
    pub fn with_default(mut self, value: impl Into<FieldValue>) -> Self {
        self.default_value = Some(value.into());
        self
    }

    /// Set the one-time initial value.
    #[must_use]
    pub fn with_initial(mut self, value: impl Into<FieldValue>) -> Self {
        self.initial = Some(value.into());
        self
    }

    /// Set the list delimiter.
    #[must_use]
    pub fn with_delimiter(mut self, delimiter: impl Into<String>) -> Self {
        self.delimiter = Some(delimiter.into());
        self
    }

    /// Whether this spec populates the field at all.
    #[must_use]
    pub fn is_configured(&self) -> bool {
        self.input.is_some() || self.default_value.is_some()
    }
}

/// A custom person property: resolved independently of the fixed field set
/// into the record's `properties` sub-map.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PropertySpec {
    /// Input column holding the property value.
    pub input: String,
    /// Property name on the destination; defaults to the input column name.
    #[serde(default)]
    pub name: Option<String>,
    /// Fallback when the input column is absent or falsy.
    #[serde(rename = "default", default)]
    pub default_value: Option<FieldValue>,
    /// Delimiter for multi-valued properties.
    #[serde(default)]
    pub delimiter: Option<String>,
}

impl PropertySpec {
    /// The destination-side property name.
    #[must_use]
    pub fn target_name(&self) -> &str {
        self.name.as_deref().unwrap_or(&self.input)
    }
}

/// One device to fan out per input record.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct DeviceSpec {
    /// Input column holding the device value (email address or phone
    /// number). The fan-out only produces a device when this column is
    /// non-empty for the record.
    pub input: String,
    /// Explicit device name; defaults to the input column name.
    pub name: Option<String>,
    /// Device type; defaults to `EMAIL`.
    pub device_type: Option<String>,
    /// Per-device delay resolution.
    pub delay: Option<FieldSpec>,
    /// Per-device sequence resolution.
    pub sequence: Option<FieldSpec>,
    /// Per-device priority threshold resolution.
    pub priority_threshold: Option<FieldSpec>,
    /// Per-device external ownership resolution.
    pub externally_owned: Option<FieldSpec>,
}

impl DeviceSpec {
    /// The synthesized device name.
    #[must_use]
    pub fn device_name(&self) -> &str {
        self.name.as_deref().unwrap_or(&self.input)
    }

    /// The device type, defaulting to `EMAIL`.
    #[must_use]
    pub fn kind(&self) -> &str {
        self.device_type.as_deref().unwrap_or("EMAIL")
    }
}

/// Configuration shared by every entity kind.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct EntityConfig {
    /// Enable switch; when falsy no data is read or validated for the kind.
    pub sync: bool,
    /// Path to the input file (`.json` or `.csv`).
    pub input_path: Option<PathBuf>,
    /// Column delimiter for `.csv` input.
    pub file_delimiter: Option<CsvDelimiter>,
    /// Mirror mode for this kind.
    pub mirror_mode: MirrorMode,
    /// Non-mirror deletion trigger column.
    pub process_input: Option<String>,
    /// Sentinel value routing a record to removal.
    pub process_delete_value: Option<String>,
    /// Per-field resolution specs, keyed by target field name.
    pub fields: HashMap<String, FieldSpec>,
    /// Raw columns passed through verbatim.
    #[serde(deserialize_with = "string_or_seq")]
    pub include: Vec<String>,
    /// Guard rail: minimum sync count under mirror mode.
    pub minimum: Option<usize>,
    /// Guard rail: maximum sync count under mirror mode.
    pub maximum: Option<usize>,
    /// Guard rail: maximum removal count outside mirror mode.
    pub max_delete: Option<usize>,
}

impl EntityConfig {
    /// Look up a field spec, treating unconfigured fields as an empty spec.
    #[must_use]
    pub fn field(&self, name: &str) -> Option<&FieldSpec> {
        self.fields.get(name)
    }

    /// Whether a field is configured to be populated.
    #[must_use]
    pub fn is_field_configured(&self, name: &str) -> bool {
        self.fields.get(name).is_some_and(FieldSpec::is_configured)
    }

    /// Whether the deletion trigger pair is configured.
    #[must_use]
    pub fn has_delete_trigger(&self) -> bool {
        self.process_input.is_some() && self.process_delete_value.is_some()
    }
}

/// Person configuration: the shared surface plus custom properties and
/// automatic site creation.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PersonConfig {
    /// Shared entity configuration.
    #[serde(flatten)]
    pub base: EntityConfig,
    /// Custom property specs.
    pub properties: Vec<PropertySpec>,
    /// Create site records from distinct person site values. Conflicts with
    /// an enabled site sync.
    pub create_sites: bool,
}

/// Device configuration: the shared surface plus the fan-out sub-specs and
/// per-attribute enable flags.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct DevicesConfig {
    /// Shared entity configuration.
    #[serde(flatten)]
    pub base: EntityConfig,
    /// Resolution for the owning person's target name.
    pub owner: Option<FieldSpec>,
    /// One entry per device to fan out per input record.
    pub devices: Vec<DeviceSpec>,
    /// Enable per-owner dense re-sequencing.
    pub sequence_sync: bool,
    /// Enable delay resolution.
    pub delay_sync: bool,
    /// Enable priority threshold resolution.
    pub priority_threshold_sync: bool,
    /// Enable external ownership resolution.
    pub externally_owned_sync: bool,
    /// Enable advisory phone/email format validation.
    pub validate: bool,
}

/// The complete configuration for a run.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SyncConfig {
    /// Ownership tag prefix for mirror mode.
    pub mirror_tag: String,
    /// Where to write the validation report when any device fails format
    /// validation.
    pub report_path: Option<PathBuf>,
    /// Person sync configuration.
    pub users: PersonConfig,
    /// Device sync configuration.
    pub devices: DevicesConfig,
    /// Group sync configuration.
    pub groups: EntityConfig,
    /// Group membership sync configuration.
    pub group_members: EntityConfig,
    /// Site sync configuration.
    pub sites: EntityConfig,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            mirror_tag: DEFAULT_MIRROR_TAG.to_string(),
            report_path: None,
            users: PersonConfig::default(),
            devices: DevicesConfig::default(),
            groups: EntityConfig::default(),
            group_members: EntityConfig::default(),
            sites: EntityConfig::default(),
        }
    }
}

impl SyncConfig {
    /// Parse a configuration from JSON text.
    pub fn from_json(json: &str) -> SyncResult<Self> {
        let config: Self = serde_json::from_str(json)?;
        Ok(config)
    }

    /// Load a configuration file.
    pub fn from_path(path: impl AsRef<Path>) -> SyncResult<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_json(&text)
    }

    /// Check the configuration before any record is read.
    ///
    /// Conflicting site-creation settings and enabled kinds without an input
    /// path fail here, so a malformed configuration never touches data.
    pub fn validate(&self) -> SyncResult<()> {
        if self.users.create_sites && self.sites.sync {
            return Err(SyncError::conflict(
                "site creation from person records and a separate site sync \
                 cannot both be enabled",
            ));
        }

        let enabled: [(&str, &EntityConfig); 5] = [
            ("users", &self.users.base),
            ("devices", &self.devices.base),
            ("groups", &self.groups),
            ("groupMembers", &self.group_members),
            ("sites", &self.sites),
        ];
        for (name, entity) in enabled {
            if entity.sync && entity.input_path.is_none() {
                return Err(SyncError::configuration(format!(
                    "{name}.sync is enabled but {name}.inputPath is not set"
                )));
            }
        }

        if self.devices.base.sync {
            if self.devices.owner.as_ref().is_none_or(|o| !o.is_configured()) {
                return Err(SyncError::configuration(
                    "devices.sync is enabled but devices.owner is not configured",
                ));
            }
            if self.devices.devices.is_empty() {
                return Err(SyncError::configuration(
                    "devices.sync is enabled but devices.devices is empty",
                ));
            }
        }

        Ok(())
    }
}

// `include` accepts either a single column name or a list of them.
fn string_or_seq<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        One(String),
        Many(Vec<String>),
    }

    match Option::<Raw>::deserialize(deserializer)? {
        None => Ok(Vec::new()),
        Some(Raw::One(column)) => Ok(vec![column]),
        Some(Raw::Many(columns)) => Ok(columns),
    }
}
