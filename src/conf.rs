//! Code for supporting the load configuration file.

use std::path::Path;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use strum::EnumString;

use crate::err::LoadError;

/// How the canonical allele symbol is computed from an input record.
#[derive(
    Serialize, Deserialize, PartialEq, Eq, Clone, Copy, Debug, Default, EnumString, strum::Display,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum SymbolStyle {
    /// The input carries the full allele symbol, e.g. `Pax6<em1(IMPC)J>`.
    #[default]
    Full,
    /// The input carries the superscript only, e.g. `em1(IMPC)J`; the symbol
    /// is `<marker symbol><<superscript>>`.
    Superscript,
}

impl SymbolStyle {
    /// Compute the canonical allele symbol.
    pub fn canonical_symbol(&self, marker_symbol: &str, symbol: &str) -> String {
        match self {
            SymbolStyle::Full => symbol.to_string(),
            SymbolStyle::Superscript => format!("{}<{}>", marker_symbol, symbol),
        }
    }
}

/// Top-level configuration.
#[derive(Serialize, Deserialize, PartialEq, Debug, Clone)]
pub struct Conf {
    /// Values common to all alleles created by the load.
    pub allele: AlleleConf,
    /// Configuration of the IMPC feed QC.
    pub impc: ImpcConf,
}

/// Values common to all alleles created by the load.
#[derive(Serialize, Deserialize, PartialEq, Debug, Clone)]
pub struct AlleleConf {
    /// Allele inheritance mode term.
    pub inheritance_mode: String,
    /// Allele transmission state term.
    pub transmission_state: String,
    /// Allele status term.
    pub allele_status: String,
    /// Allele collection term.
    pub allele_collection: String,
    /// Citation of the load, e.g. `J:265051`.
    pub j_number: String,
    /// Login of the user the records are created by.
    pub created_by: String,
    /// Molecular description; empty means that no molecular note is created.
    #[serde(default)]
    pub description: String,
}

/// Configuration of the IMPC feed QC.
#[derive(Serialize, Deserialize, PartialEq, Debug, Clone)]
pub struct ImpcConf {
    /// Host name reported in the QC report header.
    #[serde(default)]
    pub host: String,
    /// Expected IMPC allele (mutation) types.
    pub allele_types: Vec<String>,
    /// Expected IMPC allele subtypes.
    pub subtypes: Vec<String>,
    /// How to compute the canonical symbol.
    #[serde(default)]
    pub symbol_style: SymbolStyle,
    /// Translation of `type` or `type|subtype` to `MGI types[|MGI subtypes]`.
    pub type_translation: IndexMap<String, String>,
}

/// Result of translating an IMPC allele type/subtype to MGI terms.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Translation {
    /// MGI allele (mutation) types.
    pub allele_types: Vec<String>,
    /// MGI allele subtypes, may be empty.
    pub subtypes: Vec<String>,
}

impl Translation {
    /// Parse translation value of the form `T1;T2[|S1;S2]`.
    pub fn parse(value: &str) -> Self {
        let (types, subtypes) = value.split_once('|').unwrap_or((value, ""));
        let split = |s: &str| {
            s.split(';')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::to_string)
                .collect::<Vec<_>>()
        };
        Self {
            allele_types: split(types),
            subtypes: split(subtypes),
        }
    }
}

impl ImpcConf {
    /// Whether `allele_type` is an expected IMPC allele type.
    pub fn is_known_type(&self, allele_type: &str) -> bool {
        self.allele_types.contains(&allele_type.to_lowercase())
    }

    /// Whether `subtype` is an expected IMPC allele subtype.
    pub fn is_known_subtype(&self, subtype: &str) -> bool {
        self.subtypes.contains(&subtype.to_lowercase())
    }

    /// Build the key into the type translation table.
    pub fn translation_key(allele_type: &str, subtype: &str) -> String {
        if subtype.is_empty() {
            allele_type.to_lowercase()
        } else {
            format!("{}|{}", allele_type.to_lowercase(), subtype.to_lowercase())
        }
    }

    /// Translate the type translation key, if configured.
    pub fn translate(&self, key: &str) -> Option<Translation> {
        self.type_translation.get(key).map(|v| Translation::parse(v))
    }
}

impl Conf {
    /// Load configuration from the TOML file at `path`.
    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self, anyhow::Error> {
        let path = path.as_ref();
        let toml_str = std::fs::read_to_string(path)
            .map_err(|e| anyhow::anyhow!("could not read config {:?}: {}", path, e))?;
        Self::from_toml_str(&toml_str)
    }

    /// Parse and normalize configuration from TOML string.
    pub fn from_toml_str(toml_str: &str) -> Result<Self, anyhow::Error> {
        let conf: Conf = toml::from_str(toml_str)?;
        Ok(conf.normalized()?)
    }

    /// Lowercase the allow lists and translation keys and check the
    /// translation values.
    fn normalized(mut self) -> Result<Self, LoadError> {
        let lower = |v: &Vec<String>| -> Vec<String> {
            v.iter().map(|s| s.trim().to_lowercase()).collect()
        };
        self.impc.allele_types = lower(&self.impc.allele_types);
        self.impc.subtypes = lower(&self.impc.subtypes);

        let mut type_translation = IndexMap::new();
        for (key, value) in self.impc.type_translation.drain(..) {
            if Translation::parse(&value).allele_types.is_empty() {
                return Err(LoadError::InvalidConfig(format!(
                    "type translation for {:?} has no allele type",
                    key
                )));
            }
            type_translation.insert(key.trim().to_lowercase(), value.trim().to_string());
        }
        self.impc.type_translation = type_translation;

        if self.allele.created_by.is_empty() || self.allele.j_number.is_empty() {
            return Err(LoadError::InvalidConfig(String::from(
                "allele.created_by and allele.j_number must be set",
            )));
        }

        Ok(self)
    }
}
