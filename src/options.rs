use serde::Deserialize;

use crate::error::Error;
use crate::sourcemap::ErbContext;

/// `==` handling.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Comparison {
    /// Ruby `==` stays JS `==`.
    #[default]
    Equality,
    /// Ruby `==` becomes `===`, except against `nil` where loose equality
    /// catches both `null` and `undefined`.
    Identity,
}

/// `||` lowering policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrMode {
    /// `??` when neither side looks boolean and the left is not an `or`.
    #[default]
    Auto,
    Logical,
    Nullish,
}

/// Truthiness semantics of the emitted code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Truthy {
    /// JS semantics: `0` and `""` are falsy.
    #[default]
    Js,
    /// Ruby semantics via the `$T`/`$ror`/`$rand` helpers: only `nil` and
    /// `false` are falsy.
    Ruby,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ModuleKind {
    #[default]
    Esm,
    Cjs,
}

/// Host hook evaluating a backtick string; without one, backticks raise a
/// security error. The hook returns text spliced into the output verbatim.
pub type Binding = Box<dyn Fn(&str) -> String>;

/// Conversion options. Deserializable so a bundler host can hand them over
/// as JSON; the `binding` hook and the filter stack are code and arrive via
/// the API instead.
#[derive(Deserialize)]
#[serde(default)]
pub struct Options {
    /// Target ES version, 2015–2025. Gates optional chaining, nullish,
    /// private fields, numeric separators, exponent operator.
    pub eslevel: u16,
    /// Emit a `"use strict";` header.
    pub strict: bool,
    pub comparison: Comparison,
    pub or: OrMode,
    pub truthy: Truthy,
    /// Wrap interpolations as `${x ?? ""}`.
    pub nullish_to_s: bool,
    pub module: ModuleKind,
    /// Force `_name` private members; defaults to true below ES2022.
    pub underscored_private: Option<bool>,
    /// Soft output width.
    pub width: usize,
    /// Logical file name for diagnostics and the source map.
    pub file: String,
    /// Method allow-lists consulted by filters.
    pub include: Vec<String>,
    pub exclude: Vec<String>,
    pub include_all: bool,
    pub include_only: Option<Vec<String>>,
    /// Keep filter-discovered imports; disable to drop them.
    pub autoimports: bool,
    /// Static instance-variable values folded at compile time.
    pub ivars: serde_json::Map<String, serde_json::Value>,
    /// Template back-translation for preprocessed sources.
    pub erb: Option<ErbContext>,
    #[serde(skip)]
    pub binding: Option<Binding>,
}

impl Default for Options {
    fn default() -> Self {
        Options {
            eslevel: 2021,
            strict: false,
            comparison: Comparison::default(),
            or: OrMode::default(),
            truthy: Truthy::default(),
            nullish_to_s: false,
            module: ModuleKind::default(),
            underscored_private: None,
            width: 80,
            file: "(string)".to_string(),
            include: Vec::new(),
            exclude: Vec::new(),
            include_all: false,
            include_only: None,
            autoimports: true,
            ivars: serde_json::Map::new(),
            erb: None,
            binding: None,
        }
    }
}

impl Options {
    /// Rejects out-of-range and mutually exclusive settings before any work
    /// happens.
    pub fn validate(&self) -> Result<(), Error> {
        if !(2015..=2025).contains(&self.eslevel) {
            return Err(Error::Config {
                message: format!("eslevel {} out of range 2015..2025", self.eslevel),
            });
        }
        if self.or == OrMode::Nullish && self.eslevel < 2020 {
            return Err(Error::Config {
                message: "or: nullish requires eslevel 2020 or later".to_string(),
            });
        }
        if self.underscored_private == Some(false) && self.eslevel < 2022 {
            return Err(Error::Config {
                message: "private fields (#name) require eslevel 2022 or later".to_string(),
            });
        }
        if self.include_all && self.include_only.is_some() {
            return Err(Error::Config {
                message: "include_all and include_only are mutually exclusive".to_string(),
            });
        }
        Ok(())
    }

    /// `_name` versus `#name` private members.
    pub fn underscored_private(&self) -> bool {
        self.underscored_private.unwrap_or(self.eslevel < 2022)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_sane() {
        let options = Options::default();
        assert_eq!(options.eslevel, 2021);
        assert_eq!(options.width, 80);
        assert!(options.underscored_private());
        options.validate().unwrap();
    }

    #[test]
    fn private_fields_default_on_at_es2022() {
        let options = Options {
            eslevel: 2022,
            ..Options::default()
        };
        assert!(!options.underscored_private());
    }

    #[test]
    fn nullish_below_es2020_is_a_config_conflict() {
        let options = Options {
            eslevel: 2015,
            or: OrMode::Nullish,
            ..Options::default()
        };
        assert!(matches!(options.validate(), Err(Error::Config { .. })));
    }

    #[test]
    fn eslevel_range_is_enforced() {
        let options = Options {
            eslevel: 2014,
            ..Options::default()
        };
        assert!(options.validate().is_err());
    }

    #[test]
    fn options_deserialize_from_json() {
        let options: Options = serde_json::from_str(
            r#"{"eslevel": 2022, "truthy": "ruby", "or": "nullish", "module": "cjs"}"#,
        )
        .unwrap();
        assert_eq!(options.eslevel, 2022);
        assert_eq!(options.truthy, Truthy::Ruby);
        assert_eq!(options.or, OrMode::Nullish);
        assert_eq!(options.module, ModuleKind::Cjs);
    }
}
