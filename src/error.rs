use std::fmt;

use crate::source::{Loc, SourceSet};

/// Everything that can abort a conversion. All errors are fatal within a
/// single file: there is no partial output and no local recovery. The core
/// returns the error; the host catches and formats.
#[derive(Debug, Clone)]
pub enum Error {
    /// The external parser rejected the source; the first diagnostic is
    /// reported verbatim.
    Parse { message: String, loc: Loc },

    /// The converter met an AST shape it cannot lower, or a handler
    /// invariant failed.
    Unsupported { message: String, loc: Option<Loc> },

    /// A construct the lint collaborator should have rewritten reached the
    /// converter (operator method definition, `eval`, ...).
    Semantic { message: String, loc: Option<Loc> },

    /// A backtick string was encountered without a host `binding`.
    Security { message: String, loc: Option<Loc> },

    /// Mutually exclusive or malformed options.
    Config { message: String },
}

impl Error {
    pub fn unsupported(message: impl Into<String>, loc: Option<Loc>) -> Self {
        Error::Unsupported {
            message: message.into(),
            loc,
        }
    }

    pub fn semantic(message: impl Into<String>, loc: Option<Loc>) -> Self {
        Error::Semantic {
            message: message.into(),
            loc,
        }
    }

    pub fn loc(&self) -> Option<Loc> {
        match self {
            Error::Parse { loc, .. } => Some(*loc),
            Error::Unsupported { loc, .. }
            | Error::Semantic { loc, .. }
            | Error::Security { loc, .. } => *loc,
            Error::Config { .. } => None,
        }
    }

    pub fn message(&self) -> &str {
        match self {
            Error::Parse { message, .. }
            | Error::Unsupported { message, .. }
            | Error::Semantic { message, .. }
            | Error::Security { message, .. }
            | Error::Config { message } => message,
        }
    }

    /// One-line user-visible form: `<msg> at <file>:<line>:<column>` when a
    /// full location is available.
    pub fn display_with_sources(&self, sources: &SourceSet) -> String {
        match self.loc() {
            Some(loc) if (loc.source.0 as usize) < sources.len() => {
                format!("{} at {}", self.message(), sources.describe(&loc))
            }
            Some(loc) => format!("{} at offset {}", self.message(), loc.span.start),
            None => self.message().to_string(),
        }
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.loc() {
            Some(loc) => write!(f, "{} at offset {}", self.message(), loc.span.start),
            None => f.write_str(self.message()),
        }
    }
}

impl std::error::Error for Error {}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::SourceId;

    #[test]
    fn display_with_sources_shows_file_line_column() {
        let mut sources = SourceSet::new();
        let id = sources.add("app.rb", "a = 1\nmethod_missing\n");
        let err = Error::semantic("method_missing requires a rewrite", Some(Loc::new(id, 6, 20)));
        assert_eq!(
            err.display_with_sources(&sources),
            "method_missing requires a rewrite at app.rb:2:1"
        );
    }

    #[test]
    fn display_without_location_is_bare_message() {
        let err = Error::Config {
            message: "or: nullish conflicts with eslevel 2015".to_string(),
        };
        assert_eq!(err.to_string(), "or: nullish conflicts with eslevel 2015");
    }

    #[test]
    fn display_falls_back_to_offset() {
        let err = Error::unsupported("no handler", Some(Loc::new(SourceId(7), 42, 43)));
        assert_eq!(err.to_string(), "no handler at offset 42");
    }
}
