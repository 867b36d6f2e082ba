//! Carmine compiles a Ruby-family surface syntax into idiomatic
//! ES2015–ES2025 JavaScript with Source Map v3 output.
//!
//! The pipeline has five cooperating stages:
//!
//! ```text
//! source ──► Walker ──► AST + comments ──► Pipeline ──► AST ──► Converter ──► code + map
//!              ▲                              │
//!              │                              ▼
//!         parser (external)           filter stack (protocol here,
//!                                     concrete filters external)
//! ```
//!
//! The walker consumes the external Ruby parser's concrete tree; filters
//! rewrite the uniform AST through the [`filter::Filter`] protocol; the
//! converter lowers the result to JavaScript text while attributing every
//! token to its source position.

pub mod arena;
pub mod ast;
pub mod comments;
pub mod converter;
pub mod error;
pub mod filter;
pub mod inflector;
pub mod namespace;
pub mod options;
pub mod pipeline;
pub mod serializer;
pub mod source;
pub mod sourcemap;
pub mod walker;

pub use arena::Arena;
pub use ast::{s, s_loc, Kind, Node, Value};
pub use comments::{Comment, Comments};
pub use error::Error;
pub use filter::{Filter, Processor, Rewrite};
pub use namespace::Namespace;
pub use options::{Comparison, ModuleKind, Options, OrMode, Truthy};
pub use pipeline::Conversion;
pub use source::{Loc, SourceBuffer, SourceId, SourceSet, Span};

use tree_sitter::Parser;

/// Compiles one source file. Deterministic for a given `(source, options)`
/// pair; on error nothing is emitted.
pub fn convert(source: &str, options: &Options) -> Result<Conversion, Error> {
    convert_with_filters(source, options, Vec::new())
}

/// Compiles with a filter stack. Filters run exactly once, outermost first;
/// their prepend lists land at the top of the program.
pub fn convert_with_filters(
    source: &str,
    options: &Options,
    filters: Vec<Box<dyn Filter>>,
) -> Result<Conversion, Error> {
    options.validate()?;

    let mut parser = Parser::new();
    parser
        .set_language(&tree_sitter_ruby::LANGUAGE.into())
        .map_err(|e| Error::Config {
            message: format!("parser initialisation failed: {}", e),
        })?;
    let tree = parser.parse(source, None).ok_or_else(|| Error::Parse {
        message: "parser returned no tree".to_string(),
        loc: Loc::new(SourceId(0), 0, 0),
    })?;

    let arena = Arena::new();
    let mut sources = SourceSet::new();
    let source_id = sources.add(&options.file, source);

    let (program, raw_comments) = walker::walk(&arena, &tree, source, source_id)?;
    let comments = Comments::associate(program, raw_comments);

    let vertical = source.contains('\n');
    pipeline::run(
        &arena, program, comments, filters, options, &sources, vertical,
    )
}
