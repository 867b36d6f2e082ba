//! Filter-stack orchestration.
//!
//! One pass: instantiate and order the filters, rewrite the AST, merge the
//! prepend lists (imports first, deduplicated), re-associate comments against
//! the rewritten tree, then hand everything to the converter.

use crate::arena::Arena;
use crate::ast::{s_loc, Kind, Node, Value};
use crate::comments::Comments;
use crate::converter::Converter;
use crate::error::Error;
use crate::filter::{reorder_filters, Filter, Processor};
use crate::options::Options;
use crate::source::SourceSet;
use crate::sourcemap;

/// Atomic result of a conversion: code and its Source Map v3 object.
#[derive(Debug)]
pub struct Conversion {
    pub code: String,
    pub sourcemap: serde_json::Value,
}

pub fn run<'a>(
    arena: &'a Arena,
    program: &'a Node<'a>,
    mut comments: Comments,
    filters: Vec<Box<dyn Filter>>,
    options: &Options,
    sources: &SourceSet,
    vertical: bool,
) -> Result<Conversion, Error> {
    options.validate()?;

    let filters = reorder_filters(filters);
    log::debug!("pipeline: {} filters", filters.len());

    let mut processor = Processor::new(arena, options, filters);
    let rewritten = processor.process(program)?;

    // Merge prepends: dedupe structurally, imports before everything else
    // (stable), imports dropped entirely when autoimports is off.
    let mut unique: Vec<&'a Node<'a>> = Vec::new();
    for candidate in processor.take_prepends() {
        if !unique.iter().any(|seen| *seen == candidate) {
            unique.push(candidate);
        }
    }
    let mut prepends: Vec<&'a Node<'a>> = Vec::new();
    for node in unique.iter().filter(|n| n.kind == Kind::Import) {
        if options.autoimports {
            prepends.push(node);
        }
    }
    for node in unique.iter().filter(|n| n.kind != Kind::Import) {
        prepends.push(node);
    }

    let program = if prepends.is_empty() {
        rewritten
    } else {
        let mut children: Vec<Value<'a>> =
            prepends.into_iter().map(Value::Node).collect();
        match rewritten.kind {
            Kind::Begin => children.extend(rewritten.children.iter().copied()),
            _ => children.push(Value::Node(rewritten)),
        }
        s_loc(arena, Kind::Begin, &children, rewritten.loc)
    };

    // Filters may have moved, cloned, or deleted nodes.
    comments.reassociate(program, sources);

    let mut converter = Converter::new(arena, sources, options, comments, vertical);
    converter.convert(program)?;

    let code = converter.ser.render();
    let map = sourcemap::build(&converter.ser, sources, &options.file, options.erb.as_ref());
    Ok(Conversion {
        code,
        sourcemap: map,
    })
}
