use std::collections::HashMap;

use crate::ast::{Kind, Node, NodeId};
use crate::source::{Loc, SourceSet};

/// A located source comment, text kept verbatim (`# ...` or `=begin ... =end`).
#[derive(Debug, Clone)]
pub struct Comment {
    pub text: String,
    pub loc: Loc,
}

impl Comment {
    pub fn is_block(&self) -> bool {
        self.text.starts_with("=begin")
    }
}

/// Comment ownership for one compilation run.
///
/// Produced once by the walker's associator, rebuilt by the pipeline after
/// the filter stack runs (filters create and drop nodes), consumed by the
/// converter. `raw` always holds every comment in source order.
#[derive(Debug, Default)]
pub struct Comments {
    attached: HashMap<NodeId, Vec<Comment>>,
    trailing: HashMap<NodeId, Comment>,
    pub orphans: Vec<Comment>,
    pub raw: Vec<Comment>,
}

impl Comments {
    /// Walker post-pass: attach each comment to the first located node that
    /// starts at or after the comment's end. Unattachable comments become
    /// orphans. `begin` groupings are skipped so comments attach to real
    /// statements.
    pub fn associate<'a>(root: &'a Node<'a>, comments: Vec<Comment>) -> Comments {
        let mut nodes = Vec::new();
        collect(root, 0, &mut nodes);
        nodes.sort_by_key(|entry| (entry.start, entry.depth));

        let mut out = Comments {
            raw: comments.clone(),
            ..Comments::default()
        };

        for comment in comments {
            let target = nodes
                .iter()
                .find(|entry| entry.start >= comment.loc.span.end);
            match target {
                Some(entry) => out
                    .attached
                    .entry(entry.node.id())
                    .or_default()
                    .push(comment),
                None => out.orphans.push(comment),
            }
        }
        out
    }

    /// Pipeline step after the filter stack: node identities may be gone, so
    /// rebuild the map from spans. A comment first looks for a *trailing*
    /// home (a node ending on the same line, at or before the comment, the
    /// rightmost such node wins), then for an *attached* home (first node
    /// starting after it), else becomes an orphan. `raw` is preserved.
    pub fn reassociate<'a>(&mut self, root: &'a Node<'a>, sources: &SourceSet) {
        let mut nodes = Vec::new();
        collect(root, 0, &mut nodes);
        nodes.sort_by_key(|entry| (entry.start, entry.depth));

        self.attached.clear();
        self.trailing.clear();
        self.orphans.clear();

        for comment in self.raw.clone() {
            let line = sources
                .get(comment.loc.source)
                .line_for_position(comment.loc.span.start);

            let mut trail: Option<&Entry> = None;
            for entry in &nodes {
                if entry.node.loc.map(|l| l.source) != Some(comment.loc.source) {
                    continue;
                }
                if entry.end <= comment.loc.span.start
                    && sources.get(comment.loc.source).line_for_position(entry.end.saturating_sub(1))
                        == line
                {
                    match trail {
                        Some(prev) if prev.end >= entry.end => {}
                        _ => trail = Some(entry),
                    }
                }
            }
            if let Some(entry) = trail {
                self.trailing.insert(entry.node.id(), comment);
                continue;
            }

            match nodes
                .iter()
                .find(|entry| entry.start >= comment.loc.span.end)
            {
                Some(entry) => self
                    .attached
                    .entry(entry.node.id())
                    .or_default()
                    .push(comment),
                None => self.orphans.push(comment),
            }
        }
    }

    /// Removes and returns the comments owned by a node; the converter calls
    /// this when it enters the node in statement state so each comment is
    /// emitted exactly once.
    pub fn take(&mut self, id: NodeId) -> Vec<Comment> {
        self.attached.remove(&id).unwrap_or_default()
    }

    pub fn take_trailing(&mut self, id: NodeId) -> Option<Comment> {
        self.trailing.remove(&id)
    }

    pub fn attached_count(&self) -> usize {
        self.attached.values().map(Vec::len).sum()
    }
}

struct Entry<'a> {
    start: usize,
    end: usize,
    depth: usize,
    node: &'a Node<'a>,
}

fn collect<'a>(node: &'a Node<'a>, depth: usize, out: &mut Vec<Entry<'a>>) {
    if node.kind != Kind::Begin {
        if let Some(loc) = node.loc {
            out.push(Entry {
                start: loc.span.start,
                end: loc.span.end,
                depth,
                node,
            });
        }
    }
    for child in node.child_nodes() {
        collect(child, depth + 1, out);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::arena::Arena;
    use crate::ast::{s_loc, Value};
    use crate::source::{SourceId, SourceSet};

    fn loc(start: usize, end: usize) -> Loc {
        Loc::new(SourceId(0), start, end)
    }

    fn comment(text: &str, start: usize) -> Comment {
        Comment {
            text: text.to_string(),
            loc: loc(start, start + text.len()),
        }
    }

    #[test]
    fn comment_attaches_to_following_node() {
        let arena = Arena::new();
        // "# hi\nx = 1"
        let asgn = s_loc(
            &arena,
            Kind::Lvasgn,
            &[Value::Str("x"), Value::Int(1)],
            Some(loc(5, 10)),
        );
        let mut comments = Comments::associate(asgn, vec![comment("# hi", 0)]);
        assert_eq!(comments.take(asgn.id()).len(), 1);
        assert!(comments.orphans.is_empty());
    }

    #[test]
    fn comment_after_everything_is_orphaned() {
        let arena = Arena::new();
        let asgn = s_loc(
            &arena,
            Kind::Lvasgn,
            &[Value::Str("x"), Value::Int(1)],
            Some(loc(0, 5)),
        );
        let comments = Comments::associate(asgn, vec![comment("# tail", 6)]);
        assert_eq!(comments.orphans.len(), 1);
        assert_eq!(comments.raw.len(), 1);
    }

    #[test]
    fn reassociate_finds_trailing_comment_on_same_line() {
        let arena = Arena::new();
        let mut sources = SourceSet::new();
        sources.add("t.rb", "x = 1 # trailing\ny = 2\n");
        let x = s_loc(
            &arena,
            Kind::Lvasgn,
            &[Value::Str("x"), Value::Int(1)],
            Some(loc(0, 5)),
        );
        let y = s_loc(
            &arena,
            Kind::Lvasgn,
            &[Value::Str("y"), Value::Int(2)],
            Some(loc(17, 22)),
        );
        let root = s_loc(
            &arena,
            Kind::Begin,
            &[Value::Node(x), Value::Node(y)],
            Some(loc(0, 22)),
        );

        let mut comments = Comments::associate(root, vec![comment("# trailing", 6)]);
        comments.reassociate(root, &sources);
        assert!(comments.take_trailing(x.id()).is_some());
        assert_eq!(comments.attached_count(), 0);
    }

    #[test]
    fn reassociate_never_loses_comments() {
        let arena = Arena::new();
        let mut sources = SourceSet::new();
        sources.add("t.rb", "# a\nx = 1\n# z\n");
        let x = s_loc(
            &arena,
            Kind::Lvasgn,
            &[Value::Str("x"), Value::Int(1)],
            Some(loc(4, 9)),
        );
        let mut comments =
            Comments::associate(x, vec![comment("# a", 0), comment("# z", 10)]);
        comments.reassociate(x, &sources);
        let total = comments.attached_count()
            + comments.trailing.len()
            + comments.orphans.len();
        assert_eq!(total, comments.raw.len());
    }

    #[test]
    fn take_consumes_the_entry() {
        let arena = Arena::new();
        let n = s_loc(&arena, Kind::Nil, &[], Some(loc(5, 8)));
        let comments = &mut Comments::associate(n, vec![comment("# x", 0)]);
        assert_eq!(comments.take(n.id()).len(), 1);
        assert!(comments.take(n.id()).is_empty());
    }
}
