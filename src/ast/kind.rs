/// AST tag vocabulary.
///
/// This enum is the stable interface between the walker, the filter stack,
/// and the converter; adding or removing a variant is a breaking change.
/// `as_str` yields the wire spelling used in diagnostics and by filters that
/// match on tag names.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Kind {
    // Literals
    Int,
    Float,
    Rational,
    Complex,
    Str,
    Dstr,
    Sym,
    Dsym,
    Regexp,
    Regopt,
    Xstr,
    Nil,
    True,
    False,
    Self_,

    // Variables
    Lvar,
    Ivar,
    Cvar,
    Gvar,
    NthRef,
    BackRef,
    Const,
    Cbase,

    // Assignment
    Lvasgn,
    Ivasgn,
    Cvasgn,
    Gvasgn,
    Casgn,
    Masgn,
    Mlhs,
    OpAsgn,
    OrAsgn,
    AndAsgn,
    MatchPattern,
    MatchPatternP,

    // Calls
    Send,
    Csend,
    Sendw,
    SendBang,
    Await,
    AwaitBang,
    AwaitAttr,
    Attr,
    Call,
    Block,
    Numblock,
    BlockPass,
    Super,
    Zsuper,
    Yield,

    // Argument lists
    Args,
    Arg,
    Optarg,
    Restarg,
    Kwarg,
    Kwoptarg,
    Kwrestarg,
    Blockarg,
    Shadowarg,

    // Operators and grouping
    And,
    Or,
    Not,
    Nullish,
    Defined,
    Typeof,
    Irange,
    Erange,
    Begin,
    Kwbegin,

    // Control flow
    If,
    Case,
    When,
    CaseMatch,
    InPattern,
    While,
    Until,
    WhilePost,
    UntilPost,
    For,
    Break,
    Next,
    Redo,
    Retry,
    Return,
    Rescue,
    Resbody,
    Ensure,

    // Collections
    Array,
    Hash,
    Pair,
    Splat,
    Kwsplat,

    // Definitions
    Class,
    Module,
    Sclass,
    Def,
    Defs,
    Alias,
    Undef,

    // Pattern matching
    HashPattern,
    ArrayPattern,
    FindPattern,
    MatchVar,
    MatchAlt,
    MatchAs,
    MatchRest,
    MatchNil,
    Pin,
    IfGuard,
    UnlessGuard,

    // Module system (synthesised by filters)
    Import,
    Export,
    ExportDefault,

    // JSX / HTML builders (synthesised by filters)
    Xnode,
    Pnode,
    Prop,

    // Synthetic wrappers and namespace descriptors
    Autoreturn,
    Autobind,
    PrivateMethod,
    Setter,

    // Comment-only statement synthesised by the pipeline
    NoOp,
}

impl Kind {
    pub fn as_str(self) -> &'static str {
        match self {
            Kind::Int => "int",
            Kind::Float => "float",
            Kind::Rational => "rational",
            Kind::Complex => "complex",
            Kind::Str => "str",
            Kind::Dstr => "dstr",
            Kind::Sym => "sym",
            Kind::Dsym => "dsym",
            Kind::Regexp => "regexp",
            Kind::Regopt => "regopt",
            Kind::Xstr => "xstr",
            Kind::Nil => "nil",
            Kind::True => "true",
            Kind::False => "false",
            Kind::Self_ => "self",
            Kind::Lvar => "lvar",
            Kind::Ivar => "ivar",
            Kind::Cvar => "cvar",
            Kind::Gvar => "gvar",
            Kind::NthRef => "nth_ref",
            Kind::BackRef => "back_ref",
            Kind::Const => "const",
            Kind::Cbase => "cbase",
            Kind::Lvasgn => "lvasgn",
            Kind::Ivasgn => "ivasgn",
            Kind::Cvasgn => "cvasgn",
            Kind::Gvasgn => "gvasgn",
            Kind::Casgn => "casgn",
            Kind::Masgn => "masgn",
            Kind::Mlhs => "mlhs",
            Kind::OpAsgn => "op_asgn",
            Kind::OrAsgn => "or_asgn",
            Kind::AndAsgn => "and_asgn",
            Kind::MatchPattern => "match_pattern",
            Kind::MatchPatternP => "match_pattern_p",
            Kind::Send => "send",
            Kind::Csend => "csend",
            Kind::Sendw => "sendw",
            Kind::SendBang => "send!",
            Kind::Await => "await",
            Kind::AwaitBang => "await!",
            Kind::AwaitAttr => "await_attr",
            Kind::Attr => "attr",
            Kind::Call => "call",
            Kind::Block => "block",
            Kind::Numblock => "numblock",
            Kind::BlockPass => "block_pass",
            Kind::Super => "super",
            Kind::Zsuper => "zsuper",
            Kind::Yield => "yield",
            Kind::Args => "args",
            Kind::Arg => "arg",
            Kind::Optarg => "optarg",
            Kind::Restarg => "restarg",
            Kind::Kwarg => "kwarg",
            Kind::Kwoptarg => "kwoptarg",
            Kind::Kwrestarg => "kwrestarg",
            Kind::Blockarg => "blockarg",
            Kind::Shadowarg => "shadowarg",
            Kind::And => "and",
            Kind::Or => "or",
            Kind::Not => "not",
            Kind::Nullish => "nullish",
            Kind::Defined => "defined?",
            Kind::Typeof => "typeof",
            Kind::Irange => "irange",
            Kind::Erange => "erange",
            Kind::Begin => "begin",
            Kind::Kwbegin => "kwbegin",
            Kind::If => "if",
            Kind::Case => "case",
            Kind::When => "when",
            Kind::CaseMatch => "case_match",
            Kind::InPattern => "in_pattern",
            Kind::While => "while",
            Kind::Until => "until",
            Kind::WhilePost => "while_post",
            Kind::UntilPost => "until_post",
            Kind::For => "for",
            Kind::Break => "break",
            Kind::Next => "next",
            Kind::Redo => "redo",
            Kind::Retry => "retry",
            Kind::Return => "return",
            Kind::Rescue => "rescue",
            Kind::Resbody => "resbody",
            Kind::Ensure => "ensure",
            Kind::Array => "array",
            Kind::Hash => "hash",
            Kind::Pair => "pair",
            Kind::Splat => "splat",
            Kind::Kwsplat => "kwsplat",
            Kind::Class => "class",
            Kind::Module => "module",
            Kind::Sclass => "sclass",
            Kind::Def => "def",
            Kind::Defs => "defs",
            Kind::Alias => "alias",
            Kind::Undef => "undef",
            Kind::HashPattern => "hash_pattern",
            Kind::ArrayPattern => "array_pattern",
            Kind::FindPattern => "find_pattern",
            Kind::MatchVar => "match_var",
            Kind::MatchAlt => "match_alt",
            Kind::MatchAs => "match_as",
            Kind::MatchRest => "match_rest",
            Kind::MatchNil => "match_nil_pattern",
            Kind::Pin => "pin",
            Kind::IfGuard => "if_guard",
            Kind::UnlessGuard => "unless_guard",
            Kind::Import => "import",
            Kind::Export => "export",
            Kind::ExportDefault => "export_default",
            Kind::Xnode => "xnode",
            Kind::Pnode => "pnode",
            Kind::Prop => "prop",
            Kind::Autoreturn => "autoreturn",
            Kind::Autobind => "autobind",
            Kind::PrivateMethod => "private_method",
            Kind::Setter => "setter",
            Kind::NoOp => "noop",
        }
    }

    /// True for every flavour the big send handler covers.
    pub fn is_send_family(self) -> bool {
        matches!(
            self,
            Kind::Send
                | Kind::Csend
                | Kind::Sendw
                | Kind::SendBang
                | Kind::Await
                | Kind::AwaitBang
                | Kind::AwaitAttr
                | Kind::Attr
                | Kind::Call
        )
    }

    /// Tags that always require wrapping when embedded in a larger
    /// expression.
    pub fn is_group(self) -> bool {
        matches!(
            self,
            Kind::Begin
                | Kind::Dstr
                | Kind::Dsym
                | Kind::And
                | Kind::Or
                | Kind::Nullish
                | Kind::Casgn
                | Kind::If
                | Kind::Await
                | Kind::AwaitBang
        )
    }

    /// The `and` / `not` / `or` group gets special precedence handling.
    pub fn is_logical(self) -> bool {
        matches!(self, Kind::And | Kind::Not | Kind::Or)
    }
}

impl std::fmt::Display for Kind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn as_str_round_trips_spelling() {
        assert_eq!(Kind::Lvasgn.as_str(), "lvasgn");
        assert_eq!(Kind::SendBang.as_str(), "send!");
        assert_eq!(Kind::Defined.as_str(), "defined?");
    }

    #[test]
    fn send_family_covers_await_variants() {
        assert!(Kind::Send.is_send_family());
        assert!(Kind::AwaitAttr.is_send_family());
        assert!(Kind::Call.is_send_family());
        assert!(!Kind::Block.is_send_family());
    }

    #[test]
    fn group_operators_match_fixed_set() {
        for k in [
            Kind::Begin,
            Kind::Dstr,
            Kind::Dsym,
            Kind::And,
            Kind::Or,
            Kind::Nullish,
            Kind::Casgn,
            Kind::If,
            Kind::Await,
            Kind::AwaitBang,
        ] {
            assert!(k.is_group(), "{} should group", k);
        }
        assert!(!Kind::Send.is_group());
        assert!(!Kind::Int.is_group());
    }
}
