//! Rails-style word inflection: pure functions over frozen tables.
//!
//! Filters use these to map model names to table names and back
//! (`Person` ↔ `people`). The regex rule lists are ordered; the first match
//! wins, so more specific rules sit above the catch-alls.

use once_cell::sync::Lazy;
use regex::Regex;

const IRREGULAR: &[(&str, &str)] = &[
    ("person", "people"),
    ("man", "men"),
    ("woman", "women"),
    ("child", "children"),
    ("ox", "oxen"),
    ("foot", "feet"),
    ("tooth", "teeth"),
    ("goose", "geese"),
    ("mouse", "mice"),
    ("zombie", "zombies"),
];

const UNCOUNTABLE: &[&str] = &[
    "equipment",
    "information",
    "rice",
    "money",
    "species",
    "series",
    "fish",
    "sheep",
    "jeans",
    "police",
];

static PLURAL_RULES: Lazy<Vec<(Regex, &'static str)>> = Lazy::new(|| {
    [
        (r"(quiz)$", "${1}zes"),
        (r"(matr|vert|ind)(?:ix|ex)$", "${1}ices"),
        (r"(x|ch|ss|sh)$", "${1}es"),
        (r"([^aeiouy]|qu)y$", "${1}ies"),
        (r"(hive)$", "${1}s"),
        (r"([lr])f$", "${1}ves"),
        (r"([^f])fe$", "${1}ves"),
        (r"sis$", "ses"),
        (r"([ti])um$", "${1}a"),
        (r"(buffal|tomat|potat)o$", "${1}oes"),
        (r"(bu)s$", "${1}ses"),
        (r"(alias|status)$", "${1}es"),
        (r"(octop|vir)us$", "${1}i"),
        (r"(ax|test)is$", "${1}es"),
        (r"s$", "s"),
        (r"$", "s"),
    ]
    .iter()
    .map(|(pat, rep)| (Regex::new(pat).unwrap(), *rep))
    .collect()
});

static SINGULAR_RULES: Lazy<Vec<(Regex, &'static str)>> = Lazy::new(|| {
    [
        (r"(quiz)zes$", "${1}"),
        (r"(matr)ices$", "${1}ix"),
        (r"(vert|ind)ices$", "${1}ex"),
        (r"(alias|status)es$", "${1}"),
        (r"(octop|vir)i$", "${1}us"),
        (r"(cris|ax|test)es$", "${1}is"),
        (r"(shoe)s$", "${1}"),
        (r"(o)es$", "${1}"),
        (r"(bus)(es)?$", "${1}"),
        (r"([ti])a$", "${1}um"),
        (r"(analy|ba|diagno|parenthe|progno|synop|the)s(i|e)s$", "${1}sis"),
        (r"([^f])ves$", "${1}fe"),
        (r"(hive)s$", "${1}"),
        (r"(tive)s$", "${1}"),
        (r"([lr])ves$", "${1}f"),
        (r"([^aeiouy]|qu)ies$", "${1}y"),
        (r"(s)eries$", "${1}eries"),
        (r"(m)ovies$", "${1}ovie"),
        (r"(x|ch|ss|sh)es$", "${1}"),
        (r"(ss)$", "${1}"),
        (r"s$", ""),
    ]
    .iter()
    .map(|(pat, rep)| (Regex::new(pat).unwrap(), *rep))
    .collect()
});

pub fn pluralize(word: &str) -> String {
    if UNCOUNTABLE.contains(&word) {
        return word.to_string();
    }
    for (singular, plural) in IRREGULAR {
        if word == *singular {
            return (*plural).to_string();
        }
        if word == *plural {
            return (*plural).to_string();
        }
    }
    for (rule, replacement) in PLURAL_RULES.iter() {
        if rule.is_match(word) {
            return rule.replace(word, *replacement).into_owned();
        }
    }
    word.to_string()
}

pub fn singularize(word: &str) -> String {
    if UNCOUNTABLE.contains(&word) {
        return word.to_string();
    }
    for (singular, plural) in IRREGULAR {
        if word == *plural {
            return (*singular).to_string();
        }
        if word == *singular {
            return (*singular).to_string();
        }
    }
    for (rule, replacement) in SINGULAR_RULES.iter() {
        if rule.is_match(word) {
            return rule.replace(word, *replacement).into_owned();
        }
    }
    word.to_string()
}

/// `FooBar` → `foo_bar`: an underscore before each interior uppercase run,
/// then lowercase.
pub fn underscore(word: &str) -> String {
    let mut out = String::with_capacity(word.len() + 4);
    let mut prev_lower = false;
    for c in word.chars() {
        if c.is_uppercase() {
            if prev_lower {
                out.push('_');
            }
            for lc in c.to_lowercase() {
                out.push(lc);
            }
            prev_lower = false;
        } else {
            out.push(c);
            prev_lower = c.is_lowercase() || c.is_ascii_digit();
        }
    }
    out
}

/// `foo_bar` → `FooBar`.
pub fn classify(word: &str) -> String {
    word.split('_')
        .map(|piece| {
            let mut chars = piece.chars();
            match chars.next() {
                None => String::new(),
                Some(c) => c.to_uppercase().collect::<String>() + chars.as_str(),
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pluralize_regular_words() {
        assert_eq!(pluralize("post"), "posts");
        assert_eq!(pluralize("category"), "categories");
        assert_eq!(pluralize("box"), "boxes");
        assert_eq!(pluralize("wish"), "wishes");
        assert_eq!(pluralize("quiz"), "quizzes");
    }

    #[test]
    fn pluralize_irregular_words() {
        assert_eq!(pluralize("person"), "people");
        assert_eq!(pluralize("ox"), "oxen");
        assert_eq!(pluralize("mouse"), "mice");
    }

    #[test]
    fn pluralize_uncountables_unchanged() {
        assert_eq!(pluralize("sheep"), "sheep");
        assert_eq!(pluralize("series"), "series");
        assert_eq!(pluralize("equipment"), "equipment");
    }

    #[test]
    fn singularize_regular_words() {
        assert_eq!(singularize("posts"), "post");
        assert_eq!(singularize("categories"), "category");
        assert_eq!(singularize("boxes"), "box");
        assert_eq!(singularize("statuses"), "status");
    }

    #[test]
    fn singularize_irregular_words() {
        assert_eq!(singularize("people"), "person");
        assert_eq!(singularize("children"), "child");
        assert_eq!(singularize("geese"), "goose");
    }

    #[test]
    fn singularize_already_singular() {
        assert_eq!(singularize("person"), "person");
        assert_eq!(singularize("sheep"), "sheep");
    }

    #[test]
    fn first_matching_rule_wins() {
        // "analyses" must hit the -sis rule, not the generic trailing-s rule.
        assert_eq!(singularize("analyses"), "analysis");
        assert_eq!(pluralize("analysis"), "analyses");
    }

    #[test]
    fn underscore_inserts_before_uppercase_runs() {
        assert_eq!(underscore("FooBar"), "foo_bar");
        assert_eq!(underscore("HTTPServer"), "httpserver");
        assert_eq!(underscore("userID"), "user_id");
        assert_eq!(underscore("simple"), "simple");
    }

    #[test]
    fn classify_upcases_each_piece() {
        assert_eq!(classify("foo_bar"), "FooBar");
        assert_eq!(classify("post"), "Post");
        assert_eq!(classify("a_b_c"), "ABC");
    }

    #[test]
    fn classify_and_underscore_round_trip_simple_names() {
        for name in ["foo_bar", "post", "line_item"] {
            assert_eq!(underscore(&classify(name)), name);
        }
    }
}
