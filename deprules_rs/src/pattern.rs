//! Wildcard name patterns compiled to anchored regexes.
//!
//! A hierarchical wildcard source such as `My.Name.**` compiles into up to
//! four anchored alternatives so one pattern covers a bare name, a
//! `Name::member` shape, a `Name/Nested` shape, and both combined. `.`
//! separates segments literally, `*` matches exactly one identifier, `**`
//! matches an identifier chain (dot- or slash-separated depending on
//! context), and a source starting with `^` escapes to raw regex.

use regex::Regex;

use crate::errors::PatternSyntaxError;

/// One identifier: Unicode letters, digits, `_` or `-`.
const IDENT: &str = r"[\p{L}\p{N}_\-]+";

/// A compiled, immutable name matcher.
#[derive(Debug, Clone)]
pub struct NamePattern {
    source: String,
    alternatives: Vec<Regex>,
}

impl NamePattern {
    /// Compile a wildcard (or raw `^...$`) source into its alternatives.
    pub fn compile(source: &str) -> Result<Self, PatternSyntaxError> {
        let raw = source.starts_with('^');
        // A trailing `\$` is a literal dollar, not a closing anchor.
        let raw_closed = raw && source.ends_with('$') && !source.ends_with("\\$");

        let body = if raw {
            // Raw regex escape: no wildcard expansion. Strip the anchors;
            // they are re-applied uniformly below.
            let stripped = source.strip_prefix('^').unwrap_or(source);
            let stripped = if raw_closed {
                stripped.strip_suffix('$').unwrap_or(stripped)
            } else {
                stripped
            };
            stripped.to_string()
        } else {
            expand_wildcards(source)?
        };

        let member = format!("::({IDENT})");
        let nested = format!("((?:/{IDENT})+)");

        // Alternative shapes: a source that already pins down the member or
        // nesting needs fewer of them.
        let mut shapes: Vec<String> = vec![format!("^{body}$")];
        if !raw_closed && !source.contains("::") {
            if !source.contains('/') {
                shapes.push(format!("^{body}{member}$"));
                shapes.push(format!("^{body}{nested}$"));
                shapes.push(format!("^{body}{nested}{member}$"));
            } else {
                shapes.push(format!("^{body}{member}$"));
            }
        }

        let mut alternatives = Vec::with_capacity(shapes.len());
        for shape in &shapes {
            let re = Regex::new(shape).map_err(|e| PatternSyntaxError {
                fragment: source.to_string(),
                message: e.to_string(),
            })?;
            alternatives.push(re);
        }
        Ok(Self {
            source: source.to_string(),
            alternatives,
        })
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn is_match(&self, name: &str) -> bool {
        self.alternatives.iter().any(|re| re.is_match(name))
    }

    /// Match a name and return the captured wildcard groups of the first
    /// matching alternative (for back-reference in rule right-hand sides).
    pub fn matches(&self, name: &str) -> Option<Vec<String>> {
        for re in &self.alternatives {
            if let Some(caps) = re.captures(name) {
                let groups = caps
                    .iter()
                    .skip(1)
                    .flatten()
                    .map(|m| m.as_str().to_string())
                    .collect();
                return Some(groups);
            }
        }
        None
    }
}

/// Expand `**`, `*` and literal characters into a regex body.
fn expand_wildcards(source: &str) -> Result<String, PatternSyntaxError> {
    let mut out = String::new();
    let chars: Vec<char> = source.chars().collect();
    let mut i = 0;
    while i < chars.len() {
        if chars[i] == '*' && i + 1 < chars.len() && chars[i + 1] == '*' {
            let sep = if path_context(&chars, i) { "/" } else { r"\." };
            out.push_str(&format!("({IDENT}(?:{sep}{IDENT})*)"));
            i += 2;
        } else if chars[i] == '*' {
            out.push_str(&format!("({IDENT})"));
            i += 1;
        } else {
            match chars[i] {
                '.' => out.push_str(r"\."),
                c if c.is_alphanumeric() || c == '_' || c == '-' => out.push(c),
                ':' | '/' => out.push(chars[i]),
                // Any other character is taken literally.
                c => out.push_str(&regex::escape(&c.to_string())),
            }
            i += 1;
        }
    }
    if out.is_empty() {
        return Err(PatternSyntaxError {
            fragment: source.to_string(),
            message: "empty pattern".to_string(),
        });
    }
    Ok(out)
}

/// Decide whether a `**` at `pos` sits in slash-qualifier context: the
/// nearest `/` on the left is strictly closer than the nearest `.`.
fn path_context(chars: &[char], pos: usize) -> bool {
    let mut last_slash: Option<usize> = None;
    let mut last_dot: Option<usize> = None;
    for (i, ch) in chars.iter().enumerate().take(pos) {
        match ch {
            '/' => last_slash = Some(i),
            '.' => last_dot = Some(i),
            _ => {}
        }
    }
    match (last_slash, last_dot) {
        (Some(s), Some(d)) => s > d,
        (Some(_), None) => true,
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn literal_dots_separate_segments() {
        let p = NamePattern::compile("a.b.c").expect("valid pattern");
        assert!(p.is_match("a.b.c"));
        assert!(!p.is_match("aXbXc"));
    }

    #[test]
    fn single_star_matches_one_identifier() {
        let p = NamePattern::compile("a.*.c").expect("valid pattern");
        assert!(p.is_match("a.b.c"));
        assert!(p.is_match("a.xyz.c"));
        assert!(!p.is_match("a.b.x.c"));
    }

    #[test]
    fn double_star_expands_dot_style_without_slash_context() {
        let p = NamePattern::compile("root.**").expect("valid pattern");
        assert!(p.is_match("root.a"));
        assert!(p.is_match("root.a.b.c"));
        assert!(!p.is_match("root."));
    }

    #[test]
    fn double_star_expands_slash_style_after_slash() {
        let p = NamePattern::compile("root/**").expect("valid pattern");
        assert!(p.is_match("root/a"));
        assert!(p.is_match("root/a/b"));
        assert!(!p.is_match("root.a"));
    }

    #[test]
    fn tie_break_uses_nearest_separator() {
        // The `.` after the `/` is closer to `**`, so dot-style wins.
        let p = NamePattern::compile("a/b.**").expect("valid pattern");
        assert!(p.is_match("a/b.x.y"));
        assert!(!p.is_match("a/b.x/y"));
    }

    #[test]
    fn wildcard_captures_are_returned() {
        let p = NamePattern::compile("a.*.**").expect("valid pattern");
        let caps = p.matches("a.mid.x.y").expect("should match");
        assert_eq!(caps, vec!["mid".to_string(), "x.y".to_string()]);
    }

    #[test]
    fn plain_pattern_matches_member_and_nested_shapes() {
        let p = NamePattern::compile("pkg.Type").expect("valid pattern");
        assert!(p.is_match("pkg.Type"));
        assert!(p.is_match("pkg.Type::method"));
        assert!(p.is_match("pkg.Type/Inner"));
        assert!(p.is_match("pkg.Type/Inner/Deeper::method"));
        assert!(!p.is_match("pkg.TypeX"));
    }

    #[test]
    fn member_pattern_compiles_to_single_alternative() {
        let p = NamePattern::compile("pkg.Type::run").expect("valid pattern");
        assert!(p.is_match("pkg.Type::run"));
        assert!(!p.is_match("pkg.Type::run::again"));
        assert!(!p.is_match("pkg.Type"));
    }

    #[test]
    fn slash_pattern_still_accepts_member_suffix() {
        let p = NamePattern::compile("pkg.Type/Inner").expect("valid pattern");
        assert!(p.is_match("pkg.Type/Inner"));
        assert!(p.is_match("pkg.Type/Inner::method"));
        assert!(!p.is_match("pkg.Type/Inner/Deeper"));
    }

    #[test]
    fn raw_regex_passes_through() {
        let p = NamePattern::compile("^x[0-9]+$").expect("valid pattern");
        assert!(p.is_match("x42"));
        assert!(!p.is_match("x42::m"));
    }

    #[test]
    fn raw_regex_without_end_anchor_gets_suffix_alternatives() {
        let p = NamePattern::compile("^x[0-9]+").expect("valid pattern");
        assert!(p.is_match("x42"));
        assert!(p.is_match("x42::m"));
        assert!(p.is_match("x42/Inner"));
    }

    #[test]
    fn raw_regex_escaped_dollar_is_a_literal() {
        let p = NamePattern::compile(r"^price\$").expect("valid pattern");
        assert!(p.is_match("price$"));
        // Not closed, so the suffix alternatives still apply.
        assert!(p.is_match("price$::total"));
        assert!(!p.is_match("price"));
    }

    #[test]
    fn invalid_raw_regex_reports_fragment() {
        let err = NamePattern::compile("^x[").expect_err("must fail");
        assert_eq!(err.fragment, "^x[");
    }

    #[test]
    fn generated_names_round_trip() {
        // A name generated by filling the expansion with identifiers must
        // match the compiled pattern.
        for (pattern, filled) in [
            ("a.**", "a.id1.id2"),
            ("lib/**", "lib/id1/id2"),
            ("*.end", "one.end"),
        ] {
            let p = NamePattern::compile(pattern).expect("valid pattern");
            assert!(p.is_match(filled), "{pattern} should match {filled}");
        }
    }
}
