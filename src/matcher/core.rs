use regex::Regex;
use std::collections::HashSet;
use std::sync::Arc;
use tracing::debug;

use crate::error::RegistrationError;
use crate::server::Params;

/// A compiled route path.
#[derive(Debug, Clone)]
pub enum PathMatcher {
    /// Literal path without parameters, matched by string equality
    Exact(String),
    /// Parameterized path, matched by regular expression
    Pattern(PatternMatcher),
}

/// Regular expression plus the ordered parameter names of its capture groups.
#[derive(Debug, Clone)]
pub struct PatternMatcher {
    pattern: String,
    regex: Regex,
    param_names: Vec<Arc<str>>,
}

enum Token {
    Literal(String),
    Param(ParamToken),
}

struct ParamToken {
    name: String,
    prefix: Option<char>,
    pattern: String,
    optional: bool,
    repeat: bool,
    /// The prefix is followed by something other than another prefix,
    /// so only the capture (not the prefix) may be omitted.
    partial: bool,
}

impl PathMatcher {
    /// Compile a cleaned (slash-trimmed) route path.
    ///
    /// Paths without parameter syntax become [`PathMatcher::Exact`]. Everything
    /// else compiles to an anchored, case-insensitive regex.
    ///
    /// # Errors
    ///
    /// [`RegistrationError::InvalidPattern`] when a group is unbalanced or empty,
    /// a parameter name repeats, or the resulting regex does not compile.
    pub fn compile(path: &str) -> Result<Self, RegistrationError> {
        let invalid = |reason: String| RegistrationError::InvalidPattern {
            pattern: path.to_string(),
            reason,
        };

        let tokens = tokenize(path).map_err(invalid)?;
        if !tokens.iter().any(|t| matches!(t, Token::Param(_))) {
            return Ok(PathMatcher::Exact(path.to_string()));
        }

        let mut seen = HashSet::new();
        let mut param_names = Vec::new();
        let mut route = String::with_capacity(path.len() * 2);

        for token in &tokens {
            match token {
                Token::Literal(text) => route.push_str(&regex::escape(text)),
                Token::Param(param) => {
                    if !seen.insert(param.name.as_str()) {
                        return Err(invalid(format!(
                            "duplicate parameter name '{}'",
                            param.name
                        )));
                    }
                    param_names.push(Arc::from(param.name.as_str()));
                    route.push_str(&param.to_regex());
                }
            }
        }

        let route = route.strip_suffix('/').unwrap_or(&route);
        let source = format!("(?i)^{route}/?$");
        let regex = Regex::new(&source).map_err(|e| invalid(e.to_string()))?;

        debug!(
            pattern = %path,
            regex = %source,
            param_count = param_names.len(),
            "Compiled route pattern"
        );

        Ok(PathMatcher::Pattern(PatternMatcher {
            pattern: path.to_string(),
            regex,
            param_names,
        }))
    }

    #[must_use]
    pub fn is_pattern(&self) -> bool {
        matches!(self, PathMatcher::Pattern(_))
    }

    /// The path this matcher was compiled from
    #[must_use]
    pub fn path(&self) -> &str {
        match self {
            PathMatcher::Exact(path) => path,
            PathMatcher::Pattern(p) => &p.pattern,
        }
    }

    /// Match a cleaned request path, returning the extracted parameters.
    #[must_use]
    pub fn captures(&self, path: &str) -> Option<Params> {
        match self {
            PathMatcher::Exact(exact) => (exact == path).then(Params::new),
            PathMatcher::Pattern(p) => p.captures(path),
        }
    }
}

impl PatternMatcher {
    #[must_use]
    pub fn pattern(&self) -> &str {
        &self.pattern
    }

    #[must_use]
    pub fn regex(&self) -> &Regex {
        &self.regex
    }

    /// Parameter names in capture-group order
    #[must_use]
    pub fn param_names(&self) -> &[Arc<str>] {
        &self.param_names
    }

    #[must_use]
    pub fn is_match(&self, path: &str) -> bool {
        self.regex.is_match(path)
    }

    /// Match a cleaned request path and map capture groups to names in order.
    ///
    /// Groups that did not participate in the match (optional parameters) are
    /// left out.
    #[must_use]
    pub fn captures(&self, path: &str) -> Option<Params> {
        let captures = self.regex.captures(path)?;
        Some(
            self.param_names
                .iter()
                .enumerate()
                .filter_map(|(i, name)| {
                    captures
                        .get(i + 1)
                        .map(|m| (Arc::clone(name), m.as_str().to_string()))
                })
                .collect(),
        )
    }
}

impl ParamToken {
    fn to_regex(&self) -> String {
        let prefix = self
            .prefix
            .map(|c| regex::escape(c.encode_utf8(&mut [0; 4])))
            .unwrap_or_default();

        let mut capture = format!("(?:{})", self.pattern);
        if self.repeat {
            capture = format!("{capture}(?:{prefix}{capture})*");
        }

        match (self.optional, self.partial) {
            (true, true) => format!("{prefix}({capture})?"),
            (true, false) => format!("(?:{prefix}({capture}))?"),
            (false, _) => format!("{prefix}({capture})"),
        }
    }
}

fn is_word(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_'
}

/// Whether a parameter (`:name`, `(group)` or `*`) starts at `i`.
fn starts_param(chars: &[char], i: usize) -> bool {
    match chars.get(i) {
        Some(':') => chars.get(i + 1).is_some_and(|c| is_word(*c)),
        Some('(') | Some('*') => true,
        _ => false,
    }
}

/// Read a `( ... )` group starting at `open`. Returns the inner text and the
/// index just past the closing paren.
fn read_group(chars: &[char], open: usize) -> Result<(String, usize), String> {
    let mut group = String::new();
    let mut i = open + 1;

    while let Some(&c) = chars.get(i) {
        match c {
            '\\' => {
                group.push(c);
                if let Some(&escaped) = chars.get(i + 1) {
                    group.push(escaped);
                }
                i += 2;
            }
            '(' => return Err(format!("nested group at offset {i}")),
            ')' => {
                if group.is_empty() {
                    return Err(format!("empty group at offset {open}"));
                }
                return Ok((group, i + 1));
            }
            _ => {
                group.push(c);
                i += 1;
            }
        }
    }

    Err(format!("unclosed group at offset {open}"))
}

fn tokenize(path: &str) -> Result<Vec<Token>, String> {
    let chars: Vec<char> = path.chars().collect();
    let mut tokens = Vec::new();
    let mut literal = String::new();
    let mut unnamed = 0usize;
    let mut i = 0;

    while let Some(&c) = chars.get(i) {
        if c == '\\' {
            literal.push(chars.get(i + 1).copied().unwrap_or(c));
            i += 2;
            continue;
        }

        let (prefix, start) = if (c == '/' || c == '.') && starts_param(&chars, i + 1) {
            (Some(c), i + 1)
        } else {
            (None, i)
        };

        if !starts_param(&chars, start) {
            literal.push(c);
            i += 1;
            continue;
        }

        let mut j = start;
        let mut name = None;
        let mut group = None;
        let mut asterisk = false;

        match chars[j] {
            ':' => {
                j += 1;
                let name_start = j;
                while chars.get(j).copied().is_some_and(is_word) {
                    j += 1;
                }
                name = Some(chars[name_start..j].iter().collect::<String>());
                if chars.get(j) == Some(&'(') {
                    let (g, end) = read_group(&chars, j)?;
                    group = Some(g);
                    j = end;
                }
            }
            '(' => {
                let (g, end) = read_group(&chars, j)?;
                group = Some(g);
                j = end;
            }
            _ => {
                asterisk = true;
                j += 1;
            }
        }

        let modifier = match chars.get(j) {
            Some(&m @ ('?' | '*' | '+')) if !asterisk => {
                j += 1;
                Some(m)
            }
            _ => None,
        };

        if !literal.is_empty() {
            tokens.push(Token::Literal(std::mem::take(&mut literal)));
        }

        let name = name.unwrap_or_else(|| {
            let n = unnamed.to_string();
            unnamed += 1;
            n
        });
        let delimiter = prefix.unwrap_or('/');
        let pattern = match group {
            Some(g) => g,
            None if asterisk => ".*".to_string(),
            None => format!("[^{}]+?", regex::escape(delimiter.encode_utf8(&mut [0; 4]))),
        };
        let partial = match (prefix, chars.get(j)) {
            (Some(p), Some(&next)) => next != p,
            _ => false,
        };

        tokens.push(Token::Param(ParamToken {
            name,
            prefix,
            pattern,
            optional: matches!(modifier, Some('?' | '*')),
            repeat: matches!(modifier, Some('+' | '*')),
            partial,
        }));
        i = j;
    }

    if !literal.is_empty() {
        tokens.push(Token::Literal(literal));
    }

    Ok(tokens)
}
