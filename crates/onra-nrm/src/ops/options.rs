//! Request option parsing: `-key`, `-key value` and `-key v1 v2 ...` flags
//! in any order. Tokens that match no known flag are ignored; a known flag
//! missing its value is a [`ParseError`], which the handler answers with
//! the subcommand's usage text rather than an ERROR reply.

use std::collections::HashMap;
use thiserror::Error;

/// Option-grammar violation for a known subcommand. Distinct from
/// execution errors so the handler can reply with the usage text.
#[derive(Debug, Error)]
#[error("{0}")]
pub struct ParseError(pub String);

/// How many values a flag takes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Arity {
    /// Boolean flag without a value (`-bi`).
    None,
    /// Exactly one value (`-s <src>`).
    One,
    /// One or more values up to the next flag (`-ero p1 p2 ...`).
    Any,
}

/// A subcommand's flag table.
#[derive(Debug, Clone)]
pub struct OptSpec {
    defs: Vec<(&'static str, Arity)>,
}

impl OptSpec {
    pub fn new(defs: &[(&'static str, Arity)]) -> OptSpec {
        OptSpec {
            defs: defs.to_vec(),
        }
    }

    fn arity(&self, key: &str) -> Option<Arity> {
        self.defs
            .iter()
            .find(|(name, _)| *name == key)
            .map(|(_, arity)| *arity)
    }
}

/// Parsed flag values.
#[derive(Debug, Default)]
pub struct ParsedOpts {
    flags: HashMap<String, bool>,
    ones: HashMap<String, String>,
    manys: HashMap<String, Vec<String>>,
}

impl ParsedOpts {
    pub fn flag(&self, key: &str) -> bool {
        self.flags.get(key).copied().unwrap_or(false)
    }

    pub fn one(&self, key: &str) -> Option<&str> {
        self.ones.get(key).map(String::as_str)
    }

    pub fn required(&self, key: &str) -> Result<&str, ParseError> {
        self.one(key)
            .ok_or_else(|| ParseError(format!("-{key} is a required option")))
    }

    pub fn many(&self, key: &str) -> Option<&[String]> {
        self.manys.get(key).map(Vec::as_slice)
    }

    pub fn usize(&self, key: &str) -> Result<Option<usize>, ParseError> {
        match self.one(key) {
            None => Ok(None),
            Some(v) => v
                .parse::<usize>()
                .map(Some)
                .map_err(|e| ParseError(format!("-{key} {v} is invalid: {e}"))),
        }
    }
}

/// Parse `args` (the tokens after the subcommand) against `spec`. Unknown
/// flags and stray values are ignored; only a known flag without its
/// value(s) is an error.
pub fn parse(spec: &OptSpec, args: &[&str]) -> Result<ParsedOpts, ParseError> {
    let mut opts = ParsedOpts::default();
    let mut idx = 0;
    while idx < args.len() {
        let token = args[idx];
        let arity = token.strip_prefix('-').and_then(|key| spec.arity(key));
        let Some(arity) = arity else {
            // Not one of this subcommand's flags; skip it.
            idx += 1;
            continue;
        };
        let key = &token[1..];
        idx += 1;
        match arity {
            Arity::None => {
                opts.flags.insert(key.to_string(), true);
            }
            Arity::One => {
                let value = args
                    .get(idx)
                    .filter(|v| !v.starts_with('-'))
                    .ok_or_else(|| ParseError(format!("option {token} must have a value")))?;
                opts.ones.insert(key.to_string(), value.to_string());
                idx += 1;
            }
            Arity::Any => {
                let mut values = Vec::new();
                while let Some(v) = args.get(idx) {
                    if v.starts_with('-') {
                        break;
                    }
                    values.push(v.to_string());
                    idx += 1;
                }
                if values.is_empty() {
                    return Err(ParseError(format!("option {token} must have some values")));
                }
                opts.manys.insert(key.to_string(), values);
            }
        }
    }
    Ok(opts)
}

/// Parse a `[true|false]` toggle argument; `None` when absent.
pub fn parse_true_false(args: &[&str]) -> Result<Option<bool>, ParseError> {
    match args.first() {
        None => Ok(None),
        Some(&"true") => Ok(Some(true)),
        Some(&"false") => Ok(Some(false)),
        Some(other) => Err(ParseError(format!("specify with [true|false]: {other}"))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn spec() -> OptSpec {
        OptSpec::new(&[
            ("bi", Arity::None),
            ("s", Arity::One),
            ("d", Arity::One),
            ("ero", Arity::Any),
            ("ch", Arity::Any),
        ])
    }

    #[test]
    fn flags_in_any_order() {
        let opts = parse(
            &spec(),
            &["-d", "C_2", "-bi", "-s", "A_1", "-ero", "B_1", "B_3"],
        )
        .unwrap();
        assert!(opts.flag("bi"));
        assert_eq!(opts.one("s"), Some("A_1"));
        assert_eq!(opts.one("d"), Some("C_2"));
        assert_eq!(opts.many("ero").unwrap().len(), 2);
        assert!(opts.many("ch").is_none());
    }

    #[test]
    fn missing_values_are_errors() {
        assert!(parse(&spec(), &["-s"]).is_err());
        assert!(parse(&spec(), &["-s", "-bi"]).is_err());
        assert!(parse(&spec(), &["-ero", "-bi"]).is_err());
    }

    #[test]
    fn unknown_tokens_are_ignored() {
        let opts = parse(&spec(), &["-zz", "1", "stray", "-s", "A_1"]).unwrap();
        assert_eq!(opts.one("s"), Some("A_1"));
        assert!(!opts.flag("zz"));
        assert!(parse(&spec(), &["stray"]).unwrap().one("s").is_none());
    }

    #[test]
    fn required_reports_the_flag_name() {
        let opts = parse(&spec(), &[]).unwrap();
        let err = opts.required("s").unwrap_err().to_string();
        assert!(err.contains("-s"));
    }

    #[test]
    fn true_false_toggles() {
        assert_eq!(parse_true_false(&[]).unwrap(), None);
        assert_eq!(parse_true_false(&["true"]).unwrap(), Some(true));
        assert_eq!(parse_true_false(&["false"]).unwrap(), Some(false));
        assert!(parse_true_false(&["maybe"]).is_err());
    }
}
