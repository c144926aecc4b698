//! Text helpers shared by the compiler and engine: natural ordering for
//! names that embed numbers, identifier escaping, tuple keys, and the
//! whitespace normalization applied to generated GLPK text.

use once_cell::sync::Lazy;
use regex::Regex;
use std::cmp::Ordering;

/// One piece of a name split into runs of digits and non-digits.
#[derive(Debug, Clone, PartialEq, Eq)]
enum NaturalPart {
    Num(u64),
    Text(String),
}

/// Split `text` into digit and non-digit runs so that `"N206"` compares as
/// `["N", 206]` and `"WDM32_2"` sorts before `"WDM32_10"`.
fn natural_parts(text: &str) -> Vec<NaturalPart> {
    let mut parts = Vec::new();
    let mut buf = String::new();
    let mut digits = false;
    for ch in text.chars() {
        let d = ch.is_ascii_digit();
        if !buf.is_empty() && d != digits {
            parts.push(flush(&mut buf, digits));
        }
        digits = d;
        buf.push(ch);
    }
    if !buf.is_empty() {
        parts.push(flush(&mut buf, digits));
    }
    parts
}

fn flush(buf: &mut String, digits: bool) -> NaturalPart {
    let s = std::mem::take(buf);
    if digits {
        // Leading zeros are irrelevant for ordering; saturate absurd runs.
        NaturalPart::Num(s.parse::<u64>().unwrap_or(u64::MAX))
    } else {
        NaturalPart::Text(s)
    }
}

/// Natural comparison of two names ("N9" < "N10" < "N10a").
pub fn natural_cmp(a: &str, b: &str) -> Ordering {
    let pa = natural_parts(a);
    let pb = natural_parts(b);
    for (x, y) in pa.iter().zip(pb.iter()) {
        let ord = match (x, y) {
            (NaturalPart::Num(m), NaturalPart::Num(n)) => m.cmp(n),
            (NaturalPart::Text(s), NaturalPart::Text(t)) => s.cmp(t),
            (NaturalPart::Num(_), NaturalPart::Text(_)) => Ordering::Less,
            (NaturalPart::Text(_), NaturalPart::Num(_)) => Ordering::Greater,
        };
        if ord != Ordering::Equal {
            return ord;
        }
    }
    pa.len().cmp(&pb.len())
}

/// Sort a vector of names in natural order.
pub fn sort_natural(values: &mut [String]) {
    values.sort_by(|a, b| natural_cmp(a, b));
}

static NON_WORD: Lazy<Regex> = Lazy::new(|| Regex::new(r"[^\w]").unwrap());

/// Replace every character that is not alphanumeric or `_` with `_`.
/// Channel table ids and model names pass through this before they become
/// GLPK identifiers or file names.
pub fn escape(txt: &str) -> String {
    NON_WORD.replace_all(txt, "_").into_owned()
}

/// Unique key for a `(in-port, in-channel, out-port, out-channel)` tuple.
pub fn tuple_key(in_port: &str, in_ch: &str, out_port: &str, out_ch: &str) -> String {
    format!("{in_port}@{in_ch}#{out_port}@{out_ch}")
}

/// Key for a tuple with the out-channel left open.
pub fn tuple_key_ijk(in_port: &str, in_ch: &str, out_port: &str) -> String {
    format!("{in_port}@{in_ch}#{out_port}@undef")
}

static ASSIGN: Lazy<Regex> = Lazy::new(|| Regex::new(r" *:= *").unwrap());
static COMMA: Lazy<Regex> = Lazy::new(|| Regex::new(r", *").unwrap());
static OPERATOR: Lazy<Regex> = Lazy::new(|| Regex::new(r" *([<>&:=+\-*/]+) *").unwrap());
static OPEN_PAREN: Lazy<Regex> = Lazy::new(|| Regex::new(r"\( +").unwrap());
static CLOSE_PAREN: Lazy<Regex> = Lazy::new(|| Regex::new(r" +\)").unwrap());
static SEMI: Lazy<Regex> = Lazy::new(|| Regex::new(r"; *").unwrap());
static BRACE_COLON: Lazy<Regex> = Lazy::new(|| Regex::new(r"\} *: *").unwrap());
static SPACE_BRACKET: Lazy<Regex> = Lazy::new(|| Regex::new(r" +\[").unwrap());

/// Normalize spacing in generated GLPK text and break lines after `;`.
pub fn format_glpk(glpk: &str) -> String {
    let s = ASSIGN.replace_all(glpk, " := ");
    let s = COMMA.replace_all(&s, ", ");
    let s = OPERATOR.replace_all(&s, " $1 ");
    let s = OPEN_PAREN.replace_all(&s, "(");
    let s = CLOSE_PAREN.replace_all(&s, ")");
    let s = SEMI.replace_all(&s, ";\n");
    let s = BRACE_COLON.replace_all(&s, "} : ");
    SPACE_BRACKET.replace_all(&s, "[").into_owned()
}

static NUM_RANGE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\{ *([0-9]+) *\.\. *([0-9]+) *(by *([0-9]+) *)?\}").unwrap());

/// Expand GLPK range notation: `{1..4}` becomes `{1,2,3,4}` and
/// `{1..9 by 2}` becomes `{1,3,5,7,9}`.
pub fn expand_numset(glpk: &str) -> String {
    let mut out = String::new();
    let mut idx = 0;
    for caps in NUM_RANGE.captures_iter(glpk) {
        let whole = caps.get(0).unwrap();
        let start: u64 = caps[1].parse().unwrap_or(0);
        let end: u64 = caps[2].parse().unwrap_or(0);
        let step: u64 = caps
            .get(4)
            .and_then(|m| m.as_str().parse().ok())
            .unwrap_or(1)
            .max(1);
        out.push_str(&glpk[idx..whole.start()]);
        out.push('{');
        let mut first = true;
        let mut n = start;
        while n <= end {
            if !first {
                out.push(',');
            }
            out.push_str(&n.to_string());
            first = false;
            n += step;
        }
        out.push('}');
        idx = whole.end();
    }
    if idx == 0 {
        return glpk.to_string();
    }
    out.push_str(&glpk[idx..]);
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn natural_order_puts_short_numbers_first() {
        let mut v = vec![
            "WDM32_10".to_string(),
            "WDM32_2".to_string(),
            "WDM32_1".to_string(),
        ];
        sort_natural(&mut v);
        assert_eq!(v, vec!["WDM32_1", "WDM32_2", "WDM32_10"]);
    }

    #[test]
    fn natural_order_mixes_text_and_numbers() {
        assert_eq!(natural_cmp("N9", "N10"), Ordering::Less);
        assert_eq!(natural_cmp("N10", "N10"), Ordering::Equal);
        assert_eq!(natural_cmp("N10a", "N10"), Ordering::Greater);
    }

    #[test]
    fn escape_replaces_non_word() {
        assert_eq!(escape("Gray1.3"), "Gray1_3");
        assert_eq!(escape("WDM32"), "WDM32");
        assert_eq!(escape("urn:uuid:abc-def"), "urn_uuid_abc_def");
    }

    #[test]
    fn expand_plain_range() {
        assert_eq!(
            expand_numset("set InputPortD := {1..4};"),
            "set InputPortD := {1,2,3,4};"
        );
    }

    #[test]
    fn expand_stepped_range() {
        assert_eq!(
            expand_numset("set P := {1..9 by 2};"),
            "set P := {1,3,5,7,9};"
        );
    }

    #[test]
    fn expand_leaves_plain_sets_alone() {
        let s = "set OutputPort := {2, 4, 6};";
        assert_eq!(expand_numset(s), s);
    }

    #[test]
    fn format_breaks_after_semicolons() {
        let out = format_glpk("set A := {1,2};set B := {3};");
        assert!(out.contains(";\n"));
        assert!(out.contains("set A := "));
    }

    #[test]
    fn tuple_keys_are_stable() {
        assert_eq!(
            tuple_key("N1_1", "WDM32_1", "N1_2", "WDM32_1"),
            "N1_1@WDM32_1#N1_2@WDM32_1"
        );
        assert_eq!(tuple_key_ijk("a", "b", "c"), "a@b#c@undef");
    }
}
