//! Parsed form of the GLPK constraint fragments that components carry in
//! the topology document: `set` definitions and `s.t.` constraint lines.
//!
//! The pathfinder compiler rewrites these fragments into the global model
//! (`c[i,j,k,l]` becomes `c2[vt[i,j,k,l]]`, domains are re-bound to the
//! per-component flow sets), so the grammar kept here is exactly the subset
//! the rewriting understands.

use crate::error::{OnraError, OnraResult};
use crate::topology::CompId;
use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::HashMap;
use tracing::warn;

const VAR: &str = r"[a-zA-Z0-9_]+";

static VAR_INSET: Lazy<Regex> =
    Lazy::new(|| Regex::new(&format!("({VAR}) in ({VAR})")).unwrap());

/// The domain part of a set or constraint: `var in Set` bindings plus an
/// optional condition after `:`.
#[derive(Debug, Clone)]
pub struct Domain {
    /// The text before the `:`.
    pub domain: String,
    /// The condition after the `:`, if any.
    pub cond: Option<String>,
    /// `(var, set)` bindings in source order.
    pub var_inset: Vec<(String, String)>,
}

impl Domain {
    pub fn parse(txt: &str) -> OnraResult<Domain> {
        let parts: Vec<&str> = txt.splitn(3, ':').collect();
        let (domain, cond) = match parts.as_slice() {
            [d] => (d.trim().to_string(), None),
            [d, c] => (d.trim().to_string(), Some(c.trim().to_string())),
            _ => {
                return Err(OnraError::Parse(format!("SYNTAX ERROR: {txt}")));
            }
        };
        let var_inset = VAR_INSET
            .captures_iter(&domain)
            .map(|c| (c[1].to_string(), c[2].to_string()))
            .collect();
        Ok(Domain {
            domain,
            cond,
            var_inset,
        })
    }

    pub fn has_var_inset(&self) -> bool {
        !self.var_inset.is_empty()
    }
}

/// A 4-index subscript list, e.g. `i, j + 1, k, j + 1`.
#[derive(Debug, Clone)]
pub struct VarDim4 {
    pub index: Vec<String>,
}

impl VarDim4 {
    pub fn parse(txt: &str) -> OnraResult<VarDim4> {
        let index: Vec<String> = txt.split(',').map(|s| s.trim().to_string()).collect();
        if index.len() != 4 {
            return Err(OnraError::Parse(format!(
                "SYNTAX ERROR (must have 4 index): {txt}"
            )));
        }
        let checks = [
            (0, &["i"][..], "1st index must be i"),
            (1, &["j"][..], "2nd index must be j"),
            (2, &["k"][..], "3rd index must be k"),
            (3, &["l", "j"][..], "4th index must be l or j"),
        ];
        for (pos, starts, msg) in checks {
            if !starts.iter().any(|s| index[pos].starts_with(s)) {
                return Err(OnraError::Parse(format!("SYNTAX ERROR ({msg}): {txt}")));
            }
        }
        Ok(VarDim4 { index })
    }

    /// The subscript shape with offsets stripped: `i,j,k,l` or `i,j,k,j`.
    pub fn to_type(&self) -> &'static str {
        if self.index[3].starts_with('l') {
            "i,j,k,l"
        } else {
            "i,j,k,j"
        }
    }

    pub fn to_text(&self) -> String {
        self.index.join(", ")
    }
}

/// A `sum{...} c[...] op n` constraint body.
#[derive(Debug, Clone)]
pub struct SumCond {
    pub domain: Domain,
    pub var_c: VarDim4,
    pub op: String,
    pub num: i64,
}

/// A `c[...] op (n | c[...])` constraint body.
#[derive(Debug, Clone)]
pub struct VarCond {
    pub org: String,
    pub c_left: VarDim4,
    pub op: String,
    pub c_right: Option<VarDim4>,
    pub num_right: i64,
}

/// A constraint body.
#[derive(Debug, Clone)]
pub enum StBody {
    Sum(SumCond),
    Var(VarCond),
}

static SET_STATEMENT: Lazy<Regex> =
    Lazy::new(|| Regex::new(&format!(r"set +({VAR}) *:= *\{{([^{{}}]+)\}};")).unwrap());
static NUMS_ONLY: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[0-9, ]+$").unwrap());
static ST_STATEMENT: Lazy<Regex> =
    Lazy::new(|| Regex::new(&format!(r"s\.t\. +({VAR}) *\{{([^{{}}]+)\}} *: *(.+);")).unwrap());
static SUMCOND_STATEMENT: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"sum *\{([^{}]+)\} *c\[([^\[\]]+)\] *([<>=]+) *([0-9]+)").unwrap());
static VARCOND_STATEMENT: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"c\[([^\[\]]+)\] *([<>=]+) *([0-9]+|c\[([^\[\]]+)\])").unwrap());

/// A `set Name := {...};` definition.
#[derive(Debug, Clone)]
pub struct SetDef {
    pub name: String,
    pub setdef: String,
    /// Numeric members, when the body is a plain number list.
    pub nums: Option<Vec<u32>>,
    /// Domain, when the body is symbolic.
    pub domain: Option<Domain>,
}

impl SetDef {
    fn from_caps(caps: &regex::Captures) -> OnraResult<SetDef> {
        let name = caps[1].to_string();
        let setdef: String = caps[2]
            .chars()
            .filter(|c| !matches!(c, '\t' | '\r' | '\n'))
            .collect();
        if NUMS_ONLY.is_match(&setdef) {
            let nums = setdef
                .split(',')
                .map(|s| {
                    s.trim().parse::<u32>().map_err(|e| {
                        OnraError::Parse(format!("invalid set member '{s}': {e}"))
                    })
                })
                .collect::<OnraResult<Vec<u32>>>()?;
            Ok(SetDef {
                name,
                setdef,
                nums: Some(nums),
                domain: None,
            })
        } else {
            let domain = Domain::parse(&setdef)?;
            Ok(SetDef {
                name,
                setdef,
                nums: None,
                domain: Some(domain),
            })
        }
    }
}

/// A `s.t. name{domain} : body;` constraint.
#[derive(Debug, Clone)]
pub struct StDef {
    pub org: String,
    pub name: String,
    pub domain: Domain,
    pub body_org: String,
    pub body: StBody,
}

impl StDef {
    fn from_caps(caps: &regex::Captures) -> OnraResult<StDef> {
        let body_org = caps[3].to_string();
        let body = if body_org.contains("sum") {
            let m = SUMCOND_STATEMENT.captures(&body_org).ok_or_else(|| {
                OnraError::Parse(format!("SYNTAX ERROR (or not supported format): {body_org}"))
            })?;
            StBody::Sum(SumCond {
                domain: Domain::parse(&m[1])?,
                var_c: VarDim4::parse(&m[2])?,
                op: m[3].to_string(),
                num: m[4].parse().unwrap_or(0),
            })
        } else {
            let m = VARCOND_STATEMENT.captures(&body_org).ok_or_else(|| {
                OnraError::Parse(format!("SYNTAX ERROR (or not supported format): {body_org}"))
            })?;
            let right = m[3].to_string();
            let (c_right, num_right) = if right.starts_with('c') {
                (Some(VarDim4::parse(&m[4])?), 0)
            } else {
                (None, right.parse().unwrap_or(0))
            };
            StBody::Var(VarCond {
                org: body_org.clone(),
                c_left: VarDim4::parse(&m[1])?,
                op: m[2].to_string(),
                c_right,
                num_right,
            })
        };
        Ok(StDef {
            org: caps[0].to_string(),
            name: caps[1].to_string(),
            domain: Domain::parse(&caps[2])?,
            body_org,
            body,
        })
    }
}

/// A parsed constraint fragment (one `ac/*.model` file or `GLPK` field).
#[derive(Debug, Clone)]
pub struct Glpk {
    pub text: String,
    pub setdefs: HashMap<String, SetDef>,
    pub stdefs: Vec<StDef>,
}

impl Glpk {
    pub fn parse(txt: &str) -> OnraResult<Glpk> {
        let mut setdefs = HashMap::new();
        for caps in SET_STATEMENT.captures_iter(txt) {
            let def = SetDef::from_caps(&caps)?;
            setdefs.insert(def.name.clone(), def);
        }
        let mut stdefs = Vec::new();
        for caps in ST_STATEMENT.captures_iter(txt) {
            stdefs.push(StDef::from_caps(&caps)?);
        }
        Ok(Glpk {
            text: txt.to_string(),
            setdefs,
            stdefs,
        })
    }

    /// The effective domain of a constraint: an `AvailableConnection` domain
    /// expands to the full 4-index binding.
    pub fn effective_domain(&self, st: &StDef) -> OnraResult<Domain> {
        if st.domain.domain == "AvailableConnection" {
            Domain::parse("i in InputPort, j in Channels, k in OutputPort, l in Channels : j = l")
        } else {
            Ok(st.domain.clone())
        }
    }
}

/// A constraint model shared by the components declaring the same model
/// name.
#[derive(Debug, Clone)]
pub struct ModelGroup {
    pub name: String,
    pub glpk: Glpk,
    pub comps: Vec<CompId>,
    /// Whether any member carries an intermediate controller (the model is
    /// solvec eligible).
    pub hascon: bool,
}

impl ModelGroup {
    pub fn new(name: &str, glpk: Glpk) -> ModelGroup {
        ModelGroup {
            name: name.to_string(),
            glpk,
            comps: Vec::new(),
            hascon: false,
        }
    }

    pub fn add_component(&mut self, id: CompId, comp_name: &str, has_controller: bool) {
        self.comps.push(id);
        if has_controller {
            self.hascon = true;
        } else if self.hascon {
            // Members of one model should agree on controller presence.
            warn!("invalid Controller Model={} comp={}", self.name, comp_name);
        }
    }
}
