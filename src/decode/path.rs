//! Fixed nested paths into loosely-shaped JSON documents.

use serde_json::Value;
use std::fmt;

/// One step of a nested path.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    Key(&'static str),
    Index(usize),
}

use Step::{Index, Key};

/// `results[0].result.data.dsr.DS[0].SH[0].DM1`
pub const YEAR_ITEMS: &[Step] = &[
    Key("results"),
    Index(0),
    Key("result"),
    Key("data"),
    Key("dsr"),
    Key("DS"),
    Index(0),
    Key("SH"),
    Index(0),
    Key("DM1"),
];

/// `results[0].result.data.dsr.DS[0].ValueDicts.D0`
pub const MONTH_LABELS: &[Step] = &[
    Key("results"),
    Index(0),
    Key("result"),
    Key("data"),
    Key("dsr"),
    Key("DS"),
    Index(0),
    Key("ValueDicts"),
    Key("D0"),
];

/// `results[0].result.data.dsr.DS[0].PH[0].DM0`
pub const MONTH_ENTRIES: &[Step] = &[
    Key("results"),
    Index(0),
    Key("result"),
    Key("data"),
    Key("dsr"),
    Key("DS"),
    Index(0),
    Key("PH"),
    Index(0),
    Key("DM0"),
];

/// Route literal inside a query request body.
pub const ROUTE_LITERAL: &[Step] = &[
    Key("queries"),
    Index(0),
    Key("Query"),
    Key("Commands"),
    Index(0),
    Key("SemanticQueryDataShapeCommand"),
    Key("Query"),
    Key("Where"),
    Index(0),
    Key("Condition"),
    Key("In"),
    Key("Values"),
    Index(0),
    Index(0),
    Key("Literal"),
];

/// Walk `path`; any missing key, wrong container kind or bad index yields `None`.
pub fn lookup<'a>(value: &'a Value, path: &[Step]) -> Option<&'a Value> {
    let mut cur = value;
    for step in path {
        cur = match step {
            Key(k) => cur.as_object()?.get(*k)?,
            Index(i) => cur.as_array()?.get(*i)?,
        };
    }
    Some(cur)
}

/// Mutable counterpart of [`lookup`].
pub fn lookup_mut<'a>(value: &'a mut Value, path: &[Step]) -> Option<&'a mut Value> {
    let mut cur = value;
    for step in path {
        cur = match step {
            Key(k) => cur.as_object_mut()?.get_mut(*k)?,
            Index(i) => cur.as_array_mut()?.get_mut(*i)?,
        };
    }
    Some(cur)
}

/// Renders a path the way it reads in the JSON, e.g. `results[0].result`.
pub struct Display<'a>(pub &'a [Step]);

impl fmt::Display for Display<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (n, step) in self.0.iter().enumerate() {
            match step {
                Key(k) if n == 0 => write!(f, "{}", k)?,
                Key(k) => write!(f, ".{}", k)?,
                Index(i) => write!(f, "[{}]", i)?,
            }
        }
        Ok(())
    }
}
