// src/version/mod.rs

//! Version handling for package requirements
//!
//! Packages carry an epoch:version-release triple (EVR). Versions and releases
//! are compared segment by segment the way RPM does it: numeric runs compare
//! numerically, alphabetic runs lexically, numbers sort after letters and a
//! `~` sorts before everything (pre-release marker).

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

/// A parsed epoch:version-release
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Evr {
    pub epoch: u64,
    pub version: String,
    pub release: Option<String>,
}

impl Evr {
    pub fn new(epoch: u64, version: impl Into<String>, release: Option<String>) -> Self {
        Self {
            epoch,
            version: version.into(),
            release,
        }
    }

    /// Parse `[epoch:]version[-release]`
    ///
    /// The release is everything after the last dash, so `1.0-rc1-2` gives
    /// version `1.0-rc1` and release `2`.
    pub fn parse(s: &str) -> Result<Self> {
        let s = s.trim();
        let (epoch, rest) = match s.split_once(':') {
            Some(("", rest)) => (0, rest),
            Some((e, rest)) => {
                let epoch = e.parse::<u64>().map_err(|err| {
                    Error::ParseError(format!("Invalid epoch in version '{}': {}", s, err))
                })?;
                (epoch, rest)
            }
            None => (0, s),
        };

        let (version, release) = match rest.rsplit_once('-') {
            Some((v, r)) if !r.is_empty() => (v, Some(r.to_string())),
            _ => (rest, None),
        };

        if version.is_empty() {
            return Err(Error::ParseError(format!(
                "Empty version component in '{}'",
                s
            )));
        }

        Ok(Self::new(epoch, version, release))
    }

    /// Compare epoch and version only
    pub fn cmp_version(&self, other: &Evr) -> Ordering {
        self.epoch
            .cmp(&other.epoch)
            .then_with(|| vercmp(&self.version, &other.version))
    }
}

impl Ord for Evr {
    fn cmp(&self, other: &Self) -> Ordering {
        self.cmp_version(other).then_with(|| match (&self.release, &other.release) {
            (Some(a), Some(b)) => vercmp(a, b),
            (a, b) => a.is_some().cmp(&b.is_some()),
        })
    }
}

impl PartialOrd for Evr {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Display for Evr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.epoch > 0 {
            write!(f, "{}:", self.epoch)?;
        }
        write!(f, "{}", self.version)?;
        if let Some(ref release) = self.release {
            write!(f, "-{}", release)?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Segment<'a> {
    Tilde,
    Numeric(&'a str),
    Alpha(&'a str),
}

fn segments(s: &str) -> Vec<Segment<'_>> {
    let bytes = s.as_bytes();
    let mut out = Vec::new();
    let mut i = 0;

    while i < bytes.len() {
        let c = bytes[i];
        if c == b'~' {
            out.push(Segment::Tilde);
            i += 1;
        } else if c.is_ascii_digit() {
            let start = i;
            while i < bytes.len() && bytes[i].is_ascii_digit() {
                i += 1;
            }
            out.push(Segment::Numeric(&s[start..i]));
        } else if c.is_ascii_alphabetic() {
            let start = i;
            while i < bytes.len() && bytes[i].is_ascii_alphabetic() {
                i += 1;
            }
            out.push(Segment::Alpha(&s[start..i]));
        } else {
            i += 1;
        }
    }

    out
}

/// Compare two version (or release) strings segment by segment
pub fn vercmp(a: &str, b: &str) -> Ordering {
    if a == b {
        return Ordering::Equal;
    }

    let left = segments(a);
    let right = segments(b);
    let mut i = 0;

    loop {
        match (left.get(i), right.get(i)) {
            (None, None) => return Ordering::Equal,
            (Some(Segment::Tilde), Some(Segment::Tilde)) => {}
            (Some(Segment::Tilde), _) => return Ordering::Less,
            (_, Some(Segment::Tilde)) => return Ordering::Greater,
            (None, Some(_)) => return Ordering::Less,
            (Some(_), None) => return Ordering::Greater,
            (Some(Segment::Numeric(x)), Some(Segment::Numeric(y))) => {
                let x = x.trim_start_matches('0');
                let y = y.trim_start_matches('0');
                let ord = x.len().cmp(&y.len()).then_with(|| x.cmp(y));
                if ord != Ordering::Equal {
                    return ord;
                }
            }
            (Some(Segment::Alpha(x)), Some(Segment::Alpha(y))) => {
                let ord = x.cmp(y);
                if ord != Ordering::Equal {
                    return ord;
                }
            }
            (Some(Segment::Numeric(_)), Some(Segment::Alpha(_))) => return Ordering::Greater,
            (Some(Segment::Alpha(_)), Some(Segment::Numeric(_))) => return Ordering::Less,
        }
        i += 1;
    }
}

/// Relation a requirement imposes on the providing version
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Comparator {
    Eq,
    Ge,
    Le,
    Gt,
    Lt,
    /// No version constraint
    #[default]
    #[serde(alias = "NONE")]
    Any,
}

impl Comparator {
    /// Whether `candidate.cmp(required)` satisfies this comparator
    pub fn accepts(&self, ordering: Ordering) -> bool {
        match self {
            Comparator::Eq => ordering == Ordering::Equal,
            Comparator::Ge => ordering != Ordering::Less,
            Comparator::Le => ordering != Ordering::Greater,
            Comparator::Gt => ordering == Ordering::Greater,
            Comparator::Lt => ordering == Ordering::Less,
            Comparator::Any => true,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Comparator::Eq => "EQ",
            Comparator::Ge => "GE",
            Comparator::Le => "LE",
            Comparator::Gt => "GT",
            Comparator::Lt => "LT",
            Comparator::Any => "ANY",
        }
    }

    /// Operator form used when printing requirements
    pub fn symbol(&self) -> &'static str {
        match self {
            Comparator::Eq => "=",
            Comparator::Ge => ">=",
            Comparator::Le => "<=",
            Comparator::Gt => ">",
            Comparator::Lt => "<",
            Comparator::Any => "",
        }
    }
}

impl FromStr for Comparator {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_uppercase().as_str() {
            "EQ" | "=" | "==" => Ok(Comparator::Eq),
            "GE" | ">=" => Ok(Comparator::Ge),
            "LE" | "<=" => Ok(Comparator::Le),
            "GT" | ">" => Ok(Comparator::Gt),
            "LT" | "<" => Ok(Comparator::Lt),
            "" | "ANY" | "NONE" => Ok(Comparator::Any),
            other => Err(Error::ParseError(format!("Unknown comparator '{}'", other))),
        }
    }
}

impl fmt::Display for Comparator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
