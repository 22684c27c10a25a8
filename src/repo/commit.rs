//! Commit objects and the identity lines inside them.

use std::env;
use std::fmt;
use std::time::{SystemTime, UNIX_EPOCH};

use crate::error::{Error, Result};
use crate::odb::Oid;

const DEFAULT_NAME: &str = "Anon";
const DEFAULT_EMAIL: &str = "anon@example.com";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Signature {
    pub name: String,
    pub email: String,
    pub time: i64,
}

impl Signature {
    /// Identity from a pair of environment variables, falling back to
    /// the anonymous defaults, stamped with the current time.
    pub fn from_env(name_var: &str, email_var: &str) -> Signature {
        Signature {
            name: env::var(name_var).unwrap_or_else(|_| DEFAULT_NAME.into()),
            email: env::var(email_var)
                .unwrap_or_else(|_| DEFAULT_EMAIL.into()),
            time: SystemTime::now()
                .duration_since(UNIX_EPOCH)
                .map(|d| d.as_secs() as i64)
                .unwrap_or(0),
        }
    }

    pub fn author() -> Signature {
        Signature::from_env("GIT_AUTHOR_NAME", "GIT_AUTHOR_EMAIL")
    }

    pub fn committer() -> Signature {
        Signature::from_env("GIT_COMMITTER_NAME", "GIT_COMMITTER_EMAIL")
    }
}

impl fmt::Display for Signature {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{} <{}> {}", self.name, self.email, self.time)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Commit {
    pub tree: Oid,
    pub parents: Vec<Oid>,
    pub author: Signature,
    pub committer: Signature,
    pub message: String,
}

impl Commit {
    pub fn encode(&self) -> Vec<u8> {
        let mut out = String::new();
        out.push_str(&format!("tree {}\n", self.tree));
        for parent in &self.parents {
            out.push_str(&format!("parent {}\n", parent));
        }
        out.push_str(&format!("author {}\n", self.author));
        out.push_str(&format!("committer {}\n", self.committer));
        out.push('\n');
        out.push_str(&self.message);
        out.into_bytes()
    }

    pub fn decode(data: &[u8]) -> Result<Commit> {
        let text = std::str::from_utf8(data)
            .map_err(|_| Error::corrupt("commit is not utf-8"))?;
        let (headers, message) = text
            .split_once("\n\n")
            .ok_or_else(|| Error::corrupt("commit has no message separator"))?;

        let mut tree = None;
        let mut parents = Vec::new();
        let mut author = None;
        let mut committer = None;
        for line in headers.lines() {
            if let Some(hex) = line.strip_prefix("tree ") {
                tree = Some(Oid::from_hex(hex)?);
            } else if let Some(hex) = line.strip_prefix("parent ") {
                parents.push(Oid::from_hex(hex)?);
            } else if let Some(rest) = line.strip_prefix("author ") {
                author = Some(parse_signature(rest)?);
            } else if let Some(rest) = line.strip_prefix("committer ") {
                committer = Some(parse_signature(rest)?);
            } else {
                return Err(Error::corrupt(format!(
                    "unknown commit header {:?}",
                    line
                )));
            }
        }

        Ok(Commit {
            tree: tree.ok_or_else(|| Error::corrupt("commit has no tree"))?,
            parents,
            author: author
                .ok_or_else(|| Error::corrupt("commit has no author"))?,
            committer: committer
                .ok_or_else(|| Error::corrupt("commit has no committer"))?,
            message: message.to_string(),
        })
    }
}

fn parse_signature(s: &str) -> Result<Signature> {
    let parse = || -> Option<Signature> {
        let (rest, time) = s.rsplit_once(' ')?;
        let time = time.parse().ok()?;
        let rest = rest.strip_suffix('>')?;
        let (name, email) = rest.split_once(" <")?;
        Some(Signature {
            name: name.to_string(),
            email: email.to_string(),
            time,
        })
    };
    parse().ok_or_else(|| Error::corrupt(format!("bad signature {:?}", s)))
}
