//! Maintainer sets, parsed from a `MAINTAINERS` file or synthesised from
//! team membership.

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::OnceLock;

use crate::error::LgtmError;
use crate::model::types::Member;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Person {
    pub login: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub name: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub email: String,
}

impl Person {
    pub fn from_login(login: impl Into<String>) -> Self {
        Self {
            login: login.into(),
            name: String::new(),
            email: String::new(),
        }
    }
}

/// Authorized approvers keyed by login. Logins are case-sensitive.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct MaintainerSet {
    pub people: BTreeMap<String, Person>,
}

#[derive(Debug, Default, Deserialize)]
struct MaintainersFile {
    #[serde(default)]
    people: BTreeMap<String, PersonEntry>,
}

#[derive(Debug, Default, Deserialize)]
struct PersonEntry {
    #[serde(default)]
    name: String,
    #[serde(default)]
    email: String,
    login: Option<String>,
}

fn full_line() -> &'static Regex {
    static FULL_LINE: OnceLock<Regex> = OnceLock::new();
    FULL_LINE.get_or_init(|| {
        Regex::new(r"^(.+?)\s*<([^>]*)>\s*\(@([A-Za-z0-9][A-Za-z0-9_.-]*)\)$")
            .expect("maintainer line pattern is valid")
    })
}

fn bare_login() -> &'static Regex {
    static BARE_LOGIN: OnceLock<Regex> = OnceLock::new();
    BARE_LOGIN.get_or_init(|| {
        Regex::new(r"^@?([A-Za-z0-9][A-Za-z0-9_.-]*)$")
            .expect("bare login pattern is valid")
    })
}

impl MaintainerSet {
    /// Parse a `MAINTAINERS` file.
    ///
    /// TOML files with `[people.<login>]` tables are read as such; anything
    /// else is read line by line.
    pub fn parse(data: &[u8]) -> Result<Self, LgtmError> {
        let text = std::str::from_utf8(data).map_err(|e| {
            LgtmError::MaintainersError(format!("Error parsing MAINTAINERS file. {}", e))
        })?;

        match toml::from_str::<MaintainersFile>(text) {
            Ok(file) if !file.people.is_empty() => Ok(Self::from_toml(file)),
            _ => Ok(Self::from_lines(text)),
        }
    }

    fn from_toml(file: MaintainersFile) -> Self {
        let mut people = BTreeMap::new();
        for (key, entry) in file.people {
            let login = entry.login.filter(|l| !l.is_empty()).unwrap_or(key);
            people.insert(
                login.clone(),
                Person {
                    login,
                    name: entry.name,
                    email: entry.email,
                },
            );
        }
        Self { people }
    }

    fn from_lines(text: &str) -> Self {
        let mut people = BTreeMap::new();
        for line in text.lines() {
            if let Some(person) = parse_line(line) {
                people.insert(person.login.clone(), person);
            }
        }
        Self { people }
    }

    pub fn from_members(members: &[Member]) -> Self {
        let people = members
            .iter()
            .map(|m| (m.login.clone(), Person::from_login(m.login.clone())))
            .collect();
        Self { people }
    }

    pub fn get(&self, login: &str) -> Option<&Person> {
        self.people.get(login)
    }

    pub fn len(&self) -> usize {
        self.people.len()
    }

    pub fn is_empty(&self) -> bool {
        self.people.is_empty()
    }
}

fn parse_line(line: &str) -> Option<Person> {
    let line = line.trim();
    if line.is_empty() || line.starts_with('#') {
        return None;
    }

    if let Some(caps) = full_line().captures(line) {
        return Some(Person {
            name: caps[1].trim().to_string(),
            email: caps[2].trim().to_string(),
            login: caps[3].to_string(),
        });
    }

    bare_login()
        .captures(line)
        .map(|caps| Person::from_login(&caps[1]))
}
