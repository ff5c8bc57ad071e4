//! Props types shared by the integration suites

use bfdb::BfNodeProps;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Person {
    pub name: String,
    pub email: String,
}

impl BfNodeProps for Person {
    const CLASS_NAME: &'static str = "BfPerson";
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Org {
    pub name: String,
}

impl BfNodeProps for Org {
    const CLASS_NAME: &'static str = "BfOrganization";
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Project {
    pub title: String,
    #[serde(default)]
    pub archived: bool,
}

impl BfNodeProps for Project {
    const CLASS_NAME: &'static str = "BfProject";
}

pub fn person(name: &str) -> Person {
    Person {
        name: name.to_string(),
        email: format!("{}@example.com", name.to_lowercase()),
    }
}

pub fn org(name: &str) -> Org {
    Org {
        name: name.to_string(),
    }
}

pub fn project(title: &str) -> Project {
    Project {
        title: title.to_string(),
        archived: false,
    }
}
