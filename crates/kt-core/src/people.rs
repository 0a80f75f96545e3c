//! # People
//!
//! Agents, drivers, staff and freelance agents: everyone a payment can be
//! made to.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::ValidationError;
use crate::payment::Recipient;
use crate::validation::validate_required;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PersonKind {
    Agent,
    Driver,
    Staff,
    FreelancerAgent,
}

impl PersonKind {
    pub const fn as_str(&self) -> &'static str {
        match self {
            PersonKind::Agent => "agent",
            PersonKind::Driver => "driver",
            PersonKind::Staff => "staff",
            PersonKind::FreelancerAgent => "freelancer_agent",
        }
    }
}

impl fmt::Display for PersonKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PersonKind {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "agent" => Ok(PersonKind::Agent),
            "driver" => Ok(PersonKind::Driver),
            "staff" => Ok(PersonKind::Staff),
            "freelancer_agent" => Ok(PersonKind::FreelancerAgent),
            _ => Err(ValidationError::not_allowed("kind", &Recipient::KINDS)),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Person {
    pub id: String,
    pub kind: PersonKind,
    pub name: String,
}

impl Person {
    pub fn new(kind: PersonKind, name: impl Into<String>) -> Self {
        Person {
            id: Uuid::new_v4().to_string(),
            kind,
            name: name.into(),
        }
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        validate_required("name", &self.name, 100)
    }

    /// This person as a payment recipient.
    pub fn as_recipient(&self) -> Recipient {
        let id = self.id.clone();
        match self.kind {
            PersonKind::Agent => Recipient::Agent(id),
            PersonKind::Driver => Recipient::Driver(id),
            PersonKind::Staff => Recipient::Staff(id),
            PersonKind::FreelancerAgent => Recipient::FreelancerAgent(id),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_recipient_tag_matches_kind() {
        for kind in [
            PersonKind::Agent,
            PersonKind::Driver,
            PersonKind::Staff,
            PersonKind::FreelancerAgent,
        ] {
            let person = Person::new(kind, "Gabor");
            assert_eq!(person.as_recipient().kind(), kind.as_str());
            assert_eq!(kind.as_str().parse::<PersonKind>().unwrap(), kind);
        }
    }
}
