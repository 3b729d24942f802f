use serde::{Deserialize, Serialize};

use crate::model::ids::LearnerId;

/// Binary authorization role supplied by the session layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    #[default]
    Student,
    Admin,
}

/// The signed-in account on whose behalf a call is made.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Principal {
    pub learner_id: LearnerId,
    pub role: Role,
}

impl Principal {
    #[must_use]
    pub fn student(learner_id: impl Into<LearnerId>) -> Self {
        Self {
            learner_id: learner_id.into(),
            role: Role::Student,
        }
    }

    #[must_use]
    pub fn admin(learner_id: impl Into<LearnerId>) -> Self {
        Self {
            learner_id: learner_id.into(),
            role: Role::Admin,
        }
    }

    #[must_use]
    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }
}
