use async_trait::async_trait;
use std::collections::BTreeMap;
use std::sync::Mutex;

use crate::admin::reconcile::{AccessMutator, Mutation};
use crate::api::contracts::UserRecord;
use crate::error::ClientError;
use crate::session::context::RoleChooser;
use crate::types::{Permission, Role, UserId};

/// Role chooser that always answers with the same role and counts prompts
pub struct FixedChooser {
    answer: Role,
    prompts: Mutex<Vec<Vec<Role>>>,
}

impl FixedChooser {
    pub fn new(answer: Role) -> Self {
        Self {
            answer,
            prompts: Mutex::new(Vec::new()),
        }
    }

    pub fn prompts(&self) -> usize {
        self.prompts.lock().unwrap().len()
    }

    pub fn last_options(&self) -> Vec<Role> {
        self.prompts.lock().unwrap().last().cloned().unwrap_or_default()
    }
}

#[async_trait]
impl RoleChooser for FixedChooser {
    async fn present_choice(&self, options: &[Role]) -> Result<Role, ClientError> {
        self.prompts.lock().unwrap().push(options.to_vec());
        Ok(self.answer)
    }
}

/// Access mutator that records every call, optionally failing the Nth
/// (zero-based) one
pub struct RecordingMutator {
    fail_at: Option<usize>,
    calls: Mutex<Vec<(UserId, Mutation)>>,
}

impl RecordingMutator {
    pub fn new() -> Self {
        Self {
            fail_at: None,
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn failing_at(index: usize) -> Self {
        Self {
            fail_at: Some(index),
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn calls(&self) -> Vec<(UserId, Mutation)> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl AccessMutator for RecordingMutator {
    async fn apply_mutation(&self, user_id: UserId, mutation: &Mutation) -> Result<(), ClientError> {
        let index = {
            let mut calls = self.calls.lock().unwrap();
            calls.push((user_id, mutation.clone()));
            calls.len() - 1
        };

        if self.fail_at == Some(index) {
            return Err(ClientError::http(500, "injected failure"));
        }
        Ok(())
    }
}

/// User record fixture holding `roles` with the given permission map
pub fn user_with(roles: &[Role], permissions: Vec<(Role, Vec<Permission>)>) -> UserRecord {
    UserRecord {
        id: Some(1),
        firstname: "Ada".to_string(),
        lastname: "Lovelace".to_string(),
        email: "ada@example.com".to_string(),
        created_at: "2024-01-01T00:00:00".to_string(),
        updated_at: "2024-01-01T00:00:00".to_string(),
        roles: roles.to_vec(),
        permissions: permissions.into_iter().collect::<BTreeMap<_, _>>(),
        enabled: true,
    }
}
