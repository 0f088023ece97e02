use serde::Serialize;
use std::collections::BTreeMap;

use crate::api::contracts::UserRecord;
use crate::error::ClientError;
use crate::types::{Permission, Role};

/// Local, uncommitted role/permission state for one user.
///
/// A permission list only exists under a selected role; deselecting a role
/// drops its list, so re-selecting it starts empty.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RoleDraft {
    roles: Vec<Role>,
    permissions: BTreeMap<Role, Vec<Permission>>,
}

impl RoleDraft {
    /// Seed from the server record. Permission entries for roles the user
    /// does not hold are dropped.
    pub fn from_user(user: &UserRecord) -> Self {
        let mut draft = Self::default();
        for role in &user.roles {
            if draft.roles.contains(role) {
                continue;
            }
            draft.roles.push(*role);
            draft
                .permissions
                .insert(*role, user.permissions_for(*role).to_vec());
        }
        draft
    }

    pub fn roles(&self) -> &[Role] {
        &self.roles
    }

    pub fn is_selected(&self, role: Role) -> bool {
        self.roles.contains(&role)
    }

    pub fn permissions_for(&self, role: Role) -> &[Permission] {
        self.permissions.get(&role).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn has_permission(&self, role: Role, permission: Permission) -> bool {
        self.permissions_for(role).contains(&permission)
    }

    /// Flip role selection. Returns whether the role is now selected.
    pub fn toggle_role(&mut self, role: Role) -> bool {
        if self.is_selected(role) {
            self.roles.retain(|r| *r != role);
            self.permissions.remove(&role);
            false
        } else {
            self.roles.push(role);
            self.permissions.insert(role, Vec::new());
            true
        }
    }

    /// Flip `permission` under `role` only. Returns false without changes
    /// when `role` is not selected.
    pub fn toggle_permission(&mut self, role: Role, permission: Permission) -> bool {
        if !self.is_selected(role) {
            return false;
        }

        let list = self.permissions.entry(role).or_default();
        match list.iter().position(|p| *p == permission) {
            Some(index) => {
                list.remove(index);
            }
            None => list.push(permission),
        }
        true
    }

    /// Idempotent selection. Returns whether anything changed.
    pub fn set_role(&mut self, role: Role, selected: bool) -> bool {
        if self.is_selected(role) == selected {
            return false;
        }
        self.toggle_role(role);
        true
    }

    /// Idempotent grant/revoke. Granting under an unselected role is an
    /// error; revoking there is a no-op.
    pub fn set_permission(
        &mut self,
        role: Role,
        permission: Permission,
        granted: bool,
    ) -> Result<bool, ClientError> {
        if !self.is_selected(role) {
            if granted {
                return Err(ClientError::invalid_input(format!(
                    "cannot grant {} under {}: role is not selected",
                    permission, role
                )));
            }
            return Ok(false);
        }

        if self.has_permission(role, permission) == granted {
            return Ok(false);
        }
        Ok(self.toggle_permission(role, permission))
    }
}
