// Role/permission reconciliation
//
// Turns (server state, local draft) into the minimal ordered list of
// mutation calls and applies them one at a time. There is no rollback: a
// failing step stops the run and reports what already went through.

use async_trait::async_trait;
use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;
use thiserror::Error;
use tracing::{info, warn};

use crate::admin::draft::RoleDraft;
use crate::api::contracts::UserRecord;
use crate::api::gateway::Gateway;
use crate::api::users;
use crate::error::ClientError;
use crate::types::{Permission, Role, UserId};

/// One batch call against the user's access endpoints
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum Mutation {
    AddRoles { roles: Vec<Role> },
    RemoveRoles { roles: Vec<Role> },
    AddPermissions { role: Role, permissions: Vec<Permission> },
    RemovePermissions { role: Role, permissions: Vec<Permission> },
}

fn join<T: fmt::Display>(items: &[T]) -> String {
    items.iter().map(|i| i.to_string()).collect::<Vec<_>>().join(", ")
}

impl fmt::Display for Mutation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Mutation::AddRoles { roles } => write!(f, "add roles [{}]", join(roles)),
            Mutation::RemoveRoles { roles } => write!(f, "remove roles [{}]", join(roles)),
            Mutation::AddPermissions { role, permissions } => {
                write!(f, "grant {} [{}]", role, join(permissions))
            }
            Mutation::RemovePermissions { role, permissions } => {
                write!(f, "revoke {} [{}]", role, join(permissions))
            }
        }
    }
}

/// Permission changes for one selected role
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PermissionDelta {
    pub role: Role,
    pub to_add: Vec<Permission>,
    pub to_remove: Vec<Permission>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ReconcilePlan {
    pub roles_to_add: Vec<Role>,
    pub roles_to_remove: Vec<Role>,
    /// One entry per draft role with a non-empty delta, in draft order
    pub permission_deltas: Vec<PermissionDelta>,
}

impl ReconcilePlan {
    /// Plan against the record the draft was seeded from
    pub fn compute(original: &UserRecord, draft: &RoleDraft) -> Self {
        Self::between(&original.roles, &original.permissions, draft)
    }

    pub fn between(
        original_roles: &[Role],
        original_permissions: &BTreeMap<Role, Vec<Permission>>,
        draft: &RoleDraft,
    ) -> Self {
        let roles_to_add = difference(draft.roles(), original_roles);
        let roles_to_remove = difference(original_roles, draft.roles());

        // Removed roles are not visited: their permissions go with them
        let permission_deltas = draft
            .roles()
            .iter()
            .filter_map(|role| {
                let wanted = draft.permissions_for(*role);
                let held = original_permissions
                    .get(role)
                    .map(Vec::as_slice)
                    .unwrap_or(&[]);

                let delta = PermissionDelta {
                    role: *role,
                    to_add: difference(wanted, held),
                    to_remove: difference(held, wanted),
                };
                (!delta.to_add.is_empty() || !delta.to_remove.is_empty()).then_some(delta)
            })
            .collect();

        Self {
            roles_to_add,
            roles_to_remove,
            permission_deltas,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.roles_to_add.is_empty()
            && self.roles_to_remove.is_empty()
            && self.permission_deltas.is_empty()
    }

    /// Ordered calls: role additions, role removals, then per role its
    /// grants followed by its revocations. Empty sets produce no call.
    pub fn operations(&self) -> Vec<Mutation> {
        let mut ops = Vec::new();
        if !self.roles_to_add.is_empty() {
            ops.push(Mutation::AddRoles {
                roles: self.roles_to_add.clone(),
            });
        }
        if !self.roles_to_remove.is_empty() {
            ops.push(Mutation::RemoveRoles {
                roles: self.roles_to_remove.clone(),
            });
        }
        for delta in &self.permission_deltas {
            if !delta.to_add.is_empty() {
                ops.push(Mutation::AddPermissions {
                    role: delta.role,
                    permissions: delta.to_add.clone(),
                });
            }
            if !delta.to_remove.is_empty() {
                ops.push(Mutation::RemovePermissions {
                    role: delta.role,
                    permissions: delta.to_remove.clone(),
                });
            }
        }
        ops
    }
}

/// Items of `left` missing from `right`, keeping `left`'s order
fn difference<T: Copy + PartialEq>(left: &[T], right: &[T]) -> Vec<T> {
    left.iter().copied().filter(|item| !right.contains(item)).collect()
}

/// Executes access mutations for a user
#[async_trait]
pub trait AccessMutator: Send + Sync {
    async fn apply_mutation(&self, user_id: UserId, mutation: &Mutation) -> Result<(), ClientError>;
}

#[async_trait]
impl AccessMutator for Gateway {
    async fn apply_mutation(&self, user_id: UserId, mutation: &Mutation) -> Result<(), ClientError> {
        match mutation {
            Mutation::AddRoles { roles } => users::add_roles(self, user_id, roles).await,
            Mutation::RemoveRoles { roles } => users::remove_roles(self, user_id, roles).await,
            Mutation::AddPermissions { role, permissions } => {
                users::add_permissions(self, user_id, *role, permissions).await
            }
            Mutation::RemovePermissions { role, permissions } => {
                users::remove_permissions(self, user_id, *role, permissions).await
            }
        }
    }
}

/// A step failed; earlier steps stay applied
#[derive(Debug, Error)]
#[error("{failed} failed after {} applied step(s): {source}", .applied.len())]
pub struct ReconcileError {
    pub failed: Mutation,
    pub applied: Vec<Mutation>,
    #[source]
    pub source: ClientError,
}

/// Issue the plan's operations sequentially. Returns the applied mutations.
pub async fn apply<M: AccessMutator + ?Sized>(
    plan: &ReconcilePlan,
    user_id: UserId,
    mutator: &M,
) -> Result<Vec<Mutation>, ReconcileError> {
    let mut applied = Vec::new();

    for mutation in plan.operations() {
        match mutator.apply_mutation(user_id, &mutation).await {
            Ok(()) => {
                info!(user_id, %mutation, "access mutation applied");
                applied.push(mutation);
            }
            Err(source) => {
                warn!(user_id, %mutation, error = %source, "access mutation failed");
                return Err(ReconcileError {
                    failed: mutation,
                    applied,
                    source,
                });
            }
        }
    }

    Ok(applied)
}

/// Compute and apply in one step
pub async fn reconcile<M: AccessMutator + ?Sized>(
    mutator: &M,
    user_id: UserId,
    original: &UserRecord,
    draft: &RoleDraft,
) -> Result<Vec<Mutation>, ReconcileError> {
    let plan = ReconcilePlan::compute(original, draft);
    apply(&plan, user_id, mutator).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{user_with, RecordingMutator};
    use Permission::*;
    use Role::*;

    // A=Manager, B=Staff, C=User; x=UploadCsv, y=ViewCoupon, z=RemoveBook,
    // w=GenerateReport, q=AddBookData
    fn original() -> UserRecord {
        user_with(
            &[Manager, Staff],
            vec![(Manager, vec![UploadCsv, ViewCoupon]), (Staff, vec![RemoveBook])],
        )
    }

    fn edited_draft() -> RoleDraft {
        let mut draft = RoleDraft::from_user(&original());
        draft.toggle_role(Staff);
        draft.toggle_role(User);
        draft.toggle_permission(Manager, UploadCsv);
        draft.toggle_permission(Manager, GenerateReport);
        draft.toggle_permission(User, AddBookData);
        draft
    }

    #[test]
    fn plan_is_minimal() {
        let plan = ReconcilePlan::compute(&original(), &edited_draft());

        assert_eq!(
            plan.operations(),
            vec![
                Mutation::AddRoles { roles: vec![User] },
                Mutation::RemoveRoles { roles: vec![Staff] },
                Mutation::AddPermissions { role: Manager, permissions: vec![GenerateReport] },
                Mutation::RemovePermissions { role: Manager, permissions: vec![UploadCsv] },
                Mutation::AddPermissions { role: User, permissions: vec![AddBookData] },
            ]
        );
    }

    #[test]
    fn unchanged_draft_plans_nothing() {
        let user = original();
        let plan = ReconcilePlan::compute(&user, &RoleDraft::from_user(&user));
        assert!(plan.is_empty());
        assert!(plan.operations().is_empty());
    }

    #[test]
    fn removed_role_gets_no_permission_calls() {
        let user = original();
        let mut draft = RoleDraft::from_user(&user);
        draft.toggle_role(Staff);

        let plan = ReconcilePlan::compute(&user, &draft);
        assert_eq!(plan.operations(), vec![Mutation::RemoveRoles { roles: vec![Staff] }]);
    }

    #[test]
    fn re_selected_role_revokes_previous_permissions() {
        let user = original();
        let mut draft = RoleDraft::from_user(&user);
        draft.toggle_role(Staff);
        draft.toggle_role(Staff);

        let plan = ReconcilePlan::compute(&user, &draft);
        assert_eq!(
            plan.operations(),
            vec![Mutation::RemovePermissions { role: Staff, permissions: vec![RemoveBook] }]
        );
    }

    #[tokio::test]
    async fn apply_issues_operations_in_order() {
        let mutator = RecordingMutator::new();
        let plan = ReconcilePlan::compute(&original(), &edited_draft());

        let applied = apply(&plan, 7, &mutator).await.unwrap();
        assert_eq!(applied, plan.operations());
        assert_eq!(mutator.calls(), plan.operations().into_iter().map(|m| (7, m)).collect::<Vec<_>>());
    }

    #[tokio::test]
    async fn apply_stops_at_first_failure_without_rollback() {
        let mutator = RecordingMutator::failing_at(2);
        let plan = ReconcilePlan::compute(&original(), &edited_draft());

        let err = apply(&plan, 7, &mutator).await.unwrap_err();
        assert_eq!(err.failed, Mutation::AddPermissions { role: Manager, permissions: vec![GenerateReport] });
        assert_eq!(err.applied.len(), 2);
        assert_eq!(mutator.calls().len(), 3);
        assert!(err.to_string().starts_with("grant ROLE_MANAGER [GENERATE_REPORT] failed after 2"));
    }

    #[tokio::test]
    async fn empty_plan_makes_no_calls() {
        let mutator = RecordingMutator::new();
        let user = original();
        let applied = reconcile(&mutator, 7, &user, &RoleDraft::from_user(&user)).await.unwrap();
        assert!(applied.is_empty());
        assert!(mutator.calls().is_empty());
    }
}
