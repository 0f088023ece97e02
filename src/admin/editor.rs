use thiserror::Error;
use tracing::info;

use crate::admin::draft::RoleDraft;
use crate::admin::reconcile::{self, Mutation, ReconcileError, ReconcilePlan};
use crate::api::contracts::{UpdateUserRequest, UserRecord};
use crate::api::gateway::Gateway;
use crate::api::users;
use crate::error::ClientError;
use crate::session::context::SessionContext;
use crate::types::UserId;

#[derive(Debug, Error)]
pub enum EditorError {
    #[error("Profile update failed: {0}")]
    Profile(#[source] ClientError),

    #[error("Access update failed: {0}")]
    Access(#[from] ReconcileError),
}

/// Outcome of a successful save
#[derive(Debug, Clone)]
pub struct SaveOutcome {
    pub user: UserRecord,
    pub applied: Vec<Mutation>,
}

/// Only managers may edit roles and permissions
pub fn access_editable_for(session: &SessionContext) -> bool {
    session.is_manager()
}

/// Edit state for one user: profile fields plus a role/permission draft
#[derive(Debug, Clone)]
pub struct UserEditor {
    user_id: UserId,
    original: UserRecord,
    draft: RoleDraft,
    access_editable: bool,
    pub firstname: String,
    pub lastname: String,
    pub enabled: bool,
}

impl UserEditor {
    pub fn new(user_id: UserId, original: UserRecord, access_editable: bool) -> Self {
        Self {
            user_id,
            draft: RoleDraft::from_user(&original),
            firstname: original.firstname.clone(),
            lastname: original.lastname.clone(),
            enabled: original.enabled,
            original,
            access_editable,
        }
    }

    pub async fn load(
        gateway: &Gateway,
        user_id: UserId,
        access_editable: bool,
    ) -> Result<Self, ClientError> {
        let user = users::fetch_user(gateway, user_id).await?;
        Ok(Self::new(user_id, user, access_editable))
    }

    pub fn user_id(&self) -> UserId {
        self.user_id
    }

    pub fn original(&self) -> &UserRecord {
        &self.original
    }

    pub fn draft(&self) -> &RoleDraft {
        &self.draft
    }

    /// `None` unless role/permission editing is allowed
    pub fn draft_mut(&mut self) -> Option<&mut RoleDraft> {
        self.access_editable.then_some(&mut self.draft)
    }

    pub fn plan(&self) -> ReconcilePlan {
        ReconcilePlan::compute(&self.original, &self.draft)
    }

    pub fn profile_update(&self) -> UpdateUserRequest {
        UpdateUserRequest {
            firstname: self.firstname.clone(),
            lastname: self.lastname.clone(),
            enabled: self.enabled,
        }
    }

    /// PUT the profile, then reconcile access against the loaded record.
    ///
    /// A failed profile update stops before any access call. The editor is
    /// left untouched either way; reload to diff against fresh server state.
    pub async fn save(&self, gateway: &Gateway) -> Result<SaveOutcome, EditorError> {
        let user = users::update_user(gateway, self.user_id, &self.profile_update())
            .await
            .map_err(EditorError::Profile)?;

        let applied = reconcile::apply(&self.plan(), self.user_id, gateway).await?;
        info!(user_id = self.user_id, mutations = applied.len(), "user saved");

        Ok(SaveOutcome { user, applied })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::user_with;
    use crate::types::{Permission, Role};

    #[test]
    fn read_only_editor_exposes_no_draft() {
        let user = user_with(&[Role::Staff], vec![]);
        let mut editor = UserEditor::new(3, user, false);
        assert!(editor.draft_mut().is_none());
        assert!(editor.plan().is_empty());
    }

    #[test]
    fn editable_draft_feeds_plan() {
        let user = user_with(&[Role::Staff], vec![(Role::Staff, vec![Permission::ViewCoupon])]);
        let mut editor = UserEditor::new(3, user, true);

        let draft = editor.draft_mut().unwrap();
        draft.toggle_permission(Role::Staff, Permission::ViewCoupon);

        assert_eq!(
            editor.plan().operations(),
            vec![Mutation::RemovePermissions {
                role: Role::Staff,
                permissions: vec![Permission::ViewCoupon]
            }]
        );
    }

    #[test]
    fn profile_update_carries_edited_fields() {
        let mut editor = UserEditor::new(3, user_with(&[], vec![]), false);
        editor.firstname = "Grace".into();
        editor.enabled = false;

        let update = editor.profile_update();
        assert_eq!(update.firstname, "Grace");
        assert!(!update.enabled);
    }
}
