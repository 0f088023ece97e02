pub mod draft;
pub mod editor;
pub mod reconcile;

pub use draft::RoleDraft;
pub use editor::{access_editable_for, EditorError, SaveOutcome, UserEditor};
pub use reconcile::{apply, reconcile, AccessMutator, Mutation, PermissionDelta, ReconcileError, ReconcilePlan};
