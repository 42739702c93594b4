//! Notification port trait.

use crate::domain::error::NotifyError;

/// Best-effort text notifications. Callers log failures and carry on.
pub trait Notifier {
    fn notify(&self, text: &str) -> Result<(), NotifyError>;
}
