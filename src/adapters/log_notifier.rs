//! Notifier that writes messages to the log.

use crate::domain::error::NotifyError;
use crate::ports::notify_port::Notifier;

#[derive(Debug, Default)]
pub struct LogNotifier;

impl Notifier for LogNotifier {
    fn notify(&self, text: &str) -> Result<(), NotifyError> {
        for line in text.lines() {
            log::info!(target: "momtrader::notify", "{line}");
        }
        Ok(())
    }
}
