use tracing::info;

/// Collaborator receiving end-of-batch reports.
///
/// The production deployment plugs an SMTP relay in here; the control plane itself only
/// depends on the capability.
pub trait Notifier: Send + Sync {
    fn notify(&self, subject: &str, html_body: &str);
}

/// [`Notifier`] that writes report bodies to the log. Stands in wherever a mail relay is
/// not wired up - local runs, back-tests, and tests.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogNotifier;

impl Notifier for LogNotifier {
    fn notify(&self, subject: &str, html_body: &str) {
        info!(subject, body = html_body, "notification");
    }
}
