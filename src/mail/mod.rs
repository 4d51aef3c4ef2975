/*!
 * Mail Module
 * Shared SMTP transport, templated single sends and batched bulk fan-out
 */
pub mod templates;

use lettre::{
    message::header::ContentType,
    transport::smtp::authentication::Credentials,
    AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor,
};
use std::time::Duration;
use tokio::sync::OnceCell;

use templates::Template;

/// Recipients per bulk batch.
pub const BULK_BATCH_SIZE: usize = 200;

/// Pause between bulk batches.
pub const BULK_BATCH_DELAY: Duration = Duration::from_millis(1000);

static TRANSPORT: OnceCell<AsyncSmtpTransport<Tokio1Executor>> = OnceCell::const_new();
static FROM_ADDRESS: OnceCell<String> = OnceCell::const_new();

#[derive(Debug, Clone)]
pub struct MailConfig {
    pub host: String,
    pub port: u16,
    pub user: String,
    pub pass: String,
    pub from: String,
}

impl Default for MailConfig {
    fn default() -> Self {
        let user = std::env::var("MAIL_USER").unwrap_or_default();
        Self {
            host: std::env::var("MAIL_HOST").unwrap_or_else(|_| "smtp.gmail.com".to_string()),
            port: std::env::var("MAIL_PORT")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(587),
            pass: std::env::var("MAIL_PASS").unwrap_or_default(),
            from: std::env::var("MAIL_FROM").unwrap_or_else(|_| user.clone()),
            user,
        }
    }
}

/// Build the process-wide SMTP handle and verify it once. A failed
/// verification is logged; sends will report their own failures.
pub async fn init_transport(config: Option<MailConfig>) {
    let config = config.unwrap_or_default();

    if config.user.is_empty() {
        tracing::warn!("MAIL_USER not set. Outbound email is disabled.");
        return;
    }

    let builder = if config.port == 465 {
        AsyncSmtpTransport::<Tokio1Executor>::relay(&config.host)
    } else {
        AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&config.host)
    };

    let transport = match builder {
        Ok(b) => b
            .port(config.port)
            .credentials(Credentials::new(config.user.clone(), config.pass.clone()))
            .build(),
        Err(e) => {
            tracing::error!("Failed to configure mail transport: {}", e);
            return;
        }
    };

    match transport.test_connection().await {
        Ok(true) => tracing::info!("Mail server is ready to send messages"),
        Ok(false) => tracing::warn!("Mail server connection test failed"),
        Err(e) => tracing::warn!("Mail server connection failed: {}", e),
    }

    let _ = TRANSPORT.set(transport);
    let _ = FROM_ADDRESS.set(config.from);
}

/// Outcome of one delivery attempt. send() never propagates an error past
/// its own boundary so a failed notification cannot abort the surrounding
/// business operation.
#[derive(Debug, Clone)]
pub struct MailOutcome {
    pub success: bool,
    pub message_id: Option<String>,
}

impl MailOutcome {
    fn failed() -> Self {
        Self {
            success: false,
            message_id: None,
        }
    }
}

/// Render `template` and deliver it to `to`.
pub async fn send(to: &str, subject: &str, template: Template) -> MailOutcome {
    let transport = match TRANSPORT.get() {
        Some(t) => t,
        None => {
            tracing::warn!(
                template = template.name(),
                "Email sending skipped: transport not initialized"
            );
            return MailOutcome::failed();
        }
    };

    let from = FROM_ADDRESS.get().cloned().unwrap_or_default();
    let from_header = format!("{} <{}>", templates::SITE_NAME, from);

    let message = Message::builder()
        .from(match from_header.parse() {
            Ok(m) => m,
            Err(e) => {
                tracing::error!("Invalid From address {:?}: {}", from, e);
                return MailOutcome::failed();
            }
        })
        .to(match to.parse() {
            Ok(m) => m,
            Err(e) => {
                tracing::warn!("Invalid recipient address {:?}: {}", to, e);
                return MailOutcome::failed();
            }
        })
        .subject(subject)
        .header(ContentType::TEXT_HTML)
        .body(template.render());

    let message = match message {
        Ok(m) => m,
        Err(e) => {
            tracing::error!("Failed to build email message: {}", e);
            return MailOutcome::failed();
        }
    };

    match transport.send(message).await {
        Ok(response) => {
            let message_id = Some(response.code().to_string());
            tracing::info!(
                template = template.name(),
                to = to,
                "Mail sent"
            );
            MailOutcome {
                success: true,
                message_id,
            }
        }
        Err(e) => {
            tracing::error!(template = template.name(), to = to, "Email sending failed: {}", e);
            MailOutcome::failed()
        }
    }
}

/// Tally of a bulk fan-out.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct BulkReport {
    pub attempted: usize,
    pub delivered: usize,
    pub batches: usize,
}

/// Dispatch one send per recipient in fixed-size batches. Sends inside a
/// batch run concurrently and are all awaited to settlement; a bounce never
/// stops its batch. Batches run sequentially with `delay` between them to
/// respect transport throughput limits. No retry of failures.
///
/// Generic over the per-recipient sender so the fan-out shape can be tested
/// without a live transport.
pub async fn send_bulk<F, Fut>(
    recipients: &[String],
    batch_size: usize,
    delay: Duration,
    send_one: F,
) -> BulkReport
where
    F: Fn(String) -> Fut,
    Fut: std::future::Future<Output = MailOutcome>,
{
    let mut report = BulkReport::default();
    if recipients.is_empty() || batch_size == 0 {
        return report;
    }

    let total_batches = recipients.len().div_ceil(batch_size);

    for (index, batch) in recipients.chunks(batch_size).enumerate() {
        tracing::info!(
            "Dispatching mail batch {} of {} ({} recipients)",
            index + 1,
            total_batches,
            batch.len()
        );

        let results = futures::future::join_all(batch.iter().cloned().map(&send_one)).await;

        report.batches += 1;
        report.attempted += results.len();
        report.delivered += results.iter().filter(|o| o.success).count();

        if index + 1 < total_batches {
            tokio::time::sleep(delay).await;
        }
    }

    if report.delivered < report.attempted {
        tracing::warn!(
            "Bulk send finished with {} of {} deliveries failed",
            report.attempted - report.delivered,
            report.attempted
        );
    }

    report
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    fn recipients(n: usize) -> Vec<String> {
        (0..n).map(|i| format!("user{}@example.com", i)).collect()
    }

    #[tokio::test]
    async fn test_send_without_transport_reports_failure() {
        let outcome = send(
            "nobody@example.com",
            "subject",
            Template::NewsletterWelcome,
        )
        .await;
        assert!(!outcome.success);
        assert!(outcome.message_id.is_none());
    }

    #[tokio::test]
    async fn test_bulk_250_recipients_runs_two_batches() {
        let calls = Arc::new(AtomicUsize::new(0));
        let calls_clone = calls.clone();

        let report = send_bulk(&recipients(250), 200, Duration::ZERO, move |_to| {
            let calls = calls_clone.clone();
            async move {
                calls.fetch_add(1, Ordering::SeqCst);
                MailOutcome {
                    success: true,
                    message_id: None,
                }
            }
        })
        .await;

        assert_eq!(report.batches, 2);
        assert_eq!(report.attempted, 250);
        assert_eq!(report.delivered, 250);
        assert_eq!(calls.load(Ordering::SeqCst), 250);
    }

    #[tokio::test]
    async fn test_bulk_failures_do_not_stop_the_batch() {
        let calls = Arc::new(AtomicUsize::new(0));
        let calls_clone = calls.clone();

        let report = send_bulk(&recipients(250), 200, Duration::ZERO, move |_to| {
            let calls = calls_clone.clone();
            async move {
                let n = calls.fetch_add(1, Ordering::SeqCst);
                // Every third delivery bounces.
                MailOutcome {
                    success: n % 3 != 0,
                    message_id: None,
                }
            }
        })
        .await;

        assert_eq!(report.attempted, 250);
        assert_eq!(calls.load(Ordering::SeqCst), 250);
        assert!(report.delivered < report.attempted);
    }

    #[tokio::test]
    async fn test_bulk_exact_batch_boundary() {
        let report = send_bulk(&recipients(400), 200, Duration::ZERO, |_to| async {
            MailOutcome {
                success: true,
                message_id: None,
            }
        })
        .await;
        assert_eq!(report.batches, 2);
        assert_eq!(report.attempted, 400);
    }

    #[tokio::test]
    async fn test_bulk_empty_recipients_is_a_noop() {
        let report = send_bulk(&[], 200, Duration::ZERO, |_to| async {
            MailOutcome {
                success: true,
                message_id: None,
            }
        })
        .await;
        assert_eq!(report, BulkReport::default());
    }
}
