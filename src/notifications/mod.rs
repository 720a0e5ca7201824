//! Email notifications rendered from templates and handed to a transport.
//!
//! Delivery is fire-and-forget: failures are logged and dropped, nothing is
//! retried and no caller ever waits on a send.

use async_trait::async_trait;
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tera::{Context, Tera};
use tokio::task::JoinHandle;
use tracing::{debug, info, instrument, warn};

use crate::config::EmailConfig;
use crate::events::Event;

#[derive(Debug, thiserror::Error)]
pub enum NotificationError {
    #[error("Template error: {0}")]
    Template(#[from] tera::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Mail relay rejected message with status {0}")]
    Rejected(u16),

    #[error("Transport misconfigured: {0}")]
    Misconfigured(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EmailMessage {
    pub from: String,
    pub to: Vec<String>,
    pub subject: String,
    pub text: String,
}

/// Delivers a rendered email.
#[async_trait]
pub trait EmailTransport: Send + Sync {
    async fn send(&self, message: &EmailMessage) -> Result<(), NotificationError>;
}

/// Writes messages to the log instead of sending them.
#[derive(Debug, Default, Clone)]
pub struct LogTransport;

#[async_trait]
impl EmailTransport for LogTransport {
    async fn send(&self, message: &EmailMessage) -> Result<(), NotificationError> {
        info!(
            to = ?message.to,
            subject = %message.subject,
            "email (log transport)\n{}",
            message.text
        );
        Ok(())
    }
}

/// Posts messages as JSON to an HTTP mail relay.
#[derive(Debug, Clone)]
pub struct HttpRelayTransport {
    client: reqwest::Client,
    url: String,
    token: Option<String>,
}

impl HttpRelayTransport {
    pub fn new(
        url: impl Into<String>,
        token: Option<String>,
        timeout: Duration,
    ) -> Result<Self, NotificationError> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            url: url.into(),
            token,
        })
    }
}

#[async_trait]
impl EmailTransport for HttpRelayTransport {
    async fn send(&self, message: &EmailMessage) -> Result<(), NotificationError> {
        let mut request = self.client.post(&self.url).json(message);
        if let Some(token) = &self.token {
            request = request.bearer_auth(token);
        }

        let response = request.send().await?;
        if response.status().is_success() {
            Ok(())
        } else {
            Err(NotificationError::Rejected(response.status().as_u16()))
        }
    }
}

const TEMPLATES: &[(&str, &str)] = &[
    (
        "low_stock.subject",
        "Low stock: {{ sku }} ({{ name }})",
    ),
    (
        "low_stock.body",
        "Stock item {{ sku }} ({{ name }}) is at {{ quantity_on_hand }}, \
at or below its reorder level of {{ reorder_level }}.\n\nPlease raise a replenishment order.\n",
    ),
    (
        "order_confirmation.subject",
        "Order {{ order_number }} confirmed",
    ),
    (
        "order_confirmation.body",
        "Dear {{ customer_name }},\n\nYour order {{ order_number }} has been confirmed \
and is scheduled for delivery by {{ due_date }}.\n\nThank you for your business.\n",
    ),
    (
        "order_overdue.subject",
        "Overdue sales order {{ order_number }}",
    ),
    (
        "order_overdue.body",
        "Sales order {{ order_number }} for {{ customer_name }} was due on {{ due_date }} \
and has not shipped.\n",
    ),
    (
        "maintenance_due.subject",
        "Maintenance due: {{ code }}",
    ),
    (
        "maintenance_due.body",
        "Machine {{ code }} ({{ name }}) is due for maintenance on {{ next_maintenance_date }}.\n\
It will be rejected for new assignments once that date has passed.\n",
    ),
    (
        "quality_nonconformance.subject",
        "Quality nonconformance on {{ order_number }}",
    ),
    (
        "quality_nonconformance.body",
        "{{ quantity }} units were scrapped on work order {{ order_number }} \
(operation {{ sub_work_order_id }}).\
{% if notes %}\n\nNotes: {{ notes }}{% endif %}\n",
    ),
];

/// Turns events into emails and sends them in the background.
pub struct Notifier {
    templates: Tera,
    transport: Arc<dyn EmailTransport>,
    from_address: String,
    operations_recipients: Vec<String>,
}

impl Notifier {
    pub fn new(
        config: &EmailConfig,
        transport: Arc<dyn EmailTransport>,
    ) -> Result<Self, NotificationError> {
        let mut templates = Tera::default();
        templates.add_raw_templates(TEMPLATES.iter().copied())?;

        Ok(Self {
            templates,
            transport,
            from_address: config.from_address.clone(),
            operations_recipients: config.operations_recipients.clone(),
        })
    }

    /// Builds a notifier with the transport named by `config.backend`.
    pub fn from_config(config: &EmailConfig) -> Result<Self, NotificationError> {
        let transport: Arc<dyn EmailTransport> = match config.backend.as_str() {
            "http" => {
                let url = config.relay_url.clone().ok_or_else(|| {
                    NotificationError::Misconfigured("email.relay_url is not set".into())
                })?;
                Arc::new(HttpRelayTransport::new(
                    url,
                    config.relay_token.clone(),
                    Duration::from_secs(config.timeout_secs),
                )?)
            }
            _ => Arc::new(LogTransport),
        };
        Self::new(config, transport)
    }

    /// Renders the email for `event`, or `None` when the event sends no mail
    /// or nobody is listening.
    pub fn compose(&self, event: &Event) -> Result<Option<EmailMessage>, NotificationError> {
        let (template, recipients) = match event {
            Event::LowStock { .. } => ("low_stock", self.operations_recipients.clone()),
            Event::SalesOrderConfirmed { customer_email, .. } => {
                ("order_confirmation", vec![customer_email.clone()])
            }
            Event::SalesOrderOverdue { .. } => {
                ("order_overdue", self.operations_recipients.clone())
            }
            Event::MaintenanceDue { .. } => {
                ("maintenance_due", self.operations_recipients.clone())
            }
            Event::QualityNonconformance { .. } => {
                ("quality_nonconformance", self.operations_recipients.clone())
            }
            Event::WorkOrderCreated { .. } | Event::WorkOrderStatusChanged { .. } => {
                return Ok(None)
            }
        };

        if recipients.is_empty() {
            debug!(event = event.name(), "no recipients configured");
            return Ok(None);
        }

        let context = Context::from_serialize(event)?;
        let subject = self
            .templates
            .render(&format!("{}.subject", template), &context)?;
        let text = self
            .templates
            .render(&format!("{}.body", template), &context)?;

        Ok(Some(EmailMessage {
            from: self.from_address.clone(),
            to: recipients,
            subject,
            text,
        }))
    }

    /// Composes and sends in a detached task. Errors are logged only.
    #[instrument(skip(self, event), fields(event = event.name()))]
    pub fn dispatch(&self, event: &Event) -> Option<JoinHandle<()>> {
        let message = match self.compose(event) {
            Ok(Some(message)) => message,
            Ok(None) => return None,
            Err(e) => {
                warn!(error = %e, "failed to render notification");
                return None;
            }
        };

        let transport = Arc::clone(&self.transport);
        let event_name = event.name();
        Some(tokio::spawn(async move {
            match transport.send(&message).await {
                Ok(()) => {
                    metrics::counter!("manufacturing_erp.notifications.sent", 1);
                    debug!(event = event_name, subject = %message.subject, "notification sent");
                }
                Err(e) => {
                    metrics::counter!("manufacturing_erp.notifications.failed", 1);
                    warn!(event = event_name, error = %e, "notification delivery failed");
                }
            }
        }))
    }
}
