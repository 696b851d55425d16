//! Notification stage: markdown rendered to HTML and mailed over a
//! STARTTLS session.
//!
//! The message is multipart/related: an HTML alternative plus one inline
//! header image referenced by `cid:header_image`. One fixed recipient.
//! This is the terminal stage, so a failure here affects only reporting,
//! never pipeline state.

use std::path::PathBuf;

use async_trait::async_trait;
use lettre::message::header::ContentType;
use lettre::message::{Attachment, Mailbox, MultiPart, SinglePart};
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};
use pulldown_cmark::{html, Parser};
use tracing::debug;

use crate::config::SmtpConfig;
use crate::error::PipelineError;

use super::Notifier;

pub struct SmtpNotifier {
    config: SmtpConfig,
    header_image_path: PathBuf,
    mailer: AsyncSmtpTransport<Tokio1Executor>,
}

impl SmtpNotifier {
    pub fn new(config: SmtpConfig, header_image_path: PathBuf) -> Result<Self, PipelineError> {
        let mut builder = AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&config.server)
            .map_err(|e| PipelineError::Delivery(e.to_string()))?
            .port(config.port);

        if let (Some(username), Some(password)) = (&config.username, &config.password) {
            builder = builder.credentials(Credentials::new(username.clone(), password.clone()));
        }

        Ok(Self {
            mailer: builder.build(),
            config,
            header_image_path,
        })
    }

    /// Render summary markdown into the email HTML body.
    pub fn render_html(summary_markdown: &str) -> String {
        let mut body = String::new();
        html::push_html(&mut body, Parser::new(summary_markdown));

        format!(
            "<html>\n  <head></head>\n  <body>\n    \
             <img src=\"cid:header_image\" style=\"width: 600px; height: auto;\">\n    \
             {}\n  </body>\n</html>\n",
            body
        )
    }

    fn mailbox(address: &str) -> Result<Mailbox, PipelineError> {
        address
            .parse()
            .map_err(|e| PipelineError::Delivery(format!("bad address '{}': {}", address, e)))
    }
}

#[async_trait]
impl Notifier for SmtpNotifier {
    async fn notify(
        &self,
        summary_markdown: &str,
        subject_title: &str,
    ) -> Result<(), PipelineError> {
        let html_body = Self::render_html(summary_markdown);

        let image = tokio::fs::read(&self.header_image_path)
            .await
            .map_err(|e| {
                PipelineError::Delivery(format!(
                    "failed to read header image {}: {}",
                    self.header_image_path.display(),
                    e
                ))
            })?;
        let image_type = ContentType::parse("image/png")
            .map_err(|e| PipelineError::Delivery(e.to_string()))?;
        let image_part = Attachment::new_inline("header_image".to_string()).body(image, image_type);

        let message = Message::builder()
            .from(Self::mailbox(&self.config.sender)?)
            .to(Self::mailbox(&self.config.recipient)?)
            .subject(format!("Podcast Summary: {}.", subject_title))
            .multipart(
                MultiPart::related()
                    .multipart(MultiPart::alternative().singlepart(SinglePart::html(html_body)))
                    .singlepart(image_part),
            )
            .map_err(|e| PipelineError::Delivery(e.to_string()))?;

        self.mailer
            .send(message)
            .await
            .map_err(|e| PipelineError::Delivery(e.to_string()))?;

        debug!(recipient = %self.config.recipient, title = subject_title, "Summary emailed");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn html_embeds_header_image_and_rendered_markdown() {
        let html = SmtpNotifier::render_html("# Summary\n\nKey *points* here.");

        assert!(html.contains("cid:header_image"));
        assert!(html.contains("<h1>Summary</h1>"));
        assert!(html.contains("<em>points</em>"));
    }

    #[test]
    fn bad_address_is_a_delivery_error() {
        let err = SmtpNotifier::mailbox("not an address").unwrap_err();
        assert!(matches!(err, PipelineError::Delivery(_)));
    }
}
