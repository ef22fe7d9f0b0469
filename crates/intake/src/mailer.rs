//! Outbound referral dispatch over SMTP.
//!
//! Dispatch is best-effort: one message per recipient, each outcome logged,
//! no retry. Failures never surface to the submitter.

use lettre::message::header::ContentType;
use lettre::message::{Attachment as MailAttachment, Mailbox, MultiPart, SinglePart};
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};

use intake_common::constants::SMTPS_PORT;
use intake_common::{Attachment, ServiceError};

use crate::config::MailConfig;

/// Everything needed to dispatch one accepted referral
pub struct ReferralEnvelope {
    pub referral_id: String,
    pub patient_name: String,
    pub doctor_name: String,
    pub patient_first: String,
    pub patient_last: String,
    pub pdf: Vec<u8>,
    pub attachments: Vec<Attachment>,
}

impl ReferralEnvelope {
    pub fn pdf_filename(&self) -> String {
        format!(
            "referral_{}_{}_{}.pdf",
            self.referral_id, self.patient_first, self.patient_last
        )
    }
}

/// SMTP dispatcher (implicit TLS submission)
pub struct SmtpMailer {
    transport: AsyncSmtpTransport<Tokio1Executor>,
    from: String,
}

impl SmtpMailer {
    pub fn new(config: &MailConfig) -> Result<Self, ServiceError> {
        // An unset host still builds a transport; sends fail at connect
        // time and the health endpoint reports the missing credentials.
        let builder = if config.host.is_empty() {
            AsyncSmtpTransport::<Tokio1Executor>::builder_dangerous("localhost")
        } else {
            AsyncSmtpTransport::<Tokio1Executor>::relay(&config.host)
                .map_err(|e| ServiceError::Mail(e.to_string()))?
        };

        let transport = builder
            .credentials(Credentials::new(config.user.clone(), config.pass.clone()))
            .port(SMTPS_PORT)
            .build();

        Ok(Self {
            transport,
            from: config.user.clone(),
        })
    }

    /// Send one message per recipient; outcomes are logged and swallowed
    pub async fn dispatch(&self, recipients: &[String], envelope: &ReferralEnvelope) {
        for recipient in recipients {
            match self.send_one(recipient, envelope).await {
                Ok(()) => tracing::info!(
                    recipient = %recipient,
                    referral_id = %envelope.referral_id,
                    "Email sent"
                ),
                Err(e) => tracing::error!(
                    recipient = %recipient,
                    referral_id = %envelope.referral_id,
                    error = %e,
                    "Email dispatch failed"
                ),
            }
        }
    }

    async fn send_one(
        &self,
        recipient: &str,
        envelope: &ReferralEnvelope,
    ) -> Result<(), ServiceError> {
        let from: Mailbox = self
            .from
            .parse()
            .map_err(|e| ServiceError::Mail(format!("invalid sender address: {e}")))?;
        let to: Mailbox = recipient
            .parse()
            .map_err(|e| ServiceError::Mail(format!("invalid recipient address: {e}")))?;

        let pdf_type = ContentType::parse("application/pdf")
            .map_err(|e| ServiceError::Mail(e.to_string()))?;

        let mut body = MultiPart::mixed().singlepart(SinglePart::plain(format!(
            "Referral for {} from Dr. {}",
            envelope.patient_name, envelope.doctor_name
        )));
        body = body.singlepart(
            MailAttachment::new(envelope.pdf_filename()).body(envelope.pdf.clone(), pdf_type),
        );

        for attachment in &envelope.attachments {
            let declared = attachment
                .content_type
                .as_deref()
                .unwrap_or("application/octet-stream");
            let content_type = ContentType::parse(declared)
                .or_else(|_| ContentType::parse("application/octet-stream"))
                .map_err(|e| ServiceError::Mail(e.to_string()))?;

            body = body.singlepart(
                MailAttachment::new(attachment.file_name.clone())
                    .body(attachment.data.clone(), content_type),
            );
        }

        let message = Message::builder()
            .from(from)
            .to(to)
            .subject(format!(
                "[Referral {}] {}",
                envelope.referral_id, envelope.patient_name
            ))
            .multipart(body)
            .map_err(|e| ServiceError::Mail(e.to_string()))?;

        self.transport
            .send(message)
            .await
            .map_err(|e| ServiceError::Mail(e.to_string()))?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pdf_filename_carries_id_and_patient() {
        let envelope = ReferralEnvelope {
            referral_id: "20250310-04".into(),
            patient_name: "Jane Doe".into(),
            doctor_name: "Sam Lee".into(),
            patient_first: "Jane".into(),
            patient_last: "Doe".into(),
            pdf: vec![],
            attachments: vec![],
        };
        assert_eq!(envelope.pdf_filename(), "referral_20250310-04_Jane_Doe.pdf");
    }

    #[tokio::test]
    async fn mailer_builds_without_configured_host() {
        let config = MailConfig::default();
        assert!(SmtpMailer::new(&config).is_ok());
    }
}
