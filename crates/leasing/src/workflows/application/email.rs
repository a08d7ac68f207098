use serde::{Deserialize, Serialize};

use super::domain::ConfirmationCode;

/// Identifier returned by the delivery provider for a dispatched message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeliveryId(pub String);

/// Inputs for the confirmation email. Recipient and code are hard
/// requirements; a missing name degrades to a generic salutation.
#[derive(Debug, Clone)]
pub struct ConfirmationEmail {
    pub to: String,
    pub first_name: String,
    pub last_name: String,
    pub confirmation_code: ConfirmationCode,
}

impl ConfirmationEmail {
    pub fn applicant_name(&self) -> String {
        match (self.first_name.trim(), self.last_name.trim()) {
            ("", "") => "Valued Applicant".to_string(),
            (first, "") => first.to_string(),
            ("", last) => last.to_string(),
            (first, last) => format!("{first} {last}"),
        }
    }

    /// Render the fixed transactional template.
    pub fn render(&self, from: &str) -> Result<EmailMessage, EmailError> {
        if self.to.trim().is_empty() {
            return Err(EmailError::MissingRecipient);
        }

        let name = self.applicant_name();
        let code = self.confirmation_code.as_str();
        let html = format!(
            r#"<!DOCTYPE html>
<html lang="en">
<body style="margin:0;padding:0;background-color:#f4f4f4;font-family:'Segoe UI',Tahoma,sans-serif;">
  <table role="presentation" style="width:100%;max-width:600px;margin:0 auto;background:#ffffff;border-radius:16px;overflow:hidden;">
    <tr>
      <td style="background:linear-gradient(135deg,#1a4d1a,#3d8b3d);padding:40px 30px;text-align:center;">
        <h1 style="margin:0;color:#ffffff;font-size:28px;">Greenland Apartments</h1>
        <p style="margin:8px 0 0;color:rgba(255,255,255,0.85);font-size:14px;">Premium Apartment Living</p>
      </td>
    </tr>
    <tr>
      <td style="background:#e8f5e9;padding:25px 30px;text-align:center;border-bottom:3px solid #4caf50;">
        <h2 style="margin:0;color:#2e7d32;font-size:22px;">Application Successfully Submitted!</h2>
      </td>
    </tr>
    <tr>
      <td style="padding:35px 30px;">
        <p style="font-size:16px;color:#333;">Dear {name},</p>
        <p style="font-size:15px;color:#555;">Thank you for applying to join the Greenland community. Your application fee has been received and your application is now in review.</p>
        <div style="background:#f1f8e9;border:2px dashed #4caf50;border-radius:12px;padding:20px;text-align:center;margin:25px 0;">
          <p style="margin:0 0 6px;font-size:13px;color:#666;text-transform:uppercase;">Confirmation Number</p>
          <p style="margin:0;font-size:28px;font-weight:700;letter-spacing:3px;color:#2e7d32;">{code}</p>
        </div>
        <p style="font-size:14px;color:#555;">Keep this number for your records; our leasing team will reference it in all follow-up communication.</p>
      </td>
    </tr>
  </table>
</body>
</html>"#
        );

        Ok(EmailMessage {
            from: from.to_string(),
            to: self.to.clone(),
            subject: format!("Application Confirmed - {code} - Greenland Apartments"),
            html,
        })
    }
}

/// Structured send request for the delivery provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmailMessage {
    pub from: String,
    pub to: String,
    pub subject: String,
    pub html: String,
}

/// Email delivery seam. Failures are surfaced to the caller but must never
/// roll back the paid transition that triggered the send.
pub trait EmailDelivery: Send + Sync {
    fn send(&self, message: EmailMessage) -> Result<DeliveryId, EmailError>;
}

#[derive(Debug, thiserror::Error)]
pub enum EmailError {
    #[error("recipient address is required")]
    MissingRecipient,
    #[error("email provider unavailable: {0}")]
    Unavailable(String),
    #[error("email provider rejected the message: {0}")]
    Rejected(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    fn email(first: &str, last: &str) -> ConfirmationEmail {
        ConfirmationEmail {
            to: "applicant@example.test".to_string(),
            first_name: first.to_string(),
            last_name: last.to_string(),
            confirmation_code: ConfirmationCode::parse("1A2B-3C4D").expect("valid code"),
        }
    }

    #[test]
    fn applicant_name_falls_back_when_parts_missing() {
        assert_eq!(email("Ada", "Lovelace").applicant_name(), "Ada Lovelace");
        assert_eq!(email("Ada", "").applicant_name(), "Ada");
        assert_eq!(email("", "Lovelace").applicant_name(), "Lovelace");
        assert_eq!(email("", "").applicant_name(), "Valued Applicant");
    }

    #[test]
    fn render_embeds_code_and_recipient() {
        let message = email("Ada", "Lovelace")
            .render("Greenland <applications@example.test>")
            .expect("renders");
        assert_eq!(message.to, "applicant@example.test");
        assert!(message.subject.contains("1A2B-3C4D"));
        assert!(message.html.contains("1A2B-3C4D"));
        assert!(message.html.contains("Dear Ada Lovelace"));
    }

    #[test]
    fn render_requires_a_recipient() {
        let mut mail = email("Ada", "Lovelace");
        mail.to = "  ".to_string();
        assert!(matches!(
            mail.render("from@example.test"),
            Err(EmailError::MissingRecipient)
        ));
    }
}
