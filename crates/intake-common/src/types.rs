//! Core types shared across the intake service.

use serde::{Deserialize, Serialize};

/// The referral form fields as submitted by the web frontend.
///
/// Field names on the wire are camelCase to match the form inputs. Every
/// field is optional in practice; missing inputs deserialize to empty
/// strings so a partially filled form still renders.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ReferralFields {
    pub patient_first: String,
    pub patient_middle: String,
    pub patient_last: String,
    #[serde(rename = "patientDOB")]
    pub patient_dob: String,
    pub patient_gender: String,
    pub patient_status: String,
    #[serde(rename = "patientOHIP")]
    pub patient_ohip: String,
    pub patient_phone: String,
    pub patient_email: String,
    pub patient_addr1: String,
    pub patient_addr2: String,
    pub patient_city: String,
    pub patient_province: String,
    pub patient_postal: String,
    pub patient_history: String,
    pub patient_diagnosis: String,

    pub doctor_first: String,
    pub doctor_middle: String,
    pub doctor_last: String,
    pub doctor_phone: String,
    pub doctor_email: String,
    pub doctor_fax: String,
    #[serde(rename = "doctorBN")]
    pub doctor_bn: String,
    pub doctor_clinic: String,
    pub doctor_addr1: String,
    pub doctor_addr2: String,
    pub doctor_city: String,
    pub doctor_province: String,
    pub doctor_postal: String,

    /// Checkbox: send a copy of the referral to the referring doctor
    pub send_copy_check: String,

    /// Challenge key issued alongside the captcha image
    pub captcha_hash: String,
    /// The user's transcription of the captcha text
    pub captcha_response: String,

    /// Shared secret for the manual-verification route
    pub test_key: String,
    /// Recipient override for the manual-verification route
    pub test_email: String,
}

impl ReferralFields {
    /// Patient display name, skipping empty name parts.
    pub fn patient_name(&self) -> String {
        join_name(&[&self.patient_first, &self.patient_middle, &self.patient_last])
    }

    /// Referring doctor display name, skipping empty name parts.
    pub fn doctor_name(&self) -> String {
        join_name(&[&self.doctor_first, &self.doctor_middle, &self.doctor_last])
    }

    /// Whether the submitter ticked the "send me a copy" checkbox.
    pub fn wants_doctor_copy(&self) -> bool {
        matches!(
            self.send_copy_check.to_ascii_lowercase().as_str(),
            "on" | "true" | "1" | "yes"
        )
    }
}

fn join_name(parts: &[&str]) -> String {
    parts
        .iter()
        .map(|p| p.trim())
        .filter(|p| !p.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}

/// An uploaded image attachment, held in memory for the life of the request.
#[derive(Debug, Clone)]
pub struct Attachment {
    pub file_name: String,
    pub content_type: Option<String>,
    pub data: Vec<u8>,
}

/// The newest mailbox message seen by the bulletin poller.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BulletinMessage {
    /// Sender address, already stripped to the bare `local@domain` form
    pub sender: String,
    /// The message's Date header, used verbatim for deduplication
    pub timestamp: String,
    /// Raw message body; sanitized before publication
    pub body: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn names_skip_empty_parts() {
        let fields = ReferralFields {
            patient_first: "Jane".into(),
            patient_last: "Doe".into(),
            ..Default::default()
        };
        assert_eq!(fields.patient_name(), "Jane Doe");
    }

    #[test]
    fn copy_checkbox_accepts_common_truthy_values() {
        for value in ["on", "true", "1", "yes", "ON"] {
            let fields = ReferralFields {
                send_copy_check: value.into(),
                ..Default::default()
            };
            assert!(fields.wants_doctor_copy(), "{value} should be truthy");
        }
        assert!(!ReferralFields::default().wants_doctor_copy());
    }

    #[test]
    fn fields_deserialize_from_camel_case_form_names() {
        let value = serde_json::json!({
            "patientFirst": "Jane",
            "doctorBN": "123456",
            "captchaHash": "abc",
        });
        let fields: ReferralFields = serde_json::from_value(value).expect("valid fields");
        assert_eq!(fields.patient_first, "Jane");
        assert_eq!(fields.doctor_bn, "123456");
        assert_eq!(fields.captcha_hash, "abc");
        assert_eq!(fields.patient_last, "");
    }
}
