//! Declarative referral document model.
//!
//! Building a [`ReferralDocument`] from submitted fields is a pure
//! transform; turning it into PDF bytes happens separately in [`render`].

pub mod render;

use chrono::Local;

use intake_common::{Attachment, ReferralFields};

/// Structured description of a rendered referral
#[derive(Debug, Clone)]
pub struct ReferralDocument {
    pub title: String,
    pub referral_id: String,
    pub generated_at: String,
    pub sections: Vec<DocumentSection>,
    /// File names of the image attachments riding along with the email
    pub attachment_names: Vec<String>,
}

/// A heading plus label/value rows
#[derive(Debug, Clone)]
pub struct DocumentSection {
    pub heading: String,
    pub rows: Vec<DocumentRow>,
}

/// One label/value row; values may span multiple lines
#[derive(Debug, Clone)]
pub struct DocumentRow {
    pub label: String,
    pub value: String,
}

impl DocumentRow {
    fn new(label: &str, value: &str) -> Self {
        Self {
            label: label.to_string(),
            value: value.to_string(),
        }
    }
}

/// Build the document description for a referral submission
pub fn build_referral_document(
    clinic_name: &str,
    referral_id: &str,
    fields: &ReferralFields,
    attachments: &[Attachment],
) -> ReferralDocument {
    let generated_at = Local::now()
        .format("%A, %B %e %Y, %l:%M:%S %p")
        .to_string();

    let patient_address = join_lines(&[
        &fields.patient_addr1,
        &fields.patient_addr2,
        &format!(
            "{} {} {}",
            fields.patient_city, fields.patient_province, fields.patient_postal
        ),
    ]);

    let practice_address = join_lines(&[
        &fields.doctor_clinic,
        &fields.doctor_addr1,
        &fields.doctor_addr2,
        &format!(
            "{} {} {}",
            fields.doctor_city, fields.doctor_province, fields.doctor_postal
        ),
    ]);

    let sections = vec![
        DocumentSection {
            heading: "Patient Information".to_string(),
            rows: vec![
                DocumentRow::new("Name", &fields.patient_name()),
                DocumentRow::new("DOB (yyyy/mm/dd)", &fields.patient_dob),
                DocumentRow::new("Gender", &fields.patient_gender),
                DocumentRow::new("Patient Status", &fields.patient_status),
                DocumentRow::new("OHIP Number", &fields.patient_ohip),
                DocumentRow::new("Phone", &fields.patient_phone),
                DocumentRow::new("Email", &fields.patient_email),
                DocumentRow::new("Address", &patient_address),
            ],
        },
        DocumentSection {
            heading: "History".to_string(),
            rows: vec![DocumentRow::new("History", &fields.patient_history)],
        },
        DocumentSection {
            heading: "Provisional Diagnosis".to_string(),
            rows: vec![DocumentRow::new(
                "Diagnosis",
                &fields.patient_diagnosis,
            )],
        },
        DocumentSection {
            heading: "Referring Doctor's Information".to_string(),
            rows: vec![
                DocumentRow::new("Name", &fields.doctor_name()),
                DocumentRow::new("Phone", &fields.doctor_phone),
                DocumentRow::new("Email", &fields.doctor_email),
                DocumentRow::new("Fax", &fields.doctor_fax),
                DocumentRow::new("OHIP BN", &fields.doctor_bn),
                DocumentRow::new("Practice Address", &practice_address),
            ],
        },
    ];

    ReferralDocument {
        title: format!("{clinic_name} Referral Form"),
        referral_id: referral_id.to_string(),
        generated_at,
        sections,
        attachment_names: attachments.iter().map(|a| a.file_name.clone()).collect(),
    }
}

fn join_lines(parts: &[&str]) -> String {
    parts
        .iter()
        .map(|p| p.trim())
        .filter(|p| !p.is_empty())
        .collect::<Vec<_>>()
        .join("\n")
}
