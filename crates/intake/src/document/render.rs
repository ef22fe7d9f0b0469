//! PDF rendering for referral documents.
//!
//! Uses the PDF built-in Helvetica faces so no font files ship with the
//! service. Layout is a simple top-down cursor with word wrapping; the
//! attachments list starts on its own page.

use printpdf::{
    BuiltinFont, IndirectFontRef, Mm, PdfDocument, PdfDocumentReference, PdfLayerReference,
};
use std::io::BufWriter;

use intake_common::ServiceError;

use super::ReferralDocument;

/// Characters per wrapped value line at the body font size
const WRAP_WIDTH: usize = 70;

/// Renders referral documents to PDF bytes
pub struct PdfRenderer;

impl PdfRenderer {
    pub fn new() -> Self {
        Self
    }

    /// Render the document description into PDF bytes
    pub fn render(&self, document: &ReferralDocument) -> Result<Vec<u8>, ServiceError> {
        let (doc, page, layer) =
            PdfDocument::new(document.title.as_str(), Mm(215.9), Mm(279.4), "Layer 1");

        let regular = doc
            .add_builtin_font(BuiltinFont::Helvetica)
            .map_err(|e| ServiceError::Render(e.to_string()))?;
        let bold = doc
            .add_builtin_font(BuiltinFont::HelveticaBold)
            .map_err(|e| ServiceError::Render(e.to_string()))?;

        let mut writer = PageWriter {
            doc: &doc,
            layer: doc.get_page(page).get_layer(layer),
            y: Mm(260.0),
            regular: &regular,
            bold: &bold,
        };

        writer.heading(&document.title);
        writer.body_line(&format!("Referral ID: {}", document.referral_id));
        writer.body_line(&format!("Generated on: {}", document.generated_at));
        writer.gap();

        for section in &document.sections {
            writer.subheading(&section.heading);
            for row in &section.rows {
                writer.labelled_value(&row.label, &row.value);
            }
            writer.gap();
        }

        writer.new_page();
        writer.subheading("Attachments");
        if document.attachment_names.is_empty() {
            writer.body_line("(none)");
        }
        for name in &document.attachment_names {
            writer.body_line(name);
        }

        drop(writer);

        let mut bytes = Vec::new();
        {
            let mut buffer = BufWriter::new(&mut bytes);
            doc.save(&mut buffer)
                .map_err(|e| ServiceError::Render(e.to_string()))?;
        }

        Ok(bytes)
    }
}

impl Default for PdfRenderer {
    fn default() -> Self {
        Self::new()
    }
}

/// Top-down layout cursor over the current page
struct PageWriter<'a> {
    doc: &'a PdfDocumentReference,
    layer: PdfLayerReference,
    y: Mm,
    regular: &'a IndirectFontRef,
    bold: &'a IndirectFontRef,
}

impl PageWriter<'_> {
    fn heading(&mut self, text: &str) {
        self.ensure_room();
        self.layer
            .use_text(text, 18.0, Mm(20.0), self.y, self.bold);
        self.y = Mm(self.y.0 - 10.0);
    }

    fn subheading(&mut self, text: &str) {
        self.ensure_room();
        self.layer
            .use_text(text, 14.0, Mm(20.0), self.y, self.bold);
        self.y = Mm(self.y.0 - 8.0);
    }

    fn body_line(&mut self, text: &str) {
        self.ensure_room();
        self.layer
            .use_text(text, 10.0, Mm(20.0), self.y, self.regular);
        self.y = Mm(self.y.0 - 5.0);
    }

    /// Label column at the left margin, wrapped value beside it
    fn labelled_value(&mut self, label: &str, value: &str) {
        self.ensure_room();
        self.layer
            .use_text(label, 10.0, Mm(20.0), self.y, self.bold);

        let lines = wrap_text(value, WRAP_WIDTH);
        if lines.is_empty() {
            self.y = Mm(self.y.0 - 5.0);
            return;
        }
        for line in lines {
            self.ensure_room();
            self.layer
                .use_text(line, 10.0, Mm(58.0), self.y, self.regular);
            self.y = Mm(self.y.0 - 5.0);
        }
    }

    fn gap(&mut self) {
        self.y = Mm(self.y.0 - 4.0);
    }

    fn ensure_room(&mut self) {
        if self.y.0 < 25.0 {
            self.new_page();
        }
    }

    fn new_page(&mut self) {
        let (page, layer) = self.doc.add_page(Mm(215.9), Mm(279.4), "Layer 1");
        self.layer = self.doc.get_page(page).get_layer(layer);
        self.y = Mm(260.0);
    }
}

/// Split on embedded newlines, then word-wrap each line
fn wrap_text(text: &str, max_chars: usize) -> Vec<String> {
    let mut lines = Vec::new();

    for raw_line in text.split('\n') {
        let raw_line = raw_line.trim_end();
        if raw_line.chars().count() <= max_chars {
            lines.push(raw_line.to_string());
            continue;
        }

        let mut current = String::new();
        for word in raw_line.split_whitespace() {
            if !current.is_empty() && current.chars().count() + word.chars().count() + 1 > max_chars
            {
                lines.push(std::mem::take(&mut current));
            }
            if !current.is_empty() {
                current.push(' ');
            }
            current.push_str(word);
        }
        if !current.is_empty() {
            lines.push(current);
        }
    }

    lines
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::build_referral_document;
    use intake_common::ReferralFields;

    #[test]
    fn wrap_respects_embedded_newlines() {
        let lines = wrap_text("123 Main St\nSuite 4\nToronto ON", 70);
        assert_eq!(lines, vec!["123 Main St", "Suite 4", "Toronto ON"]);
    }

    #[test]
    fn wrap_breaks_long_lines_between_words() {
        let text = "a long clinical history that keeps going well past any sensible single \
                    line width and needs to break somewhere between words";
        let lines = wrap_text(text, 40);
        assert!(lines.len() > 1);
        assert!(lines.iter().all(|l| l.chars().count() <= 40));
    }

    #[test]
    fn renders_a_pdf_byte_stream() {
        let fields = ReferralFields {
            patient_first: "Jane".into(),
            patient_last: "Doe".into(),
            patient_history: "Seasonal allergies.".into(),
            ..Default::default()
        };
        let document = build_referral_document("Community Clinic", "20250310-00", &fields, &[]);

        let renderer = PdfRenderer::new();
        let bytes = renderer.render(&document).expect("render succeeds");

        assert!(bytes.starts_with(b"%PDF"));
        assert!(bytes.len() > 500);
    }
}
