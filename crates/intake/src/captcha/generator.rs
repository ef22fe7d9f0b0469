//! CAPTCHA image generation.
//!
//! Renders a short case-scrambled answer into an SVG image, returned as a
//! base64 data URL. The store hashes that payload to key the challenge.

use base64::{Engine, engine::general_purpose::STANDARD};
use rand::Rng;

use intake_common::ServiceError;
use intake_common::constants::CAPTCHA_ANSWER_LEN;

/// CAPTCHA generator service
pub struct CaptchaGenerator {
    width: u32,
    height: u32,
}

/// A freshly rendered challenge: the answer stays server-side, the image
/// payload goes to the client.
pub struct GeneratedCaptcha {
    pub answer: String,
    pub image_data: String,
}

impl CaptchaGenerator {
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    /// Generate a new challenge
    pub fn generate(&self) -> Result<GeneratedCaptcha, ServiceError> {
        let mut rng = rand::rng();

        let answer = random_answer(&mut rng);
        let image_data = self.render_svg(&answer, &mut rng);

        if image_data.is_empty() {
            return Err(ServiceError::Captcha("rendered an empty payload".into()));
        }

        Ok(GeneratedCaptcha { answer, image_data })
    }

    /// Render the answer text into an SVG data URL
    fn render_svg(&self, text: &str, rng: &mut impl Rng) -> String {
        let width = self.width;
        let height = self.height;

        let mut svg = format!(
            r#"<svg xmlns="http://www.w3.org/2000/svg" width="{}" height="{}">"#,
            width, height
        );

        // Background
        svg.push_str(r##"<rect width="100%" height="100%" fill="#1a1a2e"/>"##);

        // Noise lines
        for _ in 0..20 {
            let x1 = rng.random_range(0..width);
            let y1 = rng.random_range(0..height);
            let x2 = rng.random_range(0..width);
            let y2 = rng.random_range(0..height);
            let opacity = rng.random_range(20..50);
            svg.push_str(&format!(
                r#"<line x1="{}" y1="{}" x2="{}" y2="{}" stroke="rgba(255,255,255,0.{})" stroke-width="1"/>"#,
                x1, y1, x2, y2, opacity
            ));
        }

        // The whole text gets a small tilt on top of per-character jitter
        let tilt = rng.random_range(-10..=10);
        svg.push_str(&format!(
            r#"<g transform="rotate({} {} {})">"#,
            tilt,
            width / 2,
            height / 2
        ));

        let font_size = height * 2 / 5;
        let char_width = width as f32 / (text.len() as f32 + 1.0);
        for (i, c) in text.chars().enumerate() {
            let x = char_width * (i as f32 + 0.8);
            let y = height as i32 / 2 + rng.random_range(-15..15);
            let rotation = rng.random_range(-15..15);
            let color = format!(
                "rgb({},{},{})",
                rng.random_range(150..255),
                rng.random_range(150..255),
                rng.random_range(150..255)
            );

            svg.push_str(&format!(
                r#"<text x="{}" y="{}" font-family="monospace" font-size="{}" font-weight="bold" fill="{}" transform="rotate({} {} {})">{}</text>"#,
                x, y, font_size, color, rotation, x, y, c
            ));
        }

        svg.push_str("</g></svg>");

        format!("data:image/svg+xml;base64,{}", STANDARD.encode(&svg))
    }
}

/// Generate a random alphanumeric answer with per-character case scrambling
fn random_answer(rng: &mut impl Rng) -> String {
    (0..CAPTCHA_ANSWER_LEN)
        .map(|_| {
            let idx = rng.random_range(0..36u8);
            let c = if idx < 10 {
                (b'0' + idx) as char
            } else {
                (b'a' + idx - 10) as char
            };
            if c.is_ascii_alphabetic() && rng.random_bool(0.5) {
                c.to_ascii_uppercase()
            } else {
                c
            }
        })
        .collect()
}
