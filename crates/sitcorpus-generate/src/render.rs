//! Content renderer: turns a document plan into text.
//!
//! Each assignment contributes one embedded value per planned instance, drawn
//! valid for TP and as the category placeholder for FP. Text is then padded
//! with filler paragraphs until the whitespace word count reaches the plan's
//! target. Overshoot is allowed; undershoot is not.

use fake::Fake;
use fake::faker::internet::en::SafeEmail;
use fake::faker::lorem::en::{Paragraph, Sentence};
use fake::faker::name::en::{FirstName, Name};
use rand::Rng;
use sitcorpus_core::{DocumentFormat, DocumentPlan, SitAssignment};

use crate::context::GenerationContext;
use crate::generators::{GeneratedValue, ValueLibrary};

/// Rendered text plus every value embedded in it.
#[derive(Debug, Clone)]
pub struct RenderedText {
    pub text: String,
    pub word_count: u64,
    pub values: Vec<EmbeddedValue>,
}

#[derive(Debug, Clone)]
pub struct EmbeddedValue {
    pub sit_id: String,
    pub value: GeneratedValue,
}

/// Composes text for every document format from a shared value library.
#[derive(Debug)]
pub struct ContentRenderer<'a> {
    library: &'a ValueLibrary,
}

impl<'a> ContentRenderer<'a> {
    pub fn new(library: &'a ValueLibrary) -> Self {
        Self { library }
    }

    pub fn render(&self, plan: &DocumentPlan, ctx: &mut GenerationContext) -> RenderedText {
        let mut values = Vec::new();
        let mut text = match plan.format {
            DocumentFormat::Document => self.document(plan, ctx, &mut values),
            DocumentFormat::Email => self.email(plan, ctx, &mut values, false),
            DocumentFormat::EmailWithAttachment => self.email(plan, ctx, &mut values, true),
            DocumentFormat::Chat => self.chat(plan, ctx, &mut values),
        };
        fill_to_target(&mut text, plan.word_count_target, ctx);
        let word_count = word_count(&text);
        RenderedText {
            text,
            word_count,
            values,
        }
    }

    fn values_for(
        &self,
        sit: &SitAssignment,
        ctx: &mut GenerationContext,
        values: &mut Vec<EmbeddedValue>,
    ) -> Vec<String> {
        (0..sit.instances.max(1))
            .map(|_| {
                let value = self
                    .library
                    .generate_value(&sit.sit_id, sit.label.wants_valid(), ctx);
                let text = value.value.clone();
                values.push(EmbeddedValue {
                    sit_id: sit.sit_id.clone(),
                    value,
                });
                text
            })
            .collect()
    }

    fn document(
        &self,
        plan: &DocumentPlan,
        ctx: &mut GenerationContext,
        values: &mut Vec<EmbeddedValue>,
    ) -> String {
        let mut parts = vec![format!("CONFIDENTIAL - Document {}", plan.doc_id)];
        for sit in &plan.sits {
            let mut block: Vec<String> = self
                .values_for(sit, ctx, values)
                .into_iter()
                .map(|value| format!("{}: {value}", sit.sit_name))
                .collect();
            block.push(format!("Details: related TCs: {}.", tcs_list(sit)));
            parts.push(block.join("\n"));
        }
        parts.push(format!(
            "Generated at: {}",
            plan.created_at.format("%Y-%m-%dT%H:%M:%SZ")
        ));
        parts.join("\n\n")
    }

    fn email(
        &self,
        plan: &DocumentPlan,
        ctx: &mut GenerationContext,
        values: &mut Vec<EmbeddedValue>,
        with_attachment: bool,
    ) -> String {
        let rng = ctx.rng();
        let from: String = SafeEmail().fake_with_rng(rng);
        let to: String = SafeEmail().fake_with_rng(rng);
        let subject: String = Sentence(3..7).fake_with_rng(rng);
        let sender: String = Name().fake_with_rng(rng);

        let mut body = Vec::with_capacity(plan.sits.len() + 1);
        for sit in &plan.sits {
            let mut block: Vec<String> = self
                .values_for(sit, ctx, values)
                .into_iter()
                .map(|value| format!("{}: {value}", sit.sit_name))
                .collect();
            block.push(format!("Context: related to {}.", tcs_list(sit)));
            body.push(block.join("\n"));
        }
        if with_attachment {
            body.push(format!("Attached: {}", attachment_file_name(plan)));
        }

        format!(
            "From: {from}\nTo: {to}\nSubject: {}\n\n{}\n\nRegards,\n{sender}\n",
            subject.trim_end_matches('.'),
            body.join("\n\n")
        )
    }

    fn chat(
        &self,
        plan: &DocumentPlan,
        ctx: &mut GenerationContext,
        values: &mut Vec<EmbeddedValue>,
    ) -> String {
        let rng = ctx.rng();
        let asker: String = FirstName().fake_with_rng(rng);
        let answerer: String = FirstName().fake_with_rng(rng);
        let mut clock = ChatClock::start(rng);

        let mut lines = Vec::new();
        for sit in &plan.sits {
            lines.push(format!(
                "[{}] {asker}: Please share the {}.",
                clock.tick(ctx.rng()),
                sit.sit_name
            ));
            for value in self.values_for(sit, ctx, values) {
                lines.push(format!(
                    "[{}] {answerer}: The {} is {value}.",
                    clock.tick(ctx.rng()),
                    sit.sit_name
                ));
            }
        }
        lines.join("\n")
    }
}

/// Minutes since midnight, advanced a few minutes per message.
struct ChatClock {
    minutes: u32,
}

impl ChatClock {
    fn start<R: Rng>(rng: &mut R) -> Self {
        Self {
            minutes: rng.random_range(8 * 60..18 * 60),
        }
    }

    fn tick<R: Rng>(&mut self, rng: &mut R) -> String {
        self.minutes = (self.minutes + rng.random_range(0..4)) % (24 * 60);
        format!("{:02}:{:02}", self.minutes / 60, self.minutes % 60)
    }
}

/// Name of the CSV attachment produced for `email_with_attachment` documents.
pub fn attachment_file_name(plan: &DocumentPlan) -> String {
    format!("{}_attachment.csv", plan.stem())
}

/// Whitespace-delimited word count.
pub fn word_count(text: &str) -> u64 {
    text.split_whitespace().count() as u64
}

/// Append filler paragraphs until `text` holds at least `target` words.
pub fn fill_to_target(text: &mut String, target: u64, ctx: &mut GenerationContext) {
    let mut words = word_count(text);
    while words < target {
        let paragraph: String = Paragraph(2..7).fake_with_rng(ctx.rng());
        words += word_count(&paragraph);
        if !text.is_empty() {
            text.push_str("\n\n");
        }
        text.push_str(&paragraph);
    }
}

fn tcs_list(sit: &SitAssignment) -> String {
    if sit.tcs.is_empty() {
        "none".to_string()
    } else {
        sit.tcs.join(", ")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use sitcorpus_core::{Category, Confidence, Label};

    fn plan(format: DocumentFormat, target: u64, label: Label, instances: u32) -> DocumentPlan {
        DocumentPlan {
            doc_id: 12,
            filename: DocumentPlan::filename_for(12, format),
            format,
            word_count_target: target,
            sits: vec![SitAssignment {
                sit_id: "SIT_CCN".to_string(),
                sit_name: "Credit Card Number".to_string(),
                label,
                instances,
                confidence: Confidence::Low,
                tcs: vec!["TC1".to_string(), "TC2".to_string()],
            }],
            created_at: Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).single().expect("timestamp"),
        }
    }

    fn library() -> ValueLibrary {
        ValueLibrary::new(&[Category::new("SIT_CCN", "Credit Card Number")])
    }

    #[test]
    fn document_embeds_one_value_per_instance() {
        let library = library();
        let renderer = ContentRenderer::new(&library);
        let mut ctx = GenerationContext::for_document(5, 12);
        let rendered = renderer.render(&plan(DocumentFormat::Document, 10, Label::Tp, 3), &mut ctx);

        assert!(rendered.text.starts_with("CONFIDENTIAL - Document 12"));
        assert_eq!(rendered.values.len(), 3);
        assert_eq!(rendered.text.matches("Credit Card Number: ").count(), 3);
        assert!(rendered.text.contains("Details: related TCs: TC1, TC2."));
        assert!(rendered.text.contains("Generated at: 2024-05-01T12:00:00Z"));
    }

    #[test]
    fn fp_documents_carry_placeholders_only() {
        let library = library();
        let renderer = ContentRenderer::new(&library);
        let mut ctx = GenerationContext::for_document(5, 12);
        let rendered = renderer.render(&plan(DocumentFormat::Chat, 10, Label::Fp, 2), &mut ctx);

        assert!(rendered.values.iter().all(|v| v.value.value == "0000 0000 0000 0000"));
        assert!(rendered.text.contains("Please share the Credit Card Number."));
        assert!(rendered.text.contains("The Credit Card Number is 0000 0000 0000 0000."));
    }

    #[test]
    fn email_has_headers_and_sign_off() {
        let library = library();
        let renderer = ContentRenderer::new(&library);
        let mut ctx = GenerationContext::for_document(5, 12);
        let rendered = renderer.render(
            &plan(DocumentFormat::EmailWithAttachment, 10, Label::Tp, 1),
            &mut ctx,
        );

        let mut lines = rendered.text.lines();
        assert!(lines.next().is_some_and(|line| line.starts_with("From: ")));
        assert!(lines.next().is_some_and(|line| line.starts_with("To: ")));
        assert!(lines.next().is_some_and(|line| line.starts_with("Subject: ")));
        assert!(rendered.text.contains("Context: related to TC1, TC2."));
        assert!(rendered.text.contains("doc_00012_email_with_attachment_attachment.csv"));
        assert!(rendered.text.contains("Regards,"));
    }

    #[test]
    fn text_reaches_the_word_target() {
        let library = library();
        let renderer = ContentRenderer::new(&library);
        for target in [50_u64, 300, 1200] {
            let mut ctx = GenerationContext::for_document(7, target);
            let rendered =
                renderer.render(&plan(DocumentFormat::Document, target, Label::Tp, 1), &mut ctx);
            assert!(rendered.word_count >= target);
            assert_eq!(rendered.word_count, word_count(&rendered.text));
        }
    }

    #[test]
    fn rendering_is_deterministic_per_document() {
        let library = library();
        let renderer = ContentRenderer::new(&library);
        let doc = plan(DocumentFormat::Email, 200, Label::Tp, 2);
        let first = renderer.render(&doc, &mut GenerationContext::for_document(9, 12));
        let second = renderer.render(&doc, &mut GenerationContext::for_document(9, 12));
        assert_eq!(first.text, second.text);
    }
}
