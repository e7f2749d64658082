//! Prompt assembly for summaries and question answering.

use crate::processing::types::SummaryKind;

pub(crate) const SUMMARY_SYSTEM_PROMPT: &str =
    "You are an expert document analyst. Provide clear, accurate summaries.";

pub(crate) const COMBINE_SYSTEM_PROMPT: &str =
    "Create a unified summary from these sections. Be comprehensive yet concise.";

pub(crate) const QUESTION_SYSTEM_PROMPT: &str = "You are a helpful assistant that answers \
     questions based on document content. If information isn't in the document, clearly state that.";

/// Prompt for summarizing a single document section.
pub(crate) fn chunk_prompt(kind: SummaryKind, text: &str) -> String {
    summary_prompt(kind, "Summarize this document section concisely:", text)
}

/// Prompt for merging per-section summaries into one.
pub(crate) fn combine_prompt(kind: SummaryKind, sections: &str) -> String {
    summary_prompt(
        kind,
        "Create a cohesive final summary from these sections:",
        sections,
    )
}

fn summary_prompt(kind: SummaryKind, base: &str, text: &str) -> String {
    let instruction = match kind {
        SummaryKind::Brief => "Provide a brief 2-3 paragraph summary focusing on main points.",
        SummaryKind::BulletPoints => "Provide key points as bullet points.",
        SummaryKind::Comprehensive => "Provide a detailed summary covering all major topics.",
    };
    format!("{base} {instruction}\n\nText: {text}")
}

/// Prompt for answering a question against document context.
pub(crate) fn question_prompt(context: &str, question: &str) -> String {
    format!("Document: {context}\n\nQuestion: {question}\n\nAnswer based on the document:")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn chunk_prompt_varies_by_kind() {
        let brief = chunk_prompt(SummaryKind::Brief, "body");
        let bullets = chunk_prompt(SummaryKind::BulletPoints, "body");
        assert!(brief.contains("2-3 paragraph"));
        assert!(bullets.contains("bullet points"));
        assert!(brief.ends_with("Text: body"));
    }

    #[test]
    fn combine_prompt_uses_merge_preamble() {
        let prompt = combine_prompt(SummaryKind::Comprehensive, "a\n---\nb");
        assert!(prompt.starts_with("Create a cohesive final summary"));
        assert!(prompt.contains("detailed summary"));
    }

    #[test]
    fn question_prompt_embeds_both_parts() {
        let prompt = question_prompt("the doc", "what is it?");
        assert!(prompt.contains("Document: the doc"));
        assert!(prompt.contains("Question: what is it?"));
    }
}
