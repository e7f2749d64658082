//! Text cleanup, token estimation, and sentence-boundary chunking.
//!
//! Chunk sizing is adaptive: short documents get generous chunks, large ones
//! get smaller chunks to keep individual prompts inside the remote model's
//! comfort zone. Callers can pin a size via `CHUNK_SIZE`.

const SMALL_DOCUMENT_CHARS: usize = 10_000;
const MEDIUM_DOCUMENT_CHARS: usize = 50_000;

/// Normalize extracted text: every whitespace run (newlines included) becomes
/// a single space, basic punctuation is kept, everything else is dropped.
pub(crate) fn preprocess_text(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut pending_gap = false;

    for ch in text.chars() {
        if ch.is_whitespace() {
            pending_gap = true;
        } else if ch.is_alphanumeric()
            || matches!(ch, '.' | ',' | '!' | '?' | ';' | ':' | '(' | ')' | '-' | '_')
        {
            if std::mem::take(&mut pending_gap) && !out.is_empty() {
                out.push(' ');
            }
            out.push(ch);
        }
    }

    out
}

/// Rough token estimate: one token per four characters of English text.
pub(crate) fn estimate_tokens(text: &str) -> usize {
    text.len().div_ceil(4)
}

/// Derive the chunk size for a document, respecting an explicit override.
pub(crate) fn determine_chunk_size(text_length: usize, override_size: Option<usize>) -> usize {
    if let Some(explicit) = override_size {
        return explicit.max(1);
    }
    if text_length < SMALL_DOCUMENT_CHARS {
        5_000
    } else if text_length < MEDIUM_DOCUMENT_CHARS {
        4_000
    } else {
        3_000
    }
}

/// Split text into chunks at sentence boundaries, packing sentences until the
/// size budget would be exceeded.
///
/// Falls back to the whole input as a single chunk when no sentence boundary
/// is found.
pub(crate) fn chunk_text(text: &str, max_chunk_size: usize) -> Vec<String> {
    let mut chunks = Vec::new();
    let mut current = String::new();

    for sentence in text
        .split(['.', '!', '?'])
        .map(str::trim)
        .filter(|sentence| !sentence.is_empty())
    {
        let candidate_len = if current.is_empty() {
            sentence.len()
        } else {
            current.len() + 2 + sentence.len()
        };

        if candidate_len > max_chunk_size && !current.is_empty() {
            current.push('.');
            chunks.push(std::mem::take(&mut current));
            current.push_str(sentence);
        } else {
            if !current.is_empty() {
                current.push_str(". ");
            }
            current.push_str(sentence);
        }
    }

    if !current.is_empty() {
        if !current.ends_with('.') {
            current.push('.');
        }
        chunks.push(current);
    }

    if chunks.is_empty() {
        vec![text.to_string()]
    } else {
        chunks
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn preprocess_collapses_whitespace_and_strips_noise() {
        let cleaned = preprocess_text("Hello,   world!\n\n\nSecond §©§ line.");
        assert_eq!(cleaned, "Hello, world! Second line.");
    }

    #[test]
    fn preprocess_flattens_newlines_to_spaces() {
        let cleaned = preprocess_text("page one\ntext\r\n\tpage two");
        assert_eq!(cleaned, "page one text page two");
    }

    #[test]
    fn preprocess_is_idempotent() {
        let once = preprocess_text("  Some\ttext  with   gaps. ");
        assert_eq!(preprocess_text(&once), once);
    }

    #[test]
    fn token_estimate_rounds_up() {
        assert_eq!(estimate_tokens(""), 0);
        assert_eq!(estimate_tokens("abcd"), 1);
        assert_eq!(estimate_tokens("abcde"), 2);
    }

    #[test]
    fn chunk_size_adapts_to_document_length() {
        assert_eq!(determine_chunk_size(5_000, None), 5_000);
        assert_eq!(determine_chunk_size(20_000, None), 4_000);
        assert_eq!(determine_chunk_size(100_000, None), 3_000);
        assert_eq!(determine_chunk_size(100_000, Some(2_048)), 2_048);
        assert_eq!(determine_chunk_size(100, Some(0)), 1);
    }

    #[test]
    fn chunks_break_at_sentence_boundaries() {
        let text = "First sentence here. Second sentence here. Third sentence here.";
        let chunks = chunk_text(text, 45);
        assert_eq!(chunks.len(), 2);
        assert_eq!(chunks[0], "First sentence here. Second sentence here.");
        assert_eq!(chunks[1], "Third sentence here.");
    }

    #[test]
    fn short_text_yields_single_chunk_with_terminal_period() {
        let chunks = chunk_text("One tidy sentence", 1_000);
        assert_eq!(chunks, vec!["One tidy sentence.".to_string()]);
    }

    #[test]
    fn text_without_sentence_boundaries_falls_back_to_whole_input() {
        let chunks = chunk_text("   ", 100);
        assert_eq!(chunks, vec!["   ".to_string()]);
    }

    #[test]
    fn oversized_single_sentence_is_kept_whole() {
        let long = "word ".repeat(50).trim_end().to_string();
        let chunks = chunk_text(&long, 20);
        assert_eq!(chunks.len(), 1);
        assert!(chunks[0].starts_with("word word"));
    }
}
