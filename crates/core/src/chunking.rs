pub const DEFAULT_MAX_CHUNK_SIZE: usize = 1000;

/// Splits extracted document text into bounded, paragraph-respecting chunks.
///
/// Paragraphs (blank-line separated) are greedily packed into a buffer joined
/// by a blank line while `buffer + paragraph + 1` stays within
/// `max_chunk_size`. A paragraph longer than the limit flushes the buffer and
/// is sliced into consecutive pieces of exactly `max_chunk_size` characters,
/// the last possibly shorter. Pure and deterministic; lengths are `char`
/// counts, not bytes.
pub fn split_into_chunks(text: &str, max_chunk_size: usize) -> Vec<String> {
    if text.is_empty() || max_chunk_size == 0 {
        return Vec::new();
    }

    let mut chunks = Vec::new();
    let mut buffer = String::new();
    let mut buffer_len = 0usize;

    for paragraph in paragraphs(text) {
        let paragraph_len = paragraph.chars().count();

        if paragraph_len > max_chunk_size {
            if !buffer.is_empty() {
                chunks.push(std::mem::take(&mut buffer));
                buffer_len = 0;
            }

            let chars: Vec<char> = paragraph.chars().collect();
            let mut start = 0;
            while start < chars.len() {
                let end = (start + max_chunk_size).min(chars.len());
                chunks.push(chars[start..end].iter().collect());
                start = end;
            }
        } else if buffer.is_empty() {
            buffer.push_str(&paragraph);
            buffer_len = paragraph_len;
        } else if buffer_len + paragraph_len + 1 > max_chunk_size {
            chunks.push(std::mem::take(&mut buffer));
            buffer.push_str(&paragraph);
            buffer_len = paragraph_len;
        } else {
            buffer.push_str("\n\n");
            buffer.push_str(&paragraph);
            buffer_len += 2 + paragraph_len;
        }
    }

    if !buffer.is_empty() {
        chunks.push(buffer);
    }

    chunks
}

/// Paragraph boundaries are runs of one or more whitespace-only lines.
fn paragraphs(text: &str) -> Vec<String> {
    let mut result = Vec::new();
    let mut current: Vec<&str> = Vec::new();

    for line in text.lines() {
        if line.trim().is_empty() {
            if !current.is_empty() {
                result.push(current.join("\n"));
                current.clear();
            }
        } else {
            current.push(line);
        }
    }

    if !current.is_empty() {
        result.push(current.join("\n"));
    }

    result
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_input_yields_no_chunks() {
        assert!(split_into_chunks("", 1000).is_empty());
    }

    #[test]
    fn short_paragraphs_pack_into_one_chunk() {
        let chunks = split_into_chunks("a\n\nb", 1000);
        assert_eq!(chunks, vec!["a\n\nb".to_string()]);
    }

    #[test]
    fn oversized_paragraph_is_sliced_at_exact_size() {
        let paragraph = "x".repeat(2500);
        let chunks = split_into_chunks(&paragraph, 1000);

        assert_eq!(chunks.len(), 3);
        assert_eq!(chunks[0].chars().count(), 1000);
        assert_eq!(chunks[1].chars().count(), 1000);
        assert_eq!(chunks[2].chars().count(), 500);
    }

    #[test]
    fn oversized_paragraph_flushes_accumulated_buffer_first() {
        let text = format!("intro\n\n{}", "y".repeat(1200));
        let chunks = split_into_chunks(&text, 1000);

        assert_eq!(chunks.len(), 3);
        assert_eq!(chunks[0], "intro");
        assert_eq!(chunks[1].chars().count(), 1000);
        assert_eq!(chunks[2].chars().count(), 200);
    }

    #[test]
    fn exceeding_the_limit_starts_a_new_chunk() {
        let first = "a".repeat(600);
        let second = "b".repeat(600);
        let chunks = split_into_chunks(&format!("{first}\n\n{second}"), 1000);

        assert_eq!(chunks, vec![first, second]);
    }

    #[test]
    fn exactly_full_paragraph_never_emits_an_empty_chunk() {
        let paragraph = "z".repeat(1000);
        let chunks = split_into_chunks(&paragraph, 1000);
        assert_eq!(chunks, vec![paragraph]);
    }

    #[test]
    fn whitespace_only_lines_are_paragraph_boundaries() {
        let chunks = split_into_chunks("a\n   \nb", 1000);
        assert_eq!(chunks, vec!["a\n\nb".to_string()]);
    }

    #[test]
    fn splitting_is_deterministic() {
        let text = "first paragraph\n\nsecond paragraph\n\nthird";
        assert_eq!(
            split_into_chunks(text, 25),
            split_into_chunks(text, 25)
        );
    }

    #[test]
    fn chunk_sizes_count_chars_not_bytes() {
        let paragraph = "é".repeat(1500);
        let chunks = split_into_chunks(&paragraph, 1000);

        assert_eq!(chunks.len(), 2);
        assert_eq!(chunks[0].chars().count(), 1000);
        assert_eq!(chunks[1].chars().count(), 500);
    }
}
