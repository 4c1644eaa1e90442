/// Splits `text` into pieces of at most `max_chunk_chars` characters.
///
/// Boundaries fall on character counts, not on words or paragraphs, so a
/// chunk seam may cut a sentence in half.
pub fn chunk_text(text: &str, max_chunk_chars: usize) -> Vec<String> {
    let max_chunk_chars = max_chunk_chars.max(1);
    let mut chunks = Vec::new();
    let mut current = String::new();
    let mut current_chars = 0usize;

    for ch in text.chars() {
        if current_chars == max_chunk_chars {
            chunks.push(std::mem::take(&mut current));
            current_chars = 0;
        }
        current.push(ch);
        current_chars += 1;
    }

    if !current.is_empty() {
        chunks.push(current);
    }

    chunks
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn creates_multiple_chunks() {
        let body = "a".repeat(9000);
        let chunks = chunk_text(&body, 4500);
        assert_eq!(chunks.len(), 2);
        assert!(chunks.iter().all(|chunk| chunk.len() == 4500));
    }

    #[test]
    fn counts_characters_not_bytes() {
        let body = "मौसम".repeat(3);
        let chunks = chunk_text(&body, 5);
        assert_eq!(chunks.len(), 3);
        assert_eq!(chunks.concat(), body);
        assert!(chunks.iter().all(|chunk| chunk.chars().count() <= 5));
    }

    #[test]
    fn short_text_is_one_chunk() {
        assert_eq!(chunk_text("hello", 4500), vec!["hello".to_string()]);
        assert!(chunk_text("", 4500).is_empty());
    }
}
