use once_cell::sync::Lazy;
use regex::Regex;

/// A run of non-terminal text followed by one or more terminal marks
static SENTENCE_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"[^.!?]*[.!?]+").unwrap());

/// Split `buffer` into fully delimited sentences and the undelimited remainder.
///
/// Terminators stay attached to their sentence and consecutive terminators (`?!`, `...`)
/// count as one. Sentences are trimmed and empty ones are skipped.
pub fn split_sentences(buffer: &str) -> (Vec<String>, &str) {
    let mut sentences = Vec::new();
    let mut consumed = 0;

    for found in SENTENCE_RE.find_iter(buffer) {
        consumed = found.end();
        let sentence = found.as_str().trim();
        if !sentence.is_empty() {
            sentences.push(sentence.to_string());
        }
    }

    (sentences, &buffer[consumed..])
}
