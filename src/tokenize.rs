use std::sync::LazyLock;

use regex::Regex;

// Unicode-aware: letters, digits, marks and connector punctuation (`_`) are word characters.
static NON_WORD: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\W+").expect("static pattern is valid"));

///Splits raw document text into word tokens.
///Splits on every maximal run of non-word characters and drops the empty pieces left at the
///string boundaries. Case is preserved; see [`lowercase_all`].
/// # Example
/// ```
/// use corpus_stats::tokenize;
/// let tokens = tokenize("(_test] {Test2!=");
/// assert_eq!(tokens, vec!["_test".to_string(), "Test2".to_string()]);
/// ```
pub fn tokenize(content: &str) -> Vec<String> {
    NON_WORD
        .split(content)
        .filter(|t| !t.is_empty())
        .map(String::from)
        .collect()
}

///Lowercases every token in place. Applied once, after all documents are concatenated.
/// # Example
/// ```
/// use corpus_stats::lowercase_all;
/// let tokens = lowercase_all(vec!["The".to_string(), "CAT".to_string()]);
/// assert_eq!(tokens, vec!["the".to_string(), "cat".to_string()]);
/// ```
pub fn lowercase_all(tokens: Vec<String>) -> Vec<String> {
    tokens.into_iter().map(|t| t.to_lowercase()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn splits_on_punctuation_runs() {
        let tokens = tokenize("The cat -- sat, on the mat!");
        assert_eq!(tokens, vec!["The", "cat", "sat", "on", "the", "mat"]);
    }

    #[test]
    fn boundary_separators_produce_no_empty_tokens() {
        assert!(tokenize("").is_empty());
        assert!(tokenize("  ...  ").is_empty());
        assert_eq!(tokenize("...word..."), vec!["word"]);
    }

    #[test]
    fn keeps_digits_underscores_and_non_ascii_letters() {
        let tokens = tokenize("snake_case 1984 Café naïve");
        assert_eq!(tokens, vec!["snake_case", "1984", "Café", "naïve"]);
    }

    #[test]
    fn apostrophes_split_words() {
        assert_eq!(tokenize("don't"), vec!["don", "t"]);
    }

    #[test]
    fn lowercasing_is_separate_from_tokenizing() {
        let tokens = tokenize("Whale WHALE whale");
        assert_eq!(tokens, vec!["Whale", "WHALE", "whale"]);
        assert_eq!(lowercase_all(tokens), vec!["whale"; 3]);
    }
}
