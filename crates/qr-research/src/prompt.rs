//! Prompt text for the two model calls.
//!
//! Content truncation happens here and only here: the result set keeps the
//! full page text, and each prompt decides how much of it to show.

use qr_core::EnrichedResult;

pub const QUERY_SYSTEM_PROMPT: &str =
    "You are an assistant that extracts the user's search query from any given text.";

/// Placeholder shown for a result whose page could not be fetched.
pub const NO_CONTENT: &str = "No content available";

/// User prompt for query extraction. The task text is embedded verbatim.
pub fn query_prompt(task_text: &str) -> String {
    format!(
        "Extract the browser search query from the following text.\n\
         Provide only the query string without extra explanation.\n\n\
         Text: \"\"\"{}\"\"\"",
        task_text
    )
}

/// System instruction for summarization, parameterized by the query.
pub fn summary_system_prompt(query: &str) -> String {
    format!(
        "You are a helpful assistant that summarizes web search results clearly and concisely. \
         The starting request was {}, compose your summary based on that",
        query
    )
}

/// User prompt for summarization.
pub fn summary_prompt(query: &str, results: &[EnrichedResult], content_limit: usize) -> String {
    format!(
        "Please provide a concise summary of the following web search results:\n\
         {}\n\
         Provide a clear and informative summary that captures the key information from these results.",
        render_results(query, results, content_limit)
    )
}

/// Render the query and each result's title and (truncated) content.
pub fn render_results(query: &str, results: &[EnrichedResult], content_limit: usize) -> String {
    let mut out = format!("Search Query: {}\n\n", query);
    for result in results {
        let content = result
            .content
            .as_deref()
            .filter(|c| !c.is_empty())
            .map(|c| truncate_chars(c, content_limit))
            .unwrap_or(NO_CONTENT);
        out.push_str(&format!("Title: {}\n", result.title()));
        out.push_str(&format!("Content: {}\n\n", content));
    }
    out
}

/// Return at most the first `limit` characters of `text`.
pub fn truncate_chars(text: &str, limit: usize) -> &str {
    match text.char_indices().nth(limit) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use qr_core::SearchHit;

    fn result(title: &str, content: Option<&str>) -> EnrichedResult {
        EnrichedResult::new(
            SearchHit::new(title, format!("https://example.com/{}", title), "desc"),
            content.map(str::to_string),
        )
    }

    #[test]
    fn test_truncate_chars_ascii() {
        assert_eq!(truncate_chars("abcdef", 3), "abc");
        assert_eq!(truncate_chars("abc", 3), "abc");
        assert_eq!(truncate_chars("ab", 5), "ab");
        assert_eq!(truncate_chars("abc", 0), "");
    }

    #[test]
    fn test_truncate_chars_multibyte() {
        let text = "東京都の人口";
        assert_eq!(truncate_chars(text, 2), "東京");
        assert_eq!(truncate_chars(text, 2).chars().count(), 2);
    }

    #[test]
    fn test_query_prompt_embeds_text_verbatim() {
        let prompt = query_prompt("find the current population of Tokyo");
        assert!(prompt.contains("Text: \"\"\"find the current population of Tokyo\"\"\""));
        assert!(prompt.contains("Provide only the query string"));
    }

    #[test]
    fn test_render_results_placeholder_for_absent_content() {
        let rendered = render_results(
            "tokyo population",
            &[result("A", Some("Tokyo is big")), result("B", None)],
            5000,
        );
        assert!(rendered.starts_with("Search Query: tokyo population\n\n"));
        assert!(rendered.contains("Title: A\nContent: Tokyo is big\n\n"));
        assert!(rendered.contains("Title: B\nContent: No content available\n\n"));
    }

    #[test]
    fn test_render_results_truncates_content() {
        let long = "x".repeat(12_000);
        let rendered = render_results("q", &[result("Long", Some(&long))], 5000);
        let line = rendered
            .lines()
            .find(|l| l.starts_with("Content: "))
            .unwrap();
        assert_eq!(line.trim_start_matches("Content: ").len(), 5000);
    }

    #[test]
    fn test_summary_system_prompt_mentions_query() {
        let system = summary_system_prompt("current population of Tokyo");
        assert!(system.contains("The starting request was current population of Tokyo"));
    }
}
