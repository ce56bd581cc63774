use anyhow::{Context, Result};
use std::path::Path;

const CONFIG_TEMPLATE: &str = r#"# qr configuration
#
# Credentials are read from environment variables (or a .env file) by default:
#   GEMINI_API_KEY            language model
#   BRAVE_API_KEY / BRAVE_KEY search provider
# You can also set them directly in this file (not recommended).

# ── Language model ───────────────────────────────────────────────
[provider]
# api_key = "AIza..."
# base_url = "https://generativelanguage.googleapis.com/v1beta"

# ── Search provider ──────────────────────────────────────────────
[search]
# api_key = "BSA..."
# endpoint = "https://api.search.brave.com/res/v1/web/search"
timeout_secs = 20

# ── Research pipeline ────────────────────────────────────────────
[research]
query_model = "gemini-2.5-flash-lite"
query_max_tokens = 100
summary_model = "gemini-2.5-flash-lite"
summary_max_tokens = 500
content_limit = 5000        # characters of page text per result in the summary prompt
fast_count = 1
wide_count = 5
fetch_timeout_secs = 30
llm_timeout_secs = 60
max_concurrent_fetches = 5
fallback_to_input = false   # use the task text as query when extraction fails
"#;

/// Write the config template to `path`. Refuses to overwrite unless `force`.
pub fn run(path: &Path, force: bool) -> Result<()> {
    if path.exists() && !force {
        anyhow::bail!(
            "Config file already exists: {} (use --force to overwrite)",
            path.display()
        );
    }

    if let Some(dir) = path.parent() {
        std::fs::create_dir_all(dir)
            .with_context(|| format!("Failed to create config directory: {}", dir.display()))?;
    }

    std::fs::write(path, CONFIG_TEMPLATE)
        .with_context(|| format!("Failed to write {}", path.display()))?;

    println!("Created {}", path.display());
    println!("\nSet GEMINI_API_KEY and BRAVE_API_KEY, then try:");
    println!("  qr \"find the current population of Tokyo\"");
    Ok(())
}
