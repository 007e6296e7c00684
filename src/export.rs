//! Saves the current answer or conversation as a standalone HTML page.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{anyhow, Result};

use crate::format::{self, escape_html, Density};
use crate::mode::Mode;
use crate::state::{ChatHistoryItem, ChatRole, Source};

/// Sources section markup; empty when there is nothing to cite
pub fn sources_html(sources: &[Source]) -> String {
    if sources.is_empty() {
        return String::new();
    }

    let mut html = String::from(
        "<div class=\"mt-8 pt-6 border-t border-gray-700\">\
         <h3 class=\"text-lg font-semibold text-gray-300 mb-4\">Sources</h3>\
         <div class=\"grid grid-cols-1 md:grid-cols-2 gap-4\">",
    );
    for source in sources {
        html.push_str(&format!(
            "<a href=\"{uri}\" target=\"_blank\" rel=\"noopener noreferrer\" class=\"source\">\
             <p class=\"source-title\">{title}</p><p class=\"source-uri\">{uri}</p></a>",
            uri = escape_html(&source.uri),
            title = escape_html(&source.title),
        ));
    }
    html.push_str("</div></div>");
    html
}

/// A single search result: the prompt, optional queried image, answer and sources
pub fn result_html(prompt: &str, image: Option<&str>, answer_text: &str, sources: &[Source]) -> String {
    let mut html = format!("<p class=\"prompt\">{}</p>", escape_html(prompt));
    if let Some(image) = image {
        html.push_str(&format!(
            "<p class=\"text-sm text-gray-400 mb-2 font-semibold\">Your Query Image:</p><p class=\"image\">{}</p>",
            escape_html(image)
        ));
    }
    html.push_str(&format!(
        "<div class=\"prose\">{}</div>",
        format::to_html(&format::parse(answer_text), Density::Roomy)
    ));
    html.push_str(&sources_html(sources));
    html
}

pub fn conversation_html(history: &[ChatHistoryItem]) -> String {
    let mut html = String::new();
    for item in history {
        let class = match (item.role, item.is_error) {
            (ChatRole::User, _) => "turn user",
            (ChatRole::Model, true) => "turn model error",
            (ChatRole::Model, false) => "turn model",
        };
        html.push_str(&format!(
            "<div class=\"{}\"><div class=\"prose\">{}</div>{}</div>",
            class,
            format::to_html(&format::parse(&item.text), Density::Compact),
            sources_html(&item.sources)
        ));
    }
    html
}

pub fn document(title: &str, body: &str) -> String {
    format!(
        "<!DOCTYPE html>\n<html lang=\"en\">\n<head>\n<meta charset=\"utf-8\">\n<title>{}</title>\n\
         <style>\nbody {{ font-family: sans-serif; max-width: 48rem; margin: 2rem auto; background: #111827; color: #d1d5db; }}\n\
         .turn {{ padding: 0.75rem; border-radius: 1rem; margin: 1rem 0; background: #374151; }}\n\
         .turn.user {{ background: #2563eb; color: #fff; margin-left: 20%; }}\n\
         .turn.error {{ background: #7f1d1d; color: #fecaca; border: 1px solid #ef4444; }}\n\
         .source {{ display: block; padding: 1rem; border: 1px solid #374151; border-radius: 0.5rem; text-decoration: none; }}\n\
         .source-title {{ color: #60a5fa; }}\n.source-uri {{ color: #6b7280; font-size: 0.875rem; }}\n\
         </style>\n</head>\n<body>\n<h1>{}</h1>\n{}\n</body>\n</html>\n",
        escape_html(title),
        escape_html(title),
        body
    )
}

/// Write `body` as an HTML document into `dir`, named after the mode and time
pub fn write_export(dir: &Path, mode: Mode, body: &str) -> Result<PathBuf> {
    fs::create_dir_all(dir)?;

    let stamp = chrono::Local::now().format("%Y%m%d-%H%M%S");
    let mut path = dir.join(format!("{}-{}.html", mode.as_str(), stamp));
    let mut n = 1;
    while path.exists() {
        path = dir.join(format!("{}-{}-{}.html", mode.as_str(), stamp, n));
        n += 1;
    }

    fs::write(&path, document(mode.label(), body))?;
    log::info!("Exported {} to {}", mode.label(), path.display());
    Ok(path)
}

pub fn export_dir() -> Result<PathBuf> {
    let data_dir = dirs::data_dir()
        .ok_or_else(|| anyhow!("Could not determine data directory"))?;
    Ok(data_dir.join("grounded-search").join("exports"))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn source(uri: &str, title: &str) -> Source {
        Source {
            uri: uri.to_string(),
            title: title.to_string(),
        }
    }

    #[test]
    fn test_no_sources_renders_nothing() {
        assert_eq!(sources_html(&[]), "");
        assert!(!result_html("q", None, "answer", &[]).contains("Sources"));
    }

    #[test]
    fn test_sources_render_one_entry_each_in_order() {
        let html = sources_html(&[
            source("https://b.example", "Bee"),
            source("https://a.example", "Ay"),
        ]);
        assert_eq!(html.matches("<a href=").count(), 2);
        let bee = html.find("Bee").unwrap();
        let ay = html.find("Ay").unwrap();
        assert!(bee < ay);
        assert!(html.contains("target=\"_blank\""));
    }

    #[test]
    fn test_conversation_marks_error_turns() {
        let history = vec![
            ChatHistoryItem::user("hi"),
            ChatHistoryItem::error("Failed to fetch"),
        ];
        let html = conversation_html(&history);
        assert!(html.contains("turn user"));
        assert!(html.contains("turn model error"));
    }

    #[test]
    fn test_result_shows_query_image() {
        let html = result_html("what?", Some("tower.jpg"), "**Eiffel**", &[]);
        assert!(html.contains("Your Query Image:"));
        assert!(html.contains("tower.jpg"));
        assert!(html.contains("<strong class=\"font-semibold text-white\">Eiffel</strong>"));
    }

    #[test]
    fn test_write_export_creates_unique_files() {
        let dir = tempfile::tempdir().unwrap();
        let first = write_export(dir.path(), Mode::Text, "<p>one</p>").unwrap();
        let second = write_export(dir.path(), Mode::Text, "<p>two</p>").unwrap();
        assert_ne!(first, second);

        let contents = std::fs::read_to_string(&first).unwrap();
        assert!(contents.starts_with("<!DOCTYPE html>"));
        assert!(contents.contains("<title>Text Search</title>"));
        assert!(contents.contains("<p>one</p>"));
    }
}
