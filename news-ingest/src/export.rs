use crate::config::ExportConfig;
use crate::rss_utils::files::{sanitize_component, timestamp_suffix};
use crate::types::{IngestError, NewsItem, Result};
use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};
use std::fmt::Display;
use std::fs::{self, OpenOptions};
use std::path::{Path, PathBuf};
use tracing::info;

pub const DEFAULT_TABULAR_DIR: &str = "news_data";
pub const DEFAULT_MARKDOWN_DIR: &str = "article_summaries";

/// One exported spreadsheet row; column order is the field order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TabularRow {
    pub title: String,
    pub link: String,
    pub published: String,
    pub summary: String,
    pub source: String,
}

impl From<&NewsItem> for TabularRow {
    fn from(item: &NewsItem) -> Self {
        Self {
            title: item.title.clone(),
            link: item.link.to_string(),
            published: item.published.clone(),
            summary: item.summary.clone(),
            source: item.source.clone().unwrap_or_default(),
        }
    }
}

fn export_failed(path: &Path, reason: impl Display) -> IngestError {
    IngestError::ExportFailed {
        path: path.to_path_buf(),
        reason: reason.to_string(),
    }
}

fn ensure_dir(dir: &Path) -> Result<()> {
    fs::create_dir_all(dir).map_err(|e| export_failed(dir, e))
}

/// Writes aggregated items to files. Holds only the target directories, so
/// repeated calls are independent of each other.
#[derive(Debug, Clone)]
pub struct Exporter {
    tabular_dir: PathBuf,
    markdown_dir: PathBuf,
}

impl Default for Exporter {
    fn default() -> Self {
        Self::new(DEFAULT_TABULAR_DIR, DEFAULT_MARKDOWN_DIR)
    }
}

impl Exporter {
    pub fn new(tabular_dir: impl Into<PathBuf>, markdown_dir: impl Into<PathBuf>) -> Self {
        Self {
            tabular_dir: tabular_dir.into(),
            markdown_dir: markdown_dir.into(),
        }
    }

    pub fn from_config(config: &ExportConfig) -> Self {
        Self::new(&config.tabular_dir, &config.markdown_dir)
    }

    /// Writes `{category}_news_{timestamp}.csv` into the tabular directory.
    /// The timestamp has one-second resolution; an existing file of the same
    /// name is never overwritten and the export fails instead.
    pub fn export_tabular(&self, items: &[NewsItem], category: &str) -> Result<PathBuf> {
        self.export_tabular_at(items, category, Local::now())
    }

    pub fn export_tabular_at(
        &self,
        items: &[NewsItem],
        category: &str,
        at: DateTime<Local>,
    ) -> Result<PathBuf> {
        ensure_dir(&self.tabular_dir)?;
        let path = self.tabular_dir.join(format!(
            "{}_news_{}.csv",
            sanitize_component(category),
            timestamp_suffix(&at)
        ));

        let file = OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&path)
            .map_err(|e| export_failed(&path, e))?;
        let mut writer = csv::Writer::from_writer(file);
        for item in items {
            writer
                .serialize(TabularRow::from(item))
                .map_err(|e| export_failed(&path, e))?;
        }
        if items.is_empty() {
            // serialize() emits the header with the first record only
            writer
                .write_record(["title", "link", "published", "summary", "source"])
                .map_err(|e| export_failed(&path, e))?;
        }
        writer.flush().map_err(|e| export_failed(&path, e))?;

        info!("Exported {} items to {}", items.len(), path.display());
        Ok(path)
    }

    /// Writes a Markdown report. Without `filename` the report goes to
    /// `articles_{timestamp}.md`; a bare filename lands in the markdown
    /// directory and a path with a directory component is used as given.
    pub fn export_markdown(&self, items: &[NewsItem], filename: Option<&str>) -> Result<PathBuf> {
        self.export_markdown_at(items, filename, Local::now())
    }

    pub fn export_markdown_at(
        &self,
        items: &[NewsItem],
        filename: Option<&str>,
        at: DateTime<Local>,
    ) -> Result<PathBuf> {
        let path = match filename {
            None => self
                .markdown_dir
                .join(format!("articles_{}.md", timestamp_suffix(&at))),
            Some(name) => {
                let given = Path::new(name);
                let has_dir = given
                    .parent()
                    .map_or(false, |parent| !parent.as_os_str().is_empty());
                if has_dir {
                    given.to_path_buf()
                } else {
                    self.markdown_dir.join(given)
                }
            }
        };

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            ensure_dir(parent)?;
        }

        fs::write(&path, render_markdown(items, at)).map_err(|e| export_failed(&path, e))?;

        info!("Exported {} articles to {}", items.len(), path.display());
        Ok(path)
    }
}

pub fn render_markdown(items: &[NewsItem], generated_at: DateTime<Local>) -> String {
    let mut out = String::new();
    out.push_str("# Collected Articles Summary\n\n");
    out.push_str(&format!(
        "Generated on: {}\n\n",
        generated_at.format("%Y-%m-%d %H:%M:%S")
    ));

    for (index, item) in items.iter().enumerate() {
        out.push_str(&format!("## {}. {}\n\n", index + 1, item.title));
        out.push_str(&format!("- **Published:** {}\n", item.published));
        out.push_str(&format!("- **Link:** {}\n", item.link));
        if let Some(source) = &item.source {
            out.push_str(&format!("- **Source:** {}\n", source));
        }
        out.push('\n');

        if !item.summary.is_empty() {
            out.push_str(&format!("### Summary:\n\n{}\n\n", item.summary));
        }

        if index + 1 < items.len() {
            out.push_str("---\n\n");
        }
    }

    out
}

/// Reads a tabular export back, in file order.
pub fn read_tabular(path: &Path) -> Result<Vec<TabularRow>> {
    let mut reader = csv::Reader::from_path(path)?;
    let rows = reader
        .deserialize()
        .collect::<std::result::Result<Vec<TabularRow>, csv::Error>>()?;
    Ok(rows)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use url::Url;

    fn item(n: usize, summary: &str) -> NewsItem {
        NewsItem {
            title: format!("Story {}, with \"quotes\"", n),
            link: Url::parse(&format!("https://news.example.com/{}", n)).unwrap(),
            published: "Wed, 10 Jan 2024 07:00:00 GMT".to_string(),
            summary: summary.to_string(),
            source: None,
        }
    }

    fn at() -> DateTime<Local> {
        Local.with_ymd_and_hms(2024, 1, 10, 12, 0, 0).unwrap()
    }

    #[test]
    fn tabular_round_trip_keeps_links_in_order() {
        let dir = tempfile::tempdir().unwrap();
        let exporter = Exporter::new(dir.path().join("news_data"), dir.path().join("md"));
        let items: Vec<NewsItem> = (1..=3).map(|n| item(n, "multi\nline, summary")).collect();

        let path = exporter.export_tabular_at(&items, "reddit", at()).unwrap();

        assert_eq!(
            path.file_name().unwrap().to_str().unwrap(),
            "reddit_news_20240110_120000.csv"
        );
        let rows = read_tabular(&path).unwrap();
        let links: Vec<&str> = rows.iter().map(|row| row.link.as_str()).collect();
        assert_eq!(
            links,
            vec![
                "https://news.example.com/1",
                "https://news.example.com/2",
                "https://news.example.com/3"
            ]
        );
        assert_eq!(rows[0].title, items[0].title);
        assert_eq!(rows[0].summary, "multi\nline, summary");
    }

    #[test]
    fn tabular_export_of_nothing_still_has_header() {
        let dir = tempfile::tempdir().unwrap();
        let exporter = Exporter::new(dir.path(), dir.path());

        let path = exporter.export_tabular_at(&[], "all", at()).unwrap();

        let content = fs::read_to_string(&path).unwrap();
        assert_eq!(content.trim_end(), "title,link,published,summary,source");
        assert!(read_tabular(&path).unwrap().is_empty());
    }

    #[test]
    fn markdown_layout_numbers_items_and_separates_them() {
        let items = vec![item(1, "First summary"), item(2, "")];

        let markdown = render_markdown(&items, at());

        assert!(markdown.starts_with("# Collected Articles Summary\n\nGenerated on: 2024-01-10 12:00:00\n\n"));
        assert!(markdown.contains("## 1. Story 1, with \"quotes\"\n\n- **Published:** Wed, 10 Jan 2024 07:00:00 GMT\n- **Link:** https://news.example.com/1\n\n### Summary:\n\nFirst summary\n\n---\n\n## 2."));
        assert_eq!(markdown.matches("---").count(), 1);
        assert_eq!(markdown.matches("### Summary:").count(), 1);
        assert!(!markdown.trim_end().ends_with("---"));
    }

    #[test]
    fn markdown_lists_source_when_present() {
        let mut sourced = item(1, "Body");
        sourced.source = Some("Reuters".to_string());

        let markdown = render_markdown(&[sourced, item(2, "")], at());

        assert!(markdown.contains("- **Link:** https://news.example.com/1\n- **Source:** Reuters\n\n### Summary:"));
        assert_eq!(markdown.matches("- **Source:**").count(), 1);
    }

    #[test]
    fn tabular_export_never_overwrites_same_second_file() {
        let dir = tempfile::tempdir().unwrap();
        let exporter = Exporter::new(dir.path(), dir.path());

        let first = exporter.export_tabular_at(&[item(1, "s")], "reddit", at()).unwrap();
        let second = exporter.export_tabular_at(&[item(2, "t"), item(3, "u")], "reddit", at());

        match second {
            Err(IngestError::ExportFailed { path, .. }) => assert_eq!(path, first),
            other => panic!("expected ExportFailed, got {:?}", other),
        }
        let rows = read_tabular(&first).unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].link, "https://news.example.com/1");
    }

    #[test]
    fn markdown_filename_rules() {
        let dir = tempfile::tempdir().unwrap();
        let md_dir = dir.path().join("article_summaries");
        let exporter = Exporter::new(dir.path().join("news_data"), &md_dir);
        let items = vec![item(1, "s")];

        let default_path = exporter.export_markdown_at(&items, None, at()).unwrap();
        assert_eq!(default_path, md_dir.join("articles_20240110_120000.md"));

        let bare = exporter.export_markdown_at(&items, Some("digest.md"), at()).unwrap();
        assert_eq!(bare, md_dir.join("digest.md"));

        let explicit = dir.path().join("elsewhere").join("report.md");
        let explicit_str = explicit.to_str().unwrap();
        let written = exporter.export_markdown_at(&items, Some(explicit_str), at()).unwrap();
        assert_eq!(written, explicit);
        assert!(fs::read_to_string(&explicit).unwrap().contains("## 1. Story 1"));
    }

    #[test]
    fn export_does_not_touch_input() {
        let dir = tempfile::tempdir().unwrap();
        let exporter = Exporter::new(dir.path(), dir.path());
        let items = vec![item(1, "s"), item(2, "t")];
        let before = items.clone();

        exporter.export_tabular_at(&items, "general", at()).unwrap();
        exporter.export_markdown_at(&items, Some("one.md"), at()).unwrap();
        exporter.export_markdown_at(&items, Some("two.md"), at()).unwrap();

        assert_eq!(items, before);
        assert!(dir.path().join("one.md").exists());
        assert!(dir.path().join("two.md").exists());
    }

    #[test]
    fn unwritable_target_is_export_failed() {
        let dir = tempfile::tempdir().unwrap();
        let blocker = dir.path().join("not_a_dir");
        fs::write(&blocker, "occupied").unwrap();
        let exporter = Exporter::new(&blocker, &blocker);

        let result = exporter.export_tabular_at(&[item(1, "s")], "all", at());

        match result {
            Err(IngestError::ExportFailed { path, .. }) => assert!(path.starts_with(&blocker)),
            other => panic!("expected ExportFailed, got {:?}", other),
        }
        assert!(matches!(
            exporter.export_markdown_at(&[item(1, "s")], None, at()),
            Err(IngestError::ExportFailed { .. })
        ));
    }
}
