use crate::types::{IngestError, RawEntry, Result};
use feed_rs::model::Entry;
use feed_rs::parser;
use quick_xml::events::Event;
use quick_xml::Reader;
use tracing::{debug, info};

/// Turns syndication documents (RSS, Atom, JSON Feed) into [`RawEntry`] records.
///
/// `feed-rs` does the format-tolerant parse. A second lightweight pass over
/// the XML keeps what `feed-rs` normalizes away: the timestamp text as
/// written by the publisher and the RSS `<source>` outlet name.
pub struct FeedParser;

/// Per-entry markup that `feed-rs` does not expose verbatim.
#[derive(Debug, Clone, Default, PartialEq)]
struct EntryMarkup {
    published: Option<String>,
    source: Option<String>,
}

impl FeedParser {
    pub fn parse_entries(content: &[u8]) -> Result<Vec<RawEntry>> {
        Self::parse_entries_at(content, None)
    }

    /// Like [`parse_entries`](Self::parse_entries), resolving relative links
    /// against `base_url` (normally the URL the feed was fetched from).
    pub fn parse_entries_at(content: &[u8], base_url: Option<&str>) -> Result<Vec<RawEntry>> {
        debug!("Parsing feed content ({} bytes)", content.len());

        let feed = parser::Builder::new()
            .base_uri(base_url)
            .build()
            .parse(content)
            .map_err(|e| IngestError::Parse(format!("Failed to parse feed: {}", e)))?;

        let markup = scan_entry_markup(content);
        let aligned = markup.len() == feed.entries.len();
        if !aligned && !markup.is_empty() {
            debug!(
                "Entry markup does not line up with parsed entries ({} vs {}), using parsed values only",
                markup.len(),
                feed.entries.len()
            );
        }

        let entries: Vec<RawEntry> = feed
            .entries
            .into_iter()
            .enumerate()
            .map(|(index, entry)| {
                let extra = if aligned { markup.get(index) } else { None };
                Self::convert_entry(entry, extra)
            })
            .collect();

        info!("Parsed feed with {} entries", entries.len());
        Ok(entries)
    }

    fn convert_entry(entry: Entry, markup: Option<&EntryMarkup>) -> RawEntry {
        // Atom entries can carry several links; the alternate one points at the article.
        let link = entry
            .links
            .iter()
            .find(|link| link.rel.as_deref().map_or(true, |rel| rel == "alternate"))
            .or_else(|| entry.links.first())
            .map(|link| link.href.clone());

        let summary = entry
            .summary
            .map(|text| text.content)
            .or_else(|| entry.content.and_then(|content| content.body));

        RawEntry {
            title: entry.title.map(|text| text.content),
            link,
            published_text: markup.and_then(|m| m.published.clone()),
            published: entry.published,
            summary,
            source: markup.and_then(|m| m.source.clone()).or(entry.source),
        }
    }
}

fn is_entry_element(name: &[u8]) -> bool {
    name == b"item" || name == b"entry"
}

/// Collects timestamp text and outlet names for every `<item>`/`<entry>`, in
/// document order. Returns whatever was collected if the markup is broken;
/// `feed-rs` reports the real error.
fn scan_entry_markup(content: &[u8]) -> Vec<EntryMarkup> {
    let mut reader = Reader::from_reader(content);
    reader.trim_text(true);

    let mut buf = Vec::new();
    let mut entries = Vec::new();
    let mut current: Option<EntryMarkup> = None;
    // local names of the open elements below the current entry
    let mut path: Vec<Vec<u8>> = Vec::new();
    let mut text = String::new();

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(element)) => {
                let name = element.local_name().as_ref().to_vec();
                if current.is_none() {
                    if is_entry_element(&name) {
                        current = Some(EntryMarkup::default());
                        path.clear();
                    }
                } else {
                    path.push(name);
                    text.clear();
                }
            }
            Ok(Event::Text(chunk)) if current.is_some() => {
                if let Ok(unescaped) = chunk.unescape() {
                    text.push_str(&unescaped);
                }
            }
            Ok(Event::CData(chunk)) if current.is_some() => {
                text.push_str(&String::from_utf8_lossy(&chunk));
            }
            Ok(Event::End(_)) if current.is_some() => {
                if path.is_empty() {
                    if let Some(markup) = current.take() {
                        entries.push(markup);
                    }
                    buf.clear();
                    continue;
                }

                let value = text.trim().to_string();
                if let Some(markup) = current.as_mut() {
                    record_field(markup, &path, value);
                }
                path.pop();
                text.clear();
            }
            Ok(Event::Eof) | Err(_) => break,
            Ok(_) => {}
        }
        buf.clear();
    }

    entries
}

fn record_field(markup: &mut EntryMarkup, path: &[Vec<u8>], value: String) {
    if value.is_empty() {
        return;
    }

    let names: Vec<&[u8]> = path.iter().map(|name| name.as_slice()).collect();
    match names.as_slice() {
        [b"pubDate"] | [b"published"] | [b"date"] if markup.published.is_none() => {
            markup.published = Some(value);
        }
        // RSS: <source url="...">Outlet</source>; Atom: <source><title>Outlet</title></source>
        [b"source"] | [b"source", b"title"] if markup.source.is_none() => {
            markup.source = Some(value);
        }
        _ => {}
    }
}
