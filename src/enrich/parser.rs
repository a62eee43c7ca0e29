//! Line-oriented parser for analyzer responses.
//!
//! Grammar:
//! - A header is a line whose first token is one of the six labels followed
//!   by `:`. List markers (`1.`, `-`, `*`) and markdown emphasis around the
//!   label are tolerated. Text after the colon is the first content line.
//! - Any other non-blank line is a continuation of the current section and
//!   is joined with a single space. Blank lines are skipped.
//! - Lines before the first header are ignored.
//! - A repeated header restarts its section.

use once_cell::sync::OnceCell;
use regex::Regex;

use crate::error::EnrichError;
use crate::model::{Sentiment, DEFAULT_CONTENT_TYPE, DEFAULT_ENGAGEMENT};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Section {
    Summary,
    Topic,
    Sentiment,
    ContentType,
    EngagementPotential,
    KeyThemes,
}

impl Section {
    /// Prompt and response order.
    pub const ALL: [Section; 6] = [
        Section::Summary,
        Section::Topic,
        Section::Sentiment,
        Section::ContentType,
        Section::EngagementPotential,
        Section::KeyThemes,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            Section::Summary => "SUMMARY",
            Section::Topic => "TOPIC",
            Section::Sentiment => "SENTIMENT",
            Section::ContentType => "CONTENT_TYPE",
            Section::EngagementPotential => "ENGAGEMENT_POTENTIAL",
            Section::KeyThemes => "KEY_THEMES",
        }
    }

    fn index(&self) -> usize {
        *self as usize
    }
}

/// Raw accumulated text per section. `None` means the header never appeared.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Sections {
    slots: [Option<String>; 6],
}

impl Sections {
    pub fn get(&self, section: Section) -> Option<&str> {
        self.slots[section.index()].as_deref()
    }

    /// Section content when present and non-blank.
    pub fn text(&self, section: Section) -> Option<&str> {
        self.get(section).map(str::trim).filter(|s| !s.is_empty())
    }

    fn start(&mut self, section: Section, first: &str) {
        self.slots[section.index()] = Some(first.trim().to_string());
    }

    fn append(&mut self, section: Section, line: &str) {
        let slot = self.slots[section.index()].get_or_insert_with(String::new);
        if !slot.is_empty() {
            slot.push(' ');
        }
        slot.push_str(line.trim());
    }
}

/// Typed, validated response. Summary/topic may still be missing here; the
/// enricher fills them from the original text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedResponse {
    pub summary: Option<String>,
    pub topic: Option<String>,
    pub sentiment: Sentiment,
    pub content_type: String,
    pub engagement_potential: u8,
    pub key_themes: Vec<String>,
}

/// Split a response into sections.
pub fn split_sections(text: &str) -> Sections {
    let mut sections = Sections::default();
    let mut current: Option<Section> = None;

    for line in text.lines() {
        if line.trim().is_empty() {
            continue;
        }
        if let Some((section, rest)) = match_header(line) {
            sections.start(section, rest);
            current = Some(section);
        } else if let Some(section) = current {
            sections.append(section, line);
        }
    }

    sections
}

/// Parse and validate a full analyzer response.
pub fn parse_response(text: &str) -> Result<ParsedResponse, EnrichError> {
    if text.trim().is_empty() {
        return Err(EnrichError::EmptyResponse);
    }

    let sections = split_sections(text);
    let summary = sections.text(Section::Summary).map(str::to_string);
    let topic = sections.text(Section::Topic).map(str::to_string);
    if summary.is_none() && topic.is_none() {
        return Err(EnrichError::Unparseable);
    }

    Ok(ParsedResponse {
        summary,
        topic,
        sentiment: sections
            .text(Section::Sentiment)
            .and_then(Sentiment::from_label)
            .unwrap_or_default(),
        content_type: sections
            .text(Section::ContentType)
            .map(str::to_string)
            .unwrap_or_else(|| DEFAULT_CONTENT_TYPE.to_string()),
        engagement_potential: sections
            .text(Section::EngagementPotential)
            .and_then(parse_engagement)
            .unwrap_or(DEFAULT_ENGAGEMENT),
        key_themes: sections
            .text(Section::KeyThemes)
            .map(split_themes)
            .unwrap_or_default(),
    })
}

/// First integer token, accepted only inside `1..=10`.
pub fn parse_engagement(s: &str) -> Option<u8> {
    static RE: OnceCell<Regex> = OnceCell::new();
    let re = RE.get_or_init(|| Regex::new(r"\d+").unwrap());
    let n: u32 = re.find(s)?.as_str().parse().ok()?;
    (1..=10).contains(&n).then_some(n as u8)
}

pub fn split_themes(s: &str) -> Vec<String> {
    s.split(',')
        .map(|t| t.trim().trim_matches('*').trim())
        .filter(|t| !t.is_empty())
        .map(str::to_string)
        .collect()
}

fn match_header(line: &str) -> Option<(Section, &str)> {
    let stripped = strip_list_marker(line);
    Section::ALL.into_iter().find_map(|section| {
        let rest = stripped.strip_prefix(section.label())?;
        let rest = rest.trim_start_matches('*').strip_prefix(':')?;
        Some((section, rest.trim_start_matches('*')))
    })
}

fn strip_list_marker(line: &str) -> &str {
    let s = line.trim_start().trim_start_matches(['#', '*', '-', ' ']);
    let digits = s.chars().take_while(char::is_ascii_digit).count();
    if digits > 0 {
        if let Some(rest) = s[digits..].strip_prefix(['.', ')']) {
            return rest.trim_start().trim_start_matches('*');
        }
    }
    s
}
