use crate::enrich::parser::Section;
use crate::model::Platform;

pub const CONTENT_TYPES: [&str; 8] = [
    "Personal",
    "News",
    "Promotional",
    "Educational",
    "Entertainment",
    "Opinion",
    "Question",
    "Announcement",
];

pub const TOPIC_MAX_WORDS: usize = 15;

/// Summary word budget scales with the input length.
pub fn summary_word_budget(word_count: usize) -> usize {
    match word_count {
        0..=19 => 30,
        20..=49 => 50,
        _ => 100,
    }
}

/// Build the analyzer prompt. Sections are requested in [`Section::ALL`] order.
pub fn build_prompt(text: &str, platform: Platform, handle: &str) -> String {
    let words = text.split_whitespace().count();
    let budget = summary_word_budget(words);
    let noun = platform.item_noun();
    let name = platform.display_name();

    let instructions = Section::ALL
        .iter()
        .enumerate()
        .map(|(i, s)| format!("{}. {}: {}", i + 1, s.label(), instruction(*s, budget)))
        .collect::<Vec<_>>()
        .join("\n");
    let format_lines = Section::ALL
        .iter()
        .map(|s| format!("{}: [{}]", s.label(), s.label().to_lowercase().replace('_', " ")))
        .collect::<Vec<_>>()
        .join("\n");

    format!(
        "Analyze this {name} {noun} from @{handle} and provide:\n\n\
         {instructions}\n\n\
         Respond using exactly these labels, each at the start of a line:\n\
         {format_lines}\n\n\
         {name} {noun} content:\n\
         {text}\n"
    )
}

fn instruction(section: Section, summary_budget: usize) -> String {
    match section {
        Section::Summary => format!(
            "A concise summary of the main message in at most {summary_budget} words"
        ),
        Section::Topic => format!("The main topic or theme in at most {TOPIC_MAX_WORDS} words"),
        Section::Sentiment => "Exactly one of Positive, Negative or Neutral".to_string(),
        Section::ContentType => format!("Exactly one of {}", CONTENT_TYPES.join(", ")),
        Section::EngagementPotential => {
            "A single number from 1 to 10 rating the likely engagement".to_string()
        }
        Section::KeyThemes => "3-5 key themes, comma separated".to_string(),
    }
}
