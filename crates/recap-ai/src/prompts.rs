// Prompt templates for weekly and monthly summaries. Placeholders in braces
// are substituted by the builders below.

use chrono::NaiveDate;

use recap_types::dates::{format_month_range, format_week_range, parse_week_key};
use recap_types::models::{GeneratedEmail, Message};

/// Separator between notes and between weekly emails in a prompt.
pub const ENTRY_SEPARATOR: &str = "\n\n---\n\n";

/// Shape the model must answer with. Shared by both prompts.
pub const JSON_SHAPE_INSTRUCTION: &str = r#"Return the response in the following JSON format:
{
  "subject": "{subject_hint}",
  "content": "Full email content with proper formatting",
  "sections": {
    "wins": ["win 1", "win 2"],
    "challenges": ["challenge 1", "challenge 2"],
    "neverSettles": ["improvement 1", "improvement 2"],
    "upcoming": ["upcoming item 1", "upcoming item 2"]
  }
}"#;

pub const WEEKLY_PROMPT_TEMPLATE: &str = r#"You are an AI assistant helping to generate a professional weekly update email.

Based on the following raw messages and notes from the week of {week_range}, please generate a structured weekly update email with the following sections:

**WINS**: Key achievements, successes, and positive outcomes from the week
**CHALLENGES**: Difficulties faced, obstacles encountered, or problems that needed solving
**NEVER SETTLES**: Areas where continuous improvement efforts were made, learning opportunities, or initiatives for excellence
**UPCOMING**: Plans, goals, or important items for the following week

Each note is prefixed with the tag its author gave it.

Raw messages and notes:
{messages}

Please format the response as a professional email with:
1. A clear subject line
2. Well-organized sections with bullet points
3. Professional but friendly tone
4. Concise but informative content

{json_shape}
"#;

pub const MONTHLY_PROMPT_TEMPLATE: &str = r#"You are an AI assistant helping to generate a comprehensive monthly update email.

Based on the following weekly update emails from {month_range}, please generate a consolidated monthly update that summarizes the entire month's activities.

Weekly updates:
{weekly_emails}

Please create a monthly summary that:
1. Consolidates major wins and achievements across all weeks
2. Summarizes key challenges and how they were addressed
3. Highlights continuous improvement efforts and learning
4. Outlines major upcoming initiatives for the next month
5. Provides a high-level overview of the month's progress

{json_shape}
"#;

pub fn weekly_subject(week: NaiveDate) -> String {
    format!("Weekly Update - {}", format_week_range(week))
}

pub fn monthly_subject(month: NaiveDate) -> String {
    format!("Monthly Update - {}", format_month_range(month))
}

pub fn build_weekly_prompt(week: NaiveDate, messages: &[Message]) -> String {
    let notes = messages
        .iter()
        .map(|m| format!("[{}] {}", m.tag.label(), m.content.trim()))
        .collect::<Vec<_>>()
        .join(ENTRY_SEPARATOR);

    // User text goes in last so it is never scanned for placeholders.
    WEEKLY_PROMPT_TEMPLATE
        .replace(
            "{json_shape}",
            &JSON_SHAPE_INSTRUCTION.replace("{subject_hint}", "Weekly Update - [Week Range]"),
        )
        .replace("{week_range}", &format_week_range(week))
        .replace("{messages}", &notes)
}

pub fn build_monthly_prompt(month: NaiveDate, weekly_emails: &[GeneratedEmail]) -> String {
    let weeks = weekly_emails
        .iter()
        .enumerate()
        .map(|(i, email)| {
            let range = email
                .week_of
                .as_deref()
                .and_then(|w| parse_week_key(w).ok())
                .map(format_week_range)
                .unwrap_or_else(|| "Unknown".to_string());
            format!("Week {} ({}):\n{}", i + 1, range, email.content)
        })
        .collect::<Vec<_>>()
        .join(ENTRY_SEPARATOR);

    MONTHLY_PROMPT_TEMPLATE
        .replace(
            "{json_shape}",
            &JSON_SHAPE_INSTRUCTION.replace("{subject_hint}", "Monthly Update - [Month Year]"),
        )
        .replace("{month_range}", &format_month_range(month))
        .replace("{weekly_emails}", &weeks)
}
