//! # Rendering Module
//!
//! Turns a [`jotterapp::commands::CmdResult`] into terminal text. Renderers return `String`s and
//! never print; `commands.rs` decides what goes to stdout and stderr.
//!
//! ## List Layout
//!
//! Each listed item is one row:
//! - `pin` (2 chars): pin marker for pinned items, or empty
//! - `title` (fill): truncated to [`COL_TITLE`] display columns
//! - `tasks` (7 chars): completed/total for todo lists
//! - `time` (right-aligned): time since the last update
//! - `id`: what the other commands take as argument
//!
//! Widths are measured with `unicode-width`, so wide characters in titles do
//! not push the columns out of line.

use super::styles::STYLES;
use chrono::{DateTime, Utc};
use jotterapp::commands::{CmdMessage, MessageLevel};
use jotterapp::model::{AnyItem, ItemMeta, Note, Todo};
use unicode_width::{UnicodeWidthChar, UnicodeWidthStr};

pub const PIN_MARKER: &str = "⚲";
pub const COL_TITLE: usize = 48;
pub const COL_TASKS: usize = 7;
pub const COL_TIME: usize = 16;

/// Messages of the given levels, one per line.
pub fn render_messages(messages: &[CmdMessage], errors: bool) -> String {
    messages
        .iter()
        .filter(|m| (m.level == MessageLevel::Error) == errors)
        .map(|m| format!("{}\n", STYLES.for_level(m.level).apply_to(&m.content)))
        .collect()
}

/// One row per item. The page summary comes with the command's message.
pub fn render_list(items: &[AnyItem], now: DateTime<Utc>) -> String {
    items
        .iter()
        .map(|item| format!("{}\n", render_row(item, now)))
        .collect()
}

fn render_row(item: &AnyItem, now: DateTime<Utc>) -> String {
    let meta = item.meta();
    let pin = if meta.is_pinned {
        STYLES.pinned.apply_to(PIN_MARKER).to_string()
    } else {
        " ".to_string()
    };
    let title = pad_to_width(&truncate_to_width(&meta.title, COL_TITLE), COL_TITLE);
    let tasks = match item {
        AnyItem::Todo(todo) if !todo.tasks.is_empty() => {
            format!("[{}/{}]", todo.completed_count(), todo.tasks.len())
        }
        _ => String::new(),
    };
    let time = meta.recency().map(|t| format_time_ago(t, now)).unwrap_or_default();
    format!(
        "{} {}  {:<tasks_w$} {}  {}",
        pin,
        title,
        tasks,
        STYLES.time.apply_to(format!("{:>time_w$}", time, time_w = COL_TIME)),
        STYLES.muted.apply_to(&meta.id),
        tasks_w = COL_TASKS,
    )
}

/// Full view of one item.
pub fn render_item(item: &AnyItem, now: DateTime<Utc>) -> String {
    let mut out = render_header(item.meta(), now);
    match item {
        AnyItem::Note(note) => render_note_body(&mut out, note),
        AnyItem::Todo(todo) => render_todo_body(&mut out, todo),
    }
    out
}

fn render_header(meta: &ItemMeta, now: DateTime<Utc>) -> String {
    let mut line = String::new();
    if meta.is_pinned {
        line.push_str(&format!("{} ", STYLES.pinned.apply_to(PIN_MARKER)));
    }
    line.push_str(&STYLES.title.apply_to(&meta.title).to_string());
    let mut details = vec![format!("id {}", meta.id)];
    if meta.is_trash {
        details.push("in trash".to_string());
    } else if meta.is_archived {
        details.push("archived".to_string());
    }
    if let Some(t) = meta.recency() {
        details.push(format!("updated {}", format_time_ago(t, now)));
    }
    format!("{}\n{}\n", line, STYLES.muted.apply_to(details.join(" · ")))
}

fn render_note_body(out: &mut String, note: &Note) {
    let text = strip_tags(&note.content);
    if !text.trim().is_empty() {
        out.push('\n');
        out.push_str(text.trim_end());
        out.push('\n');
    }
}

fn render_todo_body(out: &mut String, todo: &Todo) {
    if let Some(due) = todo.due_date {
        out.push_str(&format!("{}\n", STYLES.muted.apply_to(format!("due {}", due))));
    }
    if todo.tasks.is_empty() {
        return;
    }
    out.push('\n');
    for task in &todo.tasks {
        let (mark, title) = if task.is_completed {
            ("[x]", STYLES.done.apply_to(&task.title).to_string())
        } else {
            ("[ ]", task.title.clone())
        };
        out.push_str(&format!("{} {}  {}\n", mark, title, STYLES.faint.apply_to(&task.id)));
    }
}

/// Note bodies are rich text stored as HTML; the terminal gets the text.
fn strip_tags(html: &str) -> String {
    let spaced = html
        .replace("</p>", "\n")
        .replace("<br>", "\n")
        .replace("<br/>", "\n")
        .replace("<br />", "\n");
    let mut out = String::with_capacity(spaced.len());
    let mut in_tag = false;
    for c in spaced.chars() {
        match c {
            '<' => in_tag = true,
            '>' if in_tag => in_tag = false,
            _ if !in_tag => out.push(c),
            _ => {}
        }
    }
    out.replace("&nbsp;", " ")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&amp;", "&")
}

fn format_time_ago(timestamp: DateTime<Utc>, now: DateTime<Utc>) -> String {
    let elapsed = now
        .signed_duration_since(timestamp)
        .to_std()
        .unwrap_or_default();
    let mut formatter = timeago::Formatter::new();
    formatter.num_items(1);
    formatter.convert(elapsed)
}

fn truncate_to_width(text: &str, max: usize) -> String {
    if text.width() <= max {
        return text.to_string();
    }
    let mut out = String::new();
    let mut used = 0;
    for c in text.chars() {
        let w = c.width().unwrap_or(0);
        if used + w + 1 > max {
            break;
        }
        out.push(c);
        used += w;
    }
    out.push('…');
    out
}

fn pad_to_width(text: &str, width: usize) -> String {
    let fill = width.saturating_sub(text.width());
    format!("{}{}", text, " ".repeat(fill))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use jotterapp::model::Task;

    fn now() -> DateTime<Utc> {
        console::set_colors_enabled(false);
        DateTime::parse_from_rfc3339("2024-06-01T12:00:00Z")
            .unwrap()
            .with_timezone(&Utc)
    }

    fn note(id: &str, title: &str, pinned: bool) -> AnyItem {
        let mut n = Note::new(id, title, "<p>Hello <b>there</b></p><p>second</p>");
        n.meta.is_pinned = pinned;
        n.meta.updated_at = Some(now() - Duration::minutes(5));
        AnyItem::Note(n)
    }

    fn todo_with_tasks() -> AnyItem {
        let mut t = Todo::new("t1", "Groceries");
        t.tasks = vec![
            Task::new("k1", "Milk").completed(true),
            Task::new("k2", "Bread"),
        ];
        AnyItem::Todo(t)
    }

    #[test]
    fn messages_split_by_stream() {
        console::set_colors_enabled(false);
        let messages = vec![
            CmdMessage::success("Note created successfully"),
            CmdMessage::error("Network error: refused"),
        ];

        assert_eq!(render_messages(&messages, false), "Note created successfully\n");
        assert_eq!(render_messages(&messages, true), "Network error: refused\n");
    }

    #[test]
    fn list_rows_carry_pin_title_time_and_id() {
        let out = render_list(&[note("n1", "Pinned one", true), note("n2", "Plain", false)], now());
        let lines: Vec<&str> = out.lines().collect();

        assert_eq!(lines.len(), 2);
        assert!(lines[0].starts_with(PIN_MARKER));
        assert!(lines[0].contains("Pinned one"));
        assert!(lines[0].contains("5 minutes ago"));
        assert!(lines[0].trim_end().ends_with("n1"));
        assert!(lines[1].starts_with("  Plain"));
    }

    #[test]
    fn todo_rows_show_task_progress() {
        let out = render_list(&[todo_with_tasks()], now());
        assert!(out.contains("[1/2]"));
    }

    #[test]
    fn long_titles_are_truncated_to_the_column() {
        let title = "x".repeat(80);
        let out = render_list(&[note("n1", &title, false)], now());
        assert!(out.contains(&format!("{}…", "x".repeat(COL_TITLE - 1))));
        assert!(!out.contains(&"x".repeat(COL_TITLE)));
    }

    #[test]
    fn wide_characters_count_double() {
        let truncated = truncate_to_width("日本語のメモ", 7);
        assert_eq!(truncated, "日本語…");
        assert_eq!(pad_to_width("日本", 6).width(), 6);
    }

    #[test]
    fn note_view_shows_text_without_markup() {
        let out = render_item(&note("n1", "Hi", false), now());
        assert!(out.starts_with("Hi\n"));
        assert!(out.contains("id n1"));
        assert!(out.contains("Hello there\nsecond"));
        assert!(!out.contains("<p>"));
    }

    #[test]
    fn todo_view_lists_tasks_with_ids() {
        let out = render_item(&todo_with_tasks(), now());
        assert!(out.contains("[x] Milk  k1"));
        assert!(out.contains("[ ] Bread  k2"));
    }

    #[test]
    fn trashed_items_are_labelled() {
        let mut n = Note::new("n1", "Old", "");
        n.meta.is_trash = true;
        let out = render_item(&AnyItem::Note(n), now());
        assert!(out.contains("in trash"));
    }
}
