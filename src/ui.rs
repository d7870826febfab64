use colored::*;
use jiff::civil::Date;

use crate::models::{
    specification::Specification,
    store::Store,
    task::{Status, Task, UNASSIGNED},
};
use crate::services::tasks::{TaskStats, Urgency, days_remaining};

/// Get the terminal width, defaulting to 80 if unavailable
fn get_terminal_width() -> usize {
    term_size::dimensions().map(|(w, _)| w).unwrap_or(80)
}

pub fn today() -> Date {
    jiff::Zoned::now().date()
}

/// Status glyph for a task line
pub fn status_glyph(task: &Task, urgency: Urgency) -> ColoredString {
    match task.status {
        Status::Completed => "✓".dimmed(),
        Status::Standby => "◌".yellow(),
        _ if urgency == Urgency::Overdue => "●".red(),
        Status::InProgress => "◐".cyan(),
        Status::NotStarted => "○".normal(),
    }
}

/// Deadline rendered with its urgency classification
pub fn format_deadline(deadline: Date, today: Date) -> ColoredString {
    let days = days_remaining(deadline, today);
    let date_str = deadline.strftime("%b %d, %Y").to_string();

    match Urgency::classify(days) {
        Urgency::Overdue => format!("{} (overdue by {} days)", date_str, -days).red(),
        Urgency::Urgent => format!("{} ({} days left)", date_str, days).bright_red(),
        Urgency::Warning => format!("{} ({} days left)", date_str, days).yellow(),
        Urgency::Normal => format!("{} ({} days left)", date_str, days).normal(),
    }
}

/// Textual progress bar, e.g. `[████░░░░░░] 40%`
pub fn progress_bar(progress: u8, width: usize) -> String {
    let filled = (progress as usize * width) / 100;
    format!(
        "[{}{}] {}%",
        "█".repeat(filled),
        "░".repeat(width - filled),
        progress
    )
}

/// Render a single task line with id, glyph, title, and right-aligned context
pub fn render_task_line(task: &Task, store: &Store, today: Date) {
    let terminal_width = get_terminal_width();

    let urgency = Urgency::classify(days_remaining(task.deadline, today));
    let id_str = format!("{:>3}", task.id);
    let glyph = status_glyph(task, urgency);
    let title = &task.title;

    let left_section = format!("  {}  {}  {}", id_str, glyph, title);
    let styled_left = if task.status == Status::Completed {
        left_section.dimmed()
    } else {
        left_section.bold()
    };

    // Right section: specification title if assigned, otherwise the domain
    let context = task
        .specification_id
        .as_deref()
        .and_then(|id| store.get_specification(id))
        .map(|s| s.title.clone())
        .unwrap_or_else(|| task.domain.clone());
    let right_section = format!("{}  ·  p{}", context, task.priority);

    let left_visible_len = format!("  {}  {}  {}", id_str, " ", title).len();
    let total_content = left_visible_len + right_section.len();

    if total_content + 4 < terminal_width {
        let padding = terminal_width - total_content - 2;
        println!("{}{}{}", styled_left, " ".repeat(padding), right_section.dimmed());
    } else {
        println!("{}", styled_left);
    }
}

/// Full task card for the detail view
pub fn render_task_card(task: &Task, store: &Store, today: Date) {
    println!("\n  {}  {}", format!("#{}", task.id).dimmed(), task.title.bold());
    println!("  {}", "─".repeat(40).dimmed());

    println!("  {:<12} {}", "Status:".dimmed(), task.status.label());
    println!(
        "  {:<12} {}",
        "Deadline:".dimmed(),
        format_deadline(task.deadline, today)
    );
    println!("  {:<12} {}", "Domain:".dimmed(), task.domain);
    println!("  {:<12} {}", "Duration:".dimmed(), task.duration);
    println!("  {:<12} {}/10", "Difficulty:".dimmed(), task.difficulty);
    println!("  {:<12} {}/100", "Priority:".dimmed(), task.priority);

    let assignee = if task.assignee == UNASSIGNED {
        UNASSIGNED.italic().dimmed().to_string()
    } else {
        task.assignee.clone()
    };
    println!("  {:<12} {}", "Assignee:".dimmed(), assignee);

    if let Some(condition) = &task.condition {
        println!("  {:<12} {}", "Condition:".dimmed(), condition);
    }

    if let Some(spec) = task
        .specification_id
        .as_deref()
        .and_then(|id| store.get_specification(id))
    {
        println!(
            "  {:<12} {} {}",
            "Spec:".dimmed(),
            spec.title.blue(),
            format!("({})", spec.id).dimmed()
        );
    }

    println!(
        "  {:<12} {}",
        "Created:".dimmed(),
        task.created_at.to_string().dimmed()
    );

    if !task.subtasks.is_empty() {
        let done = task.subtasks.iter().filter(|s| s.completed).count();
        println!(
            "\n  Subtasks ({}/{} done):",
            done,
            task.subtasks.len()
        );
        for subtask in &task.subtasks {
            let box_glyph = if subtask.completed { "✓".green() } else { "○".normal() };
            let indent = "  ".repeat(subtask.level.min(2) as usize);
            let text = if subtask.completed {
                subtask.text.dimmed().to_string()
            } else {
                subtask.text.clone()
            };
            println!(
                "    {}{} {} {}",
                indent,
                box_glyph,
                format!("#{}", subtask.id).dimmed(),
                text
            );
        }
    }

    println!("\n  {}", progress_bar(task.progress, 20));
    println!();
}

/// Render a specification with its associated-task count
pub fn render_specification_line(spec: &Specification, store: &Store) {
    let open = spec
        .task_ids
        .iter()
        .filter_map(|id| store.get_task(*id))
        .filter(|t| t.status != Status::Completed)
        .count();

    println!(
        "{} {} {}",
        "•".green(),
        spec.title.bold(),
        format!("({})", spec.id).dimmed()
    );
    println!(
        "    {} {} {} {} {}",
        spec.category.blue(),
        "•".dimmed(),
        format!("priority {}", spec.priority).dimmed(),
        "•".dimmed(),
        format!(
            "{} task(s), {} open",
            spec.task_ids.len(),
            open
        )
        .dimmed()
    );
}

pub fn render_specification_card(spec: &Specification, store: &Store, today: Date) {
    println!("\n  {}  {}", spec.id.dimmed(), spec.title.bold());
    println!("  {}", "─".repeat(40).dimmed());
    println!("  {:<12} {}", "Category:".dimmed(), spec.category);
    println!("  {:<12} {}", "Status:".dimmed(), spec.status.label());
    println!("  {:<12} {}/100", "Priority:".dimmed(), spec.priority);
    println!("  {:<12} {}", "Description:".dimmed(), spec.description);

    if spec.task_ids.is_empty() {
        println!("\n  No tasks assigned");
    } else {
        println!("\n  Associated tasks:");
        for task_id in &spec.task_ids {
            if let Some(task) = store.get_task(*task_id) {
                render_task_line(task, store, today);
            }
        }
    }
    println!();
}

/// Dashboard panels: counters, completion, priority list
pub fn render_dashboard(stats: &TaskStats, priority_tasks: &[&Task], store: &Store, today: Date) {
    render_view_header("Dashboard", stats.total);

    println!(
        "  {:<18} {}",
        "Total tasks:".dimmed(),
        stats.total.to_string().bold()
    );
    println!(
        "  {:<18} {}",
        "Completed:".dimmed(),
        stats.completed.to_string().green()
    );
    println!(
        "  {:<18} {}",
        "Pending:".dimmed(),
        stats.pending.to_string().cyan()
    );
    println!(
        "  {:<18} {}",
        "Overdue:".dimmed(),
        if stats.overdue > 0 {
            stats.overdue.to_string().red()
        } else {
            stats.overdue.to_string().normal()
        }
    );
    println!(
        "  {:<18} {}",
        "Completion rate:".dimmed(),
        format!("{}%", stats.completion_rate)
    );
    println!(
        "  {:<18} {:.1}",
        "Avg priority:".dimmed(),
        stats.avg_priority
    );

    if !priority_tasks.is_empty() {
        render_section_header("Priority tasks");
        for task in priority_tasks {
            render_task_line(task, store, today);
        }
    }
}

/// Render a view header with title and count
pub fn render_view_header(title: &str, count: usize) {
    let task_word = if count == 1 { "task" } else { "tasks" };
    println!("\n  {} ({} {})\n", title.cyan().bold(), count, task_word);
}

/// Render a section header (e.g. "Priority tasks")
pub fn render_section_header(title: &str) {
    println!("\n  ─── {} ───\n", title.bold());
}
