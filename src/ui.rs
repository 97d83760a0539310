use crate::app::{App, InputMode};
use crate::models::{Priority, ReminderType, Task};
use crate::stats::TaskStats;
use crate::store::TaskStore;
use crate::voice::executor::Severity;
use chrono::Local;
use crossterm::event::{self, Event as CEvent};
use ratatui::{
    backend::Backend,
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span, Text},
    widgets::{Block, Borders, Clear, List, ListItem, Paragraph, Wrap},
    Frame, Terminal,
};
use std::io;
use std::time::Duration;

fn centered_rect_absolute(width: u16, height: u16, r: Rect) -> Rect {
    let popup_layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints(
            [
                Constraint::Length((r.height.saturating_sub(height)) / 2),
                Constraint::Length(height),
                Constraint::Length((r.height.saturating_sub(height) + 1) / 2),
            ]
            .as_ref(),
        )
        .split(r);

    Layout::default()
        .direction(Direction::Horizontal)
        .constraints(
            [
                Constraint::Length((r.width.saturating_sub(width)) / 2),
                Constraint::Length(width),
                Constraint::Length((r.width.saturating_sub(width) + 1) / 2),
            ]
            .as_ref(),
        )
        .split(popup_layout[1])[1]
}

fn key_hint(key: &'static str, action: &'static str) -> [Span<'static>; 2] {
    [
        Span::styled(key, Style::default().fg(Color::Red)),
        Span::raw(action),
    ]
}

fn get_legend(input_mode: &InputMode) -> Text<'static> {
    let hints: Vec<[Span<'static>; 2]> = match input_mode {
        InputMode::Normal => vec![
            key_hint(" q ", ": Quit "),
            key_hint(" j/k ", ": Move "),
            key_hint(" : ", ": Command "),
            key_hint(" x ", ": Toggle Done "),
            key_hint(" d ", ": Delete "),
            key_hint(" t ", ": Show Done "),
            key_hint(" c ", ": Category "),
            key_hint(" r ", ": Reminder "),
            key_hint(" g ", ": Refresh "),
        ],
        InputMode::Command => vec![
            key_hint(" Enter ", ": Run "),
            key_hint(" Esc ", ": Cancel "),
        ],
    };
    Text::from(Line::from(hints.into_iter().flatten().collect::<Vec<_>>()))
}

fn priority_style(priority: Priority) -> Style {
    match priority {
        Priority::High => Style::default().fg(Color::Red),
        Priority::Medium => Style::default().fg(Color::Yellow),
        Priority::Low => Style::default().fg(Color::Blue),
    }
}

fn label(name: &'static str) -> Span<'static> {
    Span::styled(name, Style::default().add_modifier(Modifier::BOLD))
}

fn detail_lines<S: TaskStore>(app: &App<S>, task: &Task) -> Vec<Line<'static>> {
    let due = task
        .due_date
        .map(|due| due.with_timezone(&Local).format("%a %-d %b %Y, %H:%M").to_string())
        .unwrap_or_else(|| "No due date".to_string());
    let category = app
        .category_name(task.category_id)
        .unwrap_or("None")
        .to_string();
    let reminder = match (task.reminder_enabled, task.reminder_type) {
        (false, _) => "Off".to_string(),
        (true, ReminderType::Manual) => format!(
            "At {}",
            task.reminder_time.as_deref().unwrap_or("--:--")
        ),
        (true, ReminderType::Morning) => "Morning of due day".to_string(),
        (true, ReminderType::Default) => "Before deadline".to_string(),
    };

    let mut lines = vec![
        Line::from(Span::styled(
            task.title.clone(),
            Style::default().add_modifier(Modifier::BOLD),
        )),
        Line::from(vec![label("Due Date: "), Span::raw(due)]),
        Line::from(vec![
            label("Priority: "),
            Span::styled(task.priority.to_string(), priority_style(task.priority)),
        ]),
        Line::from(vec![label("Category: "), Span::raw(category)]),
        Line::from(vec![label("Reminder: "), Span::raw(reminder)]),
        Line::from(label("Description: ")),
    ];
    match task.description.as_deref().map(str::trim) {
        Some(desc) if !desc.is_empty() => {
            lines.extend(desc.lines().map(|l| Line::from(l.to_string())));
        }
        _ => lines.push(Line::from("No description")),
    }
    lines
}

fn stats_lines(stats: &TaskStats) -> Vec<Line<'static>> {
    vec![
        Line::from(vec![
            label("Done: "),
            Span::raw(format!(
                "{}/{} ({}%)",
                stats.completed, stats.total, stats.completion_rate
            )),
        ]),
        Line::from(vec![
            label("Overdue: "),
            Span::styled(
                stats.overdue.to_string(),
                if stats.overdue > 0 {
                    Style::default().fg(Color::Red)
                } else {
                    Style::default()
                },
            ),
            Span::raw("  "),
            label("Due today: "),
            Span::raw(stats.due_today.to_string()),
        ]),
        Line::from(vec![
            label("High: "),
            Span::raw(format!("{}/{}", stats.high.completed, stats.high.total)),
            Span::raw("  "),
            label("Medium: "),
            Span::raw(format!("{}/{}", stats.medium.completed, stats.medium.total)),
            Span::raw("  "),
            label("Low: "),
            Span::raw(format!("{}/{}", stats.low.completed, stats.low.total)),
        ]),
        Line::from(vec![
            label("Streak: "),
            Span::raw(format!(
                "{} day(s), best {}",
                stats.current_streak, stats.longest_streak
            )),
        ]),
    ]
}

fn ambient_line<S: TaskStore>(app: &App<S>) -> Line<'static> {
    let category = app
        .category_name(app.options.category_id)
        .unwrap_or("None")
        .to_string();
    let reminder = if app.options.reminder_enabled {
        format!("{:?}", app.options.reminder_type).to_lowercase()
    } else {
        "off".to_string()
    };
    Line::from(vec![
        label("Category: "),
        Span::raw(category),
        Span::raw("  "),
        label("Reminder: "),
        Span::raw(reminder),
    ])
}

fn notification<S: TaskStore>(app: &App<S>) -> Line<'static> {
    match &app.last_outcome {
        Some(outcome) => {
            let color = match outcome.severity {
                Severity::Normal => Color::Green,
                Severity::Destructive => Color::Red,
            };
            Line::from(vec![
                Span::styled(
                    format!("{}: ", outcome.title),
                    Style::default().fg(color).add_modifier(Modifier::BOLD),
                ),
                Span::styled(outcome.description.clone(), Style::default().fg(color)),
            ])
        }
        None => ambient_line(app),
    }
}

fn draw<S: TaskStore>(f: &mut Frame, app: &mut App<S>) {
    let size = f.area();

    // Body, notification line, legend
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .margin(0)
        .constraints(
            [
                Constraint::Min(0),
                Constraint::Length(1),
                Constraint::Length(2),
            ]
            .as_ref(),
        )
        .split(size);
    let body_chunk = chunks[0];

    let columns = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(60), Constraint::Percentage(40)].as_ref())
        .split(body_chunk);
    let side = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Min(0), Constraint::Length(6)].as_ref())
        .split(columns[1]);

    let task_title = if app.show_done_tasks {
        "Tasks (All)"
    } else {
        "Tasks (Pending)"
    };

    let visible = app.visible_tasks();
    let tasks_widget = if !visible.is_empty() {
        let items: Vec<ListItem> = visible
            .iter()
            .map(|task| {
                let mut content = Vec::new();
                if task.completed {
                    content.push(Span::styled("DONE ", Style::default().fg(Color::Green)));
                } else if task.priority != Priority::Medium {
                    content.push(Span::styled("● ", priority_style(task.priority)));
                }
                content.push(Span::raw(task.title.clone()));
                ListItem::new(Line::from(content))
            })
            .collect();

        List::new(items)
            .block(Block::default().borders(Borders::ALL).title(task_title))
            .highlight_style(
                Style::default()
                    .fg(Color::Green)
                    .add_modifier(Modifier::BOLD),
            )
            .highlight_symbol(">> ")
    } else {
        List::new(vec![ListItem::new("No tasks available")])
            .block(Block::default().borders(Borders::ALL).title(task_title))
    };
    f.render_stateful_widget(tasks_widget, columns[0], &mut app.state);

    let detail_block = Block::default().borders(Borders::ALL).title("Task Details");
    let details = match app.selected_task() {
        Some(task) => Paragraph::new(detail_lines(app, task)),
        None => Paragraph::new("Press : and speak a command"),
    };
    f.render_widget(details.block(detail_block).wrap(Wrap { trim: true }), side[0]);

    let stats = TaskStats::compute(&app.tasks, Local::now().date_naive());
    f.render_widget(
        Paragraph::new(stats_lines(&stats))
            .block(Block::default().borders(Borders::ALL).title("Stats")),
        side[1],
    );

    f.render_widget(Paragraph::new(notification(app)), chunks[1]);

    if app.input_mode == InputMode::Command {
        let popup_width = popup_width(size.width);
        let lines_required = calculate_wrapped_lines(&app.transcript, popup_width);
        let popup_height = std::cmp::max(lines_required as u16, 1) + 2;
        let popup_height = std::cmp::min(popup_height, size.height.saturating_sub(2));
        let popup_area = centered_rect_absolute(popup_width + 2, popup_height, body_chunk);

        let popup_block = Block::default()
            .title("Say a command (Enter to run)")
            .borders(Borders::ALL)
            .style(Style::default().fg(Color::Green));
        let input = Paragraph::new(app.transcript.as_str())
            .style(Style::default().fg(Color::White))
            .block(popup_block)
            .wrap(Wrap { trim: false });

        f.render_widget(Clear, popup_area);
        f.render_widget(input, popup_area);
    }

    let legend = Paragraph::new(get_legend(&app.input_mode))
        .style(Style::default().fg(Color::White))
        .alignment(Alignment::Left)
        .wrap(Wrap { trim: true });
    f.render_widget(legend, chunks[2]);
}

pub async fn run_app<B: Backend, S: TaskStore>(
    terminal: &mut Terminal<B>,
    mut app: App<S>,
) -> io::Result<()> {
    loop {
        terminal.draw(|f| draw(f, &mut app))?;

        if event::poll(Duration::from_millis(100))? {
            if let CEvent::Key(key) = event::read()? {
                let should_quit = app.handle_input(key).await?;
                if should_quit {
                    return Ok(());
                }
            }
        }
    }
}

/// Inner width of the command popup: 60% of the screen, minus borders.
fn popup_width(screen_width: u16) -> u16 {
    let width = u32::from(screen_width) * 60 / 100;
    (width as u16).saturating_sub(2).max(1)
}

fn calculate_wrapped_lines(text: &str, max_width: u16) -> usize {
    let max_width = max_width.max(1) as usize;
    text.lines()
        .map(|line| (line.chars().count() + max_width - 1) / max_width)
        .sum()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_calculate_wrapped_lines() {
        assert_eq!(calculate_wrapped_lines("", 10), 0);
        assert_eq!(calculate_wrapped_lines("short", 10), 1);
        assert_eq!(calculate_wrapped_lines("exactly ten", 11), 1);
        assert_eq!(calculate_wrapped_lines("twelve chars", 5), 3);
        assert_eq!(calculate_wrapped_lines("a\nb", 5), 2);
    }

    #[test]
    fn test_popup_width_on_wide_terminals() {
        assert_eq!(popup_width(100), 58);
        assert_eq!(popup_width(2000), 1198);
        assert_eq!(popup_width(u16::MAX), 39319);
        assert_eq!(popup_width(0), 1);
    }

    #[test]
    fn test_centered_rect_absolute() {
        let area = Rect::new(0, 0, 100, 40);
        let popup = centered_rect_absolute(20, 10, area);
        assert_eq!(popup, Rect::new(40, 15, 20, 10));
    }

    #[test]
    fn test_stats_lines_show_rate() {
        let stats = TaskStats {
            total: 4,
            completed: 1,
            completion_rate: 25,
            ..Default::default()
        };
        let first = &stats_lines(&stats)[0];
        let text: String = first.spans.iter().map(|s| s.content.as_ref()).collect();
        assert_eq!(text, "Done: 1/4 (25%)");
    }
}
