//! Completion statistics shown in the stats pane.

use crate::models::{Priority, Task};
use chrono::{Days, Local, NaiveDate};
use std::collections::BTreeSet;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct PriorityCount {
    pub total: usize,
    pub completed: usize,
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct TaskStats {
    pub total: usize,
    pub completed: usize,
    pub pending: usize,
    /// Percentage, rounded to the nearest whole number.
    pub completion_rate: u32,
    pub overdue: usize,
    pub due_today: usize,
    pub high: PriorityCount,
    pub medium: PriorityCount,
    pub low: PriorityCount,
    pub current_streak: u32,
    pub longest_streak: u32,
}

impl TaskStats {
    pub fn compute(tasks: &[Task], today: NaiveDate) -> Self {
        let mut stats = TaskStats {
            total: tasks.len(),
            ..Default::default()
        };

        for task in tasks {
            let bucket = match task.priority {
                Priority::High => &mut stats.high,
                Priority::Medium => &mut stats.medium,
                Priority::Low => &mut stats.low,
            };
            bucket.total += 1;
            if task.completed {
                bucket.completed += 1;
                stats.completed += 1;
                continue;
            }

            if let Some(due) = task.due_date {
                let due_day = due.with_timezone(&Local).date_naive();
                if due_day < today {
                    stats.overdue += 1;
                } else if due_day == today {
                    stats.due_today += 1;
                }
            }
        }
        stats.pending = stats.total - stats.completed;
        if stats.total > 0 {
            stats.completion_rate =
                ((stats.completed as f64 / stats.total as f64) * 100.0).round() as u32;
        }

        let days: BTreeSet<NaiveDate> = tasks
            .iter()
            .filter(|t| t.completed)
            .map(|t| t.updated_at.with_timezone(&Local).date_naive())
            .collect();
        stats.current_streak = current_streak(&days, today);
        stats.longest_streak = longest_streak(&days);
        stats
    }
}

/// Consecutive days with a completion ending today, or yesterday if nothing is done yet today.
fn current_streak(days: &BTreeSet<NaiveDate>, today: NaiveDate) -> u32 {
    let mut day = if days.contains(&today) {
        today
    } else {
        match today.checked_sub_days(Days::new(1)) {
            Some(yesterday) if days.contains(&yesterday) => yesterday,
            _ => return 0,
        }
    };
    let mut streak = 0;
    while days.contains(&day) {
        streak += 1;
        match day.pred_opt() {
            Some(previous) => day = previous,
            None => break,
        }
    }
    streak
}

fn longest_streak(days: &BTreeSet<NaiveDate>) -> u32 {
    let mut longest = 0;
    let mut run = 0;
    let mut previous: Option<NaiveDate> = None;
    for &day in days {
        run = match previous {
            Some(prev) if prev.succ_opt() == Some(day) => run + 1,
            _ => 1,
        };
        longest = longest.max(run);
        previous = Some(day);
    }
    longest
}
