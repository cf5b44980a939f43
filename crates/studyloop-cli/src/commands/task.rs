//! Task lifecycle commands for CLI.

use clap::Subcommand;
use serde_json::json;
use studyloop_core::{
    Clock, Event, NewTask, RewardOutcome, SqliteStore, Task, TaskEdit, TaskFilter, TaskLifecycle,
};

use super::{open_lifecycle, print_json, CommandResult};

#[derive(Subcommand)]
pub enum TaskAction {
    /// Create a new task
    Add {
        /// What to study
        text: String,
        /// Subject the task belongs to
        #[arg(long)]
        subject: String,
        /// Schedule spaced reviews after the reward
        #[arg(long)]
        review: bool,
    },
    /// List tasks
    List {
        /// all, active, completed or review
        #[arg(long, default_value = "all")]
        filter: TaskFilter,
        /// Group by reward state instead of a flat list
        #[arg(long)]
        board: bool,
    },
    /// Show a task with its reward countdown
    Show {
        /// Task ID
        id: String,
    },
    /// Mark a task done
    Complete {
        /// Task ID
        id: String,
    },
    /// Collect the completion reward
    Collect {
        /// Task ID
        id: String,
    },
    /// Mark the due review as done
    Review {
        /// Task ID
        id: String,
    },
    /// Collect the reward for a finished review
    CollectReview {
        /// Task ID
        id: String,
    },
    /// Change text or subject
    Edit {
        /// Task ID
        id: String,
        /// New text
        #[arg(long)]
        text: Option<String>,
        /// New subject
        #[arg(long)]
        subject: Option<String>,
    },
    /// Delete a task
    Delete {
        /// Task ID
        id: String,
    },
    /// List tasks due for review
    Due,
}

pub fn run(action: TaskAction) -> CommandResult {
    let mut lifecycle = open_lifecycle()?;

    match action {
        TaskAction::Add {
            text,
            subject,
            review,
        } => {
            let task = lifecycle.create(NewTask::new(text, subject, review))?;
            println!("Task created: {}", task.id);
            print_json(&task)?;
        }
        TaskAction::List { filter, board } => {
            if board {
                let now = lifecycle.clock().now();
                print_json(&lifecycle.board()?.filtered(filter, now))?;
            } else {
                print_json(&lifecycle.list(filter)?)?;
            }
        }
        TaskAction::Show { id } => {
            let task = lifecycle.task(&id)?;
            print_details(&lifecycle, &task)?;
        }
        TaskAction::Complete { id } => match lifecycle.complete(&id)? {
            Some(task) => {
                println!("Task completed: {id}");
                print_details(&lifecycle, &task)?;
            }
            None => print_unchanged(&lifecycle, &id)?,
        },
        TaskAction::Collect { id } => {
            let outcome = lifecycle.collect_reward(&id)?;
            print_reward(&mut lifecycle, &id, outcome)?;
        }
        TaskAction::Review { id } => match lifecycle.mark_review_done(&id)? {
            Some(task) => {
                println!("Review recorded: {id}");
                print_details(&lifecycle, &task)?;
            }
            None => print_unchanged(&lifecycle, &id)?,
        },
        TaskAction::CollectReview { id } => {
            let outcome = lifecycle.collect_review_reward(&id)?;
            print_reward(&mut lifecycle, &id, outcome)?;
        }
        TaskAction::Edit { id, text, subject } => {
            let task = lifecycle.edit(&id, TaskEdit { text, subject })?;
            println!("Task updated:");
            print_json(&task)?;
        }
        TaskAction::Delete { id } => {
            lifecycle.delete(&id)?;
            println!("Task deleted: {id}");
        }
        TaskAction::Due => {
            print_json(&lifecycle.due_for_review()?)?;
        }
    }
    Ok(())
}

fn print_details(lifecycle: &TaskLifecycle<SqliteStore>, task: &Task) -> CommandResult {
    let actions: Vec<String> = lifecycle
        .available_actions(task)
        .iter()
        .map(ToString::to_string)
        .collect();
    print_json(&json!({
        "task": task,
        "rewardProgress": lifecycle.reward_progress(task),
        "countdown": lifecycle
            .reward_progress(task)
            .map(|progress| progress.remaining.to_string()),
        "availableActions": actions,
    }))
}

fn print_unchanged(lifecycle: &TaskLifecycle<SqliteStore>, id: &str) -> CommandResult {
    println!("Nothing to do for task {id}");
    let task = lifecycle.task(id)?;
    print_details(lifecycle, &task)
}

fn print_reward(
    lifecycle: &mut TaskLifecycle<SqliteStore>,
    id: &str,
    outcome: Option<RewardOutcome>,
) -> CommandResult {
    let Some(outcome) = outcome else {
        return print_unchanged(lifecycle, id);
    };
    for event in lifecycle.drain_events() {
        if let Some((coins, experience)) = event.reward() {
            let label = match event {
                Event::ReviewRewardCollected { cycle, .. } => format!("{cycle} review"),
                _ => "task".to_string(),
            };
            println!("Rewards Collected! +{coins} coins, +{experience} XP ({label})");
        }
    }
    print_json(&outcome)
}
