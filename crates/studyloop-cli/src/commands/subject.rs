//! Subject commands for CLI.

use clap::Subcommand;
use serde_json::json;

use super::{open_lifecycle, print_json, CommandResult};

#[derive(Subcommand)]
pub enum SubjectAction {
    /// Create a subject
    Add {
        /// Subject name
        name: String,
    },
    /// List subjects with their levels
    List,
    /// Remove a subject (its tasks are kept)
    Remove {
        /// Subject name
        name: String,
    },
    /// Show level progress for a subject
    Stats {
        /// Subject name
        name: String,
    },
}

pub fn run(action: SubjectAction) -> CommandResult {
    let mut lifecycle = open_lifecycle()?;

    match action {
        SubjectAction::Add { name } => {
            let subject = lifecycle.add_subject(&name)?;
            println!("Subject created: {}", subject.name);
        }
        SubjectAction::List => {
            let subjects: Vec<_> = lifecycle
                .subjects()
                .list()?
                .into_iter()
                .map(|subject| {
                    let stats = subject.stats();
                    json!({
                        "name": subject.name,
                        "experience": subject.experience,
                        "level": stats.level,
                        "createdAt": subject.created_at,
                    })
                })
                .collect();
            print_json(&subjects)?;
        }
        SubjectAction::Remove { name } => {
            let subject = lifecycle.remove_subject(&name)?;
            println!("Subject removed: {}", subject.name);
        }
        SubjectAction::Stats { name } => {
            let stats = lifecycle.subjects().stats(&name)?;
            print_json(&json!({
                "name": name,
                "level": stats.level,
                "progress": stats.progress,
                "experienceToNextLevel": stats.experience_to_next_level,
                "totalExperience": stats.total_experience,
                "levelPercent": stats.level_percent(),
            }))?;
        }
    }
    Ok(())
}
