//! CLI smoke shell over the note repository.
//!
//! # Responsibility
//! - Exercise `notekeeper_core` wiring end to end against the configured
//!   store file (`NOTEKEEPER_DB_PATH`).
//! - Print the observed note list after each command has been applied.

use clap::{Parser, Subcommand};
use log::warn;
use notekeeper_core::{
    core_version, init_logging, LogConfig, Note, NoteId, NoteRepository, NoteStore, StoreConfig,
};
use std::process::ExitCode;
use std::sync::Arc;

#[derive(Parser, Debug)]
#[command(
    name = "notekeeper",
    about = "Inspect and edit the local note store",
    long_about = "Inspect and edit the local note store.\n\nThe store file is taken from \
                  NOTEKEEPER_DB_PATH; logs go to NOTEKEEPER_LOG_DIR."
)]
struct Cli {
    #[command(subcommand)]
    command: Option<NoteCommand>,
}

#[derive(Subcommand, Debug, PartialEq, Eq)]
enum NoteCommand {
    #[command(about = "Print every note (default)")]
    List,

    #[command(about = "Insert a new note")]
    Add {
        title: String,
        description: String,
        #[arg(allow_negative_numbers = true)]
        priority: i32,
    },

    #[command(about = "Replace every field of an existing note")]
    Update {
        id: NoteId,
        title: String,
        description: String,
        #[arg(allow_negative_numbers = true)]
        priority: i32,
    },

    #[command(about = "Delete one note by id")]
    Delete { id: NoteId },

    #[command(about = "Delete every note")]
    Clear,

    #[command(about = "Print the core library version")]
    Version,
}

fn main() -> ExitCode {
    let command = Cli::parse().command.unwrap_or(NoteCommand::List);

    if command == NoteCommand::Version {
        println!("notekeeper_core version={}", core_version());
        return ExitCode::SUCCESS;
    }

    if let Err(err) = init_logging(&LogConfig::from_env()) {
        eprintln!("logging disabled: {err}");
    }

    match run(command) {
        Ok(()) => ExitCode::SUCCESS,
        Err(message) => {
            eprintln!("{message}");
            ExitCode::FAILURE
        }
    }
}

fn run(command: NoteCommand) -> Result<(), String> {
    let store = NoteStore::open(&StoreConfig::from_env()).map_err(|err| err.to_string())?;
    let repo = NoteRepository::new(Arc::new(store));

    let submitted = match command {
        NoteCommand::List | NoteCommand::Version => Ok(()),
        NoteCommand::Add {
            title,
            description,
            priority,
        } => repo.insert(title, description, priority),
        NoteCommand::Update {
            id,
            title,
            description,
            priority,
        } => repo.update(id, title, description, priority),
        NoteCommand::Delete { id } => repo.delete(id),
        NoteCommand::Clear => repo.delete_all(),
    };
    submitted.map_err(|err| err.to_string())?;
    repo.flush().map_err(|err| err.to_string())?;

    if repo.store().failed_writes() > 0 {
        warn!("event=cli_command module=cli status=error error_code=write_failed");
        eprintln!("command was not applied (see log for details)");
    }

    let notes = repo.store().current().unwrap_or_default();
    print_notes(&notes);
    Ok(())
}

fn print_notes(notes: &[Note]) {
    if notes.is_empty() {
        println!("(no notes)");
        return;
    }
    for note in notes {
        println!(
            "#{:<4} [{}] {} - {}",
            note.id, note.priority, note.title, note.description
        );
    }
}

#[cfg(test)]
mod tests {
    use super::{Cli, NoteCommand};
    use clap::{CommandFactory, Parser};

    fn parse(args: &[&str]) -> Result<Option<NoteCommand>, clap::Error> {
        Cli::try_parse_from(std::iter::once("notekeeper").chain(args.iter().copied()))
            .map(|cli| cli.command)
    }

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn empty_arguments_select_no_command() {
        assert_eq!(parse(&[]).unwrap(), None);
    }

    #[test]
    fn update_parses_all_fields() {
        let parsed = parse(&["update", "2", "Title 2b", "Desc 2b", "9"]).unwrap();
        assert_eq!(
            parsed,
            Some(NoteCommand::Update {
                id: 2,
                title: "Title 2b".to_string(),
                description: "Desc 2b".to_string(),
                priority: 9,
            })
        );
    }

    #[test]
    fn negative_priority_is_accepted() {
        let parsed = parse(&["add", "Milk", "Buy milk", "-3"]).unwrap();
        assert_eq!(
            parsed,
            Some(NoteCommand::Add {
                title: "Milk".to_string(),
                description: "Buy milk".to_string(),
                priority: -3,
            })
        );
    }

    #[test]
    fn delete_takes_a_numeric_id() {
        assert_eq!(
            parse(&["delete", "7"]).unwrap(),
            Some(NoteCommand::Delete { id: 7 })
        );
        assert!(parse(&["delete", "seven"]).is_err());
    }

    #[test]
    fn non_numeric_priority_is_rejected() {
        assert!(parse(&["add", "Milk", "Buy milk", "high"]).is_err());
    }

    #[test]
    fn unknown_command_is_rejected() {
        assert!(parse(&["purge"]).is_err());
    }
}
