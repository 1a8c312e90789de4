//! `redline session` - interactive update session.
//!
//! This handler is the demonstration stand-in for the product's
//! session/workflow shell: it owns the document file, upholds the
//! one-apply-at-a-time rule trivially by being single-threaded, and
//! renders proposals for acceptance.

use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};
use console::{style, Term};

use super::{load_case, save_case};
use crate::application::UpdateSession;
use crate::cli::display::proposal_table;
use crate::domain::errors::EngineError;
use crate::domain::models::{CaseDocument, Config, SessionState, WorkflowPhase};
use crate::infrastructure::interpreter::HttpInterpreterClient;

/// Handle the session command.
pub async fn execute(file: &Path, phase: WorkflowPhase, config: &Config) -> Result<()> {
    let mut document = load_case(file)?;
    let interpreter =
        Arc::new(HttpInterpreterClient::new(&config.interpreter).context("interpreter setup")?);
    let mut session = UpdateSession::new(interpreter, document.kind);

    let term = Term::stdout();
    let mut dirty = false;

    println!(
        "{} ({}, phase: {})",
        style(&document.title).bold(),
        document.kind.as_str(),
        phase.as_str()
    );
    println!("Type an instruction, or: undo, save, quit\n");

    loop {
        term.write_str("redline> ")?;
        let line = term.read_line()?;
        let line = line.trim();

        match line {
            "" => {}
            "quit" | "exit" => {
                if dirty {
                    term.write_str("Save changes? [y/N] ")?;
                    if term.read_line()?.trim().eq_ignore_ascii_case("y") {
                        save_case(file, &document)?;
                        println!("Saved.");
                    }
                }
                break;
            }
            "save" => {
                save_case(file, &document)?;
                dirty = false;
                println!("Saved.");
            }
            "undo" => match session.undo_last_contextual_update(&document) {
                Ok(doc) => {
                    document = doc;
                    dirty = true;
                    println!("Undid the last update.");
                }
                Err(EngineError::NoPendingUndo) => println!("Nothing to undo."),
                Err(err) => println!("{} {err}", style("error:").red()),
            },
            instruction => {
                run_instruction(&term, &mut session, &mut document, instruction, phase, &mut dirty)
                    .await?;
            }
        }
    }
    Ok(())
}

async fn run_instruction(
    term: &Term,
    session: &mut UpdateSession,
    document: &mut CaseDocument,
    instruction: &str,
    phase: WorkflowPhase,
    dirty: &mut bool,
) -> Result<()> {
    if let Err(err) = session
        .parse_contextual_update(instruction, phase, document)
        .await
    {
        println!("{} {err}", style("error:").red());
        let _ = session.cancel();
        return Ok(());
    }

    // Clarification turns until the backend settles.
    loop {
        let prompt = match session.state() {
            SessionState::NeedsClarification { prompt, .. } => prompt.clone(),
            _ => break,
        };
        println!("{} {prompt}", style("?").yellow().bold());
        term.write_str("answer (empty to cancel)> ")?;
        let answer = term.read_line()?;
        let answer = answer.trim().to_string();
        if answer.is_empty() {
            session.cancel().ok();
            println!("Cancelled.");
            return Ok(());
        }
        if let Err(err) = session.submit_clarification(&answer, phase, document).await {
            println!("{} {err}", style("error:").red());
            let _ = session.cancel();
            return Ok(());
        }
    }

    // Review loop: apply all, apply one at a time, or discard.
    loop {
        let (commands, summary) = match session.state() {
            SessionState::Ready { commands, summary } => (commands.clone(), summary.clone()),
            _ => break,
        };
        if !summary.is_empty() {
            println!("\n{}", style(&summary).bold());
        }
        if commands.is_empty() {
            println!("No changes proposed.");
            session.cancel().ok();
            break;
        }
        println!("{}", proposal_table(&commands));
        term.write_str("apply [a]ll, a command number, or [d]iscard> ")?;
        let choice = term.read_line()?;
        match choice.trim() {
            "a" | "all" => {
                match session.apply_all(document) {
                    Ok(doc) => {
                        *document = doc;
                        *dirty = true;
                        println!("Applied {} command(s).", commands.len());
                    }
                    Err(err) => println!("{} {err}", style("error:").red()),
                }
                break;
            }
            "" | "d" | "discard" => {
                session.cancel().ok();
                println!("Discarded.");
                break;
            }
            raw => match raw.parse::<usize>() {
                Ok(index) => match session.apply_one(document, index) {
                    Ok(doc) => {
                        *document = doc;
                        *dirty = true;
                        println!("Applied command {index}.");
                    }
                    Err(err) => println!("{} {err}", style("error:").red()),
                },
                Err(_) => println!("Unrecognized choice '{raw}'."),
            },
        }
    }

    if let Some(last) = session.last_contextual_update() {
        println!("{} {}", style("applied:").green(), last.summary);
        println!("(type 'undo' to revert)");
    }
    Ok(())
}
