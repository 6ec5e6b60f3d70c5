// Line-based console: command parsing and styled rendering of UI updates.
//
// Input is read on a blocking thread and forwarded line by line; rendering
// uses crossterm styling so each selector shows in their own colors.

use std::io::{self, BufRead, Write};

use crossterm::queue;
use crossterm::style::{
    Attribute, Color, Print, ResetColor, SetAttribute, SetBackgroundColor, SetForegroundColor,
};
use tokio::sync::mpsc;
use tracing::{debug, info};

use snakedraft_core::{BoardColumn, DraftStateData, Person, Review};

use crate::config::is_hex_color;
use crate::protocol::{UiUpdate, UserCommand};

// ---------------------------------------------------------------------------
// Parsing
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CommandError {
    #[error("empty command")]
    Empty,
    #[error("unknown command '{0}' (try 'help')")]
    Unknown(String),
    #[error("usage: {0}")]
    Usage(&'static str),
}

/// Parse one console line into a command.
pub fn parse_command(line: &str) -> Result<UserCommand, CommandError> {
    let line = line.trim();
    let (word, rest) = match line.split_once(char::is_whitespace) {
        Some((word, rest)) => (word, rest.trim()),
        None => (line, ""),
    };
    if word.is_empty() {
        return Err(CommandError::Empty);
    }

    if let Ok(position) = word.parse::<u32>() {
        return Ok(UserCommand::Select(position));
    }

    match word.to_ascii_lowercase().as_str() {
        "pick" | "p" => rest
            .parse::<u32>()
            .map(UserCommand::Select)
            .map_err(|_| CommandError::Usage("pick <position>")),
        "undo" | "u" => Ok(UserCommand::Undo),
        "reset" => Ok(UserCommand::Reset),
        "board" | "show" | "b" => Ok(UserCommand::Show),
        "left" | "leftovers" => Ok(UserCommand::Leftovers),
        "export" => Ok(UserCommand::Export),
        "review" | "r" => rest
            .parse::<u32>()
            .map(UserCommand::StartReview)
            .map_err(|_| CommandError::Usage("review <position>")),
        "score" | "s" => {
            let usage = CommandError::Usage("score <#rrggbb> <0-5>");
            let (color, score) = color_and_name(rest).ok_or(usage.clone())?;
            let score = score.parse::<f64>().map_err(|_| usage)?;
            Ok(UserCommand::Score { color, score })
        }
        "unscore" => {
            if rest.is_empty() || rest.contains(char::is_whitespace) {
                return Err(CommandError::Usage("unscore <#rrggbb>"));
            }
            Ok(UserCommand::Unscore(rest.to_string()))
        }
        "finish" => Ok(UserCommand::FinishReview),
        "help" | "h" | "?" => Ok(UserCommand::Help),
        "quit" | "q" | "exit" => Ok(UserCommand::Quit),
        "add" => {
            let (color, name) =
                color_and_name(rest).ok_or(CommandError::Usage("add <#rrggbb> <name>"))?;
            let contrast = contrast_for(&color);
            Ok(UserCommand::AddSelector(Person::new(name, color, contrast)))
        }
        "rename" => {
            let (color, name) =
                color_and_name(rest).ok_or(CommandError::Usage("rename <#rrggbb> <name>"))?;
            Ok(UserCommand::Rename { color, name })
        }
        "remove" | "rm" => {
            if rest.is_empty() || rest.contains(char::is_whitespace) {
                return Err(CommandError::Usage("remove <#rrggbb>"));
            }
            Ok(UserCommand::RemoveSelector(rest.to_string()))
        }
        other => Err(CommandError::Unknown(other.to_string())),
    }
}

fn color_and_name(rest: &str) -> Option<(String, String)> {
    let (color, name) = rest.split_once(char::is_whitespace)?;
    let name = name.trim();
    if color.is_empty() || name.is_empty() {
        return None;
    }
    Some((color.to_string(), name.to_string()))
}

/// Black or white, whichever reads better on `color`.
pub fn contrast_for(color: &str) -> String {
    match hex_to_rgb(color) {
        Some((r, g, b)) => {
            let luminance = 0.299 * f64::from(r) + 0.587 * f64::from(g) + 0.114 * f64::from(b);
            if luminance > 150.0 {
                "#000000".into()
            } else {
                "#ffffff".into()
            }
        }
        None => "#ffffff".into(),
    }
}

fn hex_to_rgb(color: &str) -> Option<(u8, u8, u8)> {
    if !is_hex_color(color) {
        return None;
    }
    let channel = |i: usize| u8::from_str_radix(&color[i..i + 2], 16).ok();
    Some((channel(1)?, channel(3)?, channel(5)?))
}

fn to_color(hex: &str) -> Color {
    match hex_to_rgb(hex) {
        Some((r, g, b)) => Color::Rgb { r, g, b },
        None => Color::Reset,
    }
}

// ---------------------------------------------------------------------------
// Rendering
// ---------------------------------------------------------------------------

fn badge<W: Write>(out: &mut W, person: &Person) -> io::Result<()> {
    queue!(
        out,
        SetBackgroundColor(to_color(&person.color)),
        SetForegroundColor(to_color(&person.contrast)),
        Print(format!(" {} ", person.name)),
        ResetColor
    )
}

fn render_state<W: Write>(out: &mut W, state: &DraftStateData) -> io::Result<()> {
    queue!(
        out,
        SetAttribute(Attribute::Dim),
        Print(format!(
            "round {}/{} | turn {} (#{} overall) | pick {} of this turn | {} picks made\n",
            state.round_number,
            state.rounds_count,
            state.round_turn_number,
            state.global_turn_number,
            state.turn_order + 1,
            state.global_order
        )),
        SetAttribute(Attribute::Reset)
    )
}

fn render_board<W: Write>(out: &mut W, board: &[BoardColumn]) -> io::Result<()> {
    for column in board {
        badge(out, &column.selector)?;
        queue!(out, Print("\n"))?;
        if column.picks.is_empty() {
            queue!(out, Print("    (no picks)\n"))?;
        }
        for pick in &column.picks {
            let order = pick.global_order().unwrap_or(0);
            queue!(
                out,
                Print(format!(
                    "  {order:>3}. {} ({})\n",
                    pick.entry.title, pick.entry.year
                ))
            )?;
        }
    }
    Ok(())
}

fn render_review<W: Write>(out: &mut W, review: &Review) -> io::Result<()> {
    let entry = review.entry();
    queue!(
        out,
        SetAttribute(Attribute::Bold),
        Print(format!("review: {} ({})\n", entry.title, entry.year)),
        SetAttribute(Attribute::Reset)
    )?;
    for reviewer in review.reviewers() {
        queue!(out, Print("  "))?;
        badge(out, &reviewer.person)?;
        let score = match reviewer.score {
            Some(score) => format!(" {score}\n"),
            None => " -\n".to_string(),
        };
        queue!(out, Print(score))?;
    }
    Ok(())
}

/// Write one update to `out`.
pub fn render<W: Write>(out: &mut W, update: &UiUpdate) -> io::Result<()> {
    match update {
        UiUpdate::State(state) => render_state(out, state)?,
        UiUpdate::ActiveSelector(Some(person)) => {
            queue!(out, Print("on the clock: "))?;
            badge(out, person)?;
            queue!(out, Print("\n"))?;
        }
        UiUpdate::ActiveSelector(None) => {}
        UiUpdate::Complete(true) => queue!(
            out,
            SetAttribute(Attribute::Bold),
            Print("the draft is complete\n"),
            SetAttribute(Attribute::Reset)
        )?,
        UiUpdate::Complete(false) => {}
        UiUpdate::Board(board) => render_board(out, board)?,
        UiUpdate::Leftovers(titles) => {
            queue!(out, Print(format!("{} undrafted:\n", titles.len())))?;
            for title in titles {
                queue!(out, Print(format!("  {title}\n")))?;
            }
        }
        UiUpdate::Review(review) => render_review(out, review)?,
        UiUpdate::Message(text) => queue!(out, Print(format!("{text}\n")))?,
        UiUpdate::Error(text) => queue!(
            out,
            SetForegroundColor(Color::Red),
            Print(format!("error: {text}\n")),
            ResetColor
        )?,
    }
    out.flush()
}

// ---------------------------------------------------------------------------
// Console loop
// ---------------------------------------------------------------------------

/// Run the console until the user quits, stdin closes, or the app stops
/// sending updates.
pub async fn run(
    mut ui_rx: mpsc::Receiver<UiUpdate>,
    cmd_tx: mpsc::Sender<UserCommand>,
) -> anyhow::Result<()> {
    let (line_tx, mut line_rx) = mpsc::channel::<String>(16);

    // Blocking stdin reader feeding lines into the select loop.
    std::thread::spawn(move || {
        let stdin = io::stdin();
        for line in stdin.lock().lines() {
            let Ok(line) = line else { break };
            if line_tx.blocking_send(line).is_err() {
                break;
            }
        }
    });

    let mut stdout = io::stdout();
    loop {
        tokio::select! {
            update = ui_rx.recv() => {
                match update {
                    Some(update) => render(&mut stdout, &update)?,
                    None => break,
                }
            }

            line = line_rx.recv() => {
                let Some(line) = line else {
                    info!("stdin closed, quitting");
                    let _ = cmd_tx.send(UserCommand::Quit).await;
                    break;
                };
                match parse_command(&line) {
                    Ok(UserCommand::Quit) => {
                        let _ = cmd_tx.send(UserCommand::Quit).await;
                        break;
                    }
                    Ok(cmd) => {
                        debug!("console command: {:?}", cmd);
                        if cmd_tx.send(cmd).await.is_err() {
                            break;
                        }
                    }
                    Err(CommandError::Empty) => {}
                    Err(e) => render(&mut stdout, &UiUpdate::Error(e.to_string()))?,
                }
            }
        }
    }

    Ok(())
}
