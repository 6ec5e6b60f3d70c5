// Messages exchanged between the console and the app event loop.

use snakedraft_core::{BoardColumn, DraftStateData, Person, Review};

/// Commands sent from the console to the app.
#[derive(Debug, Clone, PartialEq)]
pub enum UserCommand {
    /// Claim the entry at this list position for the selector on the clock.
    Select(u32),
    Undo,
    Reset,
    Rename { color: String, name: String },
    AddSelector(Person),
    RemoveSelector(String),
    Export,
    /// Show every selector's picks.
    Show,
    /// List entries that are still undrafted.
    Leftovers,
    /// Open a review of the entry at this list position.
    StartReview(u32),
    Score { color: String, score: f64 },
    Unscore(String),
    FinishReview,
    Help,
    Quit,
}

/// Updates pushed from the app to the console.
#[derive(Debug, Clone, PartialEq)]
pub enum UiUpdate {
    State(DraftStateData),
    /// `None` once the draft is complete.
    ActiveSelector(Option<Person>),
    Complete(bool),
    Board(Vec<BoardColumn>),
    Leftovers(Vec<String>),
    /// The open review after a change.
    Review(Review),
    Message(String),
    Error(String),
}

pub const HELP: &str = "\
commands:
  pick <position>          draft the entry at <position> (a bare number works too)
  undo                     take back the last pick
  reset                    clear every pick
  board                    show each selector's picks
  left                     list undrafted entries
  add <#rrggbb> <name>     add a selector (resets the draft)
  remove <#rrggbb>         remove a selector (resets the draft)
  rename <#rrggbb> <name>  rename a selector
  export                   write the board to CSV
  review <position>        start scoring a watched entry
  score <#rrggbb> <0-5>    set a reviewer's score
  unscore <#rrggbb>        clear a reviewer's score
  finish                   average the scores and write them to CSV
  help                     show this list
  quit                     exit";
