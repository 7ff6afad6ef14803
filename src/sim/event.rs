/// Events emitted by the desk as it applies orders and runs rounds.
/// The host logs them and the renderer shows the latest as a status line.

use std::fmt;

use crate::sim::document::Direction;

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum DeskEvent {
    OrderFilled { direction: Direction, suit: char, price: u32 },
    OrderRejected { direction: Direction, suit: char, reason: &'static str },
    OrderCancelled { direction: Direction, suit: char },
    RoundStarted { round: u32 },
    RoundEnded { round: u32 },
}

fn side(direction: Direction) -> &'static str {
    match direction {
        Direction::Buy => "BUY",
        Direction::Sell => "SELL",
    }
}

impl fmt::Display for DeskEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DeskEvent::OrderFilled { direction, suit, price } => {
                write!(f, "{} {} @ {}", side(*direction), suit, price)
            }
            DeskEvent::OrderRejected { direction, suit, reason } => {
                write!(f, "{} {} rejected: {}", side(*direction), suit, reason)
            }
            DeskEvent::OrderCancelled { direction, suit } => {
                write!(f, "{} {} cancelled", side(*direction), suit)
            }
            DeskEvent::RoundStarted { round } => write!(f, "round {round} started"),
            DeskEvent::RoundEnded { round } => write!(f, "round {round} over"),
        }
    }
}
