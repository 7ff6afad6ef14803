/// Desk: a stand-in for the game server.
///
/// Applies submitted tickets to the local player's points and hand, runs
/// rounds, and pushes every change through a render pipeline that swaps in
/// a fresh physical node for each changed value while keeping its logical
/// identity. The animation hooks see the same treatment a server-driven
/// re-render gives them.

use std::collections::VecDeque;

use tracing::{info, warn};

use crate::config::TableConfig;
use crate::domain::element::{NodeHandle, REQUEUE, SUITS, TRADE_HISTORY};
use crate::sim::document::{Control, Direction, Document, OrderKind, OrderTicket};
use crate::sim::event::DeskEvent;
use crate::sim::hooks::{Hook, Hooks};

pub const POINTS_ID: &str = "points_you";
pub const END_GAME_ID: &str = "end_game";

/// Order acknowledgements kept on screen.
const MAX_ACKS: usize = 4;

pub fn hand_id(suit: char) -> String {
    format!("hand_{suit}")
}

fn suit_index(suit: char) -> Option<usize> {
    SUITS.iter().position(|s| *s == suit)
}

/// A node the pipeline rendered, with the text it rendered into it.
#[derive(Clone, Debug)]
struct Rendered {
    hook: Hook,
    identity: String,
    node: NodeHandle,
    text: String,
}

pub struct Desk {
    table: TableConfig,
    points: i64,
    hand: [u32; 4],
    round: u32,
    in_round: bool,
    acks_sent: u64,
    views: Vec<Rendered>,
    acks: VecDeque<Rendered>,
    end_game: Option<NodeHandle>,
}

impl Desk {
    pub fn new(table: TableConfig) -> Self {
        let cards = table.starting_cards;
        Desk {
            points: table.starting_points,
            table,
            hand: [cards; 4],
            round: 0,
            in_round: false,
            acks_sent: 0,
            views: Vec::new(),
            acks: VecDeque::with_capacity(MAX_ACKS + 1),
            end_game: None,
        }
    }

    pub fn points(&self) -> i64 {
        self.points
    }

    #[allow(dead_code)]
    pub fn hand(&self, suit: char) -> u32 {
        suit_index(suit).map_or(0, |i| self.hand[i])
    }

    pub fn round(&self) -> u32 {
        self.round
    }

    pub fn in_round(&self) -> bool {
        self.in_round
    }

    /// Physical node currently showing `identity`.
    pub fn node_for(&self, identity: &str) -> Option<NodeHandle> {
        self.views.iter().find(|v| v.identity == identity).map(|v| v.node)
    }

    /// Acknowledgement nodes, oldest first.
    pub fn ack_nodes(&self) -> impl Iterator<Item = NodeHandle> + '_ {
        self.acks.iter().map(|a| a.node)
    }

    // ── Rounds ──

    pub fn start_round(&mut self, doc: &mut Document, hooks: &mut Hooks) -> DeskEvent {
        if let Some(node) = self.end_game.take() {
            hooks.destroyed(Hook::EndGame, END_GAME_ID, node);
            doc.destroy_node(node);
        }
        doc.remove(REQUEUE);
        doc.clear_history();

        self.round += 1;
        self.in_round = true;
        self.points = self.table.starting_points;
        self.hand = [self.table.starting_cards; 4];
        self.render(doc, hooks);

        info!(round = self.round, "round started");
        DeskEvent::RoundStarted { round: self.round }
    }

    /// Countdown expiry. Mounting the end-game node is the round boundary.
    pub fn end_round(&mut self, doc: &mut Document, hooks: &mut Hooks) -> Option<DeskEvent> {
        if !self.in_round {
            return None;
        }
        self.in_round = false;

        let node = doc.create_node(END_GAME_ID, "");
        hooks.mounted(doc, Hook::EndGame, END_GAME_ID, node, "");
        self.end_game = Some(node);

        doc.insert(REQUEUE, Control::Button);
        doc.open_modal(&format!("Round {} over: {} points. Press Y to requeue.", self.round, self.points));

        info!(round = self.round, points = self.points, "round ended");
        Some(DeskEvent::RoundEnded { round: self.round })
    }

    // ── Orders ──

    pub fn apply(&mut self, doc: &mut Document, hooks: &mut Hooks, ticket: &OrderTicket) -> DeskEvent {
        let event = self.fill(ticket);
        match &event {
            DeskEvent::OrderRejected { reason, .. } => warn!(?ticket, reason, "order rejected"),
            _ => info!(%event, "order applied"),
        }

        doc.push_history(event.to_string());
        self.acknowledge(doc, hooks, event.to_string());
        self.render(doc, hooks);
        event
    }

    fn fill(&mut self, ticket: &OrderTicket) -> DeskEvent {
        let (direction, suit) = (ticket.direction, ticket.suit);
        let reject = |reason| DeskEvent::OrderRejected { direction, suit, reason };

        if !self.in_round {
            return reject("round over");
        }
        let slot = match suit_index(suit) {
            Some(i) => i,
            None => return reject("unknown suit"),
        };
        let price = match (ticket.kind, ticket.price) {
            (OrderKind::Cancel, _) => return DeskEvent::OrderCancelled { direction, suit },
            (OrderKind::Market, _) => self.table.market_price,
            (OrderKind::Limit, Some(p)) => p,
            (OrderKind::Limit, None) => return reject("limit order without price"),
        };

        match direction {
            Direction::Buy => {
                if self.points < price as i64 {
                    return reject("not enough points");
                }
                self.points -= price as i64;
                self.hand[slot] += 1;
            }
            Direction::Sell => {
                if self.hand[slot] == 0 {
                    return reject("no card to sell");
                }
                self.points += price as i64;
                self.hand[slot] -= 1;
            }
        }
        DeskEvent::OrderFilled { direction, suit, price }
    }

    fn acknowledge(&mut self, doc: &mut Document, hooks: &mut Hooks, line: String) {
        self.acks_sent += 1;
        let identity = format!("order_{}", self.acks_sent);
        let node = doc.create_node(&identity, &line);
        hooks.mounted(doc, Hook::Order, &identity, node, &line);
        self.acks.push_back(Rendered { hook: Hook::Order, identity, node, text: line });

        while self.acks.len() > MAX_ACKS {
            if let Some(old) = self.acks.pop_front() {
                hooks.destroyed(old.hook, &old.identity, old.node);
                doc.destroy_node(old.node);
            }
        }
    }

    // ── Render pipeline ──

    fn render(&mut self, doc: &mut Document, hooks: &mut Hooks) {
        let mut wanted = vec![(Hook::Points, POINTS_ID.to_string(), self.points.to_string())];
        for (i, suit) in SUITS.iter().enumerate() {
            wanted.push((Hook::Hand, hand_id(*suit), format!("({})", self.hand[i])));
        }
        wanted.push((Hook::History, TRADE_HISTORY.to_string(), doc.history().len().to_string()));

        for (hook, identity, text) in wanted {
            self.patch(doc, hooks, hook, &identity, text);
        }
    }

    /// Mount a new identity, or replace the node of a changed one and
    /// report it as an update. Unchanged nodes are left alone.
    fn patch(&mut self, doc: &mut Document, hooks: &mut Hooks, hook: Hook, identity: &str, text: String) {
        match self.views.iter().position(|v| v.identity == identity) {
            None => {
                let node = doc.create_node(identity, &text);
                hooks.mounted(doc, hook, identity, node, &text);
                self.views.push(Rendered { hook, identity: identity.to_string(), node, text });
            }
            Some(i) if self.views[i].text == text => {}
            Some(i) => {
                doc.destroy_node(self.views[i].node);
                let node = doc.create_node(identity, &text);
                hooks.updated(doc, hook, identity, node, &text);
                self.views[i].node = node;
                self.views[i].text = text;
            }
        }
    }
}

// ══════════════════════════════════════════════════════════════
// Unit tests
// ══════════════════════════════════════════════════════════════
