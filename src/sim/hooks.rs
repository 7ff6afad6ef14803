/// Node lifecycle hooks.
///
/// The render pipeline tags each node it renders with a hook and reports
/// `mounted` / `updated` / `destroyed` for it. `Hooks` routes those
/// callbacks to the right animation component and owns the state each
/// one needs, so nothing is shared between hooks.

use tracing::info;

use crate::domain::element::{ElementAccessor, NodeClasses, NodeHandle, TRADE_HISTORY};
use crate::domain::polarity::{Polarity, ValueExtractor};
use crate::sim::animate::{AnimationSessions, AnimationTrigger, FlashOnMount, SessionId};

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Hook {
    /// Order acknowledgement: flash once per mount.
    Order,
    /// Trade history: keep the newest trade in view.
    History,
    /// A player's points, plain number.
    Points,
    /// A hand count rendered as `(n)`.
    Hand,
    /// End-of-round banner: the round boundary.
    EndGame,
}

pub struct Hooks {
    pub sessions: AnimationSessions,
    order: FlashOnMount,
    points: AnimationTrigger,
    hand: AnimationTrigger,
}

impl Hooks {
    pub fn new() -> Self {
        Hooks {
            sessions: AnimationSessions::new(),
            order: FlashOnMount::new(),
            points: AnimationTrigger::new(Polarity::POINTS, ValueExtractor::Plain),
            hand: AnimationTrigger::new(Polarity::HAND, ValueExtractor::Bracketed),
        }
    }

    pub fn mounted<D: ElementAccessor + NodeClasses>(
        &mut self,
        doc: &mut D,
        hook: Hook,
        identity: &str,
        node: NodeHandle,
        text: &str,
    ) -> Option<SessionId> {
        match hook {
            Hook::Order => self.order.on_mount(doc, &mut self.sessions, node),
            Hook::History => {
                doc.scroll_to_bottom(TRADE_HISTORY);
                None
            }
            Hook::Points => {
                self.points.on_mount(identity, node, text);
                None
            }
            Hook::Hand => {
                self.hand.on_mount(identity, node, text);
                None
            }
            Hook::EndGame => {
                info!("round over; resetting tracked values");
                self.points.on_reset();
                self.hand.on_reset();
                None
            }
        }
    }

    pub fn updated<D: ElementAccessor + NodeClasses>(
        &mut self,
        doc: &mut D,
        hook: Hook,
        identity: &str,
        node: NodeHandle,
        text: &str,
    ) -> Option<SessionId> {
        match hook {
            Hook::Points => self.points.on_update(doc, &mut self.sessions, identity, node, text),
            Hook::Hand => self.hand.on_update(doc, &mut self.sessions, identity, node, text),
            Hook::History => {
                doc.scroll_to_bottom(TRADE_HISTORY);
                None
            }
            Hook::Order | Hook::EndGame => None,
        }
    }

    /// Destruction alone never resets a cache; only `EndGame` does.
    pub fn destroyed(&mut self, hook: Hook, identity: &str, node: NodeHandle) {
        match hook {
            Hook::Order => self.order.on_destroy(node),
            Hook::Points => self.points.on_destroy(identity),
            Hook::Hand => self.hand.on_destroy(identity),
            Hook::History | Hook::EndGame => {}
        }
    }

    /// Animation-completion signal from the host.
    pub fn animation_end<D: NodeClasses>(&mut self, doc: &mut D, id: SessionId) -> bool {
        self.sessions.finish(doc, id)
    }
}

impl Default for Hooks {
    fn default() -> Self {
        Hooks::new()
    }
}
