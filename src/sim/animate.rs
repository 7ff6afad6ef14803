/// Differential animation triggers.
///
/// ## Identity vs. node
///
/// The render pipeline may destroy a node and create a replacement for the
/// same logical identity on any update. Caches here are keyed by identity;
/// the physical `NodeHandle` is only remembered so a superseded animation
/// can be detached, and is refreshed on every callback.
///
/// ## Sessions
///
/// Applying a class opens a session; the host reports the CSS
/// animation-completion signal with `AnimationSessions::finish`, which
/// releases the session exactly once. Release never strips a class that a
/// newer live session on the same node still holds.

use std::collections::{HashMap, HashSet};

use tracing::{debug, trace};

use crate::domain::element::{NodeClasses, NodeHandle};
use crate::domain::polarity::{AnimationClass, Polarity, ValueExtractor};

// ══════════════════════════════════════════════════════════════
// Sessions
// ══════════════════════════════════════════════════════════════

#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, PartialOrd, Ord)]
pub struct SessionId(pub u64);

#[derive(Clone, Copy, Debug)]
struct Session {
    node: NodeHandle,
    class: AnimationClass,
    /// Superseded: its class was already taken off the node.
    detached: bool,
}

pub struct AnimationSessions {
    next_id: u64,
    pending: HashMap<SessionId, Session>,
}

impl AnimationSessions {
    pub fn new() -> Self {
        AnimationSessions { next_id: 1, pending: HashMap::new() }
    }

    /// Add `class` to `node` and arm its completion listener.
    /// `None` when the node no longer exists.
    pub fn start<V: NodeClasses>(
        &mut self,
        view: &mut V,
        node: NodeHandle,
        class: AnimationClass,
    ) -> Option<SessionId> {
        if !view.add_class(node, class.css()) {
            return None;
        }
        let id = SessionId(self.next_id);
        self.next_id += 1;
        self.pending.insert(id, Session { node, class, detached: false });
        trace!(?id, ?node, class = class.css(), "animation started");
        Some(id)
    }

    /// Completion signal. Returns `false` for an unknown or already
    /// finished session, so repeated signals are harmless.
    pub fn finish<V: NodeClasses>(&mut self, view: &mut V, id: SessionId) -> bool {
        let session = match self.pending.remove(&id) {
            Some(s) => s,
            None => return false,
        };
        if !session.detached && !self.is_held(session.node, session.class) {
            view.remove_class(session.node, session.class.css());
        }
        trace!(?id, class = session.class.css(), "animation finished");
        true
    }

    /// Take a session's class off its node ahead of its completion signal.
    /// The listener stays armed.
    fn detach<V: NodeClasses>(&mut self, view: &mut V, id: SessionId) {
        let session = match self.pending.get_mut(&id) {
            Some(s) if !s.detached => s,
            _ => return,
        };
        session.detached = true;
        let (node, class) = (session.node, session.class);
        if !self.is_held(node, class) {
            view.remove_class(node, class.css());
        }
    }

    #[allow(dead_code)]
    pub fn is_pending(&self, id: SessionId) -> bool {
        self.pending.contains_key(&id)
    }

    /// Sessions still waiting for their completion signal, oldest first.
    pub fn pending_ids(&self) -> Vec<SessionId> {
        let mut ids: Vec<SessionId> = self.pending.keys().copied().collect();
        ids.sort();
        ids
    }

    #[allow(dead_code)]
    pub fn len(&self) -> usize {
        self.pending.len()
    }

    fn is_held(&self, node: NodeHandle, class: AnimationClass) -> bool {
        self.pending.values().any(|s| !s.detached && s.node == node && s.class == class)
    }
}

impl Default for AnimationSessions {
    fn default() -> Self {
        AnimationSessions::new()
    }
}

// ══════════════════════════════════════════════════════════════
// Differential trigger
// ══════════════════════════════════════════════════════════════

#[derive(Clone, Copy, Debug)]
struct Tracked {
    previous: Option<f64>,
    node: Option<NodeHandle>,
    active: Option<SessionId>,
}

/// Flashes a tracked quantity when its value moves, in the direction's
/// class for this quantity's polarity.
pub struct AnimationTrigger {
    polarity: Polarity,
    extractor: ValueExtractor,
    tracked: HashMap<String, Tracked>,
}

impl AnimationTrigger {
    pub fn new(polarity: Polarity, extractor: ValueExtractor) -> Self {
        AnimationTrigger { polarity, extractor, tracked: HashMap::new() }
    }

    /// Record the first reading after a (re)mount. Never animates.
    pub fn on_mount(&mut self, identity: &str, node: NodeHandle, text: &str) {
        let value = self.extractor.extract(text);
        let entry = self.entry(identity);
        entry.node = Some(node);
        if value.is_some() {
            entry.previous = value;
        }
    }

    /// Compare against the cached reading; animate on a change.
    pub fn on_update<V: NodeClasses>(
        &mut self,
        view: &mut V,
        sessions: &mut AnimationSessions,
        identity: &str,
        node: NodeHandle,
        text: &str,
    ) -> Option<SessionId> {
        let current = match self.extractor.extract(text) {
            Some(v) => v,
            None => {
                trace!(identity, text, "unreadable value ignored");
                self.entry(identity).node = Some(node);
                return None;
            }
        };

        let polarity = self.polarity;
        let entry = self.entry(identity);
        entry.node = Some(node);
        let previous = entry.previous.replace(current)?;
        let class = polarity.classify(previous, current)?;
        let superseded = entry.active.take();

        if let Some(old) = superseded {
            sessions.detach(view, old);
        }
        let id = sessions.start(view, node, class);
        self.entry(identity).active = id;
        debug!(identity, previous, current, class = class.css(), "value changed");
        id
    }

    /// The node went away; keep its reading for the replacement.
    pub fn on_destroy(&mut self, identity: &str) {
        if let Some(entry) = self.tracked.get_mut(identity) {
            entry.node = None;
            entry.active = None;
        }
    }

    /// Round boundary: forget every reading so the next update is a first
    /// observation.
    pub fn on_reset(&mut self) {
        debug!(count = self.tracked.len(), "tracked values reset");
        self.tracked.clear();
    }

    #[allow(dead_code)]
    pub fn previous(&self, identity: &str) -> Option<f64> {
        self.tracked.get(identity).and_then(|t| t.previous)
    }

    fn entry(&mut self, identity: &str) -> &mut Tracked {
        self.tracked
            .entry(identity.to_string())
            .or_insert(Tracked { previous: None, node: None, active: None })
    }
}

// ══════════════════════════════════════════════════════════════
// Flash on mount
// ══════════════════════════════════════════════════════════════

/// Flashes every newly mounted node once, with no value comparison.
pub struct FlashOnMount {
    flashed: HashSet<NodeHandle>,
}

impl FlashOnMount {
    pub fn new() -> Self {
        FlashOnMount { flashed: HashSet::new() }
    }

    /// A repeated mount callback for the same physical node is ignored;
    /// the class comes off only through the session's completion.
    pub fn on_mount<V: NodeClasses>(
        &mut self,
        view: &mut V,
        sessions: &mut AnimationSessions,
        node: NodeHandle,
    ) -> Option<SessionId> {
        if !self.flashed.insert(node) {
            return None;
        }
        sessions.start(view, node, AnimationClass::Flash)
    }

    pub fn on_destroy(&mut self, node: NodeHandle) {
        self.flashed.remove(&node);
    }
}

impl Default for FlashOnMount {
    fn default() -> Self {
        FlashOnMount::new()
    }
}

// ══════════════════════════════════════════════════════════════
// Unit tests
// ══════════════════════════════════════════════════════════════

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::document::Document;

    const BUY: &str = "buy-animated";
    const SELL: &str = "sell-animated";

    struct Rig {
        doc: Document,
        sessions: AnimationSessions,
        trigger: AnimationTrigger,
    }

    impl Rig {
        fn points() -> Self {
            Rig {
                doc: Document::new(),
                sessions: AnimationSessions::new(),
                trigger: AnimationTrigger::new(Polarity::POINTS, ValueExtractor::Plain),
            }
        }

        fn hand() -> Self {
            Rig { trigger: AnimationTrigger::new(Polarity::HAND, ValueExtractor::Bracketed), ..Rig::points() }
        }

        fn mount(&mut self, identity: &str, text: &str) -> NodeHandle {
            let node = self.doc.create_node(identity, text);
            self.trigger.on_mount(identity, node, text);
            node
        }

        fn update(&mut self, identity: &str, node: NodeHandle, text: &str) -> Option<SessionId> {
            self.trigger.on_update(&mut self.doc, &mut self.sessions, identity, node, text)
        }
    }

    #[test]
    fn first_observation_never_animates() {
        for initial in ["0", "-3", "10", "999"] {
            let mut rig = Rig::points();
            let node = rig.mount("p1", initial);
            assert!(rig.doc.node_classes(node).is_empty());
            assert_eq!(rig.sessions.len(), 0);
        }
    }

    #[test]
    fn update_without_mount_is_first_observation() {
        let mut rig = Rig::points();
        let node = rig.doc.create_node("p1", "4");
        assert_eq!(rig.update("p1", node, "4"), None);
        assert!(rig.update("p1", node, "9").is_some());
    }

    #[test]
    fn equal_updates_never_animate() {
        let mut rig = Rig::points();
        let node = rig.mount("p1", "7");
        assert_eq!(rig.update("p1", node, "7"), None);
        assert_eq!(rig.update("p1", node, " 7 "), None);
        assert!(rig.doc.node_classes(node).is_empty());
    }

    #[test]
    fn increase_then_decrease_gives_opposite_classes() {
        let mut rig = Rig::hand();
        let node = rig.mount("hand_h", "(2)");
        let up = rig.update("hand_h", node, "(3)").unwrap();
        assert!(rig.doc.has_class(node, BUY));
        rig.sessions.finish(&mut rig.doc, up);
        rig.update("hand_h", node, "(1)").unwrap();
        assert!(rig.doc.has_class(node, SELL));
        assert!(!rig.doc.has_class(node, BUY));
    }

    #[test]
    fn points_scenario_with_reset() {
        let mut rig = Rig::points();
        let node = rig.mount("points", "10");
        assert!(rig.doc.node_classes(node).is_empty());

        let id = rig.update("points", node, "15").unwrap();
        assert_eq!(rig.doc.node_classes(node), [SELL]);
        rig.sessions.finish(&mut rig.doc, id);

        assert_eq!(rig.update("points", node, "15"), None);

        rig.trigger.on_reset();
        assert_eq!(rig.update("points", node, "5"), None);
        assert!(rig.doc.node_classes(node).is_empty());
        assert_eq!(rig.trigger.previous("points"), Some(5.0));
    }

    #[test]
    fn reset_clears_every_identity() {
        let mut rig = Rig::points();
        let a = rig.mount("a", "1");
        let b = rig.mount("b", "2");
        rig.trigger.on_reset();
        assert_eq!(rig.update("a", a, "100"), None);
        assert_eq!(rig.update("b", b, "-100"), None);
    }

    #[test]
    fn cache_survives_node_replacement() {
        let mut rig = Rig::points();
        let old = rig.mount("p1", "10");
        rig.doc.destroy_node(old);
        rig.trigger.on_destroy("p1");

        let new = rig.doc.create_node("p1", "4");
        rig.update("p1", new, "4").unwrap();
        assert_eq!(rig.doc.node_classes(new), [BUY]);
    }

    #[test]
    fn interleaved_identities_do_not_share_state() {
        let mut rig = Rig::points();
        let a = rig.mount("a", "1");
        let b = rig.mount("b", "50");
        rig.update("a", a, "2").unwrap();
        assert_eq!(rig.update("b", b, "50"), None);
        rig.update("b", b, "40").unwrap();
        assert_eq!(rig.doc.node_classes(a), [SELL]);
        assert_eq!(rig.doc.node_classes(b), [BUY]);
    }

    #[test]
    fn unreadable_text_is_ignored() {
        let mut rig = Rig::points();
        let node = rig.mount("p1", "10");
        assert_eq!(rig.update("p1", node, "--"), None);
        assert_eq!(rig.trigger.previous("p1"), Some(10.0));
        assert!(rig.update("p1", node, "11").is_some());
    }

    // ── Sessions ──

    #[test]
    fn completion_fires_once() {
        let mut rig = Rig::points();
        let node = rig.mount("p1", "1");
        let id = rig.update("p1", node, "2").unwrap();
        assert!(rig.sessions.finish(&mut rig.doc, id));
        assert!(!rig.sessions.finish(&mut rig.doc, id));
        assert!(rig.doc.node_classes(node).is_empty());
    }

    #[test]
    fn overlapping_trigger_leaves_one_class_and_no_stale_one() {
        let mut rig = Rig::points();
        let node = rig.mount("p1", "10");
        let first = rig.update("p1", node, "20").unwrap();
        let second = rig.update("p1", node, "5").unwrap();
        assert_eq!(rig.doc.node_classes(node), [BUY]);

        // Old listener still fires, and leaves the newer class alone
        assert!(rig.sessions.finish(&mut rig.doc, first));
        assert_eq!(rig.doc.node_classes(node), [BUY]);
        assert!(rig.sessions.finish(&mut rig.doc, second));
        assert!(rig.doc.node_classes(node).is_empty());
    }

    #[test]
    fn same_class_overlap_is_removed_only_by_newest() {
        let mut rig = Rig::points();
        let node = rig.mount("p1", "1");
        let first = rig.update("p1", node, "2").unwrap();
        let second = rig.update("p1", node, "3").unwrap();
        rig.sessions.finish(&mut rig.doc, first);
        assert!(rig.doc.has_class(node, SELL));
        rig.sessions.finish(&mut rig.doc, second);
        assert!(!rig.doc.has_class(node, SELL));
    }

    #[test]
    fn finish_after_node_destroyed_is_harmless() {
        let mut rig = Rig::points();
        let node = rig.mount("p1", "1");
        let id = rig.update("p1", node, "2").unwrap();
        rig.doc.destroy_node(node);
        assert!(rig.sessions.finish(&mut rig.doc, id));
        assert_eq!(rig.sessions.len(), 0);
    }

    // ── Flash on mount ──

    #[test]
    fn flash_on_every_new_node() {
        let mut doc = Document::new();
        let mut sessions = AnimationSessions::new();
        let mut flash = FlashOnMount::new();

        let a = doc.create_node("order_1", "BUY h @ 5");
        let id = flash.on_mount(&mut doc, &mut sessions, a).unwrap();
        assert!(doc.has_class(a, "animated"));

        // Duplicate mount callback for the same node does nothing
        assert_eq!(flash.on_mount(&mut doc, &mut sessions, a), None);

        sessions.finish(&mut doc, id);
        assert!(!doc.has_class(a, "animated"));
        // Completion does not re-trigger
        assert_eq!(sessions.len(), 0);

        let b = doc.create_node("order_1", "BUY h @ 5");
        assert!(flash.on_mount(&mut doc, &mut sessions, b).is_some());
    }

    #[test]
    fn flash_class_stays_until_completion() {
        let mut doc = Document::new();
        let mut sessions = AnimationSessions::new();
        let mut flash = FlashOnMount::new();
        let a = doc.create_node("order_2", "SELL l @ 9");
        let id = flash.on_mount(&mut doc, &mut sessions, a).unwrap();
        assert!(sessions.is_pending(id));
        assert!(doc.has_class(a, "animated"));
    }
}
