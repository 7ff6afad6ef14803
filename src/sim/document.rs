/// Document: the in-memory page the console runs against.
///
/// Holds the order form controls (keyed by their stable ids), focus, the
/// optional modal, the trade-history scroller, and the physical view nodes
/// that the render pipeline creates and destroys. It implements both
/// `ElementAccessor` and `NodeClasses`, so the dispatcher and the
/// animation hooks operate on it exactly as they would on a live page.
///
/// Form semantics follow HTML: radios in a group are mutually exclusive,
/// a disabled field is skipped by validation and cannot hold focus, and
/// clicking submit on an invalid form submits nothing.

use std::collections::{BTreeSet, HashMap};

use tracing::trace;

use crate::domain::element::{
    self, ElementAccessor, NodeClasses, NodeHandle, MODAL_CLOSE, ORDER_DIRECTION_BUY,
    ORDER_DIRECTION_SELL, ORDER_FORM, ORDER_PRICE, ORDER_SUBMIT, ORDER_SUIT, ORDER_TYPE_CANCEL,
    ORDER_TYPE_LIMIT, ORDER_TYPE_MARKET, REQUEUE, TRADE_HISTORY,
};

// ══════════════════════════════════════════════════════════════
// Public types
// ══════════════════════════════════════════════════════════════

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Control {
    Radio { group: &'static str, checked: bool },
    Dropdown { value: String, options: Vec<String> },
    Text { value: String, disabled: bool },
    Button,
    Form,
    /// Scrollable list; `offset` is the index one past the last visible line.
    Scroller { offset: usize },
}

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Direction {
    Buy,
    Sell,
}

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum OrderKind {
    Limit,
    Market,
    Cancel,
}

/// A submitted order, as the form would post it.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct OrderTicket {
    pub direction: Direction,
    pub suit: char,
    pub kind: OrderKind,
    /// Present only for limit orders.
    pub price: Option<u32>,
}

#[derive(Clone, Debug)]
struct Node {
    text: String,
    classes: BTreeSet<&'static str>,
}

pub struct Document {
    controls: HashMap<String, Control>,
    focus: Option<String>,
    modal: Option<String>,
    history: Vec<String>,
    nodes: HashMap<NodeHandle, Node>,
    next_node: u64,
    submissions: Vec<OrderTicket>,
    requeue_requested: bool,
}

const DIRECTION_GROUP: &str = "order[direction]";
const TYPE_GROUP: &str = "order[type]";

impl Document {
    /// An empty page with no controls.
    pub fn new() -> Self {
        Document {
            controls: HashMap::new(),
            focus: None,
            modal: None,
            history: Vec::new(),
            nodes: HashMap::new(),
            next_node: 1,
            submissions: Vec::new(),
            requeue_requested: false,
        }
    }

    /// The trading page as the server first renders it: no direction
    /// chosen, suit `h`, limit order-type, empty enabled price field.
    pub fn order_page() -> Self {
        let mut doc = Document::new();
        doc.insert(ORDER_FORM, Control::Form);
        doc.insert(ORDER_DIRECTION_BUY, Control::Radio { group: DIRECTION_GROUP, checked: false });
        doc.insert(ORDER_DIRECTION_SELL, Control::Radio { group: DIRECTION_GROUP, checked: false });
        doc.insert(
            ORDER_SUIT,
            Control::Dropdown {
                value: "h".into(),
                options: element::SUITS.iter().map(|s| s.to_string()).collect(),
            },
        );
        doc.insert(ORDER_TYPE_LIMIT, Control::Radio { group: TYPE_GROUP, checked: true });
        doc.insert(ORDER_TYPE_MARKET, Control::Radio { group: TYPE_GROUP, checked: false });
        doc.insert(ORDER_TYPE_CANCEL, Control::Radio { group: TYPE_GROUP, checked: false });
        doc.insert(ORDER_PRICE, Control::Text { value: String::new(), disabled: false });
        doc.insert(ORDER_SUBMIT, Control::Button);
        doc.insert(TRADE_HISTORY, Control::Scroller { offset: 0 });
        doc
    }

    // ── Controls ──

    pub fn insert(&mut self, id: &str, control: Control) {
        self.controls.insert(id.to_string(), control);
    }

    /// Drop a control, as a re-render in flight would.
    pub fn remove(&mut self, id: &str) -> Option<Control> {
        if self.focus.as_deref() == Some(id) {
            self.focus = None;
        }
        self.controls.remove(id)
    }

    #[allow(dead_code)]
    pub fn contains(&self, id: &str) -> bool {
        self.controls.contains_key(id)
    }

    /// Move focus to a control. Disabled and missing controls refuse it.
    pub fn focus(&mut self, id: &str) -> bool {
        match self.controls.get(id) {
            Some(Control::Text { disabled: true, .. }) | None => false,
            Some(_) => {
                self.focus = Some(id.to_string());
                true
            }
        }
    }

    pub fn blur(&mut self) {
        self.focus = None;
    }

    // ── Modal ──

    /// Open a modal dialog; its close control appears with it.
    pub fn open_modal(&mut self, body: &str) {
        self.modal = Some(body.to_string());
        self.insert(MODAL_CLOSE, Control::Button);
    }

    pub fn modal(&self) -> Option<&str> {
        self.modal.as_deref()
    }

    // ── Trade history ──

    pub fn push_history(&mut self, line: String) {
        self.history.push(line);
    }

    pub fn history(&self) -> &[String] {
        &self.history
    }

    pub fn clear_history(&mut self) {
        self.history.clear();
        if let Some(Control::Scroller { offset }) = self.controls.get_mut(TRADE_HISTORY) {
            *offset = 0;
        }
    }

    /// Lines visible in a viewport of `rows` rows at the current scroll offset.
    pub fn history_window(&self, rows: usize) -> &[String] {
        let end = match self.controls.get(TRADE_HISTORY) {
            Some(Control::Scroller { offset }) => (*offset).min(self.history.len()),
            _ => self.history.len(),
        };
        &self.history[end.saturating_sub(rows)..end]
    }

    // ── Physical nodes ──

    pub fn create_node(&mut self, identity: &str, text: &str) -> NodeHandle {
        let handle = NodeHandle(self.next_node);
        self.next_node += 1;
        self.nodes.insert(handle, Node { text: text.to_string(), classes: BTreeSet::new() });
        trace!(identity, ?handle, "node created");
        handle
    }

    pub fn destroy_node(&mut self, node: NodeHandle) -> bool {
        self.nodes.remove(&node).is_some()
    }

    pub fn node_text(&self, node: NodeHandle) -> Option<&str> {
        self.nodes.get(&node).map(|n| n.text.as_str())
    }

    pub fn node_classes(&self, node: NodeHandle) -> Vec<&'static str> {
        self.nodes.get(&node).map(|n| n.classes.iter().copied().collect()).unwrap_or_default()
    }

    // ── Outbox ──

    /// Orders submitted since the last call.
    pub fn take_submissions(&mut self) -> Vec<OrderTicket> {
        std::mem::take(&mut self.submissions)
    }

    pub fn take_requeue(&mut self) -> bool {
        std::mem::replace(&mut self.requeue_requested, false)
    }

    // ── Form reading ──

    fn radio_checked(&self, id: &str) -> bool {
        matches!(self.controls.get(id), Some(Control::Radio { checked: true, .. }))
    }

    /// The ticket the form describes, or `None` when it fails validation.
    pub fn form_ticket(&self) -> Option<OrderTicket> {
        let direction = if self.radio_checked(ORDER_DIRECTION_BUY) {
            Direction::Buy
        } else if self.radio_checked(ORDER_DIRECTION_SELL) {
            Direction::Sell
        } else {
            return None;
        };

        let suit = self.value(ORDER_SUIT)?.chars().next()?;

        let kind = if self.radio_checked(ORDER_TYPE_LIMIT) {
            OrderKind::Limit
        } else if self.radio_checked(ORDER_TYPE_MARKET) {
            OrderKind::Market
        } else if self.radio_checked(ORDER_TYPE_CANCEL) {
            OrderKind::Cancel
        } else {
            return None;
        };

        let price = match self.controls.get(ORDER_PRICE) {
            Some(Control::Text { value, disabled: false }) if kind == OrderKind::Limit => {
                Some(value.parse::<u32>().ok().filter(|p| *p > 0)?)
            }
            None if kind == OrderKind::Limit => return None,
            _ => None,
        };

        Some(OrderTicket { direction, suit, kind, price })
    }
}

impl Default for Document {
    fn default() -> Self {
        Document::new()
    }
}

// ══════════════════════════════════════════════════════════════
// Element access
// ══════════════════════════════════════════════════════════════

impl ElementAccessor for Document {
    fn checked(&self, id: &str) -> Option<bool> {
        match self.controls.get(id)? {
            Control::Radio { checked, .. } => Some(*checked),
            _ => None,
        }
    }

    fn select_radio(&mut self, id: &str) -> bool {
        let group = match self.controls.get(id) {
            Some(Control::Radio { group, .. }) => *group,
            _ => return false,
        };
        for (key, control) in self.controls.iter_mut() {
            if let Control::Radio { group: g, checked } = control {
                if *g == group {
                    *checked = key == id;
                }
            }
        }
        true
    }

    fn value(&self, id: &str) -> Option<String> {
        match self.controls.get(id)? {
            Control::Dropdown { value, .. } | Control::Text { value, .. } => Some(value.clone()),
            _ => None,
        }
    }

    fn set_value(&mut self, id: &str, new_value: &str) -> bool {
        match self.controls.get_mut(id) {
            Some(Control::Dropdown { value, options }) => {
                if !options.iter().any(|o| o == new_value) {
                    return false;
                }
                *value = new_value.to_string();
                true
            }
            Some(Control::Text { value, .. }) => {
                *value = new_value.to_string();
                true
            }
            _ => false,
        }
    }

    fn disabled(&self, id: &str) -> Option<bool> {
        match self.controls.get(id)? {
            Control::Text { disabled, .. } => Some(*disabled),
            _ => Some(false),
        }
    }

    fn set_disabled(&mut self, id: &str, disable: bool) -> bool {
        match self.controls.get_mut(id) {
            Some(Control::Text { disabled, .. }) => {
                *disabled = disable;
                if disable && self.focus.as_deref() == Some(id) {
                    self.focus = None;
                }
                true
            }
            _ => false,
        }
    }

    fn click(&mut self, id: &str) -> bool {
        if !self.controls.contains_key(id) {
            return false;
        }
        match id {
            ORDER_SUBMIT => {
                if let Some(ticket) = self.form_ticket() {
                    self.submissions.push(ticket);
                }
            }
            MODAL_CLOSE => {
                self.modal = None;
                self.controls.remove(MODAL_CLOSE);
            }
            REQUEUE => self.requeue_requested = true,
            _ => {
                if matches!(self.controls.get(id), Some(Control::Radio { .. })) {
                    self.select_radio(id);
                }
            }
        }
        true
    }

    fn check_validity(&self, id: &str) -> Option<bool> {
        match self.controls.get(id)? {
            Control::Form if id == ORDER_FORM => Some(self.form_ticket().is_some()),
            Control::Form => Some(true),
            _ => None,
        }
    }

    fn active_element(&self) -> Option<&str> {
        self.focus.as_deref()
    }

    fn scroll_to_bottom(&mut self, id: &str) -> bool {
        let len = self.history.len();
        match self.controls.get_mut(id) {
            Some(Control::Scroller { offset }) => {
                *offset = len;
                true
            }
            _ => false,
        }
    }
}

impl NodeClasses for Document {
    fn add_class(&mut self, node: NodeHandle, class: &'static str) -> bool {
        match self.nodes.get_mut(&node) {
            Some(n) => {
                n.classes.insert(class);
                true
            }
            None => false,
        }
    }

    fn remove_class(&mut self, node: NodeHandle, class: &'static str) -> bool {
        match self.nodes.get_mut(&node) {
            Some(n) => n.classes.remove(class),
            None => false,
        }
    }

    fn has_class(&self, node: NodeHandle, class: &str) -> bool {
        self.nodes.get(&node).map_or(false, |n| n.classes.contains(class))
    }
}

// ══════════════════════════════════════════════════════════════
// Unit tests
// ══════════════════════════════════════════════════════════════

#[cfg(test)]
mod tests {
    use super::*;

    fn filled_page() -> Document {
        let mut doc = Document::order_page();
        doc.select_radio(ORDER_DIRECTION_BUY);
        doc.set_value(ORDER_SUIT, "k");
        doc.set_value(ORDER_PRICE, "12");
        doc
    }

    #[test]
    fn radios_are_exclusive_within_group() {
        let mut doc = Document::order_page();
        assert!(doc.select_radio(ORDER_DIRECTION_SELL));
        assert_eq!(doc.checked(ORDER_DIRECTION_SELL), Some(true));
        assert!(doc.select_radio(ORDER_DIRECTION_BUY));
        assert_eq!(doc.checked(ORDER_DIRECTION_SELL), Some(false));
        // Other groups untouched
        assert_eq!(doc.checked(ORDER_TYPE_LIMIT), Some(true));
    }

    #[test]
    fn missing_elements_are_null_safe() {
        let mut doc = Document::new();
        assert_eq!(doc.checked(ORDER_TYPE_LIMIT), None);
        assert!(!doc.select_radio(ORDER_TYPE_LIMIT));
        assert!(!doc.set_value(ORDER_PRICE, "1"));
        assert!(!doc.click(ORDER_SUBMIT));
        assert_eq!(doc.check_validity(ORDER_FORM), None);
        assert!(!doc.scroll_to_bottom(TRADE_HISTORY));
    }

    #[test]
    fn dropdown_rejects_unknown_value() {
        let mut doc = Document::order_page();
        assert!(!doc.set_value(ORDER_SUIT, "q"));
        assert_eq!(doc.value(ORDER_SUIT).as_deref(), Some("h"));
    }

    #[test]
    fn validity_requires_direction_and_price() {
        let mut doc = Document::order_page();
        assert_eq!(doc.check_validity(ORDER_FORM), Some(false));
        doc.select_radio(ORDER_DIRECTION_SELL);
        assert_eq!(doc.check_validity(ORDER_FORM), Some(false));
        doc.set_value(ORDER_PRICE, "0");
        assert_eq!(doc.check_validity(ORDER_FORM), Some(false));
        doc.set_value(ORDER_PRICE, "7");
        assert_eq!(doc.check_validity(ORDER_FORM), Some(true));
    }

    #[test]
    fn disabled_price_is_not_validated() {
        let mut doc = Document::order_page();
        doc.select_radio(ORDER_DIRECTION_BUY);
        doc.select_radio(ORDER_TYPE_MARKET);
        doc.set_disabled(ORDER_PRICE, true);
        let ticket = doc.form_ticket().unwrap();
        assert_eq!(ticket.kind, OrderKind::Market);
        assert_eq!(ticket.price, None);
    }

    #[test]
    fn submit_queues_only_valid_tickets() {
        let mut doc = Document::order_page();
        assert!(doc.click(ORDER_SUBMIT));
        assert!(doc.take_submissions().is_empty());

        let mut doc = filled_page();
        doc.click(ORDER_SUBMIT);
        let sent = doc.take_submissions();
        assert_eq!(
            sent,
            vec![OrderTicket { direction: Direction::Buy, suit: 'k', kind: OrderKind::Limit, price: Some(12) }]
        );
        assert!(doc.take_submissions().is_empty());
    }

    #[test]
    fn disabling_focused_field_blurs_it() {
        let mut doc = Document::order_page();
        assert!(doc.focus(ORDER_PRICE));
        doc.set_disabled(ORDER_PRICE, true);
        assert_eq!(doc.active_element(), None);
        assert!(!doc.focus(ORDER_PRICE));
    }

    #[test]
    fn modal_close_click_closes_modal() {
        let mut doc = Document::order_page();
        doc.open_modal("help");
        assert!(doc.contains(MODAL_CLOSE));
        assert!(doc.click(MODAL_CLOSE));
        assert_eq!(doc.modal(), None);
        assert!(!doc.contains(MODAL_CLOSE));
    }

    #[test]
    fn requeue_click_is_recorded_once() {
        let mut doc = Document::order_page();
        assert!(!doc.click(REQUEUE));
        doc.insert(REQUEUE, Control::Button);
        assert!(doc.click(REQUEUE));
        assert!(doc.take_requeue());
        assert!(!doc.take_requeue());
    }

    #[test]
    fn history_scrolls_to_bottom() {
        let mut doc = Document::order_page();
        for i in 0..10 {
            doc.push_history(format!("trade {i}"));
        }
        assert!(doc.history_window(3).is_empty());
        doc.scroll_to_bottom(TRADE_HISTORY);
        let window: Vec<&str> = doc.history_window(3).iter().map(String::as_str).collect();
        assert_eq!(window, ["trade 7", "trade 8", "trade 9"]);
    }

    #[test]
    fn classes_on_destroyed_node_are_noops() {
        let mut doc = Document::new();
        let node = doc.create_node("points_you", "10");
        assert!(doc.add_class(node, "animated"));
        assert!(doc.has_class(node, "animated"));
        assert!(doc.destroy_node(node));
        assert!(!doc.add_class(node, "animated"));
        assert!(!doc.remove_class(node, "animated"));
        assert!(!doc.has_class(node, "animated"));
    }
}
