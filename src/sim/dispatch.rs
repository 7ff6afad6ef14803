/// Command dispatcher: one key-down event → at most one trading action.
///
/// ## Order of evaluation
///
///   1. Guards (`sim::guard::GUARDS`), always in the same order.
///   2. The fixed binding table.
///   3. The digit fallback (append to the price field).
///
/// Every action reports success; the caller suppresses the key's default
/// behaviour only when the action succeeded. A control missing from the
/// page turns its action into a failed no-op, never an error.

use tracing::{debug, trace};

use crate::domain::element::{
    ElementAccessor, ORDER_DIRECTION_BUY, ORDER_DIRECTION_SELL, ORDER_FORM, ORDER_PRICE,
    ORDER_SUBMIT, ORDER_SUIT, ORDER_TYPE_CANCEL, ORDER_TYPE_LIMIT, ORDER_TYPE_MARKET, REQUEUE,
};
use crate::domain::key::{KeyCode, KeyPress};
use crate::sim::guard::run_guards;

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Action {
    /// Check a direction radio.
    SelectDirection(&'static str),
    SelectSuit(char),
    /// Check an order-type radio and sync the price field's enabled state.
    SelectOrderType(&'static str),
    Requeue,
    BackspacePrice,
    SubmitOrder,
    AppendDigit(char),
}

/// The fixed keymap. One entry per key; digits go through the fallback.
pub const BINDINGS: &[(KeyCode, Action)] = &[
    (KeyCode::Letter('A'), Action::SelectDirection(ORDER_DIRECTION_BUY)),
    (KeyCode::Letter('S'), Action::SelectDirection(ORDER_DIRECTION_SELL)),
    (KeyCode::Letter('H'), Action::SelectSuit('h')),
    (KeyCode::Letter('J'), Action::SelectSuit('j')),
    (KeyCode::Letter('K'), Action::SelectSuit('k')),
    (KeyCode::Letter('L'), Action::SelectSuit('l')),
    (KeyCode::Letter('Z'), Action::SelectOrderType(ORDER_TYPE_LIMIT)),
    (KeyCode::Letter('X'), Action::SelectOrderType(ORDER_TYPE_MARKET)),
    (KeyCode::Letter('C'), Action::SelectOrderType(ORDER_TYPE_CANCEL)),
    (KeyCode::Letter('Y'), Action::Requeue),
    (KeyCode::Backspace, Action::BackspacePrice),
    (KeyCode::Enter, Action::SubmitOrder),
];

/// What one dispatch did.
#[derive(Clone, Copy, PartialEq, Eq, Debug, Default)]
pub struct Dispatch {
    /// Suppress the key's default behaviour.
    pub consumed: bool,
    /// The action attempted, if any matched.
    pub action: Option<Action>,
    pub modal_dismissed: bool,
}

pub struct CommandDispatcher {
    bindings: &'static [(KeyCode, Action)],
}

impl CommandDispatcher {
    pub fn new() -> Self {
        CommandDispatcher { bindings: BINDINGS }
    }

    pub fn binding(&self, code: KeyCode) -> Option<Action> {
        self.bindings.iter().find(|(k, _)| *k == code).map(|(_, a)| *a)
    }

    /// Returns whether the event was consumed.
    #[allow(dead_code)]
    pub fn handle_key_event<D: ElementAccessor>(&self, doc: &mut D, press: &KeyPress) -> bool {
        self.dispatch(doc, press).consumed
    }

    pub fn dispatch<D: ElementAccessor>(&self, doc: &mut D, press: &KeyPress) -> Dispatch {
        let guards = run_guards(doc, press);
        let mut outcome = Dispatch { modal_dismissed: guards.modal_dismissed, ..Dispatch::default() };

        if guards.suppress_all {
            trace!(key = %press.code, "modifier held; not dispatching");
            return outcome;
        }
        if guards.suppress_digits && press.code.is_digit() {
            trace!(key = %press.code, "price field focused; digit left to text entry");
            return outcome;
        }

        let action = match self.binding(press.code) {
            Some(action) => action,
            None => match press.code.digit() {
                Some(d) => Action::AppendDigit(d),
                None => return outcome,
            },
        };

        outcome.action = Some(action);
        outcome.consumed = perform(doc, action);
        debug!(key = %press.code, ?action, consumed = outcome.consumed, "key dispatched");
        outcome
    }
}

impl Default for CommandDispatcher {
    fn default() -> Self {
        CommandDispatcher::new()
    }
}

// ── Actions ──

fn perform<D: ElementAccessor>(doc: &mut D, action: Action) -> bool {
    match action {
        Action::SelectDirection(id) => doc.select_radio(id),
        Action::SelectSuit(suit) => {
            let mut buf = [0u8; 4];
            doc.set_value(ORDER_SUIT, suit.encode_utf8(&mut buf))
        }
        Action::SelectOrderType(id) => select_order_type(doc, id),
        Action::Requeue => doc.click(REQUEUE),
        Action::BackspacePrice => backspace_price(doc),
        Action::SubmitOrder => submit_order(doc),
        Action::AppendDigit(d) => append_to_price(doc, d),
    }
}

/// The price field is enabled exactly when limit is the checked type.
fn select_order_type<D: ElementAccessor>(doc: &mut D, id: &str) -> bool {
    if !doc.select_radio(id) {
        return false;
    }
    let limit = doc.checked(ORDER_TYPE_LIMIT).unwrap_or(false);
    doc.set_disabled(ORDER_PRICE, !limit);
    true
}

fn backspace_price<D: ElementAccessor>(doc: &mut D) -> bool {
    match doc.value(ORDER_PRICE) {
        Some(mut price) => {
            price.pop();
            doc.set_value(ORDER_PRICE, &price)
        }
        None => false,
    }
}

/// Click submit; clear the price only if the form validates, so a rejected
/// order keeps its typed price for correction.
fn submit_order<D: ElementAccessor>(doc: &mut D) -> bool {
    if !doc.click(ORDER_SUBMIT) {
        return false;
    }
    if doc.check_validity(ORDER_FORM).unwrap_or(false) {
        doc.set_value(ORDER_PRICE, "");
    }
    true
}

fn append_to_price<D: ElementAccessor>(doc: &mut D, digit: char) -> bool {
    if doc.disabled(ORDER_PRICE) != Some(false) {
        return false;
    }
    match doc.value(ORDER_PRICE) {
        Some(mut price) => {
            price.push(digit);
            doc.set_value(ORDER_PRICE, &price)
        }
        None => false,
    }
}

// ══════════════════════════════════════════════════════════════
// Unit tests
// ══════════════════════════════════════════════════════════════

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::element::MODAL_CLOSE;
    use crate::sim::document::{Control, Document};

    fn press(code: &str) -> KeyPress {
        KeyPress::plain(KeyCode::parse(code))
    }

    fn run(doc: &mut Document, codes: &[&str]) -> Vec<bool> {
        let dispatcher = CommandDispatcher::new();
        codes.iter().map(|c| dispatcher.handle_key_event(doc, &press(c))).collect()
    }

    fn price(doc: &Document) -> String {
        doc.value(ORDER_PRICE).unwrap()
    }

    // ── Binding table ──

    #[test]
    fn at_most_one_binding_per_key() {
        for (i, (key, _)) in BINDINGS.iter().enumerate() {
            assert!(BINDINGS[i + 1..].iter().all(|(k, _)| k != key), "duplicate binding for {key}");
            assert!(!key.is_digit());
        }
    }

    #[test]
    fn unbound_keys_are_not_consumed() {
        let mut doc = Document::order_page();
        for code in ["KeyQ", "KeyB", "Tab", "Escape", "F1", "Space", "ArrowUp"] {
            let outcome = CommandDispatcher::new().dispatch(&mut doc, &press(code));
            assert!(!outcome.consumed, "{code} should not be consumed");
            assert_eq!(outcome.action, None);
        }
        assert_eq!(price(&doc), "");
    }

    // ── Letter actions ──

    #[test]
    fn direction_keys_check_radios() {
        let mut doc = Document::order_page();
        assert_eq!(run(&mut doc, &["KeyA"]), [true]);
        assert_eq!(doc.checked(ORDER_DIRECTION_BUY), Some(true));
        run(&mut doc, &["KeyS"]);
        assert_eq!(doc.checked(ORDER_DIRECTION_BUY), Some(false));
        assert_eq!(doc.checked(ORDER_DIRECTION_SELL), Some(true));
    }

    #[test]
    fn suit_keys_set_dropdown() {
        let mut doc = Document::order_page();
        for (code, suit) in [("KeyH", "h"), ("KeyJ", "j"), ("KeyK", "k"), ("KeyL", "l")] {
            run(&mut doc, &[code]);
            assert_eq!(doc.value(ORDER_SUIT).as_deref(), Some(suit));
        }
    }

    #[test]
    fn order_type_toggles_price_field_idempotently() {
        let mut doc = Document::order_page();
        for code in ["KeyX", "KeyX", "KeyC", "KeyZ", "KeyZ", "KeyC", "KeyX"] {
            run(&mut doc, &[code]);
            let expect_disabled = code != "KeyZ";
            assert_eq!(doc.disabled(ORDER_PRICE), Some(expect_disabled), "after {code}");
        }
    }

    #[test]
    fn requeue_without_control_reports_failure() {
        let mut doc = Document::order_page();
        assert_eq!(run(&mut doc, &["KeyY"]), [false]);
        doc.insert(REQUEUE, Control::Button);
        assert_eq!(run(&mut doc, &["KeyY"]), [true]);
        assert!(doc.take_requeue());
    }

    // ── Price editing ──

    #[test]
    fn digits_append_and_backspace_removes() {
        let mut doc = Document::order_page();
        assert_eq!(run(&mut doc, &["Digit1", "Digit0", "Digit5"]), [true, true, true]);
        assert_eq!(price(&doc), "105");
        run(&mut doc, &["Backspace"]);
        assert_eq!(price(&doc), "10");
    }

    #[test]
    fn backspace_on_empty_price_is_harmless() {
        let mut doc = Document::order_page();
        assert_eq!(run(&mut doc, &["Backspace"]), [true]);
        assert_eq!(price(&doc), "");
    }

    #[test]
    fn disabled_price_drops_every_digit() {
        let mut doc = Document::order_page();
        doc.set_value(ORDER_PRICE, "9");
        run(&mut doc, &["KeyC"]);
        for d in 0..=9 {
            let code = format!("Digit{d}");
            assert_eq!(run(&mut doc, &[code.as_str()]), [false]);
        }
        assert_eq!(price(&doc), "9");
    }

    #[test]
    fn focused_price_field_withholds_digits_only() {
        let mut doc = Document::order_page();
        let dispatcher = CommandDispatcher::new();

        let digit = press("Digit3").focused_on(ORDER_PRICE);
        let outcome = dispatcher.dispatch(&mut doc, &digit);
        assert!(!outcome.consumed);
        assert_eq!(outcome.action, None);
        assert_eq!(price(&doc), "");

        let letter = press("KeyS").focused_on(ORDER_PRICE);
        assert!(dispatcher.handle_key_event(&mut doc, &letter));
        assert_eq!(doc.checked(ORDER_DIRECTION_SELL), Some(true));
    }

    // ── Submit ──

    #[test]
    fn enter_with_valid_form_clears_price() {
        let mut doc = Document::order_page();
        run(&mut doc, &["KeyA", "KeyK", "Digit8"]);
        assert_eq!(run(&mut doc, &["Enter"]), [true]);
        assert_eq!(price(&doc), "");
        assert_eq!(doc.take_submissions().len(), 1);
    }

    #[test]
    fn enter_with_invalid_form_keeps_price() {
        let mut doc = Document::order_page();
        // No direction chosen
        run(&mut doc, &["Digit8"]);
        assert_eq!(run(&mut doc, &["Enter"]), [true]);
        assert_eq!(price(&doc), "8");
        assert!(doc.take_submissions().is_empty());
    }

    #[test]
    fn enter_without_submit_control_fails() {
        let mut doc = Document::order_page();
        doc.remove(ORDER_SUBMIT);
        run(&mut doc, &["KeyA", "Digit2"]);
        assert_eq!(run(&mut doc, &["Enter"]), [false]);
        assert_eq!(price(&doc), "2");
    }

    // ── Guards ──

    #[test]
    fn modifiers_never_dispatch() {
        let mut doc = Document::order_page();
        let dispatcher = CommandDispatcher::new();
        let mut p = press("KeyA");
        p.ctrl = true;
        assert!(!dispatcher.handle_key_event(&mut doc, &p));
        let mut p = press("Digit1");
        p.alt = true;
        assert!(!dispatcher.handle_key_event(&mut doc, &p));
        assert_eq!(doc.checked(ORDER_DIRECTION_BUY), Some(false));
        assert_eq!(price(&doc), "");
    }

    #[test]
    fn open_modal_is_closed_and_key_still_dispatches() {
        let mut doc = Document::order_page();
        doc.open_modal("round over");
        let outcome = CommandDispatcher::new().dispatch(&mut doc, &press("KeyA"));
        assert!(outcome.modal_dismissed);
        assert!(outcome.consumed);
        assert!(!doc.contains(MODAL_CLOSE));
        assert_eq!(doc.checked(ORDER_DIRECTION_BUY), Some(true));
    }

    #[test]
    fn missing_controls_degrade_to_failure() {
        let mut doc = Document::new();
        for code in ["KeyA", "KeyH", "KeyZ", "KeyY", "Backspace", "Enter", "Digit1"] {
            assert_eq!(run(&mut doc, &[code]), [false], "{code}");
        }
    }

    // ── Scenarios ──

    #[test]
    fn limit_price_then_submit() {
        let mut doc = Document::order_page();
        doc.select_radio(ORDER_DIRECTION_BUY);
        run(&mut doc, &["KeyZ", "Digit3", "Digit2"]);
        assert_eq!(doc.checked(ORDER_TYPE_LIMIT), Some(true));
        assert_eq!(price(&doc), "32");
        run(&mut doc, &["Enter"]);
        assert_eq!(price(&doc), "");
        let sent = doc.take_submissions();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].price, Some(32));
    }

    #[test]
    fn market_order_ignores_digits() {
        let mut doc = Document::order_page();
        assert_eq!(run(&mut doc, &["KeyX", "Digit5"]), [true, false]);
        assert_eq!(price(&doc), "");
    }
}
