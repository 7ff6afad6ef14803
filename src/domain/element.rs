/// Named elements: the page controls the dispatcher and the animation
/// hooks read or mutate by a stable logical id.
///
/// The markup layer owns these elements; between server-driven re-renders
/// any of them may be momentarily absent, so every accessor is null-safe:
/// a missing id answers `None` / `false` and never panics.

// ── Element ids ──

pub const ORDER_FORM: &str = "order";
pub const ORDER_DIRECTION_BUY: &str = "order_direction_buy";
pub const ORDER_DIRECTION_SELL: &str = "order_direction_sell";
pub const ORDER_SUIT: &str = "order_suit";
pub const ORDER_TYPE_LIMIT: &str = "order_type_limit";
pub const ORDER_TYPE_MARKET: &str = "order_type_market";
pub const ORDER_TYPE_CANCEL: &str = "order_type_cancel";
pub const ORDER_PRICE: &str = "order_price";
pub const ORDER_SUBMIT: &str = "order_submit";
pub const REQUEUE: &str = "requeue";
pub const MODAL_CLOSE: &str = "modal_close";
pub const TRADE_HISTORY: &str = "trade_history";

/// Suit dropdown values, in display order.
pub const SUITS: [char; 4] = ['h', 'j', 'k', 'l'];

/// Read/write access to named elements.
pub trait ElementAccessor {
    /// Checked state of a radio control.
    fn checked(&self, id: &str) -> Option<bool>;

    /// Check a radio control, unchecking the other members of its group.
    fn select_radio(&mut self, id: &str) -> bool;

    /// Current value of a text field or dropdown.
    fn value(&self, id: &str) -> Option<String>;

    fn set_value(&mut self, id: &str, value: &str) -> bool;

    fn disabled(&self, id: &str) -> Option<bool>;

    fn set_disabled(&mut self, id: &str, disabled: bool) -> bool;

    /// Activate a control the way a mouse click would.
    fn click(&mut self, id: &str) -> bool;

    /// Native form validity; `None` when the form is not on the page.
    fn check_validity(&self, id: &str) -> Option<bool>;

    /// Id of the currently focused element, if any has focus.
    fn active_element(&self) -> Option<&str>;

    /// Scroll a scrollable element so its last line is visible.
    fn scroll_to_bottom(&mut self, id: &str) -> bool;
}

/// A physical view node.
///
/// Re-renders may destroy a node and create a new one for the same
/// logical identity; each creation gets a fresh handle.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub struct NodeHandle(pub u64);

/// Class-list access on physical nodes. Operations on a destroyed node
/// are no-ops that report `false`.
pub trait NodeClasses {
    fn add_class(&mut self, node: NodeHandle, class: &'static str) -> bool;
    fn remove_class(&mut self, node: NodeHandle, class: &'static str) -> bool;
    fn has_class(&self, node: NodeHandle, class: &str) -> bool;
}
