/// Dispatch guards, evaluated in a fixed order before any binding.
///
/// A guard either passes or suppresses a class of actions for the current
/// event. `Scope::All` ends dispatch on the spot; `Scope::Digits` only
/// withholds the digit actions and lets evaluation continue, which is how
/// shortcut letters and Enter keep working while the price field has focus.

use tracing::debug;

use crate::domain::element::{ElementAccessor, MODAL_CLOSE, ORDER_PRICE};
use crate::domain::key::KeyPress;

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Scope {
    All,
    Digits,
}

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Verdict {
    Pass,
    /// Passed after closing an open modal.
    Dismissed,
    Suppress(Scope),
}

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Guard {
    /// Ctrl or Alt held: leave browser/OS shortcuts alone.
    ModifierHeld,
    /// Close an open modal. Always passes.
    ModalOpen,
    /// Focus inside the price field: digits belong to native text entry.
    PriceFocus,
}

pub const GUARDS: [Guard; 3] = [Guard::ModifierHeld, Guard::ModalOpen, Guard::PriceFocus];

/// Outcome of running the whole guard list.
#[derive(Clone, Copy, PartialEq, Eq, Debug, Default)]
pub struct GuardReport {
    pub suppress_all: bool,
    pub suppress_digits: bool,
    pub modal_dismissed: bool,
}

impl Guard {
    pub fn evaluate<D: ElementAccessor>(self, doc: &mut D, press: &KeyPress) -> Verdict {
        match self {
            Guard::ModifierHeld => {
                if press.ctrl || press.alt {
                    Verdict::Suppress(Scope::All)
                } else {
                    Verdict::Pass
                }
            }
            Guard::ModalOpen => {
                if doc.click(MODAL_CLOSE) {
                    debug!(key = %press.code, "modal dismissed");
                    Verdict::Dismissed
                } else {
                    Verdict::Pass
                }
            }
            Guard::PriceFocus => {
                let typing = press.focused.as_deref() == Some(ORDER_PRICE)
                    || doc.active_element() == Some(ORDER_PRICE);
                if typing {
                    Verdict::Suppress(Scope::Digits)
                } else {
                    Verdict::Pass
                }
            }
        }
    }
}

/// Run `GUARDS` in order, stopping at the first total suppression.
pub fn run_guards<D: ElementAccessor>(doc: &mut D, press: &KeyPress) -> GuardReport {
    let mut report = GuardReport::default();
    for guard in GUARDS {
        match guard.evaluate(doc, press) {
            Verdict::Pass => {}
            Verdict::Dismissed => report.modal_dismissed = true,
            Verdict::Suppress(Scope::Digits) => report.suppress_digits = true,
            Verdict::Suppress(Scope::All) => {
                report.suppress_all = true;
                break;
            }
        }
    }
    report
}
