/// Animation classes, per-quantity polarity tables, and the rules for
/// reading a tracked number out of a node's rendered text.

#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub enum AnimationClass {
    /// Generic one-shot flash.
    Flash,
    Buy,
    Sell,
}

impl AnimationClass {
    pub fn css(self) -> &'static str {
        match self {
            AnimationClass::Flash => "animated",
            AnimationClass::Buy => "buy-animated",
            AnimationClass::Sell => "sell-animated",
        }
    }
}

/// Which class a change in a tracked quantity produces.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct Polarity {
    pub increase: AnimationClass,
    pub decrease: AnimationClass,
}

impl Polarity {
    /// Points: spending points (a buy) is the decrease.
    pub const POINTS: Polarity = Polarity {
        increase: AnimationClass::Sell,
        decrease: AnimationClass::Buy,
    };

    /// Hand size: gaining a card (a buy) is the increase.
    pub const HAND: Polarity = Polarity {
        increase: AnimationClass::Buy,
        decrease: AnimationClass::Sell,
    };

    /// Class for a move from `previous` to `current`; `None` when unchanged.
    pub fn classify(self, previous: f64, current: f64) -> Option<AnimationClass> {
        if current > previous {
            Some(self.increase)
        } else if current < previous {
            Some(self.decrease)
        } else {
            None
        }
    }
}

/// How a tracked node's text becomes a number.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum ValueExtractor {
    /// The text is the number.
    Plain,
    /// One decoration character on each side, e.g. `(3)`.
    Bracketed,
}

impl ValueExtractor {
    /// `None` for empty or non-numeric text.
    pub fn extract(self, text: &str) -> Option<f64> {
        let text = text.trim();
        let inner = match self {
            ValueExtractor::Plain => text,
            ValueExtractor::Bracketed => {
                let mut chars = text.chars();
                chars.next()?;
                chars.next_back()?;
                chars.as_str().trim()
            }
        };
        if inner.is_empty() {
            return None;
        }
        inner.parse::<f64>().ok().filter(|v| v.is_finite())
    }
}
