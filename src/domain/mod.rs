pub mod element;
pub mod key;
pub mod polarity;
