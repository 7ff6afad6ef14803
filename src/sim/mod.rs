pub mod animate;
pub mod countdown;
pub mod desk;
pub mod dispatch;
pub mod document;
pub mod event;
pub mod guard;
pub mod hooks;
