//! Admin boards.
//!
//! Boards track an explicit `loading` flag and keep "not loaded yet"
//! (`None`) apart from "loaded and empty". Failures surface as dismissible
//! [`Notice`]s carrying the raw error text.

pub mod accounts;
pub mod notice;
pub mod waitlist;

pub use accounts::AccountsBoard;
pub use notice::{Notice, NoticeKind};
pub use waitlist::WaitlistBoard;
