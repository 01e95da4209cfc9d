//! Dice rolling service.
//!
//! # Data Flow
//! ```text
//! GET /rolldice?rolls=N
//!     → handler.rs (parse query, fault injection, span + logs)
//!     → roll.rs (uniform rolls)
//!     → JSON array response
//! ```

pub mod handler;
pub mod roll;

pub use handler::{roll_dice_handler, DiceState};
pub use roll::roll_the_dice;
