//! Callbacks module for global inline keyboard actions
//!
//! Step-scoped callbacks (`city:*`, `details:*`, `parcel:*`) belong to the
//! flow modules. The ones here work from any step:
//! - `menu_callbacks`: language, main menu, order menu, back and help
//! - `order_callbacks`: cancel, in-car, rating and trip history

pub mod menu_callbacks;
pub mod order_callbacks;
