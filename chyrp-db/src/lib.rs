pub mod client;
mod record;

mod categories;
mod comments;
mod likes;
mod posts;
mod sessions;
mod users;

pub use client::{DbClient, DbError};
