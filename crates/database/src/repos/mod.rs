//! Write helpers shared by the seeder and the query examples

pub mod associations;
pub mod upsert;

pub use associations::{
    append_genres, clear_book_genres, clear_genres, replace_book_genres, replace_genres,
    replace_preferred_genres, GenreLink,
};
pub use upsert::{Upsert, Value};
