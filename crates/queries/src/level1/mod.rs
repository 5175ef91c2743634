//! Level 1: single-table CRUD, eager loading and many-to-many basics

pub mod intermediate;
pub mod simple_tasks;

pub use intermediate::{
    assign_genres_to_book, create_book_with_images, create_user_with_genres,
    get_books_by_location, get_genres_of_book, get_like_new_books_of_author, LocationFilter,
    NewImage,
};
pub use simple_tasks::{
    create_author, create_book, create_subscription_plan, create_user, delete_user,
    get_book_by_id, get_books_of_user, get_books_of_user_flat, get_books_of_user_with_genre_str,
    get_first_user_summary, get_user_by_email, get_users_by_preferred_genres,
    update_user_profile, BookGenreNames, BookWithGenres, GenreSummary, NewBook, NewPlan,
    NewUser, ProfileSummary, ProfileUpdate, UserSummary,
};
