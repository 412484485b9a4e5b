pub mod shortener;

pub use shortener::Entity as ShortenerEntity;
