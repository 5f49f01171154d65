//! Repository implementations using SeaORM

pub mod habit_repository;

pub use habit_repository::SeaOrmHabitRepository;
