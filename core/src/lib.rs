pub mod db;
pub mod favorites;
pub mod mealdb;
pub mod models;
pub mod service;
