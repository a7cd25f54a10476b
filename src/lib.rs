pub mod account;
pub mod auth;
pub mod browse;
pub mod controller;
pub mod db;
pub mod errors;
pub mod logging;
pub mod manage_bans;
pub mod manage_movies;
pub mod manage_users;
pub mod moderation_center;
pub mod payment;
pub mod register;
pub mod search;
pub mod security;
pub mod services;
pub mod session;
pub mod store;
