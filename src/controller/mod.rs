pub mod review;

pub use review::ReviewController;
