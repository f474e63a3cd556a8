pub mod helpers;
mod reports;
