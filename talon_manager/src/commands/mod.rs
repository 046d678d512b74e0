pub mod backends;
pub mod check;
pub mod run;
