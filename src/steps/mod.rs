pub mod activate;
pub mod files;
pub mod generate;
pub mod health;
pub mod preflight;
pub mod report;
