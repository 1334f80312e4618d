pub mod check;
pub mod run;
pub mod status;
pub mod toggle;
