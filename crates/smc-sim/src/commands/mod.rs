pub mod distributions;
pub mod run;
