#![deny(dead_code)]
#![deny(unused_imports)]

pub mod data;
pub mod diagnostics;
pub mod estimate;
pub mod generate;
pub mod linalg;
pub mod model;
