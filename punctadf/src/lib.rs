// src/lib.rs
pub mod data {
    pub mod image;
    pub mod meta;
    pub mod run;
    pub mod export;
}

pub mod batch;
