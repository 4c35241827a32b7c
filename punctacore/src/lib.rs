// data module
pub mod data {
    pub mod image;
    pub mod profile;
    pub mod peak;
}

// algorithm module
pub mod algorithm {
    pub mod region;
    pub mod threshold;
    pub mod peaks;
    pub mod interval;
    pub mod pipeline;
}

pub mod error;
