pub mod model;
pub mod req;
