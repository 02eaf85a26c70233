pub mod inverted;
pub mod posting;
pub mod proximity;
