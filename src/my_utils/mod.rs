pub mod image;
pub mod io;
pub mod math;
