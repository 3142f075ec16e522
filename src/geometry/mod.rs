//! Surface geometry and BEM models

mod bem;
mod surface;

pub use bem::Bem;
pub use surface::Surface;
