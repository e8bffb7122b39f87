//! Procedural generation for planet surfaces: baked terrain, object placement and the
//! planet catalog.

pub mod placement;
pub mod planet;
pub mod terrain;

pub use placement::*;
pub use planet::*;
pub use terrain::*;
