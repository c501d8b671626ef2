mod glyphs;
pub mod raster;
