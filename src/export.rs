//! PNG export of the generated layers, mainly for tuning and debugging.

use image::{ImageBuffer, Rgb, RgbImage};

use crate::biomes::TerrainType;
use crate::overview::Overview;
use crate::raster::Raster;
use crate::world::World;

/// Export a normalized scalar layer as grayscale.
pub fn export_grayscale(layer: &Raster<f32>, path: &str) -> Result<(), image::ImageError> {
    let dims = layer.dimensions();
    let mut img: RgbImage = ImageBuffer::new(dims.width as u32, dims.height as u32);

    for (x, y, &v) in layer.iter() {
        let shade = (v.clamp(0.0, 1.0) * 255.0) as u8;
        img.put_pixel(x as u32, y as u32, Rgb([shade, shade, shade]));
    }

    img.save(path)
}

/// Export a scalar layer on a two-color gradient, with zero cells (sea,
/// excluded terrain) drawn black. Used for the drainage and rainfall layers
/// where the zero marker would otherwise read as the driest land.
pub fn export_gradient(
    layer: &Raster<f32>,
    low: (u8, u8, u8),
    high: (u8, u8, u8),
    path: &str,
) -> Result<(), image::ImageError> {
    let dims = layer.dimensions();
    let mut img: RgbImage = ImageBuffer::new(dims.width as u32, dims.height as u32);

    for (x, y, &v) in layer.iter() {
        let color = if v == 0.0 {
            [0, 0, 0]
        } else {
            let t = v.clamp(0.0, 1.0);
            [
                lerp_channel(low.0, high.0, t),
                lerp_channel(low.1, high.1, t),
                lerp_channel(low.2, high.2, t),
            ]
        };
        img.put_pixel(x as u32, y as u32, Rgb(color));
    }

    img.save(path)
}

fn lerp_channel(a: u8, b: u8, t: f32) -> u8 {
    (a as f32 + (b as f32 - a as f32) * t) as u8
}

/// Export the terrain classification using each terrain's display color.
pub fn export_terrain(terrain: &Raster<TerrainType>, path: &str) -> Result<(), image::ImageError> {
    let dims = terrain.dimensions();
    let mut img: RgbImage = ImageBuffer::new(dims.width as u32, dims.height as u32);

    for (x, y, &t) in terrain.iter() {
        let (r, g, b) = t.color();
        img.put_pixel(x as u32, y as u32, Rgb([r, g, b]));
    }

    img.save(path)
}

/// Export the overview terrain layer. Same palette as the full map, one
/// pixel per overview cell.
pub fn export_overview(overview: &Overview, path: &str) -> Result<(), image::ImageError> {
    export_terrain(&overview.terrain, path)
}

/// Export the standard layer set for a world under `prefix`:
/// `<prefix>_height.png`, `<prefix>_temperature.png`, `<prefix>_drainage.png`,
/// `<prefix>_rainfall.png`, `<prefix>_terrain.png`, `<prefix>_overview.png`.
pub fn export_world(world: &World, prefix: &str) -> Result<(), image::ImageError> {
    export_grayscale(&world.elevation, &format!("{prefix}_height.png"))?;
    export_gradient(
        &world.temperature,
        (60, 80, 180),
        (200, 60, 40),
        &format!("{prefix}_temperature.png"),
    )?;
    export_gradient(
        &world.drainage,
        (70, 110, 60),
        (210, 190, 120),
        &format!("{prefix}_drainage.png"),
    )?;
    export_gradient(
        &world.rainfall,
        (200, 190, 140),
        (40, 90, 170),
        &format!("{prefix}_rainfall.png"),
    )?;
    export_terrain(&world.terrain, &format!("{prefix}_terrain.png"))?;
    export_overview(&world.overview, &format!("{prefix}_overview.png"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_channel_lerp_endpoints() {
        assert_eq!(lerp_channel(0, 255, 0.0), 0);
        assert_eq!(lerp_channel(0, 255, 1.0), 255);
        assert_eq!(lerp_channel(100, 200, 0.5), 150);
    }
}
