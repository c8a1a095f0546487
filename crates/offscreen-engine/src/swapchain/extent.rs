use std::fmt;

use winit::dpi::PhysicalSize;

/// Size of a presentable image in physical pixels.
#[derive(Debug, Copy, Clone, Default, Eq, PartialEq, Hash)]
pub struct Extent {
    pub width: u32,
    pub height: u32,
}

impl Extent {
    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    /// Whether either dimension is zero (minimized window).
    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }

    /// Height over width, used to keep particles round on non-square targets.
    pub fn inverse_aspect(&self) -> f32 {
        if self.width == 0 {
            return 1.0;
        }
        self.height as f32 / self.width as f32
    }

    /// Component-wise clamp into `[min, max]`.
    pub fn clamp(self, min: Extent, max: Extent) -> Self {
        Self {
            width: self.width.clamp(min.width, max.width.max(min.width)),
            height: self.height.clamp(min.height, max.height.max(min.height)),
        }
    }
}

impl fmt::Display for Extent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

impl From<PhysicalSize<u32>> for Extent {
    fn from(size: PhysicalSize<u32>) -> Self {
        Self::new(size.width, size.height)
    }
}

impl From<Extent> for PhysicalSize<u32> {
    fn from(extent: Extent) -> Self {
        PhysicalSize::new(extent.width, extent.height)
    }
}

/// Extent limits reported for a surface.
///
/// `fixed` mirrors the "current extent" of a surface that dictates its own size.
/// When it is `None` the surface accepts any extent within `[min, max]`, which is
/// what wgpu surfaces always report.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub struct SurfaceBounds {
    pub min: Extent,
    pub max: Extent,
    pub fixed: Option<Extent>,
}

impl SurfaceBounds {
    /// Bounds for a wgpu surface on a device with the given limits.
    pub fn for_limits(limits: &wgpu::Limits) -> Self {
        let max = limits.max_texture_dimension_2d;
        Self {
            min: Extent::new(1, 1),
            max: Extent::new(max, max),
            fixed: None,
        }
    }
}

/// Picks the swapchain extent for a request.
///
/// A surface with a fixed extent wins over the request; otherwise the request is
/// clamped into the surface bounds.
pub fn choose_extent(bounds: &SurfaceBounds, requested: Extent) -> Extent {
    match bounds.fixed {
        Some(fixed) => fixed,
        None => requested.clamp(bounds.min, bounds.max),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bounds() -> SurfaceBounds {
        SurfaceBounds {
            min: Extent::new(1, 1),
            max: Extent::new(4096, 4096),
            fixed: None,
        }
    }

    #[test]
    fn request_within_bounds_is_kept() {
        assert_eq!(choose_extent(&bounds(), Extent::new(1200, 900)), Extent::new(1200, 900));
    }

    #[test]
    fn request_is_clamped_per_axis() {
        assert_eq!(choose_extent(&bounds(), Extent::new(0, 9000)), Extent::new(1, 4096));
    }

    #[test]
    fn fixed_surface_extent_overrides_request() {
        let b = SurfaceBounds { fixed: Some(Extent::new(640, 480)), ..bounds() };
        assert_eq!(choose_extent(&b, Extent::new(1200, 900)), Extent::new(640, 480));
    }

    #[test]
    fn wgpu_bounds_use_texture_limit() {
        let limits = wgpu::Limits { max_texture_dimension_2d: 2048, ..wgpu::Limits::default() };
        let b = SurfaceBounds::for_limits(&limits);
        assert_eq!(b.max, Extent::new(2048, 2048));
        assert!(b.fixed.is_none());
    }

    #[test]
    fn inverse_aspect_handles_zero_width() {
        assert_eq!(Extent::new(800, 600).inverse_aspect(), 0.75);
        assert_eq!(Extent::new(0, 600).inverse_aspect(), 1.0);
    }
}
