//! Swapchain lifecycle.
//!
//! The swapchain is the one piece of the context that is rebuilt in
//! place: window resizes and foreground transitions replace it wholesale
//! while everything around it stays put. Recreation hands the
//! predecessor's backing arrays to the successor, so a steady-state
//! rebuild with an unchanged image count allocates nothing.

use std::mem;

use ash::vk;

use crate::device::Device;
use crate::dispatch;
use crate::error::Result;
use crate::instance::Instance;
use crate::surface::{Surface, SurfaceFns};

/// Verified swapchain extension table.
pub struct SwapchainFns {
    fns: ash::khr::swapchain::Device,
}

impl SwapchainFns {
    /// Load the swapchain extension commands, failing if any are missing.
    pub fn load(instance: &Instance, device: &Device) -> Result<Self> {
        let fns = dispatch::load_table(
            dispatch::SWAPCHAIN_ENTRY_POINTS,
            |name| device.resolve(instance, name),
            || ash::khr::swapchain::Device::new(instance.raw(), device.raw()),
        )?;
        Ok(Self { fns })
    }
}

/// A chain of presentable images and their views.
///
/// `images` holds handles owned by the chain itself; `views` are created
/// here and owned. The two arrays always have the same length. A retired
/// swapchain has handed its arrays to a successor and owns nothing but
/// the chain handle.
pub struct Swapchain {
    raw: vk::SwapchainKHR,
    images: Vec<vk::Image>,
    views: Vec<vk::ImageView>,
    format: vk::Format,
    extent: vk::Extent2D,
    retired: bool,
}

impl Swapchain {
    /// Build the image chain for `surface`, replacing `old`.
    ///
    /// `drawable` is the window's current drawable size in pixels; it is
    /// only consulted when the surface does not dictate its own extent.
    /// Returns `Ok(None)` when the resolved extent has a zero dimension
    /// (minimized or hidden window); no chain exists in that state and
    /// `old` is destroyed in full.
    ///
    /// On success the new swapchain takes over the predecessor's backing
    /// arrays: an unchanged image count reuses the allocations in place,
    /// a changed count replaces them with exactly one fresh allocation at
    /// the new size. On failure `old` is destroyed as well, since the
    /// caller's chain is unusable either way.
    ///
    /// # Safety
    /// All handles must be live and belong to the same instance, and the
    /// old swapchain's images must no longer be in use.
    pub unsafe fn create(
        device: &Device,
        fns: &SwapchainFns,
        surface_fns: &SurfaceFns,
        surface: &Surface,
        drawable: vk::Extent2D,
        old: Option<Swapchain>,
    ) -> Result<Option<Self>> {
        let caps = match surface_fns.capabilities(device.physical_device(), surface) {
            Ok(caps) => caps,
            Err(e) => {
                destroy_superseded(device, fns, old);
                return Err(e);
            }
        };

        let extent = resolve_extent(&caps, drawable);
        if extent.width == 0 || extent.height == 0 {
            // Nothing can be presented at zero size; the chain is simply
            // absent until the window becomes drawable again.
            destroy_superseded(device, fns, old);
            tracing::debug!("Surface has zero extent, swapchain absent");
            return Ok(None);
        }

        let format = match surface_fns.formats(device.physical_device(), surface) {
            Ok(formats) => select_surface_format(&formats),
            Err(e) => {
                destroy_superseded(device, fns, old);
                return Err(e);
            }
        };

        let queue_family_indices = [device.queue_family_index()];
        let create_info = vk::SwapchainCreateInfoKHR::default()
            .surface(surface.raw())
            .min_image_count(target_image_count(&caps))
            .image_format(format.format)
            .image_color_space(format.color_space)
            .image_extent(extent)
            .image_array_layers(1)
            .image_usage(vk::ImageUsageFlags::COLOR_ATTACHMENT)
            .image_sharing_mode(vk::SharingMode::EXCLUSIVE)
            .queue_family_indices(&queue_family_indices)
            .pre_transform(caps.current_transform)
            .composite_alpha(vk::CompositeAlphaFlagsKHR::OPAQUE)
            .present_mode(vk::PresentModeKHR::FIFO)
            .clipped(true)
            .old_swapchain(old.as_ref().map_or(vk::SwapchainKHR::null(), |o| o.raw));

        let raw = match fns.fns.create_swapchain(&create_info, None) {
            Ok(raw) => raw,
            Err(e) => {
                destroy_superseded(device, fns, old);
                return Err(e.into());
            }
        };

        let fetched = match fns.fns.get_swapchain_images(raw) {
            Ok(images) => images,
            Err(e) => {
                fns.fns.destroy_swapchain(raw, None);
                destroy_superseded(device, fns, old);
                return Err(e.into());
            }
        };

        // Retire the predecessor: its arrays transfer here, its views are
        // destroyed now that nothing presents from them, and its chain
        // handle is released.
        let (mut images, mut views) = match old {
            Some(mut old) => {
                let (images, views) = old.retire();
                for &view in &views {
                    device.raw().destroy_image_view(view, None);
                }
                old.destroy(device, fns);
                (images, views)
            }
            None => (Vec::new(), Vec::new()),
        };

        reuse_or_resize(&mut images, fetched.len());
        reuse_or_resize(&mut views, fetched.len());
        images.copy_from_slice(&fetched);

        let subresource_range = vk::ImageSubresourceRange::default()
            .aspect_mask(vk::ImageAspectFlags::COLOR)
            .base_mip_level(0)
            .level_count(1)
            .base_array_layer(0)
            .layer_count(1);

        for (index, &image) in images.iter().enumerate() {
            let view_info = vk::ImageViewCreateInfo::default()
                .image(image)
                .view_type(vk::ImageViewType::TYPE_2D)
                .format(format.format)
                .components(vk::ComponentMapping::default())
                .subresource_range(subresource_range);

            match device.raw().create_image_view(&view_info, None) {
                Ok(view) => views[index] = view,
                Err(e) => {
                    // Unwind the views created so far, then the chain.
                    for &view in &views[..index] {
                        device.raw().destroy_image_view(view, None);
                    }
                    fns.fns.destroy_swapchain(raw, None);
                    return Err(e.into());
                }
            }
        }

        tracing::info!(
            "Swapchain created: {}x{}, {} images, {:?}",
            extent.width,
            extent.height,
            images.len(),
            format.format
        );

        Ok(Some(Self {
            raw,
            images,
            views,
            format: format.format,
            extent,
            retired: false,
        }))
    }

    pub fn raw(&self) -> vk::SwapchainKHR {
        self.raw
    }

    pub fn images(&self) -> &[vk::Image] {
        &self.images
    }

    pub fn views(&self) -> &[vk::ImageView] {
        &self.views
    }

    pub fn format(&self) -> vk::Format {
        self.format
    }

    pub fn extent(&self) -> vk::Extent2D {
        self.extent
    }

    pub fn image_count(&self) -> usize {
        self.images.len()
    }

    /// Mark this swapchain retired and move its backing arrays out.
    ///
    /// The arrays still hold the predecessor's handles; the successor
    /// destroys the old views before overwriting the slots. A retired
    /// swapchain owns nothing but its chain handle.
    fn retire(&mut self) -> (Vec<vk::Image>, Vec<vk::ImageView>) {
        self.retired = true;
        (mem::take(&mut self.images), mem::take(&mut self.views))
    }

    /// Destroy the image views and release the chain handle.
    ///
    /// A retired swapchain's arrays belong to its successor, which also
    /// destroyed the views they held, so only the chain handle is
    /// released for it.
    ///
    /// # Safety
    /// `device` and `fns` must be the ones the swapchain was created
    /// with, and its images must no longer be in use.
    pub unsafe fn destroy(&mut self, device: &Device, fns: &SwapchainFns) {
        debug_assert!(!self.retired || self.views.is_empty());
        if !self.retired {
            for &view in &self.views {
                device.raw().destroy_image_view(view, None);
            }
        }
        fns.fns.destroy_swapchain(self.raw, None);
    }
}

/// Fully destroy a predecessor that no successor took the arrays from.
unsafe fn destroy_superseded(device: &Device, fns: &SwapchainFns, old: Option<Swapchain>) {
    if let Some(mut old) = old {
        old.destroy(device, fns);
    }
}

/// Resolve the swapchain extent from the surface capabilities.
///
/// A current extent of `u32::MAX` means the surface sizes itself after
/// the swapchain and the window's drawable size is substituted. Anything
/// else is used verbatim, zero dimensions included.
fn resolve_extent(caps: &vk::SurfaceCapabilitiesKHR, drawable: vk::Extent2D) -> vk::Extent2D {
    if caps.current_extent.width == u32::MAX {
        drawable
    } else {
        caps.current_extent
    }
}

/// Target image count: one above the minimum for one frame of headroom,
/// capped by the maximum when the surface reports one (zero means
/// unbounded).
fn target_image_count(caps: &vk::SurfaceCapabilitiesKHR) -> u32 {
    let mut count = caps.min_image_count + 1;
    if caps.max_image_count > 0 && count > caps.max_image_count {
        count = caps.max_image_count;
    }
    count
}

/// Prefer sRGB B8G8R8A8, falling back to the first reported format.
fn select_surface_format(available: &[vk::SurfaceFormatKHR]) -> vk::SurfaceFormatKHR {
    available
        .iter()
        .find(|format| {
            format.format == vk::Format::B8G8R8A8_SRGB
                && format.color_space == vk::ColorSpaceKHR::SRGB_NONLINEAR
        })
        .or_else(|| available.first())
        .copied()
        .unwrap_or_default()
}

/// Bring `buf` to exactly `len` slots ready for overwriting.
///
/// A matching length keeps the existing allocation untouched; any other
/// length replaces it with a single fresh allocation of exactly `len`.
fn reuse_or_resize<T: Default + Copy>(buf: &mut Vec<T>, len: usize) {
    if buf.len() != len {
        *buf = vec![T::default(); len];
    }
}

#[cfg(test)]
mod tests {
    use ash::vk::Handle;

    use super::*;

    fn caps(current: (u32, u32), min_count: u32, max_count: u32) -> vk::SurfaceCapabilitiesKHR {
        let mut caps = vk::SurfaceCapabilitiesKHR::default();
        caps.current_extent = vk::Extent2D {
            width: current.0,
            height: current.1,
        };
        caps.min_image_count = min_count;
        caps.max_image_count = max_count;
        caps
    }

    fn format(format: vk::Format, color_space: vk::ColorSpaceKHR) -> vk::SurfaceFormatKHR {
        vk::SurfaceFormatKHR {
            format,
            color_space,
        }
    }

    #[test]
    fn extent_uses_reported_size_verbatim() {
        let caps = caps((1920, 1080), 2, 0);
        let drawable = vk::Extent2D {
            width: 640,
            height: 480,
        };

        let extent = resolve_extent(&caps, drawable);

        assert_eq!(extent.width, 1920);
        assert_eq!(extent.height, 1080);
    }

    #[test]
    fn extent_substitutes_drawable_size_for_sentinel() {
        let caps = caps((u32::MAX, u32::MAX), 2, 0);
        let drawable = vk::Extent2D {
            width: 800,
            height: 600,
        };

        let extent = resolve_extent(&caps, drawable);

        assert_eq!(extent.width, 800);
        assert_eq!(extent.height, 600);
    }

    #[test]
    fn extent_keeps_zero_dimensions() {
        let reported = resolve_extent(&caps((0, 0), 2, 0), vk::Extent2D::default());
        assert_eq!(reported.width, 0);
        assert_eq!(reported.height, 0);

        let substituted = resolve_extent(
            &caps((u32::MAX, u32::MAX), 2, 0),
            vk::Extent2D {
                width: 0,
                height: 724,
            },
        );
        assert_eq!(substituted.width, 0);
        assert_eq!(substituted.height, 724);
    }

    #[test]
    fn image_count_is_one_above_minimum() {
        assert_eq!(target_image_count(&caps((1, 1), 2, 0)), 3);
        assert_eq!(target_image_count(&caps((1, 1), 3, 8)), 4);
    }

    #[test]
    fn image_count_respects_maximum() {
        assert_eq!(target_image_count(&caps((1, 1), 3, 3)), 3);
    }

    #[test]
    fn image_count_unbounded_when_maximum_is_zero() {
        assert_eq!(target_image_count(&caps((1, 1), 7, 0)), 8);
    }

    #[test]
    fn prefers_srgb_surface_format() {
        let formats = [
            format(vk::Format::R8G8B8A8_UNORM, vk::ColorSpaceKHR::SRGB_NONLINEAR),
            format(vk::Format::B8G8R8A8_SRGB, vk::ColorSpaceKHR::SRGB_NONLINEAR),
        ];

        let selected = select_surface_format(&formats);

        assert_eq!(selected.format, vk::Format::B8G8R8A8_SRGB);
        assert_eq!(selected.color_space, vk::ColorSpaceKHR::SRGB_NONLINEAR);
    }

    #[test]
    fn falls_back_to_first_format() {
        let formats = [
            format(vk::Format::R8G8B8A8_UNORM, vk::ColorSpaceKHR::SRGB_NONLINEAR),
            format(vk::Format::R16G16B16A16_SFLOAT, vk::ColorSpaceKHR::EXTENDED_SRGB_LINEAR_EXT),
        ];

        let selected = select_surface_format(&formats);

        assert_eq!(selected.format, vk::Format::R8G8B8A8_UNORM);
    }

    #[test]
    fn matching_length_reuses_the_allocation() {
        let mut buf: Vec<u64> = vec![1, 2, 3];
        let before = buf.as_ptr();

        reuse_or_resize(&mut buf, 3);

        assert_eq!(buf.as_ptr(), before);
        assert_eq!(buf.len(), 3);
    }

    #[test]
    fn changed_length_allocates_exactly_the_new_size() {
        let mut buf: Vec<u64> = vec![1, 2, 3];

        reuse_or_resize(&mut buf, 5);
        assert_eq!(buf.len(), 5);
        assert_eq!(buf.capacity(), 5);

        reuse_or_resize(&mut buf, 2);
        assert_eq!(buf.len(), 2);
        assert_eq!(buf.capacity(), 2);
    }

    #[test]
    fn empty_buffer_grows_to_requested_size() {
        let mut buf: Vec<vk::Image> = Vec::new();

        reuse_or_resize(&mut buf, 4);

        assert_eq!(buf.len(), 4);
        assert!(buf.iter().all(|image| image.is_null()));
    }

    fn test_swapchain(image_count: usize) -> Swapchain {
        let images = (0..image_count)
            .map(|i| vk::Image::from_raw(0x1000 + i as u64))
            .collect::<Vec<_>>();
        let views = (0..image_count)
            .map(|i| vk::ImageView::from_raw(0x2000 + i as u64))
            .collect::<Vec<_>>();
        Swapchain {
            raw: vk::SwapchainKHR::from_raw(0xABCD),
            images,
            views,
            format: vk::Format::B8G8R8A8_SRGB,
            extent: vk::Extent2D {
                width: 1280,
                height: 720,
            },
            retired: false,
        }
    }

    #[test]
    fn retire_transfers_the_backing_arrays() {
        let mut chain = test_swapchain(3);
        let image_ptr = chain.images.as_ptr();
        let view_ptr = chain.views.as_ptr();

        let (images, views) = chain.retire();

        assert!(chain.retired);
        assert!(chain.images.is_empty());
        assert!(chain.views.is_empty());
        assert_eq!(images.as_ptr(), image_ptr);
        assert_eq!(views.as_ptr(), view_ptr);
        assert_eq!(images.len(), 3);
        assert_eq!(views.len(), 3);
    }

    #[test]
    fn retired_arrays_reused_when_count_is_unchanged() {
        let mut chain = test_swapchain(3);
        let (mut images, mut views) = chain.retire();
        let image_ptr = images.as_ptr();
        let view_ptr = views.as_ptr();

        reuse_or_resize(&mut images, 3);
        reuse_or_resize(&mut views, 3);
        images.copy_from_slice(&[
            vk::Image::from_raw(0x9001),
            vk::Image::from_raw(0x9002),
            vk::Image::from_raw(0x9003),
        ]);

        assert_eq!(images.as_ptr(), image_ptr);
        assert_eq!(views.as_ptr(), view_ptr);
        assert_eq!(images[0], vk::Image::from_raw(0x9001));
    }

    #[test]
    fn retired_arrays_replaced_when_count_changes() {
        let mut chain = test_swapchain(3);
        let (mut images, mut views) = chain.retire();

        reuse_or_resize(&mut images, 4);
        reuse_or_resize(&mut views, 4);

        assert_eq!(images.len(), 4);
        assert_eq!(views.len(), 4);
        assert_eq!(images.capacity(), 4);
        assert_eq!(views.capacity(), 4);
    }

    #[test]
    fn images_and_views_stay_in_lockstep() {
        let chain = test_swapchain(4);
        assert_eq!(chain.images().len(), chain.views().len());
        assert_eq!(chain.image_count(), 4);
    }
}
