//! Presentation surfaces.
//!
//! The surface extension table is instance scoped and loaded once; the
//! surfaces themselves are created and destroyed as the application moves
//! between foreground and background, so the two live in separate types.

use ash::vk;
use raw_window_handle::{HasDisplayHandle, HasWindowHandle};

use crate::dispatch;
use crate::error::{GpuError, Result};
use crate::instance::Instance;

/// Verified surface extension table.
pub struct SurfaceFns {
    fns: ash::khr::surface::Instance,
}

impl SurfaceFns {
    /// Load the surface extension commands, failing if any are missing.
    pub fn load(instance: &Instance) -> Result<Self> {
        let fns = dispatch::load_table(
            dispatch::SURFACE_ENTRY_POINTS,
            |name| instance.resolve(name),
            || ash::khr::surface::Instance::new(instance.entry(), instance.raw()),
        )?;
        Ok(Self { fns })
    }

    /// Whether `queue_family_index` on `physical_device` can present to
    /// the surface.
    ///
    /// # Safety
    /// The device and surface must be live and share an instance.
    pub unsafe fn supports_present(
        &self,
        physical_device: vk::PhysicalDevice,
        queue_family_index: u32,
        surface: &Surface,
    ) -> Result<bool> {
        let supported = self.fns.get_physical_device_surface_support(
            physical_device,
            queue_family_index,
            surface.raw,
        )?;
        Ok(supported)
    }

    /// Query the surface capabilities as of this call.
    ///
    /// # Safety
    /// The device and surface must be live and share an instance.
    pub unsafe fn capabilities(
        &self,
        physical_device: vk::PhysicalDevice,
        surface: &Surface,
    ) -> Result<vk::SurfaceCapabilitiesKHR> {
        let caps = self
            .fns
            .get_physical_device_surface_capabilities(physical_device, surface.raw)?;
        Ok(caps)
    }

    /// Query the presentable formats for the surface.
    ///
    /// # Safety
    /// The device and surface must be live and share an instance.
    pub unsafe fn formats(
        &self,
        physical_device: vk::PhysicalDevice,
        surface: &Surface,
    ) -> Result<Vec<vk::SurfaceFormatKHR>> {
        let formats = self
            .fns
            .get_physical_device_surface_formats(physical_device, surface.raw)?;
        Ok(formats)
    }
}

/// A presentable surface bound to one window.
///
/// Exists only while the application is in the foreground. Destroying the
/// window's surface invalidates any swapchain built on it, so the
/// swapchain goes first.
pub struct Surface {
    raw: vk::SurfaceKHR,
}

impl Surface {
    /// Create a surface for `window` through the windowing layer.
    ///
    /// # Safety
    /// The window's handles must be valid and the window must outlive the
    /// surface.
    pub unsafe fn new<W>(instance: &Instance, window: &W) -> Result<Self>
    where
        W: HasDisplayHandle + HasWindowHandle,
    {
        let display = window
            .display_handle()
            .map_err(|e| GpuError::SurfaceCreation(format!("no display handle: {e}")))?;
        let window_handle = window
            .window_handle()
            .map_err(|e| GpuError::SurfaceCreation(format!("no window handle: {e}")))?;

        let raw = ash_window::create_surface(
            instance.entry(),
            instance.raw(),
            display.as_raw(),
            window_handle.as_raw(),
            None,
        )?;

        tracing::debug!("Surface created");
        Ok(Self { raw })
    }

    pub fn raw(&self) -> vk::SurfaceKHR {
        self.raw
    }

    /// Destroy the surface.
    ///
    /// # Safety
    /// Any swapchain created against this surface must already be
    /// destroyed, and the surface must not be used afterwards.
    pub unsafe fn destroy(&self, fns: &SurfaceFns) {
        fns.fns.destroy_surface(self.raw, None);
    }
}
