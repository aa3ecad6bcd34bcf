//! Render context: the bootstrapped Vulkan object graph.

use std::sync::Arc;

use anyhow::anyhow;
use ash::vk;
use raw_window_handle::HasDisplayHandle;
use winit::window::Window;

use glint_gpu::{
    select_adapter, Adapter, Device, Instance, Surface, SurfaceFns, Swapchain, SwapchainFns,
};

/// The live object graph behind a window.
///
/// The instance, adapter, device and queue are built once and survive
/// until shutdown. The surface and swapchain come and go with the
/// application's foreground lifetime: both are `None` while backgrounded,
/// and the swapchain alone is `None` while the window has a zero
/// drawable size.
///
/// Teardown is explicit and runs in strict reverse construction order.
pub struct RenderContext {
    window: Arc<Window>,
    instance: Instance,
    surface_fns: SurfaceFns,
    adapter: Adapter,
    device: Device,
    swapchain_fns: SwapchainFns,
    surface: Option<Surface>,
    swapchain: Option<Swapchain>,
}

impl RenderContext {
    /// Bootstrap the full graph against `window`.
    ///
    /// Runs instance creation, surface creation, adapter selection,
    /// device creation and the initial swapchain build in order. When a
    /// stage fails, everything already constructed is destroyed before
    /// the error is returned.
    ///
    /// # Safety
    /// The window must have valid handles and outlive the context.
    pub(crate) unsafe fn new(
        window: Arc<Window>,
        app_name: &str,
        validation: bool,
    ) -> anyhow::Result<Self> {
        let display = window
            .display_handle()
            .map_err(|e| anyhow!("window has no display handle: {e}"))?
            .as_raw();

        let mut instance = Instance::new(app_name, validation, Some(display))?;

        // SAFETY: caller guarantees the window handles are valid.
        match unsafe { Self::bootstrap(&instance, &window) } {
            Ok((surface_fns, adapter, device, swapchain_fns, surface, swapchain)) => Ok(Self {
                window,
                instance,
                surface_fns,
                adapter,
                device,
                swapchain_fns,
                surface: Some(surface),
                swapchain,
            }),
            Err(e) => {
                // Everything below the instance was already unwound.
                // SAFETY: no other object refers to the instance anymore.
                unsafe { instance.destroy() };
                Err(e.into())
            }
        }
    }

    /// Build every stage above the instance, unwinding partial progress
    /// on failure.
    ///
    /// # Safety
    /// The window must have valid handles.
    unsafe fn bootstrap(
        instance: &Instance,
        window: &Window,
    ) -> glint_gpu::Result<(
        SurfaceFns,
        Adapter,
        Device,
        SwapchainFns,
        Surface,
        Option<Swapchain>,
    )> {
        let surface_fns = SurfaceFns::load(instance)?;

        // SAFETY: caller guarantees the window handles are valid.
        let surface = unsafe { Surface::new(instance, window)? };

        // SAFETY: the surface was created from this instance.
        let adapter = match unsafe { select_adapter(instance, Some((&surface_fns, &surface))) } {
            Ok(adapter) => adapter,
            Err(e) => {
                // SAFETY: nothing else references the surface.
                unsafe { surface.destroy(&surface_fns) };
                return Err(e);
            }
        };

        // SAFETY: the adapter came from this instance.
        let mut device = match unsafe { Device::new(instance, adapter) } {
            Ok(device) => device,
            Err(e) => {
                // SAFETY: nothing else references the surface.
                unsafe { surface.destroy(&surface_fns) };
                return Err(e);
            }
        };

        let swapchain_fns = match SwapchainFns::load(instance, &device) {
            Ok(fns) => fns,
            Err(e) => {
                // SAFETY: reverse construction order, nothing in flight.
                unsafe {
                    device.destroy();
                    surface.destroy(&surface_fns);
                }
                return Err(e);
            }
        };

        // SAFETY: every handle was created above and is live.
        let swapchain = match unsafe {
            Swapchain::create(
                &device,
                &swapchain_fns,
                &surface_fns,
                &surface,
                drawable_extent(window),
                None,
            )
        } {
            Ok(swapchain) => swapchain,
            Err(e) => {
                // SAFETY: reverse construction order, nothing in flight.
                unsafe {
                    device.destroy();
                    surface.destroy(&surface_fns);
                }
                return Err(e);
            }
        };

        Ok((surface_fns, adapter, device, swapchain_fns, surface, swapchain))
    }

    pub fn window(&self) -> &Window {
        &self.window
    }

    pub fn instance(&self) -> &Instance {
        &self.instance
    }

    pub fn adapter(&self) -> Adapter {
        self.adapter
    }

    pub fn device(&self) -> &Device {
        &self.device
    }

    /// The current swapchain, or `None` while the window has a zero
    /// drawable size or the application is backgrounded.
    pub fn swapchain(&self) -> Option<&Swapchain> {
        self.swapchain.as_ref()
    }

    /// Whether a surface currently exists (the application is in the
    /// foreground).
    pub fn surface_active(&self) -> bool {
        self.surface.is_some()
    }

    /// Block until the device is idle.
    pub fn wait_idle(&self) -> glint_gpu::Result<()> {
        self.device.wait_idle()
    }

    /// Rebuild the swapchain for the window's current drawable size.
    ///
    /// The live swapchain, if any, is handed over as the predecessor so
    /// its backing storage carries across. Does nothing while the
    /// application is backgrounded.
    pub(crate) fn rebuild_swapchain(&mut self) -> anyhow::Result<()> {
        let Some(surface) = &self.surface else {
            tracing::debug!("Resize while backgrounded, no swapchain to rebuild");
            return Ok(());
        };

        self.device.wait_idle()?;

        let old = self.swapchain.take();
        // SAFETY: the device is idle and every handle is live.
        self.swapchain = unsafe {
            Swapchain::create(
                &self.device,
                &self.swapchain_fns,
                &self.surface_fns,
                surface,
                drawable_extent(&self.window),
                old,
            )?
        };

        Ok(())
    }

    /// Release the surface and swapchain for a background transition.
    ///
    /// The device and instance stay up; only the window-bound objects go
    /// away. Safe to call when already backgrounded.
    pub(crate) fn suspend(&mut self) {
        if self.surface.is_none() {
            return;
        }

        if let Err(e) = self.device.wait_idle() {
            tracing::error!("Device wait failed before background transition: {e}");
        }

        // SAFETY: the swapchain goes before the surface it was built on.
        unsafe {
            if let Some(mut swapchain) = self.swapchain.take() {
                swapchain.destroy(&self.device, &self.swapchain_fns);
            }
            if let Some(surface) = self.surface.take() {
                surface.destroy(&self.surface_fns);
            }
        }

        tracing::info!("Surface released");
    }

    /// Recreate the surface and swapchain after a foreground transition.
    ///
    /// The previous chain died with the previous surface, so the new
    /// swapchain starts from scratch with no predecessor. Does nothing if
    /// the surface already exists.
    pub(crate) fn resume(&mut self) -> anyhow::Result<()> {
        if self.surface.is_some() {
            return Ok(());
        }

        // SAFETY: the window is alive for the life of this context.
        let surface = unsafe { Surface::new(&self.instance, self.window.as_ref())? };

        // SAFETY: every handle is live; there is no old chain.
        let swapchain = match unsafe {
            Swapchain::create(
                &self.device,
                &self.swapchain_fns,
                &self.surface_fns,
                &surface,
                drawable_extent(&self.window),
                None,
            )
        } {
            Ok(swapchain) => swapchain,
            Err(e) => {
                // SAFETY: the fresh surface has no other users.
                unsafe { surface.destroy(&self.surface_fns) };
                return Err(e.into());
            }
        };

        self.surface = Some(surface);
        self.swapchain = swapchain;

        tracing::info!("Surface restored");
        Ok(())
    }

    /// Tear the whole graph down in strict reverse construction order.
    ///
    /// Must be called exactly once, with nothing in flight on the queue.
    pub(crate) fn teardown(&mut self) {
        if let Err(e) = self.device.wait_idle() {
            tracing::error!("Device wait failed during teardown: {e}");
        }

        // SAFETY: swapchain, then surface, then device, then instance.
        unsafe {
            if let Some(mut swapchain) = self.swapchain.take() {
                swapchain.destroy(&self.device, &self.swapchain_fns);
            }
            if let Some(surface) = self.surface.take() {
                surface.destroy(&self.surface_fns);
            }
            self.device.destroy();
            self.instance.destroy();
        }
    }
}

/// The window's current drawable size, zero dimensions included.
fn drawable_extent(window: &Window) -> vk::Extent2D {
    let (width, height) = glint_platform::drawable_size(window);
    vk::Extent2D { width, height }
}
