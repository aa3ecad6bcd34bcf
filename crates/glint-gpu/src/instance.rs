//! Vulkan instance creation.

use std::ffi::{c_char, CStr, CString};

use ash::vk;
use raw_window_handle::RawDisplayHandle;

use crate::dispatch;
use crate::error::Result;

/// Validation layers to enable when requested.
pub fn validation_layers() -> Vec<&'static CStr> {
    vec![
        // Standard validation layer
        c"VK_LAYER_KHRONOS_validation",
    ]
}

/// The loader entry table plus a created instance and its verified
/// dispatch table.
///
/// Owns the instance handle. Destruction is explicit via [`Instance::destroy`]
/// and must happen after every object created from the instance is gone.
pub struct Instance {
    entry: ash::Entry,
    raw: ash::Instance,
}

impl Instance {
    /// Load the Vulkan library and create an instance.
    ///
    /// `display` supplies the windowing system whose surface extensions
    /// must be enabled; `None` creates a headless instance with no surface
    /// support. Global commands are resolved before the instance is
    /// created and instance commands immediately after, so a returned
    /// `Instance` can issue every call this crate makes through it.
    pub fn new(
        app_name: &str,
        enable_validation: bool,
        display: Option<RawDisplayHandle>,
    ) -> Result<Self> {
        let entry = unsafe { ash::Entry::load()? };

        dispatch::verify(dispatch::GLOBAL_ENTRY_POINTS, |name| unsafe {
            (entry.static_fn().get_instance_proc_addr)(vk::Instance::null(), name.as_ptr())
        })?;

        let app_name = CString::new(app_name).unwrap();

        let app_info = vk::ApplicationInfo::default()
            .application_name(&app_name)
            .application_version(vk::make_api_version(0, 0, 1, 0))
            .engine_name(c"glint")
            .engine_version(vk::make_api_version(0, 0, 1, 0))
            .api_version(vk::API_VERSION_1_3);

        // The windowing layer reports which surface extensions this
        // platform needs. Headless instances enable none.
        #[allow(unused_mut)]
        let mut extension_names: Vec<*const c_char> = match display {
            Some(display) => ash_window::enumerate_required_extensions(display)?.to_vec(),
            None => Vec::new(),
        };
        #[cfg(target_os = "macos")]
        extension_names.push(ash::khr::portability_enumeration::NAME.as_ptr());

        // Check that requested layers are available, keeping only those
        let mut layers = Vec::new();
        if enable_validation {
            let available = unsafe { entry.enumerate_instance_layer_properties()? };
            for layer in validation_layers() {
                let found = available
                    .iter()
                    .any(|props| props.layer_name_as_c_str().ok() == Some(layer));
                if found {
                    layers.push(layer);
                } else {
                    tracing::warn!("Validation layer {layer:?} not available");
                }
            }
        }
        let layer_names: Vec<*const c_char> = layers.iter().map(|l| l.as_ptr()).collect();

        // Required for MoltenVK on macOS
        #[cfg(target_os = "macos")]
        let create_flags = vk::InstanceCreateFlags::ENUMERATE_PORTABILITY_KHR;
        #[cfg(not(target_os = "macos"))]
        let create_flags = vk::InstanceCreateFlags::empty();

        let create_info = vk::InstanceCreateInfo::default()
            .application_info(&app_info)
            .enabled_extension_names(&extension_names)
            .enabled_layer_names(&layer_names)
            .flags(create_flags);

        let raw = unsafe { entry.create_instance(&create_info, None)? };

        // The instance table must resolve in full before it escapes.
        let verified = dispatch::verify(dispatch::INSTANCE_ENTRY_POINTS, |name| unsafe {
            (entry.static_fn().get_instance_proc_addr)(raw.handle(), name.as_ptr())
        });
        if let Err(e) = verified {
            unsafe { raw.destroy_instance(None) };
            return Err(e);
        }

        tracing::debug!("Vulkan instance created");
        Ok(Self { entry, raw })
    }

    pub fn entry(&self) -> &ash::Entry {
        &self.entry
    }

    pub fn raw(&self) -> &ash::Instance {
        &self.raw
    }

    /// Resolve an instance-scoped entry point by name.
    pub(crate) fn resolve(&self, name: &CStr) -> vk::PFN_vkVoidFunction {
        unsafe { (self.entry.static_fn().get_instance_proc_addr)(self.raw.handle(), name.as_ptr()) }
    }

    /// Destroy the instance.
    ///
    /// # Safety
    /// Every object created from this instance must already be destroyed,
    /// and the instance must not be used afterwards.
    pub unsafe fn destroy(&mut self) {
        self.raw.destroy_instance(None);
    }
}
