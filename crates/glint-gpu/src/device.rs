//! Logical device creation.

use std::ffi::CStr;

use ash::vk;

use crate::adapter::Adapter;
use crate::dispatch;
use crate::error::Result;
use crate::instance::Instance;

/// Device extensions required for presentation.
pub fn required_device_extensions() -> Vec<&'static CStr> {
    vec![
        ash::khr::swapchain::NAME,
        // Mandatory on MoltenVK when the device advertises it
        #[cfg(target_os = "macos")]
        ash::khr::portability_subset::NAME,
    ]
}

/// A logical device with one graphics queue and a verified dispatch table.
pub struct Device {
    raw: ash::Device,
    physical_device: vk::PhysicalDevice,
    queue_family_index: u32,
    queue: vk::Queue,
}

impl Device {
    /// Create the logical device for `adapter` and fetch queue 0 of its
    /// selected family.
    ///
    /// The device table is verified right after creation; a device with
    /// unresolvable commands is destroyed and never returned.
    ///
    /// # Safety
    /// The adapter must have been selected from `instance`.
    pub unsafe fn new(instance: &Instance, adapter: Adapter) -> Result<Self> {
        let queue_priority = 1.0_f32;
        let queue_info = vk::DeviceQueueCreateInfo::default()
            .queue_family_index(adapter.queue_family_index)
            .queue_priorities(std::slice::from_ref(&queue_priority));

        let extensions = required_device_extensions();
        let extension_names: Vec<*const std::ffi::c_char> =
            extensions.iter().map(|ext| ext.as_ptr()).collect();

        let create_info = vk::DeviceCreateInfo::default()
            .queue_create_infos(std::slice::from_ref(&queue_info))
            .enabled_extension_names(&extension_names);

        let raw = instance
            .raw()
            .create_device(adapter.physical_device, &create_info, None)?;

        let verified = dispatch::verify(dispatch::DEVICE_ENTRY_POINTS, |name| unsafe {
            (instance.raw().fp_v1_0().get_device_proc_addr)(raw.handle(), name.as_ptr())
        });
        if let Err(e) = verified {
            raw.destroy_device(None);
            return Err(e);
        }

        let queue = raw.get_device_queue(adapter.queue_family_index, 0);

        tracing::debug!(
            "Logical device created on queue family {}",
            adapter.queue_family_index
        );

        Ok(Self {
            raw,
            physical_device: adapter.physical_device,
            queue_family_index: adapter.queue_family_index,
            queue,
        })
    }

    pub fn raw(&self) -> &ash::Device {
        &self.raw
    }

    pub fn physical_device(&self) -> vk::PhysicalDevice {
        self.physical_device
    }

    pub fn queue_family_index(&self) -> u32 {
        self.queue_family_index
    }

    pub fn queue(&self) -> vk::Queue {
        self.queue
    }

    /// Resolve a device-scoped entry point by name.
    pub(crate) fn resolve(&self, instance: &Instance, name: &CStr) -> vk::PFN_vkVoidFunction {
        unsafe {
            (instance.raw().fp_v1_0().get_device_proc_addr)(self.raw.handle(), name.as_ptr())
        }
    }

    /// Block until every queue on the device is idle.
    pub fn wait_idle(&self) -> Result<()> {
        unsafe { self.raw.device_wait_idle()? };
        Ok(())
    }

    /// Destroy the logical device.
    ///
    /// # Safety
    /// Every object created from this device must already be destroyed,
    /// and the device must not be used afterwards.
    pub unsafe fn destroy(&mut self) {
        self.raw.destroy_device(None);
    }
}
