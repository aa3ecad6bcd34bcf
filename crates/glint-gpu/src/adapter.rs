//! Adapter selection.
//!
//! An adapter is a physical device paired with the queue family that will
//! drive rendering and presentation. Selection is positional: devices and
//! families are scanned in the order the API reports them and the first
//! family that qualifies wins, so repeated runs on the same machine pick
//! the same adapter.

use std::ffi::CStr;

use ash::vk;

use crate::error::{GpuError, Result};
use crate::instance::Instance;
use crate::surface::{Surface, SurfaceFns};

/// A selected physical device and queue family.
///
/// Holds non-owning handles; there is nothing to destroy.
#[derive(Debug, Clone, Copy)]
pub struct Adapter {
    pub physical_device: vk::PhysicalDevice,
    pub queue_family_index: u32,
}

/// Select the first adapter able to render and present.
///
/// A family qualifies when it has graphics support and, if a surface is
/// given, can present to it. Headless callers pass `None` and the
/// presentation check is skipped. Fails with
/// [`GpuError::NoSuitableAdapter`] when no device has such a family,
/// including when no devices exist at all.
///
/// # Safety
/// The surface, when given, must be live and created from `instance`.
pub unsafe fn select_adapter(
    instance: &Instance,
    surface: Option<(&SurfaceFns, &Surface)>,
) -> Result<Adapter> {
    let devices = instance.raw().enumerate_physical_devices()?;

    let adapter = first_qualifying(
        &devices,
        |device| unsafe {
            instance
                .raw()
                .get_physical_device_queue_family_properties(device)
        },
        |device, family| match surface {
            Some((fns, surface)) => unsafe { fns.supports_present(device, family, surface) },
            None => Ok(true),
        },
    )?;

    let properties = instance
        .raw()
        .get_physical_device_properties(adapter.physical_device);
    let name = CStr::from_ptr(properties.device_name.as_ptr());
    tracing::info!(
        "Selected adapter {:?} ({:?}), queue family {}",
        name,
        properties.device_type,
        adapter.queue_family_index
    );

    Ok(adapter)
}

/// Scan devices in order and return the first (device, family) pair that
/// has graphics support and passes the presentation check.
fn first_qualifying(
    devices: &[vk::PhysicalDevice],
    mut families_of: impl FnMut(vk::PhysicalDevice) -> Vec<vk::QueueFamilyProperties>,
    mut can_present: impl FnMut(vk::PhysicalDevice, u32) -> Result<bool>,
) -> Result<Adapter> {
    for &device in devices {
        for (index, family) in families_of(device).iter().enumerate() {
            let index = index as u32;
            if !family.queue_flags.contains(vk::QueueFlags::GRAPHICS) {
                continue;
            }
            if !can_present(device, index)? {
                continue;
            }
            return Ok(Adapter {
                physical_device: device,
                queue_family_index: index,
            });
        }
    }

    Err(GpuError::NoSuitableAdapter)
}

#[cfg(test)]
mod tests {
    use ash::vk::Handle;

    use super::*;

    fn device(raw: u64) -> vk::PhysicalDevice {
        vk::PhysicalDevice::from_raw(raw)
    }

    fn family(flags: vk::QueueFlags) -> vk::QueueFamilyProperties {
        let mut family = vk::QueueFamilyProperties::default();
        family.queue_flags = flags;
        family.queue_count = 1;
        family
    }

    #[test]
    fn picks_first_graphics_family_in_device_order() {
        let devices = [device(1), device(2)];
        let adapter = first_qualifying(
            &devices,
            |_| vec![family(vk::QueueFlags::GRAPHICS | vk::QueueFlags::COMPUTE)],
            |_, _| Ok(true),
        )
        .unwrap();

        assert_eq!(adapter.physical_device, device(1));
        assert_eq!(adapter.queue_family_index, 0);
    }

    #[test]
    fn skips_families_without_graphics() {
        let devices = [device(1)];
        let adapter = first_qualifying(
            &devices,
            |_| {
                vec![
                    family(vk::QueueFlags::TRANSFER),
                    family(vk::QueueFlags::COMPUTE),
                    family(vk::QueueFlags::GRAPHICS),
                ]
            },
            |_, _| Ok(true),
        )
        .unwrap();

        assert_eq!(adapter.queue_family_index, 2);
    }

    #[test]
    fn skips_families_that_cannot_present() {
        let devices = [device(1)];
        let adapter = first_qualifying(
            &devices,
            |_| {
                vec![
                    family(vk::QueueFlags::GRAPHICS),
                    family(vk::QueueFlags::GRAPHICS),
                ]
            },
            |_, index| Ok(index == 1),
        )
        .unwrap();

        assert_eq!(adapter.queue_family_index, 1);
    }

    #[test]
    fn moves_to_next_device_when_first_has_no_match() {
        let devices = [device(1), device(2)];
        let adapter = first_qualifying(
            &devices,
            |d| {
                if d == device(1) {
                    vec![family(vk::QueueFlags::COMPUTE)]
                } else {
                    vec![family(vk::QueueFlags::GRAPHICS)]
                }
            },
            |_, _| Ok(true),
        )
        .unwrap();

        assert_eq!(adapter.physical_device, device(2));
        assert_eq!(adapter.queue_family_index, 0);
    }

    #[test]
    fn fails_when_nothing_qualifies() {
        let devices = [device(1)];
        let result = first_qualifying(
            &devices,
            |_| vec![family(vk::QueueFlags::GRAPHICS)],
            |_, _| Ok(false),
        );

        assert!(matches!(result, Err(GpuError::NoSuitableAdapter)));
    }

    #[test]
    fn fails_when_no_devices_exist() {
        let result = first_qualifying(&[], |_| vec![], |_, _| Ok(true));

        assert!(matches!(result, Err(GpuError::NoSuitableAdapter)));
    }

    #[test]
    fn propagates_presentation_query_failures() {
        let devices = [device(1)];
        let result = first_qualifying(
            &devices,
            |_| vec![family(vk::QueueFlags::GRAPHICS)],
            |_, _| Err(GpuError::Vulkan(vk::Result::ERROR_SURFACE_LOST_KHR)),
        );

        assert!(matches!(
            result,
            Err(GpuError::Vulkan(vk::Result::ERROR_SURFACE_LOST_KHR))
        ));
    }

    #[test]
    fn same_inputs_select_the_same_adapter() {
        let devices = [device(7), device(8)];
        let families =
            |_: vk::PhysicalDevice| vec![family(vk::QueueFlags::COMPUTE), family(vk::QueueFlags::GRAPHICS)];

        let first = first_qualifying(&devices, families, |_, _| Ok(true)).unwrap();
        let second = first_qualifying(&devices, families, |_, _| Ok(true)).unwrap();

        assert_eq!(first.physical_device, second.physical_device);
        assert_eq!(first.queue_family_index, second.queue_family_index);
    }
}
