//! Dispatch table loading.
//!
//! Every Vulkan command this crate issues goes through a typed function
//! table: `ash::Entry` for global commands, `ash::Instance` and
//! `ash::Device` for the core API, and the KHR extension tables for
//! surfaces and swapchains. A table is only handed out once every entry
//! point the crate calls through it has been resolved, so a partially
//! usable table is never observable. Resolution failures name the exact
//! entry point that was missing.

use std::ffi::CStr;

use ash::vk;

use crate::error::{GpuError, Result};

/// Commands resolved through `vkGetInstanceProcAddr` with a null instance.
pub const GLOBAL_ENTRY_POINTS: &[&CStr] = &[
    c"vkCreateInstance",
    c"vkEnumerateInstanceLayerProperties",
];

/// Instance-scoped core commands.
pub const INSTANCE_ENTRY_POINTS: &[&CStr] = &[
    c"vkDestroyInstance",
    c"vkEnumeratePhysicalDevices",
    c"vkGetPhysicalDeviceProperties",
    c"vkGetPhysicalDeviceQueueFamilyProperties",
    c"vkCreateDevice",
    c"vkGetDeviceProcAddr",
];

/// Device-scoped core commands.
pub const DEVICE_ENTRY_POINTS: &[&CStr] = &[
    c"vkDestroyDevice",
    c"vkGetDeviceQueue",
    c"vkDeviceWaitIdle",
    c"vkCreateImageView",
    c"vkDestroyImageView",
];

/// Surface extension commands, instance scoped.
pub const SURFACE_ENTRY_POINTS: &[&CStr] = &[
    c"vkDestroySurfaceKHR",
    c"vkGetPhysicalDeviceSurfaceSupportKHR",
    c"vkGetPhysicalDeviceSurfaceCapabilitiesKHR",
    c"vkGetPhysicalDeviceSurfaceFormatsKHR",
];

/// Swapchain extension commands, device scoped.
pub const SWAPCHAIN_ENTRY_POINTS: &[&CStr] = &[
    c"vkCreateSwapchainKHR",
    c"vkDestroySwapchainKHR",
    c"vkGetSwapchainImagesKHR",
];

/// Resolve every required entry point, then build the table.
///
/// Each name is resolved independently. The first name the resolver cannot
/// find fails the whole load with [`GpuError::MissingEntryPoint`] carrying
/// that name, and `table` is never invoked, so no partial table exists.
pub fn load_table<T>(
    required: &[&CStr],
    mut resolve: impl FnMut(&CStr) -> vk::PFN_vkVoidFunction,
    table: impl FnOnce() -> T,
) -> Result<T> {
    for &name in required {
        if resolve(name).is_none() {
            return Err(GpuError::MissingEntryPoint(
                name.to_string_lossy().into_owned(),
            ));
        }
    }
    Ok(table())
}

/// Resolve every required entry point for a table built elsewhere.
///
/// Used for the core instance and device tables, which ash constructs as
/// part of object creation. The caller destroys the object if this fails.
pub fn verify(
    required: &[&CStr],
    resolve: impl FnMut(&CStr) -> vk::PFN_vkVoidFunction,
) -> Result<()> {
    load_table(required, resolve, || ())
}

#[cfg(test)]
mod tests {
    use std::cell::Cell;
    use std::collections::HashSet;

    use super::*;

    unsafe extern "system" fn stub() {}

    fn resolver_for<'a>(
        known: &'a [&CStr],
        calls: &'a Cell<usize>,
    ) -> impl FnMut(&CStr) -> vk::PFN_vkVoidFunction + 'a {
        let known: HashSet<&CStr> = known.iter().copied().collect();
        move |name| {
            calls.set(calls.get() + 1);
            known
                .contains(name)
                .then_some(stub as unsafe extern "system" fn())
        }
    }

    #[test]
    fn builds_table_when_every_name_resolves() {
        let calls = Cell::new(0);
        let required: &[&CStr] = &[c"vkCreateSwapchainKHR", c"vkDestroySwapchainKHR"];

        let table = load_table(required, resolver_for(required, &calls), || 7_u32);

        assert_eq!(table.unwrap(), 7);
        assert_eq!(calls.get(), 2);
    }

    #[test]
    fn names_missing_entry_point() {
        let calls = Cell::new(0);
        let known: &[&CStr] = &[c"vkCreateSwapchainKHR", c"vkGetSwapchainImagesKHR"];
        let required: &[&CStr] = &[
            c"vkCreateSwapchainKHR",
            c"vkDestroySwapchainKHR",
            c"vkGetSwapchainImagesKHR",
        ];

        let result = load_table(required, resolver_for(known, &calls), || ());

        match result {
            Err(GpuError::MissingEntryPoint(name)) => {
                assert_eq!(name, "vkDestroySwapchainKHR");
            }
            other => panic!("expected MissingEntryPoint, got {other:?}"),
        }
    }

    #[test]
    fn never_builds_a_partial_table() {
        let calls = Cell::new(0);
        let built = Cell::new(false);
        let known: &[&CStr] = &[c"vkDestroyDevice"];
        let required: &[&CStr] = &[c"vkDestroyDevice", c"vkDeviceWaitIdle"];

        let result = load_table(required, resolver_for(known, &calls), || built.set(true));

        assert!(result.is_err());
        assert!(!built.get());
    }

    #[test]
    fn empty_requirement_list_succeeds() {
        let calls = Cell::new(0);
        let result = load_table(&[], resolver_for(&[], &calls), || ());

        assert!(result.is_ok());
        assert_eq!(calls.get(), 0);
    }

    #[test]
    fn verify_reports_first_missing_name() {
        let calls = Cell::new(0);
        let known: &[&CStr] = &[c"vkDestroySurfaceKHR"];

        let result = verify(SURFACE_ENTRY_POINTS, resolver_for(known, &calls));

        match result {
            Err(GpuError::MissingEntryPoint(name)) => {
                assert_eq!(name, "vkGetPhysicalDeviceSurfaceSupportKHR");
            }
            other => panic!("expected MissingEntryPoint, got {other:?}"),
        }
    }
}
