use anyhow::{Ok, Result, anyhow};
use std::collections::HashSet;
use std::ffi::{CStr, CString};
use std::os::raw::c_void;
use vulkanalia::loader::{LIBRARY, LibloadingLoader};
use vulkanalia::prelude::v1_0::*;
use vulkanalia::vk;
use vulkanalia::window as vk_window;
use winit::window::Window;

use vulkanalia::vk::ExtDebugUtilsExtension;

mod capabilities;

use capabilities::{MissingExtensions, Negotiation, PlatformTag, RequiredSet, join_names, negotiate};

const VALIDATION_ENABLED: bool = cfg!(debug_assertions);

const VALIDATION_LAYER: vk::ExtensionName =
    vk::ExtensionName::from_bytes(b"VK_LAYER_KHRONOS_validation");

/// The application's connection to Vulkan: loader, instance and the
/// debug messenger that lives and dies with it. Dropping the context
/// tears all of it down.
pub struct Context {
    _entry: Entry,
    instance: Instance,
    messenger: vk::DebugUtilsMessengerEXT,
}

impl Context {
    /// Loads Vulkan and creates an instance for `window`, but only
    /// after every required instance extension has been negotiated
    /// against what the host advertises.
    ///
    /// Safety: the caller must keep `window` alive for as long as the
    /// returned context exists.
    pub unsafe fn create(window: &Window) -> Result<Self> {
        let loader = LibloadingLoader::new(LIBRARY)?;
        let entry = Entry::new(loader)
            .map_err(|e| anyhow!("Vulkan is not supported on this system: {}", e))?;

        let (instance, messenger) = Self::create_instance(window, &entry)?;
        tracing::info!("Vulkan instance created.");

        Ok(Self {
            _entry: entry,
            instance,
            messenger,
        })
    }

    unsafe fn create_instance(
        window: &Window,
        entry: &Entry,
    ) -> Result<(Instance, vk::DebugUtilsMessengerEXT)> {
        let available_layers = available_instance_layers(entry)?;

        tracing::info!("Available layers:");
        for layer in &available_layers {
            tracing::info!("  {}", layer);
        }

        let layers = if VALIDATION_ENABLED {
            if let Negotiation::Unsatisfied { .. } =
                negotiate(&[VALIDATION_LAYER], &available_layers)
            {
                return Err(anyhow!("Validation layer requested but not supported."));
            }
            vec![VALIDATION_LAYER.as_ptr()]
        } else {
            Vec::new()
        };

        // The windowing system decides the base requirements; the rest
        // is appended by RequiredSet::build from the platform tag and
        // the validation toggle.
        let base = vk_window::get_required_instance_extensions(window)
            .iter()
            .map(|e| **e)
            .collect::<Vec<_>>();
        let required = RequiredSet::build(&base, PlatformTag::detect(), VALIDATION_ENABLED);

        let available = available_instance_extensions(entry)?;

        match negotiate(required.names(), &available) {
            Negotiation::Satisfied => {
                tracing::info!("Enabling instance extensions: {}", join_names(required.names()));
            }
            Negotiation::Unsatisfied { missing } => {
                for name in &missing {
                    tracing::error!("Required instance extension `{}` not found.", name);
                }
                return Err(MissingExtensions { missing }.into());
            }
        }

        // The window title doubles as the Vulkan application name.
        let title = CString::new(window.title())?;
        let app_info = vk::ApplicationInfo::builder()
            .application_name(title.as_bytes_with_nul())
            .application_version(vk::make_version(1, 0, 0))
            .engine_name(b"No Engine\0")
            .engine_version(vk::make_version(1, 0, 0))
            .api_version(vk::make_version(1, 3, 0));

        let extensions = required
            .names()
            .iter()
            .map(|n| n.as_ptr())
            .collect::<Vec<_>>();

        let mut info = vk::InstanceCreateInfo::builder()
            .application_info(&app_info)
            .enabled_layer_names(&layers)
            .enabled_extension_names(&extensions)
            .flags(required.flags());

        let mut debug_info = vk::DebugUtilsMessengerCreateInfoEXT::builder()
            .message_severity(vk::DebugUtilsMessageSeverityFlagsEXT::all())
            .message_type(
                vk::DebugUtilsMessageTypeFlagsEXT::GENERAL
                    | vk::DebugUtilsMessageTypeFlagsEXT::VALIDATION
                    | vk::DebugUtilsMessageTypeFlagsEXT::PERFORMANCE,
            )
            .user_callback(Some(debug_callback));

        if VALIDATION_ENABLED {
            info = info.push_next(&mut debug_info);
        }

        let instance = entry.create_instance(&info, None)?;

        let messenger = if VALIDATION_ENABLED {
            let debug_info = vk::DebugUtilsMessengerCreateInfoEXT::builder()
                .message_severity(vk::DebugUtilsMessageSeverityFlagsEXT::all())
                .message_type(
                    vk::DebugUtilsMessageTypeFlagsEXT::GENERAL
                        | vk::DebugUtilsMessageTypeFlagsEXT::VALIDATION
                        | vk::DebugUtilsMessageTypeFlagsEXT::PERFORMANCE,
                )
                .user_callback(Some(debug_callback));

            instance.create_debug_utils_messenger_ext(&debug_info, None)?
        } else {
            vk::DebugUtilsMessengerEXT::null()
        };

        Ok((instance, messenger))
    }
}

impl Drop for Context {
    fn drop(&mut self) {
        tracing::info!("Destroying Vulkan instance.");
        unsafe {
            // The messenger must go before the instance that owns it.
            if self.messenger != vk::DebugUtilsMessengerEXT::null() {
                self.instance
                    .destroy_debug_utils_messenger_ext(self.messenger, None);
            }
            self.instance.destroy_instance(None);
        }
    }
}

/// Snapshot of the layers the host advertises. Unordered, captured
/// once per bootstrap.
unsafe fn available_instance_layers(entry: &Entry) -> Result<HashSet<vk::ExtensionName>> {
    Ok(entry
        .enumerate_instance_layer_properties()?
        .iter()
        .map(|l| l.layer_name)
        .collect())
}

/// Snapshot of the instance extensions the host advertises. The loader
/// reports these through a count-then-data pair of calls; callers of
/// this wrapper only ever see the single materialized set.
unsafe fn available_instance_extensions(entry: &Entry) -> Result<HashSet<vk::ExtensionName>> {
    Ok(entry
        .enumerate_instance_extension_properties(None)?
        .iter()
        .map(|e| e.extension_name)
        .collect())
}

extern "system" fn debug_callback(
    severity: vk::DebugUtilsMessageSeverityFlagsEXT,
    type_: vk::DebugUtilsMessageTypeFlagsEXT,
    data: *const vk::DebugUtilsMessengerCallbackDataEXT,
    _: *mut c_void,
) -> vk::Bool32 {
    let data = unsafe { *data };
    let message = unsafe { CStr::from_ptr(data.message) }.to_string_lossy();

    if severity >= vk::DebugUtilsMessageSeverityFlagsEXT::ERROR {
        tracing::error!("({:?}) {}", type_, message);
    } else if severity >= vk::DebugUtilsMessageSeverityFlagsEXT::WARNING {
        tracing::warn!("({:?}) {}", type_, message);
    } else if severity >= vk::DebugUtilsMessageSeverityFlagsEXT::INFO {
        tracing::debug!("({:?}) {}", type_, message);
    } else {
        tracing::trace!("({:?}) {}", type_, message);
    }

    vk::FALSE
}
