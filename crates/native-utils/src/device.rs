use anyhow::{Context, anyhow};
use cpal::Device;
use cpal::traits::{DeviceTrait, HostTrait};

fn get_host() -> cpal::Host {
    cpal::default_host()
}

/// Returns the input device with the given name, or the host default.
pub fn get_or_default_input(device_name: Option<&str>) -> anyhow::Result<Device> {
    let host = get_host();
    tracing::debug!("Host: {:?}", host.id());

    match device_name {
        Some(target) => host
            .input_devices()
            .context("Failed to enumerate input devices")?
            .find(|d| d.name().is_ok_and(|name| name == target))
            .ok_or_else(|| anyhow!("Input device '{target}' not found")),
        None => host
            .default_input_device()
            .ok_or_else(|| anyhow!("No default input device")),
    }
}

/// Returns the output device with the given name, or the host default.
pub fn get_or_default_output(device_name: Option<&str>) -> anyhow::Result<Device> {
    let host = get_host();
    tracing::debug!("Host: {:?}", host.id());

    match device_name {
        Some(target) => host
            .output_devices()
            .context("Failed to enumerate output devices")?
            .find(|d| d.name().is_ok_and(|name| name == target))
            .ok_or_else(|| anyhow!("Output device '{target}' not found")),
        None => host
            .default_output_device()
            .ok_or_else(|| anyhow!("No default output device")),
    }
}

/// One line per input device: ` * name(2ch, 48000hz) [default]`.
pub fn get_available_inputs() -> anyhow::Result<String> {
    let host = get_host();
    let default_device = host.default_input_device().and_then(|d| d.name().ok());

    let mut device_names = Vec::new();
    for device in host.input_devices().context("Failed to enumerate input devices")? {
        let Ok(name) = device.name() else { continue };
        let Ok(config) = device.default_input_config() else {
            tracing::debug!("Skipping input device without a default config: {name}");
            continue;
        };
        device_names.push(describe(
            &name,
            config.channels(),
            config.sample_rate().0,
            default_device.as_deref() == Some(name.as_str()),
        ));
    }
    Ok(device_names.join("\n"))
}

/// Same as [`get_available_inputs`] for output devices.
pub fn get_available_outputs() -> anyhow::Result<String> {
    let host = get_host();
    let default_device = host.default_output_device().and_then(|d| d.name().ok());

    let mut device_names = Vec::new();
    for device in host.output_devices().context("Failed to enumerate output devices")? {
        let Ok(name) = device.name() else { continue };
        let Ok(config) = device.default_output_config() else {
            tracing::debug!("Skipping output device without a default config: {name}");
            continue;
        };
        device_names.push(describe(
            &name,
            config.channels(),
            config.sample_rate().0,
            default_device.as_deref() == Some(name.as_str()),
        ));
    }
    Ok(device_names.join("\n"))
}

fn describe(name: &str, channels: u16, sample_rate: u32, is_default: bool) -> String {
    let mut line = format!(" * {}({}ch, {}hz)", name, channels, sample_rate);
    if is_default {
        line.push_str(" [default]");
    }
    line
}
