//! Imaging metadata module
//!
//! Channel definitions come from the dataset's `parameters.json`, physical
//! voxel sizes from its OME-XML sidecar. Both are read once at start-up.

pub mod channels;
pub mod voxel;

use std::path::Path;

use tracing::{info, warn};

use crate::ortho_pipeline::common::error::Result;

pub use channels::{
    ChannelDescriptor, DisplayWindow, find_channel, load_channels_from_json, load_channels_from_json_with,
};
pub use voxel::{VoxelDims, load_voxel_dims_from_xml};

pub const PARAMETERS_FILE: &str = "parameters.json";
pub const OME_METADATA_FILE: &str = "OME/METADATA.ome.xml";

/// Load every channel of a dataset, attaching voxel dimensions when the
/// OME-XML sidecar is present.
pub fn load_dataset_channels(dataset_root: &Path) -> Result<Vec<ChannelDescriptor>> {
    let channels = load_channels_from_json(&dataset_root.join(PARAMETERS_FILE))?;
    attach_voxel_dims(dataset_root, channels)
}

/// Like [`load_dataset_channels`], with `auto_max(name, index)` supplying the
/// display maximum of channels that omit `scaleMax`.
pub fn load_dataset_channels_with<F>(dataset_root: &Path, auto_max: F) -> Result<Vec<ChannelDescriptor>>
where
    F: FnMut(&str, usize) -> Result<f64>,
{
    let channels = load_channels_from_json_with(&dataset_root.join(PARAMETERS_FILE), auto_max)?;
    attach_voxel_dims(dataset_root, channels)
}

fn attach_voxel_dims(dataset_root: &Path, channels: Vec<ChannelDescriptor>) -> Result<Vec<ChannelDescriptor>> {

    let xml_path = dataset_root.join(OME_METADATA_FILE);
    let voxel_dims = if xml_path.is_file() {
        Some(load_voxel_dims_from_xml(&xml_path)?)
    } else {
        warn!(path = %xml_path.display(), "No OME metadata found, scale bars use pixel defaults");
        None
    };

    let channels: Vec<ChannelDescriptor> = channels
        .into_iter()
        .map(|channel| match voxel_dims {
            Some(dims) => channel.with_voxel_dims(dims),
            None => channel,
        })
        .collect();

    for channel in &channels {
        info!(
            channel = %channel.name,
            min = channel.window.min(),
            max = channel.window.max(),
            invert = channel.invert_display,
            "Loaded channel"
        );
    }
    Ok(channels)
}
