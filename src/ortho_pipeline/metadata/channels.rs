//! Channel descriptors and display windows

use std::path::Path;

use serde::Deserialize;

use crate::ortho_pipeline::common::error::{PipelineError, Result};
use crate::ortho_pipeline::metadata::voxel::VoxelDims;

/// Intensity range mapped linearly onto 0..=255.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DisplayWindow {
    min: f64,
    max: f64,
}

impl DisplayWindow {
    /// Fails with [`PipelineError::DegenerateWindow`] unless `min < max`.
    pub fn new(min: f64, max: f64) -> Result<Self> {
        if !(min.is_finite() && max.is_finite()) || max <= min {
            return Err(PipelineError::DegenerateWindow { min, max });
        }
        Ok(Self { min, max })
    }

    pub fn min(&self) -> f64 {
        self.min
    }

    pub fn max(&self) -> f64 {
        self.max
    }
}

/// One optical channel of a dataset.
#[derive(Debug, Clone, PartialEq)]
pub struct ChannelDescriptor {
    pub name: String,
    pub index: usize,
    pub window: DisplayWindow,
    /// Structural channels are displayed inverted so dim material reads bright.
    pub invert_display: bool,
    pub voxel_dims: Option<VoxelDims>,
}

impl ChannelDescriptor {
    pub fn new(name: impl Into<String>, index: usize, window: DisplayWindow) -> Self {
        Self {
            name: name.into(),
            index,
            window,
            invert_display: false,
            voxel_dims: None,
        }
    }

    pub fn with_invert_display(mut self, invert: bool) -> Self {
        self.invert_display = invert;
        self
    }

    pub fn with_voxel_dims(mut self, dims: VoxelDims) -> Self {
        self.voxel_dims = Some(dims);
        self
    }
}

#[derive(Deserialize)]
struct ParametersDocument {
    channels: Vec<ChannelEntry>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ChannelEntry {
    name: String,
    #[serde(alias = "channel", alias = "nChannel")]
    index: usize,
    #[serde(default, alias = "adjMin")]
    scale_min: f64,
    #[serde(default)]
    scale_max: Option<f64>,
    #[serde(default, alias = "invertDisplay")]
    invert: bool,
}

/// Parse channel descriptors from a `parameters.json` document.
///
/// Every channel must carry a `scaleMax`.
pub fn parse_channels(json: &str, source: &str) -> Result<Vec<ChannelDescriptor>> {
    parse_channels_with(json, source, missing_scale_max)
}

/// Like [`parse_channels`], but a channel without `scaleMax` takes the value
/// returned by `auto_max(name, index)`.
pub fn parse_channels_with<F>(json: &str, source: &str, mut auto_max: F) -> Result<Vec<ChannelDescriptor>>
where
    F: FnMut(&str, usize) -> Result<f64>,
{
    let document: ParametersDocument =
        serde_json::from_str(json).map_err(|e| PipelineError::Metadata {
            path: source.to_string(),
            message: e.to_string(),
        })?;

    if document.channels.is_empty() {
        return Err(PipelineError::Configuration(format!(
            "{source} defines no channels"
        )));
    }

    document
        .channels
        .into_iter()
        .map(|entry| {
            let scale_max = match entry.scale_max {
                Some(max) => max,
                None => auto_max(&entry.name, entry.index)?,
            };
            let window = DisplayWindow::new(entry.scale_min, scale_max).map_err(|_| {
                PipelineError::Configuration(format!(
                    "channel {} has degenerate display window [{}, {}]",
                    entry.name, entry.scale_min, scale_max
                ))
            })?;
            Ok(ChannelDescriptor::new(entry.name, entry.index, window)
                .with_invert_display(entry.invert))
        })
        .collect()
}

fn missing_scale_max(name: &str, _index: usize) -> Result<f64> {
    Err(PipelineError::Configuration(format!(
        "channel {name} has no scaleMax"
    )))
}

pub fn load_channels_from_json(path: &Path) -> Result<Vec<ChannelDescriptor>> {
    load_channels_from_json_with(path, missing_scale_max)
}

pub fn load_channels_from_json_with<F>(path: &Path, auto_max: F) -> Result<Vec<ChannelDescriptor>>
where
    F: FnMut(&str, usize) -> Result<f64>,
{
    let json = std::fs::read_to_string(path).map_err(|e| PipelineError::Metadata {
        path: path.display().to_string(),
        message: e.to_string(),
    })?;
    parse_channels_with(&json, &path.display().to_string(), auto_max)
}

pub fn find_channel<'a>(channels: &'a [ChannelDescriptor], name: &str) -> Result<&'a ChannelDescriptor> {
    channels
        .iter()
        .find(|channel| channel.name == name)
        .ok_or_else(|| PipelineError::UnknownChannel(name.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    const PARAMETERS: &str = r#"{
        "channels": [
            {"name": "cells", "channel": 0, "scaleMax": 400},
            {"name": "rocks", "index": 1, "scaleMin": 20, "scaleMax": 900, "invert": true}
        ]
    }"#;

    #[test]
    fn test_parse_channels() {
        let channels = parse_channels(PARAMETERS, "parameters.json").unwrap();
        assert_eq!(channels.len(), 2);
        assert_eq!(channels[0].name, "cells");
        assert_eq!(channels[0].window.min(), 0.0);
        assert!(!channels[0].invert_display);
        assert_eq!(channels[1].index, 1);
        assert_eq!(channels[1].window.max(), 900.0);
        assert!(channels[1].invert_display);
    }

    #[test]
    fn test_degenerate_window_rejected() {
        assert!(matches!(
            DisplayWindow::new(5.0, 5.0),
            Err(PipelineError::DegenerateWindow { .. })
        ));
        let json = r#"{"channels": [{"name": "c", "index": 0, "scaleMin": 3, "scaleMax": 3}]}"#;
        assert!(matches!(
            parse_channels(json, "p.json"),
            Err(PipelineError::Configuration(_))
        ));
    }

    #[test]
    fn test_find_channel() {
        let channels = parse_channels(PARAMETERS, "parameters.json").unwrap();
        assert_eq!(find_channel(&channels, "rocks").unwrap().index, 1);
        assert!(matches!(
            find_channel(&channels, "beads"),
            Err(PipelineError::UnknownChannel(_))
        ));
    }

    #[test]
    fn test_missing_scale_max() {
        let json = r#"{"channels": [
            {"name": "cells", "index": 0, "scaleMax": 400},
            {"name": "rocks", "index": 1, "scaleMin": 20}
        ]}"#;
        assert!(matches!(
            parse_channels(json, "p.json"),
            Err(PipelineError::Configuration(message)) if message.contains("rocks")
        ));

        let mut asked = Vec::new();
        let channels = parse_channels_with(json, "p.json", |name, index| {
            asked.push((name.to_string(), index));
            Ok(1234.0)
        })
        .unwrap();
        assert_eq!(asked, vec![("rocks".to_string(), 1)]);
        assert_eq!(channels[0].window.max(), 400.0);
        assert_eq!(channels[1].window.min(), 20.0);
        assert_eq!(channels[1].window.max(), 1234.0);
    }

    #[test]
    fn test_resolved_scale_max_below_min_rejected() {
        let json = r#"{"channels": [{"name": "dark", "index": 0, "scaleMin": 10}]}"#;
        let result = parse_channels_with(json, "p.json", |_, _| Ok(0.0));
        assert!(matches!(result, Err(PipelineError::Configuration(_))));
    }

    #[test]
    fn test_malformed_json() {
        assert!(matches!(
            parse_channels("{", "p.json"),
            Err(PipelineError::Metadata { .. })
        ));
    }
}
