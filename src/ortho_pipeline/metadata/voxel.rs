//! Physical voxel size from OME-XML

use std::path::Path;

use quick_xml::Reader;
use quick_xml::events::{BytesStart, Event};

use crate::ortho_pipeline::common::error::{PipelineError, Result};

/// Voxel edge lengths in micrometres.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VoxelDims {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

fn metadata_error(source: &str, message: impl Into<String>) -> PipelineError {
    PipelineError::Metadata {
        path: source.to_string(),
        message: message.into(),
    }
}

fn physical_size(element: &BytesStart<'_>, key: &[u8], source: &str) -> Result<f64> {
    let attribute = element
        .attributes()
        .flatten()
        .find(|a| a.key.local_name().as_ref() == key)
        .ok_or_else(|| {
            metadata_error(
                source,
                format!("Pixels element lacks {}", String::from_utf8_lossy(key)),
            )
        })?;
    let text = std::str::from_utf8(&attribute.value)
        .map_err(|e| metadata_error(source, e.to_string()))?;
    text.trim()
        .parse::<f64>()
        .map_err(|e| metadata_error(source, format!("{text}: {e}")))
}

/// Read the voxel size from the first `Pixels` element of an OME-XML document.
pub fn parse_voxel_dims(xml: &str, source: &str) -> Result<VoxelDims> {
    let mut reader = Reader::from_str(xml);
    loop {
        match reader.read_event() {
            Ok(Event::Start(e) | Event::Empty(e)) if e.local_name().as_ref() == b"Pixels" => {
                return Ok(VoxelDims {
                    x: physical_size(&e, b"PhysicalSizeX", source)?,
                    y: physical_size(&e, b"PhysicalSizeY", source)?,
                    z: physical_size(&e, b"PhysicalSizeZ", source)?,
                });
            }
            Ok(Event::Eof) => return Err(metadata_error(source, "no Pixels element found")),
            Err(e) => return Err(metadata_error(source, e.to_string())),
            _ => {}
        }
    }
}

pub fn load_voxel_dims_from_xml(path: &Path) -> Result<VoxelDims> {
    let xml = std::fs::read_to_string(path)
        .map_err(|e| metadata_error(&path.display().to_string(), e.to_string()))?;
    parse_voxel_dims(&xml, &path.display().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_ome_pixels() {
        let xml = r#"<?xml version="1.0" encoding="UTF-8"?>
<OME xmlns="http://www.openmicroscopy.org/Schemas/OME/2016-06">
  <Image ID="Image:0">
    <Pixels ID="Pixels:0" DimensionOrder="XYZCT" PhysicalSizeX="2.41" PhysicalSizeY="2.41" PhysicalSizeZ="2.0" SizeX="512">
      <Channel ID="Channel:0"/>
    </Pixels>
  </Image>
</OME>"#;
        let dims = parse_voxel_dims(xml, "test.xml").unwrap();
        assert_eq!(dims, VoxelDims { x: 2.41, y: 2.41, z: 2.0 });
    }

    #[test]
    fn test_prefixed_empty_pixels_element() {
        let xml = r#"<ome:OME xmlns:ome="x"><ome:Pixels PhysicalSizeX="1" PhysicalSizeY="1.5" PhysicalSizeZ="3"/></ome:OME>"#;
        let dims = parse_voxel_dims(xml, "test.xml").unwrap();
        assert_eq!(dims.z, 3.0);
    }

    #[test]
    fn test_missing_attribute() {
        let xml = r#"<OME><Pixels PhysicalSizeX="1" PhysicalSizeY="1"/></OME>"#;
        assert!(matches!(
            parse_voxel_dims(xml, "test.xml"),
            Err(PipelineError::Metadata { .. })
        ));
    }
}
